//! GetPubKeys and GetKeyPairs.

use natural_rights_core::{
    AccountId, ActionOutput, DocumentId, GroupId, KeyKind, KeyLookupPayload, KeyPairsPayload,
    PubKeysPayload,
};
use natural_rights_primitives::Primitives;
use natural_rights_store::{Grantee, GraphStore, GraphStoreExt};

use super::{require_account, ActionHandlers};
use crate::auth::ActingIdentity;
use crate::error::{ActionError, HandlerResult};

impl<S: GraphStore, P: Primitives> ActionHandlers<S, P> {
    /// Public keys are readable by anyone who knows the id.
    ///
    /// Documents have no signing key of their own; their signatures come
    /// from the service key.
    pub(crate) async fn get_pub_keys(
        &self,
        _identity: &ActingIdentity,
        payload: KeyLookupPayload,
    ) -> HandlerResult<ActionOutput> {
        let id = payload.id.as_str();
        let (sign_pub_key, crypt_pub_key) = match payload.kind {
            KeyKind::Account => {
                let account = self
                    .store
                    .get_account(&AccountId::from(id))
                    .await?
                    .ok_or_else(|| ActionError::not_found(format!("account {id}")))?;
                (account.record.sign_pub_key, account.record.crypt_pub_key)
            }
            KeyKind::Group => {
                let group = self
                    .store
                    .get_group(&GroupId::from(id))
                    .await?
                    .ok_or_else(|| ActionError::not_found(format!("group {id}")))?;
                (group.record.sign_pub_key, group.record.crypt_pub_key)
            }
            KeyKind::Document => {
                let document = self.document(&DocumentId::from(id)).await?;
                (self.sign_keypair.pub_key.clone(), document.record.crypt_pub_key)
            }
        };

        Ok(ActionOutput::GetPubKeys(PubKeysPayload {
            kind: payload.kind,
            id: payload.id,
            sign_pub_key,
            crypt_pub_key,
        }))
    }

    /// Encrypted private keys, transformed toward the acting client.
    pub(crate) async fn get_key_pairs(
        &self,
        identity: &ActingIdentity,
        payload: KeyLookupPayload,
    ) -> HandlerResult<ActionOutput> {
        let id = payload.id.as_str();
        let output = match payload.kind {
            KeyKind::Account => {
                let account = self
                    .store
                    .get_account(&AccountId::from(id))
                    .await?
                    .ok_or_else(|| ActionError::not_found(format!("account {id}")))?;
                if require_account(identity)? != &account.record.id {
                    return Err(ActionError::forbidden(format!(
                        "key pairs of account {id} belong to its own clients"
                    )));
                }

                let account = account.record;
                KeyPairsPayload {
                    kind: payload.kind,
                    id: payload.id,
                    sign_pub_key: account.sign_pub_key,
                    enc_sign_priv_key: account.enc_sign_priv_key,
                    crypt_pub_key: account.crypt_pub_key,
                    enc_crypt_priv_key: account.enc_crypt_priv_key,
                }
            }
            KeyKind::Group => {
                let group_id = GroupId::from(id);
                let group = self
                    .store
                    .get_group(&group_id)
                    .await?
                    .ok_or_else(|| ActionError::not_found(format!("group {id}")))?;

                let actor = require_account(identity)?;
                let admin_copy = group.record.admins.get(actor).cloned().ok_or_else(|| {
                    ActionError::forbidden(format!("not an admin of group {id}"))
                })?;

                // The admin copy is sealed to the admin's account key.
                let reach = self.reach(identity).await?;
                let transforms = reach
                    .principal(&Grantee::account(actor))
                    .map(|p| p.transforms.clone())
                    .unwrap_or_default();
                let enc_crypt_priv_key = self.transform_along(admin_copy, &transforms).await?;

                let group = group.record;
                KeyPairsPayload {
                    kind: payload.kind,
                    id: payload.id,
                    sign_pub_key: group.sign_pub_key,
                    enc_sign_priv_key: group.enc_sign_priv_key,
                    crypt_pub_key: group.crypt_pub_key,
                    enc_crypt_priv_key,
                }
            }
            KeyKind::Document => {
                let document = self.document(&DocumentId::from(id)).await?;
                let reach = self.reach(identity).await?;
                let enc_crypt_priv_key = self.decrypt_for(&reach, &document.record).await?;

                KeyPairsPayload {
                    kind: payload.kind,
                    id: payload.id,
                    sign_pub_key: self.sign_keypair.pub_key.clone(),
                    enc_sign_priv_key: String::new(),
                    crypt_pub_key: document.record.crypt_pub_key,
                    enc_crypt_priv_key,
                }
            }
        };

        Ok(ActionOutput::GetKeyPairs(output))
    }
}
