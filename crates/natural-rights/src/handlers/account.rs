//! InitializeAccount and Login.

use tracing::info;

use natural_rights_core::{
    ActionOutput, DocumentId, InitializeAccountPayload, LoginPayload, LoginResultPayload,
};
use natural_rights_primitives::Primitives;
use natural_rights_store::{
    AccountRecord, ClientBinding, DocumentRecord, Grant, Grantee, GraphStore, GraphStoreExt,
    WriteBatch,
};

use super::ActionHandlers;
use crate::auth::ActingIdentity;
use crate::error::{ActionError, HandlerResult};

impl<S: GraphStore, P: Primitives> ActionHandlers<S, P> {
    pub(crate) async fn initialize_account(
        &self,
        identity: &ActingIdentity,
        payload: InitializeAccountPayload,
    ) -> HandlerResult<ActionOutput> {
        let batch = self.account_batch(&payload).await?;

        let client = self
            .store
            .get_client(&identity.client_id)
            .await?
            .ok_or_else(|| ActionError::not_found(&identity.client_id))?;

        if let Some(bound) = client.record.account_id() {
            return Err(ActionError::forbidden(format!(
                "client is already bound to account {bound}"
            )));
        }

        let mut client_record = client.record;
        client_record.binding = Some(ClientBinding {
            account_id: payload.account_id.clone(),
            crypt_transform_key: None,
        });
        client_record.revoked = false;

        self.commit(batch.update(client.version, client_record)).await?;

        info!(account = %payload.account_id, client = %identity.client_id, "initialized account");
        Ok(ActionOutput::InitializeAccount(payload))
    }

    /// Writes creating an account and its root document.
    ///
    /// Fails with `AlreadyExists` if the account, its crypt key, or the root
    /// document is already taken.
    pub(crate) async fn account_batch(
        &self,
        payload: &InitializeAccountPayload,
    ) -> HandlerResult<WriteBatch> {
        if self.store.get_account(&payload.account_id).await?.is_some() {
            return Err(ActionError::AlreadyExists(format!(
                "account {}",
                payload.account_id
            )));
        }
        if self
            .store
            .account_by_crypt_pub_key(&payload.crypt_pub_key)
            .await?
            .is_some()
        {
            return Err(ActionError::AlreadyExists(
                "an account with this crypt key".into(),
            ));
        }

        let root_document_id =
            DocumentId::derive(&payload.account_id, &payload.root_doc_crypt_pub_key);
        if self.store.get_document(&root_document_id).await?.is_some() {
            return Err(ActionError::AlreadyExists(format!(
                "document {root_document_id}"
            )));
        }

        let owner = Grantee::account(&payload.account_id);
        let account = AccountRecord {
            id: payload.account_id.clone(),
            sign_pub_key: payload.sign_pub_key.clone(),
            crypt_pub_key: payload.crypt_pub_key.clone(),
            enc_sign_priv_key: payload.enc_sign_priv_key.clone(),
            enc_crypt_priv_key: payload.enc_crypt_priv_key.clone(),
            root_document_id: root_document_id.clone(),
        };
        let root_document = DocumentRecord {
            id: root_document_id,
            creator_id: payload.account_id.clone(),
            crypt_owner: owner.clone(),
            crypt_pub_key: payload.root_doc_crypt_pub_key.clone(),
            grants: vec![Grant {
                grantee: owner,
                enc_crypt_priv_key: Some(payload.root_doc_enc_crypt_priv_key.clone()),
                can_sign: true,
            }],
        };

        Ok(WriteBatch::new().insert(account).insert(root_document))
    }

    pub(crate) async fn login(
        &self,
        identity: &ActingIdentity,
        payload: LoginPayload,
    ) -> HandlerResult<ActionOutput> {
        // Unknown key and foreign account look the same to the caller.
        let not_found = || ActionError::not_found("account for this client and crypt key");

        let account = self
            .store
            .account_by_crypt_pub_key(&payload.crypt_pub_key)
            .await?
            .ok_or_else(not_found)?;

        if identity.account_id.as_ref() != Some(&account.record.id) {
            return Err(not_found());
        }

        Ok(ActionOutput::Login(LoginResultPayload {
            account_id: account.record.id,
            root_document_id: account.record.root_document_id,
        }))
    }
}
