//! Action handlers.
//!
//! One handler per action kind. Every handler follows the same shape:
//! read the records it needs, check the actor's capability, call the
//! primitives provider if needed, then commit its writes as one batch.
//! A batch that loses a race surfaces as [`ActionError::Conflict`].

mod account;
mod client;
mod document;
mod group;
mod keys;

use std::sync::Arc;

use natural_rights_core::{AccountId, Action, ActionOutput, GrantKind, KeyPair};
use natural_rights_primitives::Primitives;
use natural_rights_store::{
    CommitResult, Grantee, GraphStore, GraphStoreExt, Guard, RecordKey, WriteBatch,
};

use crate::auth::ActingIdentity;
use crate::authz::Reach;
use crate::config::ServiceConfig;
use crate::error::{ActionError, HandlerResult};

/// Executes single actions against the key graph.
pub struct ActionHandlers<S, P> {
    store: Arc<S>,
    primitives: Arc<P>,
    sign_keypair: KeyPair,
    config: ServiceConfig,
}

impl<S: GraphStore, P: Primitives> ActionHandlers<S, P> {
    pub fn new(
        store: Arc<S>,
        primitives: Arc<P>,
        sign_keypair: KeyPair,
        config: ServiceConfig,
    ) -> Self {
        Self {
            store,
            primitives,
            sign_keypair,
            config,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// The service's own signing public key.
    pub fn sign_pub_key(&self) -> &str {
        &self.sign_keypair.pub_key
    }

    /// Run one action for `identity`.
    pub async fn handle(
        &self,
        identity: &ActingIdentity,
        action: Action,
    ) -> HandlerResult<ActionOutput> {
        match action {
            Action::InitializeAccount(p) => self.initialize_account(identity, p).await,
            Action::Login(p) => self.login(identity, p).await,
            Action::AuthorizeClient(p) => self.authorize_client(identity, p).await,
            Action::DeauthorizeClient(p) => self.deauthorize_client(identity, p).await,
            Action::CreateGroup(p) => self.create_group(identity, p).await,
            Action::AddMemberToGroup(p) => self.add_member_to_group(identity, p).await,
            Action::RemoveMemberFromGroup(p) => self.remove_member_from_group(identity, p).await,
            Action::AddAdminToGroup(p) => self.add_admin_to_group(identity, p).await,
            Action::RemoveAdminFromGroup(p) => self.remove_admin_from_group(identity, p).await,
            Action::CreateDocument(p) => self.create_document(identity, p).await,
            Action::SignDocument(p) => self.sign_document(identity, p).await,
            Action::GrantAccess(p) => self.grant_access(identity, p).await,
            Action::DecryptDocument(p) => self.decrypt_document(identity, p).await,
            Action::RevokeAccess(p) => self.revoke_access(identity, p).await,
            Action::UpdateDocument(p) => self.update_document(identity, p).await,
            Action::GetPubKeys(p) => self.get_pub_keys(identity, p).await,
            Action::GetKeyPairs(p) => self.get_key_pairs(identity, p).await,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Shared helpers
    // ─────────────────────────────────────────────────────────────────────────

    /// Commit a batch, turning a lost race into a failed action.
    async fn commit(&self, batch: WriteBatch) -> HandlerResult<()> {
        match self.store.commit(batch).await? {
            CommitResult::Committed => Ok(()),
            CommitResult::Conflict { key } => Err(ActionError::Conflict(key)),
        }
    }

    async fn reach(&self, identity: &ActingIdentity) -> HandlerResult<Reach> {
        Ok(Reach::resolve(
            self.store.as_ref(),
            identity,
            self.config.max_delegation_depth,
        )
        .await?)
    }

    /// The acting client's record at its current version.
    async fn binding_guard(&self, identity: &ActingIdentity) -> HandlerResult<Option<Guard>> {
        Ok(self
            .store
            .get_client(&identity.client_id)
            .await?
            .map(|client| Guard {
                key: RecordKey::client(&identity.client_id),
                version: client.version,
            }))
    }

    /// Look up an account or group by id, accounts first.
    async fn resolve_crypt_account(&self, id: &str) -> HandlerResult<Grantee> {
        if self.store.get_account(&AccountId::from(id)).await?.is_some() {
            return Ok(Grantee::new(GrantKind::Account, id));
        }
        if self.store.get_group(&id.into()).await?.is_some() {
            return Ok(Grantee::new(GrantKind::Group, id));
        }
        Err(ActionError::not_found(format!("account or group {id}")))
    }

    /// Check that a grantee named in a payload exists.
    async fn require_grantee(&self, grantee: &Grantee) -> HandlerResult<()> {
        let exists = match grantee.kind {
            GrantKind::Account => self
                .store
                .get_account(&grantee.id.as_str().into())
                .await?
                .is_some(),
            GrantKind::Group => self
                .store
                .get_group(&grantee.id.as_str().into())
                .await?
                .is_some(),
        };
        if exists {
            Ok(())
        } else {
            Err(ActionError::not_found(grantee))
        }
    }

    /// Apply a chain of transform keys top-down, stopping at the first gap.
    async fn transform_along(
        &self,
        ciphertext: String,
        transforms: &[Option<String>],
    ) -> HandlerResult<String> {
        let mut ciphertext = ciphertext;
        for transform_key in transforms {
            let Some(transform_key) = transform_key else {
                break;
            };
            ciphertext = self
                .primitives
                .crypt_transform(transform_key, &ciphertext, &self.sign_keypair)
                .await?;
        }
        Ok(ciphertext)
    }
}

/// The acting account, or `Forbidden` for an unbound client.
fn require_account(identity: &ActingIdentity) -> HandlerResult<&AccountId> {
    identity
        .account_id
        .as_ref()
        .ok_or_else(|| ActionError::forbidden("client is not bound to an account"))
}
