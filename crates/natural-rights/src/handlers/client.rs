//! AuthorizeClient and DeauthorizeClient.

use tracing::info;

use natural_rights_core::{
    AccountId, ActionOutput, AuthorizeClientPayload, AuthorizeExistingPayload,
    AuthorizeNewAccountPayload, ClientBindingPayload, ClientId, DeauthorizeClientPayload,
};
use natural_rights_primitives::Primitives;
use natural_rights_store::{ClientBinding, ClientRecord, GraphStore, GraphStoreExt, WriteBatch};

use super::{require_account, ActionHandlers};
use crate::auth::ActingIdentity;
use crate::error::{ActionError, HandlerResult};

impl<S: GraphStore, P: Primitives> ActionHandlers<S, P> {
    pub(crate) async fn authorize_client(
        &self,
        identity: &ActingIdentity,
        payload: AuthorizeClientPayload,
    ) -> HandlerResult<ActionOutput> {
        let output = ClientBindingPayload {
            client_id: payload.client_id().clone(),
            account_id: payload.account_id().clone(),
        };

        match payload {
            AuthorizeClientPayload::NewAccount(p) => self.authorize_new_account(identity, p).await?,
            AuthorizeClientPayload::ExistingAccount(p) => {
                self.authorize_existing(identity, p).await?
            }
        }

        info!(client = %output.client_id, account = %output.account_id, "authorized client");
        Ok(ActionOutput::AuthorizeClient(output))
    }

    /// Create the account and bind the client in one commit.
    ///
    /// The actor becomes the owner client. If it authorizes a different
    /// client, that client is bound through the supplied transform key.
    async fn authorize_new_account(
        &self,
        identity: &ActingIdentity,
        payload: AuthorizeNewAccountPayload,
    ) -> HandlerResult<()> {
        let account_id = &payload.account.account_id;
        let mut batch = self.account_batch(&payload.account).await?;

        if payload.client_id == identity.client_id {
            batch = self
                .bind_client(batch, &identity.client_id, account_id, payload.crypt_transform_key)
                .await?;
        } else {
            let transform_key = payload.crypt_transform_key.ok_or_else(|| {
                ActionError::Malformed("authorizing another client needs a transform key".into())
            })?;
            batch = self
                .bind_client(batch, &identity.client_id, account_id, None)
                .await?;
            batch = self
                .bind_client(batch, &payload.client_id, account_id, Some(transform_key))
                .await?;
        }

        self.commit(batch).await
    }

    async fn authorize_existing(
        &self,
        identity: &ActingIdentity,
        payload: AuthorizeExistingPayload,
    ) -> HandlerResult<()> {
        if require_account(identity)? != &payload.account_id {
            return Err(ActionError::forbidden(format!(
                "client does not act for account {}",
                payload.account_id
            )));
        }
        if self.store.get_account(&payload.account_id).await?.is_none() {
            return Err(ActionError::not_found(format!(
                "account {}",
                payload.account_id
            )));
        }

        let batch = self
            .bind_client(
                WriteBatch::new(),
                &payload.client_id,
                &payload.account_id,
                Some(payload.crypt_transform_key),
            )
            .await?;
        self.commit(batch).await
    }

    /// Add a write binding `client_id` to `account_id`.
    ///
    /// Clients that were never seen are enrolled on the spot; their id is
    /// their signing key. Rebinding to the same account replaces the
    /// transform key. A client bound elsewhere is off limits.
    async fn bind_client(
        &self,
        batch: WriteBatch,
        client_id: &ClientId,
        account_id: &AccountId,
        crypt_transform_key: Option<String>,
    ) -> HandlerResult<WriteBatch> {
        let existing = self.store.get_client(client_id).await?;

        if let Some(bound) = existing.as_ref().and_then(|c| c.record.account_id()) {
            if bound != account_id {
                return Err(ActionError::forbidden(format!(
                    "client {client_id} is bound to another account"
                )));
            }
        }

        let binding = ClientBinding {
            account_id: account_id.clone(),
            crypt_transform_key,
        };

        Ok(match existing {
            Some(client) => {
                let mut record = client.record;
                record.binding = Some(binding);
                record.revoked = false;
                batch.update(client.version, record)
            }
            None => {
                let mut record = ClientRecord::enrolled(client_id.clone());
                record.binding = Some(binding);
                batch.insert(record)
            }
        })
    }

    pub(crate) async fn deauthorize_client(
        &self,
        identity: &ActingIdentity,
        payload: DeauthorizeClientPayload,
    ) -> HandlerResult<ActionOutput> {
        let (client_id, account_id) = match payload {
            DeauthorizeClientPayload::Client(p) => {
                if require_account(identity)? != &p.account_id {
                    return Err(ActionError::forbidden(format!(
                        "client does not act for account {}",
                        p.account_id
                    )));
                }
                (p.client_id, p.account_id)
            }
            DeauthorizeClientPayload::Current(_) => {
                let account_id = identity
                    .account_id
                    .clone()
                    .ok_or_else(|| ActionError::not_found("binding of the acting client"))?;
                (identity.client_id.clone(), account_id)
            }
        };

        let client = self
            .store
            .get_client(&client_id)
            .await?
            .filter(|c| c.record.account_id() == Some(&account_id))
            .ok_or_else(|| {
                ActionError::not_found(format!("client {client_id} on account {account_id}"))
            })?;

        let mut record = client.record;
        record.binding = None;
        record.revoked = true;
        self.commit(WriteBatch::new().update(client.version, record)).await?;

        info!(client = %client_id, account = %account_id, "deauthorized client");
        Ok(ActionOutput::DeauthorizeClient(ClientBindingPayload {
            client_id,
            account_id,
        }))
    }
}
