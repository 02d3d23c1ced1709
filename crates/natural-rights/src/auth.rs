//! Request authentication.
//!
//! A request names a client and carries a signature over its body. The
//! client's current signing public key comes from the graph; for a client
//! the graph has never seen, the id itself is the key.

use std::sync::Arc;

use tracing::{debug, info};

use natural_rights_core::{AccountId, ClientId, Request};
use natural_rights_primitives::Primitives;
use natural_rights_store::{
    ClientRecord, CommitResult, GraphStore, GraphStoreExt, StoreError, WriteBatch,
};

use crate::config::ServiceConfig;
use crate::error::AuthError;

/// Who is acting for the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActingIdentity {
    pub client_id: ClientId,

    /// The account the client is bound to, if any.
    pub account_id: Option<AccountId>,
}

impl ActingIdentity {
    pub fn unbound(client_id: ClientId) -> Self {
        Self {
            client_id,
            account_id: None,
        }
    }

    fn of(client: &ClientRecord) -> Self {
        Self {
            client_id: client.id.clone(),
            account_id: client.account_id().cloned(),
        }
    }
}

/// Resolve the current identity of a client from the graph.
///
/// Unknown clients resolve as unbound.
pub async fn resolve_identity<S: GraphStore + ?Sized>(
    store: &S,
    client_id: &ClientId,
) -> Result<ActingIdentity, StoreError> {
    Ok(match store.get_client(client_id).await? {
        Some(client) => ActingIdentity::of(&client.record),
        None => ActingIdentity::unbound(client_id.clone()),
    })
}

/// Verifies request signatures and resolves the acting identity.
pub struct RequestAuthenticator<S, P> {
    store: Arc<S>,
    primitives: Arc<P>,
    config: ServiceConfig,
}

impl<S: GraphStore, P: Primitives> RequestAuthenticator<S, P> {
    pub fn new(store: Arc<S>, primitives: Arc<P>, config: ServiceConfig) -> Self {
        Self {
            store,
            primitives,
            config,
        }
    }

    /// Authenticate a request.
    ///
    /// Runs once per request, before any action. The signature is checked
    /// over `request.body` exactly as received.
    pub async fn authenticate(&self, request: &Request) -> Result<ActingIdentity, AuthError> {
        let client_id = &request.client_id;
        let existing = self.store.get_client(client_id).await?;

        let sign_pub_key = match &existing {
            Some(client) => client.record.sign_pub_key.as_str(),
            None if self.config.enroll_unknown_clients => client_id.as_str(),
            None => return Err(AuthError::UnknownClient(client_id.to_string())),
        };

        let valid = self
            .primitives
            .verify(sign_pub_key, &request.signature, &request.body)
            .await?;
        if !valid {
            debug!(client = %client_id, "signature rejected");
            return Err(AuthError::InvalidSignature(client_id.to_string()));
        }

        match existing {
            Some(client) => Ok(ActingIdentity::of(&client.record)),
            None => self.enroll(client_id).await,
        }
    }

    /// Register a new unbound client.
    async fn enroll(&self, client_id: &ClientId) -> Result<ActingIdentity, AuthError> {
        let client = ClientRecord::enrolled(client_id.clone());
        let batch = WriteBatch::new().insert(client);

        match self.store.commit(batch).await? {
            CommitResult::Committed => {
                info!(client = %client_id, "enrolled client");
                Ok(ActingIdentity::unbound(client_id.clone()))
            }
            CommitResult::Conflict { .. } => {
                // Someone else enrolled it first.
                Ok(resolve_identity(self.store.as_ref(), client_id).await?)
            }
        }
    }
}
