//! The service entry point.

use std::sync::Arc;

use tracing::{debug, info};

use natural_rights_core::{decode_actions, KeyPair, Request, Response};
use natural_rights_primitives::Primitives;
use natural_rights_store::GraphStore;

use crate::auth::RequestAuthenticator;
use crate::config::ServiceConfig;
use crate::dispatch::ActionDispatcher;
use crate::error::{Result, ServiceError};
use crate::handlers::ActionHandlers;

/// A Natural Rights service over a graph store and a primitives provider.
///
/// Holds no per-request state. Concurrent requests are safe as far as the
/// store's optimistic commits make them so.
pub struct NaturalRightsService<S, P> {
    authenticator: RequestAuthenticator<S, P>,
    dispatcher: ActionDispatcher<S, P>,
    config: ServiceConfig,
}

impl<S: GraphStore, P: Primitives> NaturalRightsService<S, P> {
    /// Create a service with a freshly generated signing key.
    pub async fn new(store: S, primitives: P, config: ServiceConfig) -> Result<Self> {
        let sign_keypair = primitives.sign_key_gen().await?;
        Ok(Self::with_sign_keypair(store, primitives, sign_keypair, config))
    }

    /// Create a service that signs with an existing key pair.
    pub fn with_sign_keypair(
        store: S,
        primitives: P,
        sign_keypair: KeyPair,
        config: ServiceConfig,
    ) -> Self {
        let store = Arc::new(store);
        let primitives = Arc::new(primitives);

        let authenticator =
            RequestAuthenticator::new(store.clone(), primitives.clone(), config.clone());
        let handlers = ActionHandlers::new(store, primitives, sign_keypair, config.clone());

        Self {
            authenticator,
            dispatcher: ActionDispatcher::new(handlers),
            config,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        self.dispatcher.handlers().store()
    }

    /// Public key of the service's signing key.
    pub fn sign_pub_key(&self) -> &str {
        self.dispatcher.handlers().sign_pub_key()
    }

    /// Authenticate a request and run its actions.
    ///
    /// An error means no action ran. Once the batch is running, action
    /// failures are reported in their result slots and the call succeeds.
    pub async fn handle_request(&self, request: &Request) -> Result<Response> {
        let identity = self.authenticator.authenticate(request).await?;

        let raw_actions = decode_actions(&request.body)?;
        if raw_actions.len() > self.config.max_actions_per_request {
            return Err(ServiceError::BatchTooLarge {
                actions: raw_actions.len(),
                limit: self.config.max_actions_per_request,
            });
        }

        debug!(client = %identity.client_id, actions = raw_actions.len(), "dispatching batch");
        let results = self.dispatcher.dispatch(identity, raw_actions).await;

        let response = Response { results };
        info!(
            client = %request.client_id,
            actions = response.results.len(),
            ok = response.all_succeeded(),
            "handled request"
        );
        Ok(response)
    }

    /// Same as [`handle_request`](Self::handle_request) over JSON text.
    pub async fn handle_json(&self, request: &str) -> Result<String> {
        let request: Request = serde_json::from_str(request)
            .map_err(|e| ServiceError::Malformed(e.into()))?;
        let response = self.handle_request(&request).await?;
        serde_json::to_string(&response).map_err(|e| ServiceError::Malformed(e.into()))
    }
}
