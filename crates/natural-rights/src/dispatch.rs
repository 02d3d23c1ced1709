//! Ordered execution of an action batch.
//!
//! Actions run one at a time in request order. Each one commits on its own,
//! so a later action sees every write of the earlier ones, and a failure
//! only fills its own result slot. There is no batch-level rollback.

use tracing::{debug, info_span, warn, Instrument};

use natural_rights_core::{decode_action, raw_action_type, ActionResult, ErrorKind};
use natural_rights_primitives::Primitives;
use natural_rights_store::GraphStore;

use crate::auth::{resolve_identity, ActingIdentity};
use crate::handlers::ActionHandlers;

/// Runs decoded batches through the handlers.
pub struct ActionDispatcher<S, P> {
    handlers: ActionHandlers<S, P>,
}

impl<S: GraphStore, P: Primitives> ActionDispatcher<S, P> {
    pub fn new(handlers: ActionHandlers<S, P>) -> Self {
        Self { handlers }
    }

    pub fn handlers(&self) -> &ActionHandlers<S, P> {
        &self.handlers
    }

    /// Run every action in `raw_actions` and return one result per action.
    ///
    /// Actions that bind or unbind the acting client refresh `identity` for
    /// the rest of the batch.
    pub async fn dispatch(
        &self,
        identity: ActingIdentity,
        raw_actions: Vec<serde_json::Value>,
    ) -> Vec<ActionResult> {
        let mut identity = identity;
        let mut results = Vec::with_capacity(raw_actions.len());

        for (index, raw) in raw_actions.into_iter().enumerate() {
            let action = match decode_action(index, raw.clone()) {
                Ok(action) => action,
                Err(e) => {
                    debug!(index, error = %e, "malformed action");
                    results.push(ActionResult::failure(
                        raw_action_type(&raw),
                        ErrorKind::Malformed,
                        e.to_string(),
                        raw.get("payload").cloned().unwrap_or_default(),
                    ));
                    continue;
                }
            };

            let action_type = action.action_type();
            let payload = action.payload_value();
            let span = info_span!("action", index, action_type = ?action_type);

            let outcome = self
                .handlers
                .handle(&identity, action)
                .instrument(span)
                .await;

            let result = match outcome {
                Ok(output) => match output.into_result() {
                    Ok(result) => {
                        if action_type.rebinds_identity() {
                            identity = self.refresh(identity).await;
                        }
                        result
                    }
                    Err(e) => ActionResult::failure(
                        action_type,
                        ErrorKind::Internal,
                        e.to_string(),
                        payload,
                    ),
                },
                Err(e) => {
                    let kind = e.kind();
                    if kind == ErrorKind::Internal {
                        warn!(index, ?action_type, error = %e, "action failed");
                    } else {
                        debug!(index, ?action_type, error = %e, "action rejected");
                    }
                    ActionResult::failure(action_type, kind, e.to_string(), payload)
                }
            };
            results.push(result);
        }

        results
    }

    /// Re-read the acting client's binding after it changed.
    ///
    /// A failed read keeps the old identity; the next action will hit the
    /// same store and report the failure itself.
    async fn refresh(&self, identity: ActingIdentity) -> ActingIdentity {
        match resolve_identity(self.handlers.store().as_ref(), &identity.client_id).await {
            Ok(fresh) => fresh,
            Err(e) => {
                warn!(client = %identity.client_id, error = %e, "could not refresh identity");
                identity
            }
        }
    }
}
