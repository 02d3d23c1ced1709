//! Error types for the service.
//!
//! Three scopes, three types. [`AuthError`] rejects a whole request before
//! any action runs. [`ActionError`] fails one action and is reported in its
//! result slot. [`ServiceError`] is anything that prevents producing a
//! response at all.

use natural_rights_core::{CoreError, ErrorKind};
use natural_rights_primitives::PrimitivesError;
use natural_rights_store::{RecordKey, StoreError};
use thiserror::Error;

/// Errors that fail a single action.
#[derive(Debug, Error)]
pub enum ActionError {
    /// A referenced entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The entity to create already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The acting identity lacks the required capability.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The action would break a graph invariant.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// A concurrent writer changed a record this action read.
    #[error("conflict on {0}")]
    Conflict(RecordKey),

    /// The action could not be decoded.
    #[error("malformed action: {0}")]
    Malformed(String),

    /// Storage failure.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Primitives provider failure.
    #[error("primitives error: {0}")]
    Primitives(#[from] PrimitivesError),

    /// Output encoding failure.
    #[error("encoding error: {0}")]
    Encoding(#[from] CoreError),
}

impl ActionError {
    /// Machine-readable class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ActionError::NotFound(_) => ErrorKind::NotFound,
            ActionError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            ActionError::Forbidden(_) => ErrorKind::Forbidden,
            ActionError::InvariantViolation(_) => ErrorKind::InvariantViolation,
            ActionError::Conflict(_) => ErrorKind::Conflict,
            ActionError::Malformed(_) => ErrorKind::Malformed,
            ActionError::Store(_) | ActionError::Primitives(_) | ActionError::Encoding(_) => {
                ErrorKind::Internal
            }
        }
    }

    pub(crate) fn not_found(what: impl std::fmt::Display) -> Self {
        ActionError::NotFound(what.to_string())
    }

    pub(crate) fn forbidden(what: impl Into<String>) -> Self {
        ActionError::Forbidden(what.into())
    }
}

/// Result type for a single action.
pub type HandlerResult<T> = std::result::Result<T, ActionError>;

/// Errors that reject a request before any action runs.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The client is not known and enrollment is disabled.
    #[error("unknown client: {0}")]
    UnknownClient(String),

    /// The signature does not verify over the request body.
    #[error("invalid signature for client {0}")]
    InvalidSignature(String),

    /// Storage failure while resolving the client.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Primitives failure while verifying the signature.
    #[error("primitives error: {0}")]
    Primitives(#[from] PrimitivesError),
}

/// Errors that prevent the service from producing a response.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Authentication failed.
    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),

    /// The request or its body could not be decoded.
    #[error("malformed request: {0}")]
    Malformed(#[from] CoreError),

    /// The request carries more actions than allowed.
    #[error("batch of {actions} actions exceeds limit of {limit}")]
    BatchTooLarge { actions: usize, limit: usize },

    /// Storage failure outside of any action.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Primitives failure outside of any action.
    #[error("primitives error: {0}")]
    Primitives(#[from] PrimitivesError),
}

/// Result type for service operations.
pub type Result<T> = std::result::Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;
    use natural_rights_core::AccountId;

    #[test]
    fn test_error_kinds() {
        assert_eq!(ActionError::not_found("group g1").kind(), ErrorKind::NotFound);
        assert_eq!(
            ActionError::Conflict(RecordKey::account(&AccountId::from("a1"))).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            ActionError::from(StoreError::InvalidData("x".into())).kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn test_messages_are_opaque_text() {
        let err = ActionError::forbidden("not an admin of group g1");
        assert_eq!(err.to_string(), "forbidden: not an admin of group g1");
    }
}
