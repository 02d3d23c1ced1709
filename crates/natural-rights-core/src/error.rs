//! Error types for Natural Rights core types.

use thiserror::Error;

/// Errors that can occur while encoding or decoding core types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed request body: {0}")]
    MalformedBody(String),

    #[error("malformed action at index {index}: {message}")]
    MalformedAction { index: usize, message: String },

    #[error("result has no payload")]
    MissingPayload,
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
