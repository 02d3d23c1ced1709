//! Error types for the primitives providers.

use thiserror::Error;

/// Errors that can occur inside a primitives provider.
#[derive(Debug, Error)]
pub enum PrimitivesError {
    /// A key string could not be decoded.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// A ciphertext string could not be decoded.
    #[error("invalid ciphertext: {0}")]
    InvalidCiphertext(String),

    /// The transform key does not apply to the ciphertext.
    #[error("transform key mismatch: {0}")]
    TransformMismatch(String),

    /// Encryption error.
    #[error("encryption error: {0}")]
    EncryptionError(String),

    /// Decryption error.
    #[error("decryption error: {0}")]
    DecryptionError(String),

    /// A sealed value carried a bad signature.
    #[error("signature error: {0}")]
    SignatureError(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    SerializationError(String),
}

/// Result type for primitives operations.
pub type Result<T> = std::result::Result<T, PrimitivesError>;
