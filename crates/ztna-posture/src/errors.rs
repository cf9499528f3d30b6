//! Posture error types.

use thiserror::Error;

/// Posture errors
#[derive(Debug, Error)]
pub enum PostureError {
    /// Payload could not be encoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Signature encoding or verification error
    #[error("Crypto error: {0}")]
    Crypto(#[from] ztna_crypto::CryptoError),
}

/// Result type for posture operations
pub type Result<T> = std::result::Result<T, PostureError>;
