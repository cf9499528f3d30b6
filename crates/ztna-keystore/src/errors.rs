//! Key store error types.

use thiserror::Error;

/// Key store errors
#[derive(Debug, Error)]
pub enum KeyStoreError {
    /// No key has been provisioned in the container
    #[error("Device key not found")]
    KeyNotFound,

    /// The key container or signer cannot be used right now
    #[error("Signing unavailable: {0}")]
    SigningUnavailable(String),

    /// Container files are present but malformed
    #[error("Key container corrupted: {0}")]
    Corrupted(String),

    /// Cryptographic error
    #[error("Crypto error: {0}")]
    Crypto(#[from] ztna_crypto::CryptoError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl KeyStoreError {
    /// Whether this error means re-enrollment is needed to recover
    pub fn requires_reenrollment(&self) -> bool {
        matches!(self, KeyStoreError::KeyNotFound | KeyStoreError::Corrupted(_))
    }
}

/// Result type for key store operations
pub type Result<T> = std::result::Result<T, KeyStoreError>;
