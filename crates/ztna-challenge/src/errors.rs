//! Challenge protocol error types.

use thiserror::Error;
use uuid::Uuid;

/// Challenge protocol errors
#[derive(Debug, Error)]
pub enum ChallengeError {
    /// Challenge past its TTL
    #[error("Challenge expired")]
    ChallengeExpired,

    /// Unknown, already consumed, or issued to another device
    #[error("Challenge not found")]
    ChallengeNotFound,

    /// Signature does not verify against the enrolled key
    #[error("Signature invalid")]
    SignatureInvalid,

    /// Valid signature but a foreign hardware fingerprint
    #[error("Device fingerprint mismatch")]
    FingerprintMismatch,

    /// Device not registered
    #[error("Device not found: {0}")]
    DeviceNotFound(Uuid),

    /// Device registry error
    #[error("Device registry error: {0}")]
    Device(ztna_devices::DeviceError),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] ztna_storage::StorageError),

    /// Cryptographic error
    #[error("Cryptographic error: {0}")]
    Crypto(#[from] ztna_crypto::CryptoError),
}

impl From<ztna_devices::DeviceError> for ChallengeError {
    fn from(error: ztna_devices::DeviceError) -> Self {
        match error {
            ztna_devices::DeviceError::DeviceNotFound(id) => ChallengeError::DeviceNotFound(id),
            other => ChallengeError::Device(other),
        }
    }
}

/// Result type for challenge operations
pub type Result<T> = std::result::Result<T, ChallengeError>;
