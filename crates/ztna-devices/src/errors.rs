//! Device registry error types.

use crate::types::DeviceStatus;
use thiserror::Error;
use uuid::Uuid;

/// Device registry errors
#[derive(Debug, Error)]
pub enum DeviceError {
    /// Enrollment code unknown or deactivated
    #[error("Enrollment code invalid")]
    CodeInvalid,

    /// Enrollment code past its expiry
    #[error("Enrollment code expired")]
    CodeExpired,

    /// Enrollment code has no uses left
    #[error("Enrollment code exhausted")]
    CodeExhausted,

    /// Device unique ID already registered and re-enrollment is disabled
    #[error("Device already enrolled: {0}")]
    DeviceAlreadyEnrolled(Uuid),

    /// Device not found
    #[error("Device not found: {0}")]
    DeviceNotFound(Uuid),

    /// Device is not active
    #[error("Device not active: status={0:?}")]
    DeviceNotActive(DeviceStatus),

    /// Lifecycle transition not permitted
    #[error("Invalid device transition: {from:?} -> {to:?}")]
    InvalidTransition { from: DeviceStatus, to: DeviceStatus },

    /// Presented fingerprint differs from the enrolled one
    #[error("Device fingerprint mismatch")]
    FingerprintMismatch,

    /// Signature failed while the fingerprint matched the enrolled one
    #[error("Device key mismatch")]
    KeyMismatch,

    /// Posture report is not newer than the latest stored report
    #[error("Posture report replayed or out of order")]
    PostureReplay,

    /// Posture report timestamped too far in the future
    #[error("Posture report timestamp in the future: {0}")]
    FutureTimestamp(u64),

    /// Request field out of range
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] ztna_storage::StorageError),

    /// Cryptographic error
    #[error("Cryptographic error: {0}")]
    Crypto(#[from] ztna_crypto::CryptoError),

    /// Posture encoding error
    #[error("Posture error: {0}")]
    Posture(#[from] ztna_posture::PostureError),
}

/// Result type for device registry operations
pub type Result<T> = std::result::Result<T, DeviceError>;
