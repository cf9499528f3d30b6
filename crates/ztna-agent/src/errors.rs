//! Agent error types.

use thiserror::Error;
use ztna_keystore::KeyStoreError;

/// Backend error codes that mean the device identity no longer verifies
const IDENTITY_ERROR_CODES: [&str; 3] = ["KEY_MISMATCH", "FINGERPRINT_MISMATCH", "SIGNATURE_INVALID"];

/// Agent errors
#[derive(Debug, Error)]
pub enum AgentError {
    /// No local enrollment record
    #[error("Device is not enrolled")]
    NotEnrolled,

    /// Enrollment exists and `--force` was not given
    #[error("Device already enrolled as {0}")]
    AlreadyEnrolled(uuid::Uuid),

    /// Backend did not answer within the request timeout
    #[error("Submission timed out")]
    SubmissionTimeout,

    /// Connection-level failure talking to the backend
    #[error("Backend unreachable: {0}")]
    Transport(String),

    /// Backend answered with an error
    #[error("Backend rejected request ({status} {code}): {message}")]
    Backend {
        status: u16,
        code: String,
        message: String,
    },

    /// Hardware identifiers could not be read
    #[error("Fingerprint unavailable: {0}")]
    FingerprintUnavailable(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Local state could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Key custody error
    #[error("Key store error: {0}")]
    KeyStore(#[from] KeyStoreError),

    /// Posture encoding error
    #[error("Posture error: {0}")]
    Posture(#[from] ztna_posture::PostureError),

    /// Local state I/O
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// How the scheduler reacts to a failed cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Transient: retry after backoff
    Retry,
    /// This report is lost; carry on at the normal interval
    Skip,
    /// Identity broken: never retried early; every later cycle fails the same
    /// way until the device is re-enrolled
    Halt,
}

impl AgentError {
    pub fn disposition(&self) -> Disposition {
        match self {
            AgentError::SubmissionTimeout | AgentError::Transport(_) => Disposition::Retry,
            AgentError::Backend { status, .. } if *status >= 500 || *status == 429 => {
                Disposition::Retry
            }
            AgentError::Backend { code, .. } if IDENTITY_ERROR_CODES.contains(&code.as_str()) => {
                Disposition::Halt
            }
            AgentError::KeyStore(e) if e.requires_reenrollment() => Disposition::Halt,
            AgentError::KeyStore(KeyStoreError::SigningUnavailable(_)) => Disposition::Retry,
            AgentError::NotEnrolled => Disposition::Halt,
            _ => Disposition::Skip,
        }
    }

    /// Error code returned by the backend, if any
    pub fn backend_code(&self) -> Option<&str> {
        match self {
            AgentError::Backend { code, .. } => Some(code),
            _ => None,
        }
    }
}

/// Result type for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;
