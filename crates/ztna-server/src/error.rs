use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use ztna_challenge::ChallengeError;
use ztna_devices::{DeviceError, DeviceStatus};
use ztna_sessions::SessionError;

/// API error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
}

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Enrollment code invalid")]
    CodeInvalid,

    #[error("Enrollment code expired")]
    CodeExpired,

    #[error("Enrollment code exhausted")]
    CodeExhausted,

    #[error("Device not active: {0:?}")]
    DeviceNotActive(DeviceStatus),

    #[error("Key mismatch")]
    KeyMismatch,

    #[error("Fingerprint mismatch")]
    FingerprintMismatch,

    #[error("Posture replay")]
    PostureReplay,

    #[error("Challenge expired")]
    ChallengeExpired,

    #[error("Challenge not found")]
    ChallengeNotFound,

    #[error("Invalid signature")]
    SignatureInvalid,

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    /// Stable machine-readable code of this error
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidRequest(_) => "INVALID_REQUEST",
            ApiError::Unauthorized => "UNAUTHORIZED",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::CodeInvalid => "CODE_INVALID",
            ApiError::CodeExpired => "CODE_EXPIRED",
            ApiError::CodeExhausted => "CODE_EXHAUSTED",
            ApiError::DeviceNotActive(_) => "DEVICE_NOT_ACTIVE",
            ApiError::KeyMismatch => "KEY_MISMATCH",
            ApiError::FingerprintMismatch => "FINGERPRINT_MISMATCH",
            ApiError::PostureReplay => "POSTURE_REPLAY",
            ApiError::ChallengeExpired => "CHALLENGE_EXPIRED",
            ApiError::ChallengeNotFound => "CHALLENGE_NOT_FOUND",
            ApiError::SignatureInvalid => "SIGNATURE_INVALID",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidRequest(_) | ApiError::ChallengeExpired => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized
            | ApiError::KeyMismatch
            | ApiError::FingerprintMismatch
            | ApiError::SignatureInvalid => StatusCode::UNAUTHORIZED,
            ApiError::CodeInvalid
            | ApiError::CodeExpired
            | ApiError::CodeExhausted
            | ApiError::DeviceNotActive(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) | ApiError::ChallengeNotFound => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) | ApiError::PostureReplay => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::InvalidRequest(msg) | ApiError::NotFound(msg) | ApiError::Conflict(msg) => {
                msg.clone()
            }
            ApiError::Unauthorized => "Missing or invalid credentials".to_string(),
            ApiError::CodeInvalid => "Enrollment code is not valid".to_string(),
            ApiError::CodeExpired => "Enrollment code has expired".to_string(),
            ApiError::CodeExhausted => "Enrollment code has no uses left".to_string(),
            ApiError::DeviceNotActive(status) => {
                format!("Device is not active (status: {})", status.as_str())
            }
            ApiError::KeyMismatch => "Signature does not match the enrolled device key".to_string(),
            ApiError::FingerprintMismatch => {
                "Device fingerprint changed; re-enrollment required".to_string()
            }
            ApiError::PostureReplay => {
                "Posture report is not newer than the last accepted report".to_string()
            }
            ApiError::ChallengeExpired => "Challenge has expired".to_string(),
            ApiError::ChallengeNotFound => "Challenge is unknown or already used".to_string(),
            ApiError::SignatureInvalid => "Cryptographic signature is invalid".to_string(),
            ApiError::Internal(_) => "An internal error occurred".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(err) = &self {
            tracing::error!("Internal error: {:?}", err);
        }

        let body = Json(ErrorResponse {
            error: ErrorDetails {
                code: self.code().to_string(),
                message: self.message(),
            },
        });

        (self.status(), body).into_response()
    }
}

impl From<DeviceError> for ApiError {
    fn from(error: DeviceError) -> Self {
        match error {
            DeviceError::CodeInvalid => ApiError::CodeInvalid,
            DeviceError::CodeExpired => ApiError::CodeExpired,
            DeviceError::CodeExhausted => ApiError::CodeExhausted,
            DeviceError::DeviceAlreadyEnrolled(_) => ApiError::Conflict(error.to_string()),
            DeviceError::DeviceNotFound(_) => ApiError::NotFound(error.to_string()),
            DeviceError::DeviceNotActive(status) => ApiError::DeviceNotActive(status),
            DeviceError::InvalidTransition { .. } => ApiError::Conflict(error.to_string()),
            DeviceError::FingerprintMismatch => ApiError::FingerprintMismatch,
            DeviceError::KeyMismatch => ApiError::KeyMismatch,
            DeviceError::PostureReplay => ApiError::PostureReplay,
            DeviceError::FutureTimestamp(_) | DeviceError::InvalidRequest(_) => {
                ApiError::InvalidRequest(error.to_string())
            }
            DeviceError::Crypto(_) | DeviceError::Posture(_) => {
                ApiError::InvalidRequest(error.to_string())
            }
            DeviceError::Storage(_) => ApiError::Internal(anyhow::anyhow!(error)),
        }
    }
}

impl From<ChallengeError> for ApiError {
    fn from(error: ChallengeError) -> Self {
        match error {
            ChallengeError::ChallengeExpired => ApiError::ChallengeExpired,
            ChallengeError::ChallengeNotFound => ApiError::ChallengeNotFound,
            ChallengeError::SignatureInvalid => ApiError::SignatureInvalid,
            ChallengeError::FingerprintMismatch => ApiError::FingerprintMismatch,
            ChallengeError::DeviceNotFound(_) => ApiError::NotFound(error.to_string()),
            ChallengeError::Device(inner) => inner.into(),
            ChallengeError::Storage(_) | ChallengeError::Crypto(_) => {
                ApiError::Internal(anyhow::anyhow!(error))
            }
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(error: SessionError) -> Self {
        match error {
            SessionError::SessionNotFound(_) | SessionError::SessionExpired { .. } => {
                ApiError::Unauthorized
            }
            SessionError::SessionOwnerMismatch { .. } => ApiError::InvalidRequest(error.to_string()),
            SessionError::Storage(_) => ApiError::Internal(anyhow::anyhow!(error)),
        }
    }
}
