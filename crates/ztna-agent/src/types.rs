/*!
 * Wire types for the agent <-> backend HTTP API
 */

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state::DeviceStatus;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollRequest {
    pub code: String,
    pub device_unique_id: Uuid,
    pub fingerprint_hash: String,
    /// Hex-encoded Ed25519 public key
    pub tpm_public_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollResponse {
    pub device_id: Uuid,
    pub device_unique_id: Uuid,
    pub status: DeviceStatus,
    pub reenrolled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentStatusResponse {
    pub device_id: Uuid,
    pub device_unique_id: Uuid,
    pub status: DeviceStatus,
    pub is_compliant: bool,
    /// `key_mismatch` or `fingerprint_mismatch` when the backend has flagged
    /// the device
    pub binding_alert: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostureResponse {
    pub report_id: Uuid,
    pub device_id: Uuid,
    pub received_at: u64,
    pub is_compliant: bool,
    pub compliance_score: u8,
    pub violations: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeResponse {
    /// Hex-encoded nonce
    pub challenge: String,
    pub device_id: Uuid,
    pub expires_at: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyChallengeRequest {
    pub device_id: Uuid,
    pub challenge: String,
    /// Base64 signature
    pub signature: String,
    pub fingerprint_hash: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyChallengeResponse {
    pub verified: bool,
    pub device_id: Uuid,
    pub verified_at: u64,
}

/// Error body returned by the backend
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}
