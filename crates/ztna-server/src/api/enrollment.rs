use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use ztna_devices::{BindingAlertKind, DeviceRecord, DeviceRegistry, DeviceStatus, EnrollmentRequest};

use super::helpers::parse_hex_32;
use crate::{error::ApiError, state::AppState};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct EnrollRequest {
    pub code: String,
    pub device_unique_id: Uuid,
    pub fingerprint_hash: String,
    /// Hex-encoded Ed25519 public key
    pub tpm_public_key: String,
}

#[derive(Debug, Serialize)]
pub struct EnrollResponse {
    pub device_id: Uuid,
    pub device_unique_id: Uuid,
    pub status: DeviceStatus,
    pub reenrolled: bool,
}

#[derive(Debug, Serialize)]
pub struct EnrollmentStatusResponse {
    pub device_id: Uuid,
    pub device_unique_id: Uuid,
    pub status: DeviceStatus,
    pub is_compliant: bool,
    pub binding_alert: Option<BindingAlertKind>,
}

impl From<&DeviceRecord> for EnrollmentStatusResponse {
    fn from(device: &DeviceRecord) -> Self {
        Self {
            device_id: device.id,
            device_unique_id: device.device_unique_id,
            status: device.status,
            is_compliant: device.is_compliant,
            binding_alert: device.binding_alert.map(|alert| alert.kind),
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /enrollment
pub async fn enroll_device(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EnrollRequest>,
) -> Result<Json<EnrollResponse>, ApiError> {
    let tpm_public_key = parse_hex_32(&req.tpm_public_key)?;

    let result = state
        .device_service
        .enroll(EnrollmentRequest {
            code: req.code,
            device_unique_id: req.device_unique_id,
            fingerprint_hash: req.fingerprint_hash,
            tpm_public_key,
        })
        .await?;

    Ok(Json(EnrollResponse {
        device_id: result.device.id,
        device_unique_id: result.device.device_unique_id,
        status: result.device.status,
        reenrolled: result.reenrolled,
    }))
}

/// GET /enrollment/:device_unique_id
pub async fn enrollment_status(
    State(state): State<Arc<AppState>>,
    Path(device_unique_id): Path<Uuid>,
) -> Result<Json<EnrollmentStatusResponse>, ApiError> {
    let device = state
        .device_service
        .get_device_by_unique_id(device_unique_id)
        .await?;

    Ok(Json(EnrollmentStatusResponse::from(&device)))
}
