//! Admin endpoints: enrollment codes, device approval and inspection.

use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use ztna_devices::{
    BindingAlertKind, DeviceRecord, DeviceRegistry, DeviceStatus, EnrollmentCode, LifecycleAction,
};
use ztna_posture::PostureReport;

use super::helpers::format_timestamp_rfc3339;
use crate::{error::ApiError, extractors::AdminAccess, state::AppState};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateCodeRequest {
    pub max_uses: u32,
    pub ttl_seconds: u64,
}

#[derive(Debug, Deserialize)]
pub struct AssignUserRequest {
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct DeviceInfo {
    pub device_id: Uuid,
    pub device_unique_id: Uuid,
    pub fingerprint_hash: String,
    pub tpm_public_key: String,
    pub status: DeviceStatus,
    pub is_compliant: bool,
    pub user_id: Option<Uuid>,
    pub enrolled_at: String,
    pub last_seen_at: Option<String>,
    pub binding_alert: Option<BindingAlertKind>,
    pub failed_verifications: u32,
}

impl DeviceInfo {
    fn from_record(device: &DeviceRecord) -> Result<Self, ApiError> {
        Ok(Self {
            device_id: device.id,
            device_unique_id: device.device_unique_id,
            fingerprint_hash: device.fingerprint_hash.clone(),
            tpm_public_key: hex::encode(device.tpm_public_key),
            status: device.status,
            is_compliant: device.is_compliant,
            user_id: device.user_id,
            enrolled_at: format_timestamp_rfc3339(device.enrolled_at)?,
            last_seen_at: device
                .last_seen_at
                .map(format_timestamp_rfc3339)
                .transpose()?,
            binding_alert: device.binding_alert.map(|alert| alert.kind),
            failed_verifications: device.failed_verifications,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ListDevicesResponse {
    pub devices: Vec<DeviceInfo>,
}

#[derive(Debug, Serialize)]
pub struct PostureHistoryResponse {
    pub device_id: Uuid,
    pub reports: Vec<PostureReport>,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /enrollment-codes
pub async fn create_code(
    State(state): State<Arc<AppState>>,
    _admin: AdminAccess,
    Json(req): Json<CreateCodeRequest>,
) -> Result<Json<EnrollmentCode>, ApiError> {
    let code = state
        .device_service
        .create_code(req.max_uses, req.ttl_seconds)
        .await?;

    Ok(Json(code))
}

/// POST /enrollment-codes/:code/deactivate
pub async fn deactivate_code(
    State(state): State<Arc<AppState>>,
    _admin: AdminAccess,
    Path(code): Path<String>,
) -> Result<Json<EnrollmentCode>, ApiError> {
    let code = state.device_service.deactivate_code(&code).await?;
    Ok(Json(code))
}

/// GET /devices
pub async fn list_devices(
    State(state): State<Arc<AppState>>,
    _admin: AdminAccess,
) -> Result<Json<ListDevicesResponse>, ApiError> {
    let devices = state
        .device_service
        .list_devices()
        .await?
        .iter()
        .map(DeviceInfo::from_record)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(ListDevicesResponse { devices }))
}

/// GET /devices/:device_id
pub async fn get_device(
    State(state): State<Arc<AppState>>,
    _admin: AdminAccess,
    Path(device_id): Path<Uuid>,
) -> Result<Json<DeviceInfo>, ApiError> {
    let device = state.device_service.get_device(device_id).await?;
    Ok(Json(DeviceInfo::from_record(&device)?))
}

async fn apply_action(
    state: &AppState,
    device_id: Uuid,
    action: LifecycleAction,
) -> Result<Json<DeviceInfo>, ApiError> {
    let device = state.device_service.transition(device_id, action).await?;
    Ok(Json(DeviceInfo::from_record(&device)?))
}

/// POST /devices/:device_id/approve
pub async fn approve_device(
    State(state): State<Arc<AppState>>,
    _admin: AdminAccess,
    Path(device_id): Path<Uuid>,
) -> Result<Json<DeviceInfo>, ApiError> {
    apply_action(&state, device_id, LifecycleAction::Approve).await
}

/// POST /devices/:device_id/reject
pub async fn reject_device(
    State(state): State<Arc<AppState>>,
    _admin: AdminAccess,
    Path(device_id): Path<Uuid>,
) -> Result<Json<DeviceInfo>, ApiError> {
    apply_action(&state, device_id, LifecycleAction::Reject).await
}

/// POST /devices/:device_id/deactivate
pub async fn deactivate_device(
    State(state): State<Arc<AppState>>,
    _admin: AdminAccess,
    Path(device_id): Path<Uuid>,
) -> Result<Json<DeviceInfo>, ApiError> {
    apply_action(&state, device_id, LifecycleAction::Deactivate).await
}

/// POST /devices/:device_id/user
pub async fn assign_user(
    State(state): State<Arc<AppState>>,
    _admin: AdminAccess,
    Path(device_id): Path<Uuid>,
    Json(req): Json<AssignUserRequest>,
) -> Result<Json<DeviceInfo>, ApiError> {
    let device = state
        .device_service
        .assign_user(device_id, req.user_id)
        .await?;
    Ok(Json(DeviceInfo::from_record(&device)?))
}

/// GET /devices/:device_id/posture
pub async fn posture_history(
    State(state): State<Arc<AppState>>,
    _admin: AdminAccess,
    Path(device_id): Path<Uuid>,
) -> Result<Json<PostureHistoryResponse>, ApiError> {
    let reports = state.device_service.posture_history(device_id).await?;
    Ok(Json(PostureHistoryResponse { device_id, reports }))
}
