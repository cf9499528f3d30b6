use axum::{extract::State, response::Json};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;
use ztna_devices::DeviceRegistry;
use ztna_posture::PostureSubmission;

use crate::{error::ApiError, state::AppState};

#[derive(Debug, Serialize)]
pub struct PostureResponse {
    pub report_id: Uuid,
    pub device_id: Uuid,
    pub received_at: u64,
    /// Server verdict; overrides the agent's own
    pub is_compliant: bool,
    pub compliance_score: u8,
    pub violations: Vec<String>,
}

/// POST /posture
///
/// Non-compliant reports are accepted and stored; only signature, binding,
/// status and replay failures are rejected.
pub async fn submit_posture(
    State(state): State<Arc<AppState>>,
    Json(submission): Json<PostureSubmission>,
) -> Result<Json<PostureResponse>, ApiError> {
    let accepted = state.device_service.submit_posture(submission).await?;
    let report = accepted.report;

    Ok(Json(PostureResponse {
        report_id: report.report_id,
        device_id: report.device_id,
        received_at: report.received_at,
        is_compliant: report.is_compliant,
        compliance_score: report.compliance_score,
        violations: report.violations,
    }))
}
