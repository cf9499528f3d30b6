use axum::{extract::State, response::Json};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;
use ztna_devices::{DeviceError, DeviceRegistry};

use crate::{error::ApiError, state::AppState};

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
pub struct ReadinessResponse {
    status: &'static str,
    database: &'static str,
}

/// Readiness check endpoint; touches the database
pub async fn readiness_check(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ReadinessResponse>, ApiError> {
    match state.device_service.get_device(Uuid::nil()).await {
        Ok(_) | Err(DeviceError::DeviceNotFound(_)) => {}
        Err(e) => return Err(e.into()),
    }

    Ok(Json(ReadinessResponse {
        status: "ready",
        database: "connected",
    }))
}
