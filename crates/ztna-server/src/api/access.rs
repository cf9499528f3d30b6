use axum::{extract::State, response::Json};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use ztna_policy::{DecisionPoint, DecisionRequest, PolicyDecision, StepUpProof};

use super::helpers::parse_signature;
use crate::{error::ApiError, extractors::AuthenticatedSession, state::AppState};

#[derive(Debug, Deserialize)]
pub struct AccessDecisionRequest {
    pub resource: String,
    #[serde(default)]
    pub context: AccessContext,
}

/// Request context supplied by the gateway
#[derive(Debug, Default, Deserialize)]
pub struct AccessContext {
    pub device_id: Option<Uuid>,
    pub step_up: Option<StepUpAnswer>,
}

/// Signed answer to a challenge fetched for this device
#[derive(Debug, Deserialize)]
pub struct StepUpAnswer {
    pub challenge: String,
    /// Base64 signature
    pub signature: String,
    pub fingerprint_hash: Option<String>,
}

/// POST /access/decision
///
/// Always answers with a decision; denials carry their reason.
pub async fn decide(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedSession,
    Json(req): Json<AccessDecisionRequest>,
) -> Result<Json<PolicyDecision>, ApiError> {
    if req.resource.trim().is_empty() {
        return Err(ApiError::InvalidRequest("resource is required".to_string()));
    }

    let step_up = match req.context.step_up {
        Some(answer) => Some(StepUpProof {
            challenge: answer.challenge,
            signature: parse_signature(&answer.signature)?,
            fingerprint_hash: answer.fingerprint_hash,
        }),
        None => None,
    };

    let decision = state
        .decision_point
        .decide(DecisionRequest {
            user_id: auth.user_id(),
            resource: req.resource,
            device_id: req.context.device_id,
            step_up,
        })
        .await;

    Ok(Json(decision))
}
