use axum::{
    extract::{Query, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use ztna_challenge::{ChallengeProtocol, VerifyRequest};

use super::helpers::parse_signature;
use crate::{error::ApiError, state::AppState};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ChallengeQuery {
    pub device_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct ChallengeResponse {
    /// Hex-encoded nonce
    pub challenge: String,
    pub device_id: Uuid,
    pub expires_at: u64,
}

#[derive(Debug, Deserialize)]
pub struct VerifyChallengeRequest {
    pub device_id: Uuid,
    pub challenge: String,
    /// Base64 Ed25519 signature over the canonical challenge message
    pub signature: String,
    pub fingerprint_hash: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VerifyChallengeResponse {
    pub verified: bool,
    pub device_id: Uuid,
    pub verified_at: u64,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /challenge?device_id=
pub async fn get_challenge(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ChallengeQuery>,
) -> Result<Json<ChallengeResponse>, ApiError> {
    let challenge = state
        .challenge_service
        .issue_challenge(query.device_id)
        .await?;

    Ok(Json(ChallengeResponse {
        challenge: challenge.value,
        device_id: challenge.device_id,
        expires_at: challenge.expires_at,
    }))
}

/// POST /verify-challenge
pub async fn verify_challenge(
    State(state): State<Arc<AppState>>,
    Json(req): Json<VerifyChallengeRequest>,
) -> Result<Json<VerifyChallengeResponse>, ApiError> {
    let signature = parse_signature(&req.signature)?;

    let result = state
        .challenge_service
        .verify(VerifyRequest {
            device_id: req.device_id,
            challenge: req.challenge,
            signature,
            fingerprint_hash: req.fingerprint_hash,
        })
        .await?;

    Ok(Json(VerifyChallengeResponse {
        verified: true,
        device_id: result.device_id,
        verified_at: result.verified_at,
    }))
}
