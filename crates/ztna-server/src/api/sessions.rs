use axum::{extract::State, http::StatusCode, response::Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use ztna_sessions::SessionManager;

use crate::{
    error::ApiError,
    extractors::{AdminAccess, AuthenticatedSession},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub user_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub user_id: Uuid,
    pub issued_at: u64,
}

/// POST /sessions
///
/// Post-login hook, called by the identity-provider callback once the user is
/// authenticated. Any previous session of the user stops being live.
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    _admin: AdminAccess,
    Json(req): Json<CreateSessionRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = state.session_service.create_session(req.user_id).await?;

    Ok(Json(SessionResponse {
        session_id: session.session_id,
        user_id: session.user_id,
        issued_at: session.issued_at,
    }))
}

/// POST /sessions/revoke
pub async fn revoke_session(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedSession,
) -> Result<StatusCode, ApiError> {
    state
        .session_service
        .revoke_session(auth.session.session_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
