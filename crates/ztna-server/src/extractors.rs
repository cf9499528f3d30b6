use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use std::sync::Arc;
use uuid::Uuid;
use ztna_crypto::constant_time_compare;
use ztna_sessions::{Session, SessionManager};

use crate::{error::ApiError, state::AppState};

fn bearer_token(parts: &Parts) -> Result<&str, ApiError> {
    parts
        .headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .ok_or(ApiError::Unauthorized)
}

/// Extractor for requests carrying a live user session
///
/// The bearer token is the session ID handed out by `POST /sessions`. An
/// unknown or invalidated session is rejected before the handler runs.
pub struct AuthenticatedSession {
    pub session: Session,
}

impl AuthenticatedSession {
    pub fn user_id(&self) -> Uuid {
        self.session.user_id
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthenticatedSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let session_id = Uuid::parse_str(bearer_token(parts)?).map_err(|_| ApiError::Unauthorized)?;

        let session = state
            .session_service
            .validate_session(session_id)
            .await
            .map_err(|e| {
                tracing::warn!(session_id = %session_id, "Session rejected: {}", e);
                ApiError::from(e)
            })?;

        Ok(AuthenticatedSession { session })
    }
}

/// Extractor for admin endpoints, guarded by the static admin token
pub struct AdminAccess;

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AdminAccess {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;

        if !constant_time_compare(token.as_bytes(), state.config.admin_token.as_bytes()) {
            tracing::warn!("Admin token rejected");
            return Err(ApiError::Unauthorized);
        }

        Ok(AdminAccess)
    }
}
