//! # ztna-server
//!
//! HTTP surface of the ZTNA control plane: device enrollment, posture intake,
//! challenge-response, access decisions and user sessions.

#![warn(clippy::all)]

pub mod api;
pub mod config;
pub mod error;
pub mod extractors;
pub mod state;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};
use ztna_challenge::ChallengeProtocol;

pub use config::Config;
pub use state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health checks
        .route("/health", get(api::health::health_check))
        .route("/ready", get(api::health::readiness_check))

        // Agent: enrollment and posture
        .route("/enrollment", post(api::enrollment::enroll_device))
        .route(
            "/enrollment/:device_unique_id",
            get(api::enrollment::enrollment_status),
        )
        .route("/posture", post(api::posture::submit_posture))

        // Challenge-response
        .route("/challenge", get(api::challenge::get_challenge))
        .route("/verify-challenge", post(api::challenge::verify_challenge))

        // Policy decisions
        .route("/access/decision", post(api::access::decide))

        // Sessions
        .route("/sessions", post(api::sessions::create_session))
        .route("/sessions/revoke", post(api::sessions::revoke_session))

        // Admin
        .route("/enrollment-codes", post(api::devices::create_code))
        .route(
            "/enrollment-codes/:code/deactivate",
            post(api::devices::deactivate_code),
        )
        .route("/devices", get(api::devices::list_devices))
        .route("/devices/:device_id", get(api::devices::get_device))
        .route("/devices/:device_id/approve", post(api::devices::approve_device))
        .route("/devices/:device_id/reject", post(api::devices::reject_device))
        .route(
            "/devices/:device_id/deactivate",
            post(api::devices::deactivate_device),
        )
        .route("/devices/:device_id/user", post(api::devices::assign_user))
        .route(
            "/devices/:device_id/posture",
            get(api::devices::posture_history),
        )

        // Add middleware
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Periodically delete expired challenges
pub fn spawn_challenge_purge(state: Arc<AppState>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            match state.challenge_service.purge_expired().await {
                Ok(0) => {}
                Ok(purged) => tracing::debug!(purged, "Expired challenges purged"),
                Err(e) => tracing::warn!(error = %e, "Challenge purge failed"),
            }
        }
    })
}
