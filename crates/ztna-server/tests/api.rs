//! Router-level tests: authentication guards and the error envelope.

mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;
use ztna_server::{create_router, Config};

use common::{test_state, ADMIN_TOKEN};

fn app() -> Router {
    create_router(Arc::new(test_state(Config::new("unused", ADMIN_TOKEN))))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn post_json(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::post(uri).header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn test_health_and_readiness() {
    let app = app();

    let (status, body) = send(app.clone(), Request::get("/health").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, _) = send(app, Request::get("/ready").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_admin_endpoints_require_token() {
    let app = app();
    let body = json!({ "max_uses": 1, "ttl_seconds": 60 });

    let (status, error) = send(app.clone(), post_json("/enrollment-codes", None, body.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error["error"]["code"], "UNAUTHORIZED");

    let (status, _) = send(
        app.clone(),
        post_json("/enrollment-codes", Some("wrong-token"), body.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, code) = send(app, post_json("/enrollment-codes", Some(ADMIN_TOKEN), body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(code["max_uses"], 1);
    assert_eq!(code["uses_count"], 0);
}

#[tokio::test]
async fn test_decision_requires_live_session() {
    let app = app();
    let body = json!({ "resource": "wiki" });

    let (status, _) = send(app.clone(), post_json("/access/decision", None, body.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let unknown = Uuid::new_v4().to_string();
    let (status, error) = send(app, post_json("/access/decision", Some(&unknown), body)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_superseded_session_is_rejected() {
    let app = app();
    let user_id = Uuid::new_v4();

    let (_, first) = send(
        app.clone(),
        post_json("/sessions", Some(ADMIN_TOKEN), json!({ "user_id": user_id })),
    )
    .await;
    let (_, second) = send(
        app.clone(),
        post_json("/sessions", Some(ADMIN_TOKEN), json!({ "user_id": user_id })),
    )
    .await;
    let first = first["session_id"].as_str().unwrap();
    let second = second["session_id"].as_str().unwrap();

    let body = json!({ "resource": "wiki" });
    let (status, _) = send(app.clone(), post_json("/access/decision", Some(first), body.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // The survivor gets a decision: no device, so the agent is not reporting
    let (status, decision) = send(app, post_json("/access/decision", Some(second), body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decision["allowed"], false);
    assert_eq!(decision["risk_level"], "high");
    assert_eq!(decision["reason"], "agent not reporting");
}

#[tokio::test]
async fn test_revoked_session_is_rejected() {
    let app = app();
    let (_, session) = send(
        app.clone(),
        post_json("/sessions", Some(ADMIN_TOKEN), json!({ "user_id": Uuid::new_v4() })),
    )
    .await;
    let session = session["session_id"].as_str().unwrap();

    let (status, _) = send(app.clone(), post_json("/sessions/revoke", Some(session), json!({}))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(
        app,
        post_json("/access/decision", Some(session), json!({ "resource": "wiki" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_enrollment_error_envelope() {
    let app = app();

    let (status, error) = send(
        app.clone(),
        post_json(
            "/enrollment",
            None,
            json!({
                "code": "does-not-exist",
                "device_unique_id": Uuid::new_v4(),
                "fingerprint_hash": "ab".repeat(32),
                "tpm_public_key": "11".repeat(32),
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error["error"]["code"], "CODE_INVALID");
    assert!(error["error"]["message"].is_string());

    let (status, error) = send(
        app,
        post_json(
            "/enrollment",
            None,
            json!({
                "code": "does-not-exist",
                "device_unique_id": Uuid::new_v4(),
                "fingerprint_hash": "ab".repeat(32),
                "tpm_public_key": "not-hex",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"]["code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn test_challenge_for_unknown_device() {
    let uri = format!("/challenge?device_id={}", Uuid::new_v4());
    let (status, error) = send(app(), Request::get(uri).body(Body::empty()).unwrap()).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_empty_resource_is_rejected() {
    let app = app();
    let (_, session) = send(
        app.clone(),
        post_json("/sessions", Some(ADMIN_TOKEN), json!({ "user_id": Uuid::new_v4() })),
    )
    .await;
    let session = session["session_id"].as_str().unwrap();

    let (status, error) = send(
        app,
        post_json("/access/decision", Some(session), json!({ "resource": "  " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"]["code"], "INVALID_REQUEST");
}
