//! Shared harness for server integration tests.
#![allow(dead_code)]

use serde_json::{json, Value};
use std::sync::Arc;
use tokio::task::JoinHandle;
use uuid::Uuid;
use ztna_server::{create_router, AppState, Config};
use ztna_storage::RocksDbStorage;

pub const ADMIN_TOKEN: &str = "integration-admin-token";

/// Server bound to an ephemeral port over a throwaway database
pub struct TestServer {
    pub base_url: String,
    pub state: Arc<AppState>,
    client: reqwest::Client,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub async fn start() -> Self {
        Self::start_with(|_| {}).await
    }

    pub async fn start_with(configure: impl FnOnce(&mut Config)) -> Self {
        let mut config = Config::new("unused", ADMIN_TOKEN);
        configure(&mut config);
        let state = Arc::new(test_state(config));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = create_router(Arc::clone(&state));
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
            client: reqwest::Client::new(),
            handle,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn admin_post(&self, path: &str, body: Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .bearer_auth(ADMIN_TOKEN)
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    pub async fn admin_get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .bearer_auth(ADMIN_TOKEN)
            .send()
            .await
            .unwrap()
    }

    /// New enrollment code valid for an hour
    pub async fn create_code(&self, max_uses: u32) -> String {
        let response = self
            .admin_post(
                "/enrollment-codes",
                json!({ "max_uses": max_uses, "ttl_seconds": 3600 }),
            )
            .await;
        assert_eq!(response.status(), 200);
        let body: Value = response.json().await.unwrap();
        body["code"].as_str().unwrap().to_string()
    }

    pub async fn approve(&self, device_id: Uuid) {
        let response = self
            .admin_post(&format!("/devices/{device_id}/approve"), json!({}))
            .await;
        assert_eq!(response.status(), 200);
    }

    pub async fn assign_user(&self, device_id: Uuid, user_id: Uuid) {
        let response = self
            .admin_post(
                &format!("/devices/{device_id}/user"),
                json!({ "user_id": user_id }),
            )
            .await;
        assert_eq!(response.status(), 200);
    }

    /// Log a user in through the post-login hook; returns the session ID
    pub async fn login(&self, user_id: Uuid) -> String {
        let response = self
            .admin_post("/sessions", json!({ "user_id": user_id }))
            .await;
        assert_eq!(response.status(), 200);
        let body: Value = response.json().await.unwrap();
        body["session_id"].as_str().unwrap().to_string()
    }

    pub async fn decide(&self, session_id: &str, body: Value) -> reqwest::Response {
        self.client
            .post(self.url("/access/decision"))
            .bearer_auth(session_id)
            .json(&body)
            .send()
            .await
            .unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// App state over a temporary database
pub fn test_state(config: Config) -> AppState {
    let storage = Arc::new(RocksDbStorage::open_test().unwrap());
    AppState::with_storage(config, storage)
}
