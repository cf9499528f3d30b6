//! HTTP client for the ZTNA backend.

use crate::{
    errors::{AgentError, Result},
    types::*,
};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;
use ztna_posture::PostureSubmission;

/// Backend calls made by the agent
#[async_trait]
pub trait BackendClient: Send + Sync {
    async fn enroll(&self, request: &EnrollRequest) -> Result<EnrollResponse>;

    async fn enrollment_status(&self, device_unique_id: Uuid) -> Result<EnrollmentStatusResponse>;

    async fn submit_posture(&self, submission: &PostureSubmission) -> Result<PostureResponse>;

    async fn get_challenge(&self, device_id: Uuid) -> Result<ChallengeResponse>;

    async fn verify_challenge(
        &self,
        request: &VerifyChallengeRequest,
    ) -> Result<VerifyChallengeResponse>;
}

/// `reqwest` implementation of [`BackendClient`].
///
/// Every request carries the configured timeout; a timeout surfaces as
/// [`AgentError::SubmissionTimeout`].
#[derive(Debug, Clone)]
pub struct HttpBackendClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpBackendClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| AgentError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        debug!(path, "POST");
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(map_transport_error)?;
        read_response(response).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        debug!(path, "GET");
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(map_transport_error)?;
        read_response(response).await
    }
}

#[async_trait]
impl BackendClient for HttpBackendClient {
    async fn enroll(&self, request: &EnrollRequest) -> Result<EnrollResponse> {
        self.post("/enrollment", request).await
    }

    async fn enrollment_status(&self, device_unique_id: Uuid) -> Result<EnrollmentStatusResponse> {
        self.get(&format!("/enrollment/{device_unique_id}")).await
    }

    async fn submit_posture(&self, submission: &PostureSubmission) -> Result<PostureResponse> {
        self.post("/posture", submission).await
    }

    async fn get_challenge(&self, device_id: Uuid) -> Result<ChallengeResponse> {
        self.get(&format!("/challenge?device_id={device_id}")).await
    }

    async fn verify_challenge(
        &self,
        request: &VerifyChallengeRequest,
    ) -> Result<VerifyChallengeResponse> {
        self.post("/verify-challenge", request).await
    }
}

fn map_transport_error(e: reqwest::Error) -> AgentError {
    if e.is_timeout() {
        AgentError::SubmissionTimeout
    } else {
        AgentError::Transport(e.to_string())
    }
}

async fn read_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return response.json().await.map_err(|e| {
            if e.is_timeout() {
                AgentError::SubmissionTimeout
            } else {
                AgentError::Serialization(format!("invalid response body: {e}"))
            }
        });
    }

    let body = response.text().await.map_err(map_transport_error)?;
    Err(backend_error(status.as_u16(), &body))
}

/// Decode a backend error body; bodies that are not the JSON error envelope
/// (proxies, load balancers) keep their text as the message
fn backend_error(status: u16, body: &str) -> AgentError {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(parsed) => AgentError::Backend {
            status,
            code: parsed.error.code,
            message: parsed.error.message,
        },
        Err(_) => AgentError::Backend {
            status,
            code: "UNKNOWN".to_string(),
            message: body.chars().take(200).collect(),
        },
    }
}
