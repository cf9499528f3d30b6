//! Test helpers for agent tests.

use crate::{
    agent::Agent,
    client::BackendClient,
    collector::{Collector, StaticFactSource},
    config::AgentConfig,
    errors::{AgentError, Result},
    fingerprint::StaticFingerprintSource,
    state::{DeviceStatus, LocalState},
    types::*,
};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use uuid::Uuid;
use ztna_crypto::{
    canonicalize_challenge, current_timestamp, decode_base64, sign_message, verify_signature_slice,
    DeviceSigningKey, PUBLIC_KEY_SIZE, SIGNATURE_SIZE,
};
use ztna_keystore::{KeyCustody, KeyHandle, KeyStatus, KeyStore, KeyStoreError};
use ztna_posture::{PostureFacts, PostureSubmission};

/// Key store holding the key in memory
#[derive(Default)]
pub struct MemoryKeyStore {
    key: Mutex<Option<DeviceSigningKey>>,
}

#[async_trait]
impl KeyStore for MemoryKeyStore {
    async fn ensure_key_exists(&self) -> ztna_keystore::Result<KeyHandle> {
        let mut slot = self.key.lock().unwrap();
        let created = slot.is_none();
        if created {
            *slot = Some(DeviceSigningKey::generate().unwrap());
        }
        let public_key = slot.as_ref().map(|k| k.public_key_bytes()).unwrap();
        Ok(KeyHandle {
            container: "memory".to_string(),
            public_key,
            created,
        })
    }

    async fn sign(&self, payload: &[u8]) -> ztna_keystore::Result<[u8; SIGNATURE_SIZE]> {
        let slot = self.key.lock().unwrap();
        let key = slot.as_ref().ok_or(KeyStoreError::KeyNotFound)?;
        Ok(sign_message(key, payload))
    }

    async fn public_key(&self) -> ztna_keystore::Result<[u8; PUBLIC_KEY_SIZE]> {
        let slot = self.key.lock().unwrap();
        slot.as_ref()
            .map(|k| k.public_key_bytes())
            .ok_or(KeyStoreError::KeyNotFound)
    }

    async fn status(&self) -> ztna_keystore::Result<KeyStatus> {
        Ok(KeyStatus {
            exists: self.key.lock().unwrap().is_some(),
        })
    }

    async fn delete(&self) -> ztna_keystore::Result<bool> {
        Ok(self.key.lock().unwrap().take().is_some())
    }
}

/// What the fake backend has seen
#[derive(Default)]
pub struct BackendLog {
    pub enrollments: Vec<EnrollRequest>,
    pub submissions: Vec<PostureSubmission>,
    pub verifications: Vec<VerifyChallengeRequest>,
    pub public_key: Option<[u8; PUBLIC_KEY_SIZE]>,
    pub issued_nonce: Option<[u8; 32]>,
}

/// Backend double: accepts everything and checks signatures against the
/// enrolled key
pub struct FakeBackend {
    pub device_id: Uuid,
    pub status: Mutex<DeviceStatus>,
    pub log: Mutex<BackendLog>,
    /// Delay applied to posture submissions
    pub submit_delay: Duration,
}

impl FakeBackend {
    pub fn new(status: DeviceStatus) -> Self {
        Self {
            device_id: Uuid::new_v4(),
            status: Mutex::new(status),
            log: Mutex::new(BackendLog::default()),
            submit_delay: Duration::ZERO,
        }
    }

    pub fn set_status(&self, status: DeviceStatus) {
        *self.status.lock().unwrap() = status;
    }

    fn rejected(code: &str) -> AgentError {
        AgentError::Backend {
            status: 401,
            code: code.to_string(),
            message: "rejected by fake backend".to_string(),
        }
    }
}

#[async_trait]
impl BackendClient for FakeBackend {
    async fn enroll(&self, request: &EnrollRequest) -> Result<EnrollResponse> {
        let mut log = self.log.lock().unwrap();
        let public_key: [u8; PUBLIC_KEY_SIZE] = hex::decode(&request.tpm_public_key)
            .unwrap()
            .try_into()
            .unwrap();
        let reenrolled = log
            .enrollments
            .iter()
            .any(|e| e.device_unique_id == request.device_unique_id);
        log.public_key = Some(public_key);
        log.enrollments.push(request.clone());

        Ok(EnrollResponse {
            device_id: self.device_id,
            device_unique_id: request.device_unique_id,
            status: *self.status.lock().unwrap(),
            reenrolled,
        })
    }

    async fn enrollment_status(&self, device_unique_id: Uuid) -> Result<EnrollmentStatusResponse> {
        Ok(EnrollmentStatusResponse {
            device_id: self.device_id,
            device_unique_id,
            status: *self.status.lock().unwrap(),
            is_compliant: false,
            binding_alert: None,
        })
    }

    async fn submit_posture(&self, submission: &PostureSubmission) -> Result<PostureResponse> {
        if !self.submit_delay.is_zero() {
            tokio::time::sleep(self.submit_delay).await;
        }

        let mut log = self.log.lock().unwrap();
        let public_key = log.public_key.ok_or_else(|| Self::rejected("DEVICE_NOT_FOUND"))?;
        submission
            .verify(&public_key)
            .map_err(|_| Self::rejected("SIGNATURE_INVALID"))?;
        log.submissions.push(submission.clone());

        Ok(PostureResponse {
            report_id: Uuid::new_v4(),
            device_id: self.device_id,
            received_at: current_timestamp(),
            is_compliant: submission.agent_result.is_compliant,
            compliance_score: submission.agent_result.compliance_score,
            violations: submission.agent_result.violations.clone(),
        })
    }

    async fn get_challenge(&self, device_id: Uuid) -> Result<ChallengeResponse> {
        let nonce = [0x5au8; 32];
        self.log.lock().unwrap().issued_nonce = Some(nonce);
        Ok(ChallengeResponse {
            challenge: hex::encode(nonce),
            device_id,
            expires_at: current_timestamp() + 300,
        })
    }

    async fn verify_challenge(
        &self,
        request: &VerifyChallengeRequest,
    ) -> Result<VerifyChallengeResponse> {
        let mut log = self.log.lock().unwrap();
        let nonce = log
            .issued_nonce
            .take()
            .ok_or_else(|| Self::rejected("CHALLENGE_NOT_FOUND"))?;
        let public_key = log.public_key.ok_or_else(|| Self::rejected("DEVICE_NOT_FOUND"))?;
        let signature = decode_base64(&request.signature).unwrap();
        verify_signature_slice(&public_key, &canonicalize_challenge(&nonce), &signature)
            .map_err(|_| Self::rejected("SIGNATURE_INVALID"))?;
        log.verifications.push(request.clone());

        Ok(VerifyChallengeResponse {
            verified: true,
            device_id: request.device_id,
            verified_at: current_timestamp(),
        })
    }
}

pub fn compliant_facts() -> PostureFacts {
    PostureFacts {
        firewall_enabled: true,
        disk_encrypted: true,
        antivirus_active: true,
        screen_lock_enabled: true,
        ..Default::default()
    }
}

/// Test harness: an agent over a temp home, memory key store and fake backend
pub struct Harness {
    pub agent: Agent,
    pub backend: Arc<FakeBackend>,
    pub store: Arc<MemoryKeyStore>,
    pub state: LocalState,
    pub home: TempDir,
}

pub fn harness(status: DeviceStatus) -> Harness {
    harness_with(FakeBackend::new(status), compliant_facts())
}

pub fn harness_with(backend: FakeBackend, facts: PostureFacts) -> Harness {
    let home = tempfile::tempdir().unwrap();
    let config = AgentConfig::default();
    config.save(home.path()).unwrap();

    let state = LocalState::new(home.path());
    let store = Arc::new(MemoryKeyStore::default());
    let backend = Arc::new(backend);

    let agent = Agent::new(
        config.clone(),
        state.clone(),
        KeyCustody::new(store.clone()),
        Box::new(StaticFingerprintSource::new("MB-1", "BIOS-1", "uuid-1")),
        Collector::new(Box::new(StaticFactSource::new(facts)), config.compliance),
        backend.clone(),
    );

    Harness {
        agent,
        backend,
        store,
        state,
        home,
    }
}
