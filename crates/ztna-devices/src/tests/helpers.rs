//! Test helpers for device registry tests.

use crate::*;
use std::sync::Arc;
use uuid::Uuid;
use ztna_crypto::{current_timestamp, encode_base64, fingerprint_hash, sign_message, DeviceSigningKey};
use ztna_posture::{evaluate, CompliancePolicy, PostureEnvelope, PostureFacts, PostureSubmission};
use ztna_storage::RocksDbStorage;

pub type TestService = DeviceService<RocksDbStorage>;

pub fn create_service(config: DeviceConfig) -> Arc<TestService> {
    let storage = Arc::new(RocksDbStorage::open_test().unwrap());
    Arc::new(DeviceService::new(storage, config))
}

pub fn auto_approve_config() -> DeviceConfig {
    DeviceConfig {
        auto_approve: true,
        ..Default::default()
    }
}

/// A simulated agent: unique ID, fingerprint and device key
pub struct TestAgent {
    pub device_unique_id: Uuid,
    pub fingerprint_hash: String,
    pub key: DeviceSigningKey,
}

impl TestAgent {
    pub fn new(seed: u8) -> Self {
        let board = format!("board-{seed}");
        Self {
            device_unique_id: Uuid::new_v4(),
            fingerprint_hash: fingerprint_hash(&[board.as_str(), "bios", "uuid"]),
            key: DeviceSigningKey::from_seed(&[seed; 32]),
        }
    }

    pub fn request(&self, code: &str) -> EnrollmentRequest {
        EnrollmentRequest {
            code: code.to_string(),
            device_unique_id: self.device_unique_id,
            fingerprint_hash: self.fingerprint_hash.clone(),
            tpm_public_key: self.key.public_key_bytes(),
        }
    }

    pub fn submission(&self, checked_at: u64, facts: PostureFacts) -> PostureSubmission {
        self.submission_signed_by(&self.key, checked_at, facts)
    }

    pub fn submission_signed_by(
        &self,
        key: &DeviceSigningKey,
        checked_at: u64,
        facts: PostureFacts,
    ) -> PostureSubmission {
        let envelope = PostureEnvelope {
            device_unique_id: self.device_unique_id,
            fingerprint_hash: self.fingerprint_hash.clone(),
            checked_at,
            facts,
        };
        let signature = sign_message(key, &envelope.signing_message().unwrap());
        let agent_result = evaluate(&envelope.facts, &CompliancePolicy::default());
        PostureSubmission {
            envelope,
            signature: encode_base64(&signature),
            agent_result,
        }
    }
}

pub fn healthy_facts() -> PostureFacts {
    PostureFacts {
        firewall_enabled: true,
        disk_encrypted: true,
        antivirus_active: true,
        screen_lock_enabled: true,
        ..Default::default()
    }
}

/// Enroll an agent with a fresh single-use code
pub async fn enroll(service: &TestService, agent: &TestAgent) -> DeviceRecord {
    let code = service.create_code(1, 3600).await.unwrap();
    service.enroll(agent.request(&code.code)).await.unwrap().device
}

pub fn now() -> u64 {
    current_timestamp()
}
