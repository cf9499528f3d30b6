//! Device posture agent: enrollment, posture reporting and step-up.

use crate::{
    client::{BackendClient, HttpBackendClient},
    collector::{Collector, SystemFactSource},
    config::AgentConfig,
    errors::{AgentError, Result},
    fingerprint::{DmiFingerprintSource, FingerprintSource},
    state::{DeviceStatus, EnrollmentRecord, LocalState},
    types::*,
};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;
use ztna_crypto::{current_timestamp, encode_base64, CHALLENGE_NONCE_SIZE};
use ztna_keystore::{FileKeyStore, KeyCustody, KeyStore, SubprocessKeyStore};
use ztna_posture::{ComplianceResult, PostureEnvelope, PostureSubmission};

/// Result of `enroll`
#[derive(Debug, Clone)]
pub struct EnrollOutcome {
    pub record: EnrollmentRecord,
    pub reenrolled: bool,
    /// True when this enrollment provisioned a new key
    pub key_created: bool,
}

/// Result of one posture cycle
#[derive(Debug, Clone)]
pub enum CycleReport {
    /// Report accepted by the backend
    Submitted {
        local: ComplianceResult,
        response: PostureResponse,
    },
    /// Device is not active yet; nothing was signed
    AwaitingApproval(DeviceStatus),
}

/// Signed answer to a backend challenge
#[derive(Debug, Clone)]
pub struct PossessionProof {
    pub device_id: Uuid,
    /// Hex nonce as issued
    pub challenge: String,
    /// Base64 signature
    pub signature: String,
    pub fingerprint_hash: String,
}

/// Local view of the agent
#[derive(Debug, Clone)]
pub struct AgentStatus {
    pub device_unique_id: Uuid,
    pub fingerprint_hash: String,
    pub key_exists: bool,
    pub enrollment: Option<EnrollmentRecord>,
}

/// Result of `reset`
#[derive(Debug, Clone)]
pub struct ResetReport {
    pub key_deleted: bool,
    pub removed: Vec<PathBuf>,
}

/// The device agent
pub struct Agent {
    config: AgentConfig,
    state: LocalState,
    custody: KeyCustody,
    fingerprint: Box<dyn FingerprintSource>,
    collector: Collector,
    backend: Arc<dyn BackendClient>,
}

impl Agent {
    pub fn new(
        config: AgentConfig,
        state: LocalState,
        custody: KeyCustody,
        fingerprint: Box<dyn FingerprintSource>,
        collector: Collector,
        backend: Arc<dyn BackendClient>,
    ) -> Self {
        Self {
            config,
            state,
            custody,
            fingerprint,
            collector,
            backend,
        }
    }

    /// Agent wired to the real machine: SMBIOS fingerprint, system probes,
    /// HTTP backend and the configured key store
    pub fn from_config(config: AgentConfig, state: LocalState) -> Result<Self> {
        let fingerprint = DmiFingerprintSource::default();
        let store = key_store_for(&config, &state, &fingerprint)?;
        let backend = HttpBackendClient::new(&config.backend_url, config.request_timeout())?;
        let collector = Collector::new(Box::<SystemFactSource>::default(), config.compliance);

        Ok(Self::new(
            config,
            state,
            KeyCustody::new(store),
            Box::new(fingerprint),
            collector,
            Arc::new(backend),
        ))
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Enroll this device with a one-time code.
    ///
    /// Refuses when an enrollment record exists unless `force` is set, in
    /// which case the old key and record are destroyed first and the backend
    /// sees a re-enrollment of the same `device_unique_id`.
    pub async fn enroll(&self, code: &str, force: bool) -> Result<EnrollOutcome> {
        if let Some(existing) = self.state.enrollment()? {
            if !force {
                return Err(AgentError::AlreadyEnrolled(existing.device_id));
            }
            warn!(device_id = %existing.device_id, "Discarding existing enrollment");
            self.reset().await?;
        }

        let identity = self.state.identity()?;
        let fingerprint = self.fingerprint.compute_fingerprint()?;
        let handle = self.custody.ensure_key_exists().await?;
        let public_key = hex::encode(handle.public_key);

        let response = self
            .with_timeout(self.backend.enroll(&EnrollRequest {
                code: code.to_string(),
                device_unique_id: identity.device_unique_id,
                fingerprint_hash: fingerprint.fingerprint_hash.clone(),
                tpm_public_key: public_key.clone(),
            }))
            .await?;

        let record = EnrollmentRecord {
            device_unique_id: identity.device_unique_id,
            device_id: response.device_id,
            fingerprint_hash: fingerprint.fingerprint_hash,
            public_key,
            status: response.status,
            enrolled_at: current_timestamp(),
            backend_url: self.config.backend_url.clone(),
        };
        self.state.save_enrollment(&record)?;

        info!(
            device_id = %record.device_id,
            status = %record.status,
            reenrolled = response.reenrolled,
            "Device enrolled"
        );

        Ok(EnrollOutcome {
            record,
            reenrolled: response.reenrolled,
            key_created: handle.created,
        })
    }

    /// Poll the backend for the device status and persist it
    pub async fn refresh_status(&self) -> Result<(EnrollmentRecord, EnrollmentStatusResponse)> {
        let mut record = self.state.require_enrollment()?;
        let status = self
            .with_timeout(self.backend.enrollment_status(record.device_unique_id))
            .await?;

        if status.status != record.status || status.device_id != record.device_id {
            info!(
                device_id = %status.device_id,
                from = %record.status,
                to = %status.status,
                "Device status changed"
            );
            record.status = status.status;
            record.device_id = status.device_id;
            self.state.save_enrollment(&record)?;
        }

        Ok((record, status))
    }

    /// One posture cycle: collect, evaluate, sign, submit
    pub async fn collect_and_submit(&self) -> Result<CycleReport> {
        let mut record = self.state.require_enrollment()?;
        if record.status != DeviceStatus::Active {
            record = self.refresh_status().await?.0;
            if record.status != DeviceStatus::Active {
                info!(status = %record.status, "Device not active; skipping posture report");
                return Ok(CycleReport::AwaitingApproval(record.status));
            }
        }

        let fingerprint = self.fingerprint.compute_fingerprint()?;
        if fingerprint.fingerprint_hash != record.fingerprint_hash {
            warn!("Hardware fingerprint differs from the enrolled one");
        }

        let collection = self.collector.collect().await;
        let envelope = PostureEnvelope {
            device_unique_id: record.device_unique_id,
            fingerprint_hash: fingerprint.fingerprint_hash,
            checked_at: current_timestamp(),
            facts: collection.facts,
        };

        let signature = self.custody.sign(&envelope.signing_message()?).await?;
        let submission = PostureSubmission {
            envelope,
            signature: encode_base64(&signature),
            agent_result: collection.result.clone(),
        };

        let response = self
            .with_timeout(self.backend.submit_posture(&submission))
            .await?;

        if response.is_compliant != collection.result.is_compliant {
            warn!(
                local = collection.result.is_compliant,
                backend = response.is_compliant,
                "Backend compliance verdict differs from local"
            );
        }
        info!(
            report_id = %response.report_id,
            compliant = response.is_compliant,
            score = response.compliance_score,
            "Posture report accepted"
        );

        Ok(CycleReport::Submitted {
            local: collection.result,
            response,
        })
    }

    /// Fetch a challenge and sign it, without verifying
    pub async fn prove_possession(&self) -> Result<PossessionProof> {
        let record = self.state.require_enrollment()?;
        let challenge = self
            .with_timeout(self.backend.get_challenge(record.device_id))
            .await?;

        let nonce: [u8; CHALLENGE_NONCE_SIZE] = hex::decode(&challenge.challenge)
            .ok()
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or_else(|| AgentError::Serialization("malformed challenge nonce".to_string()))?;

        let signature = self.custody.sign_challenge(&nonce).await?;
        let fingerprint = self.fingerprint.compute_fingerprint()?;

        Ok(PossessionProof {
            device_id: record.device_id,
            challenge: challenge.challenge,
            signature: encode_base64(&signature),
            fingerprint_hash: fingerprint.fingerprint_hash,
        })
    }

    /// Prove live possession of the device key to the backend
    pub async fn step_up(&self) -> Result<VerifyChallengeResponse> {
        let proof = self.prove_possession().await?;
        let response = self
            .with_timeout(self.backend.verify_challenge(&VerifyChallengeRequest {
                device_id: proof.device_id,
                challenge: proof.challenge,
                signature: proof.signature,
                fingerprint_hash: Some(proof.fingerprint_hash),
            }))
            .await?;

        info!(device_id = %response.device_id, "Step-up verified");
        Ok(response)
    }

    /// Delete the key container and enrollment artifacts. Configuration and
    /// device identity stay.
    pub async fn reset(&self) -> Result<ResetReport> {
        let key_deleted = self.custody.delete().await?;
        let removed = self.state.clear_enrollment()?;

        info!(key_deleted, removed = removed.len(), "Agent reset");
        Ok(ResetReport {
            key_deleted,
            removed,
        })
    }

    pub async fn status(&self) -> Result<AgentStatus> {
        let identity = self.state.identity()?;
        let fingerprint = self.fingerprint.compute_fingerprint()?;
        let key = self.custody.status().await?;

        Ok(AgentStatus {
            device_unique_id: identity.device_unique_id,
            fingerprint_hash: fingerprint.fingerprint_hash,
            key_exists: key.exists,
            enrollment: self.state.enrollment()?,
        })
    }

    /// Bound a backend call by the request timeout
    async fn with_timeout<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.config.request_timeout(), call)
            .await
            .map_err(|_| AgentError::SubmissionTimeout)?
    }
}

/// The configured key store: the external signer when `signer_command` is
/// set, otherwise the sealed file container bound to this machine
pub fn key_store_for(
    config: &AgentConfig,
    state: &LocalState,
    fingerprint: &dyn FingerprintSource,
) -> Result<Arc<dyn KeyStore>> {
    match &config.signer_command {
        Some(command) => Ok(Arc::new(SubprocessKeyStore::from_command_line(
            command,
            signer_timeout(config),
        )?)),
        None => {
            let record = fingerprint.compute_fingerprint()?;
            Ok(Arc::new(FileKeyStore::new(
                state.keys_dir(),
                &record.fingerprint_hash,
            )))
        }
    }
}

fn signer_timeout(config: &AgentConfig) -> Duration {
    config.request_timeout().max(Duration::from_secs(5))
}
