//! Signed posture payloads and stored reports.

use crate::{
    errors::{PostureError, Result},
    types::{ComplianceResult, PostureFacts},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use ztna_crypto::{
    canonicalize_posture_report, decode_base64, verify_signature_slice, PUBLIC_KEY_SIZE,
};

/// The signed part of a posture submission.
///
/// Serialized with `serde_json` in declaration order; that byte string is the
/// payload handed to [`canonicalize_posture_report`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostureEnvelope {
    pub device_unique_id: Uuid,
    pub fingerprint_hash: String,
    /// Unix seconds at collection time
    pub checked_at: u64,
    pub facts: PostureFacts,
}

impl PostureEnvelope {
    /// Deterministic payload bytes
    pub fn payload(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| PostureError::Serialization(e.to_string()))
    }

    /// Domain-separated message the device key signs
    pub fn signing_message(&self) -> Result<Vec<u8>> {
        Ok(canonicalize_posture_report(&self.payload()?))
    }
}

/// Wire form of `POST /posture`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostureSubmission {
    pub envelope: PostureEnvelope,
    /// Base64 Ed25519 signature over [`PostureEnvelope::signing_message`]
    pub signature: String,
    /// The agent's local verdict; advisory only
    pub agent_result: ComplianceResult,
}

impl PostureSubmission {
    /// Decoded signature bytes
    pub fn signature_bytes(&self) -> Result<Vec<u8>> {
        Ok(decode_base64(&self.signature)?)
    }

    /// Verify the signature against an enrolled public key
    pub fn verify(&self, public_key: &[u8; PUBLIC_KEY_SIZE]) -> Result<()> {
        let signature = self.signature_bytes()?;
        verify_signature_slice(public_key, &self.envelope.signing_message()?, &signature)?;
        Ok(())
    }
}

/// A stored posture report. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostureReport {
    pub report_id: Uuid,
    pub device_id: Uuid,
    pub checked_at: u64,
    pub received_at: u64,
    pub facts: PostureFacts,
    pub signature: Vec<u8>,
    pub is_compliant: bool,
    pub compliance_score: u8,
    pub violations: Vec<String>,
}

impl PostureReport {
    /// Seconds since the facts were collected
    pub fn age_seconds(&self, now: u64) -> u64 {
        now.saturating_sub(self.checked_at)
    }

    /// Whether the report is recent enough to be trusted
    pub fn is_fresh(&self, now: u64, freshness_seconds: u64) -> bool {
        self.age_seconds(now) <= freshness_seconds
    }
}
