//! Challenge type definitions.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use ztna_crypto::CHALLENGE_NONCE_SIZE;

/// Challenge as handed to the agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    /// Hex-encoded 32-byte nonce
    pub value: String,
    pub device_id: Uuid,
    pub issued_at: u64,
    pub expires_at: u64,
}

/// Stored form, keyed by nonce
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct StoredChallenge {
    pub nonce: [u8; CHALLENGE_NONCE_SIZE],
    pub device_id: Uuid,
    pub issued_at: u64,
    pub expires_at: u64,
}

impl StoredChallenge {
    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.expires_at
    }
}

/// A signed answer to a challenge
#[derive(Debug, Clone)]
pub struct VerifyRequest {
    pub device_id: Uuid,
    /// Hex nonce from [`Challenge::value`]
    pub challenge: String,
    /// Ed25519 signature over the canonical challenge message
    pub signature: Vec<u8>,
    /// Fingerprint the agent currently computes, when it sends one
    pub fingerprint_hash: Option<String>,
}

/// Successful verification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyResult {
    pub device_id: Uuid,
    pub verified_at: u64,
}
