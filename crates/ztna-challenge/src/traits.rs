//! Challenge protocol trait.

use crate::{errors::Result, types::*};
use async_trait::async_trait;
use uuid::Uuid;

/// Backend side of the challenge-response protocol
#[async_trait]
pub trait ChallengeProtocol: Send + Sync {
    /// Issue a fresh single-use challenge for a device
    async fn issue_challenge(&self, device_id: Uuid) -> Result<Challenge>;

    /// Verify a signed challenge, consuming it on success
    async fn verify(&self, request: VerifyRequest) -> Result<VerifyResult>;

    /// Drop expired challenges; returns how many were removed
    async fn purge_expired(&self) -> Result<usize>;
}
