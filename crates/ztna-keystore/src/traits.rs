//! Key store trait definitions.

use crate::errors::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use ztna_crypto::{PUBLIC_KEY_SIZE, SIGNATURE_SIZE};

/// Handle to the provisioned device key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyHandle {
    /// Well-known container name
    pub container: String,
    /// Ed25519 public key
    pub public_key: [u8; PUBLIC_KEY_SIZE],
    /// True when this call provisioned the key
    pub created: bool,
}

/// Key presence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyStatus {
    #[serde(rename = "key_exists", alias = "exists")]
    pub exists: bool,
}

/// A protected container holding the single device keypair.
///
/// Only `ensure_key_exists` and `delete` mutate the container.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Provision the keypair if absent; idempotent
    async fn ensure_key_exists(&self) -> Result<KeyHandle>;

    /// Sign a payload with the device key
    ///
    /// Fails with `KeyNotFound` if nothing is provisioned.
    async fn sign(&self, payload: &[u8]) -> Result<[u8; SIGNATURE_SIZE]>;

    /// Public half of the device key
    async fn public_key(&self) -> Result<[u8; PUBLIC_KEY_SIZE]>;

    /// Whether a key is provisioned
    async fn status(&self) -> Result<KeyStatus>;

    /// Destroy the key container. Returns false if there was nothing to delete.
    ///
    /// Only used by reset and re-enrollment flows.
    async fn delete(&self) -> Result<bool>;
}
