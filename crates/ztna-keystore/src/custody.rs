//! Single-owner signing boundary.

use crate::{
    errors::Result,
    traits::{KeyHandle, KeyStatus, KeyStore},
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;
use ztna_crypto::{canonicalize_challenge, CHALLENGE_NONCE_SIZE, PUBLIC_KEY_SIZE, SIGNATURE_SIZE};

/// Owns the device key store and serializes every signature through one lock.
///
/// Cheap to clone; clones share the lock.
#[derive(Clone)]
pub struct KeyCustody {
    store: Arc<dyn KeyStore>,
    sign_lock: Arc<Mutex<()>>,
}

impl KeyCustody {
    pub fn new(store: Arc<dyn KeyStore>) -> Self {
        Self {
            store,
            sign_lock: Arc::new(Mutex::new(())),
        }
    }

    pub async fn ensure_key_exists(&self) -> Result<KeyHandle> {
        let _guard = self.sign_lock.lock().await;
        self.store.ensure_key_exists().await
    }

    /// Sign a payload. At most one signature is in progress at any time.
    pub async fn sign(&self, payload: &[u8]) -> Result<[u8; SIGNATURE_SIZE]> {
        let _guard = self.sign_lock.lock().await;
        debug!(len = payload.len(), "Signing payload");
        self.store.sign(payload).await
    }

    /// Sign a backend challenge nonce in its canonical form
    pub async fn sign_challenge(
        &self,
        nonce: &[u8; CHALLENGE_NONCE_SIZE],
    ) -> Result<[u8; SIGNATURE_SIZE]> {
        self.sign(&canonicalize_challenge(nonce)).await
    }

    pub async fn public_key(&self) -> Result<[u8; PUBLIC_KEY_SIZE]> {
        self.store.public_key().await
    }

    pub async fn status(&self) -> Result<KeyStatus> {
        self.store.status().await
    }

    /// Destroy the key; waits for any in-flight signature first
    pub async fn delete(&self) -> Result<bool> {
        let _guard = self.sign_lock.lock().await;
        self.store.delete().await
    }
}
