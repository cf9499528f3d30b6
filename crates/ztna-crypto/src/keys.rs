//! Device signing key generation and public key handling.

use crate::{constants::*, errors::*};
use ed25519_dalek::{SigningKey, VerifyingKey};
use rand::RngCore;
use zeroize::Zeroizing;

/// Ed25519 device signing key.
///
/// Only ever held in memory inside the key custody boundary. The seed is
/// zeroized when the key is dropped.
#[derive(Clone)]
pub struct DeviceSigningKey {
    signing_key: SigningKey,
}

impl DeviceSigningKey {
    /// Generate a fresh key from the OS RNG
    pub fn generate() -> Result<Self> {
        let mut seed = Zeroizing::new([0u8; PRIVATE_KEY_SIZE]);
        rand::thread_rng()
            .try_fill_bytes(seed.as_mut())
            .map_err(|e| CryptoError::RandomGenerationFailed(e.to_string()))?;
        Ok(Self::from_seed(&seed))
    }

    /// Rebuild a key from its 32-byte seed
    pub fn from_seed(seed: &[u8; PRIVATE_KEY_SIZE]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Export the seed for sealing.
    ///
    /// # Security
    ///
    /// The returned buffer must only be handed to [`crate::seal_secret`].
    pub fn seed(&self) -> Zeroizing<[u8; PRIVATE_KEY_SIZE]> {
        Zeroizing::new(self.signing_key.to_bytes())
    }

    /// Public verification key bytes
    pub fn public_key_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.signing_key.verifying_key().to_bytes()
    }

    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }
}

impl std::fmt::Debug for DeviceSigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSigningKey")
            .field("public_key", &hex::encode(self.public_key_bytes()))
            .finish_non_exhaustive()
    }
}

/// Parse and validate a raw Ed25519 public key
pub fn parse_public_key(bytes: &[u8]) -> Result<[u8; PUBLIC_KEY_SIZE]> {
    let key: [u8; PUBLIC_KEY_SIZE] =
        bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidKeySize {
                expected: PUBLIC_KEY_SIZE,
                actual: bytes.len(),
            })?;

    VerifyingKey::from_bytes(&key).map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;

    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_keys_differ() {
        let a = DeviceSigningKey::generate().unwrap();
        let b = DeviceSigningKey::generate().unwrap();
        assert_ne!(a.public_key_bytes(), b.public_key_bytes());
    }

    #[test]
    fn test_seed_roundtrip_preserves_public_key() {
        let key = DeviceSigningKey::generate().unwrap();
        let rebuilt = DeviceSigningKey::from_seed(&key.seed());
        assert_eq!(key.public_key_bytes(), rebuilt.public_key_bytes());
    }

    #[test]
    fn test_parse_public_key_rejects_wrong_length() {
        let err = parse_public_key(&[1u8; 31]).unwrap_err();
        assert!(matches!(
            err,
            CryptoError::InvalidKeySize {
                expected: 32,
                actual: 31
            }
        ));
    }

    #[test]
    fn test_debug_does_not_leak_seed() {
        let key = DeviceSigningKey::from_seed(&[7u8; 32]);
        let rendered = format!("{:?}", key);
        assert!(!rendered.contains(&hex::encode([7u8; 32])));
    }
}
