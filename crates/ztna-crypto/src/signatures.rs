//! Digital signature operations using Ed25519.

use crate::{constants::*, errors::*, keys::DeviceSigningKey};
use ed25519_dalek::{Signature, Signer, Verifier, VerifyingKey};

/// Sign a message with the device key
///
/// # Returns
///
/// 64-byte Ed25519 signature
pub fn sign_message(key: &DeviceSigningKey, message: &[u8]) -> [u8; SIGNATURE_SIZE] {
    key.signing_key().sign(message).to_bytes()
}

/// Verify an Ed25519 signature
///
/// # Returns
///
/// `Ok(())` if signature is valid, `Err` otherwise
pub fn verify_signature(
    public_key: &[u8; PUBLIC_KEY_SIZE],
    message: &[u8],
    signature: &[u8; SIGNATURE_SIZE],
) -> Result<()> {
    let verifying_key = VerifyingKey::from_bytes(public_key)
        .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;

    let sig = Signature::from_bytes(signature);

    verifying_key
        .verify_strict(message, &sig)
        .map_err(|_| CryptoError::SignatureVerificationFailed)
}

/// Verify a signature given as an unchecked byte slice (wire input)
pub fn verify_signature_slice(
    public_key: &[u8; PUBLIC_KEY_SIZE],
    message: &[u8],
    signature: &[u8],
) -> Result<()> {
    let signature: [u8; SIGNATURE_SIZE] =
        signature
            .try_into()
            .map_err(|_| CryptoError::InvalidSignatureSize {
                expected: SIGNATURE_SIZE,
                actual: signature.len(),
            })?;
    verify_signature(public_key, message, &signature)
}

/// Canonical message signed in answer to a challenge
///
/// Format: version(1) || "ztna:challenge:v1" || nonce(32)
pub fn canonicalize_challenge(nonce: &[u8; CHALLENGE_NONCE_SIZE]) -> Vec<u8> {
    let mut message = Vec::with_capacity(1 + DOMAIN_CHALLENGE.len() + CHALLENGE_NONCE_SIZE);
    message.push(0x01);
    message.extend_from_slice(DOMAIN_CHALLENGE.as_bytes());
    message.extend_from_slice(nonce);
    message
}

/// Canonical message signed over a serialized posture payload
///
/// Format: version(1) || "ztna:posture-report:v1" || payload_len(4, BE) || payload
pub fn canonicalize_posture_report(payload: &[u8]) -> Vec<u8> {
    let mut message = Vec::with_capacity(1 + DOMAIN_POSTURE_REPORT.len() + 4 + payload.len());
    message.push(0x01);
    message.extend_from_slice(DOMAIN_POSTURE_REPORT.as_bytes());
    message.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    message.extend_from_slice(payload);
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify() {
        let keypair = DeviceSigningKey::from_seed(&[42u8; 32]);
        let message = b"test message";

        let signature = sign_message(&keypair, message);
        assert!(verify_signature(&keypair.public_key_bytes(), message, &signature).is_ok());
    }

    #[test]
    fn test_verify_with_other_key_fails() {
        let keypair = DeviceSigningKey::from_seed(&[42u8; 32]);
        let other = DeviceSigningKey::from_seed(&[43u8; 32]);
        let message = b"test message";

        let signature = sign_message(&other, message);
        assert!(matches!(
            verify_signature(&keypair.public_key_bytes(), message, &signature),
            Err(CryptoError::SignatureVerificationFailed)
        ));
    }

    #[test]
    fn test_verify_wrong_message() {
        let keypair = DeviceSigningKey::from_seed(&[42u8; 32]);
        let signature = sign_message(&keypair, b"original message");

        assert!(
            verify_signature(&keypair.public_key_bytes(), b"tampered message", &signature)
                .is_err()
        );
    }

    #[test]
    fn test_verify_slice_rejects_truncated_signature() {
        let keypair = DeviceSigningKey::from_seed(&[42u8; 32]);
        let signature = sign_message(&keypair, b"m");

        let err =
            verify_signature_slice(&keypair.public_key_bytes(), b"m", &signature[..63]).unwrap_err();
        assert!(matches!(err, CryptoError::InvalidSignatureSize { .. }));
    }

    #[test]
    fn test_canonical_messages_are_domain_separated() {
        let nonce = [9u8; 32];
        let challenge = canonicalize_challenge(&nonce);
        let posture = canonicalize_posture_report(&nonce);

        assert_eq!(challenge[0], 0x01);
        assert_ne!(challenge, posture);
        assert_eq!(challenge, canonicalize_challenge(&nonce));
    }
}
