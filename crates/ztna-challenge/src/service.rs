//! Challenge service implementation.

use crate::{errors::*, traits::ChallengeProtocol, types::*};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;
use ztna_crypto::{
    canonicalize_challenge, constant_time_compare, current_timestamp, generate_random_bytes,
    verify_signature_slice, CHALLENGE_NONCE_SIZE,
};
use ztna_devices::DeviceRegistry;
use ztna_storage::{Storage, CF_CHALLENGES};

/// Challenge service
pub struct ChallengeService<S, D>
where
    S: Storage,
    D: DeviceRegistry,
{
    storage: Arc<S>,
    devices: Arc<D>,
    ttl_seconds: u64,
}

impl<S, D> ChallengeService<S, D>
where
    S: Storage + 'static,
    D: DeviceRegistry + 'static,
{
    /// Create a new challenge service
    pub fn new(storage: Arc<S>, devices: Arc<D>, ttl_seconds: u64) -> Self {
        Self {
            storage,
            devices,
            ttl_seconds,
        }
    }

    pub fn ttl_seconds(&self) -> u64 {
        self.ttl_seconds
    }

    fn parse_nonce(value: &str) -> Result<[u8; CHALLENGE_NONCE_SIZE]> {
        hex::decode(value.trim())
            .ok()
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or(ChallengeError::ChallengeNotFound)
    }
}

#[async_trait]
impl<S, D> ChallengeProtocol for ChallengeService<S, D>
where
    S: Storage + 'static,
    D: DeviceRegistry + 'static,
{
    async fn issue_challenge(&self, device_id: Uuid) -> Result<Challenge> {
        // Only enrolled devices get challenges
        self.devices.get_device(device_id).await?;

        let now = current_timestamp();
        let stored = StoredChallenge {
            nonce: generate_random_bytes::<CHALLENGE_NONCE_SIZE>()?,
            device_id,
            issued_at: now,
            expires_at: now + self.ttl_seconds,
        };

        self.storage
            .put(CF_CHALLENGES, &stored.nonce, &stored)
            .await?;

        debug!(device_id = %device_id, expires_at = stored.expires_at, "Challenge issued");

        Ok(Challenge {
            value: hex::encode(stored.nonce),
            device_id,
            issued_at: stored.issued_at,
            expires_at: stored.expires_at,
        })
    }

    async fn verify(&self, request: VerifyRequest) -> Result<VerifyResult> {
        let nonce = Self::parse_nonce(&request.challenge)?;
        let device = self.devices.get_device(request.device_id).await?;

        // Peek without consuming: only a live challenge issued to this device
        // lets a failed signature count against its binding
        let issued: Option<StoredChallenge> = self.storage.get(CF_CHALLENGES, &nonce).await?;
        let issued_here = issued
            .is_some_and(|c| c.device_id == device.id && !c.is_expired(current_timestamp()));

        // Step 1: signature against the enrolled key, so a foreign key always
        // reads as SignatureInvalid whatever the challenge state
        let message = canonicalize_challenge(&nonce);
        if verify_signature_slice(&device.tpm_public_key, &message, &request.signature).is_err() {
            if issued_here {
                let alert = self
                    .devices
                    .record_signature_failure(device.id, request.fingerprint_hash.clone())
                    .await?;
                warn!(device_id = %device.id, alert = ?alert, "Challenge signature invalid");
            } else {
                warn!(
                    device_id = %device.id,
                    "Signature invalid for a challenge not issued to this device"
                );
            }
            return Err(ChallengeError::SignatureInvalid);
        }

        // Step 2: consume atomically; of concurrent verifiers only one gets it
        let stored: StoredChallenge = self
            .storage
            .take(CF_CHALLENGES, &nonce)
            .await?
            .ok_or(ChallengeError::ChallengeNotFound)?;

        if stored.device_id != device.id {
            warn!(
                device_id = %device.id,
                issued_to = %stored.device_id,
                "Challenge presented by another device"
            );
            return Err(ChallengeError::ChallengeNotFound);
        }

        let now = current_timestamp();
        if stored.is_expired(now) {
            debug!(device_id = %device.id, "Challenge expired");
            return Err(ChallengeError::ChallengeExpired);
        }

        // Step 3: key verified; check the hardware it claims to run on
        if let Some(fingerprint) = &request.fingerprint_hash {
            if !constant_time_compare(fingerprint.as_bytes(), device.fingerprint_hash.as_bytes())
            {
                self.devices
                    .record_signature_failure(device.id, Some(fingerprint.clone()))
                    .await?;
                return Err(ChallengeError::FingerprintMismatch);
            }
        }

        self.devices.record_signature_success(device.id).await?;

        info!(device_id = %device.id, "Challenge verified");
        Ok(VerifyResult {
            device_id: device.id,
            verified_at: now,
        })
    }

    async fn purge_expired(&self) -> Result<usize> {
        let now = current_timestamp();
        let all: Vec<(Vec<u8>, StoredChallenge)> = self.storage.scan_all(CF_CHALLENGES).await?;

        let mut purged = 0;
        for (key, challenge) in all {
            if challenge.is_expired(now) {
                self.storage.delete_raw(CF_CHALLENGES, &key).await?;
                purged += 1;
            }
        }

        if purged > 0 {
            debug!(purged, "Purged expired challenges");
        }
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ztna_crypto::{fingerprint_hash, sign_message, DeviceSigningKey};
    use ztna_devices::{
        BindingAlertKind, DeviceConfig, DeviceService, EnrollmentRequest,
    };
    use ztna_storage::RocksDbStorage;

    type TestDevices = DeviceService<RocksDbStorage>;
    type TestService = ChallengeService<RocksDbStorage, TestDevices>;

    struct Fixture {
        service: Arc<TestService>,
        devices: Arc<TestDevices>,
        device_id: Uuid,
        key: DeviceSigningKey,
        fingerprint: String,
    }

    async fn fixture(ttl_seconds: u64) -> Fixture {
        let storage = Arc::new(RocksDbStorage::open_test().unwrap());
        let devices = Arc::new(DeviceService::new(
            Arc::clone(&storage),
            DeviceConfig {
                auto_approve: true,
                ..Default::default()
            },
        ));

        let key = DeviceSigningKey::from_seed(&[11u8; 32]);
        let fingerprint = fingerprint_hash(&["board", "bios", "uuid"]);
        let code = devices.create_code(1, 3600).await.unwrap();
        let device = devices
            .enroll(EnrollmentRequest {
                code: code.code,
                device_unique_id: Uuid::new_v4(),
                fingerprint_hash: fingerprint.clone(),
                tpm_public_key: key.public_key_bytes(),
            })
            .await
            .unwrap()
            .device;

        let service = Arc::new(ChallengeService::new(
            storage,
            Arc::clone(&devices),
            ttl_seconds,
        ));

        Fixture {
            service,
            devices,
            device_id: device.id,
            key,
            fingerprint,
        }
    }

    fn answer(fixture: &Fixture, challenge: &Challenge, key: &DeviceSigningKey) -> VerifyRequest {
        let nonce: [u8; 32] = hex::decode(&challenge.value).unwrap().try_into().unwrap();
        VerifyRequest {
            device_id: fixture.device_id,
            challenge: challenge.value.clone(),
            signature: sign_message(key, &canonicalize_challenge(&nonce)).to_vec(),
            fingerprint_hash: Some(fixture.fingerprint.clone()),
        }
    }

    #[tokio::test]
    async fn test_verify_succeeds_exactly_once() {
        let f = fixture(300).await;
        let challenge = f.service.issue_challenge(f.device_id).await.unwrap();
        let request = answer(&f, &challenge, &f.key);

        let result = f.service.verify(request.clone()).await.unwrap();
        assert_eq!(result.device_id, f.device_id);

        let err = f.service.verify(request).await.unwrap_err();
        assert!(matches!(err, ChallengeError::ChallengeNotFound));
    }

    #[tokio::test]
    async fn test_foreign_key_is_signature_invalid() {
        let f = fixture(300).await;
        let challenge = f.service.issue_challenge(f.device_id).await.unwrap();
        let other = DeviceSigningKey::from_seed(&[12u8; 32]);

        // Regardless of challenge validity
        let mut unknown = answer(&f, &challenge, &other);
        unknown.challenge = hex::encode([0u8; 32]);
        let err = f.service.verify(unknown).await.unwrap_err();
        assert!(matches!(err, ChallengeError::SignatureInvalid));

        // A nonce never issued to the device leaves its binding alone
        let device = f.devices.get_device(f.device_id).await.unwrap();
        assert_eq!(device.binding_alert, None);

        let err = f
            .service
            .verify(answer(&f, &challenge, &other))
            .await
            .unwrap_err();
        assert!(matches!(err, ChallengeError::SignatureInvalid));

        let device = f.devices.get_device(f.device_id).await.unwrap();
        assert_eq!(
            device.binding_alert.map(|a| a.kind),
            Some(BindingAlertKind::KeyMismatch)
        );

        // The real key still consumes the untouched challenge
        assert!(f.service.verify(answer(&f, &challenge, &f.key)).await.is_ok());
    }

    #[tokio::test]
    async fn test_forged_answer_for_unissued_nonce_raises_no_alert() {
        let f = fixture(300).await;
        let forged = VerifyRequest {
            device_id: f.device_id,
            challenge: hex::encode([7u8; 32]),
            signature: vec![0u8; 64],
            fingerprint_hash: None,
        };

        let err = f.service.verify(forged).await.unwrap_err();
        assert!(matches!(err, ChallengeError::SignatureInvalid));

        let device = f.devices.get_device(f.device_id).await.unwrap();
        assert_eq!(device.binding_alert, None);
        assert_eq!(device.failed_verifications, 0);
    }

    #[tokio::test]
    async fn test_bad_signature_without_fingerprint_raises_no_alert() {
        let f = fixture(300).await;
        let challenge = f.service.issue_challenge(f.device_id).await.unwrap();
        let mut request = answer(&f, &challenge, &f.key);
        request.signature = vec![0u8; 64];
        request.fingerprint_hash = None;

        let err = f.service.verify(request).await.unwrap_err();
        assert!(matches!(err, ChallengeError::SignatureInvalid));

        let device = f.devices.get_device(f.device_id).await.unwrap();
        assert_eq!(device.binding_alert, None);
        assert_eq!(device.failed_verifications, 1);
    }

    #[tokio::test]
    async fn test_expired_challenge() {
        let f = fixture(0).await;
        let challenge = f.service.issue_challenge(f.device_id).await.unwrap();

        let err = f
            .service
            .verify(answer(&f, &challenge, &f.key))
            .await
            .unwrap_err();
        assert!(matches!(err, ChallengeError::ChallengeExpired));
    }

    #[tokio::test]
    async fn test_unknown_challenge_is_not_found() {
        let f = fixture(300).await;
        let forged = Challenge {
            value: hex::encode([5u8; 32]),
            device_id: f.device_id,
            issued_at: 0,
            expires_at: u64::MAX,
        };

        let err = f
            .service
            .verify(answer(&f, &forged, &f.key))
            .await
            .unwrap_err();
        assert!(matches!(err, ChallengeError::ChallengeNotFound));

        let mut malformed = answer(&f, &forged, &f.key);
        malformed.challenge = "xyz".to_string();
        assert!(matches!(
            f.service.verify(malformed).await,
            Err(ChallengeError::ChallengeNotFound)
        ));
    }

    #[tokio::test]
    async fn test_foreign_fingerprint_with_valid_key() {
        let f = fixture(300).await;
        let challenge = f.service.issue_challenge(f.device_id).await.unwrap();
        let mut request = answer(&f, &challenge, &f.key);
        request.fingerprint_hash = Some("00".repeat(32));

        let err = f.service.verify(request).await.unwrap_err();
        assert!(matches!(err, ChallengeError::FingerprintMismatch));

        let device = f.devices.get_device(f.device_id).await.unwrap();
        assert_eq!(
            device.binding_alert.map(|a| a.kind),
            Some(BindingAlertKind::FingerprintMismatch)
        );
    }

    #[tokio::test]
    async fn test_concurrent_verification_has_single_winner() {
        let f = fixture(300).await;
        let challenge = f.service.issue_challenge(f.device_id).await.unwrap();
        let request = answer(&f, &challenge, &f.key);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let service = Arc::clone(&f.service);
            let request = request.clone();
            handles.push(tokio::spawn(async move { service.verify(request).await }));
        }

        let mut verified = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => verified += 1,
                Err(e) => assert!(matches!(e, ChallengeError::ChallengeNotFound)),
            }
        }
        assert_eq!(verified, 1);
    }

    #[tokio::test]
    async fn test_issue_for_unknown_device() {
        let f = fixture(300).await;
        let missing = Uuid::new_v4();

        let err = f.service.issue_challenge(missing).await.unwrap_err();
        assert!(matches!(err, ChallengeError::DeviceNotFound(id) if id == missing));
    }

    #[tokio::test]
    async fn test_purge_removes_only_expired() {
        let expired = fixture(0).await;
        expired.service.issue_challenge(expired.device_id).await.unwrap();
        expired.service.issue_challenge(expired.device_id).await.unwrap();
        assert_eq!(expired.service.purge_expired().await.unwrap(), 2);
        assert_eq!(expired.service.purge_expired().await.unwrap(), 0);

        let live = fixture(300).await;
        let challenge = live.service.issue_challenge(live.device_id).await.unwrap();
        assert_eq!(live.service.purge_expired().await.unwrap(), 0);
        assert!(live
            .service
            .verify(answer(&live, &challenge, &live.key))
            .await
            .is_ok());
    }
}
