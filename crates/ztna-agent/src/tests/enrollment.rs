use super::helpers::*;
use crate::{config::CONFIG_FILE, errors::AgentError, state::DeviceStatus};
use ztna_keystore::KeyStore;

#[tokio::test]
async fn test_enroll_provisions_key_and_persists_record() {
    let h = harness(DeviceStatus::Pending);

    let outcome = h.agent.enroll("code-1", false).await.unwrap();

    assert!(outcome.key_created);
    assert!(!outcome.reenrolled);
    assert_eq!(outcome.record.status, DeviceStatus::Pending);
    assert_eq!(outcome.record.device_id, h.backend.device_id);

    let sent = &h.backend.log.lock().unwrap().enrollments[0];
    assert_eq!(sent.code, "code-1");
    assert_eq!(sent.fingerprint_hash, outcome.record.fingerprint_hash);
    assert_eq!(
        sent.tpm_public_key,
        hex::encode(h.store.public_key().await.unwrap())
    );
    assert_eq!(h.state.enrollment().unwrap(), Some(outcome.record));
}

#[tokio::test]
async fn test_second_enroll_requires_force() {
    let h = harness(DeviceStatus::Active);
    let first = h.agent.enroll("code-1", false).await.unwrap();

    let err = h.agent.enroll("code-2", false).await.unwrap_err();

    assert!(matches!(err, AgentError::AlreadyEnrolled(id) if id == first.record.device_id));
    assert_eq!(h.backend.log.lock().unwrap().enrollments.len(), 1);
}

#[tokio::test]
async fn test_forced_enroll_rekeys_same_identity() {
    let h = harness(DeviceStatus::Active);
    let first = h.agent.enroll("code-1", false).await.unwrap();

    let second = h.agent.enroll("code-2", true).await.unwrap();

    assert!(second.reenrolled);
    assert!(second.key_created);
    assert_eq!(
        second.record.device_unique_id,
        first.record.device_unique_id
    );
    assert_ne!(second.record.public_key, first.record.public_key);
}

#[tokio::test]
async fn test_refresh_status_persists_approval() {
    let h = harness(DeviceStatus::Pending);
    h.agent.enroll("code-1", false).await.unwrap();

    h.backend.set_status(DeviceStatus::Active);
    let (record, _) = h.agent.refresh_status().await.unwrap();

    assert_eq!(record.status, DeviceStatus::Active);
    assert_eq!(
        h.state.enrollment().unwrap().unwrap().status,
        DeviceStatus::Active
    );
}

#[tokio::test]
async fn test_reset_removes_key_and_enrollment_but_keeps_config() {
    let h = harness(DeviceStatus::Active);
    let identity = h.state.identity().unwrap();
    h.agent.enroll("code-1", false).await.unwrap();

    let report = h.agent.reset().await.unwrap();

    assert!(report.key_deleted);
    assert!(h.state.enrollment().unwrap().is_none());
    assert!(!h.store.status().await.unwrap().exists);
    assert!(h.home.path().join(CONFIG_FILE).exists());
    assert_eq!(h.state.identity().unwrap(), identity);

    let status = h.agent.status().await.unwrap();
    assert!(!status.key_exists);
    assert!(status.enrollment.is_none());
}

#[tokio::test]
async fn test_step_up_signs_canonical_challenge() {
    let h = harness(DeviceStatus::Active);
    h.agent.enroll("code-1", false).await.unwrap();

    let response = h.agent.step_up().await.unwrap();

    assert!(response.verified);
    let log = h.backend.log.lock().unwrap();
    assert_eq!(log.verifications.len(), 1);
    assert!(log.verifications[0].fingerprint_hash.is_some());
}

#[tokio::test]
async fn test_step_up_without_enrollment() {
    let h = harness(DeviceStatus::Active);

    assert!(matches!(
        h.agent.step_up().await,
        Err(AgentError::NotEnrolled)
    ));
}
