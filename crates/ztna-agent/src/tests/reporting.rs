use super::helpers::*;
use crate::{
    agent::CycleReport,
    errors::{AgentError, Disposition},
    state::DeviceStatus,
};
use std::time::Duration;
use ztna_keystore::KeyStore;
use ztna_posture::PostureFacts;

#[tokio::test]
async fn test_cycle_submits_verifiable_report() {
    let h = harness(DeviceStatus::Active);
    let enrolled = h.agent.enroll("code-1", false).await.unwrap();

    let report = h.agent.collect_and_submit().await.unwrap();

    let CycleReport::Submitted { local, response } = report else {
        panic!("expected a submitted report");
    };
    assert!(local.is_compliant);
    assert!(response.is_compliant);

    let log = h.backend.log.lock().unwrap();
    let envelope = &log.submissions[0].envelope;
    assert_eq!(envelope.device_unique_id, enrolled.record.device_unique_id);
    assert_eq!(envelope.fingerprint_hash, enrolled.record.fingerprint_hash);
    assert_eq!(envelope.facts, compliant_facts());
}

#[tokio::test]
async fn test_non_compliant_facts_are_still_reported() {
    let facts = PostureFacts {
        firewall_enabled: true,
        ..Default::default()
    };
    let h = harness_with(FakeBackend::new(DeviceStatus::Active), facts);
    h.agent.enroll("code-1", false).await.unwrap();

    let CycleReport::Submitted { local, .. } = h.agent.collect_and_submit().await.unwrap() else {
        panic!("expected a submitted report");
    };

    assert!(!local.is_compliant);
    assert_eq!(local.violations.len(), 3);
    assert_eq!(h.backend.log.lock().unwrap().submissions.len(), 1);
}

#[tokio::test]
async fn test_pending_device_does_not_sign() {
    let h = harness(DeviceStatus::Pending);
    h.agent.enroll("code-1", false).await.unwrap();

    let report = h.agent.collect_and_submit().await.unwrap();

    assert!(matches!(
        report,
        CycleReport::AwaitingApproval(DeviceStatus::Pending)
    ));
    assert!(h.backend.log.lock().unwrap().submissions.is_empty());
}

#[tokio::test]
async fn test_cycle_reports_after_approval() {
    let h = harness(DeviceStatus::Pending);
    h.agent.enroll("code-1", false).await.unwrap();
    h.backend.set_status(DeviceStatus::Active);

    let report = h.agent.collect_and_submit().await.unwrap();

    assert!(matches!(report, CycleReport::Submitted { .. }));
}

#[tokio::test]
async fn test_missing_key_is_not_retried_early() {
    let h = harness(DeviceStatus::Active);
    h.agent.enroll("code-1", false).await.unwrap();
    h.store.delete().await.unwrap();

    let err = h.agent.collect_and_submit().await.unwrap_err();

    assert!(matches!(err, AgentError::KeyStore(_)));
    assert_eq!(err.disposition(), Disposition::Halt);
    assert!(h.backend.log.lock().unwrap().submissions.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_slow_backend_times_out_as_retryable() {
    let mut backend = FakeBackend::new(DeviceStatus::Active);
    backend.submit_delay = Duration::from_secs(60);
    let h = harness_with(backend, compliant_facts());
    h.agent.enroll("code-1", false).await.unwrap();

    let err = h.agent.collect_and_submit().await.unwrap_err();

    assert!(matches!(err, AgentError::SubmissionTimeout));
    assert_eq!(err.disposition(), Disposition::Retry);
}

#[tokio::test]
async fn test_unenrolled_cycle_fails() {
    let h = harness(DeviceStatus::Active);

    assert!(matches!(
        h.agent.collect_and_submit().await,
        Err(AgentError::NotEnrolled)
    ));
}
