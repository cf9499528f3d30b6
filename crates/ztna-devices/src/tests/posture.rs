use super::helpers::*;
use crate::*;
use ztna_crypto::DeviceSigningKey;

#[tokio::test]
async fn test_compliant_report_is_accepted() {
    let service = create_service(auto_approve_config());
    let agent = TestAgent::new(1);
    let device = enroll(&service, &agent).await;

    let accepted = service
        .submit_posture(agent.submission(now(), healthy_facts()))
        .await
        .unwrap();

    assert!(accepted.report.is_compliant);
    assert_eq!(accepted.report.compliance_score, 100);
    assert!(accepted.device.is_compliant);
    assert!(accepted.device.last_seen_at.is_some());

    let latest = service.latest_posture(device.id).await.unwrap().unwrap();
    assert_eq!(latest, accepted.report);
}

#[tokio::test]
async fn test_server_recomputes_compliance() {
    let service = create_service(auto_approve_config());
    let agent = TestAgent::new(1);
    enroll(&service, &agent).await;

    let mut submission = agent.submission(
        now(),
        ztna_posture::PostureFacts {
            disk_encrypted: false,
            ..healthy_facts()
        },
    );
    // The agent's own verdict is unsigned and advisory
    submission.agent_result.is_compliant = true;
    submission.agent_result.violations.clear();

    let accepted = service.submit_posture(submission).await.unwrap();

    assert!(!accepted.report.is_compliant);
    assert_eq!(accepted.report.violations, vec!["disk not encrypted".to_string()]);
    assert!(!accepted.device.is_compliant);
}

#[tokio::test]
async fn test_replayed_report_is_rejected() {
    let service = create_service(auto_approve_config());
    let agent = TestAgent::new(1);
    enroll(&service, &agent).await;

    let checked_at = now();
    let submission = agent.submission(checked_at, healthy_facts());
    service.submit_posture(submission.clone()).await.unwrap();

    let err = service.submit_posture(submission).await.unwrap_err();
    assert!(matches!(err, DeviceError::PostureReplay));

    let older = agent.submission(checked_at - 10, healthy_facts());
    let err = service.submit_posture(older).await.unwrap_err();
    assert!(matches!(err, DeviceError::PostureReplay));
}

#[tokio::test]
async fn test_future_report_is_rejected() {
    let service = create_service(auto_approve_config());
    let agent = TestAgent::new(1);
    enroll(&service, &agent).await;

    let err = service
        .submit_posture(agent.submission(now() + 3600, healthy_facts()))
        .await
        .unwrap_err();
    assert!(matches!(err, DeviceError::FutureTimestamp(_)));
}

#[tokio::test]
async fn test_pending_device_cannot_report() {
    let service = create_service(DeviceConfig::default());
    let agent = TestAgent::new(1);
    enroll(&service, &agent).await;

    let err = service
        .submit_posture(agent.submission(now(), healthy_facts()))
        .await
        .unwrap_err();
    assert!(matches!(err, DeviceError::DeviceNotActive(DeviceStatus::Pending)));
}

#[tokio::test]
async fn test_unknown_device_cannot_report() {
    let service = create_service(auto_approve_config());
    let agent = TestAgent::new(1);

    let err = service
        .submit_posture(agent.submission(now(), healthy_facts()))
        .await
        .unwrap_err();
    assert!(matches!(err, DeviceError::DeviceNotFound(_)));
}

#[tokio::test]
async fn test_wrong_key_with_matching_fingerprint_is_key_mismatch() {
    let service = create_service(auto_approve_config());
    let agent = TestAgent::new(1);
    let device = enroll(&service, &agent).await;

    let attacker = DeviceSigningKey::from_seed(&[200u8; 32]);
    let err = service
        .submit_posture(agent.submission_signed_by(&attacker, now(), healthy_facts()))
        .await
        .unwrap_err();
    assert!(matches!(err, DeviceError::KeyMismatch));

    let device = service.get_device(device.id).await.unwrap();
    let alert = device.binding_alert.unwrap();
    assert_eq!(alert.kind, BindingAlertKind::KeyMismatch);
    assert_eq!(device.failed_verifications, 1);
    assert!(service.latest_posture(device.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_foreign_fingerprint_is_fingerprint_mismatch() {
    let service = create_service(auto_approve_config());
    let agent = TestAgent::new(1);
    let device = enroll(&service, &agent).await;

    let reimaged = TestAgent {
        device_unique_id: agent.device_unique_id,
        fingerprint_hash: TestAgent::new(2).fingerprint_hash,
        key: DeviceSigningKey::from_seed(&[1u8; 32]),
    };

    let err = service
        .submit_posture(reimaged.submission(now(), healthy_facts()))
        .await
        .unwrap_err();
    assert!(matches!(err, DeviceError::FingerprintMismatch));

    let device = service.get_device(device.id).await.unwrap();
    assert_eq!(
        device.binding_alert.map(|a| a.kind),
        Some(BindingAlertKind::FingerprintMismatch)
    );
}

#[tokio::test]
async fn test_history_is_append_only_and_ordered() {
    let service = create_service(auto_approve_config());
    let agent = TestAgent::new(1);
    let device = enroll(&service, &agent).await;
    let base = now() - 100;

    for offset in [0u64, 10, 20] {
        service
            .submit_posture(agent.submission(base + offset, healthy_facts()))
            .await
            .unwrap();
    }

    let history = service.posture_history(device.id).await.unwrap();
    let checked: Vec<u64> = history.iter().map(|r| r.checked_at).collect();
    assert_eq!(checked, vec![base, base + 10, base + 20]);

    let other = enroll(&service, &TestAgent::new(2)).await;
    assert!(service.posture_history(other.id).await.unwrap().is_empty());
}
