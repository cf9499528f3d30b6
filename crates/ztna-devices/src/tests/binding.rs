use super::helpers::*;
use crate::*;

#[tokio::test]
async fn test_failure_without_fingerprint_raises_no_alert() {
    let service = create_service(auto_approve_config());
    let device = enroll(&service, &TestAgent::new(1)).await;

    let kind = service
        .record_signature_failure(device.id, None)
        .await
        .unwrap();
    assert_eq!(kind, None);

    let device = service.get_device(device.id).await.unwrap();
    assert_eq!(device.binding_alert, None);
    assert_eq!(device.failed_verifications, 1);
}

#[tokio::test]
async fn test_failure_with_matching_fingerprint_is_key_mismatch() {
    let service = create_service(auto_approve_config());
    let agent = TestAgent::new(1);
    let device = enroll(&service, &agent).await;

    let kind = service
        .record_signature_failure(device.id, Some(agent.fingerprint_hash.clone()))
        .await
        .unwrap();
    assert_eq!(kind, Some(BindingAlertKind::KeyMismatch));
}

#[tokio::test]
async fn test_key_mismatch_is_never_downgraded() {
    let service = create_service(auto_approve_config());
    let agent = TestAgent::new(1);
    let device = enroll(&service, &agent).await;

    service
        .record_signature_failure(device.id, Some(agent.fingerprint_hash.clone()))
        .await
        .unwrap();
    let kind = service
        .record_signature_failure(device.id, Some("other".to_string()))
        .await
        .unwrap();

    assert_eq!(kind, Some(BindingAlertKind::KeyMismatch));
    let device = service.get_device(device.id).await.unwrap();
    assert_eq!(device.failed_verifications, 2);
}

#[tokio::test]
async fn test_success_resets_failure_counter_but_keeps_alert() {
    let service = create_service(auto_approve_config());
    let device = enroll(&service, &TestAgent::new(1)).await;

    service
        .record_signature_failure(device.id, Some("other".to_string()))
        .await
        .unwrap();
    service.record_signature_success(device.id).await.unwrap();

    let device = service.get_device(device.id).await.unwrap();
    assert_eq!(device.failed_verifications, 0);
    assert_eq!(
        device.binding_alert.map(|a| a.kind),
        Some(BindingAlertKind::FingerprintMismatch)
    );
}
