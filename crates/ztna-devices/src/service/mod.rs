//! Device registry service implementation.

mod binding;
mod enrollment;
mod lifecycle;
mod posture;

use crate::{errors::*, traits::DeviceRegistry, types::*};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;
use ztna_posture::{PostureReport, PostureSubmission};
use ztna_storage::{Storage, CF_DEVICES, CF_DEVICES_BY_UNIQUE_ID};

/// Device registry service
pub struct DeviceService<S: Storage> {
    storage: Arc<S>,
    config: DeviceConfig,
    /// Serializes read-modify-write sequences on device records and codes
    write_lock: Mutex<()>,
}

impl<S: Storage + 'static> DeviceService<S> {
    /// Create a new device registry service
    pub fn new(storage: Arc<S>, config: DeviceConfig) -> Self {
        Self {
            storage,
            config,
            write_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    async fn load_device(&self, device_id: Uuid) -> Result<DeviceRecord> {
        self.storage
            .get(CF_DEVICES, &device_id)
            .await?
            .ok_or(DeviceError::DeviceNotFound(device_id))
    }

    async fn resolve_unique_id(&self, device_unique_id: Uuid) -> Result<Option<Uuid>> {
        Ok(self
            .storage
            .get(CF_DEVICES_BY_UNIQUE_ID, &device_unique_id)
            .await?)
    }
}

#[async_trait]
impl<S: Storage + 'static> DeviceRegistry for DeviceService<S> {
    async fn create_code(&self, max_uses: u32, ttl_seconds: u64) -> Result<EnrollmentCode> {
        self.create_code_internal(max_uses, ttl_seconds).await
    }

    async fn deactivate_code(&self, code: &str) -> Result<EnrollmentCode> {
        self.deactivate_code_internal(code).await
    }

    async fn enroll(&self, request: EnrollmentRequest) -> Result<EnrollmentResult> {
        self.enroll_internal(request).await
    }

    async fn get_device(&self, device_id: Uuid) -> Result<DeviceRecord> {
        self.load_device(device_id).await
    }

    async fn get_device_by_unique_id(&self, device_unique_id: Uuid) -> Result<DeviceRecord> {
        let device_id = self
            .resolve_unique_id(device_unique_id)
            .await?
            .ok_or(DeviceError::DeviceNotFound(device_unique_id))?;
        self.load_device(device_id).await
    }

    async fn list_devices(&self) -> Result<Vec<DeviceRecord>> {
        let mut devices: Vec<DeviceRecord> = self
            .storage
            .scan_all::<DeviceRecord>(CF_DEVICES)
            .await?
            .into_iter()
            .map(|(_, device)| device)
            .collect();
        devices.sort_by_key(|d| d.enrolled_at);
        Ok(devices)
    }

    async fn transition(&self, device_id: Uuid, action: LifecycleAction) -> Result<DeviceRecord> {
        self.transition_internal(device_id, action).await
    }

    async fn assign_user(&self, device_id: Uuid, user_id: Option<Uuid>) -> Result<DeviceRecord> {
        self.assign_user_internal(device_id, user_id).await
    }

    async fn submit_posture(&self, submission: PostureSubmission) -> Result<PostureAccepted> {
        self.submit_posture_internal(submission).await
    }

    async fn latest_posture(&self, device_id: Uuid) -> Result<Option<PostureReport>> {
        self.latest_posture_internal(device_id).await
    }

    async fn posture_history(&self, device_id: Uuid) -> Result<Vec<PostureReport>> {
        self.posture_history_internal(device_id).await
    }

    async fn record_signature_failure(
        &self,
        device_id: Uuid,
        presented_fingerprint: Option<String>,
    ) -> Result<Option<BindingAlertKind>> {
        self.record_signature_failure_internal(device_id, presented_fingerprint)
            .await
    }

    async fn record_signature_success(&self, device_id: Uuid) -> Result<()> {
        self.record_signature_success_internal(device_id).await
    }
}
