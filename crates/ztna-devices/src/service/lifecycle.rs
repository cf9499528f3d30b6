//! Enrollment code administration and device lifecycle transitions.

use crate::{errors::*, types::*};
use tracing::info;
use uuid::Uuid;
use ztna_crypto::{current_timestamp, generate_random_bytes, hash_for_log};
use ztna_storage::{Storage, CF_DEVICES, CF_ENROLLMENT_CODES};

use super::DeviceService;

/// Longest allowed enrollment code lifetime (30 days)
const MAX_CODE_TTL_SECONDS: u64 = 30 * 24 * 3600;

impl<S: Storage + 'static> DeviceService<S> {
    pub(crate) async fn create_code_internal(
        &self,
        max_uses: u32,
        ttl_seconds: u64,
    ) -> Result<EnrollmentCode> {
        if max_uses == 0 {
            return Err(DeviceError::InvalidRequest(
                "max_uses must be at least 1".to_string(),
            ));
        }
        if ttl_seconds > MAX_CODE_TTL_SECONDS {
            return Err(DeviceError::InvalidRequest(format!(
                "ttl_seconds must not exceed {MAX_CODE_TTL_SECONDS}"
            )));
        }

        let now = current_timestamp();
        let code = EnrollmentCode {
            code: hex::encode(generate_random_bytes::<16>()?),
            max_uses,
            uses_count: 0,
            expires_at: now + ttl_seconds,
            is_active: true,
            created_at: now,
        };

        self.storage
            .put(CF_ENROLLMENT_CODES, &code.code, &code)
            .await?;

        info!(
            code = %hash_for_log(&code.code),
            max_uses,
            expires_at = code.expires_at,
            "Enrollment code created"
        );
        Ok(code)
    }

    pub(crate) async fn deactivate_code_internal(&self, code: &str) -> Result<EnrollmentCode> {
        let _guard = self.write_lock.lock().await;

        let mut stored: EnrollmentCode = self
            .storage
            .get(CF_ENROLLMENT_CODES, &code.to_string())
            .await?
            .ok_or(DeviceError::CodeInvalid)?;

        if stored.is_active {
            stored.is_active = false;
            self.storage
                .put(CF_ENROLLMENT_CODES, &stored.code, &stored)
                .await?;
            info!(code = %hash_for_log(code), "Enrollment code deactivated");
        }
        Ok(stored)
    }

    pub(crate) async fn transition_internal(
        &self,
        device_id: Uuid,
        action: LifecycleAction,
    ) -> Result<DeviceRecord> {
        let _guard = self.write_lock.lock().await;
        let mut device = self.load_device(device_id).await?;

        let to = action.target();
        if !device.status.can_transition_to(to) {
            return Err(DeviceError::InvalidTransition {
                from: device.status,
                to,
            });
        }

        let from = device.status;
        device.status = to;
        device.updated_at = current_timestamp();
        self.storage.put(CF_DEVICES, &device.id, &device).await?;

        info!(
            device_id = %device_id,
            from = from.as_str(),
            to = to.as_str(),
            "Device status changed"
        );
        Ok(device)
    }

    pub(crate) async fn assign_user_internal(
        &self,
        device_id: Uuid,
        user_id: Option<Uuid>,
    ) -> Result<DeviceRecord> {
        let _guard = self.write_lock.lock().await;
        let mut device = self.load_device(device_id).await?;

        device.user_id = user_id;
        device.updated_at = current_timestamp();
        self.storage.put(CF_DEVICES, &device.id, &device).await?;

        info!(device_id = %device_id, user_id = ?user_id, "Device owner assigned");
        Ok(device)
    }
}
