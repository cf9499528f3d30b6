//! Enrollment protocol: first enrollment and re-enrollment.

use crate::{errors::*, types::*};
use tracing::{info, warn};
use uuid::Uuid;
use ztna_crypto::{current_timestamp, hash_for_log, parse_public_key};
use ztna_storage::{
    BatchExt, Storage, CF_DEVICES, CF_DEVICES_BY_UNIQUE_ID, CF_ENROLLMENT_CODES, CF_LATEST_POSTURE,
};

use super::DeviceService;

impl<S: Storage + 'static> DeviceService<S> {
    /// Enroll a device.
    ///
    /// The code check, the device write and the `uses_count` increment happen
    /// under the registry write lock and land in one batch, so a code is never
    /// consumed past `max_uses`.
    pub(crate) async fn enroll_internal(
        &self,
        request: EnrollmentRequest,
    ) -> Result<EnrollmentResult> {
        if request.fingerprint_hash.trim().is_empty() {
            return Err(DeviceError::InvalidRequest(
                "fingerprint_hash is empty".to_string(),
            ));
        }
        parse_public_key(&request.tpm_public_key)?;

        let _guard = self.write_lock.lock().await;
        let now = current_timestamp();

        let mut code: EnrollmentCode = self
            .storage
            .get(CF_ENROLLMENT_CODES, &request.code)
            .await?
            .ok_or(DeviceError::CodeInvalid)?;
        code.check_usable(now)?;

        let initial_status = if self.config.auto_approve {
            DeviceStatus::Active
        } else {
            DeviceStatus::Pending
        };

        let existing = self.resolve_unique_id(request.device_unique_id).await?;
        let reenrolled = existing.is_some();

        let device = match existing {
            Some(device_id) => match self.config.reenrollment {
                ReEnrollmentPolicy::Reject => {
                    warn!(
                        device_unique_id = %request.device_unique_id,
                        "Re-enrollment refused by policy"
                    );
                    return Err(DeviceError::DeviceAlreadyEnrolled(request.device_unique_id));
                }
                ReEnrollmentPolicy::AllowRekey => {
                    let mut device = self.load_device(device_id).await?;
                    if device.fingerprint_hash != request.fingerprint_hash {
                        info!(device_id = %device_id, "Re-enrollment with new hardware fingerprint");
                    }
                    device.fingerprint_hash = request.fingerprint_hash;
                    device.tpm_public_key = request.tpm_public_key;
                    device.status = initial_status;
                    device.is_compliant = false;
                    device.binding_alert = None;
                    device.failed_verifications = 0;
                    device.enrolled_at = now;
                    device.updated_at = now;
                    device
                }
            },
            None => DeviceRecord {
                id: Uuid::new_v4(),
                device_unique_id: request.device_unique_id,
                fingerprint_hash: request.fingerprint_hash,
                tpm_public_key: request.tpm_public_key,
                status: initial_status,
                is_compliant: false,
                last_seen_at: None,
                user_id: None,
                enrolled_at: now,
                updated_at: now,
                binding_alert: None,
                failed_verifications: 0,
            },
        };

        code.uses_count += 1;

        let mut batch = self.storage.batch();
        batch.put(CF_DEVICES, &device.id, &device)?;
        batch.put(CF_DEVICES_BY_UNIQUE_ID, &device.device_unique_id, &device.id)?;
        batch.put(CF_ENROLLMENT_CODES, &code.code, &code)?;
        if reenrolled {
            // Reports signed by the old key no longer describe this device
            batch.delete(CF_LATEST_POSTURE, &device.id)?;
        }
        batch.commit().await?;

        info!(
            device_id = %device.id,
            device_unique_id = %device.device_unique_id,
            status = device.status.as_str(),
            reenrolled,
            code = %hash_for_log(&code.code),
            uses = code.uses_count,
            max_uses = code.max_uses,
            "Device enrolled"
        );

        Ok(EnrollmentResult { device, reenrolled })
    }
}
