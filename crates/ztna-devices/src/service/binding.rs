//! Key and fingerprint binding alerts.

use crate::{errors::*, types::*};
use tracing::{debug, warn};
use uuid::Uuid;
use ztna_crypto::{constant_time_compare, current_timestamp};
use ztna_storage::{Storage, CF_DEVICES};

use super::DeviceService;

impl<S: Storage + 'static> DeviceService<S> {
    /// Raise a binding alert on a record. A key mismatch is never downgraded
    /// to a fingerprint mismatch.
    pub(crate) fn raise_alert(device: &mut DeviceRecord, kind: BindingAlertKind, now: u64) {
        device.failed_verifications = device.failed_verifications.saturating_add(1);
        device.updated_at = now;

        let keep_existing = matches!(
            device.binding_alert,
            Some(BindingAlert {
                kind: BindingAlertKind::KeyMismatch,
                ..
            })
        );
        if !keep_existing {
            device.binding_alert = Some(BindingAlert {
                kind,
                raised_at: now,
            });
        }

        warn!(
            device_id = %device.id,
            alert = ?kind,
            failures = device.failed_verifications,
            "Device binding alert raised"
        );
    }

    /// Count a failed verification. Without a presented fingerprint there is
    /// no evidence of which binding broke, so no alert is raised.
    pub(crate) async fn record_signature_failure_internal(
        &self,
        device_id: Uuid,
        presented_fingerprint: Option<String>,
    ) -> Result<Option<BindingAlertKind>> {
        let _guard = self.write_lock.lock().await;
        let mut device = self.load_device(device_id).await?;
        let now = current_timestamp();

        match presented_fingerprint {
            Some(fingerprint) => {
                let kind = if constant_time_compare(
                    fingerprint.as_bytes(),
                    device.fingerprint_hash.as_bytes(),
                ) {
                    BindingAlertKind::KeyMismatch
                } else {
                    BindingAlertKind::FingerprintMismatch
                };
                Self::raise_alert(&mut device, kind, now);
            }
            None => {
                device.failed_verifications = device.failed_verifications.saturating_add(1);
                device.updated_at = now;
                debug!(
                    device_id = %device.id,
                    failures = device.failed_verifications,
                    "Signature failure without fingerprint; no alert raised"
                );
            }
        }

        self.storage.put(CF_DEVICES, &device.id, &device).await?;
        Ok(device.binding_alert.map(|alert| alert.kind))
    }

    pub(crate) async fn record_signature_success_internal(&self, device_id: Uuid) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut device = self.load_device(device_id).await?;

        if device.failed_verifications != 0 {
            device.failed_verifications = 0;
            device.updated_at = current_timestamp();
            self.storage.put(CF_DEVICES, &device.id, &device).await?;
        }
        Ok(())
    }
}
