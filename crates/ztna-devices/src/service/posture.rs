//! Posture intake and history.

use crate::{errors::*, types::*};
use tracing::{debug, info};
use uuid::Uuid;
use ztna_crypto::{constant_time_compare, current_timestamp};
use ztna_posture::{evaluate, PostureReport, PostureSubmission};
use ztna_storage::{BatchExt, Storage, CF_DEVICES, CF_LATEST_POSTURE, CF_POSTURE_REPORTS};

use super::DeviceService;

impl<S: Storage + 'static> DeviceService<S> {
    /// Accept a signed posture submission.
    ///
    /// Order of checks: known device, timestamp sanity, signature and
    /// fingerprint binding, device status, replay. Binding failures are
    /// persisted as alerts before the error is returned.
    pub(crate) async fn submit_posture_internal(
        &self,
        submission: PostureSubmission,
    ) -> Result<PostureAccepted> {
        let envelope = &submission.envelope;

        let _guard = self.write_lock.lock().await;
        let now = current_timestamp();

        let device_id = self
            .resolve_unique_id(envelope.device_unique_id)
            .await?
            .ok_or(DeviceError::DeviceNotFound(envelope.device_unique_id))?;
        let mut device = self.load_device(device_id).await?;

        if envelope.checked_at > now + MAX_CLOCK_SKEW_SECONDS {
            return Err(DeviceError::FutureTimestamp(envelope.checked_at));
        }

        let fingerprint_matches = constant_time_compare(
            envelope.fingerprint_hash.as_bytes(),
            device.fingerprint_hash.as_bytes(),
        );
        let signature_valid = submission.verify(&device.tpm_public_key).is_ok();

        if !signature_valid || !fingerprint_matches {
            let kind = if fingerprint_matches {
                BindingAlertKind::KeyMismatch
            } else {
                BindingAlertKind::FingerprintMismatch
            };
            Self::raise_alert(&mut device, kind, now);
            self.storage.put(CF_DEVICES, &device.id, &device).await?;

            return Err(match kind {
                BindingAlertKind::KeyMismatch => DeviceError::KeyMismatch,
                BindingAlertKind::FingerprintMismatch => DeviceError::FingerprintMismatch,
            });
        }

        if device.status != DeviceStatus::Active {
            return Err(DeviceError::DeviceNotActive(device.status));
        }

        let latest: Option<PostureReport> =
            self.storage.get(CF_LATEST_POSTURE, &device.id).await?;
        if let Some(latest) = latest {
            if envelope.checked_at <= latest.checked_at {
                return Err(DeviceError::PostureReplay);
            }
        }

        let result = evaluate(&envelope.facts, &self.config.compliance);
        if result.is_compliant != submission.agent_result.is_compliant {
            debug!(
                device_id = %device.id,
                agent = submission.agent_result.is_compliant,
                server = result.is_compliant,
                "Agent compliance verdict overridden"
            );
        }

        let report = PostureReport {
            report_id: Uuid::new_v4(),
            device_id: device.id,
            checked_at: envelope.checked_at,
            received_at: now,
            facts: envelope.facts.clone(),
            signature: submission.signature_bytes()?,
            is_compliant: result.is_compliant,
            compliance_score: result.compliance_score,
            violations: result.violations,
        };

        device.last_seen_at = Some(now);
        device.is_compliant = report.is_compliant;
        device.failed_verifications = 0;
        device.updated_at = now;

        let mut batch = self.storage.batch();
        batch.put(CF_POSTURE_REPORTS, &(device.id, report.report_id), &report)?;
        batch.put(CF_LATEST_POSTURE, &device.id, &report)?;
        batch.put(CF_DEVICES, &device.id, &device)?;
        batch.commit().await?;

        info!(
            device_id = %device.id,
            compliant = report.is_compliant,
            score = report.compliance_score,
            "Posture report accepted"
        );

        Ok(PostureAccepted { report, device })
    }

    pub(crate) async fn latest_posture_internal(
        &self,
        device_id: Uuid,
    ) -> Result<Option<PostureReport>> {
        Ok(self.storage.get(CF_LATEST_POSTURE, &device_id).await?)
    }

    pub(crate) async fn posture_history_internal(
        &self,
        device_id: Uuid,
    ) -> Result<Vec<PostureReport>> {
        // Fail with DeviceNotFound rather than returning an empty history
        self.load_device(device_id).await?;

        let mut reports: Vec<PostureReport> = self
            .storage
            .get_by_prefix::<_, PostureReport>(CF_POSTURE_REPORTS, &device_id)
            .await?
            .into_iter()
            .map(|(_, report)| report)
            .collect();
        reports.sort_by_key(|r| (r.checked_at, r.received_at));
        Ok(reports)
    }
}
