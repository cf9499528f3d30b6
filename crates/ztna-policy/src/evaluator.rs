//! Decision rules.

use crate::types::*;
use ztna_devices::{BindingAlertKind, DeviceStatus};

/// Risk points added per recent failed signature verification
const FAILED_VERIFICATION_PENALTY: u32 = 5;

/// Pure policy evaluator
pub struct PolicyEvaluator;

impl PolicyEvaluator {
    /// Evaluate a decision input. Deterministic: the same input always yields
    /// the same decision.
    ///
    /// Rules, first match wins:
    /// 1. No device or no posture report: deny, high
    /// 2. Key mismatch with known fingerprint: deny, critical, no step-up
    /// 3. Fingerprint mismatch: deny, high, re-enrollment required
    /// 4. Device not active or owned by another user: deny, high
    /// 5. Posture non-compliant or stale: medium, step-up offered; allowed
    ///    only with a step-up verified in this request
    /// 6. Otherwise: allow, low
    pub fn evaluate(input: &DecisionInput, config: &PolicyConfig) -> PolicyDecision {
        let mut audit_tags = vec![
            format!("user:{}", input.user_id),
            format!("resource:{}", input.resource),
        ];

        // 1. Agent reporting
        let (device, report) = match (&input.device, &input.latest_posture) {
            (Some(device), Some(report)) => (device, report),
            (device, _) => {
                if let Some(device) = device {
                    audit_tags.push(format!("device:{}", device.id));
                }
                audit_tags.push("rule:agent_not_reporting".to_string());
                return Self::decide(
                    false,
                    RiskLevel::High,
                    "agent not reporting",
                    false,
                    0,
                    audit_tags,
                );
            }
        };
        audit_tags.push(format!("device:{}", device.id));
        let failures = device.failed_verifications;
        if failures > 0 {
            audit_tags.push(format!("failed_verifications:{}", failures));
        }

        // 2-3. Identity binding
        match device.binding_alert.map(|alert| alert.kind) {
            Some(BindingAlertKind::KeyMismatch) => {
                audit_tags.push("rule:key_mismatch".to_string());
                return Self::decide(
                    false,
                    RiskLevel::Critical,
                    "key verification failed",
                    false,
                    failures,
                    audit_tags,
                );
            }
            Some(BindingAlertKind::FingerprintMismatch) => {
                audit_tags.push("rule:fingerprint_mismatch".to_string());
                return Self::decide(
                    false,
                    RiskLevel::High,
                    "device fingerprint changed; re-enrollment required",
                    false,
                    failures,
                    audit_tags,
                );
            }
            None => {}
        }

        // 4. Enrollment status and ownership
        if device.status != DeviceStatus::Active {
            audit_tags.push(format!("rule:device_status:{}", device.status.as_str()));
            return Self::decide(
                false,
                RiskLevel::High,
                &format!("device not active (status: {})", device.status.as_str()),
                false,
                failures,
                audit_tags,
            );
        }
        if matches!(device.user_id, Some(owner) if owner != input.user_id) {
            audit_tags.push("rule:device_owner".to_string());
            return Self::decide(
                false,
                RiskLevel::High,
                "device is not enrolled to this user",
                false,
                failures,
                audit_tags,
            );
        }

        // 5. Posture compliance and freshness
        let stale = !report.is_fresh(input.now, config.freshness_seconds);
        if stale || !report.is_compliant {
            let mut causes = Vec::new();
            if stale {
                audit_tags.push("posture:stale".to_string());
                causes.push(format!(
                    "posture report stale ({}s old)",
                    report.age_seconds(input.now)
                ));
            }
            if !report.is_compliant {
                for violation in &report.violations {
                    audit_tags.push(format!("violation:{}", violation));
                }
                causes.push(format!("non-compliant: {}", report.violations.join(", ")));
            }

            let step_up_passed = config.allow_step_up && input.step_up_verified;
            audit_tags.push("rule:posture".to_string());
            if step_up_passed {
                audit_tags.push("step_up:verified".to_string());
            }

            let reason = if step_up_passed {
                format!("conditional access after step-up: {}", causes.join("; "))
            } else {
                causes.join("; ")
            };

            return Self::decide(
                step_up_passed,
                RiskLevel::Medium,
                &reason,
                config.allow_step_up,
                failures,
                audit_tags,
            );
        }

        // 6. All checks passed
        audit_tags.push("rule:allow".to_string());
        Self::decide(
            true,
            RiskLevel::Low,
            "device trusted and compliant",
            false,
            failures,
            audit_tags,
        )
    }

    /// Score within the tier band, raised by recent verification failures
    pub fn risk_score(level: RiskLevel, failed_verifications: u32) -> u8 {
        let (base, cap) = level.score_band();
        let bumped = base as u32 + failed_verifications.saturating_mul(FAILED_VERIFICATION_PENALTY);
        bumped.min(cap as u32) as u8
    }

    fn decide(
        allowed: bool,
        risk_level: RiskLevel,
        reason: &str,
        requires_step_up: bool,
        failed_verifications: u32,
        audit_tags: Vec<String>,
    ) -> PolicyDecision {
        PolicyDecision {
            allowed,
            risk_level,
            reason: reason.to_string(),
            requires_step_up,
            risk_score: Self::risk_score(risk_level, failed_verifications),
            audit_tags,
        }
    }
}
