//! Policy decision point.

use crate::{errors::Result, evaluator::PolicyEvaluator, types::*};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info, warn};
use ztna_challenge::{ChallengeProtocol, VerifyRequest};
use ztna_crypto::current_timestamp;
use ztna_devices::{DeviceError, DeviceRegistry};

/// Policy decision point trait
#[async_trait]
pub trait DecisionPoint: Send + Sync {
    /// Decide whether a user may reach a resource from a device.
    ///
    /// Never fails: when the input cannot be gathered the answer is a
    /// high-risk denial.
    async fn decide(&self, request: DecisionRequest) -> PolicyDecision;
}

/// Decision point backed by the device registry and challenge verifier
pub struct PolicyDecisionPoint<D, C>
where
    D: DeviceRegistry,
    C: ChallengeProtocol,
{
    devices: Arc<D>,
    challenges: Arc<C>,
    config: PolicyConfig,
}

impl<D, C> PolicyDecisionPoint<D, C>
where
    D: DeviceRegistry + 'static,
    C: ChallengeProtocol + 'static,
{
    /// Create a new decision point
    pub fn new(devices: Arc<D>, challenges: Arc<C>, config: PolicyConfig) -> Self {
        Self {
            devices,
            challenges,
            config,
        }
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// Consume the step-up proof, if any. A failed proof does not fail the
    /// request; it only leaves the decision un-upgraded.
    async fn verify_step_up(&self, request: &DecisionRequest, tags: &mut Vec<String>) -> bool {
        let (Some(proof), Some(device_id)) = (&request.step_up, request.device_id) else {
            return false;
        };

        let verify = VerifyRequest {
            device_id,
            challenge: proof.challenge.clone(),
            signature: proof.signature.clone(),
            fingerprint_hash: proof.fingerprint_hash.clone(),
        };

        match self.challenges.verify(verify).await {
            Ok(_) => true,
            Err(e) => {
                warn!(device_id = %device_id, error = %e, "Step-up verification failed");
                tags.push("step_up:failed".to_string());
                false
            }
        }
    }

    /// Gather the decision input, verifying a step-up proof only for a
    /// device bound to the requesting user
    async fn gather_with_step_up(
        &self,
        request: &DecisionRequest,
        tags: &mut Vec<String>,
    ) -> Result<DecisionInput> {
        let mut input = self.gather(request).await?;
        if request.step_up.is_none() {
            return Ok(input);
        }

        let owned = input
            .device
            .as_ref()
            .is_some_and(|device| device.user_id == Some(request.user_id));
        if !owned {
            warn!(
                user_id = %request.user_id,
                device_id = ?request.device_id,
                "Step-up proof for a device not bound to the user; ignored"
            );
            tags.push("step_up:ignored".to_string());
            return Ok(input);
        }

        if self.verify_step_up(request, tags).await {
            input.step_up_verified = true;
            return Ok(input);
        }

        // A failed proof may have raised a binding alert
        self.gather(request).await
    }

    async fn gather(&self, request: &DecisionRequest) -> Result<DecisionInput> {
        let mut input = DecisionInput {
            user_id: request.user_id,
            resource: request.resource.clone(),
            device: None,
            latest_posture: None,
            step_up_verified: false,
            now: current_timestamp(),
        };

        let Some(device_id) = request.device_id else {
            return Ok(input);
        };

        input.device = match self.devices.get_device(device_id).await {
            Ok(device) => Some(device),
            Err(DeviceError::DeviceNotFound(_)) => return Ok(input),
            Err(e) => return Err(e.into()),
        };
        input.latest_posture = self.devices.latest_posture(device_id).await?;

        Ok(input)
    }
}

#[async_trait]
impl<D, C> DecisionPoint for PolicyDecisionPoint<D, C>
where
    D: DeviceRegistry + 'static,
    C: ChallengeProtocol + 'static,
{
    async fn decide(&self, request: DecisionRequest) -> PolicyDecision {
        let mut step_up_tags = Vec::new();
        let decision = match self.gather_with_step_up(&request, &mut step_up_tags).await {
            Ok(input) => {
                let mut decision = PolicyEvaluator::evaluate(&input, &self.config);
                decision.audit_tags.extend(step_up_tags);
                decision
            }
            Err(e) => {
                error!(
                    user_id = %request.user_id,
                    device_id = ?request.device_id,
                    error = %e,
                    "Decision input unavailable"
                );
                let (risk_score, _) = RiskLevel::High.score_band();
                PolicyDecision {
                    allowed: false,
                    risk_level: RiskLevel::High,
                    reason: "decision unavailable".to_string(),
                    requires_step_up: false,
                    risk_score,
                    audit_tags: vec![
                        format!("user:{}", request.user_id),
                        format!("resource:{}", request.resource),
                        "rule:unavailable".to_string(),
                    ],
                }
            }
        };

        info!(
            user_id = %request.user_id,
            device_id = ?request.device_id,
            resource = %request.resource,
            allowed = decision.allowed,
            risk_level = decision.risk_level.as_str(),
            risk_score = decision.risk_score,
            "Access decision"
        );

        decision
    }
}
