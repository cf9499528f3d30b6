//! Policy decision type definitions.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use ztna_devices::DeviceRecord;
use ztna_posture::PostureReport;

/// Risk tier of a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Inclusive `risk_score` band for this tier
    pub fn score_band(&self) -> (u8, u8) {
        match self {
            RiskLevel::Low => (5, 24),
            RiskLevel::Medium => (40, 59),
            RiskLevel::High => (70, 89),
            RiskLevel::Critical => (100, 100),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

/// Access decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDecision {
    pub allowed: bool,
    pub risk_level: RiskLevel,
    /// Human-readable cause, safe to show to the user
    pub reason: String,
    /// A fresh challenge-response could upgrade this decision
    pub requires_step_up: bool,
    /// 0-100, within the band of `risk_level`
    pub risk_score: u8,
    /// Rule and signal tags for the audit trail
    pub audit_tags: Vec<String>,
}

/// Knobs of the decision rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyConfig {
    /// Maximum age of a posture report before it counts as stale
    pub freshness_seconds: u64,
    /// Whether medium-risk decisions may be upgraded by step-up
    pub allow_step_up: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            freshness_seconds: 900,
            allow_step_up: true,
        }
    }
}

/// Everything the evaluator looks at, gathered per request
#[derive(Debug, Clone)]
pub struct DecisionInput {
    pub user_id: Uuid,
    pub resource: String,
    pub device: Option<DeviceRecord>,
    pub latest_posture: Option<PostureReport>,
    /// A challenge-response for this device succeeded within this request
    pub step_up_verified: bool,
    pub now: u64,
}

/// Signed challenge answer attached to a decision request
#[derive(Debug, Clone)]
pub struct StepUpProof {
    pub challenge: String,
    pub signature: Vec<u8>,
    pub fingerprint_hash: Option<String>,
}

/// Decision request as seen by the decision point
#[derive(Debug, Clone)]
pub struct DecisionRequest {
    /// User of the authenticated session
    pub user_id: Uuid,
    pub resource: String,
    pub device_id: Option<Uuid>,
    pub step_up: Option<StepUpProof>,
}
