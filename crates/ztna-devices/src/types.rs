//! Device registry type definitions.

use crate::errors::{DeviceError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;
use ztna_crypto::PUBLIC_KEY_SIZE;
use ztna_posture::{CompliancePolicy, PostureReport};

/// Allowed clock skew for agent timestamps
pub const MAX_CLOCK_SKEW_SECONDS: u64 = 60;

/// Device lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    Pending,
    Active,
    Rejected,
    Inactive,
}

impl DeviceStatus {
    /// Whether an admin may move a device from `self` to `to`
    pub fn can_transition_to(self, to: DeviceStatus) -> bool {
        matches!(
            (self, to),
            (DeviceStatus::Pending, DeviceStatus::Active)
                | (DeviceStatus::Pending, DeviceStatus::Rejected)
                | (DeviceStatus::Active, DeviceStatus::Inactive)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceStatus::Pending => "pending",
            DeviceStatus::Active => "active",
            DeviceStatus::Rejected => "rejected",
            DeviceStatus::Inactive => "inactive",
        }
    }
}

/// Kind of identity binding failure seen for a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingAlertKind {
    /// Fingerprint matched but the signature did not verify: possible compromise
    KeyMismatch,
    /// A different hardware fingerprint was presented: re-imaging or cloning
    FingerprintMismatch,
}

/// Persistent binding alert; cleared only by re-enrollment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingAlert {
    pub kind: BindingAlertKind,
    pub raised_at: u64,
}

/// Backend copy of an enrolled device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub id: Uuid,
    pub device_unique_id: Uuid,
    pub fingerprint_hash: String,
    pub tpm_public_key: [u8; PUBLIC_KEY_SIZE],
    pub status: DeviceStatus,
    pub is_compliant: bool,
    pub last_seen_at: Option<u64>,
    pub user_id: Option<Uuid>,
    pub enrolled_at: u64,
    pub updated_at: u64,
    pub binding_alert: Option<BindingAlert>,
    /// Signature failures since the last successful verification
    pub failed_verifications: u32,
}

/// One-time enrollment code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentCode {
    pub code: String,
    pub max_uses: u32,
    pub uses_count: u32,
    pub expires_at: u64,
    pub is_active: bool,
    pub created_at: u64,
}

impl EnrollmentCode {
    /// Validate the code for one more use at `now`
    pub fn check_usable(&self, now: u64) -> Result<()> {
        if !self.is_active {
            return Err(DeviceError::CodeInvalid);
        }
        if now >= self.expires_at {
            return Err(DeviceError::CodeExpired);
        }
        if self.is_exhausted() {
            return Err(DeviceError::CodeExhausted);
        }
        Ok(())
    }

    pub fn is_exhausted(&self) -> bool {
        self.uses_count >= self.max_uses
    }
}

/// Enrollment request as submitted by the agent
#[derive(Debug, Clone)]
pub struct EnrollmentRequest {
    pub code: String,
    pub device_unique_id: Uuid,
    pub fingerprint_hash: String,
    pub tpm_public_key: [u8; PUBLIC_KEY_SIZE],
}

/// Outcome of a successful enrollment
#[derive(Debug, Clone)]
pub struct EnrollmentResult {
    pub device: DeviceRecord,
    /// True when an existing registration was re-keyed
    pub reenrolled: bool,
}

/// What to do when a known `device_unique_id` enrolls again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReEnrollmentPolicy {
    /// Refuse with `DeviceAlreadyEnrolled`
    Reject,
    /// Replace key and fingerprint, send the device back through approval
    #[default]
    AllowRekey,
}

impl FromStr for ReEnrollmentPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "reject" => Ok(ReEnrollmentPolicy::Reject),
            "rekey" | "allow_rekey" => Ok(ReEnrollmentPolicy::AllowRekey),
            other => Err(format!("unknown re-enrollment policy: {other}")),
        }
    }
}

/// Device registry configuration
#[derive(Debug, Clone, Default)]
pub struct DeviceConfig {
    /// Move fresh enrollments straight to `active`
    pub auto_approve: bool,
    pub reenrollment: ReEnrollmentPolicy,
    /// Backend compliance policy; the agent's verdict is advisory
    pub compliance: CompliancePolicy,
}

/// Posture submission accepted into history
#[derive(Debug, Clone)]
pub struct PostureAccepted {
    pub report: PostureReport,
    pub device: DeviceRecord,
}

/// Lifecycle action requested by an admin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleAction {
    Approve,
    Reject,
    Deactivate,
}

impl LifecycleAction {
    pub fn target(&self) -> DeviceStatus {
        match self {
            LifecycleAction::Approve => DeviceStatus::Active,
            LifecycleAction::Reject => DeviceStatus::Rejected,
            LifecycleAction::Deactivate => DeviceStatus::Inactive,
        }
    }
}
