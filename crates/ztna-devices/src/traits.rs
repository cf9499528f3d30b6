//! Device registry trait definitions.

use crate::{errors::Result, types::*};
use async_trait::async_trait;
use uuid::Uuid;
use ztna_posture::{PostureReport, PostureSubmission};

/// Device registry subsystem trait
#[async_trait]
pub trait DeviceRegistry: Send + Sync {
    // ========================================================================
    // Enrollment codes
    // ========================================================================

    /// Create a random enrollment code valid for `ttl_seconds`
    async fn create_code(&self, max_uses: u32, ttl_seconds: u64) -> Result<EnrollmentCode>;

    /// Deactivate an enrollment code
    async fn deactivate_code(&self, code: &str) -> Result<EnrollmentCode>;

    // ========================================================================
    // Enrollment protocol
    // ========================================================================

    /// Register a device (or re-key a known one) against an enrollment code
    async fn enroll(&self, request: EnrollmentRequest) -> Result<EnrollmentResult>;

    /// Get a device by registry ID
    async fn get_device(&self, device_id: Uuid) -> Result<DeviceRecord>;

    /// Get a device by the agent's unique ID
    async fn get_device_by_unique_id(&self, device_unique_id: Uuid) -> Result<DeviceRecord>;

    /// List all devices
    async fn list_devices(&self) -> Result<Vec<DeviceRecord>>;

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Apply an admin lifecycle action
    async fn transition(&self, device_id: Uuid, action: LifecycleAction) -> Result<DeviceRecord>;

    /// Assign (or clear) the owning user
    async fn assign_user(&self, device_id: Uuid, user_id: Option<Uuid>) -> Result<DeviceRecord>;

    // ========================================================================
    // Posture intake
    // ========================================================================

    /// Verify, evaluate and store a signed posture submission
    async fn submit_posture(&self, submission: PostureSubmission) -> Result<PostureAccepted>;

    /// Most recent accepted posture report
    async fn latest_posture(&self, device_id: Uuid) -> Result<Option<PostureReport>>;

    /// Full posture history, oldest first
    async fn posture_history(&self, device_id: Uuid) -> Result<Vec<PostureReport>>;

    // ========================================================================
    // Binding
    // ========================================================================

    /// Record a failed signature verification.
    ///
    /// A presented fingerprint that matches the record raises `KeyMismatch`,
    /// one that differs raises `FingerprintMismatch`. Without a fingerprint
    /// only the failure counter moves. Returns the device's alert afterwards.
    async fn record_signature_failure(
        &self,
        device_id: Uuid,
        presented_fingerprint: Option<String>,
    ) -> Result<Option<BindingAlertKind>>;

    /// Record a successful signature verification
    async fn record_signature_success(&self, device_id: Uuid) -> Result<()>;
}
