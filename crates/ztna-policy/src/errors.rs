//! Policy error types.
//!
//! These never reach callers of the decision point; they are turned into deny
//! decisions.

use thiserror::Error;

/// Errors while gathering decision input
#[derive(Debug, Error)]
pub enum PolicyError {
    /// Device registry unavailable
    #[error("Device registry error: {0}")]
    Device(#[from] ztna_devices::DeviceError),
}

/// Result type for policy operations
pub type Result<T> = std::result::Result<T, PolicyError>;
