//! # ztna-devices
//!
//! Backend device registry.
//!
//! Responsible for:
//! - Enrollment codes and the enrollment protocol (first enrollment and
//!   re-enrollment)
//! - The device approval lifecycle (`pending → active | rejected`,
//!   `active → inactive`)
//! - Posture intake: signature verification, server-side compliance, history
//! - Key and fingerprint binding alerts raised by failed verifications

#![warn(clippy::all)]

pub mod errors;
mod service;
pub mod traits;
pub mod types;

#[cfg(test)]
mod tests;

pub use errors::{DeviceError, Result};
pub use service::DeviceService;
pub use traits::DeviceRegistry;
pub use types::*;
