//! # ztna-posture
//!
//! Posture facts collected by the device agent, the compliance predicate
//! applied to them, and the signed report format shared by agent and backend.
//!
//! The signed payload is the canonical JSON encoding of a [`PostureEnvelope`].
//! Both sides rebuild it from the same struct, so field order never drifts.

#![warn(clippy::all)]

pub mod compliance;
pub mod errors;
pub mod report;
pub mod types;

pub use compliance::evaluate;
pub use errors::{PostureError, Result};
pub use report::*;
pub use types::*;
