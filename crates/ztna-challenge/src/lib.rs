//! # ztna-challenge
//!
//! Challenge-response protocol proving live possession of an enrolled device
//! key. Challenges are random 32-byte nonces bound to one device, valid for a
//! fixed TTL and consumed by exactly one successful verification.

#![warn(clippy::all)]

pub mod errors;
pub mod service;
pub mod traits;
pub mod types;

pub use errors::{ChallengeError, Result};
pub use service::ChallengeService;
pub use traits::ChallengeProtocol;
pub use types::*;
