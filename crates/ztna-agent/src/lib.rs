//! # ztna-agent
//!
//! Device posture agent.
//!
//! The agent enrolls the device once with a one-time code, then reports signed
//! posture on a fixed interval:
//!
//! ```text
//! FingerprintSource --> enroll --> KeyCustody::ensure_key_exists
//! Scheduler --> Collector --> KeyCustody::sign --> BackendClient::submit_posture
//! ```
//!
//! All signing goes through [`ztna_keystore::KeyCustody`], which serializes
//! signatures. The scheduler never cancels a cycle once it has started.

#![warn(clippy::all)]

pub mod agent;
pub mod client;
pub mod collector;
pub mod config;
pub mod errors;
pub mod fingerprint;
pub mod scheduler;
pub mod state;
pub mod types;

pub use agent::{Agent, AgentStatus, CycleReport, EnrollOutcome, PossessionProof, ResetReport};
pub use client::{BackendClient, HttpBackendClient};
pub use collector::{Collector, FactSource, StaticFactSource, SystemFactSource};
pub use config::{agent_home, AgentConfig};
pub use errors::{AgentError, Disposition, Result};
pub use fingerprint::{
    DmiFingerprintSource, FingerprintRecord, FingerprintSource, HardwareIds,
    StaticFingerprintSource,
};
pub use scheduler::{Backoff, CycleRunner, Scheduler, TickOutcome};
pub use state::{DeviceStatus, EnrollmentRecord, LocalState};

#[cfg(test)]
mod tests;
