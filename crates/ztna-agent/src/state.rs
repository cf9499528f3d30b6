//! Local agent state on disk.
//!
//! Layout of the agent home directory:
//!
//! ```text
//! config.json       agent configuration (never removed by reset)
//! identity.json     device_unique_id, generated once
//! enrollment.json   enrollment record
//! keys/             sealed key container (file key store only)
//! ```
//!
//! Every file is written `0600` inside a `0700` directory.

use crate::errors::{AgentError, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;
use ztna_keystore::{create_private_dir, remove_if_exists, write_private};

const IDENTITY_FILE: &str = "identity.json";
const ENROLLMENT_FILE: &str = "enrollment.json";
const KEYS_DIR: &str = "keys";

/// Stable device identity. Survives reset so the backend can tell a
/// re-enrollment from a first enrollment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalIdentity {
    pub device_unique_id: Uuid,
    pub created_at: u64,
}

/// Backend device status as last observed by the agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceStatus {
    Pending,
    Active,
    Rejected,
    Inactive,
}

impl std::fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DeviceStatus::Pending => "pending",
            DeviceStatus::Active => "active",
            DeviceStatus::Rejected => "rejected",
            DeviceStatus::Inactive => "inactive",
        };
        f.write_str(s)
    }
}

/// Enrollment record persisted after a successful `POST /enrollment`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentRecord {
    pub device_unique_id: Uuid,
    /// Backend device record id
    pub device_id: Uuid,
    pub fingerprint_hash: String,
    /// Hex-encoded public key registered with the backend
    pub public_key: String,
    pub status: DeviceStatus,
    pub enrolled_at: u64,
    pub backend_url: String,
}

/// Handle to the agent home directory
#[derive(Debug, Clone)]
pub struct LocalState {
    home: PathBuf,
}

impl LocalState {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Directory holding the sealed key container
    pub fn keys_dir(&self) -> PathBuf {
        self.home.join(KEYS_DIR)
    }

    /// Load the device identity, generating it on first use
    pub fn identity(&self) -> Result<LocalIdentity> {
        if let Some(identity) = self.read_json::<LocalIdentity>(IDENTITY_FILE)? {
            return Ok(identity);
        }

        let identity = LocalIdentity {
            device_unique_id: Uuid::new_v4(),
            created_at: ztna_crypto::current_timestamp(),
        };
        self.write_json(IDENTITY_FILE, &identity)?;

        info!(
            device_unique_id = %identity.device_unique_id,
            "Generated device identity"
        );
        Ok(identity)
    }

    pub fn enrollment(&self) -> Result<Option<EnrollmentRecord>> {
        self.read_json(ENROLLMENT_FILE)
    }

    /// Enrollment record, or `NotEnrolled`
    pub fn require_enrollment(&self) -> Result<EnrollmentRecord> {
        self.enrollment()?.ok_or(AgentError::NotEnrolled)
    }

    pub fn save_enrollment(&self, record: &EnrollmentRecord) -> Result<()> {
        self.write_json(ENROLLMENT_FILE, record)
    }

    /// Remove enrollment artifacts. The configuration and the device identity
    /// stay. Returns the paths that were actually removed.
    pub fn clear_enrollment(&self) -> Result<Vec<PathBuf>> {
        let mut removed = Vec::new();

        let enrollment = self.home.join(ENROLLMENT_FILE);
        if remove_if_exists(&enrollment)? {
            removed.push(enrollment);
        }

        let keys = self.keys_dir();
        match std::fs::remove_dir_all(&keys) {
            Ok(()) => removed.push(keys),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        debug!(count = removed.len(), "Cleared enrollment artifacts");
        Ok(removed)
    }

    fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        let path = self.home.join(name);
        let contents = match std::fs::read(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        serde_json::from_slice(&contents)
            .map(Some)
            .map_err(|e| AgentError::Serialization(format!("{}: {}", path.display(), e)))
    }

    fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        create_private_dir(&self.home)?;
        let contents = serde_json::to_vec_pretty(value)
            .map_err(|e| AgentError::Serialization(e.to_string()))?;
        write_private(&self.home.join(name), &contents)?;
        Ok(())
    }
}
