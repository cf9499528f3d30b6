//! Hardware fingerprint.
//!
//! The fingerprint hash is computed from three identifiers: motherboard
//! serial, BIOS serial and system UUID. A missing identifier contributes an
//! empty string so the hash stays stable for as long as the hardware does.

use crate::errors::{AgentError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;
use ztna_crypto::fingerprint_hash;

/// Raw hardware identifiers, kept for diagnostics only
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareIds {
    pub board_serial: String,
    pub bios_serial: String,
    pub system_uuid: String,
}

impl HardwareIds {
    fn is_empty(&self) -> bool {
        self.board_serial.is_empty() && self.bios_serial.is_empty() && self.system_uuid.is_empty()
    }
}

/// Raw identifiers plus the one-way comparison hash
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintRecord {
    pub identifiers: HardwareIds,
    pub fingerprint_hash: String,
}

/// Where hardware identifiers come from
pub trait FingerprintSource: Send + Sync {
    fn read_ids(&self) -> Result<HardwareIds>;

    /// Read the identifiers and hash them
    fn compute_fingerprint(&self) -> Result<FingerprintRecord> {
        let identifiers = self.read_ids()?;
        if identifiers.is_empty() {
            return Err(AgentError::FingerprintUnavailable(
                "no hardware identifier could be read".to_string(),
            ));
        }

        let hash = fingerprint_hash(&[
            &identifiers.board_serial,
            &identifiers.bios_serial,
            &identifiers.system_uuid,
        ]);

        Ok(FingerprintRecord {
            identifiers,
            fingerprint_hash: hash,
        })
    }
}

/// Reads SMBIOS identifiers exported by the kernel under `/sys/class/dmi/id`.
///
/// `product_uuid` and the serials are root-only on most distributions. When
/// the system UUID is unreadable `/etc/machine-id` stands in for it.
#[derive(Debug, Clone)]
pub struct DmiFingerprintSource {
    root: PathBuf,
}

impl Default for DmiFingerprintSource {
    fn default() -> Self {
        Self::with_root("/")
    }
}

impl DmiFingerprintSource {
    /// Read identifiers relative to `root` instead of `/`
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn read(&self, relative: &str) -> String {
        read_identifier(&self.root.join(relative))
    }
}

impl FingerprintSource for DmiFingerprintSource {
    fn read_ids(&self) -> Result<HardwareIds> {
        let mut system_uuid = self.read("sys/class/dmi/id/product_uuid");
        if system_uuid.is_empty() {
            system_uuid = self.read("etc/machine-id");
        }

        let ids = HardwareIds {
            board_serial: self.read("sys/class/dmi/id/board_serial"),
            bios_serial: self.read("sys/class/dmi/id/product_serial"),
            system_uuid: system_uuid.to_lowercase(),
        };
        debug!(
            board = !ids.board_serial.is_empty(),
            bios = !ids.bios_serial.is_empty(),
            uuid = !ids.system_uuid.is_empty(),
            "Read hardware identifiers"
        );
        Ok(ids)
    }
}

/// Fixed identifiers, for tests and lab machines without SMBIOS data
#[derive(Debug, Clone)]
pub struct StaticFingerprintSource {
    ids: HardwareIds,
}

impl StaticFingerprintSource {
    pub fn new(board_serial: &str, bios_serial: &str, system_uuid: &str) -> Self {
        Self {
            ids: HardwareIds {
                board_serial: board_serial.to_string(),
                bios_serial: bios_serial.to_string(),
                system_uuid: system_uuid.to_string(),
            },
        }
    }
}

impl FingerprintSource for StaticFingerprintSource {
    fn read_ids(&self) -> Result<HardwareIds> {
        Ok(self.ids.clone())
    }
}

/// Trimmed file contents; placeholder values some vendors ship count as absent
fn read_identifier(path: &Path) -> String {
    const PLACEHOLDERS: [&str; 5] = [
        "",
        "none",
        "default string",
        "to be filled by o.e.m.",
        "not specified",
    ];

    let value = std::fs::read_to_string(path)
        .map(|contents| contents.trim().to_string())
        .unwrap_or_default();

    if PLACEHOLDERS.contains(&value.to_lowercase().as_str()) {
        String::new()
    } else {
        value
    }
}
