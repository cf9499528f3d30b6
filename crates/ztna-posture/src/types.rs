//! Posture fact and compliance type definitions.

use serde::{Deserialize, Serialize};

/// Operating system snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OsInfo {
    /// Distribution or product name, e.g. "Ubuntu"
    pub name: String,
    /// Distribution version, e.g. "22.04"
    pub version: String,
    /// Kernel release
    pub kernel: String,
}

/// Compliance facts gathered from a device in one collection cycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostureFacts {
    pub firewall_enabled: bool,
    pub disk_encrypted: bool,
    pub antivirus_active: bool,
    pub screen_lock_enabled: bool,
    pub os: OsInfo,
}

/// A single compliance check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Check {
    Firewall,
    DiskEncryption,
    Antivirus,
    ScreenLock,
}

impl Check {
    /// Every check, in reporting order
    pub const ALL: [Check; 4] = [
        Check::Firewall,
        Check::DiskEncryption,
        Check::Antivirus,
        Check::ScreenLock,
    ];

    /// Stable identifier used in violation lists and audit tags
    pub fn as_str(&self) -> &'static str {
        match self {
            Check::Firewall => "firewall",
            Check::DiskEncryption => "disk_encryption",
            Check::Antivirus => "antivirus",
            Check::ScreenLock => "screen_lock",
        }
    }

    /// Human-readable violation text
    pub fn violation(&self) -> &'static str {
        match self {
            Check::Firewall => "firewall disabled",
            Check::DiskEncryption => "disk not encrypted",
            Check::Antivirus => "antivirus not active",
            Check::ScreenLock => "screen lock disabled",
        }
    }

    /// Whether the facts satisfy this check
    pub fn passes(&self, facts: &PostureFacts) -> bool {
        match self {
            Check::Firewall => facts.firewall_enabled,
            Check::DiskEncryption => facts.disk_encrypted,
            Check::Antivirus => facts.antivirus_active,
            Check::ScreenLock => facts.screen_lock_enabled,
        }
    }
}

/// Which checks are enforced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompliancePolicy {
    pub require_firewall: bool,
    pub require_disk_encryption: bool,
    pub require_antivirus: bool,
    pub require_screen_lock: bool,
}

impl Default for CompliancePolicy {
    fn default() -> Self {
        Self {
            require_firewall: true,
            require_disk_encryption: true,
            require_antivirus: true,
            require_screen_lock: true,
        }
    }
}

impl CompliancePolicy {
    /// Whether a check is enabled under this policy
    pub fn requires(&self, check: Check) -> bool {
        match check {
            Check::Firewall => self.require_firewall,
            Check::DiskEncryption => self.require_disk_encryption,
            Check::Antivirus => self.require_antivirus,
            Check::ScreenLock => self.require_screen_lock,
        }
    }

    /// Enabled checks, in reporting order
    pub fn enabled_checks(&self) -> impl Iterator<Item = Check> + '_ {
        Check::ALL.into_iter().filter(|check| self.requires(*check))
    }
}

/// Outcome of the compliance predicate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceResult {
    /// True only when every enabled check passes
    pub is_compliant: bool,
    /// Percentage of enabled checks that pass (100 when none are enabled)
    pub compliance_score: u8,
    /// Violation text for each failing enabled check
    pub violations: Vec<String>,
}
