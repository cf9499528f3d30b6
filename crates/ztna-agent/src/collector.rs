//! Posture fact collection.
//!
//! [`SystemFactSource`] probes the local machine through the usual Linux
//! tools. A probe that fails, times out or whose tool is missing reports the
//! check as not satisfied; collection itself never fails on a single probe.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, trace};
use ztna_posture::{evaluate, ComplianceResult, CompliancePolicy, OsInfo, PostureFacts};

/// Source of posture facts
#[async_trait]
pub trait FactSource: Send + Sync {
    async fn collect(&self) -> PostureFacts;
}

/// Antivirus services recognised as active protection
const ANTIVIRUS_UNITS: [&str; 4] = [
    "clamav-daemon",
    "clamd@scan",
    "mdatp",
    "falcon-sensor",
];

/// Probes the running system
#[derive(Debug, Clone)]
pub struct SystemFactSource {
    probe_timeout: Duration,
    root: PathBuf,
}

impl Default for SystemFactSource {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_secs(5),
            root: PathBuf::from("/"),
        }
    }
}

impl SystemFactSource {
    pub fn new(probe_timeout: Duration) -> Self {
        Self {
            probe_timeout,
            ..Default::default()
        }
    }

    /// Run a probe command; `None` if it could not run, timed out or exited
    /// non-zero
    async fn run(&self, program: &str, args: &[&str]) -> Option<String> {
        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.probe_timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                trace!(program, error = %e, "Probe unavailable");
                return None;
            }
            Err(_) => {
                debug!(program, "Probe timed out");
                return None;
            }
        };

        // `systemctl is-active` exits non-zero for inactive units but still
        // prints the state, so stdout is kept either way.
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if output.status.success() || program == "systemctl" {
            Some(stdout)
        } else {
            None
        }
    }

    async fn firewall_enabled(&self) -> bool {
        if let Some(out) = self.run("ufw", &["status"]).await {
            if parse_ufw_status(&out) {
                return true;
            }
        }
        if let Some(out) = self.run("firewall-cmd", &["--state"]).await {
            if out.trim() == "running" {
                return true;
            }
        }
        match self.run("nft", &["list", "ruleset"]).await {
            Some(out) => parse_nft_ruleset(&out),
            None => false,
        }
    }

    async fn disk_encrypted(&self) -> bool {
        match self.run("lsblk", &["-n", "-o", "TYPE"]).await {
            Some(out) => parse_lsblk_types(&out),
            None => false,
        }
    }

    async fn antivirus_active(&self) -> bool {
        for unit in ANTIVIRUS_UNITS {
            if let Some(out) = self.run("systemctl", &["is-active", unit]).await {
                if out.trim() == "active" {
                    return true;
                }
            }
        }
        false
    }

    async fn screen_lock_enabled(&self) -> bool {
        match self
            .run(
                "gsettings",
                &["get", "org.gnome.desktop.screensaver", "lock-enabled"],
            )
            .await
        {
            Some(out) => out.trim() == "true",
            None => false,
        }
    }

    fn os_info(&self) -> OsInfo {
        let os_release =
            std::fs::read_to_string(self.root.join("etc/os-release")).unwrap_or_default();
        let kernel = std::fs::read_to_string(self.root.join("proc/sys/kernel/osrelease"))
            .map(|s| s.trim().to_string())
            .unwrap_or_default();

        let mut os = parse_os_release(&os_release);
        os.kernel = kernel;
        os
    }
}

#[async_trait]
impl FactSource for SystemFactSource {
    async fn collect(&self) -> PostureFacts {
        let (firewall_enabled, disk_encrypted, antivirus_active, screen_lock_enabled) = tokio::join!(
            self.firewall_enabled(),
            self.disk_encrypted(),
            self.antivirus_active(),
            self.screen_lock_enabled(),
        );

        PostureFacts {
            firewall_enabled,
            disk_encrypted,
            antivirus_active,
            screen_lock_enabled,
            os: self.os_info(),
        }
    }
}

/// Returns the same facts on every call
#[derive(Debug, Clone, Default)]
pub struct StaticFactSource {
    facts: PostureFacts,
}

impl StaticFactSource {
    pub fn new(facts: PostureFacts) -> Self {
        Self { facts }
    }
}

#[async_trait]
impl FactSource for StaticFactSource {
    async fn collect(&self) -> PostureFacts {
        self.facts.clone()
    }
}

/// Facts from one collection plus the local verdict
#[derive(Debug, Clone)]
pub struct Collection {
    pub facts: PostureFacts,
    pub result: ComplianceResult,
}

/// Runs a fact source and evaluates the local compliance predicate
pub struct Collector {
    source: Box<dyn FactSource>,
    policy: CompliancePolicy,
}

impl Collector {
    pub fn new(source: Box<dyn FactSource>, policy: CompliancePolicy) -> Self {
        Self { source, policy }
    }

    pub async fn collect(&self) -> Collection {
        let facts = self.source.collect().await;
        let result = evaluate(&facts, &self.policy);
        debug!(
            compliant = result.is_compliant,
            score = result.compliance_score,
            "Collected posture"
        );
        Collection { facts, result }
    }
}

fn parse_ufw_status(output: &str) -> bool {
    output
        .lines()
        .any(|line| line.trim().eq_ignore_ascii_case("status: active"))
}

/// An nftables ruleset counts when it contains at least one filtering chain
fn parse_nft_ruleset(output: &str) -> bool {
    output
        .lines()
        .any(|line| line.trim_start().starts_with("type filter hook input"))
}

fn parse_lsblk_types(output: &str) -> bool {
    output.lines().any(|line| line.trim() == "crypt")
}

fn parse_os_release(contents: &str) -> OsInfo {
    let mut info = OsInfo::default();
    for line in contents.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches('"').to_string();
        match key.trim() {
            "NAME" => info.name = value,
            "VERSION_ID" => info.version = value,
            _ => {}
        }
    }
    info
}
