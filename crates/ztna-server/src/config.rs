use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use ztna_crypto::CHALLENGE_TTL_SECONDS;
use ztna_devices::ReEnrollmentPolicy;
use ztna_posture::CompliancePolicy;

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to bind the server to
    pub bind_address: SocketAddr,

    /// Path to RocksDB database
    pub database_path: PathBuf,

    /// Static bearer token guarding the admin endpoints
    pub admin_token: String,

    /// Lifetime of an issued challenge
    pub challenge_ttl_seconds: u64,

    /// Maximum age of a posture report before the PDP treats it as stale
    pub posture_freshness_seconds: u64,

    /// Activate newly enrolled devices without admin approval
    pub auto_approve_devices: bool,

    pub reenrollment_policy: ReEnrollmentPolicy,

    /// Checks the backend requires when recomputing compliance
    pub compliance: CompliancePolicy,

    /// Allow medium-risk decisions to be upgraded by a challenge-response
    pub allow_step_up: bool,
}

impl Config {
    /// Defaults for everything but the database location and admin token
    pub fn new(database_path: impl Into<PathBuf>, admin_token: impl Into<String>) -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 8080)),
            database_path: database_path.into(),
            admin_token: admin_token.into(),
            challenge_ttl_seconds: CHALLENGE_TTL_SECONDS,
            posture_freshness_seconds: 900,
            auto_approve_devices: false,
            reenrollment_policy: ReEnrollmentPolicy::default(),
            compliance: CompliancePolicy::default(),
            allow_step_up: true,
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let database_path = std::env::var("DATABASE_PATH")
            .unwrap_or_else(|_| "./data/ztna.db".to_string());

        let admin_token = std::env::var("ADMIN_TOKEN")
            .context("ADMIN_TOKEN environment variable required")?;
        if admin_token.len() < 16 {
            anyhow::bail!("ADMIN_TOKEN must be at least 16 characters");
        }

        let mut config = Self::new(database_path, admin_token);

        config.bind_address = env_or("BIND_ADDRESS", config.bind_address)?;
        config.challenge_ttl_seconds = env_or("CHALLENGE_TTL_SECONDS", config.challenge_ttl_seconds)?;
        config.posture_freshness_seconds =
            env_or("POSTURE_FRESHNESS_SECONDS", config.posture_freshness_seconds)?;
        config.auto_approve_devices = env_or("AUTO_APPROVE_DEVICES", config.auto_approve_devices)?;
        config.reenrollment_policy = env_or("REENROLLMENT_POLICY", config.reenrollment_policy)?;
        config.allow_step_up = env_or("ALLOW_STEP_UP", config.allow_step_up)?;

        config.compliance = CompliancePolicy {
            require_firewall: env_or("REQUIRE_FIREWALL", true)?,
            require_disk_encryption: env_or("REQUIRE_DISK_ENCRYPTION", true)?,
            require_antivirus: env_or("REQUIRE_ANTIVIRUS", true)?,
            require_screen_lock: env_or("REQUIRE_SCREEN_LOCK", true)?,
        };

        if config.challenge_ttl_seconds == 0 {
            anyhow::bail!("CHALLENGE_TTL_SECONDS must be positive");
        }

        Ok(config)
    }
}

/// Parse an environment variable, falling back to `default` when unset
fn env_or<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid {}={:?}: {}", name, raw, e)),
        Err(_) => Ok(default),
    }
}
