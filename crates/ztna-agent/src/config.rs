//! Agent configuration.
//!
//! Lives in `config.json` in the agent home directory. Cleanup never removes
//! it; only enrollment artifacts are deleted.

use crate::errors::{AgentError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use ztna_posture::CompliancePolicy;

pub const CONFIG_FILE: &str = "config.json";
pub const DEFAULT_AGENT_HOME: &str = "/var/lib/ztna-agent";

/// Agent configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Backend base URL
    pub backend_url: String,
    pub posture_interval_secs: u64,
    /// Applies to every backend call
    pub request_timeout_secs: u64,
    pub backoff_initial_secs: u64,
    pub backoff_max_secs: u64,
    /// External signer, e.g. `/usr/bin/ztna-agent signer`; the sealed file key
    /// store is used when unset
    pub signer_command: Option<String>,
    /// Checks evaluated locally for the advisory verdict
    pub compliance: CompliancePolicy,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://127.0.0.1:8080".to_string(),
            posture_interval_secs: 300,
            request_timeout_secs: 10,
            backoff_initial_secs: 5,
            backoff_max_secs: 300,
            signer_command: None,
            compliance: CompliancePolicy::default(),
        }
    }
}

impl AgentConfig {
    /// Load `config.json` from `home`, falling back to defaults when absent.
    /// `ZTNA_BACKEND_URL` overrides the file.
    pub fn load(home: &Path) -> Result<Self> {
        let path = home.join(CONFIG_FILE);
        let mut config = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).map_err(|e| {
                AgentError::Config(format!("failed to parse {}: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => return Err(e.into()),
        };

        if let Ok(url) = std::env::var("ZTNA_BACKEND_URL") {
            config.backend_url = url;
        }

        config.validate()?;
        Ok(config)
    }

    /// Write `config.json` into `home`
    pub fn save(&self, home: &Path) -> Result<()> {
        ztna_keystore::create_private_dir(home)?;
        let contents = serde_json::to_vec_pretty(self)
            .map_err(|e| AgentError::Serialization(e.to_string()))?;
        ztna_keystore::write_private(&home.join(CONFIG_FILE), &contents)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.backend_url.starts_with("http://") || self.backend_url.starts_with("https://")) {
            return Err(AgentError::Config(format!(
                "backend_url must be an http(s) URL: {}",
                self.backend_url
            )));
        }
        if self.posture_interval_secs == 0 || self.request_timeout_secs == 0 {
            return Err(AgentError::Config(
                "posture_interval_secs and request_timeout_secs must be positive".to_string(),
            ));
        }
        if self.backoff_initial_secs == 0 || self.backoff_max_secs < self.backoff_initial_secs {
            return Err(AgentError::Config(
                "backoff_max_secs must be at least backoff_initial_secs, which must be positive"
                    .to_string(),
            ));
        }
        Ok(())
    }

    pub fn posture_interval(&self) -> Duration {
        Duration::from_secs(self.posture_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Agent home directory: `ZTNA_AGENT_HOME` or the platform default
pub fn agent_home() -> PathBuf {
    std::env::var_os("ZTNA_AGENT_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_AGENT_HOME))
}
