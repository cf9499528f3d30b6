/*!
 * Command implementations
 */

pub mod enroll;
pub mod report;
pub mod setup;
pub mod signer;

use anyhow::{Context, Result};
use std::path::Path;
use ztna_agent::{Agent, AgentConfig, LocalState};

/// Load config.json and build an agent for the real machine
pub fn load_agent(home: &Path) -> Result<Agent> {
    let config = AgentConfig::load(home)
        .with_context(|| format!("Failed to load agent config from {}", home.display()))?;
    let agent = Agent::from_config(config, LocalState::new(home))?;
    Ok(agent)
}
