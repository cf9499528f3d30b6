/*!
 * Configuration, status and reset commands
 */

use anyhow::{Context, Result};
use colored::*;
use std::io::Write;
use std::path::Path;
use ztna_agent::{AgentConfig, AgentStatus};

use super::load_agent;

pub fn init(
    home: &Path,
    backend_url: &str,
    interval: u64,
    signer_command: Option<String>,
) -> Result<()> {
    println!("{}", "=== Writing Agent Configuration ===".bold().cyan());

    let mut config = AgentConfig::load(home).unwrap_or_default();
    config.backend_url = backend_url.to_string();
    config.posture_interval_secs = interval;
    config.signer_command = signer_command;
    config.validate()?;
    config
        .save(home)
        .with_context(|| format!("Failed to write config to {}", home.display()))?;

    println!("{}", "✓ Configuration saved".green());
    println!("  Home: {}", home.display());
    println!("  Backend: {}", config.backend_url);
    println!("  Interval: {}s", config.posture_interval_secs);
    println!(
        "  Key store: {}",
        config
            .signer_command
            .as_deref()
            .unwrap_or("sealed key file")
    );
    Ok(())
}

pub async fn status(home: &Path, remote: bool) -> Result<()> {
    println!("{}", "=== Agent Status ===".bold().cyan());

    let agent = load_agent(home)?;
    let status = agent.status().await?;
    print_local_status(&status);

    if remote && status.enrollment.is_some() {
        println!("\n{}", "Querying backend...".yellow());
        let (_, remote_status) = agent.refresh_status().await?;
        println!("  Status: {}", remote_status.status);
        println!("  Compliant: {}", remote_status.is_compliant);
        if let Some(alert) = remote_status.binding_alert {
            println!("  {}", format!("⚠ Binding alert: {}", alert).red().bold());
        }
    }

    Ok(())
}

fn print_local_status(status: &AgentStatus) {
    println!("\n{}", "Device:".bold());
    println!("  Device Unique ID: {}", status.device_unique_id);
    println!("  Fingerprint: {}", &status.fingerprint_hash[..16].dimmed());
    println!(
        "  Device Key: {}",
        if status.key_exists {
            "present".green()
        } else {
            "absent".yellow()
        }
    );

    match &status.enrollment {
        Some(record) => {
            println!("\n{}", "Enrollment:".bold());
            println!("  Device ID: {}", record.device_id);
            println!("  Status: {}", record.status);
            println!("  Backend: {}", record.backend_url);
            println!("  Enrolled At: {}", record.enrolled_at);
        }
        None => println!("\n{}", "Not enrolled".yellow()),
    }
}

pub async fn reset(home: &Path, yes: bool) -> Result<()> {
    println!("{}", "=== Resetting Agent ===".bold().cyan());

    if !yes && !confirm("This deletes the device key and enrollment. Continue? [y/N] ")? {
        println!("{}", "Aborted".yellow());
        return Ok(());
    }

    let agent = load_agent(home)?;
    let report = agent.reset().await?;

    println!("{}", "✓ Enrollment artifacts removed".green());
    println!("  Device key deleted: {}", report.key_deleted);
    for path in &report.removed {
        println!("  Removed: {}", path.display());
    }
    println!("  {}", "config.json kept".dimmed());
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{}", prompt);
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}
