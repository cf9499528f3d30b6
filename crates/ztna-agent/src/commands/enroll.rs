/*!
 * Enrollment and step-up commands
 */

use anyhow::Result;
use colored::*;
use std::path::Path;
use ztna_agent::{AgentError, DeviceStatus};

use super::load_agent;

pub async fn enroll(home: &Path, code: &str, force: bool) -> Result<()> {
    println!("{}", "=== Enrolling Device ===".bold().cyan());

    let agent = load_agent(home)?;

    println!("\n{}", "Provisioning device key and submitting enrollment...".yellow());
    let outcome = match agent.enroll(code, force).await {
        Ok(outcome) => outcome,
        Err(AgentError::AlreadyEnrolled(device_id)) => {
            println!("{}", "Device is already enrolled".yellow());
            println!("  Device ID: {}", device_id);
            println!("  Use --force to discard the enrollment and enroll again");
            anyhow::bail!("already enrolled");
        }
        Err(e) => return Err(e.into()),
    };

    println!("{}", "✓ Enrollment accepted".green().bold());
    println!("  Device ID: {}", outcome.record.device_id);
    println!("  Device Unique ID: {}", outcome.record.device_unique_id);
    println!("  Public Key: {}", outcome.record.public_key);
    println!(
        "  Key: {}",
        if outcome.key_created {
            "newly provisioned"
        } else {
            "existing"
        }
    );
    if outcome.reenrolled {
        println!("  {}", "Re-enrollment of a known device".yellow());
    }

    match outcome.record.status {
        DeviceStatus::Active => println!("\n{}", "Device is active".green()),
        status => println!(
            "\n{}",
            format!("Device is {}; waiting for administrator approval", status).yellow()
        ),
    }
    Ok(())
}

pub async fn step_up(home: &Path) -> Result<()> {
    println!("{}", "=== Step-up Verification ===".bold().cyan());

    let agent = load_agent(home)?;
    let response = agent.step_up().await?;

    println!("{}", "✓ Device key verified".green().bold());
    println!("  Device ID: {}", response.device_id);
    println!("  Verified At: {}", response.verified_at);
    Ok(())
}
