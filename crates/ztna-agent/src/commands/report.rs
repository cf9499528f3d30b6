/*!
 * Posture reporting commands
 */

use anyhow::Result;
use colored::*;
use std::path::Path;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info};
use ztna_agent::{CycleReport, Scheduler};

use super::load_agent;

pub async fn collect(home: &Path) -> Result<()> {
    println!("{}", "=== Posture Report ===".bold().cyan());

    let agent = load_agent(home)?;
    match agent.collect_and_submit().await? {
        CycleReport::Submitted { local, response } => {
            println!("{}", "✓ Report accepted".green().bold());
            println!("  Report ID: {}", response.report_id);
            println!("  Local verdict: {} ({}%)", local.is_compliant, local.compliance_score);
            println!(
                "  Backend verdict: {} ({}%)",
                response.is_compliant, response.compliance_score
            );
            for violation in &response.violations {
                println!("  {}", format!("✗ {}", violation).red());
            }
        }
        CycleReport::AwaitingApproval(status) => {
            println!(
                "{}",
                format!("Device is {}; no report sent", status).yellow()
            );
        }
    }
    Ok(())
}

pub async fn run(home: &Path) -> Result<()> {
    let agent = load_agent(home)?;
    let config = agent.config().clone();

    let scheduler = Scheduler::new(
        agent,
        config.posture_interval(),
        Duration::from_secs(config.backoff_initial_secs),
        Duration::from_secs(config.backoff_max_secs),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown requested; finishing current cycle"),
            Err(e) => error!(error = %e, "Failed to listen for Ctrl-C"),
        }
        let _ = shutdown_tx.send(true);
    });

    scheduler.run(shutdown_rx).await;
    Ok(())
}
