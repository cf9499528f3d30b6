/*!
 * ZTNA Device Posture Agent
 *
 * 1. Enroll the device with a one-time code (hardware-bound key + fingerprint)
 * 2. Report signed posture to the backend on an interval
 * 3. Answer step-up challenges with the device key
 *
 * Usage:
 *   ztna-agent init --backend-url https://ztna.example
 *   ztna-agent enroll --code <code>
 *   ztna-agent run
 *   ztna-agent signer sign < payload.hex
 */

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use ztna_keystore::ipc::SignerOp;

#[derive(Parser)]
#[command(name = "ztna-agent")]
#[command(about = "Device posture agent for the ZTNA control plane")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Agent state directory
    #[arg(long, env = "ZTNA_AGENT_HOME")]
    home: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write config.json
    Init {
        /// Backend base URL
        #[arg(short, long)]
        backend_url: String,

        /// Seconds between posture reports
        #[arg(long, default_value_t = 300)]
        interval: u64,

        /// External signer command (uses the local sealed key file if omitted)
        #[arg(long)]
        signer_command: Option<String>,
    },
    /// Enroll this device
    Enroll {
        /// One-time enrollment code
        #[arg(short, long)]
        code: String,

        /// Discard an existing enrollment and key first
        #[arg(long)]
        force: bool,
    },
    /// Show local enrollment and key status
    Status {
        /// Also ask the backend for the current device status
        #[arg(long)]
        remote: bool,
    },
    /// Collect and submit one posture report
    Collect,
    /// Report posture on the configured interval until interrupted
    Run,
    /// Prove live possession of the device key
    StepUp,
    /// Delete enrollment artifacts and the device key (config is kept)
    Reset {
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Key custody subprocess: exit 0 success, 3 key absent, other failure
    Signer {
        #[arg(value_enum)]
        op: SignerArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SignerArg {
    Ensure,
    Status,
    PublicKey,
    Sign,
    Delete,
}

impl From<SignerArg> for SignerOp {
    fn from(arg: SignerArg) -> Self {
        match arg {
            SignerArg::Ensure => SignerOp::Ensure,
            SignerArg::Status => SignerOp::Status,
            SignerArg::PublicKey => SignerOp::PublicKey,
            SignerArg::Sign => SignerOp::Sign,
            SignerArg::Delete => SignerOp::Delete,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let home = cli.home.unwrap_or_else(ztna_agent::agent_home);

    // The signer speaks over stdout/stderr; keep logging off its streams
    if !matches!(cli.command, Commands::Signer { .. }) {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "ztna_agent=info".into()),
            )
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    match cli.command {
        Commands::Init {
            backend_url,
            interval,
            signer_command,
        } => commands::setup::init(&home, &backend_url, interval, signer_command)?,

        Commands::Enroll { code, force } => commands::enroll::enroll(&home, &code, force).await?,

        Commands::Status { remote } => commands::setup::status(&home, remote).await?,

        Commands::Collect => commands::report::collect(&home).await?,

        Commands::Run => commands::report::run(&home).await?,

        Commands::StepUp => commands::enroll::step_up(&home).await?,

        Commands::Reset { yes } => commands::setup::reset(&home, yes).await?,

        Commands::Signer { op } => commands::signer::serve(&home, op.into()).await,
    }

    Ok(())
}
