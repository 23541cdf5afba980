//! smsgate admin binary
//!
//! Thin operator front end over the command engine: loads configuration,
//! initializes logging, connects to the Postgres event log and runs one
//! command.

use anyhow::Result;
use clap::Parser;
use smsgate_command::{config::Config, CommandError};
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli;

use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing (prefer RUST_LOG, fallback to SMSGATE_LOG_LEVEL).
    // Logs go to stderr so command output stays machine readable.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_level.clone().into()))
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();

    if let Err(e) = cli.run(config).await {
        match e.downcast_ref::<CommandError>() {
            Some(command_error) => error!(
                kind = %command_error.kind(),
                message_key = command_error.message_key(),
                error = %command_error,
                "Command failed"
            ),
            None => error!(error = %e, "Command failed"),
        }
        std::process::exit(1);
    }

    Ok(())
}
