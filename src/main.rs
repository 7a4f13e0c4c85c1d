//! sparkmon - CLI for setting up Spark monitoring on Dataproc clusters.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use sparkmon::commands::Cli;
use sparkmon::error;

#[tokio::main]
async fn main() -> Result<()> {
    // Progress goes through output::print_*; tracing carries diagnostics.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();

    // Run the command
    if let Err(e) = cli.run().await {
        // Print error in a user-friendly way
        error::print_error(&e);
        std::process::exit(1);
    }

    Ok(())
}
