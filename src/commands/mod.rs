//! CLI commands.

pub mod setup;
pub mod update;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::exec::{Executor, ShellExecutor};

/// Prometheus port on the master.
pub const PROMETHEUS_PORT: u16 = 9090;

/// Grafana port on the master.
pub const GRAFANA_PORT: u16 = 3000;

/// sparkmon - set up and refresh Spark monitoring on a Dataproc cluster.
#[derive(Debug, Parser)]
#[command(name = "sparkmon")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Settings file with the [Dataproc] section.
    #[arg(long, global = true, default_value = "config.ini", env = "SPARKMON_CONFIG")]
    config: PathBuf,

    /// Directory holding the template files.
    #[arg(long, global = true, default_value = ".", env = "SPARKMON_TEMPLATE_DIR")]
    dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// First-time install: distribute artifacts, start the monitoring
    /// stack on the master, configure Spark metrics everywhere.
    Setup(setup::SetupCommand),

    /// Refresh an existing deployment in place.
    Update(update::UpdateCommand),
}

impl Cli {
    /// Run the CLI command.
    pub async fn run(self) -> Result<()> {
        let ctx = CommandContext::new(self.config, self.dir);

        match self.command {
            Commands::Setup(cmd) => cmd.run(&ctx).await,
            Commands::Update(cmd) => cmd.run(&ctx).await,
        }
    }
}

/// Shared command context.
pub struct CommandContext {
    pub config_path: PathBuf,
    pub template_dir: PathBuf,
    pub executor: Arc<dyn Executor>,
}

impl CommandContext {
    /// Context backed by the real shell executor.
    pub fn new(config_path: PathBuf, template_dir: PathBuf) -> Self {
        Self::with_executor(config_path, template_dir, Arc::new(ShellExecutor))
    }

    /// Context with a caller-supplied executor (used by tests).
    pub fn with_executor(
        config_path: PathBuf,
        template_dir: PathBuf,
        executor: Arc<dyn Executor>,
    ) -> Self {
        Self {
            config_path,
            template_dir,
            executor,
        }
    }
}
