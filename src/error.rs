//! Error handling and display for the CLI.

use std::path::PathBuf;

use colored::Colorize;
use thiserror::Error;

/// Errors that abort a run.
///
/// A degraded port discovery is deliberately not represented here; it
/// always resolves to the fallback port (see `discovery::Provenance`).
#[derive(Debug, Error)]
pub enum SparkmonError {
    #[error("config file '{}' not found", path.display())]
    ConfigMissing { path: PathBuf },

    #[error("invalid config: {reason}")]
    ConfigInvalid { reason: String },

    #[error("command failed: {command}: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("template file '{}' not found", path.display())]
    TemplateMissing { path: PathBuf },

    #[error("rendered '{name}' still contains placeholder '{token}'")]
    UnresolvedPlaceholder { name: String, token: String },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl SparkmonError {
    /// Create an invalid-config error.
    pub fn config_invalid(reason: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            reason: reason.into(),
        }
    }
}

/// Print an error in a user-friendly format.
pub fn print_error(err: &anyhow::Error) {
    eprintln!("{} {}", "Error:".red().bold(), err);

    // Check for specific error types and provide hints
    if let Some(app_err) = err.downcast_ref::<SparkmonError>() {
        match app_err {
            SparkmonError::ConfigMissing { .. } => {
                eprintln!(
                    "\n{}",
                    "Hint: Create a config.ini with a [Dataproc] section, or pass --config."
                        .yellow()
                );
            }
            SparkmonError::CommandFailed { .. } => {
                eprintln!(
                    "\n{}",
                    "Hint: Check `gcloud auth list` and that the cluster exists in the configured zone."
                        .yellow()
                );
            }
            SparkmonError::TemplateMissing { .. } => {
                eprintln!(
                    "\n{}",
                    "Hint: Run from the directory holding the template files, or pass --dir."
                        .yellow()
                );
            }
            _ => {}
        }
    }
}
