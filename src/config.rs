//! Cluster settings loaded from the operator's INI file.
//!
//! The settings file carries the cloud identifiers every remote command is
//! built from. All required keys must be present and non-empty before any
//! external command runs; nothing is defaulted for them.

use std::path::Path;

use config::{File, FileFormat};

use crate::error::SparkmonError;

/// Required section in the settings file.
const SECTION: &str = "Dataproc";

/// Required keys within the section.
const REQUIRED_KEYS: [&str; 4] = ["gcs_bucket", "gcp_project", "zone", "cluster_name"];

/// Default port of the Spark master status endpoint.
const DEFAULT_STATUS_PORT: u16 = 8080;

/// Immutable cluster settings. Loaded once, passed by reference.
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    /// GCS bucket artifacts are distributed through.
    pub gcs_bucket: String,

    /// GCP project id substituted into the scrape config.
    pub gcp_project: String,

    /// Compute zone of every cluster node.
    pub zone: String,

    /// Dataproc cluster name; node names derive from it.
    pub cluster_name: String,

    /// Port of the Spark master status endpoint used for UI-port discovery.
    pub status_port: u16,
}

impl ClusterConfig {
    /// Load and validate settings from an INI file.
    pub fn load(path: &Path) -> Result<Self, SparkmonError> {
        if !path.exists() {
            return Err(SparkmonError::ConfigMissing {
                path: path.to_path_buf(),
            });
        }

        let settings = config::Config::builder()
            .add_source(File::from(path).format(FileFormat::Ini))
            .build()
            .map_err(|e| SparkmonError::config_invalid(e.to_string()))?;

        if settings.get_table(SECTION).is_err() {
            return Err(SparkmonError::config_invalid(format!(
                "'{SECTION}' section missing in {}",
                path.display()
            )));
        }

        let get_required = |key: &str| -> Result<String, SparkmonError> {
            let value = settings
                .get_string(&format!("{SECTION}.{key}"))
                .map_err(|_| {
                    SparkmonError::config_invalid(format!("required key '{key}' missing"))
                })?;
            if value.trim().is_empty() {
                return Err(SparkmonError::config_invalid(format!(
                    "required key '{key}' is empty"
                )));
            }
            Ok(value)
        };

        let gcs_bucket = get_required(REQUIRED_KEYS[0])?;
        let gcp_project = get_required(REQUIRED_KEYS[1])?;
        let zone = get_required(REQUIRED_KEYS[2])?;
        let cluster_name = get_required(REQUIRED_KEYS[3])?;

        let status_port = match settings.get_int(&format!("{SECTION}.status_port")) {
            Ok(port) => u16::try_from(port).map_err(|_| {
                SparkmonError::config_invalid(format!("status_port '{port}' is out of range"))
            })?,
            Err(_) => DEFAULT_STATUS_PORT,
        };

        Ok(Self {
            gcs_bucket,
            gcp_project,
            zone,
            cluster_name,
            status_port,
        })
    }

    /// Deterministic master node name.
    pub fn master_name(&self) -> String {
        format!("{}-m", self.cluster_name)
    }

    /// Name prefix matching the cluster's worker nodes.
    pub fn worker_prefix(&self) -> String {
        format!("{}-w-", self.cluster_name)
    }
}
