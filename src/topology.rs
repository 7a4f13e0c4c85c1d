//! Cluster topology resolution.
//!
//! The master's name is derived from the cluster name; worker names are
//! discovered from the compute inventory because their count and suffixes
//! depend on cluster state. Listing order is whatever the inventory API
//! returns; no ordering is imposed.

use crate::config::ClusterConfig;
use crate::error::SparkmonError;
use crate::exec::{CommandSpec, Executor};

/// Role of a node within the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    Master,
    Worker,
}

/// A reachable cluster node.
#[derive(Debug, Clone)]
pub struct NodeIdentity {
    pub name: String,
    pub zone: String,
    pub role: NodeRole,
}

/// Resolved cluster shape, built once per run.
#[derive(Debug, Clone)]
pub struct ClusterTopology {
    pub master: NodeIdentity,
    pub workers: Vec<NodeIdentity>,
    /// External IP of the master, used for port discovery and the final
    /// dashboard URLs.
    pub master_ip: String,
}

/// Resolve the cluster topology from config plus the compute inventory.
/// An empty worker list is valid; a single-node cluster just gets its
/// master configured.
pub async fn resolve(
    config: &ClusterConfig,
    exec: &dyn Executor,
) -> Result<ClusterTopology, SparkmonError> {
    let master = NodeIdentity {
        name: config.master_name(),
        zone: config.zone.clone(),
        role: NodeRole::Master,
    };

    let describe = exec
        .run_checked(
            CommandSpec::new("gcloud")
                .args(["compute", "instances", "describe"])
                .arg(&master.name)
                .arg(format!("--zone={}", config.zone))
                .arg("--format=get(networkInterfaces[0].accessConfigs[0].natIP)"),
        )
        .await?;
    let master_ip = describe.stdout.trim().to_string();

    let listing = exec
        .run_checked(
            CommandSpec::new("gcloud")
                .args(["compute", "instances", "list"])
                .arg(format!("--filter=name:{}", config.worker_prefix()))
                .arg("--format=value(name)"),
        )
        .await?;

    let workers = listing
        .stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|name| NodeIdentity {
            name: name.to_string(),
            zone: config.zone.clone(),
            role: NodeRole::Worker,
        })
        .collect();

    Ok(ClusterTopology {
        master,
        workers,
        master_ip,
    })
}
