//! Node configuration: the install and update workflows share one engine,
//! parameterized by `MasterPlan`.
//!
//! Per-node work is a script body executed over `gcloud compute ssh`. The
//! shared part (metrics config pull + spark-defaults lines) is identical on
//! every role; the master additionally runs the monitoring stack. Config
//! lines are ensured, not appended, so re-running a workflow does not
//! duplicate them.

use tracing::{info, warn};

use crate::discovery::DEFAULT_UI_PORT;
use crate::error::SparkmonError;
use crate::exec::{CommandSpec, Executor};
use crate::storage::{GcsBucket, COMPOSE_OBJECT, METRICS_OBJECT, PROMETHEUS_OBJECT};
use crate::template::RenderedArtifact;
use crate::topology::NodeIdentity;

/// Remote path of the Spark metrics sink configuration.
const SPARK_METRICS_CONF: &str = "/etc/spark/conf/metrics.properties";

/// Remote path of the Spark defaults file the config lines go into.
const SPARK_DEFAULTS_CONF: &str = "/etc/spark/conf/spark-defaults.conf";

/// Per-user directory holding the compose stack on the master.
const MONITORING_DIR: &str = "/home/$(whoami)/monitoring";

/// Prometheus config location the update workflow rewrites in place.
const REMOTE_PROMETHEUS: &str = "/home/$(whoami)/prometheus.yml";

/// docker-compose release installed when absent.
const COMPOSE_DOWNLOAD: &str =
    "https://github.com/docker/compose/releases/download/v2.20.0/docker-compose-$(uname -s)-$(uname -m)";

/// Config lines every node's spark-defaults.conf must carry.
const SPARK_CONFIG_LINES: [&str; 3] = [
    "spark.ui.prometheus.enabled true",
    "spark.sql.streaming.metricsEnabled true",
    "spark.metrics.conf /etc/spark/conf/metrics.properties",
];

/// Master-side work beyond the shared per-node script.
#[derive(Debug, Clone)]
pub enum MasterPlan {
    /// First install: guard-install the container stack, pull artifacts,
    /// rewrite the scrape target port, (re)start compose.
    Install { ui_port: u16 },
    /// Refresh: overwrite the deployed prometheus.yml in place (piped via
    /// ssh stdin) and signal Prometheus to stop, best-effort.
    Update { prometheus: RenderedArtifact },
}

/// Outcome of configuring one node.
#[derive(Debug)]
pub struct NodeOutcome {
    pub node: NodeIdentity,
    pub result: Result<(), SparkmonError>,
}

/// Idempotent line append: only add the line when it is not already there.
fn ensure_line(line: &str, file: &str) -> String {
    format!("sudo grep -qxF '{line}' {file} || echo '{line}' | sudo tee -a {file}")
}

/// Configures master and workers through the executor.
pub struct NodeConfigurator<'a> {
    bucket: &'a GcsBucket,
    exec: &'a dyn Executor,
}

impl<'a> NodeConfigurator<'a> {
    pub fn new(bucket: &'a GcsBucket, exec: &'a dyn Executor) -> Self {
        Self { bucket, exec }
    }

    /// Script lines run on every node regardless of role.
    fn spark_config_script(&self) -> Vec<String> {
        let mut lines = vec![self.bucket.pull_line(METRICS_OBJECT, SPARK_METRICS_CONF)];
        for line in SPARK_CONFIG_LINES {
            lines.push(ensure_line(line, SPARK_DEFAULTS_CONF));
        }
        lines
    }

    /// Full master script for the given plan, plus its stdin payload.
    fn master_script(&self, plan: &MasterPlan) -> (String, Option<String>) {
        let mut lines = self.spark_config_script();

        match plan {
            MasterPlan::Install { ui_port } => {
                lines.push("if ! command -v docker > /dev/null 2>&1; then".to_string());
                lines.push("  sudo apt-get update".to_string());
                lines.push("  sudo apt-get install -y docker.io".to_string());
                lines.push("  sudo systemctl start docker".to_string());
                lines.push("  sudo systemctl enable docker".to_string());
                lines.push("fi".to_string());
                lines.push("if ! command -v docker-compose > /dev/null 2>&1; then".to_string());
                lines.push(format!(
                    "  sudo curl -L \"{COMPOSE_DOWNLOAD}\" -o /usr/local/bin/docker-compose"
                ));
                lines.push("  sudo chmod +x /usr/local/bin/docker-compose".to_string());
                lines.push("fi".to_string());
                lines.push(format!("sudo mkdir -p {MONITORING_DIR}"));
                lines.push(
                    self.bucket
                        .pull_line(COMPOSE_OBJECT, &format!("{MONITORING_DIR}/docker-compose.yml")),
                );
                lines.push(
                    self.bucket
                        .pull_line(PROMETHEUS_OBJECT, &format!("{MONITORING_DIR}/prometheus.yml")),
                );
                // The artifact was rendered before the port was known, so the
                // scrape target is rewritten remotely.
                lines.push(format!(
                    "sudo sed -i 's/localhost:{DEFAULT_UI_PORT}/localhost:{ui_port}/g' {MONITORING_DIR}/prometheus.yml"
                ));
                lines.push(format!("cd {MONITORING_DIR}"));
                lines.push("sudo docker-compose down 2>/dev/null || true".to_string());
                lines.push("sudo docker-compose up -d".to_string());
                (lines.join("\n"), None)
            }
            MasterPlan::Update { prometheus } => {
                lines.push(format!("if [ -f {REMOTE_PROMETHEUS} ]; then"));
                lines.push("  echo 'Updating existing prometheus.yml...'".to_string());
                lines.push(format!("  cat > {REMOTE_PROMETHEUS}"));
                lines.push(
                    "  pkill -f prometheus || echo 'Prometheus not running, restart it manually'"
                        .to_string(),
                );
                lines.push("else".to_string());
                lines.push("  echo 'prometheus.yml not found, skipping update.'".to_string());
                lines.push("fi".to_string());
                (lines.join("\n"), Some(prometheus.text.clone()))
            }
        }
    }

    /// Configure the master node. Failure here is fatal; nothing downstream
    /// is meaningful without a configured master.
    pub async fn configure_master(
        &self,
        master: &NodeIdentity,
        plan: &MasterPlan,
    ) -> Result<(), SparkmonError> {
        let (script, stdin) = self.master_script(plan);
        info!(node = %master.name, "configuring master");
        self.exec.run_checked(ssh_command(master, &script, stdin)).await?;
        Ok(())
    }

    /// Configure every worker in turn. A failing worker is logged and
    /// recorded; the remaining workers are still attempted, since partial
    /// monitoring coverage beats a total abort.
    pub async fn configure_workers(&self, workers: &[NodeIdentity]) -> Vec<NodeOutcome> {
        let script = self.spark_config_script().join("\n");
        let mut outcomes = Vec::with_capacity(workers.len());

        for worker in workers {
            info!(node = %worker.name, "configuring worker");
            let result = self
                .exec
                .run_checked(ssh_command(worker, &script, None))
                .await
                .map(|_| ());

            if let Err(e) = &result {
                warn!(node = %worker.name, error = %e, "worker configuration failed, continuing");
            }

            outcomes.push(NodeOutcome {
                node: worker.clone(),
                result,
            });
        }

        outcomes
    }
}

/// Remote execution of a script body against one node.
fn ssh_command(node: &NodeIdentity, script: &str, stdin: Option<String>) -> CommandSpec {
    let mut spec = CommandSpec::new("gcloud")
        .args(["compute", "ssh"])
        .arg(&node.name)
        .arg(format!("--zone={}", node.zone))
        .arg(format!("--command={script}"));
    if let Some(body) = stdin {
        spec = spec.stdin(body);
    }
    spec
}
