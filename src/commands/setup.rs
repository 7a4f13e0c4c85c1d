//! First-time install workflow.
//!
//! Sequence: load settings, publish artifacts (metrics verbatim, scrape
//! config rendered, compose file verbatim), resolve topology, discover the
//! Spark UI port, configure the master with the full stack, configure each
//! worker in isolation, open the firewall best-effort, print the URLs.

use anyhow::Result;
use clap::Args;

use crate::config::ClusterConfig;
use crate::discovery::{self, Provenance};
use crate::exec::CommandSpec;
use crate::output::{print_info, print_step, print_success, print_warning};
use crate::provision::{MasterPlan, NodeConfigurator, NodeOutcome};
use crate::storage::{GcsBucket, COMPOSE_OBJECT, METRICS_OBJECT, PROMETHEUS_OBJECT};
use crate::template::{self, tokens, RenderedArtifact};
use crate::topology;

use super::{CommandContext, GRAFANA_PORT, PROMETHEUS_PORT};

/// Setup command (no flags of its own; everything comes from the settings
/// file and the global options).
#[derive(Debug, Args)]
pub struct SetupCommand {}

impl SetupCommand {
    pub async fn run(self, ctx: &CommandContext) -> Result<()> {
        run(ctx).await
    }
}

/// Run the install workflow.
pub async fn run(ctx: &CommandContext) -> Result<()> {
    let config = ClusterConfig::load(&ctx.config_path)?;
    let exec = ctx.executor.as_ref();
    let bucket = GcsBucket::new(&config.gcs_bucket);

    print_step("Uploading metrics.properties to GCS...");
    let metrics = RenderedArtifact::verbatim(
        METRICS_OBJECT,
        template::read_template(&ctx.template_dir, "metrics.properties")?,
    );
    bucket.publish(exec, &metrics, METRICS_OBJECT).await?;

    print_step("Rendering and uploading prometheus.yml...");
    let prometheus = RenderedArtifact::render(
        PROMETHEUS_OBJECT,
        &template::read_template(&ctx.template_dir, "prometheus.yml")?,
        &[
            (tokens::PROJECT, &config.gcp_project),
            (tokens::ZONE, &config.zone),
            (tokens::CLUSTER, &config.cluster_name),
        ],
    )?;
    bucket.publish(exec, &prometheus, PROMETHEUS_OBJECT).await?;

    print_step("Uploading docker-compose.yml to GCS...");
    let compose = RenderedArtifact::verbatim(
        COMPOSE_OBJECT,
        template::read_template(&ctx.template_dir, "docker-compose.yml")?,
    );
    bucket.publish(exec, &compose, COMPOSE_OBJECT).await?;

    print_step("Resolving cluster topology...");
    let cluster = topology::resolve(&config, exec).await?;
    print_info(&format!(
        "master {} ({}), {} worker(s)",
        cluster.master.name,
        cluster.master_ip,
        cluster.workers.len()
    ));

    print_step("Detecting Spark UI port...");
    let status_url = format!(
        "http://{}:{}/json/",
        cluster.master_ip, config.status_port
    );
    let ui_port = discovery::discover_ui_port(&status_url).await;
    match ui_port.provenance {
        Provenance::Discovered => print_info(&format!("Spark UI port: {}", ui_port.port)),
        Provenance::DefaultFallback => print_warning(&format!(
            "Spark UI port not discovered, using default {}",
            ui_port.port
        )),
    }

    let configurator = NodeConfigurator::new(&bucket, exec);

    print_step("Configuring Spark and starting Prometheus/Grafana on master...");
    configurator
        .configure_master(&cluster.master, &MasterPlan::Install { ui_port: ui_port.port })
        .await?;

    print_step("Configuring Spark on worker nodes...");
    let outcomes = configurator.configure_workers(&cluster.workers).await;
    report_worker_outcomes(&outcomes);

    print_step("Configuring firewall rules...");
    exec.run_best_effort(firewall_rule(&config)).await;

    print_success(&format!(
        "Setup complete! Prometheus: http://{}:{}  Grafana: http://{}:{}",
        cluster.master_ip, PROMETHEUS_PORT, cluster.master_ip, GRAFANA_PORT
    ));
    Ok(())
}

/// Firewall rule opening the Prometheus and Grafana ports for the cluster.
/// Best-effort: the rule may already exist from a previous run.
pub(crate) fn firewall_rule(config: &ClusterConfig) -> CommandSpec {
    CommandSpec::new("gcloud")
        .args(["compute", "firewall-rules", "create", "allow-monitoring"])
        .arg("--allow")
        .arg(format!("tcp:{PROMETHEUS_PORT},tcp:{GRAFANA_PORT}"))
        .arg(format!("--target-tags=dataproc-{}", config.cluster_name))
        .arg("--description=Allow Prometheus and Grafana access")
}

/// Summarize per-worker results; failures are reported, not fatal.
pub(crate) fn report_worker_outcomes(outcomes: &[NodeOutcome]) {
    let failed: Vec<&str> = outcomes
        .iter()
        .filter(|o| o.result.is_err())
        .map(|o| o.node.name.as_str())
        .collect();

    if failed.is_empty() {
        if !outcomes.is_empty() {
            print_info(&format!("configured {} worker(s)", outcomes.len()));
        }
    } else {
        print_warning(&format!(
            "configured {} of {} worker(s); failed: {}",
            outcomes.len() - failed.len(),
            outcomes.len(),
            failed.join(", ")
        ));
    }
}
