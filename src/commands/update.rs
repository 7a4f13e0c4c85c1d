//! Update workflow for an already-deployed monitoring stack.
//!
//! Differs from setup in what reaches the master: only metrics.properties
//! goes through the bucket; the scrape config is rendered locally with the
//! freshly discovered port baked in and piped straight onto the node over
//! ssh stdin. Prometheus is signalled to stop best-effort; restarting it is
//! the operator's follow-up.

use anyhow::Result;
use clap::Args;

use crate::config::ClusterConfig;
use crate::discovery::{self, Provenance};
use crate::output::{print_info, print_step, print_success, print_warning};
use crate::provision::{MasterPlan, NodeConfigurator};
use crate::storage::{GcsBucket, METRICS_OBJECT, PROMETHEUS_OBJECT};
use crate::template::{self, tokens, RenderedArtifact};
use crate::topology;

use super::setup::report_worker_outcomes;
use super::{CommandContext, PROMETHEUS_PORT};

/// Update command.
#[derive(Debug, Args)]
pub struct UpdateCommand {}

impl UpdateCommand {
    pub async fn run(self, ctx: &CommandContext) -> Result<()> {
        run(ctx).await
    }
}

/// Run the update workflow.
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

    print_step("Rendering prometheus.yml...");
    let port_text = ui_port.port.to_string();
    // Port substituted last so it applies to the already-resolved scrape
    // targets, not to placeholder text.
    let prometheus = RenderedArtifact::render(
        PROMETHEUS_OBJECT,
        &template::read_template(&ctx.template_dir, "prometheus.yml")?,
        &[
            (tokens::PROJECT, &config.gcp_project),
            (tokens::ZONE, &config.zone),
            (tokens::CLUSTER, &config.cluster_name),
            (tokens::UI_PORT, &port_text),
        ],
    )?;

    let configurator = NodeConfigurator::new(&bucket, exec);

    print_step("Configuring Spark and updating Prometheus on master...");
    configurator
        .configure_master(&cluster.master, &MasterPlan::Update { prometheus })
        .await?;

    print_step("Configuring Spark on worker nodes...");
    let outcomes = configurator.configure_workers(&cluster.workers).await;
    report_worker_outcomes(&outcomes);

    print_success(&format!(
        "Update complete! Check http://{}:{} for Prometheus.",
        cluster.master_ip, PROMETHEUS_PORT
    ));
    Ok(())
}
