//! End-to-end workflow tests over a mock executor and a mock Spark status
//! endpoint. No real gcloud, ssh, or cluster is involved.

use std::path::PathBuf;
use std::sync::Arc;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sparkmon::commands::{setup, update, CommandContext};
use sparkmon::exec::MockExecutor;

const PROMETHEUS_TEMPLATE: &str = "\
global:
  external_labels:
    project: gcp-project-id
    zone: us-central1-a
    cluster: dataproc-cluster
scrape_configs:
  - job_name: spark
    static_configs:
      - targets: ['localhost:4040']
";

const METRICS_TEMPLATE: &str =
    "*.sink.prometheusServlet.class=org.apache.spark.metrics.sink.PrometheusServlet\n";

const COMPOSE_TEMPLATE: &str = "\
services:
  prometheus:
    image: prom/prometheus
  grafana:
    image: grafana/grafana
";

/// Write config.ini plus the three templates into a fresh directory.
/// `status_port` points port discovery at the test's mock status server.
fn write_fixtures(status_port: u16) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.ini");
    std::fs::write(
        &config_path,
        format!(
            "[Dataproc]\ngcs_bucket = b1\ngcp_project = p1\nzone = z1\n\
             cluster_name = c1\nstatus_port = {status_port}\n"
        ),
    )
    .unwrap();
    std::fs::write(dir.path().join("prometheus.yml"), PROMETHEUS_TEMPLATE).unwrap();
    std::fs::write(dir.path().join("metrics.properties"), METRICS_TEMPLATE).unwrap();
    std::fs::write(dir.path().join("docker-compose.yml"), COMPOSE_TEMPLATE).unwrap();
    (dir, config_path)
}

/// Mock Spark master status endpoint listing one active Spark app.
async fn start_status_server(uiport: u16) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/json/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "activeapps": [ { "name": "Spark Structured Streaming", "uiport": uiport } ]
        })))
        .mount(&server)
        .await;
    server
}

fn server_port(server: &MockServer) -> u16 {
    server.address().port()
}

fn mock_cluster() -> Arc<MockExecutor> {
    let mock = Arc::new(MockExecutor::new());
    mock.respond("instances describe", "127.0.0.1\n");
    mock.respond("instances list", "c1-w-0\n");
    mock
}

fn ctx(config_path: PathBuf, dir: &tempfile::TempDir, exec: Arc<MockExecutor>) -> CommandContext {
    CommandContext::with_executor(config_path, dir.path().to_path_buf(), exec)
}

#[tokio::test]
async fn setup_renders_uploads_and_configures_every_node() {
    let server = start_status_server(4041).await;
    let (dir, config_path) = write_fixtures(server_port(&server));
    let mock = mock_cluster();

    setup::run(&ctx(config_path, &dir, Arc::clone(&mock)))
        .await
        .unwrap();

    let commands = mock.commands();

    // Rendered scrape config went to the bucket with the cloud identifiers
    // resolved and no placeholder tokens left.
    let prometheus_upload = commands
        .iter()
        .find(|c| c.command_line().contains("gs://b1/prometheus.yml"))
        .expect("prometheus upload missing");
    let uploaded = prometheus_upload.stdin.as_deref().unwrap();
    assert!(uploaded.contains("p1"));
    assert!(uploaded.contains("z1"));
    assert!(uploaded.contains("c1"));
    assert!(!uploaded.contains("gcp-project-id"));
    assert!(!uploaded.contains("us-central1-a"));
    assert!(!uploaded.contains("dataproc-cluster"));

    // Verbatim artifacts reached their objects.
    assert!(commands
        .iter()
        .any(|c| c.command_line().contains("gs://b1/metrics.properties")));
    assert!(commands
        .iter()
        .any(|c| c.command_line().contains("gs://b1/binaries/docker-compose.yml")));

    // Master got the install script with the discovered port baked into the
    // remote rewrite, and the worker got the shared script.
    let master_ssh = commands
        .iter()
        .find(|c| c.command_line().contains("compute ssh c1-m"))
        .expect("master ssh missing");
    let script = master_ssh
        .args
        .iter()
        .find(|a| a.starts_with("--command="))
        .unwrap();
    assert!(script.contains("localhost:4041"));
    assert!(script.contains("docker-compose up -d"));
    assert!(commands
        .iter()
        .any(|c| c.command_line().contains("compute ssh c1-w-0")));

    // Firewall rule attempted, tagged to the cluster.
    assert!(commands
        .iter()
        .any(|c| c.command_line().contains("--target-tags=dataproc-c1")));
}

#[tokio::test]
async fn setup_rejects_bad_config_before_any_command_runs() {
    let server = start_status_server(4041).await;
    let (dir, config_path) = write_fixtures(server_port(&server));
    // Drop a required key.
    std::fs::write(
        &config_path,
        "[Dataproc]\ngcs_bucket = b1\ngcp_project = p1\nzone = z1\n",
    )
    .unwrap();
    let mock = mock_cluster();

    let err = setup::run(&ctx(config_path, &dir, Arc::clone(&mock)))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("cluster_name"));
    // Precondition failure means zero side effects.
    assert!(mock.commands().is_empty());
}

#[tokio::test]
async fn setup_survives_existing_firewall_rule() {
    let server = start_status_server(4041).await;
    let (dir, config_path) = write_fixtures(server_port(&server));
    let mock = mock_cluster();
    mock.fail_matching(
        "firewall-rules",
        "Creation failed: The resource 'allow-monitoring' already exists",
    );

    // Best-effort step: the run still completes.
    setup::run(&ctx(config_path, &dir, Arc::clone(&mock)))
        .await
        .unwrap();
}

#[tokio::test]
async fn setup_continues_past_a_failing_worker() {
    let server = start_status_server(4041).await;
    let (dir, config_path) = write_fixtures(server_port(&server));
    let mock = Arc::new(MockExecutor::new());
    mock.respond("instances describe", "127.0.0.1\n");
    mock.respond("instances list", "c1-w-0\nc1-w-1\n");
    mock.fail_matching("ssh c1-w-0", "ssh: connect to host: timed out");

    setup::run(&ctx(config_path, &dir, Arc::clone(&mock)))
        .await
        .unwrap();

    // The second worker was still attempted after the first failed.
    assert!(mock
        .command_lines()
        .iter()
        .any(|line| line.contains("compute ssh c1-w-1")));
}

#[tokio::test]
async fn setup_run_twice_succeeds() {
    let server = start_status_server(4041).await;
    let (dir, config_path) = write_fixtures(server_port(&server));
    let mock = mock_cluster();
    let context = ctx(config_path, &dir, Arc::clone(&mock));

    setup::run(&context).await.unwrap();
    setup::run(&context).await.unwrap();

    // Remote scripts are guarded, so the second run issues the same
    // guarded commands rather than failing or blindly reinstalling.
    let master_lines: Vec<_> = mock
        .command_lines()
        .into_iter()
        .filter(|l| l.contains("compute ssh c1-m"))
        .collect();
    assert_eq!(master_lines.len(), 2);
    assert!(master_lines.iter().all(|l| l.contains("command -v docker")));
    assert!(master_lines.iter().all(|l| l.contains("grep -qxF")));
}

#[tokio::test]
async fn update_pipes_rendered_prometheus_over_stdin() {
    let server = start_status_server(4043).await;
    let (dir, config_path) = write_fixtures(server_port(&server));
    let mock = mock_cluster();

    update::run(&ctx(config_path, &dir, Arc::clone(&mock)))
        .await
        .unwrap();

    let commands = mock.commands();

    // Update never uploads the scrape config to the bucket.
    assert!(!commands
        .iter()
        .any(|c| c.command_line().contains("gs://b1/prometheus.yml")));
    // But metrics.properties still goes through it.
    assert!(commands
        .iter()
        .any(|c| c.command_line().contains("gs://b1/metrics.properties")));

    // The rendered text, including the discovered port, rides ssh stdin.
    let master_ssh = commands
        .iter()
        .find(|c| c.command_line().contains("compute ssh c1-m"))
        .expect("master ssh missing");
    let piped = master_ssh.stdin.as_deref().expect("no stdin payload");
    assert!(piped.contains("p1"));
    assert!(piped.contains("localhost:4043"));
    assert!(!piped.contains("4040"));
    assert!(!piped.contains("dataproc-cluster"));
}

#[tokio::test]
async fn update_missing_template_is_fatal() {
    let server = start_status_server(4041).await;
    let (dir, config_path) = write_fixtures(server_port(&server));
    std::fs::remove_file(dir.path().join("prometheus.yml")).unwrap();
    let mock = mock_cluster();

    let err = update::run(&ctx(config_path, &dir, Arc::clone(&mock)))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("prometheus.yml"));
}
