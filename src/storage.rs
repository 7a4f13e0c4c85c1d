//! Artifact distribution through the GCS bucket.
//!
//! Distribution is always local render -> bucket -> remote pull; cluster
//! nodes are not reachable by direct copy but can all reach the bucket.
//! Uploads overwrite whatever was there (no versioning).

use crate::error::SparkmonError;
use crate::exec::{CommandSpec, Executor};
use crate::template::RenderedArtifact;

/// Bucket object holding the metrics sink configuration.
pub const METRICS_OBJECT: &str = "metrics.properties";

/// Bucket object holding the rendered scrape configuration.
pub const PROMETHEUS_OBJECT: &str = "prometheus.yml";

/// Bucket object holding the monitoring stack compose file.
pub const COMPOSE_OBJECT: &str = "binaries/docker-compose.yml";

/// Handle to the cluster's distribution bucket.
#[derive(Debug, Clone)]
pub struct GcsBucket {
    bucket: String,
}

impl GcsBucket {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
        }
    }

    /// Full `gs://` URL for an object.
    pub fn object_url(&self, object: &str) -> String {
        format!("gs://{}/{}", self.bucket, object)
    }

    /// Upload artifact text to the bucket, overwriting any prior version.
    /// The text is piped through stdin so no local scratch file is needed.
    pub async fn publish(
        &self,
        exec: &dyn Executor,
        artifact: &RenderedArtifact,
        object: &str,
    ) -> Result<String, SparkmonError> {
        let url = self.object_url(object);
        exec.run_checked(
            CommandSpec::new("gcloud")
                .args(["storage", "cp", "-"])
                .arg(&url)
                .stdin(artifact.text.clone()),
        )
        .await?;
        Ok(url)
    }

    /// Script line pulling an object onto a node. Runs remotely, where only
    /// gsutil is guaranteed to be present.
    pub fn pull_line(&self, object: &str, dest: &str) -> String {
        format!("sudo gsutil cp {} {}", self.object_url(object), dest)
    }
}
