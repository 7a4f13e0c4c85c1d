//! Template rendering by ordered literal substitution.
//!
//! Templates carry placeholder substrings (project id, zone, cluster name,
//! default port) that are replaced with values from the loaded settings.
//! Substitution order is significant: a later pair may interact with text a
//! previous pair introduced, and callers rely on replacing longer patterns
//! before shorter overlapping ones. Template authors guarantee placeholder
//! tokens do not occur as ordinary content.

use std::path::Path;

use crate::error::SparkmonError;

/// Placeholder tokens the shipped templates carry.
pub mod tokens {
    /// Stands in for the GCP project id.
    pub const PROJECT: &str = "gcp-project-id";
    /// Stands in for the compute zone.
    pub const ZONE: &str = "us-central1-a";
    /// Stands in for the cluster name.
    pub const CLUSTER: &str = "dataproc-cluster";
    /// Stands in for the Spark UI port.
    pub const UI_PORT: &str = "4040";
}

/// Apply substitutions in order, each a literal substring replacement.
pub fn render(text: &str, substitutions: &[(&str, &str)]) -> String {
    substitutions
        .iter()
        .fold(text.to_string(), |acc, (from, to)| acc.replace(from, to))
}

/// A rendered configuration artifact, verified placeholder-free.
#[derive(Debug, Clone)]
pub struct RenderedArtifact {
    pub name: String,
    pub text: String,
}

impl RenderedArtifact {
    /// Render and verify. Fails if any placeholder token survives in the
    /// output, so a broken template is caught before it ships.
    pub fn render(
        name: impl Into<String>,
        text: &str,
        substitutions: &[(&str, &str)],
    ) -> Result<Self, SparkmonError> {
        let name = name.into();
        let rendered = render(text, substitutions);

        for (from, to) in substitutions {
            // A replacement containing its own pattern (the operator's zone
            // really is the template's example zone) still counts as resolved.
            if to.contains(from) {
                continue;
            }
            if rendered.contains(from) {
                return Err(SparkmonError::UnresolvedPlaceholder {
                    name,
                    token: (*from).to_string(),
                });
            }
        }

        Ok(Self {
            name,
            text: rendered,
        })
    }

    /// Wrap text that is distributed as-is (no placeholders).
    pub fn verbatim(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}

/// Read a template file from the template directory.
pub fn read_template(dir: &Path, name: &str) -> Result<String, SparkmonError> {
    let path = dir.join(name);
    if !path.exists() {
        return Err(SparkmonError::TemplateMissing { path });
    }
    Ok(std::fs::read_to_string(&path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitution_order_matters() {
        // A's replacement introduces B's pattern; applying B afterwards
        // rewrites it, applying B first leaves it alone.
        let template = "target: A";
        let forward = render(template, &[("A", "B"), ("B", "C")]);
        let reverse = render(template, &[("B", "C"), ("A", "B")]);
        assert_eq!(forward, "target: C");
        assert_eq!(reverse, "target: B");
        assert_ne!(forward, reverse);
    }

    #[test]
    fn test_render_replaces_all_occurrences() {
        let rendered = render("a b a b a", &[("a", "x")]);
        assert_eq!(rendered, "x b x b x");
    }

    #[test]
    fn test_placeholder_absent_from_template_is_fine() {
        let artifact = RenderedArtifact::render(
            "prometheus.yml",
            "project: gcp-project-id\n",
            &[("gcp-project-id", "p1"), ("europe-west1-b", "z1")],
        )
        .unwrap();
        assert_eq!(artifact.text, "project: p1\n");
    }

    #[test]
    fn test_verified_render_fails_loudly() {
        // A later substitution reintroduces an earlier pair's token, so the
        // output still carries a placeholder and must be rejected.
        let err = RenderedArtifact::render(
            "prometheus.yml",
            "project: gcp-project-id\ncluster: dataproc-cluster\n",
            &[("gcp-project-id", "p1"), ("dataproc-cluster", "gcp-project-id")],
        )
        .unwrap_err();
        match err {
            SparkmonError::UnresolvedPlaceholder { token, .. } => {
                assert_eq!(token, "gcp-project-id");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_self_substitution_is_resolved() {
        // Operator's real zone equals the template's example zone.
        let artifact = RenderedArtifact::render(
            "prometheus.yml",
            "zone: us-central1-a\n",
            &[("us-central1-a", "us-central1-a")],
        )
        .unwrap();
        assert_eq!(artifact.text, "zone: us-central1-a\n");
    }

    #[test]
    fn test_read_template_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_template(dir.path(), "prometheus.yml").unwrap_err();
        assert!(matches!(err, SparkmonError::TemplateMissing { .. }));
    }

    #[test]
    fn test_read_template_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("metrics.properties"), "sink=prom\n").unwrap();
        let text = read_template(dir.path(), "metrics.properties").unwrap();
        assert_eq!(text, "sink=prom\n");
    }
}
