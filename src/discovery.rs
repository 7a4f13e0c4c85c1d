//! Spark UI port discovery.
//!
//! The scrape config needs the port the Spark UI actually bound, which is
//! assigned dynamically when applications race for 4040. The master's
//! status endpoint lists active applications with their UI ports; any
//! failure to reach or parse it degrades to the well-known default rather
//! than blocking the run.

use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

/// Port used when discovery cannot do better.
pub const DEFAULT_UI_PORT: u16 = 4040;

/// Timeout for the status endpoint probe.
const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Application-name keyword identifying the framework we scrape.
const TARGET_KEYWORD: &str = "spark";

/// Where a discovered port came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// Read from the master's status endpoint.
    Discovered,
    /// Probe failed or found nothing; well-known default used.
    DefaultFallback,
}

/// A resolved UI port plus how it was obtained.
#[derive(Debug, Clone, Copy)]
pub struct DiscoveredPort {
    pub port: u16,
    pub provenance: Provenance,
}

impl DiscoveredPort {
    fn fallback() -> Self {
        Self {
            port: DEFAULT_UI_PORT,
            provenance: Provenance::DefaultFallback,
        }
    }
}

/// Master status endpoint body (only the fields we read).
#[derive(Debug, Deserialize)]
struct StatusPage {
    #[serde(default)]
    activeapps: Vec<ActiveApp>,
}

#[derive(Debug, Deserialize)]
struct ActiveApp {
    #[serde(default)]
    name: String,
    #[serde(default = "default_ui_port")]
    uiport: u16,
}

fn default_ui_port() -> u16 {
    DEFAULT_UI_PORT
}

/// Probe the status endpoint for the UI port of the first active
/// application whose name contains the target keyword (case-insensitive,
/// list order, first match wins). Never fails; degrades to the default.
pub async fn discover_ui_port(status_url: &str) -> DiscoveredPort {
    match fetch_ui_port(status_url).await {
        Ok(Some(port)) => {
            debug!(port, url = %status_url, "discovered Spark UI port");
            DiscoveredPort {
                port,
                provenance: Provenance::Discovered,
            }
        }
        Ok(None) => {
            debug!(url = %status_url, "no active Spark application listed, using default port");
            DiscoveredPort::fallback()
        }
        Err(e) => {
            warn!(
                url = %status_url,
                error = %e,
                "Spark UI port discovery failed, defaulting to {DEFAULT_UI_PORT}"
            );
            DiscoveredPort::fallback()
        }
    }
}

async fn fetch_ui_port(status_url: &str) -> Result<Option<u16>, reqwest::Error> {
    let client = reqwest::Client::builder()
        .timeout(DISCOVERY_TIMEOUT)
        .build()?;

    let page: StatusPage = client
        .get(status_url)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    Ok(page
        .activeapps
        .iter()
        .find(|app| app.name.to_lowercase().contains(TARGET_KEYWORD))
        .map(|app| app.uiport))
}
