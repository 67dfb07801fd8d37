//! Metrics listener configuration.

use serde::{Deserialize, Serialize};

/// Optional Prometheus exposition endpoint.
///
/// Only read from the configuration loaded at startup; later reloads do not
/// move the metrics listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

fn default_metrics_port() -> u16 {
    9090
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            port: default_metrics_port(),
        }
    }
}
