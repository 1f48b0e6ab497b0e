//! Logging and metrics for UASC runtimes.
//!
//! [`init`] installs the global tracing subscriber; [`ExecutionMetrics`]
//! turns interpreter results into `metrics` counters and histograms.

use serde::{Deserialize, Serialize};
use tracing::info;

pub mod logging;
pub mod metrics;

pub use crate::logging::{build_filter, init_logging};
pub use crate::metrics::{ExecutionMetrics, MetricsSnapshot};

/// Configuration for initializing the monitoring system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    /// Service name attached to the startup log line
    pub service_name: String,
    /// Log level filter (e.g., "info,uasc_core=debug"); `RUST_LOG` wins when set
    pub log_filter: String,
    /// JSON lines instead of pretty output
    pub json_logs: bool,
    /// Emit per-execution metrics
    pub enable_metrics: bool,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            service_name: "uasc".to_string(),
            log_filter: "info".to_string(),
            json_logs: false,
            enable_metrics: true,
        }
    }
}

/// Initialize monitoring system
pub fn init(config: &MonitoringConfig) -> anyhow::Result<()> {
    logging::init_logging(config)?;
    info!(
        service_name = %config.service_name,
        metrics = config.enable_metrics,
        "Monitoring initialized"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = MonitoringConfig::default();
        assert_eq!(config.service_name, "uasc");
        assert_eq!(config.log_filter, "info");
        assert!(!config.json_logs);
        assert!(config.enable_metrics);
    }

    #[test]
    fn test_partial_config_deserializes() {
        let config: MonitoringConfig =
            serde_json::from_str(r#"{"json_logs": true}"#).unwrap();
        assert!(config.json_logs);
        assert_eq!(config.service_name, "uasc");
    }
}
