//! Monitoring module for Docflow pipelines.
//!
//! Structured logging setup plus a run-event handler that records metrics.

use serde::Deserialize;

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, LogExt};
pub use metrics::{FanOutEventHandler, MetricsEventHandler, MetricsSnapshot};

/// Configuration for initializing the monitoring system
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    /// Service name attached to the startup log line
    pub service_name: String,
    /// Log level filter (e.g., "info,docflow_core=debug"), used when `RUST_LOG` is unset
    pub log_filter: String,
    /// Emit JSON lines instead of human-readable output
    pub json_logs: bool,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            service_name: "docflow".to_string(),
            log_filter: "info".to_string(),
            json_logs: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MonitoringConfig::default();
        assert_eq!(config.service_name, "docflow");
        assert_eq!(config.log_filter, "info");
        assert!(!config.json_logs);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: MonitoringConfig = serde_json::from_str(r#"{"json_logs": true}"#).unwrap();
        assert!(config.json_logs);
        assert_eq!(config.log_filter, "info");
    }
}
