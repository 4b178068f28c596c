//! Structured logging module using tracing.
//!
//! Logs go to stderr so that a binary's stdout stays free for its results.

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::MonitoringConfig;

/// Initialize structured logging
///
/// `RUST_LOG` wins over [`MonitoringConfig::log_filter`]. Installing a
/// second global subscriber is an error.
pub fn init_logging(config: &MonitoringConfig) -> anyhow::Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_filter)
            .with_context(|| format!("Invalid log filter '{}'", config.log_filter))?,
    };

    let registry = tracing_subscriber::registry().with(env_filter);
    if config.json_logs {
        // JSON logs for aggregation
        let json_layer = fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
            .with_writer(std::io::stderr);
        registry
            .with(json_layer)
            .try_init()
            .context("Failed to set global default subscriber")?;
    } else {
        // Pretty logs for development
        let fmt_layer = fmt::layer()
            .pretty()
            .with_target(true)
            .with_writer(std::io::stderr);
        registry
            .with(fmt_layer)
            .try_init()
            .context("Failed to set global default subscriber")?;
    }

    info!(
        service_name = %config.service_name,
        log_format = if config.json_logs { "json" } else { "pretty" },
        "Logging initialized"
    );
    Ok(())
}

/// Trait to add log context to results
pub trait LogExt<T, E> {
    /// Log the error with a message before returning
    fn log_err(self, message: &str) -> Result<T, E>;
}

impl<T, E: std::fmt::Display> LogExt<T, E> for Result<T, E> {
    fn log_err(self, message: &str) -> Result<T, E> {
        if let Err(ref e) = self {
            tracing::error!(error = %e, "{}", message);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_initialization_fails() {
        let config = MonitoringConfig::default();
        let _ = init_logging(&config);
        let err = init_logging(&config).unwrap_err();
        assert!(err.to_string().contains("global default subscriber"));
    }

    #[test]
    fn test_log_err_passes_result_through() {
        let ok: Result<u8, String> = Ok(1);
        assert_eq!(ok.log_err("unused"), Ok(1));
        let err: Result<u8, String> = Err("boom".to_string());
        assert_eq!(err.log_err("while testing"), Err("boom".to_string()));
    }
}
