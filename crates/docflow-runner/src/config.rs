//! Configuration for the Docflow runner
//!
//! Values come from `DOCFLOW_*` environment variables; positional
//! command-line arguments override the pipeline and inputs paths.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{RunnerError, RunnerResult};
use docflow_monitoring::MonitoringConfig;

/// Runner configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// YAML pipeline document to run
    #[serde(default)]
    pub pipeline: Option<PathBuf>,

    /// JSON file holding the run inputs
    #[serde(default)]
    pub inputs: Option<PathBuf>,

    /// Log filter used when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Emit JSON log lines
    #[serde(default)]
    pub json_logs: bool,

    /// Invoke independent components concurrently
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

fn default_log_filter() -> String {
    "info".to_string()
}

fn default_parallel() -> bool {
    true
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            pipeline: None,
            inputs: None,
            log_filter: default_log_filter(),
            json_logs: false,
            parallel: default_parallel(),
        }
    }
}

impl RunnerConfig {
    /// Load configuration from environment variables
    pub fn load() -> RunnerResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> RunnerResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(pipeline) = lookup("DOCFLOW_PIPELINE") {
            config.pipeline = Some(PathBuf::from(pipeline));
        }

        if let Some(inputs) = lookup("DOCFLOW_INPUTS") {
            config.inputs = Some(PathBuf::from(inputs));
        }

        if let Some(log_filter) = lookup("DOCFLOW_LOG_FILTER") {
            config.log_filter = log_filter;
        }

        if let Some(json_logs) = lookup("DOCFLOW_JSON_LOGS") {
            config.json_logs = parse_flag("DOCFLOW_JSON_LOGS", &json_logs)?;
        }

        if let Some(parallel) = lookup("DOCFLOW_PARALLEL") {
            config.parallel = parse_flag("DOCFLOW_PARALLEL", &parallel)?;
        }

        Ok(config)
    }

    /// Apply positional arguments: `[pipeline] [inputs]`
    pub fn with_args<I>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();
        if let Some(pipeline) = args.next() {
            self.pipeline = Some(PathBuf::from(pipeline));
        }
        if let Some(inputs) = args.next() {
            self.inputs = Some(PathBuf::from(inputs));
        }
        self
    }

    /// The pipeline path, which is mandatory
    pub fn pipeline_path(&self) -> RunnerResult<&Path> {
        self.pipeline.as_deref().ok_or_else(|| {
            RunnerError::ConfigError(
                "no pipeline given; pass a path or set DOCFLOW_PIPELINE".to_string(),
            )
        })
    }

    /// Logging settings for this run
    pub fn monitoring(&self) -> MonitoringConfig {
        MonitoringConfig {
            service_name: "docflow-runner".to_string(),
            log_filter: self.log_filter.clone(),
            json_logs: self.json_logs,
        }
    }
}

fn parse_flag(key: &str, value: &str) -> RunnerResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(RunnerError::ConfigError(format!(
            "Invalid {} value: {}",
            key, value
        ))),
    }
}
