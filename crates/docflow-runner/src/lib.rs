//! Docflow runner
//!
//! Loads a YAML pipeline built from the standard components, runs it once
//! with inputs read from a JSON file, and returns the outputs as JSON.

pub mod config;
pub mod error;

use docflow_core::{CancellationToken, RunInputs, RunOptions, Scheduler, TracingEventHandler};
use docflow_dsl::loads;
use docflow_monitoring::{FanOutEventHandler, MetricsEventHandler};
use docflow_stdlib::{registry, InMemoryDocumentStore};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

pub use config::RunnerConfig;
pub use error::{RunnerError, RunnerResult};

async fn read(path: &Path) -> RunnerResult<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| RunnerError::ReadError {
            path: path.display().to_string(),
            source,
        })
}

/// Run the configured pipeline once
///
/// Ctrl-C cancels the run between component invocations.
pub async fn run(config: &RunnerConfig) -> RunnerResult<Value> {
    let pipeline_path = config.pipeline_path()?;
    let yaml = read(pipeline_path).await?;
    let inputs: RunInputs = match &config.inputs {
        Some(path) => serde_json::from_str(&read(path).await?)?,
        None => RunInputs::new(),
    };

    let pipeline = loads(&yaml, &registry(InMemoryDocumentStore::new()))?;
    info!(
        pipeline = %pipeline_path.display(),
        components = pipeline.len(),
        "Pipeline loaded"
    );

    let metrics = MetricsEventHandler::new();
    let handler = FanOutEventHandler::new()
        .with(Arc::new(TracingEventHandler))
        .with(Arc::new(metrics.clone()));

    let token = CancellationToken::new();
    let options = RunOptions {
        parallel: config.parallel,
        ..RunOptions::default()
    }
    .with_cancellation(token.clone());

    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling run");
            token.cancel();
        }
    });

    let result = Scheduler::new(Arc::new(handler))
        .run(&pipeline, inputs, &options)
        .await;
    interrupt.abort();

    let snapshot = metrics.snapshot();
    info!(
        component_runs = snapshot.component_runs,
        components_skipped = snapshot.components_skipped,
        loop_reentries = snapshot.loop_reentries,
        "Run finished"
    );

    serde_json::to_value(result?).map_err(RunnerError::OutputError)
}
