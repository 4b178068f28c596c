//! Run metrics collected from pipeline events.
//!
//! Every event is forwarded to the `metrics` facade, which is a no-op
//! until an exporter installs a recorder. The handler also keeps its own
//! counters so callers can read them without an exporter.

use async_trait::async_trait;
use docflow_core::{PipelineEvent, RunEventHandler};
use metrics::{describe_counter, describe_histogram, histogram, increment_counter, Unit};
use once_cell::sync::Lazy;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Metric names
pub mod names {
    /// Runs started
    pub const RUNS_STARTED: &str = "docflow_runs_started_total";
    /// Runs that completed
    pub const RUNS_COMPLETED: &str = "docflow_runs_completed_total";
    /// Runs that failed
    pub const RUNS_FAILED: &str = "docflow_runs_failed_total";
    /// Successful component invocations
    pub const COMPONENT_RUNS: &str = "docflow_component_runs_total";
    /// Failed component invocations
    pub const COMPONENT_FAILURES: &str = "docflow_component_failures_total";
    /// Loop re-entries
    pub const LOOP_REENTRIES: &str = "docflow_loop_reentries_total";
    /// Time spent in `Component::run`
    pub const COMPONENT_DURATION: &str = "docflow_component_duration_seconds";
    /// Time spent in a whole run
    pub const RUN_DURATION: &str = "docflow_run_duration_seconds";
}

static DESCRIPTIONS: Lazy<()> = Lazy::new(|| {
    describe_counter!(names::RUNS_STARTED, "Pipeline runs started");
    describe_counter!(names::RUNS_COMPLETED, "Pipeline runs completed");
    describe_counter!(names::RUNS_FAILED, "Pipeline runs failed");
    describe_counter!(names::COMPONENT_RUNS, "Component invocations that returned");
    describe_counter!(names::COMPONENT_FAILURES, "Component invocations that raised");
    describe_counter!(names::LOOP_REENTRIES, "Times control re-entered a loop");
    describe_histogram!(names::COMPONENT_DURATION, Unit::Seconds, "Component run time");
    describe_histogram!(names::RUN_DURATION, Unit::Seconds, "Pipeline run time");
});

/// Point-in-time copy of the in-process counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Runs started
    pub runs_started: u64,
    /// Runs completed
    pub runs_completed: u64,
    /// Runs failed
    pub runs_failed: u64,
    /// Successful component invocations, all components
    pub component_runs: u64,
    /// Failed component invocations, all components
    pub component_failures: u64,
    /// Components skipped in some pass
    pub components_skipped: u64,
    /// Loop re-entries
    pub loop_reentries: u64,
    /// Successful invocations per component
    pub runs_by_component: BTreeMap<String, u64>,
}

#[derive(Debug, Default)]
struct Counters {
    runs_started: AtomicU64,
    runs_completed: AtomicU64,
    runs_failed: AtomicU64,
    component_runs: AtomicU64,
    component_failures: AtomicU64,
    components_skipped: AtomicU64,
    loop_reentries: AtomicU64,
    runs_by_component: Mutex<BTreeMap<String, u64>>,
}

/// Event handler that records run metrics
///
/// Clones share their counters.
#[derive(Debug, Clone, Default)]
pub struct MetricsEventHandler {
    counters: Arc<Counters>,
}

impl MetricsEventHandler {
    /// Create a handler with zeroed counters
    pub fn new() -> Self {
        Lazy::force(&DESCRIPTIONS);
        Self::default()
    }

    /// Read the in-process counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        let c = &self.counters;
        let runs_by_component = match c.runs_by_component.lock() {
            Ok(map) => map.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        MetricsSnapshot {
            runs_started: c.runs_started.load(Ordering::Relaxed),
            runs_completed: c.runs_completed.load(Ordering::Relaxed),
            runs_failed: c.runs_failed.load(Ordering::Relaxed),
            component_runs: c.component_runs.load(Ordering::Relaxed),
            component_failures: c.component_failures.load(Ordering::Relaxed),
            components_skipped: c.components_skipped.load(Ordering::Relaxed),
            loop_reentries: c.loop_reentries.load(Ordering::Relaxed),
            runs_by_component,
        }
    }

    fn record_component_run(&self, component: &str) {
        let mut map = match self.counters.runs_by_component.lock() {
            Ok(map) => map,
            Err(poisoned) => poisoned.into_inner(),
        };
        *map.entry(component.to_string()).or_insert(0) += 1;
    }
}

#[async_trait]
impl RunEventHandler for MetricsEventHandler {
    async fn handle_event(&self, event: PipelineEvent) {
        let c = &self.counters;
        match event {
            PipelineEvent::RunStarted { .. } => {
                c.runs_started.fetch_add(1, Ordering::Relaxed);
                increment_counter!(names::RUNS_STARTED);
            }
            PipelineEvent::ComponentStarted { .. } => {}
            PipelineEvent::ComponentCompleted {
                component, duration, ..
            } => {
                c.component_runs.fetch_add(1, Ordering::Relaxed);
                self.record_component_run(&component);
                increment_counter!(names::COMPONENT_RUNS, "component" => component.clone());
                histogram!(names::COMPONENT_DURATION, duration.as_secs_f64(), "component" => component);
            }
            PipelineEvent::ComponentSkipped { .. } => {
                c.components_skipped.fetch_add(1, Ordering::Relaxed);
            }
            PipelineEvent::ComponentFailed { component, .. } => {
                c.component_failures.fetch_add(1, Ordering::Relaxed);
                increment_counter!(names::COMPONENT_FAILURES, "component" => component);
            }
            PipelineEvent::LoopReentered { .. } => {
                c.loop_reentries.fetch_add(1, Ordering::Relaxed);
                increment_counter!(names::LOOP_REENTRIES);
            }
            PipelineEvent::RunCompleted { duration, .. } => {
                c.runs_completed.fetch_add(1, Ordering::Relaxed);
                increment_counter!(names::RUNS_COMPLETED);
                histogram!(names::RUN_DURATION, duration.as_secs_f64());
            }
            PipelineEvent::RunFailed { .. } => {
                c.runs_failed.fetch_add(1, Ordering::Relaxed);
                increment_counter!(names::RUNS_FAILED);
            }
        }
    }
}

/// Forwards every event to several handlers, in order
///
/// Lets a run keep the default tracing output while also collecting metrics.
#[derive(Clone, Default)]
pub struct FanOutEventHandler {
    handlers: Vec<Arc<dyn RunEventHandler>>,
}

impl FanOutEventHandler {
    /// Create an empty fan-out
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a handler
    pub fn with(mut self, handler: Arc<dyn RunEventHandler>) -> Self {
        self.handlers.push(handler);
        self
    }
}

#[async_trait]
impl RunEventHandler for FanOutEventHandler {
    async fn handle_event(&self, event: PipelineEvent) {
        for handler in &self.handlers {
            handler.handle_event(event.clone()).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_counts_events() {
        let handler = MetricsEventHandler::new();
        let run_id = Uuid::new_v4();
        let events = vec![
            PipelineEvent::RunStarted { run_id, components: 2 },
            PipelineEvent::ComponentCompleted {
                run_id,
                component: "splitter".to_string(),
                pass: 0,
                outputs: vec!["documents".to_string()],
                duration: Duration::from_millis(3),
            },
            PipelineEvent::LoopReentered {
                run_id,
                entries: vec!["splitter".to_string()],
                pass: 1,
            },
            PipelineEvent::ComponentCompleted {
                run_id,
                component: "splitter".to_string(),
                pass: 1,
                outputs: vec![],
                duration: Duration::from_millis(1),
            },
            PipelineEvent::ComponentFailed {
                run_id,
                component: "writer".to_string(),
                error: "store full".to_string(),
            },
            PipelineEvent::RunFailed {
                run_id,
                error: "writer failed".to_string(),
            },
        ];
        for event in events {
            handler.handle_event(event).await;
        }

        let snapshot = handler.snapshot();
        assert_eq!(snapshot.runs_started, 1);
        assert_eq!(snapshot.runs_failed, 1);
        assert_eq!(snapshot.runs_completed, 0);
        assert_eq!(snapshot.component_runs, 2);
        assert_eq!(snapshot.component_failures, 1);
        assert_eq!(snapshot.loop_reentries, 1);
        assert_eq!(snapshot.runs_by_component.get("splitter"), Some(&2));
    }

    #[tokio::test]
    async fn test_clones_share_counters() {
        let handler = MetricsEventHandler::new();
        let clone = handler.clone();
        clone
            .handle_event(PipelineEvent::RunCompleted {
                run_id: Uuid::new_v4(),
                duration: Duration::from_millis(5),
            })
            .await;
        assert_eq!(handler.snapshot().runs_completed, 1);
    }

    #[tokio::test]
    async fn test_fan_out_reaches_every_handler() {
        let first = MetricsEventHandler::new();
        let second = MetricsEventHandler::new();
        let fan_out = FanOutEventHandler::new()
            .with(Arc::new(first.clone()))
            .with(Arc::new(second.clone()));

        fan_out
            .handle_event(PipelineEvent::RunStarted {
                run_id: Uuid::new_v4(),
                components: 0,
            })
            .await;
        assert_eq!(first.snapshot().runs_started, 1);
        assert_eq!(second.snapshot().runs_started, 1);
    }
}
