use async_trait::async_trait;
use std::time::Duration;
use uuid::Uuid;

/// Something that happened during a pipeline run
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    /// The scheduler accepted the run inputs and is about to invoke components
    RunStarted {
        /// Run identifier
        run_id: Uuid,
        /// Number of components in the pipeline
        components: usize,
    },

    /// A component is about to be invoked
    ComponentStarted {
        /// Run identifier
        run_id: Uuid,
        /// Component name
        component: String,
        /// Scheduler pass (0 for the first pass, +1 per loop re-entry)
        pass: usize,
    },

    /// A component returned successfully
    ComponentCompleted {
        /// Run identifier
        run_id: Uuid,
        /// Component name
        component: String,
        /// Scheduler pass
        pass: usize,
        /// Output sockets the component emitted onto
        outputs: Vec<String>,
        /// Wall-clock time spent in `run`
        duration: Duration,
    },

    /// A component was not reached in this pass
    ComponentSkipped {
        /// Run identifier
        run_id: Uuid,
        /// Component name
        component: String,
        /// Scheduler pass
        pass: usize,
    },

    /// A component raised
    ComponentFailed {
        /// Run identifier
        run_id: Uuid,
        /// Component name
        component: String,
        /// Rendered cause
        error: String,
    },

    /// Control re-entered one or more loop regions
    LoopReentered {
        /// Run identifier
        run_id: Uuid,
        /// Loop entry components receiving feedback
        entries: Vec<String>,
        /// The pass about to start
        pass: usize,
    },

    /// The run finished successfully
    RunCompleted {
        /// Run identifier
        run_id: Uuid,
        /// Total run time
        duration: Duration,
    },

    /// The run aborted
    RunFailed {
        /// Run identifier
        run_id: Uuid,
        /// Rendered error
        error: String,
    },
}

impl PipelineEvent {
    /// Returns the type of the event as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            PipelineEvent::RunStarted { .. } => "pipeline.run_started",
            PipelineEvent::ComponentStarted { .. } => "pipeline.component_started",
            PipelineEvent::ComponentCompleted { .. } => "pipeline.component_completed",
            PipelineEvent::ComponentSkipped { .. } => "pipeline.component_skipped",
            PipelineEvent::ComponentFailed { .. } => "pipeline.component_failed",
            PipelineEvent::LoopReentered { .. } => "pipeline.loop_reentered",
            PipelineEvent::RunCompleted { .. } => "pipeline.run_completed",
            PipelineEvent::RunFailed { .. } => "pipeline.run_failed",
        }
    }

    /// Returns the run this event belongs to
    pub fn run_id(&self) -> Uuid {
        match self {
            PipelineEvent::RunStarted { run_id, .. }
            | PipelineEvent::ComponentStarted { run_id, .. }
            | PipelineEvent::ComponentCompleted { run_id, .. }
            | PipelineEvent::ComponentSkipped { run_id, .. }
            | PipelineEvent::ComponentFailed { run_id, .. }
            | PipelineEvent::LoopReentered { run_id, .. }
            | PipelineEvent::RunCompleted { run_id, .. }
            | PipelineEvent::RunFailed { run_id, .. } => *run_id,
        }
    }
}

/// Handler for run events
#[async_trait]
pub trait RunEventHandler: Send + Sync {
    /// Handle a run event
    async fn handle_event(&self, event: PipelineEvent);
}

/// Default handler: writes every event to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventHandler;

#[async_trait]
impl RunEventHandler for TracingEventHandler {
    async fn handle_event(&self, event: PipelineEvent) {
        match &event {
            PipelineEvent::RunStarted { run_id, components } => {
                tracing::info!(%run_id, components, "Pipeline run started");
            }
            PipelineEvent::ComponentStarted {
                run_id,
                component,
                pass,
            } => {
                tracing::debug!(%run_id, %component, pass, "Running component");
            }
            PipelineEvent::ComponentCompleted {
                run_id,
                component,
                pass,
                outputs,
                duration,
            } => {
                tracing::debug!(
                    %run_id,
                    %component,
                    pass,
                    ?outputs,
                    duration_ms = duration.as_millis() as u64,
                    "Component completed"
                );
            }
            PipelineEvent::ComponentSkipped {
                run_id,
                component,
                pass,
            } => {
                tracing::trace!(%run_id, %component, pass, "Component not reached");
            }
            PipelineEvent::ComponentFailed {
                run_id,
                component,
                error,
            } => {
                tracing::error!(%run_id, %component, %error, "Component failed");
            }
            PipelineEvent::LoopReentered {
                run_id,
                entries,
                pass,
            } => {
                tracing::debug!(%run_id, ?entries, pass, "Re-entering loop");
            }
            PipelineEvent::RunCompleted { run_id, duration } => {
                tracing::info!(
                    %run_id,
                    duration_ms = duration.as_millis() as u64,
                    "Pipeline run completed"
                );
            }
            PipelineEvent::RunFailed { run_id, error } => {
                tracing::warn!(%run_id, %error, "Pipeline run failed");
            }
        }
    }
}
