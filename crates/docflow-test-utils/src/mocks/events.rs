//! Event handler doubles.

use async_trait::async_trait;
use docflow_core::{PipelineEvent, RunEventHandler};
use mockall::mock;
use std::sync::Mutex;

// Generate the mock implementation for RunEventHandler
mock! {
    pub RunEventHandler {}

    #[async_trait]
    impl RunEventHandler for RunEventHandler {
        async fn handle_event(&self, event: PipelineEvent);
    }
}

/// Keeps every event it receives, in order
#[derive(Debug, Default)]
pub struct RecordingEventHandler {
    events: Mutex<Vec<PipelineEvent>>,
}

impl RecordingEventHandler {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded events
    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    /// Event type names, in order
    pub fn event_types(&self) -> Vec<&'static str> {
        self.events().iter().map(PipelineEvent::event_type).collect()
    }

    /// Components that were started, in start order
    pub fn started_components(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                PipelineEvent::ComponentStarted { component, .. } => Some(component),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl RunEventHandler for RecordingEventHandler {
    async fn handle_event(&self, event: PipelineEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
