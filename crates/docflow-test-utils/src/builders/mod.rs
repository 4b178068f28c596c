//! Builders for run inputs.

use docflow_core::{DataPacket, RunInputs};
use serde_json::Value;

/// Fluent builder for [`RunInputs`]
#[derive(Debug, Default, Clone)]
pub struct RunInputsBuilder {
    inputs: RunInputs,
}

impl RunInputsBuilder {
    /// Start with no inputs
    pub fn new() -> Self {
        Self::default()
    }

    /// Supply `value` to `component.socket`
    pub fn with(mut self, component: &str, socket: &str, value: Value) -> Self {
        self.inputs
            .entry(component.to_string())
            .or_default()
            .insert(socket.to_string(), DataPacket::new(value));
        self
    }

    /// Finish
    pub fn build(self) -> RunInputs {
        self.inputs
    }
}

/// Shorthand for a single `component.socket = value` input
pub fn single_input(component: &str, socket: &str, value: Value) -> RunInputs {
    RunInputsBuilder::new().with(component, socket, value).build()
}
