use docflow_core::DEFAULT_MAX_LOOP_ITERATIONS;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// The declarative form of a pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineDocument {
    /// Components keyed by name
    #[serde(default)]
    pub components: BTreeMap<String, ComponentDocument>,

    /// Connections in declaration order
    #[serde(default)]
    pub connections: Vec<ConnectionDocument>,

    /// Loop bound
    #[serde(default = "default_max_loops")]
    pub max_loops_allowed: usize,

    /// Free-form metadata
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Default for PipelineDocument {
    fn default() -> Self {
        Self {
            components: BTreeMap::new(),
            connections: Vec::new(),
            max_loops_allowed: DEFAULT_MAX_LOOP_ITERATIONS,
            metadata: Map::new(),
        }
    }
}

/// One component entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComponentDocument {
    /// Registered type identifier
    #[serde(rename = "type")]
    pub component_type: String,

    /// Configuration handed to the registry factory
    #[serde(default)]
    pub init_parameters: Map<String, Value>,
}

/// One connection entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionDocument {
    /// `"component.socket"` of the producer
    pub sender: String,

    /// `"component.socket"` of the consumer
    pub receiver: String,

    /// Feedback edge of a bounded loop
    #[serde(default, rename = "loop", skip_serializing_if = "is_false")]
    pub is_loop: bool,
}

fn default_max_loops() -> usize {
    DEFAULT_MAX_LOOP_ITERATIONS
}

fn is_false(value: &bool) -> bool {
    !*value
}
