//!
//! Docflow Core - the dataflow engine behind Docflow pipelines
//!
//! This crate defines the component contract, the typed socket model,
//! the pipeline graph with its connection registry, and the scheduler
//! that runs components in dependency order. Every other crate in the
//! workspace builds on it.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use async_trait::async_trait;
use serde_json::{Map, Value};

/// Domain layer - documents, sockets, the pipeline graph and run events
pub mod domain;

/// Application services - scheduling and cancellation
pub mod application;

/// Core types
pub mod types;

/// Error types
pub mod error;

// Re-export main API types for easy use
pub use application::cancellation::CancellationToken;
pub use application::scheduler::{RunOptions, Scheduler};
pub use domain::document::Document;
pub use domain::events::{PipelineEvent, RunEventHandler, TracingEventHandler};
pub use domain::pipeline::{Connection, Pipeline, DEFAULT_MAX_LOOP_ITERATIONS};
pub use domain::socket::{InputSocket, OutputSocket, SocketPath, SocketSchema, SocketType};
pub use error::{validation_codes, ComponentError, PipelineError, ValidationIssue};
pub use types::{DataPacket, PipelineOutputs, RunInputs, SocketValues};

/// Non-async base trait for components
///
/// Holds the static parts of the contract: the type identifier used by
/// the serializer, the socket declaration, and the init configuration.
pub trait ComponentBase: Send + Sync {
    /// Type identifier, as registered with a component registry
    fn component_type(&self) -> &str;

    /// Input and output socket declaration
    fn sockets(&self) -> SocketSchema;

    /// Configuration needed to rebuild this component
    fn init_parameters(&self) -> Map<String, Value> {
        Map::new()
    }
}

/// A unit of computation inside a pipeline
#[async_trait]
pub trait Component: ComponentBase {
    /// Load models or open connections; called at most once before the first run
    async fn warm_up(&self) -> Result<(), ComponentError> {
        Ok(())
    }

    /// Execute the component
    ///
    /// Only the outputs the component chooses to emit are returned; a
    /// router leaves its untaken branches out of the map.
    async fn run(&self, inputs: SocketValues) -> Result<SocketValues, ComponentError>;

    /// Merge the values delivered to a joinable socket
    ///
    /// Values arrive in connection order. The default collects them into a list.
    fn join_inputs(
        &self,
        _socket: &str,
        values: Vec<DataPacket>,
    ) -> Result<DataPacket, ComponentError> {
        Ok(DataPacket::new(Value::Array(
            values.into_iter().map(DataPacket::into_value).collect(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    /// Example component that greets
    struct Greeter {
        template: String,
    }

    impl ComponentBase for Greeter {
        fn component_type(&self) -> &str {
            "Greeter"
        }

        fn sockets(&self) -> SocketSchema {
            SocketSchema::new()
                .with_input(
                    InputSocket::optional("name", SocketType::String)
                        .with_default(DataPacket::from_string("World")),
                )
                .with_output("greeting", SocketType::String)
        }

        fn init_parameters(&self) -> Map<String, Value> {
            let mut params = Map::new();
            params.insert("template".to_string(), json!(self.template));
            params
        }
    }

    #[async_trait]
    impl Component for Greeter {
        async fn run(&self, inputs: SocketValues) -> Result<SocketValues, ComponentError> {
            let name = inputs
                .get("name")
                .and_then(DataPacket::as_str)
                .ok_or_else(|| ComponentError::MissingInput("name".to_string()))?;
            let mut outputs = HashMap::new();
            outputs.insert(
                "greeting".to_string(),
                DataPacket::from_string(&self.template.replace("{name}", name)),
            );
            Ok(outputs)
        }
    }

    #[tokio::test]
    async fn test_component_run() {
        let component = Greeter {
            template: "Hello, {name}!".to_string(),
        };
        let mut inputs = HashMap::new();
        inputs.insert("name".to_string(), DataPacket::from_string("Test User"));

        let outputs = component.run(inputs).await.unwrap();
        assert_eq!(outputs["greeting"].as_str(), Some("Hello, Test User!"));
    }

    #[tokio::test]
    async fn test_default_warm_up_is_noop() {
        let component = Greeter {
            template: String::new(),
        };
        assert!(component.warm_up().await.is_ok());
        assert!(component.warm_up().await.is_ok());
    }

    #[test]
    fn test_default_join_collects_in_order() {
        let component = Greeter {
            template: String::new(),
        };
        let joined = component
            .join_inputs(
                "name",
                vec![DataPacket::new(json!(1)), DataPacket::new(json!(2))],
            )
            .unwrap();
        assert_eq!(joined.into_value(), json!([1, 2]));
    }

    #[test]
    fn test_init_parameters() {
        let component = Greeter {
            template: "Hi {name}".to_string(),
        };
        assert_eq!(component.component_type(), "Greeter");
        assert_eq!(component.init_parameters()["template"], json!("Hi {name}"));
    }
}
