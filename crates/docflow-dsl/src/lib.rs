//! Docflow DSL
//!
//! Saves a [`Pipeline`](docflow_core::Pipeline) as a declarative document
//! (component types, init parameters, connections, loop bound, metadata)
//! and rebuilds it through an explicit [`ComponentRegistry`]:
//!
//! ```yaml
//! components:
//!   cleaner:
//!     type: DocumentCleaner
//!     init_parameters: {}
//! connections:
//!   - sender: converter.documents
//!     receiver: cleaner.documents
//! max_loops_allowed: 100
//! metadata: {}
//! ```

pub mod document;
pub mod error;
pub mod registry;
pub mod serializer;

pub use document::{ComponentDocument, ConnectionDocument, PipelineDocument};
pub use error::DslError;
pub use registry::{param, param_or, ComponentFactory, ComponentRegistry};
pub use serializer::{dump, dumps, from_json, load, loads, parse_yaml, to_json};
