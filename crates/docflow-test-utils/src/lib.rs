//! Testing utilities for the Docflow engine.
//!
//! This crate provides mock components with predictable behavior, a
//! recording event handler, builders for run inputs, assertion helpers
//! for pipeline outputs, and sample data generators.

pub mod assertions;
pub mod builders;
pub mod data_generators;
pub mod mocks;

/// Re-export commonly used types for convenience
pub use mockall;

pub use builders::RunInputsBuilder;
pub use mocks::components::{
    CallCounter, ConstantSource, Failing, Passthrough, Sum, ThresholdLoop, ThresholdRouter,
};
pub use mocks::events::{MockRunEventHandler, RecordingEventHandler};
