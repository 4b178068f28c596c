//! Error types for the Docflow runner

use docflow_core::PipelineError;
use docflow_dsl::DslError;
use thiserror::Error;

/// Runner error types
#[derive(Error, Debug)]
pub enum RunnerError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A pipeline or inputs file could not be read
    #[error("Failed to read '{path}': {source}")]
    ReadError {
        /// File that was requested
        path: String,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// Inputs file is not a JSON object of component → socket → value
    #[error("Invalid run inputs: {0}")]
    InputsError(#[from] serde_json::Error),

    /// Outputs could not be encoded as JSON
    #[error("Failed to encode outputs: {0}")]
    OutputError(serde_json::Error),

    /// Pipeline document could not be loaded
    #[error(transparent)]
    DslError(#[from] DslError),

    /// Pipeline failed to run
    #[error(transparent)]
    PipelineError(#[from] PipelineError),
}

/// Result type for runner operations
pub type RunnerResult<T> = Result<T, RunnerError>;
