use std::fmt;
use thiserror::Error;

/// Error raised by a component from inside `warm_up` or `run`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ComponentError {
    /// A required input was not delivered
    #[error("Missing input: {0}")]
    MissingInput(String),

    /// An input had the wrong shape or type
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The component emitted onto a socket it never declared
    #[error("Undeclared output socket: {0}")]
    UndeclaredOutput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Metadata filter could not be evaluated
    #[error("Filter error: {0}")]
    FilterError(String),

    /// Document store rejected an operation
    #[error("Document store error: {0}")]
    StoreError(String),

    /// Input/output error
    #[error("Input/output error: {0}")]
    IOError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// External dependency error (model service, converter, ...)
    #[error("External dependency error: {0}")]
    ExternalDependencyError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for ComponentError {
    fn from(err: serde_json::Error) -> Self {
        ComponentError::SerializationError(err.to_string())
    }
}

impl From<std::io::Error> for ComponentError {
    fn from(err: std::io::Error) -> Self {
        ComponentError::IOError(err.to_string())
    }
}

impl From<String> for ComponentError {
    fn from(err: String) -> Self {
        ComponentError::Other(err)
    }
}

impl From<&str> for ComponentError {
    fn from(err: &str) -> Self {
        ComponentError::Other(err.to_string())
    }
}

/// Validation issue codes
pub mod validation_codes {
    /// A connection or run input names a component that does not exist
    pub const UNKNOWN_COMPONENT: &str = "ERR_PIPELINE_UNKNOWN_COMPONENT";

    /// A connection or run input names a socket that does not exist
    pub const UNKNOWN_SOCKET: &str = "ERR_PIPELINE_UNKNOWN_SOCKET";

    /// A required input socket has no producer, no default and no run-time value
    pub const DANGLING_INPUT: &str = "ERR_PIPELINE_DANGLING_INPUT";

    /// The non-loop connections form a cycle
    pub const CIRCULAR_DEPENDENCY: &str = "ERR_PIPELINE_CIRCULAR_DEPENDENCY";

    /// A connection marked as a loop does not close a cycle
    pub const LOOP_NOT_CLOSED: &str = "ERR_PIPELINE_LOOP_NOT_CLOSED";

    /// A run-time value targets a socket that already has an upstream producer
    pub const INPUT_CONFLICT: &str = "ERR_PIPELINE_INPUT_CONFLICT";

    /// Sender and receiver socket types are incompatible
    pub const TYPE_MISMATCH: &str = "ERR_PIPELINE_TYPE_MISMATCH";

    /// A non-joinable input socket has more than one producer
    pub const SOCKET_OCCUPIED: &str = "ERR_PIPELINE_SOCKET_OCCUPIED";

    /// A socket name was omitted and could not be inferred
    pub const AMBIGUOUS_SOCKET: &str = "ERR_PIPELINE_AMBIGUOUS_SOCKET";

    /// The same connection was declared twice
    pub const DUPLICATE_CONNECTION: &str = "ERR_PIPELINE_DUPLICATE_CONNECTION";
}

/// A single structural problem found while validating a pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Error code (one of [`validation_codes`])
    pub code: &'static str,

    /// Human-readable error message
    pub message: String,

    /// Optional location of the problem (e.g. "retriever.query")
    pub path: Option<String>,
}

impl ValidationIssue {
    /// Create an issue attached to a component or socket path
    pub fn at(code: &'static str, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            path: Some(path.into()),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(path) = &self.path {
            write!(f, "{}: {} (at {})", self.code, self.message, path)
        } else {
            write!(f, "{}: {}", self.code, self.message)
        }
    }
}

// Helper struct to format multiple issues
struct IssuesFormat<'a>(&'a [ValidationIssue]);

impl fmt::Display for IssuesFormat<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pipeline validation failed ({} issues):", self.0.len())?;
        for (i, issue) in self.0.iter().enumerate() {
            write!(f, "\n  {}. {}", i + 1, issue)?;
        }
        Ok(())
    }
}

/// Errors raised while building, validating or running a pipeline
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// A component with this name was already added
    #[error("Component name already in use: {0}")]
    DuplicateName(String),

    /// Component names must be non-empty and must not contain '.'
    #[error("Invalid component name: '{0}'")]
    InvalidComponentName(String),

    /// Connection references an unknown component
    #[error("Component not found: {0}")]
    UnknownComponent(String),

    /// Connection references an unknown socket
    #[error("Component '{component}' has no {direction} socket named '{socket}'")]
    UnknownSocket {
        /// Component name
        component: String,
        /// "input" or "output"
        direction: &'static str,
        /// Requested socket name
        socket: String,
    },

    /// Socket omitted and the component exposes more than one candidate
    #[error("Cannot infer {direction} socket of '{component}', candidates: {}", .candidates.join(", "))]
    AmbiguousSocket {
        /// Component name
        component: String,
        /// "input" or "output"
        direction: &'static str,
        /// Socket names the caller could have meant
        candidates: Vec<String>,
    },

    /// Sender produces a type the receiver does not accept
    #[error("Cannot connect '{sender}' ({sender_type}) to '{receiver}' ({receiver_type})")]
    TypeMismatch {
        /// Sender socket path
        sender: String,
        /// Receiver socket path
        receiver: String,
        /// Declared sender type
        sender_type: String,
        /// Declared receiver type
        receiver_type: String,
    },

    /// Second producer on a non-joinable input socket
    #[error("Input socket '{receiver}' is already connected to '{existing}'")]
    SocketOccupied {
        /// Receiver socket path
        receiver: String,
        /// Sender already feeding the socket
        existing: String,
    },

    /// The exact same connection was declared twice
    #[error("Connection '{sender}' -> '{receiver}' already exists")]
    DuplicateConnection {
        /// Sender socket path
        sender: String,
        /// Receiver socket path
        receiver: String,
    },

    /// Structural validation failed; every issue found is listed
    #[error("{}", IssuesFormat(.0))]
    GraphValidation(Vec<ValidationIssue>),

    /// A component failed while warming up or running
    #[error("Component '{component}' failed: {cause}")]
    ComponentExecution {
        /// Name of the failing component
        component: String,
        /// Error raised by the component
        cause: ComponentError,
    },

    /// A loop region re-entered more often than allowed
    #[error("Component '{component}' exceeded the loop limit of {max_iterations} iterations")]
    LoopLimitExceeded {
        /// Loop entry component
        component: String,
        /// Configured bound
        max_iterations: usize,
    },

    /// The run was cancelled between component invocations
    #[error("Pipeline run cancelled")]
    Cancelled,
}

impl PipelineError {
    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            PipelineError::DuplicateName(_) => "ERR_PIPELINE_DUPLICATE_NAME",
            PipelineError::InvalidComponentName(_) => "ERR_PIPELINE_INVALID_NAME",
            PipelineError::UnknownComponent(_) => validation_codes::UNKNOWN_COMPONENT,
            PipelineError::UnknownSocket { .. } => validation_codes::UNKNOWN_SOCKET,
            PipelineError::AmbiguousSocket { .. } => validation_codes::AMBIGUOUS_SOCKET,
            PipelineError::TypeMismatch { .. } => validation_codes::TYPE_MISMATCH,
            PipelineError::SocketOccupied { .. } => validation_codes::SOCKET_OCCUPIED,
            PipelineError::DuplicateConnection { .. } => validation_codes::DUPLICATE_CONNECTION,
            PipelineError::GraphValidation(_) => "ERR_PIPELINE_VALIDATION",
            PipelineError::ComponentExecution { .. } => "ERR_PIPELINE_COMPONENT_EXECUTION",
            PipelineError::LoopLimitExceeded { .. } => "ERR_PIPELINE_LOOP_LIMIT",
            PipelineError::Cancelled => "ERR_PIPELINE_CANCELLED",
        }
    }

    /// Convert a wiring error into a validation issue so it can be batched
    pub fn into_issue(self) -> ValidationIssue {
        let code = self.error_code();
        let path = match &self {
            PipelineError::UnknownComponent(name) => Some(name.clone()),
            PipelineError::UnknownSocket {
                component, socket, ..
            } => Some(format!("{}.{}", component, socket)),
            PipelineError::AmbiguousSocket { component, .. } => Some(component.clone()),
            PipelineError::TypeMismatch { receiver, .. }
            | PipelineError::SocketOccupied { receiver, .. }
            | PipelineError::DuplicateConnection { receiver, .. } => Some(receiver.clone()),
            _ => None,
        };
        ValidationIssue {
            code,
            message: self.to_string(),
            path,
        }
    }

    /// The issues carried by a [`PipelineError::GraphValidation`], if any
    pub fn issues(&self) -> &[ValidationIssue] {
        match self {
            PipelineError::GraphValidation(issues) => issues,
            _ => &[],
        }
    }
}
