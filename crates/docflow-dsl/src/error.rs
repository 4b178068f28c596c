use docflow_core::{ComponentError, PipelineError, ValidationIssue};
use thiserror::Error;

/// All possible errors that can occur while saving or loading a pipeline
#[derive(Error, Debug)]
pub enum DslError {
    /// Errors that occur during YAML parsing
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Errors that occur during JSON processing
    #[error("JSON processing error: {0}")]
    Json(#[from] serde_json::Error),

    /// The registry has no factory for this type
    #[error("Unknown component type '{component_type}' for component '{component}'")]
    UnknownComponentType {
        /// Component name
        component: String,
        /// Unregistered type identifier
        component_type: String,
    },

    /// A YAML tag was found; tags can instantiate arbitrary objects and are refused
    #[error("Executable content is not allowed: tag '{tag}' at {path}")]
    ExecutableContent {
        /// The tag, e.g. `!!python/object`
        tag: String,
        /// Location inside the document
        path: String,
    },

    /// The factory rejected the configuration
    #[error("Invalid init parameters for component '{component}': {message}")]
    InvalidInitParameters {
        /// Component name
        component: String,
        /// What was wrong
        message: String,
    },

    /// The factory failed for another reason
    #[error("Failed to construct component '{component}': {cause}")]
    ComponentConstruction {
        /// Component name
        component: String,
        /// Underlying error
        cause: ComponentError,
    },

    /// Rebuilding the graph failed; all wiring problems are batched into one
    /// [`PipelineError::GraphValidation`]
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl DslError {
    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            DslError::Yaml(_) => "ERR_DSL_YAML_PARSE",
            DslError::Json(_) => "ERR_DSL_JSON_PARSE",
            DslError::UnknownComponentType { .. } => "ERR_DSL_UNKNOWN_COMPONENT_TYPE",
            DslError::ExecutableContent { .. } => "ERR_DSL_EXECUTABLE_CONTENT",
            DslError::InvalidInitParameters { .. } => "ERR_DSL_INVALID_INIT_PARAMETERS",
            DslError::ComponentConstruction { .. } => "ERR_DSL_COMPONENT_CONSTRUCTION",
            DslError::Pipeline(err) => err.error_code(),
        }
    }

    /// Validation issues, if this is a graph validation failure
    pub fn issues(&self) -> &[ValidationIssue] {
        match self {
            DslError::Pipeline(err) => err.issues(),
            _ => &[],
        }
    }

    /// Classify a factory failure
    pub(crate) fn from_factory(component: &str, cause: ComponentError) -> Self {
        match cause {
            ComponentError::ConfigurationError(message) | ComponentError::InvalidInput(message) => {
                DslError::InvalidInitParameters {
                    component: component.to_string(),
                    message,
                }
            }
            cause => DslError::ComponentConstruction {
                component: component.to_string(),
                cause,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = DslError::UnknownComponentType {
            component: "llm".to_string(),
            component_type: "OpenAIGenerator".to_string(),
        };
        assert_eq!(err.error_code(), "ERR_DSL_UNKNOWN_COMPONENT_TYPE");
        assert_eq!(
            err.to_string(),
            "Unknown component type 'OpenAIGenerator' for component 'llm'"
        );

        let err = DslError::from(PipelineError::GraphValidation(vec![]));
        assert_eq!(err.error_code(), "ERR_PIPELINE_VALIDATION");
    }

    #[test]
    fn test_factory_errors_are_classified() {
        let err = DslError::from_factory(
            "splitter",
            ComponentError::ConfigurationError("split_length must be positive".to_string()),
        );
        assert_eq!(err.error_code(), "ERR_DSL_INVALID_INIT_PARAMETERS");

        let err = DslError::from_factory("store", ComponentError::IOError("disk".to_string()));
        assert_eq!(err.error_code(), "ERR_DSL_COMPONENT_CONSTRUCTION");
    }
}
