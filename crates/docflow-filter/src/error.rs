use docflow_core::ComponentError;
use thiserror::Error;

/// Errors raised while parsing or evaluating a filter predicate
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    /// Operands cannot be compared with the requested operator
    #[error("Filter type error on '{field}' ({operator}): {message}")]
    Type {
        /// Field of the failing comparison
        field: String,
        /// Operator of the failing comparison
        operator: String,
        /// What did not fit
        message: String,
    },

    /// NOT with anything other than exactly one condition
    #[error("Filter arity error: {operator} takes exactly one condition, got {count}")]
    Arity {
        /// Logical operator
        operator: String,
        /// Number of conditions supplied
        count: usize,
    },

    /// The predicate document does not have either accepted shape
    #[error("Malformed filter: {0}")]
    Malformed(String),
}

impl FilterError {
    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            FilterError::Type { .. } => "ERR_FILTER_TYPE",
            FilterError::Arity { .. } => "ERR_FILTER_ARITY",
            FilterError::Malformed(_) => "ERR_FILTER_MALFORMED",
        }
    }
}

impl From<FilterError> for ComponentError {
    fn from(err: FilterError) -> Self {
        ComponentError::FilterError(err.to_string())
    }
}
