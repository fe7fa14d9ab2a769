//! Error types for expression evaluation

use std::fmt;
use thiserror::Error;

/// Main error type for the evaluator
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A declared argument was missing, had the wrong type, or could not be parsed
    #[error("Argument error: {0}")]
    Argument(#[from] ArgumentError),

    /// Function name is not registered
    #[error("Unknown function '{name}' at position {position}")]
    UnknownFunction {
        /// Offending function name
        name: String,
        /// Byte offset of the call in its source text
        position: usize,
    },

    /// Reducer name outside the supported set
    #[error("Unsupported reducer: {0:?}")]
    UnsupportedReducer(String),

    /// Comparison operator outside the supported set
    #[error("Unsupported operator: {0:?}")]
    UnsupportedOperator(String),

    /// Series cannot be aligned point by point
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Every input vanished after existence filtering
    #[error("No data for {0}")]
    NoData(String),

    /// Target text could not be parsed
    #[error("Parse error at position {position}: {message}")]
    Parse {
        /// Byte offset where parsing stopped
        position: usize,
        /// Description of the failure
        message: String,
    },

    /// Nested evaluation exceeded the configured depth
    #[error("Recursion depth {depth} exceeds limit {limit}")]
    RecursionLimit {
        /// Depth reached
        depth: usize,
        /// Configured maximum
        limit: usize,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error (bug, unexpected state)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether this error only signals that nothing matched
    pub fn is_no_data(&self) -> bool {
        matches!(self, Error::NoData(_))
    }
}

/// Parameter types a function argument can be coerced to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgType {
    /// Series expression (metric pattern or nested call)
    SeriesList,
    /// Floating point literal
    Float,
    /// Integer literal
    Int,
    /// Quoted string literal
    String,
    /// Boolean literal
    Bool,
    /// Interval string such as `'1h'`
    Interval,
}

impl fmt::Display for ArgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgType::SeriesList => write!(f, "seriesList"),
            ArgType::Float => write!(f, "float"),
            ArgType::Int => write!(f, "integer"),
            ArgType::String => write!(f, "string"),
            ArgType::Bool => write!(f, "boolean"),
            ArgType::Interval => write!(f, "interval"),
        }
    }
}

/// What went wrong with an argument
#[derive(Debug, Clone, PartialEq)]
pub enum ArgumentProblem {
    /// Required argument not supplied
    Missing,
    /// Supplied node has the wrong type
    TypeMismatch,
    /// Literal has the right shape but an unusable value
    Invalid(String),
}

/// Argument coercion failure, pinned to the argument that caused it
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{function}: argument {index} ({name}) expected {expected}: {}", describe(.problem))]
pub struct ArgumentError {
    /// Function being called
    pub function: String,
    /// Positional index of the argument
    pub index: usize,
    /// Declared parameter name
    pub name: String,
    /// Type the parameter is declared as
    pub expected: ArgType,
    /// Failure detail
    pub problem: ArgumentProblem,
}

fn describe(problem: &ArgumentProblem) -> String {
    match problem {
        ArgumentProblem::Missing => "missing".to_string(),
        ArgumentProblem::TypeMismatch => "wrong type".to_string(),
        ArgumentProblem::Invalid(msg) => msg.clone(),
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argument_error_display() {
        let err = Error::from(ArgumentError {
            function: "ewma".to_string(),
            index: 1,
            name: "alpha".to_string(),
            expected: ArgType::Float,
            problem: ArgumentProblem::Invalid("must be in (0, 1]".to_string()),
        });
        let display = err.to_string();
        assert!(display.contains("ewma"));
        assert!(display.contains("alpha"));
        assert!(display.contains("float"));
        assert!(display.contains("(0, 1]"));
    }

    #[test]
    fn test_no_data_detection() {
        assert!(Error::NoData("a.b".to_string()).is_no_data());
        assert!(!Error::Internal("x".to_string()).is_no_data());
    }
}
