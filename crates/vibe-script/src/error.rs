//! vibescript error types

use thiserror::Error;

/// Rejected source text, positioned at the offending token.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("syntax error at line {line}, column {col}: {message}")]
pub struct SyntaxError {
    /// Line number (1-based)
    pub line: usize,
    /// Column number (1-based)
    pub col: usize,
    pub message: String,
}

impl SyntaxError {
    pub fn new(line: usize, col: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            col,
            message: message.into(),
        }
    }
}

/// Result type alias for lexing and parsing
pub type SyntaxResult<T> = Result<T, SyntaxError>;

/// Failures while running script code.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum RuntimeError {
    #[error("undefined name '{0}'")]
    UndefinedName(String),

    #[error("type error: {0}")]
    Type(String),

    #[error("'{name}' expects {expected} argument(s), got {found}")]
    Arity {
        name: String,
        expected: String,
        found: usize,
    },

    #[error("'{0}' is not callable")]
    NotCallable(String),

    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: i64, len: usize },

    #[error("key not found: '{0}'")]
    KeyNotFound(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("integer overflow in '{0}'")]
    Overflow(&'static str),

    #[error("invalid value: {0}")]
    Value(String),

    #[error("'{0}' used outside of a loop")]
    LoopControl(&'static str),

    #[error("maximum call depth of {0} exceeded")]
    CallDepthExceeded(usize),

    #[error("step budget of {0} exhausted")]
    StepLimitExceeded(u64),

    #[error("native function '{name}' failed: {message}")]
    Native { name: String, message: String },

    #[error("could not start the interpreter thread: {0}")]
    Host(String),
}

impl RuntimeError {
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::Type(message.into())
    }

    /// Construct the error a host native function reports.
    pub fn native(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Native {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for script execution
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Why generated source could not be bound into a module.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum LoadError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error("source does not define a function named '{0}'")]
    MissingBinding(String),

    #[error("'{function}' accepts {accepts} argument(s) but is declared with {declared}")]
    ArityMismatch {
        function: String,
        declared: String,
        accepts: String,
    },

    #[error("initializing '{name}' failed: {source}")]
    Initialization {
        name: String,
        #[source]
        source: RuntimeError,
    },
}

/// Result type alias for loading
pub type LoadResult<T> = Result<T, LoadError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syntax_error_display() {
        let err = SyntaxError::new(3, 7, "expected '}'");
        assert_eq!(err.to_string(), "syntax error at line 3, column 7: expected '}'");
    }

    #[test]
    fn load_error_wraps_syntax_transparently() {
        let err: LoadError = SyntaxError::new(1, 1, "unexpected character '@'").into();
        assert_eq!(
            err.to_string(),
            "syntax error at line 1, column 1: unexpected character '@'"
        );
    }

    #[test]
    fn arity_display() {
        let err = RuntimeError::Arity {
            name: "fib".into(),
            expected: "1".into(),
            found: 2,
        };
        assert_eq!(err.to_string(), "'fib' expects 1 argument(s), got 2");
    }
}
