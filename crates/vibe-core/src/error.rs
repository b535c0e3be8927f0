//! Declaration validation errors.

/// Result type for identity extraction.
pub type IdentityResult<T> = Result<T, IdentityError>;

/// A declaration that cannot be turned into an identity.
///
/// These are caller mistakes; retrying without fixing the declaration
/// gives the same error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error("function '{0}' has no docstring")]
    MissingDocstring(String),

    #[error("invalid function name: '{0}'")]
    InvalidName(String),

    #[error("function '{function}' has an invalid parameter name: '{parameter}'")]
    InvalidParameter { function: String, parameter: String },

    #[error("function '{function}' declares parameter '{parameter}' twice")]
    DuplicateParameter { function: String, parameter: String },

    #[error("function '{function}': required parameter '{parameter}' follows a parameter with a default")]
    DefaultOrder { function: String, parameter: String },
}
