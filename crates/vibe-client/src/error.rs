use std::time::Duration;

use thiserror::Error;

/// Result type for generation requests.
pub type GenerationResult<T> = Result<T, GenerationError>;

/// Why a generation request produced no source.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation service unreachable: {0}")]
    Transport(String),

    #[error("generation request timed out after {0:?}")]
    Timeout(Duration),

    #[error("generation service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed generation response: {0}")]
    MalformedResponse(String),
}

impl GenerationError {
    /// Transient failures a caller may try again.
    ///
    /// Client errors other than 429 and malformed bodies are not retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout(_) => true,
            Self::Status { status, .. } => *status == 429 || (500..600).contains(status),
            Self::MalformedResponse(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classes() {
        assert!(GenerationError::Transport("refused".into()).is_retryable());
        assert!(GenerationError::Timeout(Duration::from_secs(30)).is_retryable());
        assert!(GenerationError::Status { status: 500, body: String::new() }.is_retryable());
        assert!(GenerationError::Status { status: 429, body: String::new() }.is_retryable());
        assert!(!GenerationError::Status { status: 401, body: String::new() }.is_retryable());
        assert!(!GenerationError::MalformedResponse("no choices".into()).is_retryable());
    }

    #[test]
    fn timeout_display_keeps_subsecond_precision() {
        let err = GenerationError::Timeout(Duration::from_millis(200));
        assert_eq!(err.to_string(), "generation request timed out after 200ms");
    }

    #[test]
    fn display_includes_status() {
        let err = GenerationError::Status {
            status: 503,
            body: "overloaded".into(),
        };
        assert_eq!(err.to_string(), "generation service returned HTTP 503: overloaded");
    }
}
