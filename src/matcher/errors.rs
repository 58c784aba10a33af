//! Matcher errors

use thiserror::Error;

/// Result type for matcher operations
pub type MatcherResult<T> = Result<T, MatcherError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatcherError {
    #[error("Invalid pattern '{pattern}' for matcher '{backend}': {reason}")]
    InvalidPattern {
        backend: String,
        pattern: String,
        reason: String,
    },

    #[error("Matcher '{0}' is not available")]
    Unavailable(String),

    #[error("Matcher '{name}' failed to initialise: {reason}")]
    InitFailed { name: String, reason: String },
}
