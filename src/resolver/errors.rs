//! Property resolution errors

use thiserror::Error;

/// Result type for property resolution
pub type ResolutionResult<T> = Result<T, PropertyResolutionError>;

/// Why a property path could not be resolved.
///
/// Every variant keeps the full path text for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PropertyResolutionError {
    #[error("Invalid property path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("No field or accessor '{member}' on {type_name} (path '{path}')")]
    NoSuchMember {
        path: String,
        member: String,
        type_name: String,
    },

    #[error("Index {index} out of bounds for length {len} (path '{path}')")]
    IndexOutOfBounds {
        path: String,
        index: usize,
        len: usize,
    },

    #[error("Cannot index {found} with [{index}] (path '{path}')")]
    NotIndexable {
        path: String,
        index: usize,
        found: String,
    },

    #[error("Cannot look up key '{key}' in {found} (path '{path}')")]
    NotKeyed {
        path: String,
        key: String,
        found: String,
    },

    #[error("No setter '{member}' on {type_name} accepts a {value_type} (path '{path}')")]
    NoSetter {
        path: String,
        member: String,
        type_name: String,
        value_type: String,
    },

    #[error("Setter '{member}' failed: {reason} (path '{path}')")]
    SetterFailed {
        path: String,
        member: String,
        reason: String,
    },
}

impl PropertyResolutionError {
    /// The offending path text
    pub fn path(&self) -> &str {
        match self {
            PropertyResolutionError::InvalidPath { path, .. }
            | PropertyResolutionError::NoSuchMember { path, .. }
            | PropertyResolutionError::IndexOutOfBounds { path, .. }
            | PropertyResolutionError::NotIndexable { path, .. }
            | PropertyResolutionError::NotKeyed { path, .. }
            | PropertyResolutionError::NoSetter { path, .. }
            | PropertyResolutionError::SetterFailed { path, .. } => path,
        }
    }
}
