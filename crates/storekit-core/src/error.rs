//! Store error types

use thiserror::Error;

/// Errors that can occur during store, paging, and search operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    /// A keyed store already holds this key
    #[error("duplicate key: {0}")]
    Duplicate(String),

    /// Record not found (only produced when existence is explicitly checked)
    #[error("key not found: {0}")]
    NotFound(String),

    /// Page number outside `1..=max_page` (or non-zero on an empty set)
    #[error("page {page} is out of range (max page {max_page})")]
    InvalidPage { page: usize, max_page: usize },

    /// Items per page must be at least one
    #[error("per_page must be greater than zero")]
    InvalidPerPage,

    /// Insert position beyond the end of a positional store
    #[error("position {position} is out of bounds (len {len})")]
    InvalidPosition { position: usize, len: usize },

    /// Value cannot be used as a key
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Dynamic lookup of an enumeration member failed
    #[error("unknown {kind}: {value:?}")]
    UnknownVariant { kind: &'static str, value: String },

    /// Storage backend error (database engine, transaction, etc.)
    #[error("storage backend error: {0}")]
    Backend(String),

    /// Operation cancelled by its caller
    #[error("operation aborted")]
    Aborted,

    /// A step of a task series failed
    #[error("task {task} failed: {source}")]
    TaskFailed {
        task: String,
        #[source]
        source: Box<StoreError>,
    },
}

impl StoreError {
    /// Whether this failure is a cancellation rather than a real error.
    ///
    /// Looks through `TaskFailed` wrappers.
    pub fn is_aborted(&self) -> bool {
        match self {
            StoreError::Aborted => true,
            StoreError::TaskFailed { source, .. } => source.is_aborted(),
            _ => false,
        }
    }

    /// The innermost error, unwrapping any `TaskFailed` layers.
    pub fn cause(&self) -> &StoreError {
        match self {
            StoreError::TaskFailed { source, .. } => source.cause(),
            other => other,
        }
    }

    /// Whether this is a validation failure raised at the call boundary.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            StoreError::InvalidPage { .. }
                | StoreError::InvalidPerPage
                | StoreError::InvalidPosition { .. }
                | StoreError::InvalidKey(_)
                | StoreError::UnknownVariant { .. }
        )
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_failed_unwraps() {
        let err = StoreError::TaskFailed {
            task: "delete".into(),
            source: Box::new(StoreError::NotFound("7".into())),
        };
        assert_eq!(err.cause(), &StoreError::NotFound("7".into()));
        assert!(!err.is_aborted());
        assert_eq!(err.to_string(), "task delete failed: key not found: 7");

        let aborted = StoreError::TaskFailed {
            task: "open".into(),
            source: Box::new(StoreError::Aborted),
        };
        assert!(aborted.is_aborted());
    }
}
