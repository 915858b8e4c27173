//! Error types for the persistent store layer

use storekit_core::StoreError;
use thiserror::Error;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, IndexedDbError>;

/// Errors reported by a storage engine
#[derive(Debug, Error)]
pub enum IndexedDbError {
    /// No engine in this environment (e.g. `indexedDB` missing from the global)
    #[error("storage engine unavailable: {0}")]
    NotAvailable(String),

    /// Open or upgrade failed
    #[error("failed to open database: {0}")]
    Open(String),

    /// Requested version is older than the stored database
    #[error("cannot open version {requested}, database is at version {current}")]
    Version { requested: u32, current: u32 },

    /// Transaction failed, or the connection is closed
    #[error("transaction failed: {0}")]
    Transaction(String),

    #[error("request failed: {0}")]
    Request(String),

    /// Primary key or unique index already taken
    #[error("constraint violated: {0}")]
    Constraint(String),

    /// Object store does not exist in the open database
    #[error("unknown object store: {0}")]
    UnknownStore(String),

    /// Record not found where existence was required
    #[error("record {0} not found")]
    NotFound(String),

    /// Record has no usable key
    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("record encoding: {0}")]
    Json(#[from] serde_json::Error),

    /// A JS value could not cross the boundary
    #[error("js value: {0}")]
    JsValue(String),
}

#[cfg(target_arch = "wasm32")]
impl From<wasm_bindgen::JsValue> for IndexedDbError {
    fn from(val: wasm_bindgen::JsValue) -> Self {
        match js_sys::JSON::stringify(&val) {
            Ok(text) => IndexedDbError::Request(text.into()),
            Err(_) => IndexedDbError::JsValue(format!("{:?}", val)),
        }
    }
}

impl From<IndexedDbError> for StoreError {
    fn from(err: IndexedDbError) -> Self {
        match err {
            IndexedDbError::Constraint(key) => StoreError::Duplicate(key),
            IndexedDbError::NotFound(key) => StoreError::NotFound(key),
            IndexedDbError::InvalidKey(msg) => StoreError::InvalidKey(msg),
            other => StoreError::Backend(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_mapping() {
        assert_eq!(
            StoreError::from(IndexedDbError::Constraint("7".into())),
            StoreError::Duplicate("7".into())
        );
        assert_eq!(
            StoreError::from(IndexedDbError::UnknownStore("users".into())),
            StoreError::Backend("unknown object store: users".into())
        );
    }
}
