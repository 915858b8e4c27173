//! Common error types for storekit components.

use thiserror::Error;

/// Common error type for storekit infrastructure.
#[derive(Error, Debug)]
pub enum Error {
    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias using storekit Error.
pub type Result<T> = std::result::Result<T, Error>;
