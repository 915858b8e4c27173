//! # storekit shared library
//!
//! Infrastructure shared by the storekit crates:
//! - **config**: `StoreKitConfig`, loaded from JSON or from string maps
//! - **error**: Common error type for configuration and serialization failures
//! - **tracing**: Logging setup with storekit segment prefixes
//!
//! ## Usage
//!
//! ```rust
//! use storekit::StoreKitConfig;
//!
//! let config = StoreKitConfig::from_json(r#"{"visible_page_range": 7}"#).unwrap();
//! assert_eq!(config.visible_page_range, 7);
//! assert_eq!(config.highlight_open, "<mark>");
//! ```

pub mod config;
pub mod error;
pub mod tracing;

pub use config::StoreKitConfig;
pub use error::{Error, Result};
