//! storekit core
//!
//! Synchronous building blocks shared by every storekit store, designed to
//! run identically in browser (WASM) and native environments.
//!
//! - **paging**: `PagingCalculator` and visible page ranges
//! - **search**: accent/case folding substring search with highlighting
//! - **pipeline**: the search → sort → paginate pipeline
//! - **store**: in-memory store managers over arrays, objects, maps, sets
//!   and key/value pairs
//! - **events** / **status**: listener registry and state holder
//!
//! # Example
//!
//! ```rust
//! use serde_json::json;
//! use storekit_core::{ArrayStoreManager, SearchParams};
//!
//! let store = ArrayStoreManager::from_vec(vec![json!("One"), json!("Two"), json!("Three")]);
//! let outcome = store.apply_search_params(&SearchParams::new().search("o")).unwrap();
//!
//! assert_eq!(outcome.total, 2);
//! assert_eq!(outcome.result[0].1, json!("<mark>O</mark>ne"));
//! ```

pub mod error;
pub mod events;
pub mod key;
pub mod paging;
pub mod params;
pub mod pipeline;
pub mod search;
pub mod status;
pub mod store;

// Re-export main types at crate root
pub use error::{StoreError, StoreResult};
pub use events::{EventEmitter, ListenerId, StoreEvent};
pub use key::Key;
pub use paging::{
    calculate_visible_page_range, Orientation, PageRange, PagingCalculator, PagingChange,
    PagingField,
};
pub use params::{AppliedParams, SearchOutcome, SearchParams, SortOrder};
pub use search::{mark_text, search_value, search_value_in, Highlight, SearchOptions};
pub use status::{StatusChange, StatusHolder};
pub use store::{
    AddOptions, ArrayCollection, ArrayPairsCollection, ArrayPairsStoreManager, ArrayStoreManager,
    Collection, DeleteMode, DeleteReport, MapCollection, MapStoreManager, ObjectCollection,
    ObjectStoreManager, SetCollection, SetStoreManager, StoreManager,
};
