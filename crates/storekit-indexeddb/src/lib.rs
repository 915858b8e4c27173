//! Persistent key-value stores for storekit
//!
//! [`IndexedDatabase`] wraps one named, versioned database with a declared
//! schema. [`IndexedDatabaseManager`] runs operations against it as
//! cancellable task series, opening the connection on demand and closing it
//! when the last operation finishes. [`IndexedDbStoreManager`] puts the
//! in-memory store manager surface (add, delete, search, sort, paginate) on
//! top of one object store.
//!
//! Two engines implement the [`Backend`] seam: [`BrowserBackend`] talks to
//! the browser's IndexedDB (`wasm32` only), and [`MemoryBackend`] keeps
//! everything in memory with the same ordering and constraint rules.
//!
//! # Schema
//!
//! Each store lists its indexes in order. The first one is the key path; its
//! `autoIncrement` option makes the engine generate keys. Opening at a
//! higher version creates missing stores and indexes and never drops any.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::rc::Rc;
//! use storekit_indexeddb::{
//!     DatabaseSchema, IndexOptions, IndexedDatabase, IndexedDatabaseManager,
//!     IndexedDbStoreManager, MemoryBackend,
//! };
//!
//! let schema = DatabaseSchema::new().store(
//!     "contacts",
//!     [("id", IndexOptions::auto_increment()), ("email", IndexOptions::unique())],
//! );
//! let db = IndexedDatabase::new("app", 1, schema, MemoryBackend::new());
//! let contacts = IndexedDbStoreManager::new(Rc::new(IndexedDatabaseManager::new(db)), "contacts");
//!
//! let key = contacts.add(json!({"email": "ada@example.com"}), None).await?;
//! let page = contacts
//!     .apply_search_params(&SearchParams::new().search("ada").page(1, 20))
//!     .await?;
//! ```

pub mod backend;
pub mod cursor;
pub mod database;
pub mod error;
pub mod manager;
pub mod schema;
pub mod store_manager;
pub mod tasks;

pub use backend::{
    Backend, BackendStats, Connection, CursorDirection, CursorStep, MemoryBackend,
    MemoryConnection, UpgradeContext, UpgradeFn,
};
#[cfg(target_arch = "wasm32")]
pub use backend::{BrowserBackend, BrowserConnection};
pub use cursor::{CursorItem, RecordCursor, RecordsQuery};
pub use database::{DbState, IndexedDatabase};
pub use error::{IndexedDbError, Result};
pub use manager::{IndexedDatabaseManager, SearchTermQuery};
pub use schema::{DatabaseSchema, IndexOptions, StoreSchema};
pub use store_manager::IndexedDbStoreManager;
pub use tasks::TaskRunner;
