//! Storage engine seam
//!
//! [`Backend`] opens named, versioned databases; [`Connection`] performs
//! single-transaction operations against one of them. The database and
//! manager layers are generic over the engine, so the same code runs against
//! browser IndexedDB and the in-memory engine.

use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use serde_json::Value;
use storekit_core::{Key, StoreError};

use crate::error::Result;

#[cfg(target_arch = "wasm32")]
pub mod browser;
pub mod memory;

#[cfg(target_arch = "wasm32")]
pub use browser::{BrowserBackend, BrowserConnection};
pub use memory::{BackendStats, MemoryBackend, MemoryConnection};

/// Schema changes available while a database is being upgraded.
pub trait UpgradeContext {
    fn store_names(&self) -> Vec<String>;

    fn create_store(&mut self, name: &str, key_path: Option<&str>, auto_increment: bool)
        -> Result<()>;

    fn index_names(&self, store: &str) -> Result<Vec<String>>;

    fn create_index(&mut self, store: &str, name: &str, unique: bool) -> Result<()>;
}

/// Upgrade callback, run only when the requested version is newer than the
/// stored one.
pub type UpgradeFn = Rc<dyn Fn(&mut dyn UpgradeContext) -> Result<()>>;

/// Traversal direction of a cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CursorDirection {
    #[default]
    Next,
    Prev,
}

impl CursorDirection {
    pub const ALL: [CursorDirection; 2] = [CursorDirection::Next, CursorDirection::Prev];

    pub fn as_str(&self) -> &'static str {
        match self {
            CursorDirection::Next => "next",
            CursorDirection::Prev => "prev",
        }
    }
}

impl FromStr for CursorDirection {
    type Err = StoreError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        CursorDirection::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| StoreError::UnknownVariant {
                kind: "cursor direction",
                value: s.to_string(),
            })
    }
}

impl fmt::Display for CursorDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One cursor advance: the first entry strictly after `after` in
/// `direction`, once `skip` entries have been passed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorStep<'k> {
    pub direction: CursorDirection,
    pub after: Option<&'k Key>,
    pub skip: usize,
}

/// Opens databases.
#[allow(async_fn_in_trait)]
pub trait Backend {
    type Connection: Connection;

    /// Open `name` at `version`, running `upgrade` first if the stored
    /// version is older. Opening at a lower version than stored fails.
    async fn open(&self, name: &str, version: u32, upgrade: UpgradeFn) -> Result<Self::Connection>;

    async fn delete_database(&self, name: &str) -> Result<()>;
}

/// An open database connection. Every call is its own transaction.
#[allow(async_fn_in_trait)]
pub trait Connection {
    fn version(&self) -> u32;

    fn store_names(&self) -> Vec<String>;

    /// Insert or replace. Stores with a key path take the key from the
    /// record (generating one when auto-incrementing) and reject `key`.
    async fn put(&self, store: &str, value: Value, key: Option<&Key>) -> Result<Key>;

    /// Insert, failing with a constraint error if the key exists.
    async fn add(&self, store: &str, value: Value, key: Option<&Key>) -> Result<Key>;

    async fn get(&self, store: &str, key: &Key) -> Result<Option<Value>>;

    /// Delete a key. Deleting a missing key is not an error.
    async fn delete(&self, store: &str, key: &Key) -> Result<()>;

    /// Delete several keys in one read-write transaction.
    async fn delete_batch(&self, store: &str, keys: &[Key]) -> Result<()>;

    async fn count(&self, store: &str) -> Result<usize>;

    async fn clear(&self, store: &str) -> Result<()>;

    /// Advance a cursor by one entry. `None` once the store is exhausted.
    async fn cursor_step(&self, store: &str, step: CursorStep<'_>) -> Result<Option<(Key, Value)>>;

    fn close(&self);
}
