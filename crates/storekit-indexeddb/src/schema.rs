//! Database schema and additive upgrades
//!
//! A schema maps store names to their indexes, in declaration order. The
//! first index of a store names its key path:
//!
//! ```json
//! { "users": { "id": { "autoIncrement": true }, "email": { "unique": true } } }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use storekit::tracing::prefix;
use tracing::debug;

use crate::backend::UpgradeContext;
use crate::error::{IndexedDbError, Result};

/// Options of a single index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IndexOptions {
    pub unique: bool,
    pub auto_increment: bool,
}

impl IndexOptions {
    pub fn unique() -> Self {
        Self {
            unique: true,
            auto_increment: false,
        }
    }

    pub fn auto_increment() -> Self {
        Self {
            unique: false,
            auto_increment: true,
        }
    }
}

/// Indexes of one object store, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreSchema {
    indexes: Vec<(String, IndexOptions)>,
}

impl StoreSchema {
    /// The field records are keyed by (the first declared index).
    pub fn key_path(&self) -> Option<&str> {
        self.indexes.first().map(|(name, _)| name.as_str())
    }

    pub fn auto_increment(&self) -> bool {
        self.indexes
            .first()
            .is_some_and(|(_, opts)| opts.auto_increment)
    }

    pub fn indexes(&self) -> impl Iterator<Item = (&str, &IndexOptions)> {
        self.indexes.iter().map(|(name, opts)| (name.as_str(), opts))
    }

    /// Indexes other than the key path.
    pub fn secondary_indexes(&self) -> impl Iterator<Item = (&str, &IndexOptions)> {
        self.indexes().skip(1)
    }
}

/// Store name → indexes, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatabaseSchema {
    stores: Vec<(String, StoreSchema)>,
}

impl DatabaseSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a store. Declaring an existing store replaces its indexes.
    pub fn store<N, I>(mut self, name: impl Into<String>, indexes: I) -> Self
    where
        N: Into<String>,
        I: IntoIterator<Item = (N, IndexOptions)>,
    {
        let name = name.into();
        let schema = StoreSchema {
            indexes: indexes.into_iter().map(|(n, o)| (n.into(), o)).collect(),
        };
        match self.stores.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = schema,
            None => self.stores.push((name, schema)),
        }
        self
    }

    /// Parse the `{store: {index: {unique, autoIncrement}}}` shape.
    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Result<Self> {
        let stores = value
            .as_object()
            .ok_or_else(|| IndexedDbError::Open("schema must be an object of stores".into()))?;

        let mut schema = DatabaseSchema::new();
        for (store, indexes) in stores {
            let indexes = indexes.as_object().ok_or_else(|| {
                IndexedDbError::Open(format!("indexes of store {} must be an object", store))
            })?;
            let parsed = indexes
                .iter()
                .map(|(name, opts)| {
                    let opts: IndexOptions = serde_json::from_value(opts.clone())?;
                    Ok((name.clone(), opts))
                })
                .collect::<Result<Vec<_>>>()?;
            schema = schema.store(store.clone(), parsed);
        }
        Ok(schema)
    }

    pub fn get(&self, store: &str) -> Option<&StoreSchema> {
        self.stores
            .iter()
            .find(|(name, _)| name == store)
            .map(|(_, schema)| schema)
    }

    pub fn store_names(&self) -> impl Iterator<Item = &str> {
        self.stores.iter().map(|(name, _)| name.as_str())
    }

    /// Bring an upgrading database in line with this schema.
    ///
    /// Missing stores and indexes are created. Nothing is ever dropped or
    /// altered, so records written under an older version survive.
    pub fn apply(&self, ctx: &mut dyn UpgradeContext) -> Result<()> {
        let existing = ctx.store_names();

        for (name, store) in &self.stores {
            if !existing.iter().any(|s| s == name) {
                debug!(
                    "{} creating store {} (key path {:?})",
                    prefix::STORE,
                    name,
                    store.key_path()
                );
                ctx.create_store(name, store.key_path(), store.auto_increment())?;
            }

            let indexes = ctx.index_names(name)?;
            for (index, opts) in store.secondary_indexes() {
                if indexes.iter().any(|i| i == index) {
                    continue;
                }
                debug!("{} creating index {}.{}", prefix::STORE, name, index);
                ctx.create_index(name, index, opts.unique)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_from_json_keeps_declaration_order() {
        let schema = DatabaseSchema::from_json(
            r#"{
                "users": {
                    "id": {"autoIncrement": true},
                    "email": {"unique": true},
                    "age": {}
                },
                "notes": {"slug": {}}
            }"#,
        )
        .unwrap();

        let users = schema.get("users").unwrap();
        assert_eq!(users.key_path(), Some("id"));
        assert!(users.auto_increment());
        assert_eq!(
            users.secondary_indexes().collect::<Vec<_>>(),
            vec![
                ("email", &IndexOptions::unique()),
                ("age", &IndexOptions::default())
            ]
        );
        assert_eq!(schema.store_names().collect::<Vec<_>>(), vec!["users", "notes"]);
        assert!(!schema.get("notes").unwrap().auto_increment());
    }

    #[test]
    fn test_from_json_rejects_bad_shape() {
        assert!(DatabaseSchema::from_json(r#"["users"]"#).is_err());
        assert!(DatabaseSchema::from_json(r#"{"users": {"id": {"unique": "yes"}}}"#).is_err());
    }

    #[test]
    fn test_builder_replaces_store() {
        let schema = DatabaseSchema::new()
            .store("a", [("id", IndexOptions::default())])
            .store("a", [("key", IndexOptions::default())]);
        assert_eq!(schema.get("a").unwrap().key_path(), Some("key"));
        assert_eq!(schema.store_names().count(), 1);
    }
}
