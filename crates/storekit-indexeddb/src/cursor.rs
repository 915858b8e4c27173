//! Lazy record iteration
//!
//! A [`RecordCursor`] is pull-based: nothing is read until `next()` is
//! awaited, and each call advances the engine cursor by one entry. The
//! offset is applied once, as a skip on the first advance.

use std::mem;
use std::sync::Arc;

use futures::Stream;
use serde_json::Value;
use storekit_core::{Key, StoreResult};

use crate::backend::{Connection, CursorDirection, CursorStep};

/// Options for [`IndexedDatabase::records`](crate::IndexedDatabase::records).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordsQuery {
    pub direction: CursorDirection,
    /// Entries to pass over before the first one is read
    pub offset: usize,
    /// Maximum number of items to yield; `None` is unbounded
    pub limit: Option<usize>,
    /// Yield `(key, record)` pairs instead of bare records
    pub return_pairs: bool,
}

impl RecordsQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn direction(mut self, direction: CursorDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn pairs(mut self) -> Self {
        self.return_pairs = true;
        self
    }
}

/// An item yielded by a [`RecordCursor`].
#[derive(Debug, Clone, PartialEq)]
pub enum CursorItem {
    Record(Value),
    Pair(Key, Value),
}

impl CursorItem {
    pub fn key(&self) -> Option<&Key> {
        match self {
            CursorItem::Record(_) => None,
            CursorItem::Pair(key, _) => Some(key),
        }
    }

    pub fn value(&self) -> &Value {
        match self {
            CursorItem::Record(value) | CursorItem::Pair(_, value) => value,
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            CursorItem::Record(value) | CursorItem::Pair(_, value) => value,
        }
    }

    pub fn into_pair(self) -> Option<(Key, Value)> {
        match self {
            CursorItem::Record(_) => None,
            CursorItem::Pair(key, value) => Some((key, value)),
        }
    }
}

type RecordFilter<'f> = Box<dyn FnMut(&Key, Value) -> Option<Value> + 'f>;

/// Pull-based cursor over one store.
pub struct RecordCursor<'f, C: Connection> {
    connection: Arc<C>,
    store: String,
    query: RecordsQuery,
    filter: Option<RecordFilter<'f>>,
    last_key: Option<Key>,
    pending_skip: usize,
    yielded: usize,
    done: bool,
}

impl<C: Connection> RecordCursor<'static, C> {
    pub(crate) fn new(connection: Arc<C>, store: &str, query: RecordsQuery) -> Self {
        Self {
            connection,
            store: store.to_string(),
            query,
            filter: None,
            last_key: None,
            pending_skip: query.offset,
            yielded: 0,
            done: false,
        }
    }
}

impl<'f, C: Connection> RecordCursor<'f, C> {
    /// Filter and transform records as they are read. Returning `None`
    /// drops the record; dropped records do not count towards the limit.
    pub fn with_filter<'g>(
        self,
        filter: impl FnMut(&Key, Value) -> Option<Value> + 'g,
    ) -> RecordCursor<'g, C> {
        RecordCursor {
            connection: self.connection,
            store: self.store,
            query: self.query,
            filter: Some(Box::new(filter)),
            last_key: self.last_key,
            pending_skip: self.pending_skip,
            yielded: self.yielded,
            done: self.done,
        }
    }

    pub fn yielded(&self) -> usize {
        self.yielded
    }

    /// Advance to the next item. `Ok(None)` once exhausted or the limit is
    /// reached.
    pub async fn next(&mut self) -> StoreResult<Option<CursorItem>> {
        loop {
            if self.done || self.query.limit.is_some_and(|limit| self.yielded >= limit) {
                self.done = true;
                return Ok(None);
            }

            let step = CursorStep {
                direction: self.query.direction,
                after: self.last_key.as_ref(),
                skip: mem::take(&mut self.pending_skip),
            };
            let entry = match self.connection.cursor_step(&self.store, step).await {
                Ok(entry) => entry,
                Err(e) => {
                    self.done = true;
                    return Err(e.into());
                }
            };
            let Some((key, value)) = entry else {
                self.done = true;
                return Ok(None);
            };
            self.last_key = Some(key.clone());

            let value = match self.filter.as_mut() {
                Some(filter) => match filter(&key, value) {
                    Some(value) => value,
                    None => continue,
                },
                None => value,
            };

            self.yielded += 1;
            return Ok(Some(if self.query.return_pairs {
                CursorItem::Pair(key, value)
            } else {
                CursorItem::Record(value)
            }));
        }
    }

    /// Drain the cursor.
    pub async fn collect_all(mut self) -> StoreResult<Vec<CursorItem>> {
        let mut items = Vec::new();
        while let Some(item) = self.next().await? {
            items.push(item);
        }
        Ok(items)
    }

    /// Adapt the cursor into a [`Stream`]. The stream ends after the first
    /// error.
    pub fn into_stream(self) -> impl Stream<Item = StoreResult<CursorItem>> + 'f
    where
        C: 'f,
    {
        futures::stream::unfold(self, |mut cursor| async move {
            match cursor.next().await {
                Ok(Some(item)) => Some((Ok(item), cursor)),
                Ok(None) => None,
                Err(e) => Some((Err(e), cursor)),
            }
        })
    }
}
