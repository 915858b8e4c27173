//! Mutation notifications
//!
//! `EventEmitter<T>` is a typed listener registry. Emission runs against a
//! snapshot of the listeners taken under the lock, so a listener may call
//! `on`/`off` while being notified. The lock is never held during callbacks.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

/// Identifier returned by [`EventEmitter::on`].
pub type ListenerId = u64;

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Typed synchronous event emitter.
pub struct EventEmitter<T> {
    listeners: Mutex<Vec<(ListenerId, Listener<T>)>>,
    next_id: AtomicU64,
}

impl<T> EventEmitter<T> {
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a listener.
    pub fn on(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> ListenerId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock().push((id, Arc::new(callback)));
        id
    }

    /// Remove a listener. Unknown ids are ignored.
    pub fn off(&self, id: ListenerId) {
        self.listeners.lock().retain(|(lid, _)| *lid != id);
    }

    /// Notify every listener registered at the time of the call.
    pub fn emit(&self, event: &T) {
        let snapshot: Vec<Listener<T>> = {
            let guard = self.listeners.lock();
            guard.iter().map(|(_, cb)| Arc::clone(cb)).collect()
        };
        for cb in snapshot {
            cb(event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for EventEmitter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for EventEmitter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("listeners", &self.len())
            .finish()
    }
}

/// Notification emitted by store managers after a successful mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent<K> {
    /// An element was added. Re-adding a set member that is already
    /// present still fires this.
    Add {
        element: Value,
        key: Option<K>,
        position: Option<usize>,
    },
    /// A single key was deleted.
    Delete {
        key: K,
        /// Records removed by this call, always 1. Not the size of the store
        /// afterwards.
        total: usize,
        reason: Option<String>,
    },
    /// One or more keys of a batch were deleted. Fired once per batch.
    DeleteMany {
        keys: Vec<K>,
        /// `keys.len()`
        total: usize,
        reason: Option<String>,
    },
    /// Some keys of a batch did not exist. Fired once per batch.
    DeleteNotFound {
        keys: Vec<K>,
        /// `keys.len()`
        total: usize,
    },
}

impl<K> StoreEvent<K> {
    /// Event name as seen by listeners keyed on strings.
    pub fn name(&self) -> &'static str {
        match self {
            StoreEvent::Add { .. } => "add",
            StoreEvent::Delete { .. } => "delete",
            StoreEvent::DeleteMany { .. } => "deletemany",
            StoreEvent::DeleteNotFound { .. } => "deletenotfound",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_emit_reaches_all_listeners() {
        let emitter: EventEmitter<u32> = EventEmitter::new();
        let sum = Arc::new(AtomicUsize::new(0));

        let s1 = sum.clone();
        emitter.on(move |v| {
            s1.fetch_add(*v as usize, Ordering::SeqCst);
        });
        let s2 = sum.clone();
        emitter.on(move |v| {
            s2.fetch_add(*v as usize * 10, Ordering::SeqCst);
        });

        emitter.emit(&2);
        assert_eq!(sum.load(Ordering::SeqCst), 22);
    }

    #[test]
    fn test_off_removes_listener() {
        let emitter: EventEmitter<()> = EventEmitter::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let id = emitter.on(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        emitter.emit(&());
        emitter.off(id);
        emitter.off(id);
        emitter.emit(&());

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(emitter.is_empty());
    }

    #[test]
    fn test_listener_can_unsubscribe_during_emit() {
        let emitter: Arc<EventEmitter<()>> = Arc::new(EventEmitter::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let inner = emitter.clone();
        let c = calls.clone();
        let id = Arc::new(AtomicU64::new(0));
        let id_for_cb = id.clone();
        let registered = emitter.on(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
            inner.off(id_for_cb.load(Ordering::SeqCst));
        });
        id.store(registered, Ordering::SeqCst);

        emitter.emit(&());
        emitter.emit(&());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_event_names() {
        let event: StoreEvent<usize> = StoreEvent::DeleteNotFound {
            keys: vec![3],
            total: 1,
        };
        assert_eq!(event.name(), "deletenotfound");
    }
}
