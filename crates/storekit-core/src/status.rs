//! Generic state holder
//!
//! Components with a small lifecycle state machine hold a `StatusHolder<S>`
//! instead of carrying their own state field and change notifications.

use parking_lot::Mutex;

use crate::events::EventEmitter;

/// A state transition observed by a [`StatusHolder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange<S> {
    pub from: S,
    pub to: S,
}

/// Holds the current member of a state enum and notifies on transitions.
#[derive(Debug)]
pub struct StatusHolder<S: Copy + Eq> {
    current: Mutex<S>,
    changes: EventEmitter<StatusChange<S>>,
}

impl<S: Copy + Eq> StatusHolder<S> {
    pub fn new(initial: S) -> Self {
        Self {
            current: Mutex::new(initial),
            changes: EventEmitter::new(),
        }
    }

    pub fn get(&self) -> S {
        *self.current.lock()
    }

    pub fn is(&self, state: S) -> bool {
        self.get() == state
    }

    /// Move to `state`. Returns `false` (and emits nothing) if already there.
    pub fn set(&self, state: S) -> bool {
        let from = {
            let mut guard = self.current.lock();
            if *guard == state {
                return false;
            }
            std::mem::replace(&mut *guard, state)
        };
        self.changes.emit(&StatusChange { from, to: state });
        true
    }

    pub fn changes(&self) -> &EventEmitter<StatusChange<S>> {
        &self.changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex as PlMutex;
    use std::sync::Arc;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Light {
        Red,
        Green,
    }

    #[test]
    fn test_set_notifies_only_on_change() {
        let holder = StatusHolder::new(Light::Red);
        let seen = Arc::new(PlMutex::new(Vec::new()));
        let s = seen.clone();
        holder.changes().on(move |c: &StatusChange<Light>| s.lock().push(*c));

        assert!(!holder.set(Light::Red));
        assert!(holder.set(Light::Green));
        assert!(holder.is(Light::Green));

        assert_eq!(
            *seen.lock(),
            vec![StatusChange {
                from: Light::Red,
                to: Light::Green
            }]
        );
    }
}
