//! Callback handles with stable identity.
//!
//! The scheduler deduplicates callbacks within a flush. Closures cannot be
//! compared, so each callback gets a [`CallbackId`] when it is wrapped and
//! every clone of the handle shares that id.

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for a callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackId(u64);

impl CallbackId {
    /// Generate a new unique callback ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for CallbackId {
    fn default() -> Self {
        Self::new()
    }
}

/// A zero-argument callback queued by the scheduler.
///
/// Cloning is cheap and keeps the identity, so registering the same clone in
/// several places still runs it at most once per flush.
#[derive(Clone)]
pub struct Callback {
    id: CallbackId,
    run: Rc<dyn Fn()>,
}

impl Callback {
    /// Wrap a closure, allocating a fresh identity for it.
    pub fn new<F>(run: F) -> Self
    where
        F: Fn() + 'static,
    {
        Self {
            id: CallbackId::new(),
            run: Rc::new(run),
        }
    }

    /// Get the callback's identity.
    pub fn id(&self) -> CallbackId {
        self.id
    }

    /// Run the callback.
    pub fn invoke(&self) {
        (self.run)();
    }
}

impl PartialEq for Callback {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Callback {}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn callback_ids_are_unique() {
        let a = Callback::new(|| {});
        let b = Callback::new(|| {});

        assert_ne!(a.id(), b.id());
        assert_ne!(a, b);
    }

    #[test]
    fn clones_share_identity() {
        let calls = Rc::new(Cell::new(0));
        let calls_clone = calls.clone();

        let a = Callback::new(move || calls_clone.set(calls_clone.get() + 1));
        let b = a.clone();

        assert_eq!(a, b);
        a.invoke();
        b.invoke();
        assert_eq!(calls.get(), 2);
    }
}
