//! Per-event listener registries.
//!
//! Every observable type owns one [`Listeners`] per event kind. Callbacks
//! are identified by their `Rc` allocation: registering the same `Rc` twice
//! is a no-op, and removal matches by `Rc::ptr_eq`.
//!
//! Fan-out safety: callers iterate over [`Listeners::snapshot`], never over
//! the live set, so a callback may register or deregister listeners (or
//! re-trigger the same event) without invalidating the iteration in
//! progress.

use std::cell::RefCell;
use std::rc::Rc;

struct Entry<F: ?Sized> {
    callback: Rc<F>,
    once: bool,
}

/// A set of callbacks for a single event kind.
pub(crate) struct Listeners<F: ?Sized> {
    entries: RefCell<Vec<Entry<F>>>,
}

impl<F: ?Sized> Listeners<F> {
    pub(crate) fn new() -> Self {
        Self {
            entries: RefCell::new(Vec::new()),
        }
    }

    /// Register a callback. Duplicate registration of the same `Rc` is a
    /// no-op, regardless of the `once` flag it was first registered with.
    pub(crate) fn add(&self, callback: Rc<F>, once: bool) {
        let mut entries = self.entries.borrow_mut();
        if entries.iter().any(|e| Rc::ptr_eq(&e.callback, &callback)) {
            return;
        }
        entries.push(Entry { callback, once });
    }

    /// Remove a callback by identity. Returns whether anything was removed;
    /// removing an unregistered callback is a silent no-op.
    pub(crate) fn remove(&self, callback: &Rc<F>) -> bool {
        let mut entries = self.entries.borrow_mut();
        let before = entries.len();
        entries.retain(|e| !Rc::ptr_eq(&e.callback, callback));
        entries.len() != before
    }

    pub(crate) fn clear(&self) {
        self.entries.borrow_mut().clear();
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// The callbacks to invoke for one fan-out.
    ///
    /// `once` entries leave the live set here, before invocation, so a
    /// re-entrant trigger from inside the callback cannot fire them a
    /// second time.
    pub(crate) fn snapshot(&self) -> Vec<Rc<F>> {
        let mut entries = self.entries.borrow_mut();
        let snapshot = entries.iter().map(|e| Rc::clone(&e.callback)).collect();
        entries.retain(|e| !e.once);
        snapshot
    }
}

impl<F: ?Sized> Default for Listeners<F> {
    fn default() -> Self {
        Self::new()
    }
}
