//! Observable value wrapper with change notification.
//!
//! # Design
//!
//! [`ObservableVariable<T>`] wraps a single value in shared, reference-counted
//! storage. Cloning a handle shares the value, the listener registries, and
//! the flags; `ObservableVariable::wrap` on an existing handle therefore
//! yields the same instance rather than a nested wrapper.
//!
//! # Invariants
//!
//! 1. Every `set` listener fires exactly once per assignment, with the
//!    post-assignment value and the displaced old value.
//! 2. Assignments fire listeners even when the new value equals the old one,
//!    unless the opt-in `ensure_change` flag is set.
//! 3. The `beforeSet` transform (at most one) runs on every assignment and
//!    decides the stored value; `ensure_change` never suppresses it.
//! 4. Re-entrant assignment from inside a listener is permitted: fan-out
//!    iterates a snapshot of the registry and holds no borrow while
//!    callbacks run.
//!
//! # Failure Modes
//!
//! - **Listener cycle leak**: a listener that captures a clone of its own
//!   observable's handle keeps the shared state alive for as long as it
//!   stays registered. Deregister with `off_set` (or use `once_set`) when
//!   the listener's lifetime should not pin the value.
//! - **Re-entrant `beforeSet`**: assigning from inside the transform itself
//!   panics (the old value is borrowed while the transform runs). Listeners
//!   are the supported re-entrancy point, not the transform.

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::rc::Rc;

use crate::registry::Listeners;

/// Listener for the `set` event: `(new_value, old_value)`.
pub type SetListener<T> = Rc<dyn Fn(&T, &T)>;

/// Transform applied before a value is stored: `(proposed, old) -> stored`.
pub type BeforeSet<T> = Rc<dyn Fn(T, &T) -> T>;

/// Shared interior for [`ObservableVariable<T>`] and the collection
/// wrappers, which embed one of these around their backing container.
pub(crate) struct VariableCore<T> {
    value: RefCell<T>,
    serializable: Cell<bool>,
    ensure_change: Cell<bool>,
    on_set: Listeners<dyn Fn(&T, &T)>,
    before_set: RefCell<Option<BeforeSet<T>>>,
}

impl<T: Clone + PartialEq + 'static> VariableCore<T> {
    pub(crate) fn new(value: T) -> Self {
        Self {
            value: RefCell::new(value),
            serializable: Cell::new(true),
            ensure_change: Cell::new(false),
            on_set: Listeners::new(),
            before_set: RefCell::new(None),
        }
    }

    pub(crate) fn value(&self) -> Ref<'_, T> {
        self.value.borrow()
    }

    pub(crate) fn value_mut(&self) -> RefMut<'_, T> {
        self.value.borrow_mut()
    }

    pub(crate) fn get(&self) -> T {
        self.value.borrow().clone()
    }

    /// The full `set` pipeline: `beforeSet` transform, optional
    /// `ensure_change` gate, then plain store (no listeners) or
    /// capture-store-notify (listeners present).
    pub(crate) fn store(&self, proposed: T) {
        let value = {
            let transform = self.before_set.borrow().clone();
            match transform {
                Some(transform) => {
                    let old = self.value.borrow();
                    transform(proposed, &old)
                }
                None => proposed,
            }
        };

        if self.ensure_change.get() && *self.value.borrow() == value {
            return;
        }

        if self.on_set.is_empty() {
            *self.value.borrow_mut() = value;
            return;
        }

        let old = std::mem::replace(&mut *self.value.borrow_mut(), value);
        let new = self.value.borrow().clone();
        #[cfg(feature = "tracing")]
        tracing::trace!(listeners = self.on_set.len(), "set fan-out");
        for callback in self.on_set.snapshot() {
            callback(&new, &old);
        }
    }

    /// Fire `set` listeners after an in-place mutation that did not change
    /// membership (sort, reverse, fill, copy_within). New and old arguments
    /// are the same post-mutation snapshot.
    pub(crate) fn emit_in_place(&self) {
        if self.on_set.is_empty() {
            return;
        }
        let snapshot = self.value.borrow().clone();
        for callback in self.on_set.snapshot() {
            callback(&snapshot, &snapshot);
        }
    }

    pub(crate) fn on_set(&self, callback: SetListener<T>, once: bool) {
        self.on_set.add(callback, once);
    }

    pub(crate) fn off_set(&self, callback: &SetListener<T>) -> bool {
        self.on_set.remove(callback)
    }

    pub(crate) fn off_set_all(&self) {
        self.on_set.clear();
    }

    pub(crate) fn set_listener_count(&self) -> usize {
        self.on_set.len()
    }

    pub(crate) fn before_set(&self, transform: BeforeSet<T>) {
        *self.before_set.borrow_mut() = Some(transform);
    }

    pub(crate) fn clear_before_set(&self) {
        *self.before_set.borrow_mut() = None;
    }

    pub(crate) fn serializable(&self) -> bool {
        self.serializable.get()
    }

    pub(crate) fn set_serializable(&self, serializable: bool) {
        self.serializable.set(serializable);
    }

    pub(crate) fn ensure_change(&self) -> bool {
        self.ensure_change.get()
    }

    pub(crate) fn set_ensure_change(&self, ensure_change: bool) {
        self.ensure_change.set(ensure_change);
    }
}

/// A single observable value.
///
/// Cloning an `ObservableVariable` creates a new handle to the **same**
/// shared state; both handles see the same value and share listeners.
/// [`ObservableVariable::wrap`] relies on this for double-wrap prevention:
/// wrapping a handle hands the same instance back.
pub struct ObservableVariable<T> {
    core: Rc<VariableCore<T>>,
}

// Manual Clone: shares the same Rc.
impl<T> Clone for ObservableVariable<T> {
    fn clone(&self) -> Self {
        Self {
            core: Rc::clone(&self.core),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for ObservableVariable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservableVariable")
            .field("value", &*self.core.value.borrow())
            .field("set_listeners", &self.core.on_set.len())
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> ObservableVariable<T> {
    /// Create a new observable holding `value`.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            core: Rc::new(VariableCore::new(value)),
        }
    }

    /// Identity-preserving construction.
    ///
    /// `wrap(raw_value)` builds a fresh observable; `wrap(handle)` returns a
    /// handle to the same instance instead of nesting wrappers, so
    /// `wrap(o).ptr_eq(&o)` always holds.
    #[must_use]
    pub fn wrap(value: impl Into<Self>) -> Self {
        value.into()
    }

    /// Whether two handles refer to the same shared instance.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.core, &other.core)
    }

    /// Get a clone of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.core.get()
    }

    /// Access the current value by reference without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.core.value())
    }

    /// Assign a new value.
    ///
    /// The `beforeSet` transform (if any) decides the stored value; every
    /// `set` listener then fires with `(new, old)`. With no listeners this
    /// is a plain store with no old-value capture.
    pub fn set(&self, value: T) {
        self.core.store(value);
    }

    /// Register a `set` listener. Registering the same `Rc` twice is a
    /// no-op.
    pub fn on_set(&self, callback: SetListener<T>) {
        self.core.on_set(callback, false);
    }

    /// Register a `set` listener that deregisters itself before its first
    /// invocation, so it fires at most once even under re-entrant sets.
    pub fn once_set(&self, callback: SetListener<T>) {
        self.core.on_set(callback, true);
    }

    /// Remove one `set` listener by identity. Unknown callbacks are a
    /// silent no-op.
    pub fn off_set(&self, callback: &SetListener<T>) -> bool {
        self.core.off_set(callback)
    }

    /// Remove every `set` listener.
    pub fn off_set_all(&self) {
        self.core.off_set_all();
    }

    /// Number of registered `set` listeners.
    #[must_use]
    pub fn set_listener_count(&self) -> usize {
        self.core.set_listener_count()
    }

    /// Install the `beforeSet` transform, replacing any previous one. The
    /// transform receives `(proposed, old)` and returns the value actually
    /// stored. It runs on every assignment, `ensure_change` notwithstanding.
    pub fn before_set(&self, transform: BeforeSet<T>) {
        self.core.before_set(transform);
    }

    /// Remove the `beforeSet` transform.
    pub fn clear_before_set(&self) {
        self.core.clear_before_set();
    }

    /// Whether this value participates in serialization. Defaults to true.
    #[must_use]
    pub fn serializable(&self) -> bool {
        self.core.serializable()
    }

    pub fn set_serializable(&self, serializable: bool) {
        self.core.set_serializable(serializable);
    }

    /// Opt-in equality gate: when set, assigning a value equal to the
    /// current one skips the store and the `set` fan-out. Defaults to
    /// false — by default listeners fire on every assignment.
    #[must_use]
    pub fn ensure_change(&self) -> bool {
        self.core.ensure_change()
    }

    pub fn set_ensure_change(&self, ensure_change: bool) {
        self.core.set_ensure_change(ensure_change);
    }
}

impl<T: Clone + PartialEq + 'static> From<T> for ObservableVariable<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: Clone + PartialEq + Default + 'static> Default for ObservableVariable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

#[cfg(feature = "serde")]
impl<T> serde::Serialize for ObservableVariable<T>
where
    T: serde::Serialize + Clone + PartialEq + 'static,
{
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.serializable() {
            self.with(|value| value.serialize(serializer))
        } else {
            serializer.serialize_none()
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn get_set_basic() {
        let obs = ObservableVariable::new(42);
        assert_eq!(obs.get(), 42);

        obs.set(99);
        assert_eq!(obs.get(), 99);
    }

    #[test]
    fn with_access() {
        let obs = ObservableVariable::new(vec![1, 2, 3]);
        let sum = obs.with(|v| v.iter().sum::<i32>());
        assert_eq!(sum, 6);
    }

    #[test]
    fn wrap_existing_handle_is_identity() {
        let obs = ObservableVariable::new("a");
        let rewrapped = ObservableVariable::wrap(obs.clone());
        assert!(rewrapped.ptr_eq(&obs));

        rewrapped.set("b");
        assert_eq!(obs.get(), "b");
    }

    #[test]
    fn wrap_raw_value_allocates() {
        let first = ObservableVariable::wrap(1);
        let second = ObservableVariable::wrap(1);
        assert!(!first.ptr_eq(&second));
    }

    #[test]
    fn set_passes_new_and_old() {
        let obs = ObservableVariable::new('a');
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = Rc::clone(&seen);

        obs.on_set(Rc::new(move |new, old| {
            seen_clone.borrow_mut().push((*new, *old));
        }));

        obs.set('b');
        obs.set('c');
        assert_eq!(*seen.borrow(), vec![('b', 'a'), ('c', 'b')]);
    }

    #[test]
    fn every_listener_fires_exactly_once_per_set() {
        let obs = ObservableVariable::new(0);
        let count = Rc::new(Cell::new(0u32));

        for _ in 0..3 {
            let count_clone = Rc::clone(&count);
            obs.on_set(Rc::new(move |_, _| count_clone.set(count_clone.get() + 1)));
        }

        obs.set(1);
        assert_eq!(count.get(), 3);
        obs.set(2);
        assert_eq!(count.get(), 6);
    }

    #[test]
    fn duplicate_registration_is_noop() {
        let obs = ObservableVariable::new(0);
        let count = Rc::new(Cell::new(0u32));
        let count_clone = Rc::clone(&count);
        let callback: SetListener<i32> =
            Rc::new(move |_, _| count_clone.set(count_clone.get() + 1));

        obs.on_set(Rc::clone(&callback));
        obs.on_set(callback);

        obs.set(1);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn set_fires_even_when_value_unchanged() {
        let obs = ObservableVariable::new(7);
        let count = Rc::new(Cell::new(0u32));
        let count_clone = Rc::clone(&count);
        obs.on_set(Rc::new(move |_, _| count_clone.set(count_clone.get() + 1)));

        obs.set(7);
        obs.set(7);
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn ensure_change_suppresses_equal_assignment() {
        let obs = ObservableVariable::new(7);
        obs.set_ensure_change(true);
        let count = Rc::new(Cell::new(0u32));
        let count_clone = Rc::clone(&count);
        obs.on_set(Rc::new(move |_, _| count_clone.set(count_clone.get() + 1)));

        obs.set(7);
        assert_eq!(count.get(), 0);
        obs.set(8);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn once_fires_exactly_once() {
        let obs = ObservableVariable::new(0);
        let count = Rc::new(Cell::new(0u32));
        let count_clone = Rc::clone(&count);
        obs.once_set(Rc::new(move |_, _| count_clone.set(count_clone.get() + 1)));

        obs.set(1);
        obs.set(2);
        obs.set(3);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn once_self_removes_under_reentrant_set() {
        let obs = ObservableVariable::new(0);
        let count = Rc::new(Cell::new(0u32));
        let count_clone = Rc::clone(&count);
        let handle = obs.clone();
        obs.once_set(Rc::new(move |new, _| {
            count_clone.set(count_clone.get() + 1);
            if *new == 1 {
                handle.set(2);
            }
        }));

        obs.set(1);
        assert_eq!(count.get(), 1);
        assert_eq!(obs.get(), 2);
    }

    #[test]
    fn reentrant_set_from_listener_is_tolerated() {
        let obs = ObservableVariable::new(0);
        let handle = obs.clone();
        obs.on_set(Rc::new(move |new, _| {
            if *new < 3 {
                handle.set(new + 1);
            }
        }));

        obs.set(1);
        assert_eq!(obs.get(), 3);
    }

    #[test]
    fn off_specific_then_off_all() {
        let obs = ObservableVariable::new(0);
        let a = Rc::new(Cell::new(0u32));
        let b = Rc::new(Cell::new(0u32));
        let a_clone = Rc::clone(&a);
        let b_clone = Rc::clone(&b);
        let callback_a: SetListener<i32> =
            Rc::new(move |_, _| a_clone.set(a_clone.get() + 1));
        let callback_b: SetListener<i32> =
            Rc::new(move |_, _| b_clone.set(b_clone.get() + 1));

        obs.on_set(Rc::clone(&callback_a));
        obs.on_set(Rc::clone(&callback_b));

        obs.set(1);
        assert!(obs.off_set(&callback_a));
        obs.set(2);
        obs.off_set_all();
        obs.set(3);

        assert_eq!(a.get(), 1);
        assert_eq!(b.get(), 2);
        assert!(!obs.off_set(&callback_b));
    }

    #[test]
    fn before_set_decides_stored_value() {
        let obs = ObservableVariable::new(10);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = Rc::clone(&seen);
        obs.on_set(Rc::new(move |new, old| {
            seen_clone.borrow_mut().push((*new, *old));
        }));
        obs.before_set(Rc::new(|proposed, old| proposed.max(*old)));

        obs.set(5);
        assert_eq!(obs.get(), 10);
        obs.set(20);
        assert_eq!(obs.get(), 20);

        // Listeners observe the transformed value, not the proposed one.
        assert_eq!(*seen.borrow(), vec![(10, 10), (20, 10)]);
    }

    #[test]
    fn before_set_replaces_previous_transform() {
        let obs = ObservableVariable::new(0);
        obs.before_set(Rc::new(|proposed, _| proposed + 1));
        obs.before_set(Rc::new(|proposed, _| proposed * 2));

        obs.set(3);
        assert_eq!(obs.get(), 6);

        obs.clear_before_set();
        obs.set(3);
        assert_eq!(obs.get(), 3);
    }

    #[test]
    fn before_set_runs_even_with_ensure_change() {
        let obs = ObservableVariable::new(0);
        obs.set_ensure_change(true);
        let runs = Rc::new(Cell::new(0u32));
        let runs_clone = Rc::clone(&runs);
        obs.before_set(Rc::new(move |proposed, _| {
            runs_clone.set(runs_clone.get() + 1);
            proposed
        }));

        obs.set(0);
        obs.set(0);
        assert_eq!(runs.get(), 2);
        assert_eq!(obs.get(), 0);
    }

    #[test]
    fn clone_shares_state_and_listeners() {
        let obs1 = ObservableVariable::new(0);
        let obs2 = obs1.clone();
        let count = Rc::new(Cell::new(0u32));
        let count_clone = Rc::clone(&count);
        obs1.on_set(Rc::new(move |_, _| count_clone.set(count_clone.get() + 1)));

        obs2.set(42);
        assert_eq!(obs1.get(), 42);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn serializable_flag_defaults_true() {
        let obs = ObservableVariable::new(0);
        assert!(obs.serializable());
        obs.set_serializable(false);
        assert!(!obs.serializable());
    }

    #[test]
    fn debug_format() {
        let obs = ObservableVariable::new(42);
        let formatted = format!("{obs:?}");
        assert!(formatted.contains("ObservableVariable"));
        assert!(formatted.contains("42"));
    }
}
