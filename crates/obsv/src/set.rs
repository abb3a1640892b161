//! Observable unique-element set backed by `indexmap::IndexSet`
//! (insertion-ordered, like the mapping).

use std::hash::Hash;
use std::rc::Rc;

use indexmap::IndexSet;

use crate::registry::Listeners;
use crate::variable::{BeforeSet, SetListener, VariableCore};

/// Listener for set `add`/`remove` events: `(element, set)`.
pub type SetElementListener<T> = Rc<dyn Fn(&T, &ObservableSet<T>)>;

struct SetInner<T> {
    core: VariableCore<IndexSet<T>>,
    on_add: Listeners<dyn Fn(&T, &ObservableSet<T>)>,
    on_remove: Listeners<dyn Fn(&T, &ObservableSet<T>)>,
}

/// An observable set of unique elements. Clones share the same backing
/// store and listeners.
pub struct ObservableSet<T> {
    inner: Rc<SetInner<T>>,
}

impl<T> Clone for ObservableSet<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: std::fmt::Debug + Clone + Hash + Eq + 'static> std::fmt::Debug for ObservableSet<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservableSet")
            .field("value", &*self.inner.core.value())
            .field("add_listeners", &self.inner.on_add.len())
            .field("remove_listeners", &self.inner.on_remove.len())
            .finish()
    }
}

impl<T: Clone + Hash + Eq + 'static> ObservableSet<T> {
    #[must_use]
    pub fn new(value: IndexSet<T>) -> Self {
        Self {
            inner: Rc::new(SetInner {
                core: VariableCore::new(value),
                on_add: Listeners::new(),
                on_remove: Listeners::new(),
            }),
        }
    }

    /// Identity-preserving construction; see
    /// [`ObservableVariable::wrap`](crate::ObservableVariable::wrap).
    #[must_use]
    pub fn wrap(value: impl Into<Self>) -> Self {
        value.into()
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // --- whole-value access -------------------------------------------------

    #[must_use]
    pub fn get(&self) -> IndexSet<T> {
        self.inner.core.get()
    }

    pub fn with<R>(&self, f: impl FnOnce(&IndexSet<T>) -> R) -> R {
        f(&self.inner.core.value())
    }

    /// Replace the whole backing set, firing the `set` event.
    pub fn set_value(&self, value: IndexSet<T>) {
        self.inner.core.store(value);
    }

    // --- event binding ------------------------------------------------------

    pub fn on_set(&self, callback: SetListener<IndexSet<T>>) {
        self.inner.core.on_set(callback, false);
    }

    pub fn once_set(&self, callback: SetListener<IndexSet<T>>) {
        self.inner.core.on_set(callback, true);
    }

    pub fn off_set(&self, callback: &SetListener<IndexSet<T>>) -> bool {
        self.inner.core.off_set(callback)
    }

    pub fn off_set_all(&self) {
        self.inner.core.off_set_all();
    }

    pub fn before_set(&self, transform: BeforeSet<IndexSet<T>>) {
        self.inner.core.before_set(transform);
    }

    pub fn clear_before_set(&self) {
        self.inner.core.clear_before_set();
    }

    /// Register an `add` listener, fired only when an element is actually
    /// inserted (adding a present element is a no-op).
    pub fn on_add(&self, callback: SetElementListener<T>) {
        self.inner.on_add.add(callback, false);
    }

    pub fn once_add(&self, callback: SetElementListener<T>) {
        self.inner.on_add.add(callback, true);
    }

    pub fn off_add(&self, callback: &SetElementListener<T>) -> bool {
        self.inner.on_add.remove(callback)
    }

    pub fn off_add_all(&self) {
        self.inner.on_add.clear();
    }

    pub fn on_remove(&self, callback: SetElementListener<T>) {
        self.inner.on_remove.add(callback, false);
    }

    pub fn once_remove(&self, callback: SetElementListener<T>) {
        self.inner.on_remove.add(callback, true);
    }

    pub fn off_remove(&self, callback: &SetElementListener<T>) -> bool {
        self.inner.on_remove.remove(callback)
    }

    pub fn off_remove_all(&self) {
        self.inner.on_remove.clear();
    }

    #[must_use]
    pub fn serializable(&self) -> bool {
        self.inner.core.serializable()
    }

    pub fn set_serializable(&self, serializable: bool) {
        self.inner.core.set_serializable(serializable);
    }

    #[must_use]
    pub fn ensure_change(&self) -> bool {
        self.inner.core.ensure_change()
    }

    pub fn set_ensure_change(&self, ensure_change: bool) {
        self.inner.core.set_ensure_change(ensure_change);
    }

    // --- reads --------------------------------------------------------------

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.core.value().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.core.value().is_empty()
    }

    #[must_use]
    pub fn has(&self, value: &T) -> bool {
        self.inner.core.value().contains(value)
    }

    /// Snapshot iterator over the elements in insertion order.
    pub fn values(&self) -> std::vec::IntoIter<T> {
        self.with(|backing| backing.iter().cloned().collect::<Vec<_>>())
            .into_iter()
    }

    /// Same as [`values`](Self::values); a set's keys are its elements.
    pub fn keys(&self) -> std::vec::IntoIter<T> {
        self.values()
    }

    /// Snapshot iterator over `(element, element)` pairs in insertion
    /// order, mirroring the keyed collections' entry shape.
    pub fn entries(&self) -> std::vec::IntoIter<(T, T)> {
        self.with(|backing| {
            backing
                .iter()
                .map(|item| (item.clone(), item.clone()))
                .collect::<Vec<_>>()
        })
        .into_iter()
    }

    // --- mutations ----------------------------------------------------------

    /// Insert an element, firing `add` when it was absent. Returns `&self`
    /// for chaining.
    pub fn add(&self, value: T) -> &Self {
        if self.inner.on_add.is_empty() {
            self.inner.core.value_mut().insert(value);
        } else {
            let inserted = self.inner.core.value_mut().insert(value.clone());
            if inserted {
                self.emit_add(&value);
            }
        }
        self
    }

    /// Remove an element, firing `remove`. Returns false when it was
    /// absent. Insertion order of the remaining elements is preserved.
    pub fn delete(&self, value: &T) -> bool {
        let removed = self.inner.core.value_mut().shift_remove_full(value);
        match removed {
            Some((_, item)) => {
                self.emit_remove(&item);
                true
            }
            None => false,
        }
    }

    /// Remove every element. With `remove` listeners registered, elements
    /// drain one at a time in insertion order, firing `remove` for each;
    /// without listeners this is a single bulk clear.
    pub fn clear(&self) {
        if self.inner.on_remove.is_empty() {
            self.inner.core.value_mut().clear();
            return;
        }
        loop {
            let item = self.inner.core.value_mut().shift_remove_index(0);
            match item {
                Some(item) => self.emit_remove(&item),
                None => break,
            }
        }
    }

    // --- fan-out ------------------------------------------------------------

    fn emit_add(&self, item: &T) {
        if self.inner.on_add.is_empty() {
            return;
        }
        for callback in self.inner.on_add.snapshot() {
            callback(item, self);
        }
    }

    fn emit_remove(&self, item: &T) {
        if self.inner.on_remove.is_empty() {
            return;
        }
        for callback in self.inner.on_remove.snapshot() {
            callback(item, self);
        }
    }
}

impl<T: Clone + Hash + Eq + 'static> From<IndexSet<T>> for ObservableSet<T> {
    fn from(value: IndexSet<T>) -> Self {
        Self::new(value)
    }
}

/// Element-list construction; duplicates collapse, keeping first-insert
/// order.
impl<T: Clone + Hash + Eq + 'static> From<Vec<T>> for ObservableSet<T> {
    fn from(elements: Vec<T>) -> Self {
        Self::new(elements.into_iter().collect())
    }
}

impl<T: Clone + Hash + Eq + 'static> Default for ObservableSet<T> {
    fn default() -> Self {
        Self::new(IndexSet::new())
    }
}

/// Default iteration: a snapshot of the elements in insertion order, so
/// the set may be mutated while the loop runs.
impl<T: Clone + Hash + Eq + 'static> IntoIterator for &ObservableSet<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.values()
    }
}

#[cfg(feature = "serde")]
impl<T> serde::Serialize for ObservableSet<T>
where
    T: serde::Serialize + Clone + Hash + Eq + 'static,
{
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.serializable() {
            self.with(|backing| serializer.collect_seq(backing.iter()))
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
    use std::cell::{Cell, RefCell};

    fn recording_remove(obs: &ObservableSet<i32>) -> Rc<RefCell<Vec<i32>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let log_clone = Rc::clone(&log);
        obs.on_remove(Rc::new(move |item, _| log_clone.borrow_mut().push(*item)));
        log
    }

    #[test]
    fn add_fires_only_on_insertion() {
        let obs = ObservableSet::from(vec![1]);
        let log = Rc::new(RefCell::new(Vec::new()));
        let log_clone = Rc::clone(&log);
        obs.on_add(Rc::new(move |item, _| log_clone.borrow_mut().push(*item)));

        obs.add(1).add(2);
        assert_eq!(obs.len(), 2);
        assert_eq!(*log.borrow(), vec![2]);
    }

    #[test]
    fn delete_reports_missing_as_false() {
        let obs = ObservableSet::from(vec![1]);
        let removed = recording_remove(&obs);

        assert!(obs.delete(&1));
        assert!(!obs.delete(&1));
        assert!(!obs.delete(&2));
        assert!(obs.is_empty());
        assert_eq!(*removed.borrow(), vec![1]);
    }

    #[test]
    fn clear_drains_in_insertion_order() {
        let obs = ObservableSet::from(vec![3, 1, 2]);
        let removed = recording_remove(&obs);

        obs.clear();
        assert!(obs.is_empty());
        assert_eq!(*removed.borrow(), vec![3, 1, 2]);
    }

    #[test]
    fn clear_fast_path_matches_slow_path() {
        let quiet = ObservableSet::from(vec![1, 2, 3]);
        quiet.clear();

        let noisy = ObservableSet::from(vec![1, 2, 3]);
        let _removed = recording_remove(&noisy);
        noisy.clear();

        assert!(quiet.is_empty());
        assert_eq!(quiet.get(), noisy.get());
    }

    #[test]
    fn once_add_fires_for_first_insertion_only() {
        let obs: ObservableSet<i32> = ObservableSet::default();
        let count = Rc::new(Cell::new(0u32));
        let count_clone = Rc::clone(&count);
        obs.once_add(Rc::new(move |_, _| count_clone.set(count_clone.get() + 1)));

        obs.add(1).add(2).add(3);
        assert_eq!(count.get(), 1);
        assert_eq!(obs.len(), 3);
    }

    #[test]
    fn off_remove_all_silences_clear() {
        let obs = ObservableSet::from(vec![1, 2]);
        let removed = recording_remove(&obs);

        obs.off_remove_all();
        obs.clear();

        assert!(obs.is_empty());
        assert!(removed.borrow().is_empty());
    }

    #[test]
    fn iteration_surface() {
        let obs = ObservableSet::from(vec![3, 1, 2]);
        assert_eq!(obs.keys().collect::<Vec<_>>(), vec![3, 1, 2]);
        assert_eq!(
            obs.entries().collect::<Vec<_>>(),
            vec![(3, 3), (1, 1), (2, 2)]
        );

        let mut seen = Vec::new();
        for item in &obs {
            obs.delete(&item);
            seen.push(item);
        }
        assert_eq!(seen, vec![3, 1, 2]);
        assert!(obs.is_empty());
    }

    #[test]
    fn duplicates_collapse_on_construction() {
        let obs = ObservableSet::from(vec!["os", "os"]);
        assert_eq!(obs.len(), 1);
        assert_eq!(obs.values().collect::<Vec<_>>(), vec!["os"]);
    }

    #[test]
    fn wrap_existing_handle_is_identity() {
        let obs = ObservableSet::from(vec![1]);
        let rewrapped = ObservableSet::wrap(obs.clone());
        assert!(rewrapped.ptr_eq(&obs));
    }

    #[test]
    fn whole_value_set_fires_set_event() {
        let obs = ObservableSet::from(vec![1]);
        let fired = Rc::new(RefCell::new(0u32));
        let fired_clone = Rc::clone(&fired);
        obs.on_set(Rc::new(move |new, old| {
            assert!(old.contains(&1));
            assert!(new.contains(&2));
            *fired_clone.borrow_mut() += 1;
        }));

        obs.set_value(IndexSet::from([2]));
        assert_eq!(*fired.borrow(), 1);
    }

    #[test]
    fn reads() {
        let obs = ObservableSet::from(vec![5, 6]);
        assert!(obs.has(&5));
        assert!(!obs.has(&7));
        assert_eq!(obs.with(|s| s.len()), 2);
    }
}
