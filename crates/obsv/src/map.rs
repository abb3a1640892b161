//! Observable keyed mapping backed by `indexmap::IndexMap`.
//!
//! `IndexMap` preserves insertion order, so iteration and per-entry drains
//! (`clear` with listeners) observe entries in the order they were first
//! inserted, matching the backing-container contract.
//!
//! Events beyond the base `set`/`beforeSet`:
//!
//! - `add` `(value, key, map)` — fired only when the key is newly
//!   introduced, not on update of an existing key.
//! - `remove` `(value, key, map)` — fired once per entry that leaves the
//!   mapping.
//! - `update` `(new, old, key, map)` — fired when `set` stores a different
//!   value under an existing key.

use std::hash::Hash;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::registry::Listeners;
use crate::variable::{BeforeSet, SetListener, VariableCore};

/// Listener for map `add`/`remove` events: `(value, key, map)`.
pub type MapEntryListener<K, V> = Rc<dyn Fn(&V, &K, &ObservableMap<K, V>)>;

/// Listener for the map `update` event: `(new_value, old_value, key, map)`.
pub type MapUpdateListener<K, V> = Rc<dyn Fn(&V, &V, &K, &ObservableMap<K, V>)>;

struct MapInner<K, V> {
    core: VariableCore<IndexMap<K, V>>,
    on_add: Listeners<dyn Fn(&V, &K, &ObservableMap<K, V>)>,
    on_remove: Listeners<dyn Fn(&V, &K, &ObservableMap<K, V>)>,
    on_update: Listeners<dyn Fn(&V, &V, &K, &ObservableMap<K, V>)>,
}

/// An observable, insertion-ordered keyed mapping. Clones share the same
/// backing store and listeners.
pub struct ObservableMap<K, V> {
    inner: Rc<MapInner<K, V>>,
}

impl<K, V> Clone for ObservableMap<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<K, V> std::fmt::Debug for ObservableMap<K, V>
where
    K: std::fmt::Debug + Clone + Hash + Eq + 'static,
    V: std::fmt::Debug + Clone + PartialEq + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservableMap")
            .field("value", &*self.inner.core.value())
            .field("add_listeners", &self.inner.on_add.len())
            .field("remove_listeners", &self.inner.on_remove.len())
            .finish()
    }
}

impl<K, V> ObservableMap<K, V>
where
    K: Clone + Hash + Eq + 'static,
    V: Clone + PartialEq + 'static,
{
    #[must_use]
    pub fn new(value: IndexMap<K, V>) -> Self {
        Self {
            inner: Rc::new(MapInner {
                core: VariableCore::new(value),
                on_add: Listeners::new(),
                on_remove: Listeners::new(),
                on_update: Listeners::new(),
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
    pub fn get(&self) -> IndexMap<K, V> {
        self.inner.core.get()
    }

    pub fn with<R>(&self, f: impl FnOnce(&IndexMap<K, V>) -> R) -> R {
        f(&self.inner.core.value())
    }

    /// Replace the whole backing mapping, firing the `set` event.
    pub fn set_value(&self, value: IndexMap<K, V>) {
        self.inner.core.store(value);
    }

    // --- event binding ------------------------------------------------------

    pub fn on_set(&self, callback: SetListener<IndexMap<K, V>>) {
        self.inner.core.on_set(callback, false);
    }

    pub fn once_set(&self, callback: SetListener<IndexMap<K, V>>) {
        self.inner.core.on_set(callback, true);
    }

    pub fn off_set(&self, callback: &SetListener<IndexMap<K, V>>) -> bool {
        self.inner.core.off_set(callback)
    }

    pub fn off_set_all(&self) {
        self.inner.core.off_set_all();
    }

    pub fn before_set(&self, transform: BeforeSet<IndexMap<K, V>>) {
        self.inner.core.before_set(transform);
    }

    pub fn clear_before_set(&self) {
        self.inner.core.clear_before_set();
    }

    /// Register an `add` listener, fired only when a key is newly
    /// introduced.
    pub fn on_add(&self, callback: MapEntryListener<K, V>) {
        self.inner.on_add.add(callback, false);
    }

    pub fn once_add(&self, callback: MapEntryListener<K, V>) {
        self.inner.on_add.add(callback, true);
    }

    pub fn off_add(&self, callback: &MapEntryListener<K, V>) -> bool {
        self.inner.on_add.remove(callback)
    }

    pub fn off_add_all(&self) {
        self.inner.on_add.clear();
    }

    pub fn on_remove(&self, callback: MapEntryListener<K, V>) {
        self.inner.on_remove.add(callback, false);
    }

    pub fn once_remove(&self, callback: MapEntryListener<K, V>) {
        self.inner.on_remove.add(callback, true);
    }

    pub fn off_remove(&self, callback: &MapEntryListener<K, V>) -> bool {
        self.inner.on_remove.remove(callback)
    }

    pub fn off_remove_all(&self) {
        self.inner.on_remove.clear();
    }

    /// Register an `update` listener, fired when `set` stores a different
    /// value under an existing key.
    pub fn on_update(&self, callback: MapUpdateListener<K, V>) {
        self.inner.on_update.add(callback, false);
    }

    pub fn once_update(&self, callback: MapUpdateListener<K, V>) {
        self.inner.on_update.add(callback, true);
    }

    pub fn off_update(&self, callback: &MapUpdateListener<K, V>) -> bool {
        self.inner.on_update.remove(callback)
    }

    pub fn off_update_all(&self) {
        self.inner.on_update.clear();
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

    /// Clone of the value stored under `key`.
    #[must_use]
    pub fn get_key(&self, key: &K) -> Option<V> {
        self.inner.core.value().get(key).cloned()
    }

    #[must_use]
    pub fn has(&self, key: &K) -> bool {
        self.inner.core.value().contains_key(key)
    }

    /// Snapshot iterator over `(key, value)` entries in insertion order.
    pub fn entries(&self) -> std::vec::IntoIter<(K, V)> {
        self.with(|backing| {
            backing
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect::<Vec<_>>()
        })
        .into_iter()
    }

    /// Snapshot iterator over keys in insertion order.
    pub fn keys(&self) -> std::vec::IntoIter<K> {
        self.with(|backing| backing.keys().cloned().collect::<Vec<_>>())
            .into_iter()
    }

    /// Snapshot iterator over values in insertion order.
    pub fn values(&self) -> std::vec::IntoIter<V> {
        self.with(|backing| backing.values().cloned().collect::<Vec<_>>())
            .into_iter()
    }

    // --- mutations ----------------------------------------------------------

    /// Store `value` under `key`, returning `&self` for chaining.
    ///
    /// Fires `add` when the key is newly introduced and `update` when an
    /// existing key's value actually changes; the store itself is
    /// unconditional.
    pub fn set(&self, key: K, value: V) -> &Self {
        if self.inner.on_add.is_empty() && self.inner.on_update.is_empty() {
            self.inner.core.value_mut().insert(key, value);
            return self;
        }

        let previous = {
            let mut backing = self.inner.core.value_mut();
            backing.insert(key.clone(), value.clone())
        };
        match previous {
            None => self.emit_add(&value, &key),
            Some(old) => {
                if old != value {
                    self.emit_update(&value, &old, &key);
                }
            }
        }
        self
    }

    /// Remove the entry under `key`, firing `remove`. Returns false when
    /// the key was absent. Insertion order of the remaining entries is
    /// preserved.
    pub fn delete(&self, key: &K) -> bool {
        let removed = self.inner.core.value_mut().shift_remove(key);
        match removed {
            Some(value) => {
                self.emit_remove(&value, key);
                true
            }
            None => false,
        }
    }

    /// Remove every entry. With `remove` listeners registered, entries
    /// drain one at a time in insertion order, firing `remove` for each;
    /// without listeners this is a single bulk clear.
    pub fn clear(&self) {
        if self.inner.on_remove.is_empty() {
            self.inner.core.value_mut().clear();
            return;
        }
        loop {
            let entry = self.inner.core.value_mut().shift_remove_index(0);
            match entry {
                Some((key, value)) => self.emit_remove(&value, &key),
                None => break,
            }
        }
    }

    // --- fan-out ------------------------------------------------------------

    fn emit_add(&self, value: &V, key: &K) {
        if self.inner.on_add.is_empty() {
            return;
        }
        for callback in self.inner.on_add.snapshot() {
            callback(value, key, self);
        }
    }

    fn emit_remove(&self, value: &V, key: &K) {
        if self.inner.on_remove.is_empty() {
            return;
        }
        for callback in self.inner.on_remove.snapshot() {
            callback(value, key, self);
        }
    }

    fn emit_update(&self, new: &V, old: &V, key: &K) {
        if self.inner.on_update.is_empty() {
            return;
        }
        for callback in self.inner.on_update.snapshot() {
            callback(new, old, key, self);
        }
    }
}

impl<K, V> From<IndexMap<K, V>> for ObservableMap<K, V>
where
    K: Clone + Hash + Eq + 'static,
    V: Clone + PartialEq + 'static,
{
    fn from(value: IndexMap<K, V>) -> Self {
        Self::new(value)
    }
}

/// Entry-list construction; a duplicated key keeps only its last value.
impl<K, V> From<Vec<(K, V)>> for ObservableMap<K, V>
where
    K: Clone + Hash + Eq + 'static,
    V: Clone + PartialEq + 'static,
{
    fn from(entries: Vec<(K, V)>) -> Self {
        Self::new(entries.into_iter().collect())
    }
}

impl<K, V> Default for ObservableMap<K, V>
where
    K: Clone + Hash + Eq + 'static,
    V: Clone + PartialEq + 'static,
{
    fn default() -> Self {
        Self::new(IndexMap::new())
    }
}

/// Default iteration: a snapshot of the `(key, value)` entries in
/// insertion order, so the map may be mutated while the loop runs.
impl<K, V> IntoIterator for &ObservableMap<K, V>
where
    K: Clone + Hash + Eq + 'static,
    V: Clone + PartialEq + 'static,
{
    type Item = (K, V);
    type IntoIter = std::vec::IntoIter<(K, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries()
    }
}

#[cfg(feature = "serde")]
impl<K, V> serde::Serialize for ObservableMap<K, V>
where
    K: serde::Serialize + Clone + Hash + Eq + 'static,
    V: serde::Serialize + Clone + PartialEq + 'static,
{
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.serializable() {
            // Array-of-entries form, mirroring `[...map.entries()]`.
            self.with(|backing| serializer.collect_seq(backing.iter()))
        } else {
            serializer.serialize_none()
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
