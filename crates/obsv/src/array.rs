//! Observable sequence backed by `Vec<T>`.
//!
//! Beyond the base `set`/`beforeSet` events, an array fires `add` and
//! `remove` events carrying the affected element and a back-reference to
//! the array handle.
//!
//! Every mutating method follows the fast/slow path rule: with no listener
//! registered for the relevant element event, the mutation is a single bulk
//! operation on the backing `Vec`; with listeners present, the mutation
//! proceeds element-by-element so each addition or removal fires its own
//! event. Both paths leave the backing store in the same final state.

use std::cmp::Ordering;
use std::rc::Rc;

use crate::registry::Listeners;
use crate::variable::{BeforeSet, SetListener, VariableCore};

/// Listener for array `add`/`remove` events: `(element, array)`.
pub type ArrayListener<T> = Rc<dyn Fn(&T, &ObservableArray<T>)>;

struct ArrayInner<T> {
    core: VariableCore<Vec<T>>,
    on_add: Listeners<dyn Fn(&T, &ObservableArray<T>)>,
    on_remove: Listeners<dyn Fn(&T, &ObservableArray<T>)>,
}

/// An observable, ordered sequence. Clones share the same backing store
/// and listeners.
pub struct ObservableArray<T> {
    inner: Rc<ArrayInner<T>>,
}

impl<T> Clone for ObservableArray<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: std::fmt::Debug + Clone + PartialEq + 'static> std::fmt::Debug for ObservableArray<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservableArray")
            .field("value", &*self.inner.core.value())
            .field("add_listeners", &self.inner.on_add.len())
            .field("remove_listeners", &self.inner.on_remove.len())
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> ObservableArray<T> {
    #[must_use]
    pub fn new(value: Vec<T>) -> Self {
        Self {
            inner: Rc::new(ArrayInner {
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

    /// Clone of the whole backing sequence.
    #[must_use]
    pub fn get(&self) -> Vec<T> {
        self.inner.core.get()
    }

    /// Access the backing sequence by reference without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&Vec<T>) -> R) -> R {
        f(&self.inner.core.value())
    }

    /// Replace the whole backing sequence, firing the `set` event.
    pub fn set(&self, value: Vec<T>) {
        self.inner.core.store(value);
    }

    // --- event binding ------------------------------------------------------

    pub fn on_set(&self, callback: SetListener<Vec<T>>) {
        self.inner.core.on_set(callback, false);
    }

    pub fn once_set(&self, callback: SetListener<Vec<T>>) {
        self.inner.core.on_set(callback, true);
    }

    pub fn off_set(&self, callback: &SetListener<Vec<T>>) -> bool {
        self.inner.core.off_set(callback)
    }

    pub fn off_set_all(&self) {
        self.inner.core.off_set_all();
    }

    pub fn before_set(&self, transform: BeforeSet<Vec<T>>) {
        self.inner.core.before_set(transform);
    }

    pub fn clear_before_set(&self) {
        self.inner.core.clear_before_set();
    }

    /// Register an `add` listener, fired once per element that enters the
    /// sequence.
    pub fn on_add(&self, callback: ArrayListener<T>) {
        self.inner.on_add.add(callback, false);
    }

    pub fn once_add(&self, callback: ArrayListener<T>) {
        self.inner.on_add.add(callback, true);
    }

    pub fn off_add(&self, callback: &ArrayListener<T>) -> bool {
        self.inner.on_add.remove(callback)
    }

    pub fn off_add_all(&self) {
        self.inner.on_add.clear();
    }

    /// Register a `remove` listener, fired once per element that leaves the
    /// sequence.
    pub fn on_remove(&self, callback: ArrayListener<T>) {
        self.inner.on_remove.add(callback, false);
    }

    pub fn once_remove(&self, callback: ArrayListener<T>) {
        self.inner.on_remove.add(callback, true);
    }

    pub fn off_remove(&self, callback: &ArrayListener<T>) -> bool {
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

    /// Clone of the element at `index`, if in bounds.
    #[must_use]
    pub fn get_index(&self, index: usize) -> Option<T> {
        self.inner.core.value().get(index).cloned()
    }

    #[must_use]
    pub fn has(&self, value: &T) -> bool {
        self.inner.core.value().contains(value)
    }

    /// Snapshot iterator over the elements in index order. Taken at call
    /// time; later mutations do not show through.
    pub fn values(&self) -> std::vec::IntoIter<T> {
        self.get().into_iter()
    }

    /// Snapshot iterator over `(index, element)` pairs in index order.
    pub fn entries(&self) -> std::vec::IntoIter<(usize, T)> {
        self.with(|backing| backing.iter().cloned().enumerate().collect::<Vec<_>>())
            .into_iter()
    }

    /// Iterator over the element indices.
    pub fn keys(&self) -> std::ops::Range<usize> {
        0..self.len()
    }

    // --- mutations ----------------------------------------------------------

    /// Append an element, firing `add`. Returns the new length.
    pub fn push(&self, item: T) -> usize {
        if self.inner.on_add.is_empty() {
            let mut value = self.inner.core.value_mut();
            value.push(item);
            value.len()
        } else {
            let len = {
                let mut value = self.inner.core.value_mut();
                value.push(item.clone());
                value.len()
            };
            self.emit_add(&item);
            len
        }
    }

    /// Remove and return the last element, firing `remove`.
    pub fn pop(&self) -> Option<T> {
        let removed = self.inner.core.value_mut().pop();
        if let Some(item) = &removed {
            self.emit_remove(item);
        }
        removed
    }

    /// Remove and return the first element, firing `remove`.
    pub fn shift(&self) -> Option<T> {
        let removed = {
            let mut value = self.inner.core.value_mut();
            if value.is_empty() {
                None
            } else {
                Some(value.remove(0))
            }
        };
        if let Some(item) = &removed {
            self.emit_remove(item);
        }
        removed
    }

    /// Prepend an element, firing `add`. Returns the new length.
    pub fn unshift(&self, item: T) -> usize {
        if self.inner.on_add.is_empty() {
            let mut value = self.inner.core.value_mut();
            value.insert(0, item);
            value.len()
        } else {
            let len = {
                let mut value = self.inner.core.value_mut();
                value.insert(0, item.clone());
                value.len()
            };
            self.emit_add(&item);
            len
        }
    }

    /// Remove `delete_count` elements starting at `start` and insert
    /// `items` in their place, returning the removed elements in original
    /// order.
    ///
    /// Indices normalize the way a JS `Array.prototype.splice` call does:
    /// negative `start` counts from the end, everything clamps to
    /// `[0, len]`, a negative count deletes nothing, and `None` deletes
    /// through the end. Removals fire `remove` first, in original order,
    /// then insertions fire `add` in item order.
    pub fn splice(&self, start: isize, delete_count: Option<isize>, items: Vec<T>) -> Vec<T> {
        let (start, count) = {
            let value = self.inner.core.value();
            normalize_splice(value.len(), start, delete_count)
        };

        if self.inner.on_add.is_empty() && self.inner.on_remove.is_empty() {
            let mut value = self.inner.core.value_mut();
            return value.splice(start..start + count, items).collect();
        }

        // Listeners may re-entrantly shrink the array mid-flight, so
        // bounds are re-checked against the live length per element.
        let mut removed = Vec::with_capacity(count);
        for _ in 0..count {
            let item = {
                let mut value = self.inner.core.value_mut();
                if start >= value.len() {
                    break;
                }
                value.remove(start)
            };
            self.emit_remove(&item);
            removed.push(item);
        }
        for (offset, item) in items.into_iter().enumerate() {
            {
                let mut value = self.inner.core.value_mut();
                let index = (start + offset).min(value.len());
                value.insert(index, item.clone());
            }
            self.emit_add(&item);
        }
        removed
    }

    /// Remove the first occurrence of `value`, firing `remove`. Returns
    /// false when no element matched.
    pub fn delete(&self, value: &T) -> bool {
        let removed = {
            let mut backing = self.inner.core.value_mut();
            backing
                .iter()
                .position(|item| item == value)
                .map(|index| backing.remove(index))
        };
        match removed {
            Some(item) => {
                self.emit_remove(&item);
                true
            }
            None => false,
        }
    }

    /// Remove every occurrence of `value`, firing `remove` once per
    /// removed element. Returns the number removed (zero when none
    /// matched).
    pub fn delete_all(&self, value: &T) -> usize {
        if self.inner.on_remove.is_empty() {
            let mut backing = self.inner.core.value_mut();
            let before = backing.len();
            backing.retain(|item| item != value);
            before - backing.len()
        } else {
            let mut count = 0;
            while self.delete(value) {
                count += 1;
            }
            count
        }
    }

    // --- in-place reorders: membership unchanged, `set` fires with
    // --- new == old ---------------------------------------------------------

    pub fn sort(&self) -> &Self
    where
        T: Ord,
    {
        self.inner.core.value_mut().sort();
        self.inner.core.emit_in_place();
        self
    }

    pub fn sort_by(&self, compare: impl FnMut(&T, &T) -> Ordering) -> &Self {
        self.inner.core.value_mut().sort_by(compare);
        self.inner.core.emit_in_place();
        self
    }

    pub fn reverse(&self) -> &Self {
        self.inner.core.value_mut().reverse();
        self.inner.core.emit_in_place();
        self
    }

    /// Overwrite the range `[start, end)` with clones of `value`. Bounds
    /// normalize like JS `Array.prototype.fill`.
    pub fn fill(&self, value: T, start: Option<isize>, end: Option<isize>) -> &Self {
        {
            let mut backing = self.inner.core.value_mut();
            let (start, end) = normalize_range(backing.len(), start, end);
            for slot in &mut backing[start..end] {
                *slot = value.clone();
            }
        }
        self.inner.core.emit_in_place();
        self
    }

    /// Copy the range `[start, end)` onto `target`, truncated to fit.
    /// Bounds normalize like JS `Array.prototype.copyWithin`.
    pub fn copy_within(&self, target: isize, start: Option<isize>, end: Option<isize>) -> &Self {
        {
            let mut backing = self.inner.core.value_mut();
            let len = backing.len();
            let target = normalize_index(len, target);
            let (start, end) = normalize_range(len, start, end);
            let count = (end - start).min(len - target);
            let copied: Vec<T> = backing[start..start + count].to_vec();
            backing[target..target + count].clone_from_slice(&copied);
        }
        self.inner.core.emit_in_place();
        self
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

/// Clamp a possibly-negative index into `[0, len]`, counting negative
/// values from the end.
fn normalize_index(len: usize, index: isize) -> usize {
    let len = len as isize;
    if index < 0 {
        (len + index).max(0) as usize
    } else {
        index.min(len) as usize
    }
}

fn normalize_range(len: usize, start: Option<isize>, end: Option<isize>) -> (usize, usize) {
    let start = normalize_index(len, start.unwrap_or(0));
    let end = normalize_index(len, end.unwrap_or(len as isize));
    (start, end.max(start))
}

fn normalize_splice(len: usize, start: isize, delete_count: Option<isize>) -> (usize, usize) {
    let start = normalize_index(len, start);
    let count = match delete_count {
        None => len - start,
        Some(count) => count.clamp(0, (len - start) as isize) as usize,
    };
    (start, count)
}

impl<T: Clone + PartialEq + 'static> From<Vec<T>> for ObservableArray<T> {
    fn from(value: Vec<T>) -> Self {
        Self::new(value)
    }
}

impl<T: Clone + PartialEq + 'static> Default for ObservableArray<T> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<T: Clone + PartialEq + 'static> FromIterator<T> for ObservableArray<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Default iteration: a snapshot of the elements in index order, so the
/// array may be mutated while the loop runs.
impl<T: Clone + PartialEq + 'static> IntoIterator for &ObservableArray<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.values()
    }
}

#[cfg(feature = "serde")]
impl<T> serde::Serialize for ObservableArray<T>
where
    T: serde::Serialize + Clone + PartialEq + 'static,
{
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.serializable() {
            self.with(|items| serializer.collect_seq(items))
        } else {
            serializer.serialize_none()
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
