//! Watch helper: one callback across many observables.
//!
//! [`watch`] attaches a single callback to every mutation event of every
//! item handed to it and returns one detach closure that removes exactly
//! those registrations. Pure composition over the per-type event APIs; no
//! state beyond the closures.

use std::hash::Hash;
use std::rc::Rc;

use indexmap::{IndexMap, IndexSet};

use crate::array::{ArrayListener, ObservableArray};
use crate::map::{MapEntryListener, MapUpdateListener, ObservableMap};
use crate::set::{ObservableSet, SetElementListener};
use crate::variable::{ObservableVariable, SetListener};

/// An observable that [`watch`] can hook into.
///
/// `attach` registers `callback` on every mutation event the type fires
/// (`set`, plus `add`/`remove`/`update` where they exist) and returns a
/// closure that detaches exactly those registrations.
pub trait Watchable {
    fn attach(&self, callback: Rc<dyn Fn()>) -> Box<dyn FnOnce()>;
}

/// Observe one or more observables with a single callback, fired on any
/// mutation event of any item. Returns the detach function.
pub fn watch(
    items: impl IntoIterator<Item = Box<dyn Watchable>>,
    callback: impl Fn() + 'static,
) -> impl FnOnce() {
    let callback: Rc<dyn Fn()> = Rc::new(callback);
    let detachers: Vec<Box<dyn FnOnce()>> = items
        .into_iter()
        .map(|item| item.attach(Rc::clone(&callback)))
        .collect();
    move || {
        for detach in detachers {
            detach();
        }
    }
}

impl<T: Clone + PartialEq + 'static> Watchable for ObservableVariable<T> {
    fn attach(&self, callback: Rc<dyn Fn()>) -> Box<dyn FnOnce()> {
        let on_set: SetListener<T> = Rc::new(move |_, _| callback());
        self.on_set(Rc::clone(&on_set));

        let this = self.clone();
        Box::new(move || {
            this.off_set(&on_set);
        })
    }
}

impl<T: Clone + PartialEq + 'static> Watchable for ObservableArray<T> {
    fn attach(&self, callback: Rc<dyn Fn()>) -> Box<dyn FnOnce()> {
        let on_set: SetListener<Vec<T>> = {
            let callback = Rc::clone(&callback);
            Rc::new(move |_, _| callback())
        };
        let on_add: ArrayListener<T> = {
            let callback = Rc::clone(&callback);
            Rc::new(move |_, _| callback())
        };
        let on_remove: ArrayListener<T> = Rc::new(move |_, _| callback());

        self.on_set(Rc::clone(&on_set));
        self.on_add(Rc::clone(&on_add));
        self.on_remove(Rc::clone(&on_remove));

        let this = self.clone();
        Box::new(move || {
            this.off_set(&on_set);
            this.off_add(&on_add);
            this.off_remove(&on_remove);
        })
    }
}

impl<K, V> Watchable for ObservableMap<K, V>
where
    K: Clone + Hash + Eq + 'static,
    V: Clone + PartialEq + 'static,
{
    fn attach(&self, callback: Rc<dyn Fn()>) -> Box<dyn FnOnce()> {
        let on_set: SetListener<IndexMap<K, V>> = {
            let callback = Rc::clone(&callback);
            Rc::new(move |_, _| callback())
        };
        let on_add: MapEntryListener<K, V> = {
            let callback = Rc::clone(&callback);
            Rc::new(move |_, _, _| callback())
        };
        let on_remove: MapEntryListener<K, V> = {
            let callback = Rc::clone(&callback);
            Rc::new(move |_, _, _| callback())
        };
        let on_update: MapUpdateListener<K, V> = Rc::new(move |_, _, _, _| callback());

        self.on_set(Rc::clone(&on_set));
        self.on_add(Rc::clone(&on_add));
        self.on_remove(Rc::clone(&on_remove));
        self.on_update(Rc::clone(&on_update));

        let this = self.clone();
        Box::new(move || {
            this.off_set(&on_set);
            this.off_add(&on_add);
            this.off_remove(&on_remove);
            this.off_update(&on_update);
        })
    }
}

impl<T: Clone + Hash + Eq + 'static> Watchable for ObservableSet<T> {
    fn attach(&self, callback: Rc<dyn Fn()>) -> Box<dyn FnOnce()> {
        let on_set: SetListener<IndexSet<T>> = {
            let callback = Rc::clone(&callback);
            Rc::new(move |_, _| callback())
        };
        let on_add: SetElementListener<T> = {
            let callback = Rc::clone(&callback);
            Rc::new(move |_, _| callback())
        };
        let on_remove: SetElementListener<T> = Rc::new(move |_, _| callback());

        self.on_set(Rc::clone(&on_set));
        self.on_add(Rc::clone(&on_add));
        self.on_remove(Rc::clone(&on_remove));

        let this = self.clone();
        Box::new(move || {
            this.off_set(&on_set);
            this.off_add(&on_add);
            this.off_remove(&on_remove);
        })
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
    fn fires_on_every_mutation_kind() {
        let variable = ObservableVariable::new(0);
        let array = ObservableArray::new(vec![1]);
        let map: ObservableMap<&str, i32> = ObservableMap::default();
        let set: ObservableSet<i32> = ObservableSet::default();

        let count = Rc::new(Cell::new(0u32));
        let count_clone = Rc::clone(&count);
        let _off = watch(
            vec![
                Box::new(variable.clone()) as Box<dyn Watchable>,
                Box::new(array.clone()),
                Box::new(map.clone()),
                Box::new(set.clone()),
            ],
            move || count_clone.set(count_clone.get() + 1),
        );

        variable.set(1); // set
        array.push(2); // add
        array.pop(); // remove
        map.set("a", 1); // add
        map.set("a", 2); // update
        map.delete(&"a"); // remove
        set.add(1); // add
        set.delete(&1); // remove

        assert_eq!(count.get(), 8);
    }

    #[test]
    fn detach_removes_every_registration() {
        let variable = ObservableVariable::new(0);
        let array = ObservableArray::new(Vec::new());

        let count = Rc::new(Cell::new(0u32));
        let count_clone = Rc::clone(&count);
        let off = watch(
            vec![
                Box::new(variable.clone()) as Box<dyn Watchable>,
                Box::new(array.clone()),
            ],
            move || count_clone.set(count_clone.get() + 1),
        );

        variable.set(1);
        array.push(1);
        assert_eq!(count.get(), 2);

        off();

        variable.set(2);
        array.push(2);
        array.set(vec![9]);
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn detach_leaves_other_listeners_alone() {
        let variable = ObservableVariable::new(0);
        let kept = Rc::new(Cell::new(0u32));
        let kept_clone = Rc::clone(&kept);
        variable.on_set(Rc::new(move |_, _| kept_clone.set(kept_clone.get() + 1)));

        let off = watch(
            vec![Box::new(variable.clone()) as Box<dyn Watchable>],
            || {},
        );
        off();

        variable.set(1);
        assert_eq!(kept.get(), 1);
    }
}
