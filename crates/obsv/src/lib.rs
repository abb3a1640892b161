#![forbid(unsafe_code)]

//! Observable values and collections with synchronous change notification.
//!
//! # Role
//! `obsv` wraps primitive values and the standard container shapes
//! (sequence, keyed mapping, unique set) in observable handles that notify
//! registered listeners on every mutation:
//!
//! - [`ObservableVariable`]: a single value with `set`/`beforeSet` events.
//! - [`ObservableArray`] / [`ObservableMap`] / [`ObservableSet`]:
//!   collection wrappers adding `add`/`remove` (and map `update`) events
//!   per affected element.
//! - [`watch`]: one callback across the mutation events of many
//!   observables, with a single detach function.
//! - [`apply_at`]: replace a nested property of a dynamic object tree with
//!   its observable-wrapped form, in place.
//!
//! # Model
//! Single-threaded and synchronous: handles are cheap `Rc` clones sharing
//! one interior, mutations fan out to listeners before the call returns,
//! and re-entrant mutation from inside a listener is tolerated (fan-out
//! iterates a snapshot of the listener set). There is no queuing, no
//! asynchronous dispatch, and no cross-thread sharing.
//!
//! Wrapping an existing observable handle returns that same instance
//! rather than nesting wrappers:
//!
//! ```
//! use obsv::ObservableVariable;
//!
//! let count = ObservableVariable::new(1);
//! let rewrapped = ObservableVariable::wrap(count.clone());
//! assert!(rewrapped.ptr_eq(&count));
//! ```
//!
//! # Fast and slow paths
//! Every bulk mutation checks whether the relevant element event has any
//! listener. With none, it performs the native bulk operation on the
//! backing container; with listeners, it mutates element-by-element so
//! each addition or removal fires its own event. Both paths end in the
//! same state.

pub mod array;
pub mod map;
pub mod path;
mod registry;
pub mod set;
pub mod variable;
pub mod watch;

pub use array::{ArrayListener, ObservableArray};
pub use map::{MapEntryListener, MapUpdateListener, ObservableMap};
pub use path::{
    DynObject, PathError, PropertyPath, apply_at, apply_at_array, apply_at_map, apply_at_set,
};
pub use set::{ObservableSet, SetElementListener};
pub use variable::{BeforeSet, ObservableVariable, SetListener};
pub use watch::{Watchable, watch};

// Backing container types, re-exported so constructors can be called
// without importing indexmap directly.
pub use indexmap::{IndexMap, IndexSet};
