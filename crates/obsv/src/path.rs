//! Path-observe helper: wrap a nested property in place.
//!
//! Operates on [`DynObject`], a string-keyed map of type-erased values whose
//! nested objects are themselves `DynObject`s. [`apply_at`] navigates a
//! dotted or segmented path to the penultimate object and replaces the
//! final property with its observable-wrapped form, returning a handle to
//! it. A property that is already wrapped at the requested type is left
//! untouched and its existing handle returned, so repeated application is
//! identity-preserving.
//!
//! Traversal failures surface as [`PathError`]; the tree is left unchanged
//! on error.

use std::any::Any;
use std::collections::HashMap;
use std::hash::Hash;

use indexmap::{IndexMap, IndexSet};
use thiserror::Error;

use crate::array::ObservableArray;
use crate::map::ObservableMap;
use crate::set::ObservableSet;
use crate::variable::ObservableVariable;

/// Dynamically-typed property container navigated by [`apply_at`].
pub type DynObject = HashMap<String, Box<dyn Any>>;

#[derive(Debug, Error)]
pub enum PathError {
    #[error("path segment `{0}` does not exist")]
    MissingSegment(String),
    #[error("path segment `{0}` is not an object")]
    NotAnObject(String),
    #[error("property `{0}` does not have the requested type")]
    TypeMismatch(String),
    #[error("property path is empty")]
    EmptyPath,
}

/// A property path: either dot-delimited (`"a.b.c"`) or an explicit
/// segment sequence (`&["a", "b", "c"]`).
pub enum PropertyPath<'a> {
    Dotted(&'a str),
    Segments(&'a [&'a str]),
}

impl<'a> From<&'a str> for PropertyPath<'a> {
    fn from(path: &'a str) -> Self {
        Self::Dotted(path)
    }
}

impl<'a> From<&'a [&'a str]> for PropertyPath<'a> {
    fn from(segments: &'a [&'a str]) -> Self {
        Self::Segments(segments)
    }
}

impl<'a, const N: usize> From<&'a [&'a str; N]> for PropertyPath<'a> {
    fn from(segments: &'a [&'a str; N]) -> Self {
        Self::Segments(segments)
    }
}

impl PropertyPath<'_> {
    fn segments(&self) -> Vec<&str> {
        match self {
            Self::Dotted(path) => path.split('.').collect(),
            Self::Segments(segments) => segments.to_vec(),
        }
    }
}

/// Replace the property at `path` with an [`ObservableVariable`] wrapping
/// its current value, in place, and return a handle to it.
pub fn apply_at<'a, T>(
    root: &mut DynObject,
    path: impl Into<PropertyPath<'a>>,
) -> Result<ObservableVariable<T>, PathError>
where
    T: Clone + PartialEq + 'static,
{
    let path = path.into();
    let segments = path.segments();
    let (last, parents) = segments.split_last().ok_or(PathError::EmptyPath)?;
    let parent = navigate(root, parents)?;
    wrap_leaf(parent, last, ObservableVariable::new)
}

/// [`apply_at`] for a `Vec<T>` property, wrapping it as an
/// [`ObservableArray`].
pub fn apply_at_array<'a, T>(
    root: &mut DynObject,
    path: impl Into<PropertyPath<'a>>,
) -> Result<ObservableArray<T>, PathError>
where
    T: Clone + PartialEq + 'static,
{
    let path = path.into();
    let segments = path.segments();
    let (last, parents) = segments.split_last().ok_or(PathError::EmptyPath)?;
    let parent = navigate(root, parents)?;
    wrap_leaf(parent, last, ObservableArray::new)
}

/// [`apply_at`] for an `IndexMap<K, V>` property, wrapping it as an
/// [`ObservableMap`].
pub fn apply_at_map<'a, K, V>(
    root: &mut DynObject,
    path: impl Into<PropertyPath<'a>>,
) -> Result<ObservableMap<K, V>, PathError>
where
    K: Clone + Hash + Eq + 'static,
    V: Clone + PartialEq + 'static,
{
    let path = path.into();
    let segments = path.segments();
    let (last, parents) = segments.split_last().ok_or(PathError::EmptyPath)?;
    let parent = navigate(root, parents)?;
    wrap_leaf(parent, last, |raw: IndexMap<K, V>| ObservableMap::new(raw))
}

/// [`apply_at`] for an `IndexSet<T>` property, wrapping it as an
/// [`ObservableSet`].
pub fn apply_at_set<'a, T>(
    root: &mut DynObject,
    path: impl Into<PropertyPath<'a>>,
) -> Result<ObservableSet<T>, PathError>
where
    T: Clone + Hash + Eq + 'static,
{
    let path = path.into();
    let segments = path.segments();
    let (last, parents) = segments.split_last().ok_or(PathError::EmptyPath)?;
    let parent = navigate(root, parents)?;
    wrap_leaf(parent, last, |raw: IndexSet<T>| ObservableSet::new(raw))
}

/// Walk the intermediate segments down to the object owning the final
/// property.
fn navigate<'o>(root: &'o mut DynObject, segments: &[&str]) -> Result<&'o mut DynObject, PathError> {
    let mut current = root;
    for segment in segments {
        let child = current
            .get_mut(*segment)
            .ok_or_else(|| PathError::MissingSegment((*segment).to_string()))?;
        current = child
            .downcast_mut::<DynObject>()
            .ok_or_else(|| PathError::NotAnObject((*segment).to_string()))?;
    }
    Ok(current)
}

/// Swap the leaf property for `wrap(raw)`. An already-wrapped leaf is
/// returned as-is (identity dedup); a leaf of the wrong type is left in
/// place and reported as [`PathError::TypeMismatch`].
fn wrap_leaf<W, R>(
    parent: &mut DynObject,
    segment: &str,
    wrap: impl FnOnce(R) -> W,
) -> Result<W, PathError>
where
    W: Clone + 'static,
    R: 'static,
{
    match parent.get(segment) {
        None => return Err(PathError::MissingSegment(segment.to_string())),
        Some(slot) => {
            if let Some(existing) = slot.downcast_ref::<W>() {
                return Ok(existing.clone());
            }
        }
    }

    let Some(raw) = parent.remove(segment) else {
        return Err(PathError::MissingSegment(segment.to_string()));
    };
    match raw.downcast::<R>() {
        Ok(raw) => {
            let wrapped = wrap(*raw);
            parent.insert(segment.to_string(), Box::new(wrapped.clone()));
            Ok(wrapped)
        }
        Err(raw) => {
            parent.insert(segment.to_string(), raw);
            Err(PathError::TypeMismatch(segment.to_string()))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
