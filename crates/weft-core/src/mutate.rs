#![forbid(unsafe_code)]

//! Observable structural mutation: [`set`] and [`del`].
//!
//! Adding or removing a key cannot be intercepted by the property table, so
//! these helpers do the bookkeeping a plain assignment skips. New keys on
//! observed objects become reactive slots, and the container's observer dep
//! is notified so that anything depending on the container's shape re-runs.
//!
//! # Failure Modes
//!
//! Misuse is reported through a policy warning and otherwise ignored:
//!
//! - primitive or nullish targets,
//! - adding or deleting keys on a framework instance or on a root container
//!   (one whose observer has root usage),
//! - named keys on an array, and indices above [`crate::value::MAX_ARRAY_INDEX`],
//! - array growth that cannot be allocated.

use crate::diag;
use crate::observer::Observer;
use crate::reactive::define_reactive;
use crate::value::{Array, Key, Object, ObjectKind, Value};

/// Set `key` on `target` to `value`, making the key reactive if it is new.
///
/// Returns `value`.
///
/// - Arrays with an index key: the array grows if needed and the element is
///   replaced through [`Array::splice`], which notifies.
/// - Existing own keys: plain assignment; an existing reactive slot
///   notifies by itself.
/// - New keys on an observed object: a reactive slot is installed and the
///   object's observer dep is notified.
/// - New keys on an unobserved object: plain assignment.
pub fn set(target: &Value, key: impl Into<Key>, value: Value) -> Value {
    let key = key.into();
    match target {
        Value::Array(array) => set_index(array, &key, value),
        Value::Object(object) => set_property(object, &key, value),
        other => {
            diag::warn(&format!(
                "cannot set reactive property `{key}` on {} value",
                other.type_name()
            ));
            value
        }
    }
}

fn set_index(array: &Array, key: &Key, value: Value) -> Value {
    let Some(index) = key.as_index() else {
        diag::warn(&format!("cannot set `{key}` on an array: not a valid array index"));
        return value;
    };
    if index >= array.len() && !array.set_len(index) {
        diag::warn(&format!("cannot grow array to index {index}"));
        return value;
    }
    array.splice(index_offset(index), 1, [value.clone()]);
    value
}

fn set_property(object: &Object, key: &Key, value: Value) -> Value {
    let name = key.to_name();
    if object.has_own(&name) {
        object.assign(&name, value.clone());
        return value;
    }
    let ob = object.observer();
    if object.kind() == ObjectKind::Instance || ob.as_ref().is_some_and(|ob| ob.is_root()) {
        diag::warn(&format!(
            "avoid adding reactive property `{key}` to an instance or root data at runtime; declare it upfront"
        ));
        return value;
    }
    let Some(ob) = ob else {
        object.assign(&name, value.clone());
        return value;
    };
    if define_reactive(object, &name, Some(value.clone()), None, false).is_some() {
        notify_shape(&ob, "set", key);
    }
    value
}

/// Delete `key` from `target`, notifying dependents of the container.
///
/// Index keys on arrays remove the element through [`Array::splice`].
/// Deleting a missing key does nothing. A non-configurable property is left
/// in place and nothing is notified.
pub fn del(target: &Value, key: impl Into<Key>) {
    let key = key.into();
    match target {
        Value::Array(array) => match key.as_index() {
            Some(index) => {
                array.splice(index_offset(index), 1, []);
            }
            None => diag::warn(&format!("cannot delete `{key}` on an array: not a valid array index")),
        },
        Value::Object(object) => del_property(object, &key),
        other => diag::warn(&format!(
            "cannot delete reactive property `{key}` on {} value",
            other.type_name()
        )),
    }
}

fn del_property(object: &Object, key: &Key) {
    let ob = object.observer();
    if object.kind() == ObjectKind::Instance || ob.as_ref().is_some_and(|ob| ob.is_root()) {
        diag::warn(&format!(
            "avoid deleting property `{key}` on an instance or root data; set it to null instead"
        ));
        return;
    }
    let name = key.to_name();
    if !object.has_own(&name) || !object.delete(&name) {
        return;
    }
    if let Some(ob) = ob {
        notify_shape(&ob, "del", key);
    }
}

fn notify_shape(ob: &Observer, op: &'static str, key: &Key) {
    tracing::trace!(message = "observer.shape", op, key = %key, dep = ob.dep().id().raw());
    ob.dep().notify();
}

fn index_offset(index: usize) -> isize {
    isize::try_from(index).unwrap_or(isize::MAX)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
