#![forbid(unsafe_code)]

//! Reactive property slots and their installer.
//!
//! [`define_reactive`] replaces one property of an object with a
//! [`ReactiveSlot`]: a value store bound to its own [`Dep`]. Reading the
//! property while an evaluation context is active subscribes that context;
//! writing a different value notifies every subscriber.
//!
//! # Design
//!
//! A property that was already an accessor keeps its getter and setter: the
//! slot stores them as [`SlotStorage::Accessor`] and routes reads and writes
//! through them. A plain data property becomes [`SlotStorage::Plain`]. The
//! choice is made once, when the slot is installed.
//!
//! Element reads on arrays cannot be intercepted, so a slot whose value is an
//! array also depends on the observer of every element (see
//! [`depend_array`]).
//!
//! # Invariants
//!
//! 1. Non-configurable properties are never replaced.
//! 2. Reading with no active context has no side effect.
//! 3. Writing a value identical to the current one (including `NaN` over
//!    `NaN`) does not notify.
//! 4. A getter-only accessor ignores writes.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashSet;

use crate::dep::Dep;
use crate::observer::{Observer, observe};
use crate::target;
use crate::value::{Array, Getter, Object, Property, Setter, Value};

/// Hook invoked before a reactive write is applied.
pub type WriteHook = Rc<dyn Fn()>;

/// Where a reactive slot keeps its value.
pub enum SlotStorage {
    /// The slot owns the value.
    Plain(RefCell<Value>),
    /// A pre-existing accessor pair; `shadow` holds the value last seen when
    /// there is no getter.
    Accessor {
        get: Option<Getter>,
        set: Option<Setter>,
        shadow: RefCell<Value>,
    },
}

/// One intercepted property.
pub struct ReactiveSlot {
    dep: Rc<Dep>,
    storage: SlotStorage,
    child_ob: RefCell<Option<Rc<Observer>>>,
    on_write: Option<WriteHook>,
    shallow: bool,
}

impl ReactiveSlot {
    /// The registry subscribers of this property depend on.
    #[must_use]
    pub fn dep(&self) -> &Rc<Dep> {
        &self.dep
    }

    /// Whether nested values are left unobserved.
    #[must_use]
    pub fn is_shallow(&self) -> bool {
        self.shallow
    }

    #[must_use]
    pub fn storage(&self) -> &SlotStorage {
        &self.storage
    }

    fn current(&self, object: &Object) -> Value {
        match &self.storage {
            SlotStorage::Plain(value) => value.borrow().clone(),
            SlotStorage::Accessor { get: Some(get), .. } => get(object),
            SlotStorage::Accessor { shadow, .. } => shadow.borrow().clone(),
        }
    }

    /// Read the value, recording dependencies when a context is active.
    pub fn get(&self, object: &Object) -> Value {
        let value = self.current(object);
        if target::is_tracking() {
            self.dep.depend();
            let child = self.child_ob.borrow().clone();
            if let Some(child) = child {
                child.dep().depend();
                if let Value::Array(array) = &value {
                    depend_array(array);
                }
            }
        }
        value
    }

    /// Write a value and notify subscribers if it changed.
    pub fn set(&self, object: &Object, new_value: Value) {
        let old = self.current(object);
        if new_value.identical(&old) {
            return;
        }
        if let Some(hook) = &self.on_write {
            hook();
        }
        match &self.storage {
            SlotStorage::Accessor { get: Some(_), set: None, .. } => return,
            SlotStorage::Accessor { set: Some(set), .. } => set(object, new_value.clone()),
            SlotStorage::Accessor { shadow: value, .. } | SlotStorage::Plain(value) => {
                *value.borrow_mut() = new_value.clone();
            }
        }
        let child = if self.shallow {
            None
        } else {
            observe(&new_value, false)
        };
        *self.child_ob.borrow_mut() = child;
        self.dep.notify();
    }
}

impl fmt::Debug for ReactiveSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let storage = match self.storage {
            SlotStorage::Plain(_) => "plain",
            SlotStorage::Accessor { .. } => "accessor",
        };
        f.debug_struct("ReactiveSlot")
            .field("dep", &self.dep.id())
            .field("storage", &storage)
            .field("child_observed", &self.child_ob.borrow().is_some())
            .field("shallow", &self.shallow)
            .finish()
    }
}

/// Convert `object[key]` into a reactive slot.
///
/// - `initial` overrides the current value (ignored for getter-only
///   accessors, which keep reading through their getter).
/// - `on_write` runs before every effective write.
/// - `shallow` leaves the value (and later values) unobserved.
///
/// Returns the installed slot, or `None` when the property is
/// non-configurable or the object cannot gain the key.
pub fn define_reactive(
    object: &Object,
    key: &str,
    initial: Option<Value>,
    on_write: Option<WriteHook>,
    shallow: bool,
) -> Option<Rc<ReactiveSlot>> {
    let existing = object.property(key);
    if existing.as_ref().is_some_and(|p| !p.is_configurable()) {
        return None;
    }

    let (get, set): (Option<Getter>, Option<Setter>) = match existing {
        Some(Property::Accessor { get, set, .. }) => (get, set),
        Some(Property::Reactive(previous)) => {
            // Layer over an existing slot by treating it as an accessor pair.
            let reader = Rc::clone(&previous);
            let writer = previous;
            let get: Getter = Rc::new(move |o: &Object| reader.get(o));
            let set: Setter = Rc::new(move |o: &Object, v: Value| writer.set(o, v));
            (Some(get), Some(set))
        }
        Some(Property::Data { .. }) | None => (None, None),
    };

    let value = match initial {
        Some(value) => value,
        None if get.is_none() || set.is_some() => target::untracked(|| object.get(key)),
        None => Value::Undefined,
    };
    let child_ob = if shallow { None } else { observe(&value, false) };

    let storage = if get.is_none() && set.is_none() {
        SlotStorage::Plain(RefCell::new(value))
    } else {
        SlotStorage::Accessor {
            get,
            set,
            shadow: RefCell::new(value),
        }
    };

    let slot = Rc::new(ReactiveSlot {
        dep: Rc::new(Dep::new()),
        storage,
        child_ob: RefCell::new(child_ob),
        on_write,
        shallow,
    });
    object
        .put_property(key, Property::Reactive(Rc::clone(&slot)))
        .then_some(slot)
}

/// Depend on the observer of every element of `array`, recursing into
/// nested arrays.
///
/// Arrays already visited in this walk are skipped, so self-referencing
/// lists terminate.
pub fn depend_array(array: &Array) {
    let mut seen = FxHashSet::default();
    depend_array_inner(array, &mut seen);
}

fn depend_array_inner(array: &Array, seen: &mut FxHashSet<usize>) {
    if !seen.insert(array.addr()) {
        return;
    }
    for item in array.to_vec() {
        if let Some(ob) = item.observer() {
            ob.dep().depend();
        }
        if let Value::Array(nested) = &item {
            depend_array_inner(nested, seen);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
