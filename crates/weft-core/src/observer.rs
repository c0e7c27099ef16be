#![forbid(unsafe_code)]

//! Observable wrappers: one [`Observer`] per observed container.
//!
//! Observing a plain object converts each of its own enumerable properties
//! into a reactive slot ([`crate::reactive::define_reactive`]). Observing an
//! array enables mutation interception on it ([`crate::array`]) and observes
//! every element. Both recurse through nested containers.
//!
//! The container is tagged with its observer before the walk starts, so a
//! structure that reaches itself again (directly or through siblings) stops
//! at the tag instead of recursing forever.
//!
//! # Invariants
//!
//! 1. `observe(v)` returns the same `Rc<Observer>` for the same container on
//!    every call (pointer-equal).
//! 2. An observer only holds a weak reference to its container; the
//!    container owns the observer.
//! 3. Suspending observation never removes instrumentation that is already
//!    installed.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::config;
use crate::dep::Dep;
use crate::reactive::define_reactive;
use crate::value::{Array, ArrayData, Object, ObjectData, ObjectKind, Value};

thread_local! {
    static SHOULD_OBSERVE: Cell<bool> = const { Cell::new(true) };
}

/// Enable or disable installation of new observers on this thread.
pub fn toggle_observing(enabled: bool) {
    SHOULD_OBSERVE.with(|flag| flag.set(enabled));
}

/// Whether new observers may currently be installed.
#[must_use]
pub fn should_observe() -> bool {
    SHOULD_OBSERVE.with(Cell::get)
}

/// Run `f` with observation suspended, restoring the previous flag afterwards.
pub fn without_observing<R>(f: impl FnOnce() -> R) -> R {
    struct Restore(bool);
    impl Drop for Restore {
        fn drop(&mut self) {
            toggle_observing(self.0);
        }
    }
    let _restore = Restore(should_observe());
    toggle_observing(false);
    f()
}

enum WeakContainer {
    Object(Weak<RefCell<ObjectData>>),
    Array(Weak<RefCell<ArrayData>>),
}

/// The wrapper attached to every observed container.
pub struct Observer {
    value: WeakContainer,
    dep: Rc<Dep>,
    vm_count: Cell<usize>,
}

impl Observer {
    /// Tag `object` with a fresh observer and instrument its properties.
    fn attach_object(object: &Object) -> Rc<Self> {
        let ob = Rc::new(Self {
            value: WeakContainer::Object(object.downgrade()),
            dep: Rc::new(Dep::new()),
            vm_count: Cell::new(0),
        });
        object.set_observer(Rc::clone(&ob));
        tracing::trace!(message = "observer.attach", kind = "object", dep = ob.dep.id().raw());
        Self::walk(object);
        ob
    }

    /// Tag `array` with a fresh observer and observe its elements.
    fn attach_array(array: &Array) -> Rc<Self> {
        let ob = Rc::new(Self {
            value: WeakContainer::Array(array.downgrade()),
            dep: Rc::new(Dep::new()),
            vm_count: Cell::new(0),
        });
        array.set_observer(Rc::clone(&ob));
        tracing::trace!(message = "observer.attach", kind = "array", dep = ob.dep.id().raw());
        Self::observe_array(&array.to_vec());
        ob
    }

    /// Convert every own enumerable property of `object` into a reactive slot.
    pub fn walk(object: &Object) {
        for key in object.keys() {
            define_reactive(object, &key, None, None, false);
        }
    }

    /// Observe each item.
    pub fn observe_array(items: &[Value]) {
        for item in items {
            observe(item, false);
        }
    }

    /// Registry notified when the container's shape changes.
    #[must_use]
    pub fn dep(&self) -> &Rc<Dep> {
        &self.dep
    }

    /// Number of roots using this container as their top-level state.
    #[must_use]
    pub fn vm_count(&self) -> usize {
        self.vm_count.get()
    }

    /// Whether at least one root uses this container.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.vm_count.get() > 0
    }

    /// Drop one root usage (saturating).
    pub fn release_root(&self) {
        self.vm_count.set(self.vm_count.get().saturating_sub(1));
    }

    /// The wrapped container, if it is still alive.
    #[must_use]
    pub fn value(&self) -> Option<Value> {
        match &self.value {
            WeakContainer::Object(weak) => weak.upgrade().map(|rc| Value::Object(Object::from_inner(rc))),
            WeakContainer::Array(weak) => weak.upgrade().map(|rc| Value::Array(Array::from_inner(rc))),
        }
    }
}

impl fmt::Debug for Observer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.value {
            WeakContainer::Object(_) => "object",
            WeakContainer::Array(_) => "array",
        };
        f.debug_struct("Observer")
            .field("kind", &kind)
            .field("dep", &self.dep.id())
            .field("vm_count", &self.vm_count.get())
            .finish()
    }
}

/// Return the observer for `value`, creating one when `value` qualifies.
///
/// Qualifying values are plain objects and arrays that are extensible, while
/// observation is enabled and server rendering is off. Opaque nodes,
/// framework instances and primitives yield `None`. With `as_root`, the
/// observer's root-usage counter is incremented.
pub fn observe(value: &Value, as_root: bool) -> Option<Rc<Observer>> {
    let ob = match value {
        Value::Object(object) => {
            if object.kind() == ObjectKind::Opaque {
                return None;
            }
            object.observer().or_else(|| {
                (can_attach()
                    && object.kind() == ObjectKind::Plain
                    && object.is_extensible())
                .then(|| Observer::attach_object(object))
            })
        }
        Value::Array(array) => array
            .observer()
            .or_else(|| (can_attach() && array.is_extensible()).then(|| Observer::attach_array(array))),
        _ => return None,
    };
    if as_root && let Some(ob) = &ob {
        ob.vm_count.set(ob.vm_count.get() + 1);
    }
    ob
}

fn can_attach() -> bool {
    should_observe() && !config::is_server_rendering()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
