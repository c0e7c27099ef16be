#![forbid(unsafe_code)]

//! Lazy computed values derived from reactive state.
//!
//! # Design
//!
//! [`Computed`] wraps a lazy [`Watcher`]. Any dep read by the compute
//! function marks the watcher dirty when it changes; the next
//! [`get()`](Computed::get) recomputes and caches the result. Reading a
//! computed inside another evaluation forwards the computed's deps to that
//! evaluation, so an outer watcher re-runs when the computed's sources change.
//!
//! # Invariants
//!
//! 1. A write to any source read by the last computation marks the computed
//!    dirty, and the next `get()` recomputes. The exception is a write made
//!    by the compute function itself to one of its own sources: the watcher
//!    ignores updates while it is evaluating, so that write does not mark it
//!    dirty.
//! 2. Any number of source writes between two reads cost one recomputation.
//! 3. A clean computed answers `get()` from its cache.
//! 4. `version()` counts recomputations.
//!
//! # Failure Modes
//!
//! - **Compute function panics**: the cached value remains from the last
//!   successful computation and the dirty flag stays set, so the next `get()`
//!   retries.
//! - **Torn down**: after [`Computed::teardown`] the value is frozen at the
//!   last computation.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use weft_core::target;
use weft_core::{Object, PropertyDescriptor, Value};

use crate::watcher::{Watcher, WatcherOptions};

struct ComputedInner {
    watcher: Rc<Watcher>,
    version: Cell<u64>,
}

/// A lazily-evaluated, memoized value derived from reactive reads.
///
/// Cloning a `Computed` creates a new handle to the **same** inner state.
#[derive(Clone)]
pub struct Computed {
    inner: Rc<ComputedInner>,
}

impl Computed {
    /// Create a computed value. Nothing is evaluated until the first read.
    pub fn new(compute: impl Fn() -> Value + 'static) -> Self {
        let watcher = Watcher::new(compute, None, WatcherOptions::default().with_lazy(true));
        Self {
            inner: Rc::new(ComputedInner {
                watcher,
                version: Cell::new(0),
            }),
        }
    }

    /// Get the current value, recomputing if any dependency has changed.
    #[must_use]
    pub fn get(&self) -> Value {
        self.refresh();
        if target::is_tracking() {
            self.inner.watcher.depend();
        }
        self.inner.watcher.value()
    }

    /// Access the current value by reference.
    pub fn with<R>(&self, f: impl FnOnce(&Value) -> R) -> R {
        let value = self.get();
        f(&value)
    }

    fn refresh(&self) {
        let watcher = &self.inner.watcher;
        if watcher.is_dirty() && watcher.is_active() {
            watcher.evaluate();
            self.inner.version.set(self.inner.version.get() + 1);
        }
    }

    /// Whether the cached value is stale.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.inner.watcher.is_dirty()
    }

    /// Force invalidation. The next `get()` recomputes.
    pub fn invalidate(&self) {
        self.inner.watcher.invalidate();
    }

    /// Current version number. Increments by 1 on each recomputation.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    /// Stop tracking. The last computed value stays readable.
    pub fn teardown(&self) {
        self.inner.watcher.teardown();
    }

    #[must_use]
    pub fn watcher(&self) -> &Rc<Watcher> {
        &self.inner.watcher
    }

    /// Expose this computed as a read-only accessor property `key` on
    /// `object`. Returns `false` if the property cannot be defined.
    pub fn define_on(&self, object: &Object, key: &str) -> bool {
        let this = self.clone();
        object.define_property(
            key,
            PropertyDescriptor::accessor(Some(Rc::new(move |_: &Object| this.get())), None),
        )
    }
}

impl fmt::Debug for Computed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("cached", &self.inner.watcher.value())
            .field("dirty", &self.is_dirty())
            .field("version", &self.version())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
