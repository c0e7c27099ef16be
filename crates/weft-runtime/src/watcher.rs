#![forbid(unsafe_code)]

//! Watchers: subscribers that re-evaluate a getter when its dependencies
//! change.
//!
//! # Design
//!
//! Each evaluation runs the getter with the watcher as the active context,
//! collecting the deps it reads into a fresh set. After the evaluation the
//! fresh set replaces the previous one and the watcher unsubscribes from
//! deps it no longer reads. A dep read several times in one evaluation is
//! subscribed once.
//!
//! Updates run synchronously inside [`Dep::notify`]:
//!
//! - an eager watcher re-evaluates and, when the value changed (or is a
//!   container, or the watcher is deep), calls its callback with
//!   `(new, old)`;
//! - a lazy watcher only marks itself dirty; [`Watcher::evaluate`]
//!   recomputes on demand.
//!
//! # Invariants
//!
//! 1. After an evaluation, the watcher is subscribed to exactly the deps
//!    read during that evaluation, once each.
//! 2. A watcher never re-enters its own evaluation. A write to state it is
//!    currently reading does not re-run it.
//! 3. After [`Watcher::teardown`] the watcher is subscribed to nothing and
//!    ignores updates.
//!
//! # Failure Modes
//!
//! - **Update loop**: a callback that keeps writing state its own watcher
//!   depends on is cut off after [`MAX_RERUNS`] consecutive re-runs, with a
//!   warning event.
//! - **Getter panics**: the context stack is restored and the deps collected
//!   so far become the watcher's deps.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use rustc_hash::FxHashSet;
use weft_core::{Dep, DepId, Subscriber, SubscriberId, TargetGuard, Value};

use crate::error::{Result, RuntimeError};

/// Consecutive re-runs triggered from inside a watcher's own run before the
/// loop is abandoned.
pub const MAX_RERUNS: u32 = 100;

/// Change callback: `(new, old)`.
pub type WatchCallback = Box<dyn Fn(&Value, &Value)>;

/// Evaluation options for a [`Watcher`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatcherOptions {
    /// Defer evaluation until [`Watcher::evaluate`]; updates only mark dirty.
    pub lazy: bool,
    /// Read every nested property of the result, so any nested change
    /// triggers the watcher.
    pub deep: bool,
}

impl WatcherOptions {
    #[must_use]
    pub fn with_lazy(mut self, lazy: bool) -> Self {
        self.lazy = lazy;
        self
    }

    #[must_use]
    pub fn with_deep(mut self, deep: bool) -> Self {
        self.deep = deep;
        self
    }
}

// ─── Watcher ─────────────────────────────────────────────────────────────────

pub struct Watcher {
    id: SubscriberId,
    this: Weak<Watcher>,
    getter: Box<dyn Fn() -> Value>,
    callback: Option<WatchCallback>,
    options: WatcherOptions,
    value: RefCell<Value>,
    dirty: Cell<bool>,
    active: Cell<bool>,
    evaluating: Cell<bool>,
    running: Cell<bool>,
    rerun: Cell<bool>,
    runs: Cell<u64>,
    deps: RefCell<Vec<Rc<Dep>>>,
    dep_ids: RefCell<FxHashSet<DepId>>,
    new_deps: RefCell<Vec<Rc<Dep>>>,
    new_dep_ids: RefCell<FxHashSet<DepId>>,
}

impl Watcher {
    /// Create a watcher over `getter`. Eager watchers evaluate immediately.
    pub fn new(
        getter: impl Fn() -> Value + 'static,
        callback: Option<WatchCallback>,
        options: WatcherOptions,
    ) -> Rc<Self> {
        let watcher = Rc::new_cyclic(|this| Self {
            id: SubscriberId::next(),
            this: this.clone(),
            getter: Box::new(getter),
            callback,
            options,
            value: RefCell::new(Value::Undefined),
            dirty: Cell::new(options.lazy),
            active: Cell::new(true),
            evaluating: Cell::new(false),
            running: Cell::new(false),
            rerun: Cell::new(false),
            runs: Cell::new(0),
            deps: RefCell::new(Vec::new()),
            dep_ids: RefCell::new(FxHashSet::default()),
            new_deps: RefCell::new(Vec::new()),
            new_dep_ids: RefCell::new(FxHashSet::default()),
        });
        if !options.lazy {
            let value = watcher.get();
            *watcher.value.borrow_mut() = value;
        }
        tracing::debug!(
            message = "watcher.create",
            watcher = watcher.id.raw(),
            lazy = options.lazy,
            deep = options.deep
        );
        watcher
    }

    /// Watch a dot-delimited property path below `root`, such as `"a.b.0"`.
    pub fn for_path(
        root: Value,
        path: &str,
        callback: Option<WatchCallback>,
        options: WatcherOptions,
    ) -> Result<Rc<Self>> {
        let segments = parse_path(path)?;
        Ok(Self::new(move || read_path(&root, &segments), callback, options))
    }

    /// Run the getter with this watcher as the active context and replace
    /// the dependency set with what it read.
    pub fn get(&self) -> Value {
        if self.evaluating.replace(true) {
            return self.value.borrow().clone();
        }
        let _scope = EvalScope(self);
        let _guard = TargetGuard::enter(self.this.upgrade().map(|w| w as Rc<dyn Subscriber>));
        let value = (self.getter)();
        if self.options.deep {
            traverse(&value);
        }
        value
    }

    /// Recompute the value of a lazy watcher and clear the dirty flag.
    pub fn evaluate(&self) {
        let value = self.get();
        *self.value.borrow_mut() = value;
        self.dirty.set(false);
    }

    /// Re-evaluate and invoke the callback when the value changed.
    pub fn run(&self) {
        if !self.active.get() {
            return;
        }
        if self.running.get() {
            self.rerun.set(true);
            return;
        }
        self.running.set(true);
        let mut passes = 0;
        loop {
            self.rerun.set(false);
            self.run_once();
            passes += 1;
            if !self.rerun.get() || !self.active.get() {
                break;
            }
            if passes > MAX_RERUNS {
                tracing::warn!(
                    target: "weft::watcher",
                    watcher = self.id.raw(),
                    passes,
                    "possible infinite update loop"
                );
                break;
            }
        }
        self.running.set(false);
    }

    fn run_once(&self) {
        let value = self.get();
        let changed = {
            let old = self.value.borrow();
            !value.identical(&old) || value.is_container() || self.options.deep
        };
        self.runs.set(self.runs.get() + 1);
        tracing::trace!(message = "watcher.run", watcher = self.id.raw(), changed);
        if !changed {
            return;
        }
        let old = self.value.replace(value.clone());
        if let Some(callback) = &self.callback {
            callback(&value, &old);
        }
    }

    /// Make the active context depend on everything this watcher depends on.
    pub fn depend(&self) {
        let deps = self.deps.borrow().clone();
        for dep in &deps {
            dep.depend();
        }
    }

    /// Unsubscribe from every dep and stop reacting to updates.
    pub fn teardown(&self) {
        if !self.active.replace(false) {
            return;
        }
        let deps = std::mem::take(&mut *self.deps.borrow_mut());
        self.dep_ids.borrow_mut().clear();
        for dep in &deps {
            dep.remove_sub(self);
        }
        tracing::debug!(message = "watcher.teardown", watcher = self.id.raw(), deps = deps.len());
    }

    fn cleanup_deps(&self) {
        let stale: Vec<Rc<Dep>> = {
            let new_ids = self.new_dep_ids.borrow();
            self.deps
                .borrow()
                .iter()
                .filter(|dep| !new_ids.contains(&dep.id()))
                .cloned()
                .collect()
        };
        for dep in &stale {
            dep.remove_sub(self);
        }
        std::mem::swap(&mut *self.deps.borrow_mut(), &mut *self.new_deps.borrow_mut());
        std::mem::swap(&mut *self.dep_ids.borrow_mut(), &mut *self.new_dep_ids.borrow_mut());
        self.new_deps.borrow_mut().clear();
        self.new_dep_ids.borrow_mut().clear();
        if !self.active.get() {
            let deps = std::mem::take(&mut *self.deps.borrow_mut());
            self.dep_ids.borrow_mut().clear();
            for dep in &deps {
                dep.remove_sub(self);
            }
        }
    }

    /// The value from the last evaluation.
    #[must_use]
    pub fn value(&self) -> Value {
        self.value.borrow().clone()
    }

    #[must_use]
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    /// Mark a lazy watcher stale so the next read re-evaluates.
    pub fn invalidate(&self) {
        self.dirty.set(true);
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    #[must_use]
    pub fn options(&self) -> WatcherOptions {
        self.options
    }

    /// Number of completed runs (callback-driven re-evaluations).
    #[must_use]
    pub fn runs(&self) -> u64 {
        self.runs.get()
    }

    /// Number of deps this watcher is subscribed to.
    #[must_use]
    pub fn dep_count(&self) -> usize {
        self.deps.borrow().len()
    }

    /// Whether the last evaluation read `dep`.
    #[must_use]
    pub fn depends_on(&self, dep: &Dep) -> bool {
        self.dep_ids.borrow().contains(&dep.id())
    }
}

impl Subscriber for Watcher {
    fn id(&self) -> SubscriberId {
        self.id
    }

    fn add_dep(self: Rc<Self>, dep: Rc<Dep>) {
        let id = dep.id();
        if !self.new_dep_ids.borrow_mut().insert(id) {
            return;
        }
        self.new_deps.borrow_mut().push(Rc::clone(&dep));
        if !self.dep_ids.borrow().contains(&id) {
            dep.add_sub(self);
        }
    }

    fn update(&self) {
        if !self.active.get() || self.evaluating.get() {
            return;
        }
        if self.options.lazy {
            self.dirty.set(true);
        } else {
            self.run();
        }
    }
}

impl fmt::Debug for Watcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watcher")
            .field("id", &self.id)
            .field("options", &self.options)
            .field("active", &self.active.get())
            .field("dirty", &self.dirty.get())
            .field("deps", &self.deps.borrow().len())
            .finish()
    }
}

/// Ends an evaluation; runs on unwinding too.
struct EvalScope<'a>(&'a Watcher);

impl Drop for EvalScope<'_> {
    fn drop(&mut self) {
        self.0.cleanup_deps();
        self.0.evaluating.set(false);
    }
}

// ─── Paths ───────────────────────────────────────────────────────────────────

/// Split a watch path into segments.
///
/// Segments may contain word characters and `$`; empty segments are
/// rejected.
pub fn parse_path(path: &str) -> Result<Vec<String>> {
    let valid = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$');
    let segments: Vec<String> = path.split('.').map(str::to_string).collect();
    if segments.iter().all(|s| valid(s)) {
        Ok(segments)
    } else {
        Err(RuntimeError::InvalidPath {
            path: path.to_string(),
        })
    }
}

fn read_path(root: &Value, segments: &[String]) -> Value {
    let mut current = root.clone();
    for segment in segments {
        current = match &current {
            Value::Object(object) => object.get(segment),
            Value::Array(array) => segment
                .parse::<usize>()
                .map_or(Value::Undefined, |i| array.get(i)),
            _ => return Value::Undefined,
        };
    }
    current
}

// ─── Deep traversal ──────────────────────────────────────────────────────────

/// Read every nested property of `value` so the active context depends on
/// all of it. Each container is visited once, observed or not.
pub fn traverse(value: &Value) {
    let mut visit = Visited::default();
    traverse_inner(value, &mut visit);
}

/// Containers reached so far. Handles are kept so addresses stay unique
/// for the whole walk.
#[derive(Default)]
struct Visited {
    addrs: FxHashSet<usize>,
    held: Vec<Value>,
}

impl Visited {
    fn insert(&mut self, value: &Value) -> bool {
        let addr = match value {
            Value::Array(array) => array.addr(),
            Value::Object(object) => object.addr(),
            _ => return false,
        };
        if !self.addrs.insert(addr) {
            return false;
        }
        self.held.push(value.clone());
        true
    }
}

fn traverse_inner(value: &Value, visit: &mut Visited) {
    if !visit.insert(value) {
        return;
    }
    match value {
        Value::Array(array) => {
            for item in array.to_vec() {
                traverse_inner(&item, visit);
            }
        }
        Value::Object(object) => {
            for key in object.keys() {
                traverse_inner(&object.get(&key), visit);
            }
        }
        _ => {}
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
