#![forbid(unsafe_code)]

//! Test support: a recording [`Subscriber`].
//!
//! Available to this crate's unit tests and, through the `test-helpers`
//! feature, to downstream crates.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashSet;

use crate::dep::{Dep, DepId, Subscriber, SubscriberId};
use crate::target::TargetGuard;

type Hook = Box<dyn Fn()>;

/// A subscriber that counts updates and remembers the deps it joined.
///
/// Joining is deduplicated by dep id, like a real evaluation context; the
/// same dep reached twice during [`Probe::track`] subscribes once.
pub struct Probe {
    id: SubscriberId,
    updates: Cell<usize>,
    deps: RefCell<Vec<Rc<Dep>>>,
    dep_ids: RefCell<FxHashSet<DepId>>,
    hook: RefCell<Option<Hook>>,
    log: Option<Rc<RefCell<Vec<SubscriberId>>>>,
}

impl Probe {
    #[must_use]
    pub fn new() -> Rc<Self> {
        Rc::new(Self::build(None))
    }

    /// A probe that appends its id to `log` on every update.
    #[must_use]
    pub fn with_log(log: Rc<RefCell<Vec<SubscriberId>>>) -> Rc<Self> {
        Rc::new(Self::build(Some(log)))
    }

    fn build(log: Option<Rc<RefCell<Vec<SubscriberId>>>>) -> Self {
        Self {
            id: SubscriberId::next(),
            updates: Cell::new(0),
            deps: RefCell::new(Vec::new()),
            dep_ids: RefCell::new(FxHashSet::default()),
            hook: RefCell::new(None),
            log,
        }
    }

    #[must_use]
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Run `f` with this probe as the active context.
    pub fn track<R>(self: &Rc<Self>, f: impl FnOnce() -> R) -> R {
        let _guard = TargetGuard::enter(Some(Rc::clone(self) as Rc<dyn Subscriber>));
        f()
    }

    /// Number of `update()` calls received.
    #[must_use]
    pub fn updates(&self) -> usize {
        self.updates.get()
    }

    /// Number of distinct deps joined.
    #[must_use]
    pub fn dep_count(&self) -> usize {
        self.deps.borrow().len()
    }

    /// Whether this probe joined `dep`.
    #[must_use]
    pub fn depends_on(&self, dep: &Dep) -> bool {
        self.dep_ids.borrow().contains(&dep.id())
    }

    /// Run `hook` after every update.
    pub fn on_update(&self, hook: impl Fn() + 'static) {
        *self.hook.borrow_mut() = Some(Box::new(hook));
    }

    /// Unsubscribe from every joined dep.
    pub fn detach(&self) {
        let deps = std::mem::take(&mut *self.deps.borrow_mut());
        self.dep_ids.borrow_mut().clear();
        for dep in deps {
            dep.remove_sub(self);
        }
    }
}

impl Subscriber for Probe {
    fn id(&self) -> SubscriberId {
        self.id
    }

    fn add_dep(self: Rc<Self>, dep: Rc<Dep>) {
        if self.dep_ids.borrow_mut().insert(dep.id()) {
            self.deps.borrow_mut().push(Rc::clone(&dep));
            dep.add_sub(self);
        }
    }

    fn update(&self) {
        self.updates.set(self.updates.get() + 1);
        if let Some(log) = &self.log {
            log.borrow_mut().push(self.id);
        }
        if let Some(hook) = &*self.hook.borrow() {
            hook();
        }
    }
}

impl fmt::Debug for Probe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Probe")
            .field("id", &self.id)
            .field("updates", &self.updates.get())
            .field("deps", &self.deps.borrow().len())
            .finish()
    }
}
