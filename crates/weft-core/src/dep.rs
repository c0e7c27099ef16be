#![forbid(unsafe_code)]

//! Dependency registries: one multicast subscriber list per observable slot.
//!
//! A [`Dep`] is created for every reactive property slot and for every
//! observed container. Reads call [`Dep::depend`], which asks the active
//! evaluation context (see [`crate::target`]) to record an edge to this
//! registry. Writes call [`Dep::notify`], which fans out to every subscriber.
//!
//! # Invariants
//!
//! 1. `DepId`s and `SubscriberId`s are unique per process and strictly
//!    increasing in creation order.
//! 2. `notify()` iterates a snapshot taken once per call; subscribers added or
//!    removed during delivery do not affect the in-flight snapshot.
//! 3. When updates run synchronously (`async_updates == false`), the snapshot
//!    is stable-sorted by subscriber id before delivery.
//! 4. No `RefCell` borrow is held while a subscriber's `update()` runs.
//!
//! # Failure Modes
//!
//! None of these operations fail. Adding the same subscriber twice is
//! permitted and results in two deliveries per notification.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config;
use crate::target;

// ─── Id generation ───────────────────────────────────────────────────────────

static NEXT_DEP_ID: AtomicU64 = AtomicU64::new(0);
static NEXT_SUBSCRIBER_ID: AtomicU64 = AtomicU64::new(0);

/// Identity of a [`Dep`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DepId(u64);

impl DepId {
    fn next() -> Self {
        Self(NEXT_DEP_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Creation-ordered identity of a subscriber.
///
/// Ordering by id is creation order, which for component trees is
/// parent-before-child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Allocate the next process-wide subscriber id.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_SUBSCRIBER_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub#{}", self.0)
    }
}

// ─── Subscriber capability ───────────────────────────────────────────────────

/// The capability an observer must offer to take part in dependency tracking.
///
/// Implementors are supplied by the scheduler or component lifecycle. The
/// core only ever calls `add_dep` (while the subscriber is the active
/// context) and `update` (during [`Dep::notify`]).
pub trait Subscriber {
    /// Stable, creation-ordered identity.
    fn id(&self) -> SubscriberId;

    /// Record a dependency edge to `dep`.
    ///
    /// Implementations decide whether to call [`Dep::add_sub`]; they are
    /// expected to avoid subscribing twice to the same registry within one
    /// evaluation.
    fn add_dep(self: Rc<Self>, dep: Rc<Dep>);

    /// React to a change in one of the recorded dependencies.
    fn update(&self);
}

// ─── Dep ─────────────────────────────────────────────────────────────────────

/// A multicast subscription list with notify semantics.
pub struct Dep {
    id: DepId,
    subs: RefCell<Vec<Rc<dyn Subscriber>>>,
}

impl Dep {
    /// Create an empty registry with a fresh id.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: DepId::next(),
            subs: RefCell::new(Vec::new()),
        }
    }

    /// This registry's identity.
    #[must_use]
    pub fn id(&self) -> DepId {
        self.id
    }

    /// Append a subscriber. No uniqueness check is performed.
    pub fn add_sub(&self, sub: Rc<dyn Subscriber>) {
        self.subs.borrow_mut().push(sub);
    }

    /// Remove the first entry that is the same object as `sub`.
    pub fn remove_sub(&self, sub: &dyn Subscriber) {
        let mut subs = self.subs.borrow_mut();
        if let Some(pos) = subs
            .iter()
            .position(|s| std::ptr::addr_eq(Rc::as_ptr(s), sub as *const dyn Subscriber))
        {
            subs.remove(pos);
        }
    }

    /// Number of subscribers currently registered (duplicates included).
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subs.borrow().len()
    }

    /// Ids of the current subscribers in list order.
    #[must_use]
    pub fn subscriber_ids(&self) -> Vec<SubscriberId> {
        self.subs.borrow().iter().map(|s| s.id()).collect()
    }

    /// Ask the active evaluation context, if any, to depend on this registry.
    pub fn depend(self: &Rc<Self>) {
        if let Some(active) = target::current_target() {
            active.add_dep(Rc::clone(self));
        }
    }

    /// Deliver `update()` to a snapshot of the subscriber list.
    pub fn notify(&self) {
        let mut snapshot: Vec<Rc<dyn Subscriber>> = self.subs.borrow().clone();
        let sorted = !config::is_async();
        if sorted {
            // Synchronous delivery runs in creation order.
            snapshot.sort_by_key(|s| s.id());
        }
        tracing::trace!(
            message = "dep.notify",
            dep = self.id.raw(),
            subscribers = snapshot.len(),
            sorted
        );
        for sub in &snapshot {
            sub.update();
        }
    }
}

impl Default for Dep {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Dep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dep")
            .field("id", &self.id)
            .field("subscribers", &self.subscriber_ids())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
