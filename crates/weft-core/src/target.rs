#![forbid(unsafe_code)]

//! The evaluation context stack: "which subscriber is reading state right now".
//!
//! Property getters have no parameter through which to learn who is reading
//! them, so the reader is published here for the duration of its evaluation.
//! The top of the stack is the active context; a `None` entry suspends
//! dependency collection (reads inside it subscribe nothing).
//!
//! Nested evaluations (a parent evaluation that synchronously evaluates a
//! child) push before evaluating and pop after, restoring the parent.
//!
//! # Invariants
//!
//! 1. At most one context is active at any instant.
//! 2. Every push is paired with exactly one pop, including on unwinding.
//!    [`TargetGuard`] enforces this; the bare [`push_target`]/[`pop_target`]
//!    pair is for collaborators that manage scoping themselves.
//!
//! # Failure Modes
//!
//! - **Unpaired pop**: popping an empty stack is a defect in the caller.
//!   [`try_pop_target`] reports [`ReactivityError::StackUnderflow`];
//!   [`pop_target`] panics with it.
//! - **Guard crossing**: dropping a guard whose context is no longer on top
//!   means a nested evaluation leaked a push. Reported as
//!   [`ReactivityError::ContextMismatch`] in debug builds.

use std::cell::RefCell;
use std::rc::Rc;

use crate::dep::{Subscriber, SubscriberId};
use crate::error::{ReactivityError, Result};

type Entry = Option<Rc<dyn Subscriber>>;

thread_local! {
    static TARGET_STACK: RefCell<Vec<Entry>> = const { RefCell::new(Vec::new()) };
}

/// Make `target` the active context, saving the current one.
///
/// Pass `None` to suspend dependency collection.
pub fn push_target(target: Option<Rc<dyn Subscriber>>) {
    let id = target.as_ref().map(|t| t.id().raw());
    let depth = TARGET_STACK.with(|stack| {
        let mut stack = stack.borrow_mut();
        stack.push(target);
        stack.len()
    });
    tracing::trace!(message = "target.push", subscriber = ?id, depth);
}

/// Restore the previously active context.
///
/// Returns the id of the context that was popped (`None` for a suspension
/// entry).
pub fn try_pop_target() -> Result<Option<SubscriberId>> {
    let (popped, depth) = TARGET_STACK.with(|stack| {
        let mut stack = stack.borrow_mut();
        let popped = stack.pop();
        (popped, stack.len())
    });
    match popped {
        Some(entry) => {
            let id = entry.as_ref().map(|t| t.id());
            tracing::trace!(message = "target.pop", subscriber = ?id.map(SubscriberId::raw), depth);
            Ok(id)
        }
        None => {
            tracing::error!(message = "target.underflow");
            Err(ReactivityError::StackUnderflow)
        }
    }
}

/// Restore the previously active context.
///
/// # Panics
///
/// Panics if the stack is empty; an unpaired pop corrupts attribution for
/// every later read.
pub fn pop_target() {
    if let Err(err) = try_pop_target() {
        panic!("{err}");
    }
}

/// The active context, if any.
#[must_use]
pub fn current_target() -> Option<Rc<dyn Subscriber>> {
    TARGET_STACK.with(|stack| stack.borrow().last().cloned().flatten())
}

/// Id of the active context, if any.
#[must_use]
pub fn current_target_id() -> Option<SubscriberId> {
    TARGET_STACK.with(|stack| stack.borrow().last().and_then(|e| e.as_ref().map(|t| t.id())))
}

/// Whether reads would currently record a dependency.
#[must_use]
pub fn is_tracking() -> bool {
    TARGET_STACK.with(|stack| matches!(stack.borrow().last(), Some(Some(_))))
}

/// Number of entries on the stack (suspension entries included).
#[must_use]
pub fn depth() -> usize {
    TARGET_STACK.with(|stack| stack.borrow().len())
}

/// RAII guard that pushes a context on creation and pops it on drop.
///
/// This is the guaranteed-release scope around every evaluation: if the
/// evaluation panics, unwinding still restores the previous context.
#[must_use = "the context is popped as soon as the guard is dropped"]
pub struct TargetGuard {
    expected: Option<SubscriberId>,
    depth: usize,
}

impl TargetGuard {
    /// Enter `target` as the active context.
    pub fn enter(target: Option<Rc<dyn Subscriber>>) -> Self {
        let expected = target.as_ref().map(|t| t.id());
        push_target(target);
        Self {
            expected,
            depth: depth(),
        }
    }

    /// Suspend dependency collection until the guard drops.
    pub fn untracked() -> Self {
        Self::enter(None)
    }
}

impl Drop for TargetGuard {
    fn drop(&mut self) {
        let depth_before = depth();
        match try_pop_target() {
            Ok(found) => {
                debug_assert!(
                    found == self.expected && depth_before == self.depth,
                    "{}",
                    ReactivityError::ContextMismatch {
                        expected: self.expected,
                        found,
                    }
                );
            }
            Err(err) => {
                // Never double-panic while unwinding.
                if !std::thread::panicking() {
                    panic!("{err}");
                }
            }
        }
    }
}

/// Run `f` with dependency collection suspended.
pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
    let _guard = TargetGuard::untracked();
    f()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
