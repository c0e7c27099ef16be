#![forbid(unsafe_code)]

//! weft public facade crate.
//!
//! This crate provides the stable, ergonomic surface area for users.

pub use weft_core::{
    Array, Dep, Key, Object, ObjectKind, PropertyDescriptor, PropertyFlags, ReactivityConfig,
    ReactivityError, Subscriber, SubscriberId, TargetGuard, Value, del, observe, set,
};

#[cfg(feature = "runtime")]
pub use weft_runtime::{App, Computed, Plugin, RuntimeError, Watcher, WatcherOptions};

pub mod prelude {
    pub use weft_core as core;
    #[cfg(feature = "runtime")]
    pub use weft_runtime as runtime;

    pub use weft_core::{Array, Object, Value, del, observe, set};
    #[cfg(feature = "runtime")]
    pub use weft_runtime::{App, Computed, Watcher, WatcherOptions};
}
