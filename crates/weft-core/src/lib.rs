#![forbid(unsafe_code)]

//! Core: dependency registries, the evaluation context stack, observers,
//! reactive property slots, array interception and structural mutation.

pub mod array;
pub mod config;
pub mod dep;
pub mod error;
#[cfg(feature = "json")]
pub mod json;
pub mod mutate;
pub mod observer;
pub mod reactive;
pub mod target;
#[cfg(any(test, feature = "test-helpers"))]
pub mod testing;
pub mod value;

mod diag;

pub use array::{ArrayMethod, Comparator};
pub use config::{ReactivityConfig, override_config};
pub use dep::{Dep, DepId, Subscriber, SubscriberId};
pub use error::{ReactivityError, Result};
pub use mutate::{del, set};
pub use observer::{Observer, observe, should_observe, toggle_observing, without_observing};
pub use reactive::{ReactiveSlot, define_reactive, depend_array};
pub use target::{TargetGuard, pop_target, push_target, untracked};
pub use value::{Array, Key, Object, ObjectKind, PropertyDescriptor, PropertyFlags, Value};
