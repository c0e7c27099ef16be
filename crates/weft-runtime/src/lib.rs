#![forbid(unsafe_code)]

//! Runtime: watchers, computed values, and the application host.

pub mod app;
pub mod computed;
pub mod error;
pub mod plugin;
pub mod watcher;

pub use app::App;
pub use computed::Computed;
pub use error::{Result, RuntimeError};
pub use plugin::{Plugin, PluginRegistry};
pub use watcher::{WatchCallback, Watcher, WatcherOptions};
