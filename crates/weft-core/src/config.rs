#![forbid(unsafe_code)]

//! Engine configuration.
//!
//! The configuration is thread-local: every thread that hosts reactive state
//! gets its own copy, initialised from [`ReactivityConfig::default`].
//!
//! | Field | Default | Effect |
//! |-------|---------|--------|
//! | `async_updates` | `true` | When `false`, `Dep::notify` fires subscribers in id order. |
//! | `server_rendering` | `false` | When `true`, `observe` installs nothing. |
//! | `silent` | `false` | Suppresses warning events (a `warn_handler` still runs). |
//! | `warn_handler` | `None` | Receives every policy warning instead of `tracing`. |
//!
//! # Environment
//!
//! [`ReactivityConfig::from_env`] reads `WEFT_ASYNC`, `WEFT_SERVER_RENDERING`
//! and `WEFT_SILENT`. Accepted values are `1/0`, `true/false`, `yes/no` and
//! `on/off`, case-insensitive.

use std::cell::RefCell;
use std::env;
use std::fmt;
use std::rc::Rc;

use crate::error::{ReactivityError, Result};

/// Callback receiving policy warnings.
pub type WarnHandler = Rc<dyn Fn(&str)>;

/// Configuration for the reactivity engine.
#[derive(Clone)]
pub struct ReactivityConfig {
    /// Whether an external scheduler batches and orders updates.
    pub async_updates: bool,
    /// Non-interactive rendering: no new observation is installed.
    pub server_rendering: bool,
    /// Suppress warning events.
    pub silent: bool,
    /// Optional sink for policy warnings.
    pub warn_handler: Option<WarnHandler>,
}

impl Default for ReactivityConfig {
    fn default() -> Self {
        Self {
            async_updates: true,
            server_rendering: false,
            silent: false,
            warn_handler: None,
        }
    }
}

impl fmt::Debug for ReactivityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactivityConfig")
            .field("async_updates", &self.async_updates)
            .field("server_rendering", &self.server_rendering)
            .field("silent", &self.silent)
            .field("warn_handler", &self.warn_handler.is_some())
            .finish()
    }
}

impl ReactivityConfig {
    /// Build a configuration from `WEFT_*` environment variables, falling
    /// back to defaults for unset variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Build a configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(val) = lookup("WEFT_ASYNC") {
            config.async_updates = parse_flag("WEFT_ASYNC", &val)?;
        }
        if let Some(val) = lookup("WEFT_SERVER_RENDERING") {
            config.server_rendering = parse_flag("WEFT_SERVER_RENDERING", &val)?;
        }
        if let Some(val) = lookup("WEFT_SILENT") {
            config.silent = parse_flag("WEFT_SILENT", &val)?;
        }
        Ok(config)
    }

    /// Set whether updates are batched by an external scheduler.
    #[must_use]
    pub fn with_async_updates(mut self, enabled: bool) -> Self {
        self.async_updates = enabled;
        self
    }

    /// Toggle server (non-interactive) rendering mode.
    #[must_use]
    pub fn with_server_rendering(mut self, enabled: bool) -> Self {
        self.server_rendering = enabled;
        self
    }

    /// Toggle warning suppression.
    #[must_use]
    pub fn with_silent(mut self, enabled: bool) -> Self {
        self.silent = enabled;
        self
    }

    /// Route warnings to `handler`.
    #[must_use]
    pub fn with_warn_handler(mut self, handler: impl Fn(&str) + 'static) -> Self {
        self.warn_handler = Some(Rc::new(handler));
        self
    }
}

fn parse_flag(var: &'static str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ReactivityError::InvalidConfig {
            var,
            value: raw.to_string(),
        }),
    }
}

thread_local! {
    static CONFIG: RefCell<ReactivityConfig> = RefCell::new(ReactivityConfig::default());
}

/// Replace this thread's configuration.
pub fn install(config: ReactivityConfig) {
    tracing::debug!(
        message = "config.install",
        async_updates = config.async_updates,
        server_rendering = config.server_rendering,
        silent = config.silent
    );
    CONFIG.with(|c| *c.borrow_mut() = config);
}

/// A copy of this thread's configuration.
#[must_use]
pub fn current() -> ReactivityConfig {
    CONFIG.with(|c| c.borrow().clone())
}

/// Whether an external scheduler batches updates.
#[must_use]
pub fn is_async() -> bool {
    CONFIG.with(|c| c.borrow().async_updates)
}

/// Whether non-interactive rendering is active.
#[must_use]
pub fn is_server_rendering() -> bool {
    CONFIG.with(|c| c.borrow().server_rendering)
}

/// Guard restoring the previous configuration on drop.
#[must_use = "the previous configuration is restored as soon as the guard is dropped"]
pub struct ConfigGuard {
    previous: Option<ReactivityConfig>,
}

impl Drop for ConfigGuard {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            CONFIG.with(|c| *c.borrow_mut() = previous);
        }
    }
}

/// Install `config` for the lifetime of the returned guard.
pub fn override_config(config: ReactivityConfig) -> ConfigGuard {
    let previous = CONFIG.with(|c| std::mem::replace(&mut *c.borrow_mut(), config));
    ConfigGuard {
        previous: Some(previous),
    }
}
