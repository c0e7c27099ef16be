#![forbid(unsafe_code)]

//! Plugins and the idempotent install registry.

use std::fmt;
use std::rc::Rc;

use weft_core::Value;

use crate::app::App;

/// An extension installed into an [`App`] through [`App::use_plugin`].
///
/// Plain closures `Fn(&mut App, &[Value])` are plugins too.
pub trait Plugin {
    fn install(&self, app: &mut App, args: &[Value]);
}

impl<F> Plugin for F
where
    F: Fn(&mut App, &[Value]),
{
    fn install(&self, app: &mut App, args: &[Value]) {
        self(app, args);
    }
}

/// Remembers which plugins have been installed, by `Rc` identity.
#[derive(Default)]
pub struct PluginRegistry {
    installed: Vec<Rc<dyn Plugin>>,
}

impl PluginRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether this exact plugin instance was installed before.
    #[must_use]
    pub fn contains(&self, plugin: &Rc<dyn Plugin>) -> bool {
        self.installed.iter().any(|p| Rc::ptr_eq(p, plugin))
    }

    /// Record `plugin`. Returns `false` if it was already recorded.
    pub fn record(&mut self, plugin: Rc<dyn Plugin>) -> bool {
        if self.contains(&plugin) {
            return false;
        }
        self.installed.push(plugin);
        true
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.installed.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.installed.is_empty()
    }
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("installed", &self.installed.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_dedups_by_identity() {
        let a: Rc<dyn Plugin> = Rc::new(|_: &mut App, _: &[Value]| {});
        let b: Rc<dyn Plugin> = Rc::new(|_: &mut App, _: &[Value]| {});
        let mut registry = PluginRegistry::new();
        assert!(registry.record(Rc::clone(&a)));
        assert!(!registry.record(Rc::clone(&a)));
        assert!(registry.record(b));
        assert_eq!(registry.len(), 2);
        assert!(registry.contains(&a));
    }
}
