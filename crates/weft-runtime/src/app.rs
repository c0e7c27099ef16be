#![forbid(unsafe_code)]

//! The application host: root state, its watchers, and installed plugins.
//!
//! # Design
//!
//! An [`App`] owns a root data object, observed as a root container so that
//! [`weft_core::set`] and [`weft_core::del`] refuse to change its shape at
//! runtime. Each data key is also proxied onto an instance object (an
//! [`ObjectKind::Instance`] object), which reads and writes through to the
//! data.
//!
//! Watchers and computeds created through the app are torn down when the
//! app is destroyed, explicitly or on drop.

use std::rc::Rc;

use weft_core::observer::Observer;
use weft_core::{Object, ObjectKind, PropertyDescriptor, Value, observe};

use crate::computed::Computed;
use crate::error::{Result, RuntimeError};
use crate::plugin::{Plugin, PluginRegistry};
use crate::watcher::{WatchCallback, Watcher, WatcherOptions};

pub struct App {
    data: Object,
    instance: Object,
    root: Option<Rc<Observer>>,
    watchers: Vec<Rc<Watcher>>,
    computeds: Vec<Computed>,
    plugins: PluginRegistry,
    destroyed: bool,
}

impl App {
    /// Create an app over `data`, observing it as root state.
    pub fn new(data: Object) -> Self {
        let root = observe(&Value::from(data.clone()), true);
        let instance = Object::with_kind(ObjectKind::Instance);
        for key in data.keys() {
            proxy(&instance, &data, &key);
        }
        tracing::debug!(message = "app.create", keys = data.len(), observed = root.is_some());
        Self {
            data,
            instance,
            root,
            watchers: Vec::new(),
            computeds: Vec::new(),
            plugins: PluginRegistry::new(),
            destroyed: false,
        }
    }

    /// The root data object.
    #[must_use]
    pub fn data(&self) -> &Object {
        &self.data
    }

    /// The instance object proxying the root data keys.
    #[must_use]
    pub fn instance(&self) -> &Object {
        &self.instance
    }

    /// The root observer, unless observation was disabled at creation.
    #[must_use]
    pub fn root_observer(&self) -> Option<&Rc<Observer>> {
        self.root.as_ref()
    }

    /// Read a root data key.
    #[must_use]
    pub fn get(&self, key: &str) -> Value {
        self.data.get(key)
    }

    /// Write a root data key through [`weft_core::set`]. New keys are
    /// rejected with a warning.
    pub fn set(&self, key: &str, value: Value) -> Value {
        weft_core::set(&Value::from(self.data.clone()), key, value)
    }

    /// Watch `getter`, invoking `callback` with `(new, old)` on change.
    pub fn watch(
        &mut self,
        getter: impl Fn() -> Value + 'static,
        callback: Option<WatchCallback>,
        options: WatcherOptions,
    ) -> Result<Rc<Watcher>> {
        self.ensure_live()?;
        let watcher = Watcher::new(getter, callback, options);
        self.watchers.push(Rc::clone(&watcher));
        Ok(watcher)
    }

    /// Watch a dot-delimited path into the root data, such as `"user.name"`.
    pub fn watch_path(
        &mut self,
        path: &str,
        callback: Option<WatchCallback>,
        options: WatcherOptions,
    ) -> Result<Rc<Watcher>> {
        self.ensure_live()?;
        let watcher = Watcher::for_path(Value::from(self.data.clone()), path, callback, options)?;
        self.watchers.push(Rc::clone(&watcher));
        Ok(watcher)
    }

    /// Create a computed value and expose it as `key` on the instance.
    pub fn computed(&mut self, key: &str, compute: impl Fn() -> Value + 'static) -> Result<Computed> {
        self.ensure_live()?;
        let computed = Computed::new(compute);
        if !computed.define_on(&self.instance, key) {
            tracing::warn!(target: "weft::app", key, "computed key already defined on the instance");
        }
        self.computeds.push(computed.clone());
        Ok(computed)
    }

    /// Install `plugin` once. Installing the same plugin again is a no-op.
    pub fn use_plugin(&mut self, plugin: Rc<dyn Plugin>, args: &[Value]) -> &mut Self {
        if self.plugins.contains(&plugin) {
            return self;
        }
        plugin.install(self, args);
        self.plugins.record(plugin);
        tracing::debug!(message = "app.plugin", installed = self.plugins.len());
        self
    }

    /// Number of distinct plugins installed.
    #[must_use]
    pub fn plugin_count(&self) -> usize {
        self.plugins.len()
    }

    /// Number of watchers owned by the app (computeds excluded).
    #[must_use]
    pub fn watcher_count(&self) -> usize {
        self.watchers.len()
    }

    /// Tear down every watcher and computed and release the root usage of
    /// the data. Idempotent.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        for watcher in self.watchers.drain(..) {
            watcher.teardown();
        }
        for computed in self.computeds.drain(..) {
            computed.teardown();
        }
        if let Some(root) = &self.root {
            root.release_root();
        }
        tracing::debug!(message = "app.destroy");
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    fn ensure_live(&self) -> Result<()> {
        if self.destroyed {
            Err(RuntimeError::Destroyed)
        } else {
            Ok(())
        }
    }
}

impl Drop for App {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("keys", &self.data.keys())
            .field("watchers", &self.watchers.len())
            .field("computeds", &self.computeds.len())
            .field("plugins", &self.plugins)
            .field("destroyed", &self.destroyed)
            .finish()
    }
}

fn proxy(instance: &Object, data: &Object, key: &str) {
    let name: Rc<str> = Rc::from(key);
    let (reader, writer) = (data.clone(), data.clone());
    let (read_key, write_key) = (Rc::clone(&name), name);
    instance.define_property(
        key,
        PropertyDescriptor::accessor(
            Some(Rc::new(move |_: &Object| reader.get(&read_key))),
            Some(Rc::new(move |_: &Object, v: Value| writer.assign(&write_key, v))),
        ),
    );
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use weft_core::config::{ReactivityConfig, override_config};

    fn app() -> App {
        App::new(Object::from_entries([("count", 1), ("step", 2)]))
    }

    #[test]
    fn data_is_root_and_proxied() {
        let app = app();
        let root = app.root_observer().expect("observed");
        assert!(root.is_root());
        assert_eq!(app.instance().get("count").as_number(), Some(1.0));
        app.instance().assign("count", Value::from(5));
        assert_eq!(app.get("count").as_number(), Some(5.0));
        assert_eq!(app.instance().kind(), ObjectKind::Instance);
    }

    #[test]
    fn adding_root_keys_warns() {
        let warnings = Rc::new(Cell::new(0));
        let sink = Rc::clone(&warnings);
        let _cfg = override_config(ReactivityConfig::default().with_warn_handler(move |_| sink.set(sink.get() + 1)));
        let app = app();
        app.set("missing", Value::from(1));
        assert!(!app.data().has_own("missing"));
        weft_core::set(&Value::from(app.instance().clone()), "other", Value::from(1));
        assert_eq!(warnings.get(), 2);

        app.set("count", Value::from(3));
        assert_eq!(app.get("count").as_number(), Some(3.0));
        assert_eq!(warnings.get(), 2);
    }

    #[test]
    fn watchers_are_torn_down_on_destroy() {
        let mut app = app();
        let data = app.data().clone();
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        let watcher = app
            .watch(
                move || data.get("count"),
                Some(Box::new(move |_: &Value, _: &Value| counter.set(counter.get() + 1))),
                WatcherOptions::default(),
            )
            .expect("live app");
        app.set("count", Value::from(2));
        assert_eq!(hits.get(), 1);

        let root = Rc::clone(app.root_observer().expect("observed"));
        app.destroy();
        assert!(!watcher.is_active());
        assert!(!root.is_root());
        app.data().assign("count", Value::from(3));
        assert_eq!(hits.get(), 1);
        assert_eq!(
            app.watch(|| Value::Undefined, None, WatcherOptions::default()).err(),
            Some(RuntimeError::Destroyed)
        );
    }

    #[test]
    fn drop_destroys() {
        let data = Object::from_entries([("a", 1)]);
        let ob = {
            let app = App::new(data.clone());
            Rc::clone(app.root_observer().expect("observed"))
        };
        assert_eq!(ob.vm_count(), 0);
    }

    #[test]
    fn watch_path_reads_nested_data() {
        let mut app = App::new(Object::from_entries([(
            "user",
            Value::from(Object::from_entries([("name", "ada")])),
        )]));
        let seen = Rc::new(RefCell::new(String::new()));
        let sink = Rc::clone(&seen);
        let _w = app
            .watch_path(
                "user.name",
                Some(Box::new(move |new: &Value, _: &Value| *sink.borrow_mut() = new.to_string())),
                WatcherOptions::default(),
            )
            .expect("valid path");
        let user = app.get("user");
        user.as_object().expect("object").assign("name", Value::from("grace"));
        assert_eq!(&*seen.borrow(), "grace");
        assert!(app.watch_path("user[0]", None, WatcherOptions::default()).is_err());
    }

    #[test]
    fn computed_is_exposed_on_instance() {
        let mut app = app();
        let data = app.data().clone();
        app.computed("total", move || {
            let count = data.get("count").as_number().unwrap_or(0.0);
            let step = data.get("step").as_number().unwrap_or(0.0);
            Value::from(count * step)
        })
        .expect("live app");
        assert_eq!(app.instance().get("total").as_number(), Some(2.0));
        app.set("step", Value::from(10));
        assert_eq!(app.instance().get("total").as_number(), Some(10.0));
    }

    #[test]
    fn plugins_install_once() {
        let runs = Rc::new(Cell::new(0));
        let counter = Rc::clone(&runs);
        let plugin: Rc<dyn Plugin> = Rc::new(move |app: &mut App, args: &[Value]| {
            counter.set(counter.get() + 1);
            assert_eq!(args.len(), 1);
            assert!(!app.is_destroyed());
        });
        let mut app = app();
        app.use_plugin(Rc::clone(&plugin), &[Value::from(1)])
            .use_plugin(Rc::clone(&plugin), &[Value::from(1)]);
        assert_eq!(runs.get(), 1);
        assert_eq!(app.plugin_count(), 1);
    }
}
