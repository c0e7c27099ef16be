#![forbid(unsafe_code)]

//! End-to-end reactivity scenarios across the core and the runtime.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use tracing_subscriber::Layer;
use tracing_subscriber::layer::{Context, SubscriberExt};
use weft_core::config::{ReactivityConfig, override_config};
use weft_core::testing::Probe;
use weft_core::{Array, Object, Value, del, observe, pop_target, push_target, set};
use weft_runtime::{App, Computed, Watcher, WatcherOptions};

fn counter() -> (Rc<Cell<usize>>, weft_runtime::WatchCallback) {
    let hits = Rc::new(Cell::new(0));
    let sink = Rc::clone(&hits);
    (hits, Box::new(move |_: &Value, _: &Value| sink.set(sink.get() + 1)))
}

#[test]
fn sync_updates_run_in_creation_order() {
    let _cfg = override_config(ReactivityConfig::default().with_async_updates(false));
    let data = Object::from_entries([("title", "a")]);
    observe(&Value::from(data.clone()), true);

    let log = Rc::new(RefCell::new(Vec::new()));
    let parent = Probe::with_log(Rc::clone(&log));
    let child = Probe::with_log(Rc::clone(&log));

    // The child subscribes first; delivery still follows creation order.
    child.track(|| data.get("title"));
    parent.track(|| data.get("title"));

    data.assign("title", Value::from("b"));
    assert_eq!(*log.borrow(), vec![parent.id(), child.id()]);
}

#[test]
fn nested_evaluation_restores_outer_context() {
    let data = Object::from_entries([("x", 1), ("y", 2)]);
    observe(&Value::from(data.clone()), false);
    let outer = Probe::new();
    let inner = Probe::new();

    push_target(Some(outer.clone()));
    data.get("x");
    push_target(Some(inner.clone()));
    data.get("y");
    pop_target();
    data.get("y");
    pop_target();

    assert_eq!(outer.dep_count(), 2);
    assert_eq!(inner.dep_count(), 1);
}

#[test]
fn list_rendering_reacts_to_interception_and_helpers() {
    let items = Array::from_vec(vec![Value::from(Object::from_entries([("done", false)]))]);
    let data = Object::from_entries([("items", Value::from(items.clone()))]);
    let mut app = App::new(data);

    let source = app.data().clone();
    let rendered = Rc::new(RefCell::new(String::new()));
    let sink = Rc::clone(&rendered);
    let render = move || {
        let list = source.get("items");
        let text = list
            .as_array()
            .map(|a| {
                a.to_vec()
                    .iter()
                    .map(|item| {
                        let done = item.as_object().map(|o| o.get("done")).unwrap_or_default();
                        if done.as_bool() == Some(true) { "x" } else { "o" }
                    })
                    .collect::<String>()
            })
            .unwrap_or_default();
        Value::from(text)
    };
    let _view = app
        .watch(
            render,
            Some(Box::new(move |new: &Value, _: &Value| *sink.borrow_mut() = new.to_string())),
            WatcherOptions::default(),
        )
        .expect("live app");

    items.push([Value::from(Object::from_entries([("done", false)]))]);
    assert_eq!(&*rendered.borrow(), "oo");

    // Element property written after the push: the element was observed on
    // insertion, so the view depends on it.
    items.get(1).as_object().expect("object").assign("done", Value::from(true));
    assert_eq!(&*rendered.borrow(), "ox");

    set(&Value::from(items.clone()), 0, Value::from(Object::from_entries([("done", true)])));
    assert_eq!(&*rendered.borrow(), "xx");

    del(&Value::from(items.clone()), 0);
    assert_eq!(&*rendered.borrow(), "x");
}

#[test]
fn set_then_reassign_new_key_notifies_reader() {
    let nested = Object::from_entries([("a", 1)]);
    let data = Object::from_entries([("nested", Value::from(nested.clone()))]);
    let mut app = App::new(data);
    let source = app.data().clone();
    let (hits, callback) = counter();
    let _w = app
        .watch(
            move || source.get("nested").as_object().map(|o| o.get("fresh")).unwrap_or_default(),
            Some(callback),
            WatcherOptions::default(),
        )
        .expect("live app");

    set(&Value::from(nested.clone()), "fresh", Value::from(1));
    assert_eq!(hits.get(), 1);
    nested.assign("fresh", Value::from(2));
    assert_eq!(hits.get(), 2);
}

#[test]
fn deep_watch_on_app_data() {
    let settings = Object::from_entries([("theme", "dark")]);
    let mut app = App::new(Object::from_entries([("settings", Value::from(settings.clone()))]));
    let source = app.data().clone();
    let (hits, callback) = counter();
    let _w = app
        .watch(
            move || source.get("settings"),
            Some(callback),
            WatcherOptions::default().with_deep(true),
        )
        .expect("live app");
    settings.assign("theme", Value::from("light"));
    set(&Value::from(settings.clone()), "font", Value::from("mono"));
    del(&Value::from(settings), "theme");
    assert_eq!(hits.get(), 3);
}

#[test]
fn computed_chain_with_shared_source() {
    let data = Object::from_entries([("price", 10), ("qty", 3)]);
    observe(&Value::from(data.clone()), false);
    let (p, q) = (data.clone(), data.clone());
    let subtotal = Computed::new(move || {
        Value::from(p.get("price").as_number().unwrap_or(0.0) * q.get("qty").as_number().unwrap_or(0.0))
    });
    let s = subtotal.clone();
    let total = Computed::new(move || Value::from(s.get().as_number().unwrap_or(0.0) * 1.5));
    assert_eq!(total.get().as_number(), Some(45.0));
    data.assign("qty", Value::from(4));
    assert_eq!(total.get().as_number(), Some(60.0));
    assert_eq!(subtotal.version(), 2);
}

// ── Event capture ───────────────────────────────────────────────────────

struct WarnCapture {
    targets: Arc<Mutex<Vec<String>>>,
}

impl<S> Layer<S> for WarnCapture
where
    S: tracing::Subscriber + for<'lookup> tracing_subscriber::registry::LookupSpan<'lookup>,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == tracing::Level::WARN {
            self.targets
                .lock()
                .expect("capture lock")
                .push(event.metadata().target().to_string());
        }
    }
}

#[test]
fn runaway_callback_loop_is_reported() {
    let targets = Arc::new(Mutex::new(Vec::new()));
    let subscriber = tracing_subscriber::registry().with(WarnCapture {
        targets: Arc::clone(&targets),
    });
    let _guard = tracing::subscriber::set_default(subscriber);

    let data = Object::from_entries([("n", 0)]);
    observe(&Value::from(data.clone()), false);
    let (source, writer) = (data.clone(), data.clone());
    let _w = Watcher::new(
        move || source.get("n"),
        Some(Box::new(move |new: &Value, _: &Value| {
            writer.assign("n", Value::from(new.as_number().unwrap_or(0.0) + 1.0));
        })),
        WatcherOptions::default(),
    );
    data.assign("n", Value::from(1));

    let targets = targets.lock().expect("capture lock");
    assert_eq!(targets.as_slice(), ["weft::watcher".to_string()]);
}
