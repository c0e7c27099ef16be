#![forbid(unsafe_code)]

//! Property-based tests for array interception against a `Vec` model.
//!
//! For any sequence of mutating calls on an observed array:
//!
//! 1. The array contents match the same calls applied to a plain `Vec`.
//! 2. Every call notifies the array's observer dep exactly once.
//! 3. Every object inserted through `push`/`unshift`/`splice` is observed.
//! 4. Returned values (lengths, removed elements) match the model.
//! 5. An unobserved array behaves identically but notifies nothing.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use proptest::prelude::*;
use rustc_hash::FxHashSet;
use weft_core::{Array, Dep, DepId, Object, Subscriber, SubscriberId, TargetGuard, Value, observe};

// ── Counting subscriber ─────────────────────────────────────────────────

struct Counter {
    id: SubscriberId,
    hits: Cell<usize>,
    joined: RefCell<FxHashSet<DepId>>,
}

impl Counter {
    fn new() -> Rc<Self> {
        Rc::new(Self {
            id: SubscriberId::next(),
            hits: Cell::new(0),
            joined: RefCell::new(FxHashSet::default()),
        })
    }
}

impl Subscriber for Counter {
    fn id(&self) -> SubscriberId {
        self.id
    }

    fn add_dep(self: Rc<Self>, dep: Rc<Dep>) {
        if self.joined.borrow_mut().insert(dep.id()) {
            dep.add_sub(self);
        }
    }

    fn update(&self) {
        self.hits.set(self.hits.get() + 1);
    }
}

// ── Strategies ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Op {
    Push(Vec<i32>),
    PushObject,
    Pop,
    Shift,
    Unshift(Vec<i32>),
    Splice(isize, usize, Vec<i32>),
    Sort,
    Reverse,
}

fn op() -> impl Strategy<Value = Op> {
    let items = || proptest::collection::vec(-50i32..50, 0..4);
    prop_oneof![
        items().prop_map(Op::Push),
        Just(Op::PushObject),
        Just(Op::Pop),
        Just(Op::Shift),
        items().prop_map(Op::Unshift),
        (-8isize..8, 0usize..5, items()).prop_map(|(s, d, i)| Op::Splice(s, d, i)),
        Just(Op::Sort),
        Just(Op::Reverse),
    ]
}

fn ops() -> impl Strategy<Value = (Vec<i32>, Vec<Op>)> {
    (
        proptest::collection::vec(-50i32..50, 0..8),
        proptest::collection::vec(op(), 0..40),
    )
}

// ── Model ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Slot {
    Num(f64),
    Obj,
}

fn values(items: &[i32]) -> Vec<Value> {
    items.iter().map(|&n| Value::from(n)).collect()
}

fn slots(items: &[i32]) -> Vec<Slot> {
    items.iter().map(|&n| Slot::Num(f64::from(n))).collect()
}

fn snapshot(array: &Array) -> Vec<Slot> {
    array
        .to_vec()
        .iter()
        .map(|v| v.as_number().map_or(Slot::Obj, Slot::Num))
        .collect()
}

fn sort_key(slot: &Slot) -> String {
    match slot {
        Slot::Num(n) => Value::from(*n).to_string(),
        Slot::Obj => "[object Object]".to_string(),
    }
}

/// Apply `op` to both the array and the model; returns inserted objects.
fn apply(array: &Array, model: &mut Vec<Slot>, op: &Op) -> Vec<Object> {
    let mut inserted = Vec::new();
    match op {
        Op::Push(items) => {
            let len = array.push(values(items));
            model.extend(slots(items));
            assert_eq!(len, model.len());
        }
        Op::PushObject => {
            let object = Object::from_entries([("n", 1)]);
            array.push([Value::from(object.clone())]);
            model.push(Slot::Obj);
            inserted.push(object);
        }
        Op::Pop => {
            let removed = array.pop();
            let expected = model.pop();
            assert_eq!(removed.is_nullish(), expected.is_none());
        }
        Op::Shift => {
            let removed = array.shift();
            let expected = (!model.is_empty()).then(|| model.remove(0));
            assert_eq!(removed.is_nullish(), expected.is_none());
        }
        Op::Unshift(items) => {
            let len = array.unshift(values(items));
            model.splice(0..0, slots(items));
            assert_eq!(len, model.len());
        }
        Op::Splice(start, count, items) => {
            let removed = array.splice(*start, *count, values(items));
            let len = model.len();
            let s = if *start < 0 {
                len.saturating_sub(start.unsigned_abs())
            } else {
                start.unsigned_abs().min(len)
            };
            let e = s + (*count).min(len - s);
            let expected: Vec<Slot> = model.splice(s..e, slots(items)).collect();
            assert_eq!(removed.len(), expected.len());
        }
        Op::Sort => {
            array.sort();
            model.sort_by_key(sort_key);
        }
        Op::Reverse => {
            array.reverse();
            model.reverse();
        }
    }
    inserted
}

// ═════════════════════════════════════════════════════════════════════════
// 1–4. Observed array matches the model and notifies once per call
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn observed_array_matches_model((initial, ops) in ops()) {
        let array = Array::from_vec(values(&initial));
        let ob = observe(&Value::from(array.clone()), false).expect("array is observable");
        let counter = Counter::new();
        {
            let _guard = TargetGuard::enter(Some(counter.clone()));
            ob.dep().depend();
        }

        let mut model = slots(&initial);
        let mut objects = Vec::new();
        for op in &ops {
            objects.extend(apply(&array, &mut model, op));
            prop_assert_eq!(&snapshot(&array), &model);
        }

        prop_assert_eq!(counter.hits.get(), ops.len());
        for object in &objects {
            prop_assert!(object.observer().is_some());
            prop_assert!(object.is_reactive("n"));
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Unobserved arrays are plain lists
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn unobserved_array_matches_model((initial, ops) in ops()) {
        let array = Array::from_vec(values(&initial));
        let mut model = slots(&initial);
        for op in &ops {
            for object in apply(&array, &mut model, op) {
                prop_assert!(object.observer().is_none());
            }
        }
        prop_assert_eq!(snapshot(&array), model);
        prop_assert!(array.observer().is_none());
    }
}
