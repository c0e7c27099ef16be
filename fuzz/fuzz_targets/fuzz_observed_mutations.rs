#![no_main]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use weft_core::config::{ReactivityConfig, override_config};
use weft_core::{Array, Dep, DepId, Object, Subscriber, SubscriberId, TargetGuard, Value, del, observe, set};

const KEYS: [&str; 4] = ["a", "b", "c", "d"];

#[derive(Arbitrary, Debug)]
enum Leaf {
    Num(i8),
    Text(bool),
    Nothing,
    NewObject,
    NewArray,
    Root,
}

#[derive(Arbitrary, Debug)]
enum Op {
    Push(Leaf),
    Pop,
    Shift,
    Unshift(Leaf),
    Splice { start: i8, count: u8, item: Option<Leaf> },
    Sort,
    Reverse,
    Assign { key: u8, leaf: Leaf },
    Set { key: u8, leaf: Leaf },
    Del { key: u8 },
    SetIndex { index: u8, leaf: Leaf },
    DelIndex { index: u8 },
    Read { key: u8 },
}

struct Reader {
    id: SubscriberId,
    joined: RefCell<Vec<DepId>>,
    hits: Cell<u32>,
}

impl Subscriber for Reader {
    fn id(&self) -> SubscriberId {
        self.id
    }

    fn add_dep(self: Rc<Self>, dep: Rc<Dep>) {
        if !self.joined.borrow().contains(&dep.id()) {
            self.joined.borrow_mut().push(dep.id());
            dep.add_sub(self);
        }
    }

    fn update(&self) {
        self.hits.set(self.hits.get().saturating_add(1));
    }
}

fn leaf(leaf: &Leaf, root: &Object) -> Value {
    match leaf {
        Leaf::Num(n) => Value::from(i32::from(*n)),
        Leaf::Text(b) => Value::from(if *b { "x" } else { "" }),
        Leaf::Nothing => Value::Null,
        Leaf::NewObject => Value::from(Object::from_entries([("a", 1)])),
        Leaf::NewArray => Value::from(Array::from_vec(vec![Value::from(1)])),
        Leaf::Root => Value::from(root.clone()),
    }
}

fn key(k: u8) -> &'static str {
    KEYS[usize::from(k) % KEYS.len()]
}

fuzz_target!(|ops: Vec<Op>| {
    let _cfg = override_config(ReactivityConfig::default().with_silent(true));
    let list = Array::new();
    let root = Object::from_entries([("list", Value::from(list.clone()))]);
    observe(&Value::from(root.clone()), false);

    let reader = Rc::new(Reader {
        id: SubscriberId::next(),
        joined: RefCell::new(Vec::new()),
        hits: Cell::new(0),
    });
    let list_value = Value::from(list.clone());
    let root_value = Value::from(root.clone());

    for op in ops.iter().take(256) {
        match op {
            Op::Push(l) => {
                list.push([leaf(l, &root)]);
            }
            Op::Pop => {
                list.pop();
            }
            Op::Shift => {
                list.shift();
            }
            Op::Unshift(l) => {
                list.unshift([leaf(l, &root)]);
            }
            Op::Splice { start, count, item } => {
                let items: Vec<Value> = item.iter().map(|l| leaf(l, &root)).collect();
                list.splice(isize::from(*start), usize::from(*count), items);
            }
            Op::Sort => list.sort(),
            Op::Reverse => list.reverse(),
            Op::Assign { key: k, leaf: l } => root.assign(key(*k), leaf(l, &root)),
            Op::Set { key: k, leaf: l } => {
                set(&root_value, key(*k), leaf(l, &root));
            }
            Op::Del { key: k } => del(&root_value, key(*k)),
            Op::SetIndex { index, leaf: l } => {
                set(&list_value, usize::from(*index % 32), leaf(l, &root));
            }
            Op::DelIndex { index } => del(&list_value, usize::from(*index % 32)),
            Op::Read { key: k } => {
                let _guard = TargetGuard::enter(Some(reader.clone()));
                let _ = root.get(key(*k));
                let _ = root.get("list");
            }
        }
        assert!(list.observer().is_some());
        for item in list.to_vec() {
            if let Value::Object(o) = &item {
                assert!(o.observer().is_some());
            }
        }
    }
});
