#![forbid(unsafe_code)]

//! Array mutation interception.
//!
//! Element writes by index cannot be intercepted, so observed arrays report
//! changes through their mutating methods instead. Each method:
//!
//! 1. performs the native mutation and keeps its result,
//! 2. observes the newly inserted elements (`push`, `unshift`, `splice`),
//! 3. notifies the array's observer dep exactly once,
//! 4. returns the native result.
//!
//! Steps 2 and 3 only happen once the array carries an [`Observer`]; on an
//! unobserved array the methods are plain list operations. Attaching the
//! observer is what installs the interception.
//!
//! [`Observer`]: crate::observer::Observer

use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use crate::observer::Observer;
use crate::value::{Array, Value};

/// Comparator for [`Array::sort_by`].
pub type Comparator = Rc<dyn Fn(&Value, &Value) -> Ordering>;

/// The intercepted operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayMethod {
    Push,
    Pop,
    Shift,
    Unshift,
    Splice,
    Sort,
    Reverse,
}

impl ArrayMethod {
    pub const ALL: [Self; 7] = [
        Self::Push,
        Self::Pop,
        Self::Shift,
        Self::Unshift,
        Self::Splice,
        Self::Sort,
        Self::Reverse,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Push => "push",
            Self::Pop => "pop",
            Self::Shift => "shift",
            Self::Unshift => "unshift",
            Self::Splice => "splice",
            Self::Sort => "sort",
            Self::Reverse => "reverse",
        }
    }

    /// Whether the operation can insert elements.
    #[must_use]
    pub const fn inserts(self) -> bool {
        matches!(self, Self::Push | Self::Unshift | Self::Splice)
    }
}

impl fmt::Display for ArrayMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Array {
    /// Append `items`; returns the new length.
    pub fn push(&self, items: impl IntoIterator<Item = Value>) -> usize {
        let inserted: Vec<Value> = items.into_iter().collect();
        let len = {
            let mut data = self.data().borrow_mut();
            data.items.extend(inserted.iter().cloned());
            data.items.len()
        };
        self.intercepted(ArrayMethod::Push, &inserted);
        len
    }

    /// Remove and return the last element (`Undefined` when empty).
    pub fn pop(&self) -> Value {
        let removed = self.data().borrow_mut().items.pop().unwrap_or_default();
        self.intercepted(ArrayMethod::Pop, &[]);
        removed
    }

    /// Remove and return the first element (`Undefined` when empty).
    pub fn shift(&self) -> Value {
        let removed = {
            let mut data = self.data().borrow_mut();
            if data.items.is_empty() {
                Value::Undefined
            } else {
                data.items.remove(0)
            }
        };
        self.intercepted(ArrayMethod::Shift, &[]);
        removed
    }

    /// Prepend `items`, keeping their order; returns the new length.
    pub fn unshift(&self, items: impl IntoIterator<Item = Value>) -> usize {
        let inserted: Vec<Value> = items.into_iter().collect();
        let len = {
            let mut data = self.data().borrow_mut();
            data.items.splice(0..0, inserted.iter().cloned());
            data.items.len()
        };
        self.intercepted(ArrayMethod::Unshift, &inserted);
        len
    }

    /// Remove up to `delete_count` elements starting at `start` and insert
    /// `items` in their place; returns the removed elements.
    ///
    /// A negative `start` counts from the end. Both bounds are clamped to
    /// the array.
    pub fn splice(
        &self,
        start: isize,
        delete_count: usize,
        items: impl IntoIterator<Item = Value>,
    ) -> Vec<Value> {
        let inserted: Vec<Value> = items.into_iter().collect();
        let removed = {
            let mut data = self.data().borrow_mut();
            let len = data.items.len();
            let start = if start < 0 {
                len.saturating_sub(start.unsigned_abs())
            } else {
                start.unsigned_abs().min(len)
            };
            let end = start + delete_count.min(len - start);
            data.items
                .splice(start..end, inserted.iter().cloned())
                .collect()
        };
        self.intercepted(ArrayMethod::Splice, &inserted);
        removed
    }

    /// Sort by string conversion, `Undefined` last.
    pub fn sort(&self) {
        self.sort_with(default_compare);
    }

    /// Sort with `compare`, `Undefined` last. The sort is stable.
    pub fn sort_by(&self, compare: Comparator) {
        self.sort_with(|a, b| compare(a, b));
    }

    fn sort_with(&self, compare: impl Fn(&Value, &Value) -> Ordering) {
        // Sort a copy outside the borrow: the comparator may read the array,
        // and a panicking comparator must leave the elements in place.
        let mut items = self.data().borrow().items.clone();
        items.sort_by(|a, b| match (a, b) {
            (Value::Undefined, Value::Undefined) => Ordering::Equal,
            (Value::Undefined, _) => Ordering::Greater,
            (_, Value::Undefined) => Ordering::Less,
            _ => compare(a, b),
        });
        self.data().borrow_mut().items = items;
        self.intercepted(ArrayMethod::Sort, &[]);
    }

    /// Reverse in place.
    pub fn reverse(&self) {
        self.data().borrow_mut().items.reverse();
        self.intercepted(ArrayMethod::Reverse, &[]);
    }

    fn intercepted(&self, method: ArrayMethod, inserted: &[Value]) {
        let Some(ob) = self.observer() else {
            return;
        };
        if method.inserts() && !inserted.is_empty() {
            Observer::observe_array(inserted);
        }
        tracing::trace!(
            message = "array.mutate",
            method = method.as_str(),
            inserted = inserted.len(),
            dep = ob.dep().id().raw()
        );
        ob.dep().notify();
    }
}

/// Compares string conversions by UTF-16 code units, as JavaScript does.
fn default_compare(a: &Value, b: &Value) -> Ordering {
    a.to_string().encode_utf16().cmp(b.to_string().encode_utf16())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::observe;
    use crate::testing::Probe;
    use crate::value::Object;
    use std::cell::RefCell;

    fn numbers(values: &[i32]) -> Array {
        Array::from_vec(values.iter().map(|&n| Value::from(n)).collect())
    }

    fn as_numbers(array: &Array) -> Vec<f64> {
        array.to_vec().iter().filter_map(Value::as_number).collect()
    }

    /// An observed array and a probe subscribed to its observer dep.
    fn watched(values: &[i32]) -> (Array, Rc<Probe>) {
        let array = numbers(values);
        let ob = observe(&Value::from(array.clone()), false).expect("array is observable");
        let probe = Probe::new();
        probe.track(|| ob.dep().depend());
        (array, probe)
    }

    #[test]
    fn push_notifies_once_and_observes_new_element() {
        let (array, probe) = watched(&[1, 2, 3]);
        let element = Object::new();
        let len = array.push([Value::from(4), Value::from(element.clone())]);
        assert_eq!(len, 5);
        assert_eq!(array.len(), 5);
        assert!(element.observer().is_some());
        assert_eq!(probe.updates(), 1);
    }

    #[test]
    fn push_single_value() {
        let (array, probe) = watched(&[1, 2, 3]);
        assert_eq!(array.push([Value::from(4)]), 4);
        assert_eq!(as_numbers(&array), vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(probe.updates(), 1);
    }

    #[test]
    fn pop_and_shift_return_removed() {
        let (array, probe) = watched(&[1, 2, 3]);
        assert_eq!(array.pop().as_number(), Some(3.0));
        assert_eq!(array.shift().as_number(), Some(1.0));
        assert_eq!(as_numbers(&array), vec![2.0]);
        assert_eq!(probe.updates(), 2);
    }

    #[test]
    fn pop_on_empty_still_notifies() {
        let (array, probe) = watched(&[]);
        assert!(array.pop().is_nullish());
        assert!(array.shift().is_nullish());
        assert_eq!(probe.updates(), 2);
    }

    #[test]
    fn unshift_keeps_order() {
        let (array, probe) = watched(&[3]);
        assert_eq!(array.unshift([Value::from(1), Value::from(2)]), 3);
        assert_eq!(as_numbers(&array), vec![1.0, 2.0, 3.0]);
        assert_eq!(probe.updates(), 1);
    }

    #[test]
    fn splice_replaces_range() {
        let (array, probe) = watched(&[1, 2, 3, 4]);
        let element = Object::new();
        let removed = array.splice(1, 2, [Value::from(element.clone())]);
        assert_eq!(removed.iter().filter_map(Value::as_number).collect::<Vec<_>>(), vec![2.0, 3.0]);
        assert_eq!(array.len(), 3);
        assert!(element.observer().is_some());
        assert_eq!(probe.updates(), 1);
    }

    #[test]
    fn splice_clamps_and_supports_negative_start() {
        let array = numbers(&[1, 2, 3]);
        let removed = array.splice(-1, 10, []);
        assert_eq!(removed.len(), 1);
        assert_eq!(as_numbers(&array), vec![1.0, 2.0]);
        let removed = array.splice(10, 1, [Value::from(9)]);
        assert!(removed.is_empty());
        assert_eq!(as_numbers(&array), vec![1.0, 2.0, 9.0]);
        array.splice(-10, 1, []);
        assert_eq!(as_numbers(&array), vec![2.0, 9.0]);
    }

    #[test]
    fn sort_uses_string_order_by_default() {
        let (array, probe) = watched(&[10, 9, 1]);
        array.push([Value::Undefined]);
        array.sort();
        let rendered: Vec<String> = array.to_vec().iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["1", "10", "9", "undefined"]);
        assert_eq!(probe.updates(), 2);
    }

    #[test]
    fn sort_by_comparator() {
        let (array, probe) = watched(&[3, 1, 2]);
        array.sort_by(Rc::new(|a: &Value, b: &Value| {
            let (a, b) = (a.as_number().unwrap_or(0.0), b.as_number().unwrap_or(0.0));
            b.total_cmp(&a)
        }));
        assert_eq!(as_numbers(&array), vec![3.0, 2.0, 1.0]);
        assert_eq!(probe.updates(), 1);
    }

    #[test]
    fn default_sort_orders_by_utf16_units() {
        // U+1F600 encodes as a surrogate pair (0xD83D ...), below U+FF61.
        let array = Array::from_vec(vec![Value::from("\u{FF61}"), Value::from("\u{1F600}")]);
        array.sort();
        assert_eq!(array.get(0).as_str(), Some("\u{1F600}"));
    }

    #[test]
    fn comparator_sees_the_unsorted_array() {
        let (array, _probe) = watched(&[3, 1, 2]);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let (sink, reader) = (Rc::clone(&seen), array.clone());
        array.sort_by(Rc::new(move |a: &Value, b: &Value| {
            sink.borrow_mut().push(reader.len());
            let (a, b) = (a.as_number().unwrap_or(0.0), b.as_number().unwrap_or(0.0));
            a.total_cmp(&b)
        }));
        assert!(!seen.borrow().is_empty());
        assert!(seen.borrow().iter().all(|&len| len == 3));
        assert_eq!(as_numbers(&array), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn panicking_comparator_keeps_elements() {
        let (array, probe) = watched(&[3, 1, 2]);
        let target = array.clone();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            target.sort_by(Rc::new(|_: &Value, _: &Value| panic!("comparator failed")));
        }));
        assert!(result.is_err());
        assert_eq!(as_numbers(&array), vec![3.0, 1.0, 2.0]);
        assert_eq!(probe.updates(), 0);
        array.push([Value::from(4)]);
        assert_eq!(array.len(), 4);
    }

    #[test]
    fn reverse_notifies() {
        let (array, probe) = watched(&[1, 2, 3]);
        array.reverse();
        assert_eq!(as_numbers(&array), vec![3.0, 2.0, 1.0]);
        assert_eq!(probe.updates(), 1);
    }

    #[test]
    fn unobserved_array_is_plain() {
        let array = numbers(&[1]);
        let element = Object::new();
        array.push([Value::from(element.clone())]);
        assert!(element.observer().is_none());
        assert!(array.observer().is_none());
    }

    #[test]
    fn method_names() {
        assert_eq!(ArrayMethod::ALL.len(), 7);
        assert_eq!(ArrayMethod::Splice.to_string(), "splice");
        assert!(ArrayMethod::Unshift.inserts());
        assert!(!ArrayMethod::Reverse.inserts());
    }
}
