#![forbid(unsafe_code)]

//! The dynamic value model that observable state is built from.
//!
//! [`Value`] is either a primitive or a handle to a shared container:
//!
//! - [`Object`]: an insertion-ordered property table. Every read and write of
//!   a property routes through the table, which is where reactive slots
//!   intercept access.
//! - [`Array`]: an ordered list. Element access by index is not intercepted;
//!   the mutating methods (see [`crate::array`]) are.
//!
//! Containers compare by identity: two handles are the same container only
//! if they point at the same allocation.
//!
//! # Invariants
//!
//! 1. No `RefCell` borrow of a container is held while user code (an
//!    accessor, a reactive slot, a comparator) runs.
//! 2. A container carries at most one [`Observer`] tag, set once.
//! 3. Non-configurable properties can be neither redefined nor deleted.
//! 4. A non-extensible container never gains new properties.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use bitflags::bitflags;
use indexmap::IndexMap;

use crate::error::ReactivityError;
use crate::observer::Observer;
use crate::reactive::ReactiveSlot;

/// Accessor read function. Receives the object the property lives on.
pub type Getter = Rc<dyn Fn(&Object) -> Value>;
/// Accessor write function. Receives the object the property lives on.
pub type Setter = Rc<dyn Fn(&Object, Value)>;

// ─── Value ───────────────────────────────────────────────────────────────────

/// A dynamically typed value.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    Object(Object),
    Array(Array),
}

impl Value {
    /// Short name of the variant, used in diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Object(_) => "object",
            Self::Array(_) => "array",
        }
    }

    /// Whether this is an object or an array.
    #[must_use]
    pub fn is_container(&self) -> bool {
        matches!(self, Self::Object(_) | Self::Array(_))
    }

    /// Whether this is `undefined` or `null`.
    #[must_use]
    pub fn is_nullish(&self) -> bool {
        matches!(self, Self::Undefined | Self::Null)
    }

    #[must_use]
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The observer tag of a container value.
    #[must_use]
    pub fn observer(&self) -> Option<Rc<Observer>> {
        match self {
            Self::Object(o) => o.observer(),
            Self::Array(a) => a.observer(),
            _ => None,
        }
    }

    /// Strict identity: primitives by value, containers by allocation.
    /// `NaN` is not identical to itself.
    #[must_use]
    pub fn strict_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Undefined, Self::Undefined) | (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a.ptr_eq(b),
            (Self::Array(a), Self::Array(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// Whether writing `other` over `self` is a no-op: strict identity, or
    /// both values are `NaN`.
    #[must_use]
    pub fn identical(&self, other: &Self) -> bool {
        if let (Self::Number(a), Self::Number(b)) = (self, other)
            && a.is_nan()
            && b.is_nan()
        {
            return true;
        }
        self.strict_eq(other)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(Rc::from(s))
    }
}

impl From<Object> for Value {
    fn from(o: Object) -> Self {
        Self::Object(o)
    }
}

impl From<Array> for Value {
    fn from(a: Array) -> Self {
        Self::Array(a)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::Array(Array::from_vec(items))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

impl TryFrom<Value> for f64 {
    type Error = ReactivityError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        value
            .as_number()
            .ok_or_else(|| ReactivityError::type_mismatch("number", value.type_name()))
    }
}

impl TryFrom<Value> for bool {
    type Error = ReactivityError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        value
            .as_bool()
            .ok_or_else(|| ReactivityError::type_mismatch("bool", value.type_name()))
    }
}

impl TryFrom<Value> for Object {
    type Error = ReactivityError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(o) => Ok(o),
            other => Err(ReactivityError::type_mismatch("object", other.type_name())),
        }
    }
}

impl TryFrom<Value> for Array {
    type Error = ReactivityError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Array(a) => Ok(a),
            other => Err(ReactivityError::type_mismatch("array", other.type_name())),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => f.write_str("Undefined"),
            Self::Null => f.write_str("Null"),
            Self::Bool(b) => write!(f, "Bool({b})"),
            Self::Number(n) => write!(f, "Number({n})"),
            Self::String(s) => write!(f, "String({s:?})"),
            Self::Object(o) => fmt::Debug::fmt(o, f),
            Self::Array(a) => fmt::Debug::fmt(a, f),
        }
    }
}

/// String conversion used by the default array sort order.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut seen = Vec::new();
        write_display(self, f, &mut seen)
    }
}

fn write_display(value: &Value, f: &mut fmt::Formatter<'_>, seen: &mut Vec<usize>) -> fmt::Result {
    match value {
        Value::Undefined => f.write_str("undefined"),
        Value::Null => f.write_str("null"),
        Value::Bool(b) => write!(f, "{b}"),
        Value::Number(n) => write_number(*n, f),
        Value::String(s) => f.write_str(s),
        Value::Object(_) => f.write_str("[object Object]"),
        Value::Array(a) => {
            // A cycle renders as empty, like a join that meets itself.
            if seen.contains(&a.addr()) {
                return Ok(());
            }
            seen.push(a.addr());
            for (i, item) in a.to_vec().iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }
                if !item.is_nullish() {
                    write_display(item, f, seen)?;
                }
            }
            seen.pop();
            Ok(())
        }
    }
}

fn write_number(n: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if n.is_nan() {
        f.write_str("NaN")
    } else if n.is_infinite() {
        f.write_str(if n > 0.0 { "Infinity" } else { "-Infinity" })
    } else if n == 0.0 {
        f.write_str("0")
    } else {
        write!(f, "{n}")
    }
}

// ─── Keys ────────────────────────────────────────────────────────────────────

/// Largest valid array index (array lengths fit in a `u32`).
pub const MAX_ARRAY_INDEX: usize = u32::MAX as usize - 1;

/// A property key: an array index or a property name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Index(usize),
    Name(Rc<str>),
}

impl Key {
    /// The key as a valid array index, if it is one.
    ///
    /// Names qualify when the whole name, trimmed, is a finite non-negative
    /// integer (`"2"`, `"2.0"`). Trailing garbage such as `"2abc"` fails the
    /// finiteness check and is rejected. Indices above [`MAX_ARRAY_INDEX`]
    /// are not valid.
    #[must_use]
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Self::Index(i) => (*i <= MAX_ARRAY_INDEX).then_some(*i),
            Self::Name(name) => {
                let n: f64 = name.trim().parse().ok()?;
                (n.is_finite() && n >= 0.0 && n.fract() == 0.0 && n <= MAX_ARRAY_INDEX as f64)
                    .then_some(n as usize)
            }
        }
    }

    /// The key as a property name.
    #[must_use]
    pub fn to_name(&self) -> Rc<str> {
        match self {
            Self::Index(i) => Rc::from(i.to_string()),
            Self::Name(name) => Rc::clone(name),
        }
    }
}

impl From<usize> for Key {
    fn from(i: usize) -> Self {
        Self::Index(i)
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Self::Name(Rc::from(s))
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Self::Name(Rc::from(s))
    }
}

impl From<Rc<str>> for Key {
    fn from(s: Rc<str>) -> Self {
        Self::Name(s)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "{i}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

// ─── Property table ──────────────────────────────────────────────────────────

bitflags! {
    /// Attributes of a data or accessor property.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PropertyFlags: u8 {
        const WRITABLE = 1 << 0;
        const ENUMERABLE = 1 << 1;
        const CONFIGURABLE = 1 << 2;
    }
}

impl Default for PropertyFlags {
    fn default() -> Self {
        Self::all()
    }
}

/// A property definition supplied to [`Object::define_property`].
#[derive(Clone)]
pub enum PropertyDescriptor {
    Data {
        value: Value,
        flags: PropertyFlags,
    },
    Accessor {
        get: Option<Getter>,
        set: Option<Setter>,
        flags: PropertyFlags,
    },
}

impl PropertyDescriptor {
    /// A writable, enumerable, configurable data property.
    #[must_use]
    pub fn data(value: impl Into<Value>) -> Self {
        Self::Data {
            value: value.into(),
            flags: PropertyFlags::default(),
        }
    }

    /// An enumerable, configurable accessor property.
    #[must_use]
    pub fn accessor(get: Option<Getter>, set: Option<Setter>) -> Self {
        Self::Accessor {
            get,
            set,
            flags: PropertyFlags::ENUMERABLE | PropertyFlags::CONFIGURABLE,
        }
    }

    /// Replace the attribute flags.
    #[must_use]
    pub fn with_flags(self, flags: PropertyFlags) -> Self {
        match self {
            Self::Data { value, .. } => Self::Data { value, flags },
            Self::Accessor { get, set, .. } => Self::Accessor { get, set, flags },
        }
    }
}

#[derive(Clone)]
pub(crate) enum Property {
    Data {
        value: Value,
        flags: PropertyFlags,
    },
    Accessor {
        get: Option<Getter>,
        set: Option<Setter>,
        flags: PropertyFlags,
    },
    Reactive(Rc<ReactiveSlot>),
}

impl Property {
    pub(crate) fn flags(&self) -> PropertyFlags {
        match self {
            Self::Data { flags, .. } | Self::Accessor { flags, .. } => *flags,
            Self::Reactive(_) => PropertyFlags::all(),
        }
    }

    pub(crate) fn is_configurable(&self) -> bool {
        self.flags().contains(PropertyFlags::CONFIGURABLE)
    }
}

impl From<PropertyDescriptor> for Property {
    fn from(desc: PropertyDescriptor) -> Self {
        match desc {
            PropertyDescriptor::Data { value, flags } => Self::Data { value, flags },
            PropertyDescriptor::Accessor { get, set, flags } => Self::Accessor { get, set, flags },
        }
    }
}

// ─── Object ──────────────────────────────────────────────────────────────────

/// What an object is, as far as observation policy is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObjectKind {
    /// A plain keyed map: the only kind of object that gets observed.
    #[default]
    Plain,
    /// A top-level framework instance. Never observed; `set`/`del` refuse
    /// to change its shape.
    Instance,
    /// An internal node (render output, handles) excluded from observation.
    Opaque,
}

pub(crate) struct ObjectData {
    pub(crate) props: IndexMap<Rc<str>, Property>,
    kind: ObjectKind,
    extensible: bool,
    ob: Option<Rc<Observer>>,
}

/// Shared handle to a property table.
#[derive(Clone)]
pub struct Object(Rc<RefCell<ObjectData>>);

impl Object {
    /// An empty plain object.
    #[must_use]
    pub fn new() -> Self {
        Self::with_kind(ObjectKind::Plain)
    }

    /// An empty object of the given kind.
    #[must_use]
    pub fn with_kind(kind: ObjectKind) -> Self {
        Self(Rc::new(RefCell::new(ObjectData {
            props: IndexMap::new(),
            kind,
            extensible: true,
            ob: None,
        })))
    }

    /// A plain object with the given data properties, in order.
    pub fn from_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<Rc<str>>,
        V: Into<Value>,
    {
        let object = Self::new();
        {
            let mut data = object.0.borrow_mut();
            for (key, value) in entries {
                data.props.insert(
                    key.into(),
                    Property::Data {
                        value: value.into(),
                        flags: PropertyFlags::default(),
                    },
                );
            }
        }
        object
    }

    #[must_use]
    pub fn kind(&self) -> ObjectKind {
        self.0.borrow().kind
    }

    /// Read a property.
    ///
    /// Reactive slots record a dependency when a context is active; accessor
    /// properties call their getter; missing keys read as `Undefined`.
    pub fn get(&self, key: &str) -> Value {
        match self.property(key) {
            None => Value::Undefined,
            Some(Property::Data { value, .. }) => value,
            Some(Property::Accessor { get, .. }) => get.map_or(Value::Undefined, |g| g(self)),
            Some(Property::Reactive(slot)) => slot.get(self),
        }
    }

    /// Plain assignment.
    ///
    /// Existing reactive slots and accessors intercept the write. Assigning
    /// a missing key adds an ordinary data property (when extensible), which
    /// is *not* reactive; use [`crate::set`] for that.
    pub fn assign(&self, key: &str, value: Value) {
        match self.property(key) {
            Some(Property::Reactive(slot)) => slot.set(self, value),
            Some(Property::Accessor { set: Some(setter), .. }) => setter(self, value),
            Some(Property::Accessor { set: None, .. }) => {}
            Some(Property::Data { flags, .. }) => {
                if flags.contains(PropertyFlags::WRITABLE) {
                    let mut data = self.0.borrow_mut();
                    if let Some(Property::Data { value: slot, .. }) = data.props.get_mut(key) {
                        *slot = value;
                    }
                }
            }
            None => {
                let mut data = self.0.borrow_mut();
                if data.extensible {
                    data.props.insert(
                        Rc::from(key),
                        Property::Data {
                            value,
                            flags: PropertyFlags::default(),
                        },
                    );
                }
            }
        }
    }

    /// Define or redefine a property. Returns `false` when the existing
    /// property is non-configurable or the object is not extensible.
    pub fn define_property(&self, key: &str, descriptor: PropertyDescriptor) -> bool {
        self.put_property(key, descriptor.into())
    }

    /// Remove an own property. Returns `false` when it is non-configurable.
    pub fn delete(&self, key: &str) -> bool {
        let mut data = self.0.borrow_mut();
        match data.props.get(key) {
            None => true,
            Some(prop) if !prop.is_configurable() => false,
            Some(_) => {
                data.props.shift_remove(key);
                true
            }
        }
    }

    #[must_use]
    pub fn has_own(&self, key: &str) -> bool {
        self.0.borrow().props.contains_key(key)
    }

    /// Own enumerable keys in insertion order.
    #[must_use]
    pub fn keys(&self) -> Vec<Rc<str>> {
        self.0
            .borrow()
            .props
            .iter()
            .filter(|(_, p)| p.flags().contains(PropertyFlags::ENUMERABLE))
            .map(|(k, _)| Rc::clone(k))
            .collect()
    }

    /// Number of own properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.borrow().props.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flags of an own property, if present.
    #[must_use]
    pub fn property_flags(&self, key: &str) -> Option<PropertyFlags> {
        self.0.borrow().props.get(key).map(Property::flags)
    }

    /// Whether an own property is an intercepted reactive slot.
    #[must_use]
    pub fn is_reactive(&self, key: &str) -> bool {
        matches!(self.0.borrow().props.get(key), Some(Property::Reactive(_)))
    }

    #[must_use]
    pub fn is_extensible(&self) -> bool {
        self.0.borrow().extensible
    }

    /// Forbid adding new properties.
    pub fn prevent_extensions(&self) {
        self.0.borrow_mut().extensible = false;
    }

    /// The observer tag, if this object has been observed.
    #[must_use]
    pub fn observer(&self) -> Option<Rc<Observer>> {
        self.0.borrow().ob.clone()
    }

    /// Whether both handles point at the same object.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Address of the shared container, stable while any handle is alive.
    #[must_use]
    pub fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }

    pub(crate) fn property(&self, key: &str) -> Option<Property> {
        self.0.borrow().props.get(key).cloned()
    }

    pub(crate) fn put_property(&self, key: &str, prop: Property) -> bool {
        let mut data = self.0.borrow_mut();
        let extensible = data.extensible;
        match data.props.get_mut(key) {
            Some(existing) if !existing.is_configurable() => false,
            Some(existing) => {
                *existing = prop;
                true
            }
            None if !extensible => false,
            None => {
                data.props.insert(Rc::from(key), prop);
                true
            }
        }
    }

    pub(crate) fn set_observer(&self, ob: Rc<Observer>) {
        self.0.borrow_mut().ob = Some(ob);
    }

    pub(crate) fn downgrade(&self) -> Weak<RefCell<ObjectData>> {
        Rc::downgrade(&self.0)
    }

    pub(crate) fn from_inner(inner: Rc<RefCell<ObjectData>>) -> Self {
        Self(inner)
    }
}

impl Default for Object {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.0.borrow();
        f.debug_struct("Object")
            .field("kind", &data.kind)
            .field("keys", &data.props.keys().collect::<Vec<_>>())
            .field("observed", &data.ob.is_some())
            .finish()
    }
}

// ─── Array ───────────────────────────────────────────────────────────────────

pub(crate) struct ArrayData {
    pub(crate) items: Vec<Value>,
    extensible: bool,
    ob: Option<Rc<Observer>>,
}

/// Shared handle to an ordered list.
///
/// Index reads and [`Array::assign_index`] are plain, untracked access. The
/// mutating methods in [`crate::array`] notify dependents once the array is
/// observed.
#[derive(Clone)]
pub struct Array(Rc<RefCell<ArrayData>>);

impl Array {
    #[must_use]
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    #[must_use]
    pub fn from_vec(items: Vec<Value>) -> Self {
        Self(Rc::new(RefCell::new(ArrayData {
            items,
            extensible: true,
            ob: None,
        })))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.borrow().items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element at `index`, or `Undefined` past the end. Not tracked.
    #[must_use]
    pub fn get(&self, index: usize) -> Value {
        self.0.borrow().items.get(index).cloned().unwrap_or_default()
    }

    /// Snapshot of the elements.
    #[must_use]
    pub fn to_vec(&self) -> Vec<Value> {
        self.0.borrow().items.clone()
    }

    /// Plain index assignment, padding with `Undefined` past the end.
    ///
    /// Not intercepted: nothing is notified. Use [`crate::set`] to replace an
    /// element observably. Returns `false` when the array cannot grow to
    /// `index`, leaving it unchanged.
    pub fn assign_index(&self, index: usize, value: Value) -> bool {
        if index > MAX_ARRAY_INDEX || !self.set_len(self.len().max(index + 1)) {
            return false;
        }
        self.0.borrow_mut().items[index] = value;
        true
    }

    /// Truncate or pad with `Undefined`. Not intercepted.
    ///
    /// Returns `false`, leaving the array unchanged, when growing is refused:
    /// the array is non-extensible, `len` exceeds the maximum array length,
    /// or the padding cannot be allocated.
    pub fn set_len(&self, len: usize) -> bool {
        let mut data = self.0.borrow_mut();
        let current = data.items.len();
        if len > current {
            if !data.extensible
                || len > MAX_ARRAY_INDEX + 1
                || data.items.try_reserve_exact(len - current).is_err()
            {
                return false;
            }
        }
        data.items.resize(len, Value::Undefined);
        true
    }

    #[must_use]
    pub fn is_extensible(&self) -> bool {
        self.0.borrow().extensible
    }

    pub fn prevent_extensions(&self) {
        self.0.borrow_mut().extensible = false;
    }

    /// The observer tag, if this array has been observed.
    #[must_use]
    pub fn observer(&self) -> Option<Rc<Observer>> {
        self.0.borrow().ob.clone()
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Address of the shared container, stable while any handle is alive.
    #[must_use]
    pub fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }

    pub(crate) fn data(&self) -> &RefCell<ArrayData> {
        &self.0
    }

    pub(crate) fn set_observer(&self, ob: Rc<Observer>) {
        self.0.borrow_mut().ob = Some(ob);
    }

    pub(crate) fn downgrade(&self) -> Weak<RefCell<ArrayData>> {
        Rc::downgrade(&self.0)
    }

    pub(crate) fn from_inner(inner: Rc<RefCell<ArrayData>>) -> Self {
        Self(inner)
    }
}

impl Default for Array {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Array {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl FromIterator<Value> for Array {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

impl fmt::Debug for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.0.borrow();
        f.debug_struct("Array")
            .field("len", &data.items.len())
            .field("observed", &data.ob.is_some())
            .finish()
    }
}
