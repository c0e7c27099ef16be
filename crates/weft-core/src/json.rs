#![forbid(unsafe_code)]

//! Conversions between [`Value`] and `serde_json::Value`.
//!
//! Conversion to JSON reads without tracking. A container met again while it
//! is still being converted (a cycle) becomes `null`.

use serde_json::{Map, Number};

use crate::target;
use crate::value::{Array, Object, Value};

impl From<&serde_json::Value> for Value {
    fn from(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(*b),
            serde_json::Value::Number(n) => Self::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Self::from(s.as_str()),
            serde_json::Value::Array(items) => {
                Self::Array(items.iter().map(Self::from).collect::<Array>())
            }
            serde_json::Value::Object(map) => {
                Self::Object(Object::from_entries(map.iter().map(|(k, v)| (k.as_str(), Self::from(v)))))
            }
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        Self::from(&json)
    }
}

impl Value {
    /// Snapshot as JSON. `Undefined` and non-finite numbers become `null`.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        let mut stack = Vec::new();
        target::untracked(|| to_json(self, &mut stack))
    }
}

fn to_json(value: &Value, stack: &mut Vec<usize>) -> serde_json::Value {
    match value {
        Value::Undefined | Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Number(n) => Number::from_f64(*n).map_or(serde_json::Value::Null, serde_json::Value::Number),
        Value::String(s) => serde_json::Value::String(s.to_string()),
        Value::Array(array) => {
            if stack.contains(&array.addr()) {
                return serde_json::Value::Null;
            }
            stack.push(array.addr());
            let items = array.to_vec().iter().map(|item| to_json(item, stack)).collect();
            stack.pop();
            serde_json::Value::Array(items)
        }
        Value::Object(object) => {
            if stack.contains(&object.addr()) {
                return serde_json::Value::Null;
            }
            stack.push(object.addr());
            let mut map = Map::new();
            for key in object.keys() {
                let field = object.get(&key);
                map.insert(key.to_string(), to_json(&field, stack));
            }
            stack.pop();
            serde_json::Value::Object(map)
        }
    }
}
