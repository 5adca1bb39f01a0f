//! Country record
//!
//! A record is an ordered field → scalar mapping. Field order is whatever
//! the producer used and survives a load/encode round trip unchanged.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use super::errors::{DatasetError, DatasetResult};

/// One entity of the reference dataset.
///
/// Records are immutable once built: there are read accessors only.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    /// Wraps an already-built JSON object.
    pub fn from_map(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Converts a JSON value, which must be an object.
    pub fn from_value(value: Value) -> DatasetResult<Self> {
        match value {
            Value::Object(fields) => Ok(Self(fields)),
            other => Err(DatasetError::NotAnObject {
                found: json_type_name(&other),
            }),
        }
    }

    /// Value of `field`, if present (may be `Value::Null`).
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// String value of `field`, if present and a string.
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    /// Whether `field` is present at all, null or not.
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Field names in record order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Fields in record order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<Value> for Record {
    type Error = DatasetError;

    fn try_from(value: Value) -> DatasetResult<Self> {
        Self::from_value(value)
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Returns the JSON type name used in diagnostics.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                "int"
            } else {
                "float"
            }
        }
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Value equality for change detection.
///
/// Numbers compare numerically, so `1` and `1.0` are the same value.
/// Integer against float is exact: no rounding through `f64`.
/// Everything else uses structural JSON equality.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => numbers_equal(x, y),
        _ => a == b,
    }
}

fn as_integer(n: &Number) -> Option<i128> {
    n.as_i64()
        .map(i128::from)
        .or_else(|| n.as_u64().map(i128::from))
}

/// Whether `f` is exactly the integer `i`.
fn float_equals_integer(f: f64, i: i128) -> bool {
    // Every i64/u64 lies within ±2^64.
    const BOUND: f64 = 18_446_744_073_709_551_616.0;
    f.fract() == 0.0 && f.abs() < BOUND && f as i128 == i
}

fn numbers_equal(x: &Number, y: &Number) -> bool {
    match (as_integer(x), as_integer(y)) {
        (Some(x), Some(y)) => x == y,
        (Some(i), None) => y.as_f64().is_some_and(|f| float_equals_integer(f, i)),
        (None, Some(i)) => x.as_f64().is_some_and(|f| float_equals_integer(f, i)),
        (None, None) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        },
    }
}
