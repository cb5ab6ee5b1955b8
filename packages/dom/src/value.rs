//! The dynamic value type carried across the adapter boundary.
//!
//! Element properties, event payloads, and compiled-component state are all
//! untyped at the runtime boundary, so they travel as [`Value`]s.

use std::fmt;

/// A dynamically typed value for element properties and component state.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Truthiness follows the conventions of a dynamic UI language: `null`,
    /// `false`, `0`, `NaN` and the empty string are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0 && !f.is_nan(),
            Value::Text(s) => !s.is_empty(),
            // a list is truthy even when empty, like its host-language kin
            Value::List(_) => true,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// The list items, or an empty vector for any non-list value.
    pub fn to_list(&self) -> Vec<Value> {
        match self {
            Value::List(items) => items.clone(),
            Value::Null => Vec::new(),
            other => vec![other.clone()],
        }
    }

    /// Length of a list or text value.
    pub fn length(&self) -> usize {
        match self {
            Value::List(items) => items.len(),
            Value::Text(s) => s.chars().count(),
            _ => 0,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric coercion. Non-numeric text becomes `NaN`, like an HTML
    /// `valueAsNumber` read.
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Null => 0.0,
            Value::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Int(i) => *i as f64,
            Value::Float(f) => *f,
            Value::Text(s) => s.trim().parse().unwrap_or(f64::NAN),
            Value::List(_) => f64::NAN,
        }
    }

    /// Addition: numeric when both sides are numeric, string concatenation
    /// when either side is text.
    pub fn add(&self, other: &Value) -> Value {
        match (self, other) {
            (Value::Text(_), _) | (_, Value::Text(_)) => {
                Value::Text(format!("{self}{other}"))
            }
            (Value::Int(a), Value::Int(b)) => Value::Int(a + b),
            _ => Value::from_f64(self.to_number() + other.to_number()),
        }
    }

    pub fn sub(&self, other: &Value) -> Value {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Value::Int(a - b),
            _ => Value::from_f64(self.to_number() - other.to_number()),
        }
    }

    pub fn mul(&self, other: &Value) -> Value {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Value::Int(a * b),
            _ => Value::from_f64(self.to_number() * other.to_number()),
        }
    }

    pub fn div(&self, other: &Value) -> Value {
        Value::from_f64(self.to_number() / other.to_number())
    }

    pub fn rem(&self, other: &Value) -> Value {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) if *b != 0 => Value::Int(a % b),
            _ => Value::from_f64(self.to_number() % other.to_number()),
        }
    }

    pub fn neg(&self) -> Value {
        match self {
            Value::Int(i) => Value::Int(-i),
            _ => Value::from_f64(-self.to_number()),
        }
    }

    pub fn not(&self) -> Value {
        Value::Bool(!self.is_truthy())
    }

    /// Loose equality: numerics compare by value across `Int`/`Float`,
    /// everything else compares structurally.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                *a as f64 == *b
            }
            _ => self == other,
        }
    }

    pub fn lt(&self, other: &Value) -> Value {
        Value::Bool(self.to_number() < other.to_number())
    }

    pub fn le(&self, other: &Value) -> Value {
        Value::Bool(self.to_number() <= other.to_number())
    }

    pub fn gt(&self, other: &Value) -> Value {
        Value::Bool(self.to_number() > other.to_number())
    }

    pub fn ge(&self, other: &Value) -> Value {
        Value::Bool(self.to_number() >= other.to_number())
    }

    /// `??` - the right side only when the left is null.
    pub fn coalesce(&self, other: &Value) -> Value {
        if self.is_null() {
            other.clone()
        } else {
            self.clone()
        }
    }

    fn from_f64(f: f64) -> Value {
        if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
            Value::Int(f as i64)
        } else {
            Value::Float(f)
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => {
                if v.fract() == 0.0 && v.is_finite() {
                    write!(f, "{}", *v as i64)
                } else {
                    write!(f, "{v}")
                }
            }
            Value::Text(s) => f.write_str(s),
            Value::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<usize> for Value {
    fn from(i: usize) -> Self {
        Value::Int(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}
