//! # Cell Value Representation
//!
//! A [`Value`] pairs an optional numeric slot with an optional owned string.
//! The string is the canonical form: a value without one is an empty cell,
//! whatever the numeric slot holds. The numeric slot is filled when the value
//! is coerced to a typed column and makes numeric comparison cheap.
//!
//! ## Coercion
//!
//! ```text
//! "42"   --Int-->    Value { number: Int(42),      text: "42" }
//! " 7 "  --Int-->    Value { number: Int(7),       text: " 7 " }
//! "1e3"  --Double--> Value { number: Double(1000), text: "1e3" }
//! "abc"  --Int-->    None (caller reports TypeMismatch)
//! ```
//!
//! The original text is kept as given, so a value renders exactly as it was
//! written even when its numeric form is normalized.

use super::ColumnType;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Double(f64),
    Long(i128),
}

impl Number {
    pub fn as_f64(&self) -> f64 {
        match self {
            Number::Int(i) => *i as f64,
            Number::Double(d) => *d,
            Number::Long(l) => *l as f64,
        }
    }

    /// Total order: integers compare exactly, anything involving a double
    /// compares as `f64` with NaN sorting last.
    pub fn compare(&self, other: &Number) -> Ordering {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a.cmp(b),
            (Number::Long(a), Number::Long(b)) => a.cmp(b),
            (Number::Int(a), Number::Long(b)) => (*a as i128).cmp(b),
            (Number::Long(a), Number::Int(b)) => a.cmp(&(*b as i128)),
            _ => self.as_f64().total_cmp(&other.as_f64()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Value {
    number: Option<Number>,
    text: Option<Box<str>>,
}

impl Value {
    pub const EMPTY: Value = Value {
        number: None,
        text: None,
    };

    pub fn empty() -> Self {
        Self::EMPTY
    }

    /// A string value. Empty text is the empty value.
    pub fn text(s: impl Into<String>) -> Self {
        let s = s.into();
        if s.is_empty() {
            return Self::EMPTY;
        }
        Self {
            number: None,
            text: Some(s.into_boxed_str()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_none()
    }

    pub fn as_str(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn number(&self) -> Option<Number> {
        self.number
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self.number {
            Some(Number::Int(i)) => Some(i),
            Some(Number::Long(l)) => i64::try_from(l).ok(),
            _ => self.as_str().and_then(|s| s.trim().parse().ok()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self.number {
            Some(n) => Some(n.as_f64()),
            None => self.as_str().and_then(|s| s.trim().parse().ok()),
        }
    }

    /// Returns this value re-parsed for a column of type `ty`, or `None` if
    /// the text is not a valid literal of that type. Empty values, and
    /// values with empty text, coerce to empty values for every type.
    pub fn coerce(&self, ty: ColumnType) -> Option<Value> {
        let text = match self.text.as_deref() {
            Some(text) if !text.is_empty() => text,
            _ => return Some(Value::EMPTY),
        };
        let number = match ty {
            ColumnType::String => None,
            ColumnType::Int => Some(Number::Int(text.trim().parse().ok()?)),
            ColumnType::Double => Some(Number::Double(text.trim().parse().ok()?)),
            ColumnType::Long => Some(Number::Long(text.trim().parse().ok()?)),
        };
        Some(Value {
            number,
            text: self.text.clone(),
        })
    }

    /// Numeric view used by numeric sorting: the coerced slot if present,
    /// otherwise a parse of the text.
    pub(crate) fn numeric_key(&self) -> Option<Number> {
        if self.number.is_some() {
            return self.number;
        }
        let text = self.as_str()?.trim();
        if let Ok(i) = text.parse::<i64>() {
            return Some(Number::Int(i));
        }
        text.parse::<f64>().ok().map(Number::Double)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str().unwrap_or(""))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::text(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value {
            number: Some(Number::Int(i)),
            text: Some(i.to_string().into_boxed_str()),
        }
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value {
            number: Some(Number::Double(d)),
            text: Some(d.to_string().into_boxed_str()),
        }
    }
}

impl From<i128> for Value {
    fn from(l: i128) -> Self {
        Value {
            number: Some(Number::Long(l)),
            text: Some(l.to_string().into_boxed_str()),
        }
    }
}
