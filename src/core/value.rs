// Copyright 2025 Stoolap Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Runtime values with type information
//!
//! [`Value`] has two orderings:
//!
//! - [`Ord`] is total: NULLs sort first, integers and floats compare by
//!   numeric value, other mixed types order by a type rank. hKeys, sort keys
//!   and merge operators use it.
//! - [`Value::compare`] follows predicate semantics and fails on NULL vs
//!   non-NULL, which expressions turn into an unknown (NULL) result.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::error::{Error, Result};
use super::types::DataType;

/// A runtime value
///
/// Text uses `Arc<str>` so rows clone cheaply while flowing through
/// pipelines and lookahead queues.
#[derive(Debug, Clone)]
pub enum Value {
    /// NULL value with a type hint
    Null(DataType),

    /// 64-bit signed integer
    Integer(i64),

    /// 64-bit floating point
    Float(f64),

    /// UTF-8 text string
    Text(Arc<str>),

    /// Boolean value
    Boolean(bool),

    /// Timestamp (UTC)
    Timestamp(DateTime<Utc>),
}

impl Value {
    // =========================================================================
    // Constructors
    // =========================================================================

    /// Create a NULL value with a type hint
    pub fn null(data_type: DataType) -> Self {
        Value::Null(data_type)
    }

    /// Create a NULL value with unknown type
    pub fn null_unknown() -> Self {
        Value::Null(DataType::Null)
    }

    pub fn integer(value: i64) -> Self {
        Value::Integer(value)
    }

    pub fn float(value: f64) -> Self {
        Value::Float(value)
    }

    pub fn text(value: impl AsRef<str>) -> Self {
        Value::Text(Arc::from(value.as_ref()))
    }

    pub fn boolean(value: bool) -> Self {
        Value::Boolean(value)
    }

    pub fn timestamp(value: DateTime<Utc>) -> Self {
        Value::Timestamp(value)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null(_))
    }

    /// Data type of this value (the hint for NULLs)
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Null(dt) => *dt,
            Value::Integer(_) => DataType::Integer,
            Value::Float(_) => DataType::Float,
            Value::Text(_) => DataType::Text,
            Value::Boolean(_) => DataType::Boolean,
            Value::Timestamp(_) => DataType::Timestamp,
        }
    }

    pub fn as_int64(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            Value::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_float64(&self) -> Option<f64> {
        match self {
            Value::Integer(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// True only for a non-NULL boolean `true`
    pub fn is_true(&self) -> bool {
        matches!(self, Value::Boolean(true))
    }

    // =========================================================================
    // Comparison and arithmetic
    // =========================================================================

    /// Compare with predicate semantics.
    ///
    /// Two NULLs compare equal; NULL against a value is an error so callers
    /// can produce an unknown result. Mixed non-numeric types are a type error.
    pub fn compare(&self, other: &Value) -> Result<Ordering> {
        match (self.is_null(), other.is_null()) {
            (true, true) => return Ok(Ordering::Equal),
            (true, false) | (false, true) => return Err(Error::NullComparison),
            (false, false) => {}
        }
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => Ok(a.cmp(b)),
            (Value::Text(a), Value::Text(b)) => Ok(a.cmp(b)),
            (Value::Boolean(a), Value::Boolean(b)) => Ok(a.cmp(b)),
            (Value::Timestamp(a), Value::Timestamp(b)) => Ok(a.cmp(b)),
            _ => match (self.as_float64(), other.as_float64()) {
                (Some(a), Some(b)) => Ok(compare_floats(a, b)),
                _ => Err(Error::type_error(format!(
                    "cannot compare {} with {}",
                    self.data_type(),
                    other.data_type()
                ))),
            },
        }
    }

    /// Numeric addition used by SUM/AVG accumulators. NULL is absorbing.
    pub fn add(&self, other: &Value) -> Result<Value> {
        match (self, other) {
            (Value::Null(_), _) | (_, Value::Null(_)) => Ok(Value::null(self.data_type())),
            (Value::Integer(a), Value::Integer(b)) => a
                .checked_add(*b)
                .map(Value::Integer)
                .ok_or_else(|| Error::type_error("integer overflow")),
            _ => match (self.as_float64(), other.as_float64()) {
                (Some(a), Some(b)) => Ok(Value::Float(a + b)),
                _ => Err(Error::type_error(format!(
                    "cannot add {} and {}",
                    self.data_type(),
                    other.data_type()
                ))),
            },
        }
    }

    /// Rank used by the total order to separate unrelated types
    fn type_rank(&self) -> u8 {
        match self {
            Value::Null(_) => 0,
            Value::Boolean(_) => 1,
            Value::Integer(_) | Value::Float(_) => 2,
            Value::Text(_) => 3,
            Value::Timestamp(_) => 4,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null(_) => write!(f, "NULL"),
            Value::Integer(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", format_float(*v)),
            Value::Text(s) => write!(f, "{}", s),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Timestamp(t) => write!(f, "{}", t.to_rfc3339()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Integer(5) == Float(5.0), so numerics hash as f64 bits
        match self {
            Value::Null(_) => 0u8.hash(state),
            Value::Integer(v) => {
                2u8.hash(state);
                (*v as f64).to_bits().hash(state);
            }
            Value::Float(v) => {
                2u8.hash(state);
                v.to_bits().hash(state);
            }
            Value::Text(s) => {
                3u8.hash(state);
                s.hash(state);
            }
            Value::Boolean(b) => {
                1u8.hash(state);
                b.hash(state);
            }
            Value::Timestamp(t) => {
                4u8.hash(state);
                t.timestamp_nanos_opt().hash(state);
            }
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        let (a, b) = (self.type_rank(), other.type_rank());
        if a != b {
            return a.cmp(&b);
        }
        match (self, other) {
            (Value::Null(_), Value::Null(_)) => Ordering::Equal,
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
            (Value::Timestamp(a), Value::Timestamp(b)) => a.cmp(b),
            _ => match (self.as_float64(), other.as_float64()) {
                (Some(a), Some(b)) => compare_floats(a, b),
                _ => Ordering::Equal,
            },
        }
    }
}

// =========================================================================
// From implementations for convenient construction
// =========================================================================

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::text(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(Arc::from(v.as_str()))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Value::null_unknown(),
        }
    }
}

/// Format float for display
fn format_float(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{:.1}", v)
    } else {
        format!("{}", v)
    }
}

/// Compare two floats with NaN ordered last
fn compare_floats(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(v: &Value) -> u64 {
        let mut h = DefaultHasher::new();
        v.hash(&mut h);
        h.finish()
    }

    #[test]
    fn test_total_order_nulls_first() {
        let mut values = vec![
            Value::integer(3),
            Value::null(DataType::Integer),
            Value::float(1.5),
            Value::integer(-2),
        ];
        values.sort();
        assert!(values[0].is_null());
        assert_eq!(values[1], Value::integer(-2));
        assert_eq!(values[2], Value::float(1.5));
        assert_eq!(values[3], Value::integer(3));
    }

    #[test]
    fn test_cross_numeric_equality_and_hash() {
        assert_eq!(Value::integer(5), Value::float(5.0));
        assert_eq!(hash_of(&Value::integer(5)), hash_of(&Value::float(5.0)));
        assert_ne!(Value::integer(5), Value::text("5"));
    }

    #[test]
    fn test_compare_predicate_semantics() {
        assert_eq!(
            Value::integer(1).compare(&Value::integer(2)).unwrap(),
            Ordering::Less
        );
        assert_eq!(
            Value::null_unknown().compare(&Value::integer(2)),
            Err(Error::NullComparison)
        );
        assert!(Value::text("a").compare(&Value::integer(1)).is_err());
    }

    #[test]
    fn test_add() {
        assert_eq!(
            Value::integer(2).add(&Value::integer(3)).unwrap(),
            Value::integer(5)
        );
        assert_eq!(
            Value::integer(2).add(&Value::float(0.5)).unwrap(),
            Value::float(2.5)
        );
        assert!(Value::integer(1).add(&Value::null_unknown()).unwrap().is_null());
        assert!(Value::integer(i64::MAX).add(&Value::integer(1)).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::integer(42).to_string(), "42");
        assert_eq!(Value::float(2.0).to_string(), "2.0");
        assert_eq!(Value::text("abc").to_string(), "abc");
        assert_eq!(Value::null_unknown().to_string(), "NULL");
    }
}
