//! Helpers for inspecting candidate values.
//!
//! Candidate values are plain JSON: a scalar for single-valued fields and an
//! array for multi-valued ones. DATE values are ISO-8601 strings.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use std::cmp::Ordering;

use crate::types::DataType;

/// A value counts as empty when it is absent (`null`), an empty string, or an
/// empty list.
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Whether a single element has the shape `data_type` requires.
pub fn element_matches(data_type: DataType, value: &Value) -> bool {
    match data_type {
        DataType::String => value.is_string(),
        DataType::Number => value.is_number(),
        DataType::Boolean => value.is_boolean(),
        DataType::Date => value.as_str().and_then(parse_instant).is_some(),
    }
}

/// Whether a whole candidate value has the shape of the field: a list of
/// matching elements when `multiple`, otherwise one matching element.
pub fn type_matches(data_type: DataType, multiple: bool, value: &Value) -> bool {
    if multiple {
        value
            .as_array()
            .is_some_and(|items| items.iter().all(|item| element_matches(data_type, item)))
    } else {
        element_matches(data_type, value)
    }
}

/// Parse an ISO-8601 instant. Accepts a full RFC 3339 timestamp, a local
/// date-time (taken as UTC), or a bare `YYYY-MM-DD` date (midnight UTC).
pub fn parse_instant(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// A JSON number kept exact: integers stay integers, so values beyond 2^53
/// are never rounded together.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Numeric {
    Int(i128),
    Float(f64),
}

impl Numeric {
    pub fn as_f64(self) -> f64 {
        match self {
            Numeric::Int(i) => i as f64,
            Numeric::Float(f) => f,
        }
    }

    pub fn is_finite(self) -> bool {
        match self {
            Numeric::Int(_) => true,
            Numeric::Float(f) => f.is_finite(),
        }
    }
}

impl PartialOrd for Numeric {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (*self, *other) {
            (Numeric::Int(x), Numeric::Int(y)) => Some(x.cmp(&y)),
            (Numeric::Float(x), Numeric::Float(y)) => x.partial_cmp(&y),
            (Numeric::Int(i), Numeric::Float(f)) => cmp_int_float(i, f),
            (Numeric::Float(f), Numeric::Int(i)) => cmp_int_float(i, f).map(Ordering::reverse),
        }
    }
}

/// Exact ordering of an integer against a float, without rounding the
/// integer through `f64`.
fn cmp_int_float(i: i128, f: f64) -> Option<Ordering> {
    if f.is_nan() {
        return None;
    }
    // i128::MAX as f64 rounds up to 2^127, one past every i128.
    let limit = i128::MAX as f64;
    if f >= limit {
        return Some(Ordering::Less);
    }
    if f < -limit {
        return Some(Ordering::Greater);
    }
    let floor = f.floor();
    match i.cmp(&(floor as i128)) {
        Ordering::Equal if f > floor => Some(Ordering::Less),
        ordering => Some(ordering),
    }
}

/// Numeric view of a JSON number.
pub fn as_number(value: &Value) -> Option<Numeric> {
    let Value::Number(n) = value else {
        return None;
    };
    if let Some(i) = n.as_i64() {
        return Some(Numeric::Int(i.into()));
    }
    if let Some(u) = n.as_u64() {
        return Some(Numeric::Int(u.into()));
    }
    n.as_f64().map(Numeric::Float)
}

/// Parse a non-negative whole count such as a length bound. Accepts `3` and
/// `3.0` but not `3.5` or `-1`.
pub fn as_count(value: &Value) -> Option<usize> {
    if let Some(n) = value.as_u64() {
        return usize::try_from(n).ok();
    }
    let f = value.as_f64()?;
    if f >= 0.0 && f.fract() == 0.0 && f <= usize::MAX as f64 {
        Some(f as usize)
    } else {
        None
    }
}

/// Equality used for domain membership: numbers compare by numeric value
/// (`1 == 1.0`), everything else structurally.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            x == y || as_number(a).partial_cmp(&as_number(b)) == Some(Ordering::Equal)
        }
        _ => a == b,
    }
}

/// Short human form of a value for messages: strings unquoted, everything
/// else as compact JSON.
pub fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
