//! Property lookup and string-to-property-type coercion.

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde_json::Value;
use std::borrow::Cow;
use std::cmp::Ordering;

/// Walks dotted path segments into the entity.
///
/// Object keys match exactly first, then ASCII case-insensitively. Numeric segments index
/// into arrays. A missing key, an out-of-range index, a scalar in the middle of the path
/// or a null value all resolve to `None`.
pub fn resolve<'a>(entity: &'a Value, segments: &[String]) -> Option<&'a Value> {
    let mut current = entity;
    for segment in segments {
        current = match current {
            Value::Object(map) => match map.get(segment.as_str()) {
                Some(value) => value,
                None => map
                    .iter()
                    .find(|(key, _)| key.eq_ignore_ascii_case(segment))
                    .map(|(_, value)| value)?,
            },
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    (!current.is_null()).then_some(current)
}

/// A property value and a filter value brought to the same type.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar<'a> {
    Bool(bool),
    Number(f64),
    Time(DateTime<FixedOffset>),
    Text(&'a str),
}

impl Scalar<'_> {
    /// `None` when the two scalars are of different types or not comparable (NaN)
    pub fn compare(&self, other: &Scalar<'_>) -> Option<Ordering> {
        match (self, other) {
            (Scalar::Bool(a), Scalar::Bool(b)) => Some(a.cmp(b)),
            (Scalar::Number(a), Scalar::Number(b)) => a.partial_cmp(b),
            (Scalar::Time(a), Scalar::Time(b)) => Some(a.cmp(b)),
            (Scalar::Text(a), Scalar::Text(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

/// Coerces `raw` into the runtime type of `property`.
///
/// Returns `None` when `raw` cannot represent a value of that type; callers treat such a
/// value as non-matching. Strings compare as timestamps when both sides parse as one.
pub fn coerce_pair<'a>(property: &'a Value, raw: &'a str) -> Option<(Scalar<'a>, Scalar<'a>)> {
    match property {
        Value::Bool(b) => parse_bool(raw).map(|v| (Scalar::Bool(*b), Scalar::Bool(v))),
        Value::Number(n) => {
            let property = n.as_f64()?;
            let value = raw.trim().parse::<f64>().ok()?;
            Some((Scalar::Number(property), Scalar::Number(value)))
        }
        Value::String(s) => match (parse_time(s), parse_time(raw)) {
            (Some(a), Some(b)) => Some((Scalar::Time(a), Scalar::Time(b))),
            _ => Some((Scalar::Text(s), Scalar::Text(raw))),
        },
        _ => None,
    }
}

pub fn equals(property: &Value, raw: &str) -> bool {
    coerce_pair(property, raw)
        .and_then(|(a, b)| a.compare(&b))
        .is_some_and(|ordering| ordering == Ordering::Equal)
}

/// String form of a scalar property, used by the text operators
pub fn text(property: &Value) -> Option<Cow<'_, str>> {
    match property {
        Value::String(s) => Some(Cow::Borrowed(s)),
        Value::Number(n) => Some(Cow::Owned(n.to_string())),
        Value::Bool(b) => Some(Cow::Owned(b.to_string())),
        _ => None,
    }
}

pub fn parse_bool(raw: &str) -> Option<bool> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("true") {
        Some(true)
    } else if raw.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// RFC 3339 timestamps, or plain `YYYY-MM-DD` dates taken as midnight UTC
pub fn parse_time(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if let Ok(time) = DateTime::parse_from_rfc3339(raw) {
        return Some(time);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()?
        .and_hms_opt(0, 0, 0)
        .map(|midnight| midnight.and_utc().fixed_offset())
}
