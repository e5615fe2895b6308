//! Operator handlers, one per comparison family.
//!
//! A handler turns a [`FilterLeaf`] into a [`Condition`]: the resolved path, the values and
//! whatever the family precompiles (range bounds, regex programs). Evaluation coerces each
//! value into the property's runtime type; a value that does not coerce never matches.

use super::coerce::{self, resolve, text};
use crate::filter::{FilterLeaf, Operator};
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;

const PATTERN_SIZE_LIMIT: usize = 1 << 20;

/// Compiles one family of operators
#[derive(Debug)]
pub struct OperatorHandler {
    pub family: &'static str,
    pub can_handle: fn(Operator) -> bool,
    pub build: fn(&FilterLeaf) -> Condition,
}

pub static HANDLERS: [OperatorHandler; 8] = [
    OperatorHandler {
        family: "equality",
        can_handle: handles_equality,
        build: build_equality,
    },
    OperatorHandler {
        family: "ordering",
        can_handle: handles_ordering,
        build: build_ordering,
    },
    OperatorHandler {
        family: "contains",
        can_handle: handles_contains,
        build: build_contains,
    },
    OperatorHandler {
        family: "affix",
        can_handle: handles_affix,
        build: build_affix,
    },
    OperatorHandler {
        family: "membership",
        can_handle: handles_membership,
        build: build_membership,
    },
    OperatorHandler {
        family: "range",
        can_handle: handles_range,
        build: build_range,
    },
    OperatorHandler {
        family: "null",
        can_handle: handles_null,
        build: build_null,
    },
    OperatorHandler {
        family: "pattern",
        can_handle: handles_pattern,
        build: build_pattern,
    },
];

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum Comparison {
    Equality,
    Ordering,
    Contains,
    Affix,
    Membership,
    /// `None` when the leaf did not carry exactly two distinct values. Equal bounds
    /// collapse into one value, so `$between=100,100` never matches.
    Range {
        bounds: Option<(String, String)>,
    },
    Null,
    Pattern {
        #[serde(skip_serializing)]
        patterns: Vec<Regex>,
    },
}

/// A compiled leaf condition over one property path.
#[derive(Debug, Clone, Serialize)]
pub struct Condition {
    path: String,
    #[serde(skip_serializing)]
    segments: Vec<String>,
    operator: Operator,
    values: Vec<String>,
    comparison: Comparison,
}

impl Condition {
    fn new(leaf: &FilterLeaf, comparison: Comparison) -> Self {
        Self {
            path: leaf.path().to_string(),
            segments: leaf.segments().into_iter().map(str::to_string).collect(),
            operator: leaf.operator(),
            values: leaf.values().iter().cloned().collect(),
            comparison,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn comparison(&self) -> &Comparison {
        &self.comparison
    }

    fn negated(&self) -> bool {
        matches!(
            self.operator,
            Operator::NotEqualTo | Operator::NotIn | Operator::NotContains | Operator::NotBetween
        )
    }

    pub fn evaluate(&self, entity: &Value) -> bool {
        let property = resolve(entity, &self.segments);
        let Some(property) = property else {
            return matches!(self.comparison, Comparison::Null) && self.operator == Operator::IsNull;
        };

        match &self.comparison {
            Comparison::Null => self.operator == Operator::IsNotNull,
            Comparison::Equality | Comparison::Membership => {
                let hit = self.values.iter().any(|v| coerce::equals(property, v));
                hit != self.negated()
            }
            Comparison::Ordering => self.values.iter().any(|v| {
                coerce::coerce_pair(property, v)
                    .and_then(|(p, v)| p.compare(&v))
                    .is_some_and(|ordering| accepts(self.operator, ordering))
            }),
            Comparison::Range { bounds } => {
                let Some((low, high)) = bounds else {
                    return false;
                };
                within(property, low, high).is_some_and(|inside| inside != self.negated())
            }
            Comparison::Contains => {
                contains_any(property, &self.values).is_some_and(|hit| hit != self.negated())
            }
            Comparison::Affix => text(property).is_some_and(|s| {
                self.values.iter().any(|v| match self.operator {
                    Operator::StartsWith => s.starts_with(v.as_str()),
                    _ => s.ends_with(v.as_str()),
                })
            }),
            Comparison::Pattern { patterns } => text(property).is_some_and(|s| {
                self.values.is_empty() || patterns.iter().any(|re| re.is_match(&s))
            }),
        }
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.operator.uses_values() {
            return write!(f, "{} {}", self.path, self.operator.symbol());
        }
        match self.values.as_slice() {
            [single] => write!(f, "{} {} {:?}", self.path, self.operator.symbol(), single),
            values => write!(f, "{} {} {:?}", self.path, self.operator.symbol(), values),
        }
    }
}

fn accepts(operator: Operator, ordering: Ordering) -> bool {
    match operator {
        Operator::LessThan => ordering == Ordering::Less,
        Operator::LessThanOrEqualTo => ordering != Ordering::Greater,
        Operator::GreaterThan => ordering == Ordering::Greater,
        Operator::GreaterThanOrEqualTo => ordering != Ordering::Less,
        _ => false,
    }
}

/// Inclusive range test with bounds in either order. `None` when a bound does not coerce
/// or the bounds are not comparable with each other.
fn within(property: &Value, a: &str, b: &str) -> Option<bool> {
    let (value, a) = coerce::coerce_pair(property, a)?;
    let (_, b) = coerce::coerce_pair(property, b)?;
    let (low, high) = match a.compare(&b)? {
        Ordering::Greater => (b, a),
        _ => (a, b),
    };
    Some(value.compare(&low)? != Ordering::Less && value.compare(&high)? != Ordering::Greater)
}

/// Substring test for scalars, element membership for arrays
fn contains_any(property: &Value, values: &[String]) -> Option<bool> {
    if let Value::Array(items) = property {
        return Some(
            values
                .iter()
                .any(|v| items.iter().any(|item| coerce::equals(item, v))),
        );
    }
    let s = text(property)?;
    Some(values.iter().any(|v| s.contains(v.as_str())))
}

fn handles_equality(operator: Operator) -> bool {
    matches!(operator, Operator::EqualTo | Operator::NotEqualTo)
}

fn build_equality(leaf: &FilterLeaf) -> Condition {
    Condition::new(leaf, Comparison::Equality)
}

fn handles_ordering(operator: Operator) -> bool {
    matches!(
        operator,
        Operator::LessThan
            | Operator::LessThanOrEqualTo
            | Operator::GreaterThan
            | Operator::GreaterThanOrEqualTo
    )
}

fn build_ordering(leaf: &FilterLeaf) -> Condition {
    Condition::new(leaf, Comparison::Ordering)
}

fn handles_contains(operator: Operator) -> bool {
    matches!(operator, Operator::Contains | Operator::NotContains)
}

fn build_contains(leaf: &FilterLeaf) -> Condition {
    Condition::new(leaf, Comparison::Contains)
}

fn handles_affix(operator: Operator) -> bool {
    matches!(operator, Operator::StartsWith | Operator::EndsWith)
}

fn build_affix(leaf: &FilterLeaf) -> Condition {
    Condition::new(leaf, Comparison::Affix)
}

fn handles_membership(operator: Operator) -> bool {
    matches!(operator, Operator::In | Operator::NotIn)
}

fn build_membership(leaf: &FilterLeaf) -> Condition {
    Condition::new(leaf, Comparison::Membership)
}

fn handles_range(operator: Operator) -> bool {
    matches!(operator, Operator::Between | Operator::NotBetween)
}

fn build_range(leaf: &FilterLeaf) -> Condition {
    let values: Vec<&String> = leaf.values().iter().collect();
    let bounds = match values.as_slice() {
        [low, high] => Some((low.to_string(), high.to_string())),
        _ => {
            tracing::debug!(
                "Range filter on '{}' needs exactly two values, got {}",
                leaf.path(),
                values.len()
            );
            None
        }
    };
    Condition::new(leaf, Comparison::Range { bounds })
}

fn handles_null(operator: Operator) -> bool {
    matches!(operator, Operator::IsNull | Operator::IsNotNull)
}

fn build_null(leaf: &FilterLeaf) -> Condition {
    Condition::new(leaf, Comparison::Null)
}

fn handles_pattern(operator: Operator) -> bool {
    operator == Operator::Regex
}

fn build_pattern(leaf: &FilterLeaf) -> Condition {
    let patterns = leaf
        .values()
        .iter()
        .filter_map(|pattern| {
            RegexBuilder::new(pattern)
                .size_limit(PATTERN_SIZE_LIMIT)
                .build()
                .map_err(|e| {
                    tracing::debug!("Ignoring invalid pattern on '{}': {}", leaf.path(), e);
                })
                .ok()
        })
        .collect();
    Condition::new(leaf, Comparison::Pattern { patterns })
}
