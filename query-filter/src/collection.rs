//! Applies filter, sort and page descriptors to an in-memory collection.

use crate::compile::{parse_time, resolve, Predicate};
use crate::errors::QueryError;
use crate::page::PageDescriptor;
use crate::sort::SortKey;
use serde_json::Value;
use std::cmp::Ordering;

/// Stable multi-key sort. Absent and null properties order first when ascending.
///
/// Numbers compare numerically, strings lexically or chronologically when both parse as
/// timestamps. Values of different JSON types order by type: bool, number, string, other.
pub fn sort_entities(entities: &mut [Value], keys: &[SortKey]) {
    if keys.is_empty() {
        return;
    }
    let paths: Vec<(Vec<String>, bool)> = keys
        .iter()
        .map(|key| {
            let segments = key.field().split('.').map(str::to_string).collect();
            (segments, key.is_descending())
        })
        .collect();

    entities.sort_by(|a, b| {
        paths
            .iter()
            .map(|(segments, descending)| {
                let ordering = compare_properties(resolve(a, segments), resolve(b, segments));
                if *descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            })
            .find(|ordering| *ordering != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    });
}

fn compare_properties(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => compare_values(a, b),
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Number(a), Value::Number(b)) => {
            let (a, b) = (a.as_f64().unwrap_or(f64::NAN), b.as_f64().unwrap_or(f64::NAN));
            a.total_cmp(&b)
        }
        (Value::String(a), Value::String(b)) => match (parse_time(a), parse_time(b)) {
            (Some(a), Some(b)) => a.cmp(&b),
            _ => a.cmp(b),
        },
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// A parsed filter, sort list and page window applied together.
#[derive(Debug, Clone)]
pub struct CollectionQuery {
    predicate: Predicate,
    sort: Vec<SortKey>,
    page: PageDescriptor,
}

impl CollectionQuery {
    pub fn new(predicate: Predicate, sort: Vec<SortKey>, page: PageDescriptor) -> Self {
        Self {
            predicate,
            sort,
            page,
        }
    }

    /// Parses the raw `filter`, `sort` and `page` query strings with the default grammars.
    pub fn from_parts(filter: &str, sort: &str, page: &str) -> Result<Self, QueryError> {
        let root = crate::parse_filter(filter)?;
        let predicate = crate::compile_filter(root.as_ref())?;
        Ok(Self::new(predicate, crate::parse_sort(sort), crate::parse_page(page)))
    }

    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    pub fn sort(&self) -> &[SortKey] {
        &self.sort
    }

    pub fn page(&self) -> &PageDescriptor {
        &self.page
    }

    /// Filters, then sorts, then takes the page window.
    pub fn apply(&self, entities: Vec<Value>) -> Vec<Value> {
        let mut kept: Vec<Value> = entities
            .into_iter()
            .filter(|entity| self.predicate.matches(entity))
            .collect();
        sort_entities(&mut kept, &self.sort);
        self.page.apply(&kept).to_vec()
    }
}
