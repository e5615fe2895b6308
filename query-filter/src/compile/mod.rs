//! Compiles a filter tree into an evaluable expression.

mod coerce;
mod handlers;
mod registry;

pub use coerce::{parse_time, resolve};
pub use handlers::{Comparison, Condition, OperatorHandler};
pub use registry::OperatorRegistry;

use crate::errors::QueryError;
use crate::filter::{Conjunction, FilterGroup, FilterNode};
use serde::Serialize;
use serde_json::Value;

/// Intermediate expression tree. Evaluate it directly, or walk it to translate the
/// filter for another query back-end.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    Constant(bool),
    Condition(Condition),
    And(Vec<Expr>),
    Or(Vec<Expr>),
}

impl Expr {
    /// Children are evaluated left to right and short-circuit.
    pub fn evaluate(&self, entity: &Value) -> bool {
        match self {
            Expr::Constant(value) => *value,
            Expr::Condition(condition) => condition.evaluate(entity),
            Expr::And(children) => children.iter().all(|child| child.evaluate(entity)),
            Expr::Or(children) => children.iter().any(|child| child.evaluate(entity)),
        }
    }

    /// Every leaf condition, depth first
    pub fn conditions(&self) -> Vec<&Condition> {
        match self {
            Expr::Constant(_) => Vec::new(),
            Expr::Condition(condition) => vec![condition],
            Expr::And(children) | Expr::Or(children) => {
                children.iter().flat_map(Expr::conditions).collect()
            }
        }
    }
}

impl std::fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::Constant(value) => write!(f, "{}", value),
            Expr::Condition(condition) => write!(f, "{}", condition),
            Expr::And(children) | Expr::Or(children) => {
                let joiner = if matches!(self, Expr::And(_)) {
                    " AND "
                } else {
                    " OR "
                };
                let parts: Vec<String> = children.iter().map(|c| c.to_string()).collect();
                write!(f, "({})", parts.join(joiner))
            }
        }
    }
}

/// A compiled filter: tests one entity at a time.
#[derive(Debug, Clone)]
pub struct Predicate {
    expression: Expr,
}

impl Predicate {
    pub fn always() -> Self {
        Self {
            expression: Expr::Constant(true),
        }
    }

    pub fn matches(&self, entity: &Value) -> bool {
        self.expression.evaluate(entity)
    }

    /// Tests any serializable entity. Entities that fail to serialize never match.
    pub fn matches_serialize<T: Serialize>(&self, entity: &T) -> bool {
        match serde_json::to_value(entity) {
            Ok(value) => self.matches(&value),
            Err(e) => {
                tracing::debug!("Entity could not be serialized for filtering: {}", e);
                false
            }
        }
    }

    pub fn filter<'a>(&self, entities: &'a [Value]) -> Vec<&'a Value> {
        entities.iter().filter(|e| self.matches(e)).collect()
    }

    pub fn expression(&self) -> &Expr {
        &self.expression
    }

    pub fn into_expression(self) -> Expr {
        self.expression
    }
}

impl From<Expr> for Predicate {
    fn from(expression: Expr) -> Self {
        Self { expression }
    }
}

/// Compiles against the built-in operator registry. An absent filter compiles to `true`.
pub fn compile_expression(root: Option<&FilterGroup>) -> Result<Expr, QueryError> {
    compile_expression_with(OperatorRegistry::global(), root)
}

pub fn compile_expression_with(
    registry: &OperatorRegistry,
    root: Option<&FilterGroup>,
) -> Result<Expr, QueryError> {
    match root {
        None => Ok(Expr::Constant(true)),
        Some(group) => compile_group(registry, group),
    }
}

pub fn compile_filter(root: Option<&FilterGroup>) -> Result<Predicate, QueryError> {
    compile_expression(root).map(Predicate::from)
}

fn compile_node(registry: &OperatorRegistry, node: &FilterNode) -> Result<Expr, QueryError> {
    match node {
        FilterNode::Leaf(leaf) => registry.build(leaf).map(Expr::Condition),
        FilterNode::Group(group) => compile_group(registry, group),
    }
}

fn compile_group(registry: &OperatorRegistry, group: &FilterGroup) -> Result<Expr, QueryError> {
    let mut children = group
        .children()
        .iter()
        .map(|child| compile_node(registry, child))
        .collect::<Result<Vec<Expr>, QueryError>>()?;

    if children.len() <= 1 {
        return Ok(children.pop().unwrap_or(Expr::Constant(true)));
    }
    Ok(match group.conjunction() {
        Conjunction::And => Expr::And(children),
        Conjunction::Or => Expr::Or(children),
    })
}

#[cfg(test)]
mod tests;
