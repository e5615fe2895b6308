use super::handlers::{Condition, OperatorHandler, HANDLERS};
use crate::errors::QueryError;
use crate::filter::{FilterLeaf, Operator};
use std::collections::HashMap;
use std::sync::OnceLock;
use strum::IntoEnumIterator;

static REGISTRY: OnceLock<OperatorRegistry> = OnceLock::new();

/// Immutable `Operator -> handler` dispatch table.
#[derive(Debug)]
pub struct OperatorRegistry {
    handlers: HashMap<Operator, &'static OperatorHandler>,
    overlaps: Vec<(Operator, &'static str, &'static str)>,
}

impl OperatorRegistry {
    /// Asks every handler about every operator. When two handlers claim the same operator
    /// the later one wins and the overlap is recorded.
    pub fn new(handlers: &'static [OperatorHandler]) -> Self {
        let mut table: HashMap<Operator, &'static OperatorHandler> = HashMap::new();
        let mut overlaps = Vec::new();
        for operator in Operator::iter() {
            for handler in handlers {
                if !(handler.can_handle)(operator) {
                    continue;
                }
                if let Some(previous) = table.insert(operator, handler) {
                    tracing::warn!(
                        "Operator {} is claimed by both '{}' and '{}' handlers, using '{}'",
                        operator,
                        previous.family,
                        handler.family,
                        handler.family
                    );
                    overlaps.push((operator, previous.family, handler.family));
                }
            }
        }
        Self {
            handlers: table,
            overlaps,
        }
    }

    /// Process-wide registry over the built-in handlers
    pub fn global() -> &'static OperatorRegistry {
        REGISTRY.get_or_init(|| OperatorRegistry::new(&HANDLERS))
    }

    pub fn handler(&self, operator: Operator) -> Option<&'static OperatorHandler> {
        self.handlers.get(&operator).copied()
    }

    pub fn supported(&self) -> Vec<Operator> {
        Operator::iter()
            .filter(|op| self.handlers.contains_key(op))
            .collect()
    }

    pub fn unsupported(&self) -> Vec<Operator> {
        Operator::iter()
            .filter(|op| !self.handlers.contains_key(op))
            .collect()
    }

    pub fn overlaps(&self) -> &[(Operator, &'static str, &'static str)] {
        &self.overlaps
    }

    pub fn build(&self, leaf: &FilterLeaf) -> Result<Condition, QueryError> {
        let handler = self
            .handler(leaf.operator())
            .ok_or_else(|| QueryError::UnsupportedOperator {
                operator: leaf.operator(),
                supported: self.supported(),
            })?;
        Ok((handler.build)(leaf))
    }
}
