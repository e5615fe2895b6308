use crate::filter::{Conjunction, Operator};

/// Errors raised while constructing filter nodes, compiling predicates or reading configuration.
///
/// Unparseable input is never an error: parsers report it as an empty result.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryError {
    EmptyName,
    EmptyPath(String),
    ConjunctionConflict {
        group: String,
        existing: Conjunction,
        requested: Conjunction,
    },
    UnsupportedOperator {
        operator: Operator,
        supported: Vec<Operator>,
    },
    InvalidSortField(String),
    InvalidConfig(String),
}

impl std::fmt::Display for QueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryError::EmptyName => write!(f, "Filter node name cannot be empty"),
            QueryError::EmptyPath(name) => write!(f, "Filter '{}' has an empty path", name),
            QueryError::ConjunctionConflict {
                group,
                existing,
                requested,
            } => write!(
                f,
                "Group '{}' is declared as both {} and {}",
                group, existing, requested
            ),
            QueryError::UnsupportedOperator {
                operator,
                supported,
            } => {
                let supported: Vec<String> = supported.iter().map(|op| op.to_string()).collect();
                write!(
                    f,
                    "Unsupported operator: {}. Supported operators: {}",
                    operator,
                    supported.join(", ")
                )
            }
            QueryError::InvalidSortField(token) => {
                write!(f, "Invalid sort field in token '{}'", token)
            }
            QueryError::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for QueryError {}
