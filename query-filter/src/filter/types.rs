//! Filter tree types produced by the assembler
use crate::errors::QueryError;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use strum_macros::{Display, EnumIter};

/// Name of the implicit group that owns every unparented condition
pub const ROOT_GROUP: &str = "root";

/// Groups nested more than this many levels below `root` are dropped while parsing
pub const MAX_GROUP_DEPTH: usize = 32;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter,
)]
pub enum Operator {
    None,
    #[default]
    EqualTo,
    NotEqualTo,
    LessThan,
    LessThanOrEqualTo,
    GreaterThan,
    GreaterThanOrEqualTo,
    Between,
    NotBetween,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    In,
    NotIn,
    IsNull,
    IsNotNull,
    Regex,
}

impl Operator {
    /// Parses a query operator token such as `gte` or `notin`, case-insensitively.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_lowercase().as_str() {
            "eq" => Some(Operator::EqualTo),
            "ne" => Some(Operator::NotEqualTo),
            "lt" => Some(Operator::LessThan),
            "le" | "lte" => Some(Operator::LessThanOrEqualTo),
            "gt" => Some(Operator::GreaterThan),
            "ge" | "gte" => Some(Operator::GreaterThanOrEqualTo),
            "between" => Some(Operator::Between),
            "notbetween" => Some(Operator::NotBetween),
            "contains" => Some(Operator::Contains),
            "notcontains" => Some(Operator::NotContains),
            "startswith" => Some(Operator::StartsWith),
            "endswith" => Some(Operator::EndsWith),
            "in" => Some(Operator::In),
            "notin" => Some(Operator::NotIn),
            "null" => Some(Operator::IsNull),
            "notnull" => Some(Operator::IsNotNull),
            "regex" => Some(Operator::Regex),
            _ => None,
        }
    }

    /// Short symbol used when rendering expressions
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::None => "?",
            Operator::EqualTo => "==",
            Operator::NotEqualTo => "!=",
            Operator::LessThan => "<",
            Operator::LessThanOrEqualTo => "<=",
            Operator::GreaterThan => ">",
            Operator::GreaterThanOrEqualTo => ">=",
            Operator::Between => "between",
            Operator::NotBetween => "not between",
            Operator::Contains => "contains",
            Operator::NotContains => "not contains",
            Operator::StartsWith => "starts with",
            Operator::EndsWith => "ends with",
            Operator::In => "in",
            Operator::NotIn => "not in",
            Operator::IsNull => "is null",
            Operator::IsNotNull => "is not null",
            Operator::Regex => "matches",
        }
    }

    /// Whether the supplied values take part in the comparison
    pub fn uses_values(&self) -> bool {
        !matches!(self, Operator::IsNull | Operator::IsNotNull)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Conjunction {
    #[default]
    And,
    Or,
}

impl Conjunction {
    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_lowercase().as_str() {
            "and" => Some(Conjunction::And),
            "or" => Some(Conjunction::Or),
            _ => None,
        }
    }
}

impl std::fmt::Display for Conjunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Conjunction::And => write!(f, "AND"),
            Conjunction::Or => write!(f, "OR"),
        }
    }
}

/// A single condition: `path operator values`.
///
/// Values form a set; two leaves with the same values in a different order are equal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterLeaf {
    name: String,
    group_name: Option<String>,
    path: String,
    operator: Operator,
    values: IndexSet<String>,
}

impl FilterLeaf {
    pub fn new<I, S>(
        name: &str,
        group_name: Option<&str>,
        path: &str,
        operator: Operator,
        values: I,
    ) -> Result<Self, QueryError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if name.trim().is_empty() {
            return Err(QueryError::EmptyName);
        }
        if path.trim().is_empty() {
            return Err(QueryError::EmptyPath(name.to_string()));
        }
        Ok(Self {
            name: name.to_string(),
            group_name: group_name.map(str::to_string),
            path: path.to_string(),
            operator,
            values: values.into_iter().map(Into::into).collect(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn group_name(&self) -> Option<&str> {
        self.group_name.as_deref()
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Path split into its dotted segments
    pub fn segments(&self) -> Vec<&str> {
        self.path.split('.').filter(|s| !s.is_empty()).collect()
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    /// Distinct values in first-seen order. Repeated values collapse, so a range written
    /// with equal bounds (`$between=100,100`) keeps a single value and never matches.
    pub fn values(&self) -> &IndexSet<String> {
        &self.values
    }
}

impl Hash for FilterLeaf {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.group_name.hash(state);
        self.path.hash(state);
        self.operator.hash(state);
        // equality ignores value order, so hashing must too
        let mut values: Vec<&String> = self.values.iter().collect();
        values.sort();
        values.hash(state);
    }
}

/// A named set of child nodes combined by one conjunction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterGroup {
    name: String,
    group_name: Option<String>,
    conjunction: Conjunction,
    children: Vec<FilterNode>,
}

impl FilterGroup {
    /// Structurally equal children are kept once, in first-seen order.
    pub fn new(
        name: &str,
        group_name: Option<&str>,
        conjunction: Conjunction,
        children: impl IntoIterator<Item = FilterNode>,
    ) -> Result<Self, QueryError> {
        if name.trim().is_empty() {
            return Err(QueryError::EmptyName);
        }
        let unique: IndexSet<FilterNode> = children.into_iter().collect();
        Ok(Self {
            name: name.to_string(),
            group_name: group_name.map(str::to_string),
            conjunction,
            children: unique.into_iter().collect(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn group_name(&self) -> Option<&str> {
        self.group_name.as_deref()
    }

    pub fn conjunction(&self) -> Conjunction {
        self.conjunction
    }

    pub fn children(&self) -> &[FilterNode] {
        &self.children
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Finds a leaf anywhere below this group by path
    pub fn find_leaf(&self, path: &str) -> Option<&FilterLeaf> {
        self.children.iter().find_map(|child| match child {
            FilterNode::Leaf(leaf) if leaf.path() == path => Some(leaf),
            FilterNode::Leaf(_) => None,
            FilterNode::Group(group) => group.find_leaf(path),
        })
    }

    /// Finds a group anywhere below (or at) this group by name
    pub fn find_group(&self, name: &str) -> Option<&FilterGroup> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|child| match child {
            FilterNode::Group(group) => group.find_group(name),
            FilterNode::Leaf(_) => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterNode {
    Leaf(FilterLeaf),
    Group(FilterGroup),
}

impl FilterNode {
    pub fn name(&self) -> &str {
        match self {
            FilterNode::Leaf(leaf) => leaf.name(),
            FilterNode::Group(group) => group.name(),
        }
    }
}

impl From<FilterLeaf> for FilterNode {
    fn from(leaf: FilterLeaf) -> Self {
        FilterNode::Leaf(leaf)
    }
}

impl From<FilterGroup> for FilterNode {
    fn from(group: FilterGroup) -> Self {
        FilterNode::Group(group)
    }
}
