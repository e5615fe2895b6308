use crate::config::GrammarOptions;
use crate::errors::QueryError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use strum_macros::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum SortDirection {
    #[strum(serialize = "asc")]
    Ascending,
    #[strum(serialize = "desc")]
    Descending,
}

/// One entry of a sort list; earlier keys take priority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    field: String,
    original_token: String,
    direction: SortDirection,
}

impl SortKey {
    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn original_token(&self) -> &str {
        &self.original_token
    }

    pub fn direction(&self) -> SortDirection {
        self.direction
    }

    pub fn is_descending(&self) -> bool {
        self.direction == SortDirection::Descending
    }
}

/// Delimited sort list, e.g. `-price,name`.
#[derive(Debug, Clone)]
pub struct SortParser {
    delimiter: char,
    descending_prefix: char,
}

impl Default for SortParser {
    fn default() -> Self {
        Self {
            delimiter: ',',
            descending_prefix: '-',
        }
    }
}

impl SortParser {
    pub fn new(options: &GrammarOptions) -> Result<Self, QueryError> {
        options.validate()?;
        Ok(Self {
            delimiter: options.sort_delimiter,
            descending_prefix: options.descending_prefix,
        })
    }

    /// A leading descending prefix flips the direction; the remaining field cannot be empty.
    pub fn parse_token(&self, token: &str) -> Result<SortKey, QueryError> {
        let original_token = token.trim();
        let (field, direction) = match original_token.strip_prefix(self.descending_prefix) {
            Some(rest) => (rest.trim(), SortDirection::Descending),
            None => (original_token, SortDirection::Ascending),
        };
        if field.is_empty() {
            return Err(QueryError::InvalidSortField(original_token.to_string()));
        }
        Ok(SortKey {
            field: field.to_string(),
            original_token: original_token.to_string(),
            direction,
        })
    }

    /// Invalid tokens are skipped and repeated fields keep their first occurrence.
    pub fn parse(&self, raw: &str) -> Vec<SortKey> {
        let mut seen = HashSet::new();
        raw.split(self.delimiter)
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .filter_map(|token| match self.parse_token(token) {
                Ok(key) => Some(key),
                Err(e) => {
                    tracing::debug!("Skipping sort token: {}", e);
                    None
                }
            })
            .filter(|key| seen.insert(key.field.clone()))
            .collect()
    }
}
