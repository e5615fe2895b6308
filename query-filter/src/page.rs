use crate::config::GrammarOptions;
use crate::errors::QueryError;
use crate::grammar::{group_by, names, PatternProvider};
use serde::{Deserialize, Serialize};

/// Offset or cursor pagination.
///
/// Cursors are opaque and passed through untouched; [`PageDescriptor::apply`] only
/// uses `offset` and `limit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageDescriptor {
    pub after: Option<String>,
    pub before: Option<String>,
    pub offset: u32,
    pub limit: u32,
}

impl Default for PageDescriptor {
    fn default() -> Self {
        Self::with_max_limit(u32::MAX)
    }
}

impl PageDescriptor {
    pub fn with_max_limit(max_limit: u32) -> Self {
        Self {
            after: None,
            before: None,
            offset: 0,
            limit: max_limit,
        }
    }

    /// The `offset`/`limit` window of `items`, clamped to the slice
    pub fn apply<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let start = (self.offset as usize).min(items.len());
        let end = start.saturating_add(self.limit as usize).min(items.len());
        &items[start..end]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum PageProperty {
    After,
    Before,
    Limit,
    Offset,
}

impl PageProperty {
    fn from_token(token: &str) -> Option<Self> {
        match token.to_lowercase().as_str() {
            "after" | "cursor" => Some(PageProperty::After),
            "before" => Some(PageProperty::Before),
            "limit" => Some(PageProperty::Limit),
            "offset" => Some(PageProperty::Offset),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PageParser {
    provider: PatternProvider,
    max_limit: u32,
}

impl PageParser {
    pub fn new(options: &GrammarOptions) -> Result<Self, QueryError> {
        options.validate()?;
        Ok(Self {
            provider: PatternProvider::page(options)?,
            max_limit: options.max_page_limit.max(1),
        })
    }

    /// Never fails: absent or malformed input gives the default descriptor, and a key
    /// repeated in the query string takes its last value.
    pub fn parse(&self, raw: &str) -> PageDescriptor {
        let mut page = PageDescriptor::with_max_limit(self.max_limit);
        if raw.trim().is_empty() {
            return page;
        }

        let grouped = group_by(self.provider.matches(raw), |m| {
            m.get(names::PROPERTY).and_then(PageProperty::from_token)
        });
        for (property, matches) in grouped {
            let Some(value) = matches.last().and_then(|m| m.get(names::VALUE)) else {
                continue;
            };
            match property {
                PageProperty::After => page.after = non_empty(value),
                PageProperty::Before => page.before = non_empty(value),
                PageProperty::Offset => page.offset = self.parse_offset(value),
                PageProperty::Limit => page.limit = self.parse_limit(value),
            }
        }
        page
    }

    fn parse_offset(&self, value: &str) -> u32 {
        value.trim().parse().unwrap_or_else(|_| {
            tracing::debug!("Unparsable page offset '{}', using 0", value);
            0
        })
    }

    /// Values below 1, above the maximum or unparsable all become the maximum
    fn parse_limit(&self, value: &str) -> u32 {
        match value.trim().parse::<u32>() {
            Ok(limit) if (1..=self.max_limit).contains(&limit) => limit,
            Ok(_) => self.max_limit,
            Err(_) => {
                tracing::debug!("Unparsable page limit '{}', using {}", value, self.max_limit);
                self.max_limit
            }
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}
