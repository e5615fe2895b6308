use crate::errors::QueryError;
use std::time::Duration;

pub const DEFAULT_MATCH_TIMEOUT: Duration = Duration::from_millis(150);

/// Recognized options for the filter, page and sort grammars.
#[derive(Debug, Clone, PartialEq)]
pub struct GrammarOptions {
    /// Query key that prefixes every filter pair, e.g. `filter[price]=1`
    pub filter_key: String,
    /// Bracket keyword that marks a group declaration, e.g. `filter[group][$or]=g`
    pub group_keyword: String,
    /// Query key that prefixes every page pair, e.g. `page[limit]=10`
    pub page_key: String,
    /// Splits a single filter value into a value set, e.g. `filter[id][$in]=1,2`
    pub value_delimiter: char,
    pub sort_delimiter: char,
    pub descending_prefix: char,
    pub match_timeout: Duration,
    pub max_page_limit: u32,
}

impl Default for GrammarOptions {
    fn default() -> Self {
        Self {
            filter_key: "filter".to_string(),
            group_keyword: "group".to_string(),
            page_key: "page".to_string(),
            value_delimiter: ',',
            sort_delimiter: ',',
            descending_prefix: '-',
            match_timeout: DEFAULT_MATCH_TIMEOUT,
            max_page_limit: u32::MAX,
        }
    }
}

impl GrammarOptions {
    /// Build options from the defaults, overridden by any `QUERY_*` environment variables.
    /// Empty variables are ignored.
    pub fn from_env() -> Result<Self, QueryError> {
        let mut options = Self::default();

        if let Some(key) = env_string("QUERY_FILTER_KEY") {
            options.filter_key = key;
        }
        if let Some(keyword) = env_string("QUERY_FILTER_GROUP_KEYWORD") {
            options.group_keyword = keyword;
        }
        if let Some(key) = env_string("QUERY_PAGE_KEY") {
            options.page_key = key;
        }
        if let Some(delimiter) = env_char("QUERY_VALUE_DELIMITER")? {
            options.value_delimiter = delimiter;
        }
        if let Some(delimiter) = env_char("QUERY_SORT_DELIMITER")? {
            options.sort_delimiter = delimiter;
        }
        if let Some(prefix) = env_char("QUERY_SORT_DESCENDING_PREFIX")? {
            options.descending_prefix = prefix;
        }
        if let Some(ms) = env_string("QUERY_MATCH_TIMEOUT_MS") {
            let ms: u64 = ms.parse().map_err(|_| {
                QueryError::InvalidConfig(format!("QUERY_MATCH_TIMEOUT_MS is not a number: {}", ms))
            })?;
            options.match_timeout = Duration::from_millis(ms);
        }
        if let Some(limit) = env_string("QUERY_MAX_PAGE_LIMIT") {
            let limit: u32 = limit.parse().map_err(|_| {
                QueryError::InvalidConfig(format!("QUERY_MAX_PAGE_LIMIT is not a number: {}", limit))
            })?;
            if limit == 0 {
                return Err(QueryError::InvalidConfig(
                    "QUERY_MAX_PAGE_LIMIT must be at least 1".to_string(),
                ));
            }
            options.max_page_limit = limit;
        }

        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<(), QueryError> {
        for (name, key) in [
            ("filter_key", &self.filter_key),
            ("group_keyword", &self.group_keyword),
            ("page_key", &self.page_key),
        ] {
            if key.trim().is_empty() {
                return Err(QueryError::InvalidConfig(format!("{} cannot be empty", name)));
            }
            if key.contains(['[', ']', '=', '&']) {
                return Err(QueryError::InvalidConfig(format!(
                    "{} cannot contain grammar characters: {}",
                    name, key
                )));
            }
        }
        if self.descending_prefix == self.sort_delimiter {
            return Err(QueryError::InvalidConfig(
                "descending_prefix and sort_delimiter must differ".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_char(name: &str) -> Result<Option<char>, QueryError> {
    let Some(value) = env_string(name) else {
        return Ok(None);
    };
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(Some(c)),
        _ => Err(QueryError::InvalidConfig(format!(
            "{} must be a single character, found '{}'",
            name, value
        ))),
    }
}
