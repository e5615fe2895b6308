//! Regex grammars for the filter and page query syntaxes.
//!
//! A [`PatternProvider`] owns one compiled grammar and the names of its capture groups.
//! Matching is case-insensitive and bounded by a wall-clock budget; a match run that
//! exceeds the budget reports no matches at all.

use crate::config::GrammarOptions;
use crate::errors::QueryError;
use indexmap::IndexMap;
use regex::{Regex, RegexBuilder};
use std::borrow::Cow;
use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

/// Capture group names shared by the grammars.
pub mod names {
    pub const KIND: &str = "type";
    pub const CONJUNCTION: &str = "conjunction";
    pub const MEMBER_OF: &str = "memberOf";
    pub const GROUP_INDEX: &str = "groupIndex";
    pub const PATH: &str = "path";
    pub const OPERATOR: &str = "operator";
    pub const VALUE: &str = "value";
    pub const PROPERTY: &str = "property";
}

/// Operator tokens accepted after `[$`. Longer tokens first so prefixes never shadow them.
pub const OPERATOR_TOKENS: &[&str] = &[
    "notbetween",
    "notcontains",
    "startswith",
    "endswith",
    "notnull",
    "between",
    "contains",
    "notin",
    "regex",
    "null",
    "lte",
    "gte",
    "eq",
    "ne",
    "lt",
    "le",
    "gt",
    "ge",
    "in",
];

pub const PAGE_PROPERTIES: &[&str] = &["after", "before", "cursor", "limit", "offset"];

const REGEX_SIZE_LIMIT: usize = 1 << 20;

/// Builds the filter grammar for the configured keys.
///
/// One pattern covers both group declarations (`filter[group][$or][parent][0]=child`)
/// and conditions (`filter[$and][0][address][city][$eq]=Berlin`). Which one a match is
/// gets decided by the assembler from the `type` capture.
pub fn filter_pattern(options: &GrammarOptions) -> String {
    format!(
        concat!(
            r"(?:^|&){key}",
            r"(?:\[(?P<{kind}>{group})\])?",
            r"(?:\[\$(?P<{conjunction}>and|or)\])?",
            r"(?:\[(?P<{member_of}>[a-z_][^\[\]$]*)\])?",
            r"(?:\[(?P<{group_index}>\d+)\])?",
            r"(?P<{path}>(?:\[[^\[\]$]+\])*)",
            r"(?:\[\$(?P<{operator}>{operators})\])?",
            r"=(?P<{value}>[^&]*)"
        ),
        key = regex::escape(&options.filter_key),
        kind = names::KIND,
        group = regex::escape(&options.group_keyword),
        conjunction = names::CONJUNCTION,
        member_of = names::MEMBER_OF,
        group_index = names::GROUP_INDEX,
        path = names::PATH,
        operator = names::OPERATOR,
        operators = OPERATOR_TOKENS.join("|"),
        value = names::VALUE,
    )
}

pub fn page_pattern(options: &GrammarOptions) -> String {
    format!(
        r"(?:^|&){key}\[(?P<{property}>{properties})\]=(?P<{value}>[^&]*)",
        key = regex::escape(&options.page_key),
        property = names::PROPERTY,
        properties = PAGE_PROPERTIES.join("|"),
        value = names::VALUE,
    )
}

/// Percent-decodes the input, but only when it contains a `%`.
/// Input that does not decode to valid UTF-8 is matched as-is.
pub fn decode_on_demand(input: &str) -> Cow<'_, str> {
    if !input.contains('%') {
        return Cow::Borrowed(input);
    }
    match urlencoding::decode(input) {
        Ok(decoded) => decoded,
        Err(e) => {
            tracing::debug!("Matching undecoded query string, percent-decoding failed: {}", e);
            Cow::Borrowed(input)
        }
    }
}

/// One grammar match: the participating capture groups by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrammarMatch {
    captures: HashMap<String, String>,
}

impl GrammarMatch {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.captures.get(name).map(String::as_str)
    }

    /// Like [`GrammarMatch::get`], but treats an empty capture as absent.
    pub fn get_non_empty(&self, name: &str) -> Option<&str> {
        self.get(name).filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct PatternProvider {
    regex: Regex,
    capture_names: Vec<String>,
    timeout: Duration,
}

impl PatternProvider {
    pub fn new(pattern: &str, timeout: Duration) -> Result<Self, QueryError> {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .size_limit(REGEX_SIZE_LIMIT)
            .build()
            .map_err(|e| QueryError::InvalidConfig(format!("Invalid grammar pattern: {}", e)))?;
        let capture_names = regex.capture_names().flatten().map(str::to_string).collect();
        Ok(Self {
            regex,
            capture_names,
            timeout,
        })
    }

    pub fn filter(options: &GrammarOptions) -> Result<Self, QueryError> {
        Self::new(&filter_pattern(options), options.match_timeout)
    }

    pub fn page(options: &GrammarOptions) -> Result<Self, QueryError> {
        Self::new(&page_pattern(options), options.match_timeout)
    }

    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs the grammar over the whole input. Returns an empty list when nothing matches
    /// or when matching ran past the time budget.
    pub fn matches(&self, input: &str) -> Vec<GrammarMatch> {
        let input = input.trim();
        let input = input.strip_prefix('?').unwrap_or(input);
        if input.is_empty() {
            return Vec::new();
        }
        let input = decode_on_demand(input);

        let started = Instant::now();
        let mut matches = Vec::new();
        for caps in self.regex.captures_iter(&input) {
            if started.elapsed() >= self.timeout {
                tracing::warn!(
                    "Grammar match abandoned after {:?} (budget {:?}), treating input as unmatched",
                    started.elapsed(),
                    self.timeout
                );
                return Vec::new();
            }
            let captures = self
                .capture_names
                .iter()
                .filter_map(|name| {
                    caps.name(name)
                        .map(|m| (name.clone(), m.as_str().to_string()))
                })
                .collect();
            matches.push(GrammarMatch { captures });
        }
        matches
    }
}

/// Groups items by a semantic key, preserving first-seen key order and item order within
/// each key. Items for which `key` returns `None` are dropped.
pub fn group_by<T, K, F>(items: impl IntoIterator<Item = T>, key: F) -> IndexMap<K, Vec<T>>
where
    K: Hash + Eq,
    F: Fn(&T) -> Option<K>,
{
    items
        .into_iter()
        .fold(IndexMap::new(), |mut groups: IndexMap<K, Vec<T>>, item| {
            if let Some(k) = key(&item) {
                groups.entry(k).or_default().push(item);
            }
            groups
        })
}
