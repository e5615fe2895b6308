//! Query-string filter, page and sort grammars.
//!
//! `filter[...]` pairs are parsed into a tree of groups and leaf conditions, then compiled
//! into a [`Predicate`] over `serde_json::Value` entities:
//!
//! ```
//! use serde_json::json;
//!
//! let root = query_filter::parse_filter("filter[price][$gt]=100").unwrap();
//! let predicate = query_filter::compile_filter(root.as_ref()).unwrap();
//! assert!(predicate.matches(&json!({"price": 150})));
//! assert!(!predicate.matches(&json!({"price": 50})));
//! ```

pub mod collection;
pub mod compile;
pub mod config;
pub mod errors;
pub mod filter;
pub mod grammar;
pub mod page;
pub mod sort;

pub use collection::{sort_entities, CollectionQuery};
pub use compile::{compile_expression, compile_filter, Condition, Expr, OperatorRegistry, Predicate};
pub use config::GrammarOptions;
pub use errors::QueryError;
pub use filter::{Conjunction, FilterGroup, FilterLeaf, FilterNode, FilterParser, Operator};
pub use page::{PageDescriptor, PageParser};
pub use sort::{SortDirection, SortKey, SortParser};

use std::sync::OnceLock;

static FILTER_PARSER: OnceLock<FilterParser> = OnceLock::new();
static PAGE_PARSER: OnceLock<PageParser> = OnceLock::new();
static SORT_PARSER: OnceLock<SortParser> = OnceLock::new();

// The default options always validate and their patterns always compile.
fn default_filter_parser() -> &'static FilterParser {
    FILTER_PARSER.get_or_init(|| {
        FilterParser::new(&GrammarOptions::default()).expect("default filter grammar is valid")
    })
}

fn default_page_parser() -> &'static PageParser {
    PAGE_PARSER.get_or_init(|| {
        PageParser::new(&GrammarOptions::default()).expect("default page grammar is valid")
    })
}

fn default_sort_parser() -> &'static SortParser {
    SORT_PARSER.get_or_init(SortParser::default)
}

/// Parses `filter[...]` pairs with the default grammar. `Ok(None)` when nothing matched.
pub fn parse_filter(raw: &str) -> Result<Option<FilterGroup>, QueryError> {
    default_filter_parser().parse(raw)
}

pub fn parse_page(raw: &str) -> PageDescriptor {
    default_page_parser().parse(raw)
}

pub fn parse_sort(raw: &str) -> Vec<SortKey> {
    default_sort_parser().parse(raw)
}

pub fn parse_sort_token(token: &str) -> Result<SortKey, QueryError> {
    default_sort_parser().parse_token(token)
}
