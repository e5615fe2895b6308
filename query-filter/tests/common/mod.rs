//! Shared fixtures for the query-filter integration tests

#![allow(dead_code)]

use serde_json::{json, Value};
use std::sync::Once;

static TRACING: Once = Once::new();

/// Installs a `RUST_LOG`-driven subscriber once per test binary
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn catalog() -> Vec<Value> {
    vec![
        json!({
            "id": 1,
            "name": "Rust in Action",
            "kind": "book",
            "price": 39.5,
            "featured": false,
            "tags": ["rust", "systems"],
            "published": "2021-08-10",
            "publisher": {"name": "Manning", "country": "US"}
        }),
        json!({
            "id": 2,
            "name": "Programming Rust",
            "kind": "book",
            "price": 59.99,
            "featured": true,
            "tags": ["rust"],
            "published": "2021-06-15",
            "publisher": {"name": "O'Reilly", "country": "US"}
        }),
        json!({
            "id": 3,
            "name": "Ferris Plush",
            "kind": "toy",
            "price": 15,
            "featured": true,
            "tags": ["mascot"],
            "published": null,
            "publisher": null
        }),
        json!({
            "id": 4,
            "name": "Zero To Production",
            "kind": "book",
            "price": 45,
            "featured": false,
            "tags": ["rust", "web"],
            "published": "2022-03-01",
            "publisher": {"name": "Self", "country": "IT"}
        }),
        json!({
            "id": 5,
            "name": "Crab Mug",
            "kind": "merch",
            "price": 9.99,
            "featured": false,
            "tags": [],
            "publisher": {"name": "Shop", "country": "DE"}
        }),
    ]
}

pub fn ids(entities: &[Value]) -> Vec<i64> {
    entities.iter().filter_map(|e| e["id"].as_i64()).collect()
}

pub fn matching_ids(predicate: &query_filter::Predicate, entities: &[Value]) -> Vec<i64> {
    predicate
        .filter(entities)
        .into_iter()
        .filter_map(|e| e["id"].as_i64())
        .collect()
}
