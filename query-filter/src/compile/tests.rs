use super::*;
use crate::config::GrammarOptions;
use crate::filter::{FilterLeaf, FilterParser, Operator};
use serde_json::json;

fn predicate(raw: &str) -> Predicate {
    let root = FilterParser::new(&GrammarOptions::default())
        .unwrap()
        .parse(raw)
        .unwrap();
    compile_filter(root.as_ref()).unwrap()
}

fn leaf_predicate(path: &str, operator: Operator, values: &[&str]) -> Predicate {
    let leaf = FilterLeaf::new(path, None, path, operator, values.iter().copied()).unwrap();
    let root = FilterGroup::new("root", None, Conjunction::And, vec![FilterNode::Leaf(leaf)])
        .unwrap();
    compile_filter(Some(&root)).unwrap()
}

#[test]
fn test_greater_than_round_trip() {
    let p = predicate("filter[price][$gt]=100");
    assert!(p.matches(&json!({"price": 150})));
    assert!(!p.matches(&json!({"price": 50})));
    assert!(!p.matches(&json!({"price": 100})));
}

#[test]
fn test_empty_filter_matches_everything() {
    let p = predicate("");
    assert!(p.matches(&json!({})));
    assert!(p.matches(&json!(null)));
    assert!(compile_filter(None).unwrap().matches(&json!({"a": 1})));
    assert_eq!(compile_expression(None).unwrap().to_string(), "true");
}

#[test]
fn test_empty_group_compiles_to_true() {
    let root = FilterGroup::new("root", None, Conjunction::Or, Vec::<FilterNode>::new()).unwrap();
    let expr = compile_expression(Some(&root)).unwrap();
    assert!(matches!(expr, Expr::Constant(true)));
}

#[test]
fn test_or_group_compiles_to_disjunction() {
    let p = predicate("filter[group][$or]=g&filter[g][0][a]=1&filter[g][1][b]=2");
    assert_eq!(p.expression().to_string(), r#"(a == "1" OR b == "2")"#);
    assert!(p.matches(&json!({"a": 1, "b": 0})));
    assert!(p.matches(&json!({"a": 0, "b": 2})));
    assert!(!p.matches(&json!({"a": 0, "b": 0})));
}

#[test]
fn test_and_is_default_conjunction() {
    let p = predicate("filter[a]=1&filter[b][$ne]=2");
    assert_eq!(p.expression().to_string(), r#"(a == "1" AND b != "2")"#);
    assert!(p.matches(&json!({"a": 1, "b": 3})));
    assert!(!p.matches(&json!({"a": 1, "b": 2})));
}

#[test]
fn test_equality_coerces_to_property_type() {
    let p = leaf_predicate("active", Operator::EqualTo, &["true"]);
    assert!(p.matches(&json!({"active": true})));
    assert!(!p.matches(&json!({"active": false})));

    let p = leaf_predicate("count", Operator::EqualTo, &["3"]);
    assert!(p.matches(&json!({"count": 3})));
    assert!(p.matches(&json!({"count": 3.0})));
    assert!(!p.matches(&json!({"count": "three"})));
}

#[test]
fn test_failed_coercion_only_drops_that_value() {
    let p = leaf_predicate("count", Operator::In, &["abc", "3"]);
    assert!(p.matches(&json!({"count": 3})));
    let p = leaf_predicate("count", Operator::EqualTo, &["abc"]);
    assert!(!p.matches(&json!({"count": 3})));
}

#[test]
fn test_not_equal_and_not_in() {
    let p = leaf_predicate("status", Operator::NotEqualTo, &["draft"]);
    assert!(p.matches(&json!({"status": "published"})));
    assert!(!p.matches(&json!({"status": "draft"})));

    let p = leaf_predicate("status", Operator::NotIn, &["draft", "archived"]);
    assert!(p.matches(&json!({"status": "published"})));
    assert!(!p.matches(&json!({"status": "archived"})));
}

#[test]
fn test_in_uses_full_value_set() {
    let p = predicate("filter[category][$in]=A,A,B");
    assert!(p.matches(&json!({"category": "A"})));
    assert!(p.matches(&json!({"category": "B"})));
    assert!(!p.matches(&json!({"category": "C"})));
}

#[test]
fn test_ordering_operators() {
    let entity = json!({"n": 10});
    assert!(leaf_predicate("n", Operator::LessThan, &["11"]).matches(&entity));
    assert!(!leaf_predicate("n", Operator::LessThan, &["10"]).matches(&entity));
    assert!(leaf_predicate("n", Operator::LessThanOrEqualTo, &["10"]).matches(&entity));
    assert!(leaf_predicate("n", Operator::GreaterThanOrEqualTo, &["10"]).matches(&entity));
    assert!(!leaf_predicate("n", Operator::GreaterThan, &["10"]).matches(&entity));
}

#[test]
fn test_ordering_on_strings_and_timestamps() {
    let p = leaf_predicate("name", Operator::GreaterThan, &["b"]);
    assert!(p.matches(&json!({"name": "c"})));
    assert!(!p.matches(&json!({"name": "a"})));

    let p = leaf_predicate("created", Operator::GreaterThanOrEqualTo, &["2024-01-01"]);
    assert!(p.matches(&json!({"created": "2024-06-01T10:00:00Z"})));
    assert!(!p.matches(&json!({"created": "2023-12-31T23:59:59Z"})));
}

#[test]
fn test_between_bounds_are_order_independent() {
    let forward = leaf_predicate("price", Operator::Between, &["100", "500"]);
    let reversed = leaf_predicate("price", Operator::Between, &["500", "100"]);
    for price in [50, 100, 250, 500, 501] {
        let entity = json!({ "price": price });
        assert_eq!(forward.matches(&entity), reversed.matches(&entity), "price {}", price);
    }
    assert!(forward.matches(&json!({"price": 100})));
    assert!(forward.matches(&json!({"price": 500})));
    assert!(!forward.matches(&json!({"price": 501})));
}

#[test]
fn test_not_between() {
    let p = predicate("filter[price][$notbetween]=500,100");
    assert!(p.matches(&json!({"price": 50})));
    assert!(!p.matches(&json!({"price": 300})));
    assert!(!p.matches(&json!({"price": null})));
}

#[test]
fn test_between_requires_two_values() {
    let p = leaf_predicate("price", Operator::Between, &["100"]);
    assert!(!p.matches(&json!({"price": 100})));
    let p = leaf_predicate("price", Operator::NotBetween, &["1", "2", "3"]);
    assert!(!p.matches(&json!({"price": 100})));
    let p = leaf_predicate("price", Operator::Between, &["1", "x"]);
    assert!(!p.matches(&json!({"price": 1})));
}

#[test]
fn test_equal_range_bounds_collapse_to_one_value() {
    let p = predicate("filter[price][$between]=100,100");
    let conditions = p.expression().conditions();
    assert_eq!(conditions[0].values(), ["100"]);
    assert!(matches!(
        conditions[0].comparison(),
        Comparison::Range { bounds: None }
    ));
    assert!(!p.matches(&json!({"price": 100})));
}

#[test]
fn test_padded_property_name_still_matches() {
    let p = predicate("filter[a ]=1");
    assert_eq!(p.expression().conditions()[0].path(), "a");
    assert!(p.matches(&json!({"a": 1})));
}

#[test]
fn test_always_and_into_expression() {
    let always = Predicate::always();
    assert!(always.matches(&json!(null)));
    assert!(always.matches(&json!({"a": 1})));
    assert!(matches!(always.into_expression(), Expr::Constant(true)));

    let expr = predicate("filter[a]=1").into_expression();
    assert!(matches!(&expr, Expr::Condition(c) if c.path() == "a"));
    assert!(Predicate::from(expr).matches(&json!({"a": 1})));
}

#[test]
fn test_contains_on_strings_and_arrays() {
    let p = leaf_predicate("title", Operator::Contains, &["rust"]);
    assert!(p.matches(&json!({"title": "trusty rust"})));
    assert!(!p.matches(&json!({"title": "Rust"})));

    let p = leaf_predicate("tags", Operator::Contains, &["b"]);
    assert!(p.matches(&json!({"tags": ["a", "b"]})));
    assert!(!p.matches(&json!({"tags": ["a", "bb"]})));

    let p = leaf_predicate("title", Operator::NotContains, &["rust"]);
    assert!(p.matches(&json!({"title": "go"})));
    assert!(!p.matches(&json!({"title": "rusty"})));
    assert!(!p.matches(&json!({})));
}

#[test]
fn test_starts_and_ends_with() {
    let starts = leaf_predicate("sku", Operator::StartsWith, &["AB"]);
    let ends = leaf_predicate("sku", Operator::EndsWith, &["-9"]);
    let entity = json!({"sku": "AB-123-9"});
    assert!(starts.matches(&entity));
    assert!(ends.matches(&entity));
    assert!(!starts.matches(&json!({"sku": "XAB"})));
    assert!(leaf_predicate("code", Operator::StartsWith, &["12"]).matches(&json!({"code": 123})));
}

#[test]
fn test_null_checks_ignore_values() {
    let is_null = predicate("filter[deleted_at][$null]=anything");
    let not_null = predicate("filter[deleted_at][$notnull]=");
    let deleted = json!({"deleted_at": "2024-01-01"});
    let live = json!({"deleted_at": null});
    let missing = json!({});
    assert!(!is_null.matches(&deleted));
    assert!(is_null.matches(&live));
    assert!(is_null.matches(&missing));
    assert!(not_null.matches(&deleted));
    assert!(!not_null.matches(&live));
}

#[test]
fn test_regex_operator() {
    let p = predicate("filter[code][$regex]=^A{1,3}-\\d+$");
    assert!(p.matches(&json!({"code": "AA-12"})));
    assert!(!p.matches(&json!({"code": "AAAA-12"})));
    assert!(!p.matches(&json!({"code": null})));
}

#[test]
fn test_empty_regex_matches_any_non_null_string() {
    let p = predicate("filter[name][$regex]=");
    assert!(p.matches(&json!({"name": ""})));
    assert!(p.matches(&json!({"name": "anything"})));
    assert!(!p.matches(&json!({"name": null})));
    assert!(!p.matches(&json!({})));

    let p = leaf_predicate("name", Operator::Regex, &[]);
    assert!(p.matches(&json!({"name": "x"})));
    assert!(!p.matches(&json!({"name": null})));
}

#[test]
fn test_invalid_regex_never_matches() {
    let p = leaf_predicate("name", Operator::Regex, &["("]);
    assert!(!p.matches(&json!({"name": "("})));
}

#[test]
fn test_nested_paths_are_null_safe() {
    let p = predicate("filter[owner][address][city]=Berlin");
    assert!(p.matches(&json!({"owner": {"address": {"city": "Berlin"}}})));
    assert!(!p.matches(&json!({"owner": {"address": null}})));
    assert!(!p.matches(&json!({"owner": null})));
    assert!(!p.matches(&json!({})));
}

#[test]
fn test_nested_groups() {
    let raw = "filter[group][$or]=either\
        &filter[group][either][0]=both\
        &filter[both][0][kind]=book\
        &filter[both][1][price][$lt]=20\
        &filter[either][0][featured]=true";
    let p = predicate(raw);
    assert!(p.matches(&json!({"kind": "book", "price": 10, "featured": false})));
    assert!(p.matches(&json!({"kind": "film", "price": 10, "featured": true})));
    assert!(!p.matches(&json!({"kind": "film", "price": 10, "featured": false})));
    assert!(!p.matches(&json!({"kind": "book", "price": 30, "featured": false})));
}

#[test]
fn test_unsupported_operator_fails_compilation() {
    let leaf = FilterLeaf::new("a", None, "a", Operator::None, ["1"]).unwrap();
    let root = FilterGroup::new("root", None, Conjunction::And, vec![FilterNode::Leaf(leaf)])
        .unwrap();
    assert!(matches!(
        compile_filter(Some(&root)),
        Err(QueryError::UnsupportedOperator { .. })
    ));
}

#[test]
fn test_expression_exposes_conditions() {
    let p = predicate("filter[a][$in]=1,2&filter[b][$null]=");
    let conditions = p.expression().conditions();
    assert_eq!(conditions.len(), 2);
    assert_eq!(conditions[0].path(), "a");
    assert_eq!(conditions[0].operator(), Operator::In);
    assert_eq!(conditions[0].values(), ["1", "2"]);
    assert!(matches!(conditions[1].comparison(), Comparison::Null));
    assert_eq!(p.expression().to_string(), r#"(a in ["1", "2"] AND b is null)"#);

    let serialized = serde_json::to_value(p.expression()).unwrap();
    assert_eq!(serialized["and"][0]["condition"]["path"], "a");
}

#[test]
fn test_matches_serialize() {
    #[derive(Serialize)]
    struct Product {
        name: String,
        price: f64,
    }
    let p = predicate("filter[price][$between]=10,20");
    assert!(p.matches_serialize(&Product {
        name: "pen".to_string(),
        price: 12.5,
    }));
    assert!(!p.matches_serialize(&Product {
        name: "desk".to_string(),
        price: 120.0,
    }));
}

#[test]
fn test_filter_slice() {
    let items = vec![json!({"n": 1}), json!({"n": 2}), json!({"n": 3})];
    let p = predicate("filter[n][$ge]=2");
    let kept = p.filter(&items);
    assert_eq!(kept, vec![&items[1], &items[2]]);
}
