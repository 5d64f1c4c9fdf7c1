//! Tests for logic evaluation.

use polars::prelude::*;
use serde_json::json;
use survey_transform::logic::resolve;
use survey_transform::{Logic, LogicEvaluator, RowIndex, TransformError};

fn responses() -> DataFrame {
    DataFrame::new(vec![
        Series::new("q1".into(), vec![Some(1i64), Some(2), Some(3), None, Some(1)]).into(),
        Series::new(
            "q2".into(),
            vec![Some("1;3;"), Some("2;"), None, Some("1;2;3;"), Some("3;")],
        )
        .into(),
        Series::new("age".into(), vec![Some(25.0), Some(40.0), Some(67.0), Some(18.0), None])
            .into(),
    ])
    .unwrap()
}

fn rows(index: &RowIndex) -> Vec<u32> {
    index.iter().collect()
}

fn eval(raw: serde_json::Value) -> Vec<u32> {
    let df = responses();
    let logic = Logic::from_json(&raw).unwrap();
    rows(&resolve(&df, &logic).unwrap())
}

#[test]
fn anchor_selects_every_row() {
    assert_eq!(eval(json!({"@": {}})), vec![0, 1, 2, 3, 4]);
}

#[test]
fn has_any_on_single_and_delimited_columns() {
    assert_eq!(eval(json!({"q1": [1]})), vec![0, 4]);
    assert_eq!(eval(json!({"q2": [3]})), vec![0, 3, 4]);
}

#[test]
fn has_all_requires_every_code() {
    assert_eq!(eval(json!({"q2": {"has_all": [1, 3]}})), vec![0, 3]);
}

#[test]
fn negative_membership_skips_missing_rows() {
    assert_eq!(eval(json!({"q2": {"not_any": [3]}})), vec![1]);
    assert_eq!(eval(json!({"q2": {"not_all": [1, 3]}})), vec![1, 4]);
}

#[test]
fn has_count_counts_codes() {
    assert_eq!(eval(json!({"q2": {"has_count": {"is_ge": 2}}})), vec![0, 3]);
    assert_eq!(eval(json!({"q2": {"has_count": 1}})), vec![1, 4]);
}

#[test]
fn numeric_comparisons() {
    assert_eq!(eval(json!({"age": {"is_lt": 30}})), vec![0, 3]);
    assert_eq!(eval(json!({"age": {"is_ge": 40}})), vec![1, 2]);
    assert_eq!(eval(json!({"age": {"is_ne": 40}})), vec![0, 2, 3]);
}

#[test]
fn missing_and_present() {
    assert_eq!(eval(json!({"q2": {"is_nan": true}})), vec![2]);
    assert_eq!(eval(json!({"q1": {"not_nan": true}})), vec![0, 1, 2, 4]);
}

#[test]
fn combinators_nest() {
    assert_eq!(
        eval(json!({"OR": [{"q1": [2]}, {"AND": [{"q2": [3]}, {"age": {"is_gt": 20}}]}]})),
        vec![0, 1]
    );
    assert_eq!(eval(json!({"NOT": {"q1": [1]}})), vec![1, 2, 3]);
    assert_eq!(
        eval(json!({"intersection": [{"q2": [1]}, {"union": [{"q1": [1]}, {"q1": {"is_nan": true}}]}]})),
        vec![0, 3]
    );
}

#[test]
fn bare_codes_use_the_default_column() {
    let df = responses();
    let evaluator = LogicEvaluator::new(&df).with_default(Some("q2"));
    let index = evaluator.resolve(&Logic::Codes(vec![2])).unwrap();
    assert_eq!(rows(&index), vec![1, 3]);

    let err = resolve(&df, &Logic::Codes(vec![2])).unwrap_err();
    assert!(matches!(err, TransformError::Configuration { .. }));
}

#[test]
fn unknown_column_is_named() {
    let df = responses();
    let err = resolve(&df, &Logic::has_any("q9", [1])).unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"column 'q9' not found in data");
}

#[test]
fn evaluation_is_repeatable() {
    let df = responses();
    let logic = Logic::from_json(&json!({"q2": {"has_any": [1, 2]}, "age": {"is_le": 40}})).unwrap();
    let first = resolve(&df, &logic).unwrap();
    let second = resolve(&df, &logic).unwrap();
    assert_eq!(first, second);
    assert_eq!(rows(&first), vec![0, 1, 3]);
}

#[test]
fn logic_deserializes_from_serde() {
    let logic: Logic = serde_json::from_value(json!({"q1": [1, 2]})).unwrap();
    assert_eq!(logic, Logic::has_any("q1", [1, 2]));
    assert!(serde_json::from_value::<Logic>(json!({"q1": true})).is_err());
}
