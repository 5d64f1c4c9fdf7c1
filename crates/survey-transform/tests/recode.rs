//! Tests for metadata-driven recoding.

use polars::prelude::*;
use serde_json::json;
use survey_model::{ColumnDef, ColumnType, Meta};
use survey_transform::{
    Initialize, Logic, RecodeKey, RecodeMapper, RecodeOptions, SurveyFrame, TransformError,
    map_logic_to_index, recode,
};

fn meta() -> Meta {
    let mut meta = Meta::new("en-GB");
    meta.add_column(ColumnDef::new("id", ColumnType::Int, "en-GB", "Respondent"));
    meta.add_column(
        ColumnDef::new("src", ColumnType::DelimitedSet, "en-GB", "Brands seen")
            .with_codes("en-GB", &[(1, "A"), (2, "B"), (3, "C")]),
    );
    meta.add_column(
        ColumnDef::new("target", ColumnType::DelimitedSet, "en-GB", "Brand groups")
            .with_codes("en-GB", &[(10, "A or B"), (20, "C")]),
    );
    meta.add_column(ColumnDef::new("age", ColumnType::Int, "en-GB", "Age"));
    meta.add_column(
        ColumnDef::new("agegrp", ColumnType::Single, "en-GB", "Age group")
            .with_codes("en-GB", &[(1, "Under 30"), (2, "30+")]),
    );
    meta.add_column(ColumnDef::new("score", ColumnType::Float, "en-GB", "Score"));
    meta.add_column(ColumnDef::new("comment", ColumnType::String, "en-GB", "Comment"));
    meta
}

fn data() -> DataFrame {
    df!(
        "id" => [1i64, 2, 3, 4],
        "src" => [Some("1;3;"), Some("2;"), None, Some("3;")],
        "age" => [Some(25i64), Some(41), Some(30), None],
        "comment" => ["a", "b", "c", "d"],
    )
    .unwrap()
}

fn strings(series: &Series) -> Vec<Option<String>> {
    series
        .str()
        .unwrap()
        .into_iter()
        .map(|cell| cell.map(str::to_string))
        .collect()
}

fn text(values: &[Option<&str>]) -> Vec<Option<String>> {
    values.iter().map(|v| v.map(str::to_string)).collect()
}

#[test]
fn append_recode_builds_delimited_set() {
    let mapper = RecodeMapper::new()
        .with(10, Logic::has_any("src", [1]))
        .with(20, Logic::has_any("src", [3]));
    let options = RecodeOptions::new().with_append(true);
    let series = recode(&meta(), &data(), "target", &mapper, &options).unwrap();
    assert_eq!(series.name().as_str(), "target");
    assert_eq!(
        strings(&series),
        text(&[Some("10;20;"), None, None, Some("20;")])
    );
}

#[test]
fn overwrite_replaces_answers_only_where_selected() {
    let mut df = data();
    df.with_column(Series::new(
        "target".into(),
        vec![Some("20;"), Some("10;"), None, None],
    ))
    .unwrap();
    let mapper = RecodeMapper::new().with(10, Logic::has_any("src", [1, 2]));
    let series = recode(&meta(), &df, "target", &mapper, &RecodeOptions::new()).unwrap();
    assert_eq!(strings(&series), text(&[Some("10;"), Some("10;"), None, None]));

    let appended = recode(
        &meta(),
        &df,
        "target",
        &RecodeMapper::new().with(10, Logic::has_any("src", [3])),
        &RecodeOptions::new().with_append(true),
    )
    .unwrap();
    assert_eq!(strings(&appended), text(&[Some("10;20;"), Some("10;"), None, Some("10;")]));
}

#[test]
fn numeric_seed_is_upcast_before_appending() {
    let mut df = data();
    df.with_column(Series::new("target".into(), vec![Some(20i64), None, None, None]))
        .unwrap();
    let mapper = RecodeMapper::new().with(10, Logic::has_any("src", [1]));
    let series = recode(
        &meta(),
        &df,
        "target",
        &mapper,
        &RecodeOptions::new().with_append(true),
    )
    .unwrap();
    assert_eq!(strings(&series), text(&[Some("10;20;"), None, None, None]));
}

#[test]
fn single_target_takes_last_matching_key() {
    let mapper = RecodeMapper::from_json(&json!({
        "1": {"age": {"is_lt": 30}},
        "2": {"age": {"is_ge": 30}},
        "3": {"src": [2]}
    }))
    .unwrap();
    let series = recode(&meta(), &data(), "agegrp", &mapper, &RecodeOptions::new()).unwrap();
    let values: Vec<Option<i64>> = series.i64().unwrap().into_iter().collect();
    assert_eq!(values, vec![Some(1), Some(3), Some(2), None]);
}

#[test]
fn float_keys_produce_float_column() {
    let mapper = RecodeMapper::new()
        .with(0.5, Logic::has_any("src", [1]))
        .with(2, Logic::has_any("src", [2]));
    let series = recode(&meta(), &data(), "score", &mapper, &RecodeOptions::new()).unwrap();
    let values: Vec<Option<f64>> = series.f64().unwrap().into_iter().collect();
    assert_eq!(values, vec![Some(0.5), Some(2.0), None, None]);
}

#[test]
fn missing_source_column_is_reported() {
    let mapper = RecodeMapper::new().with(1, Logic::has_any("nope", [1]));
    let err = recode(&meta(), &data(), "agegrp", &mapper, &RecodeOptions::new()).unwrap_err();
    match err {
        TransformError::ColumnNotFound { name } => assert_eq!(name, "nope"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn append_requires_delimited_target() {
    let mapper = RecodeMapper::new().with(1, Logic::has_any("src", [1]));
    let err = recode(
        &meta(),
        &data(),
        "agegrp",
        &mapper,
        &RecodeOptions::new().with_append(true),
    )
    .unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"append requires a delimited set target, 'agegrp' is not one");
}

#[test]
fn unsupported_and_undeclared_targets() {
    let mapper = RecodeMapper::new().with(1, Logic::has_any("src", [1]));
    let err = recode(&meta(), &data(), "comment", &mapper, &RecodeOptions::new()).unwrap_err();
    assert!(matches!(
        err,
        TransformError::UnsupportedType { ref column, column_type: ColumnType::String } if column == "comment"
    ));

    let err = recode(&meta(), &data(), "ghost", &mapper, &RecodeOptions::new()).unwrap_err();
    assert!(matches!(err, TransformError::Configuration { .. }));

    let err = recode(
        &meta(),
        &data(),
        "agegrp",
        &mapper,
        &RecodeOptions::new().with_default("ghost"),
    )
    .unwrap_err();
    assert!(matches!(err, TransformError::Configuration { .. }));
}

#[test]
fn text_keys_are_rejected_for_numeric_targets() {
    let mapper = RecodeMapper::new().with("young", Logic::has_any("src", [1]));
    let err = recode(&meta(), &data(), "agegrp", &mapper, &RecodeOptions::new()).unwrap_err();
    assert!(matches!(err, TransformError::Configuration { .. }));
}

#[test]
fn bare_code_lists_need_a_default() {
    let mapper = RecodeMapper::from_json(&json!({"10": [1, 2], "20": [3]})).unwrap();
    let err = map_logic_to_index(&data(), &mapper, None, None).unwrap_err();
    insta::assert_snapshot!(
        err.to_string(),
        @"invalid configuration: mapper entry '10' is a bare code list but no default column was given"
    );

    let options = RecodeOptions::new().with_default("src");
    let series = recode(&meta(), &data(), "target", &mapper, &options).unwrap();
    assert_eq!(
        strings(&series),
        text(&[Some("10;20;"), Some("10;"), None, Some("20;")])
    );
}

#[test]
fn intersect_limits_every_entry() {
    let mapper = RecodeMapper::new()
        .with(10, Logic::has_any("src", [1, 2]))
        .with(20, Logic::has_any("src", [3]));
    let intersect = Logic::from_json(&json!({"age": {"is_lt": 40}})).unwrap();
    let index = map_logic_to_index(&data(), &mapper, None, Some(&intersect)).unwrap();
    let rows: Vec<u32> = index.get(&RecodeKey::Int(10)).unwrap().iter().collect();
    assert_eq!(rows, vec![0]);
    let rows: Vec<u32> = index.get(&RecodeKey::Int(20)).unwrap().iter().collect();
    assert_eq!(rows, vec![0]);
}

#[test]
fn initialize_copies_another_column() {
    let mapper = RecodeMapper::new().with(20, Logic::has_any("src", [2]));
    let options = RecodeOptions::new()
        .with_append(true)
        .with_initialize(Initialize::Column("src".to_string()));
    let series = recode(&meta(), &data(), "target", &mapper, &options).unwrap();
    assert_eq!(
        strings(&series),
        text(&[Some("1;3;"), Some("2;20;"), None, Some("3;")])
    );
}

#[test]
fn fillna_fills_remaining_rows() {
    let mapper = RecodeMapper::new().with(10, Logic::has_any("src", [1]));
    let options = RecodeOptions::new().with_fillna(99);
    let series = recode(&meta(), &data(), "target", &mapper, &options).unwrap();
    assert_eq!(
        strings(&series),
        text(&[Some("10;"), Some("99;"), Some("99;"), Some("99;")])
    );

    let series = recode(&meta(), &data(), "agegrp", &mapper, &options).unwrap();
    let values: Vec<Option<i64>> = series.i64().unwrap().into_iter().collect();
    assert_eq!(values, vec![Some(10), Some(99), Some(99), Some(99)]);
}

#[test]
fn empty_result_keeps_the_original_column() {
    let mut df = data();
    df.with_column(Series::new("agegrp".into(), vec![Some(1i64), Some(2), None, None]))
        .unwrap();
    let mapper = RecodeMapper::new().with(2, Logic::has_any("src", [9]));
    let series = recode(&meta(), &df, "agegrp", &mapper, &RecodeOptions::new()).unwrap();
    let values: Vec<Option<i64>> = series.i64().unwrap().into_iter().collect();
    assert_eq!(values, vec![Some(1), Some(2), None, None]);

    let series = recode(
        &meta(),
        &data(),
        "target",
        &RecodeMapper::new().with(10, Logic::has_any("src", [9])),
        &RecodeOptions::new(),
    )
    .unwrap();
    assert_eq!(series.null_count(), 4);
}

#[test]
fn recode_is_deterministic_and_leaves_input_alone() {
    let df = data();
    let before = df.clone();
    let mapper = RecodeMapper::new()
        .with(20, Logic::has_any("src", [3]))
        .with(10, Logic::has_any("src", [1, 2]));
    let options = RecodeOptions::new().with_append(true);
    let first = recode(&meta(), &df, "target", &mapper, &options).unwrap();
    let second = recode(&meta(), &df, "target", &mapper, &options).unwrap();
    assert_eq!(strings(&first), strings(&second));
    assert!(df.equals_missing(&before));
}

#[test]
fn survey_frame_writes_back_and_subsets() {
    let mut frame = SurveyFrame::new(meta(), data());
    let mapper = RecodeMapper::new().with(10, Logic::has_any("src", [1]));
    frame
        .apply_recode("target", &mapper, &RecodeOptions::new())
        .unwrap();
    let target = frame.data.column("target").unwrap().str().unwrap();
    assert_eq!(target.get(0), Some("10;"));
    assert_eq!(target.get(1), None);

    let subset = frame.subset(&["id", "target"]).unwrap();
    assert_eq!(subset.data.width(), 2);
    assert_eq!(subset.meta.columns.len(), 2);
    assert_eq!(
        subset.meta.set("data file").unwrap().items,
        vec!["columns@id", "columns@target"]
    );
    assert!(subset.missing_columns().is_empty());
    assert!(frame.subset(&["nope"]).is_err());
}
