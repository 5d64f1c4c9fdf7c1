//! Tests for the survey metadata model.

use serde_json::json;
use survey_model::traversal::{
    columns_from_mask, columns_from_set, masks_from_set, sets_from_set,
};
use survey_model::{
    CategoryValue, ColumnDef, ColumnType, DATA_FILE_SET, LibEntry, Meta, MetaError,
    ReferenceKind, Values,
};

fn grid_meta() -> Meta {
    let raw = json!({
        "info": {"text": "wave 1"},
        "lib": {
            "default text": "en-GB",
            "values": {
                "q5": [
                    {"value": 1, "text": {"en-GB": "Yes"}},
                    {"value": 2, "text": {"en-GB": "No"}}
                ],
                "ddf": {"q5": "ignored"}
            }
        },
        "columns": {
            "id": {"name": "id", "type": "int", "text": {"en-GB": "Respondent"}},
            "q1": {
                "name": "q1",
                "type": "single",
                "text": {"en-GB": "Gender"},
                "values": [
                    {"value": 1, "text": {"en-GB": "Male"}},
                    {"value": 2, "text": {"en-GB": "Female"}}
                ],
                "parent": {}
            },
            "q5_1": {"name": "q5_1", "type": "single", "text": {"en-GB": "Brand A"}, "values": "lib@values@q5"},
            "q5_2": {"name": "q5_2", "type": "single", "text": {"en-GB": "Brand B"}, "values": "lib@values@q5"}
        },
        "masks": {
            "q5": {
                "type": "array",
                "subtype": "single",
                "text": {"en-GB": "Brands"},
                "items": [
                    {"source": "columns@q5_1", "text": {"en-GB": "Brand A"}},
                    {"source": "columns@q5_2", "text": {"en-GB": "Brand B"}}
                ],
                "values": "lib@values@q5"
            }
        },
        "sets": {
            "data file": {
                "text": {"en-GB": "Variable order in source file"},
                "items": ["columns@id", "columns@q1", "masks@q5"]
            },
            "core": {"items": ["sets@data file", "columns@q1"]}
        },
        "type": "pandas.DataFrame"
    });
    serde_json::from_value(raw).unwrap()
}

#[test]
fn parses_document_and_keeps_unknown_fields() {
    let meta = grid_meta();
    let q1 = meta.column("q1").unwrap();
    assert_eq!(q1.column_type, ColumnType::Single);
    assert_eq!(q1.text.get("en-GB"), Some("Gender"));
    assert!(q1.extra.contains_key("parent"));
    assert!(matches!(meta.lib.values.get("ddf"), Some(LibEntry::Other(_))));

    let json = meta.to_json_string().unwrap();
    let round = Meta::from_json_str(&json).unwrap();
    assert_eq!(round, meta);
}

#[test]
fn resolves_library_values() {
    let meta = grid_meta();
    let column = meta.column("q5_1").unwrap();
    assert_eq!(
        column.values,
        Some(Values::Reference("lib@values@q5".to_string()))
    );
    let values = meta.resolved_values(column).unwrap().unwrap();
    assert_eq!(values.len(), 2);
    assert_eq!(values[1].text.get("en-GB"), Some("No"));

    let emulated = meta.emulate_column("q5_2").unwrap();
    assert!(matches!(emulated.values, Some(Values::List(ref list)) if list.len() == 2));
    assert_eq!(meta.value_codes("q1").unwrap(), vec![1, 2]);
}

#[test]
fn missing_library_entry_is_not_found() {
    let mut meta = grid_meta();
    meta.columns.get_mut("q1").unwrap().values =
        Some(Values::Reference("lib@values@nope".to_string()));
    let err = meta.value_codes("q1").unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"value library entry 'nope' not found in meta");
}

#[test]
fn walks_sets_through_masks_and_nested_sets() {
    let meta = grid_meta();
    assert_eq!(
        columns_from_set(&meta, DATA_FILE_SET).unwrap(),
        vec!["id", "q1", "q5_1", "q5_2"]
    );
    assert_eq!(columns_from_mask(&meta, "q5").unwrap(), vec!["q5_1", "q5_2"]);
    assert_eq!(masks_from_set(&meta, "core").unwrap(), vec!["q5"]);
    assert_eq!(sets_from_set(&meta, "core").unwrap(), vec!["data file"]);
}

#[test]
fn shared_columns_are_listed_once() {
    let meta = grid_meta();
    // `core` reaches q1 directly and through `data file`.
    assert_eq!(
        columns_from_set(&meta, "core").unwrap(),
        vec!["id", "q1", "q5_1", "q5_2"]
    );
}

#[test]
fn cyclic_sets_are_rejected() {
    let mut meta = grid_meta();
    meta.add_to_set("loop_a", "sets@loop_b");
    meta.add_to_set("loop_b", "sets@loop_a");
    let err = columns_from_set(&meta, "loop_a").unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"cyclic meta reference: sets@loop_a -> sets@loop_b -> sets@loop_a");
    assert!(meta.validate().is_err());
}

#[test]
fn dangling_references_are_reported() {
    let mut meta = grid_meta();
    meta.add_to_set(DATA_FILE_SET, "columns@ghost");
    meta.add_to_set("extra", "frames@x");
    let problems = meta.problems();
    assert!(problems.iter().any(|p| matches!(
        p,
        MetaError::NotFound { kind: ReferenceKind::Column, name } if name == "ghost"
    )));
    assert!(problems
        .iter()
        .any(|p| matches!(p, MetaError::InvalidReference { reference } if reference == "frames@x")));
}

#[test]
fn valid_document_passes_validation() {
    assert!(grid_meta().validate().is_ok());
}

#[test]
fn builds_new_documents() {
    let mut meta = Meta::new("en-GB");
    meta.add_column(
        ColumnDef::new("q2", ColumnType::DelimitedSet, "en-GB", "Brands used")
            .with_codes("en-GB", &[(1, "A"), (2, "B")]),
    );
    meta.add_column(ColumnDef::new("q2_1", ColumnType::Int, "en-GB", "A"));
    meta.add_column(ColumnDef::new("q2_10", ColumnType::Int, "en-GB", "J"));
    meta.add_column(ColumnDef::new("q2_2", ColumnType::Int, "en-GB", "B"));

    assert_eq!(
        meta.set(DATA_FILE_SET).unwrap().items,
        vec!["columns@q2", "columns@q2_1", "columns@q2_10", "columns@q2_2"]
    );
    let groups = meta.multicode_columns(&["q2"]);
    assert_eq!(groups["q2"], vec!["q2_1", "q2_2", "q2_10"]);
    assert_eq!(
        meta.column("q2").unwrap().values,
        Some(Values::List(vec![
            CategoryValue::new(1, "en-GB", "A"),
            CategoryValue::new(2, "en-GB", "B"),
        ]))
    );
}

#[test]
fn unknown_column_type_fails_to_parse() {
    let raw = json!({"name": "x", "type": "matrix", "text": {}});
    assert!(serde_json::from_value::<ColumnDef>(raw).is_err());
}
