//! Tests for the delimited-set codec.

use std::collections::BTreeSet;

use polars::prelude::*;
use proptest::prelude::*;
use survey_transform::delimited::{
    CondenseOptions, JoinMode, canonicalize, condense, expand, join, value_map,
};
use survey_transform::TransformError;

fn strings(series: &Series) -> Vec<Option<String>> {
    series
        .str()
        .unwrap()
        .into_iter()
        .map(|cell| cell.map(str::to_string))
        .collect()
}

fn ints(df: &DataFrame, name: &str) -> Vec<Option<i64>> {
    df.column(name).unwrap().i64().unwrap().into_iter().collect()
}

fn dichotomous(rows: &[Vec<bool>], prefix: &str) -> DataFrame {
    let width = rows.first().map_or(0, Vec::len);
    let columns = (0..width)
        .map(|col| {
            let values: Vec<i64> = rows.iter().map(|row| i64::from(row[col])).collect();
            Series::new(format!("{prefix}_{}", col + 1).into(), values).into()
        })
        .collect();
    DataFrame::new(columns).unwrap()
}

#[test]
fn condenses_selected_codes() {
    let df = df!(
        "q_1" => [1, 0, 0],
        "q_2" => [0, 1, 0],
        "q_3" => [1, 1, 0],
    )
    .unwrap();
    let series = condense(&df, "q", &CondenseOptions::default()).unwrap();
    assert_eq!(series.name().as_str(), "q");
    assert_eq!(
        strings(&series),
        vec![Some("1;3;".to_string()), Some("2;3;".to_string()), None]
    );
}

#[test]
fn non_yes_values_count_as_no() {
    let df = df!(
        "q_1" => [Some(1.0), Some(2.0), None],
        "q_5" => [Some(0.0), Some(1.0), None],
    )
    .unwrap();
    let series = condense(&df, "q", &CondenseOptions::default()).unwrap();
    assert_eq!(strings(&series), vec![Some("1;".to_string()), Some("5;".to_string()), None]);
}

#[test]
fn codes_sort_numerically() {
    let df = df!("q_10" => [1], "q_2" => [1], "q_1" => [1]).unwrap();
    let series = condense(&df, "q", &CondenseOptions::default()).unwrap();
    assert_eq!(strings(&series), vec![Some("1;2;10;".to_string())]);
}

#[test]
fn codes_from_regex_and_sequence() {
    let df = df!("brand01r" => [1, 0], "brand07r" => [1, 1]).unwrap();
    let options = CondenseOptions::default().with_values_regex(r"^brand(\d+)r$");
    let series = condense(&df, "brand", &options).unwrap();
    assert_eq!(strings(&series), vec![Some("1;7;".to_string()), Some("7;".to_string())]);

    let options = CondenseOptions::default().with_values_from_labels(false);
    let series = condense(&df, "brand", &options).unwrap();
    assert_eq!(strings(&series), vec![Some("1;2;".to_string()), Some("2;".to_string())]);
}

#[test]
fn regex_mismatch_names_pattern_and_column() {
    let df = df!("brand01r" => [1], "other" => [0]).unwrap();
    let options = CondenseOptions::default().with_values_regex(r"^brand(\d+)r$");
    let err = condense(&df, "brand", &options).unwrap_err();
    assert!(matches!(err, TransformError::Configuration { .. }));
    insta::assert_snapshot!(
        err.to_string(),
        @r"invalid configuration: values_regex '^brand(\d+)r$' does not match column 'other'"
    );
}

#[test]
fn all_missing_input_gives_all_null_output() {
    let df = df!(
        "q_1" => [None::<i64>, None],
        "q_2" => [None::<i64>, None],
    )
    .unwrap();
    let series = condense(&df, "q", &CondenseOptions::default()).unwrap();
    assert_eq!(series.null_count(), 2);
}

#[test]
fn sniff_single_returns_numbers() {
    let df = df!("q_1" => [1, 0, 0], "q_4" => [0, 1, 0]).unwrap();
    let series = condense(&df, "q", &CondenseOptions::default().with_sniff_single(true)).unwrap();
    let values: Vec<Option<f64>> = series.f64().unwrap().into_iter().collect();
    assert_eq!(values, vec![Some(1.0), Some(4.0), None]);

    let multi = df!("q_1" => [1], "q_4" => [1]).unwrap();
    let series = condense(&multi, "q", &CondenseOptions::default().with_sniff_single(true)).unwrap();
    assert_eq!(strings(&series), vec![Some("1;4;".to_string())]);
}

#[test]
fn expand_keeps_missing_rows_null() {
    let series = Series::new("q".into(), vec![Some("1;3;"), None, Some("2;")]);
    let df = expand(&series, None).unwrap();
    assert_eq!(
        df.get_column_names()
            .iter()
            .map(|name| name.as_str())
            .collect::<Vec<_>>(),
        vec!["q_1", "q_2", "q_3"]
    );
    assert_eq!(ints(&df, "q_1"), vec![Some(1), None, Some(0)]);
    assert_eq!(ints(&df, "q_3"), vec![Some(1), None, Some(0)]);
}

#[test]
fn expand_uses_given_universe() {
    let series = Series::new("q".into(), vec![Some("2;")]);
    let df = expand(&series, Some(&[1, 2, 5])).unwrap();
    assert_eq!(df.width(), 3);
    assert_eq!(ints(&df, "q_5"), vec![Some(0)]);
    assert_eq!(ints(&df, "q_2"), vec![Some(1)]);
}

#[test]
fn join_dedups_and_resorts() {
    let left = Series::new("q".into(), vec![Some("3;1;"), Some("2;")]);
    let right = Series::new("other".into(), vec![Some("1;10;"), None]);
    let joined = join(&left, &right, JoinMode::Append).unwrap();
    assert_eq!(joined.name().as_str(), "q");
    assert_eq!(
        strings(&joined),
        vec![Some("1;3;10;".to_string()), Some("2;".to_string())]
    );
}

#[test]
fn join_rejects_different_lengths() {
    let left = Series::new("q".into(), vec![Some("1;")]);
    let right = Series::new("q".into(), vec![Some("1;"), None]);
    assert!(join(&left, &right, JoinMode::Overwrite).is_err());
}

#[test]
fn value_map_lists_codes() {
    let series = Series::new("q".into(), vec![Some("5;1;"), Some("3.0;"), None]);
    assert_eq!(value_map(&series), vec!["1", "3", "5"]);
}

fn non_empty_rows() -> impl Strategy<Value = Vec<Vec<bool>>> {
    (1usize..6).prop_flat_map(|width| {
        prop::collection::vec(prop::collection::vec(any::<bool>(), width), 1..20).prop_map(
            |mut rows| {
                for row in &mut rows {
                    if !row.iter().any(|selected| *selected) {
                        row[0] = true;
                    }
                }
                rows
            },
        )
    })
}

fn code_rows() -> impl Strategy<Value = Vec<Option<BTreeSet<u8>>>> {
    prop::collection::vec(
        prop::option::of(prop::collection::btree_set(0u8..30, 1..5)),
        0..20,
    )
}

fn render(rows: &[Option<BTreeSet<u8>>], shuffle: bool) -> Series {
    let cells: Vec<Option<String>> = rows
        .iter()
        .map(|row| {
            row.as_ref().map(|codes| {
                let mut codes: Vec<u8> = codes.iter().copied().collect();
                if shuffle {
                    codes.reverse();
                }
                codes.iter().map(|code| format!("{code};")).collect()
            })
        })
        .collect();
    Series::new("q".into(), cells)
}

proptest! {
    #[test]
    fn expand_inverts_condense(rows in non_empty_rows()) {
        let df = dichotomous(&rows, "q");
        let width = df.width();
        let series = condense(&df, "q", &CondenseOptions::default()).unwrap();
        let universe: Vec<i64> = (1..=width as i64).collect();
        let expanded = expand(&series, Some(&universe)).unwrap();
        for col in 1..=width {
            let name = format!("q_{col}");
            let expected: Vec<Option<i64>> = rows.iter().map(|row| Some(i64::from(row[col - 1]))).collect();
            prop_assert_eq!(ints(&expanded, &name), expected);
        }
    }

    #[test]
    fn canonical_series_are_fixed_points(rows in code_rows()) {
        let canonical = render(&rows, false);
        prop_assert_eq!(strings(&canonicalize(&canonical)), strings(&canonical));

        let shuffled = render(&rows, true);
        let once = canonicalize(&shuffled);
        prop_assert_eq!(strings(&once), strings(&canonical));
        prop_assert_eq!(strings(&canonicalize(&once)), strings(&once));
    }

    #[test]
    fn condense_of_expanded_canonical_data_is_unchanged(rows in code_rows()) {
        let canonical = render(&rows, false);
        let expanded = expand(&canonical, None).unwrap();
        prop_assume!(expanded.width() > 0);
        let condensed = condense(&expanded, "q", &CondenseOptions::default()).unwrap();
        prop_assert_eq!(strings(&condensed), strings(&canonical));
    }
}
