//! Delimited-set codec.
//!
//! Multi-select answers are stored either as a group of dichotomous columns
//! (`q2_1`, `q2_2`, ... holding 1/0) or as one delimited-set column whose
//! cells list the selected codes, ascending and `;`-terminated (`"1;3;"`).
//! This module converts between the two forms and combines delimited sets.

use std::collections::BTreeSet;

use polars::prelude::{AnyValue, Column, DataFrame, IntoColumn, NamedFrom, Series};
use regex::Regex;
use serde::{Deserialize, Serialize};
use survey_common::{
    any_to_f64, code_tokens, join_codes, normalize_token, parse_f64, sort_codes,
};

use crate::error::{Result, TransformError};

/// Options for [`condense`] and [`expand_with`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CondenseOptions {
    /// Cell value that marks a code as selected.
    pub yes: i64,
    /// Cell value written for unselected codes when expanding.
    pub no: i64,
    /// Take each column's code from its name; otherwise number columns 1..N.
    pub values_from_labels: bool,
    /// Pattern whose first capture group is the code within a column name.
    /// Without one, the code is the part after the last `_`.
    pub values_regex: Option<String>,
    /// Return a numeric series when no row selects more than one code.
    pub sniff_single: bool,
}

impl Default for CondenseOptions {
    fn default() -> Self {
        Self {
            yes: 1,
            no: 0,
            values_from_labels: true,
            values_regex: None,
            sniff_single: false,
        }
    }
}

impl CondenseOptions {
    pub fn with_values_regex(mut self, pattern: impl Into<String>) -> Self {
        self.values_regex = Some(pattern.into());
        self
    }

    pub fn with_sniff_single(mut self, sniff: bool) -> Self {
        self.sniff_single = sniff;
        self
    }

    pub fn with_values_from_labels(mut self, from_labels: bool) -> Self {
        self.values_from_labels = from_labels;
        self
    }
}

/// How [`join`] combines two delimited sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinMode {
    /// Union the codes of both sides.
    #[default]
    Append,
    /// Take the right side wherever it has an answer.
    Overwrite,
}

/// Condense a group of dichotomous columns into one delimited-set series.
///
/// # Examples
///
/// ```
/// use polars::prelude::*;
/// use survey_transform::delimited::{CondenseOptions, condense};
///
/// let df = df!("q_1" => [1, 0], "q_2" => [0, 0], "q_3" => [1, 0]).unwrap();
/// let series = condense(&df, "q", &CondenseOptions::default()).unwrap();
/// assert_eq!(series.str().unwrap().get(0), Some("1;3;"));
/// assert_eq!(series.str().unwrap().get(1), None);
/// ```
pub fn condense(columns: &DataFrame, name: &str, options: &CondenseOptions) -> Result<Series> {
    let codes = column_codes(columns, options)?;
    let yes = options.yes as f64;
    let height = columns.height();
    let sources: Vec<&Column> = columns.get_columns().iter().collect();

    let mut rows: Vec<Vec<String>> = Vec::with_capacity(height);
    for idx in 0..height {
        let mut selected = Vec::new();
        for (column, code) in sources.iter().zip(&codes) {
            let cell = column.get(idx).unwrap_or(AnyValue::Null);
            if any_to_f64(cell) == Some(yes) {
                selected.push(code.clone());
            }
        }
        sort_codes(&mut selected);
        rows.push(selected);
    }

    let all_single = rows.iter().all(|row| row.len() <= 1);
    if options.sniff_single && all_single && codes.iter().all(|c| parse_f64(c).is_some()) {
        let values: Vec<Option<f64>> = rows
            .iter()
            .map(|row| row.first().and_then(|code| parse_f64(code)))
            .collect();
        return Ok(Series::new(name.into(), values));
    }

    let values: Vec<Option<String>> = rows.iter().map(|row| join_codes(row)).collect();
    Ok(Series::new(name.into(), values))
}

fn column_codes(columns: &DataFrame, options: &CondenseOptions) -> Result<Vec<String>> {
    let names: Vec<String> = columns
        .get_column_names()
        .iter()
        .map(ToString::to_string)
        .collect();
    if !options.values_from_labels {
        return Ok((1..=names.len()).map(|n| n.to_string()).collect());
    }
    let Some(pattern) = options.values_regex.as_deref() else {
        return Ok(names
            .iter()
            .map(|name| {
                let suffix = name.rsplit_once('_').map_or(name.as_str(), |(_, tail)| tail);
                normalize_token(suffix)
            })
            .collect());
    };
    let regex = Regex::new(pattern).map_err(|err| {
        TransformError::configuration(format!("invalid values_regex '{pattern}': {err}"))
    })?;
    names
        .iter()
        .map(|name| {
            regex
                .captures(name)
                .and_then(|caps| caps.get(1))
                .map(|code| normalize_token(code.as_str()))
                .ok_or_else(|| {
                    TransformError::configuration(format!(
                        "values_regex '{pattern}' does not match column '{name}'"
                    ))
                })
        })
        .collect()
}

/// Expand a delimited-set series into one Int64 `1`/`0` column per code.
///
/// Columns are named `<series name>_<code>`. Without a `universe`, the codes
/// found in the series are used. Rows without an answer stay null in every
/// generated column.
pub fn expand(series: &Series, universe: Option<&[i64]>) -> Result<DataFrame> {
    expand_with(series, universe, &CondenseOptions::default())
}

/// [`expand`] with custom `yes`/`no` cell values.
pub fn expand_with(
    series: &Series,
    universe: Option<&[i64]>,
    options: &CondenseOptions,
) -> Result<DataFrame> {
    let codes: Vec<String> = match universe {
        Some(codes) => codes.iter().map(ToString::to_string).collect(),
        None => value_map(series),
    };
    let rows = row_tokens(series);
    let columns: Vec<Column> = codes
        .iter()
        .map(|code| {
            let values: Vec<Option<i64>> = rows
                .iter()
                .map(|row| {
                    row.as_ref().map(|tokens| {
                        if tokens.contains(code) {
                            options.yes
                        } else {
                            options.no
                        }
                    })
                })
                .collect();
            Series::new(format!("{}_{code}", series.name()).into(), values).into_column()
        })
        .collect();
    Ok(DataFrame::new(columns)?)
}

/// Sorted, unique codes used anywhere in a delimited-set series.
pub fn value_map(series: &Series) -> Vec<String> {
    let mut seen: BTreeSet<String> = BTreeSet::new();
    for tokens in row_tokens(series).into_iter().flatten() {
        seen.extend(tokens);
    }
    let mut codes: Vec<String> = seen.into_iter().collect();
    sort_codes(&mut codes);
    codes
}

/// Combine two delimited sets row by row.
///
/// The result takes the name of `left` and is canonical (sorted, unique,
/// `;`-terminated, null for no answer).
pub fn join(left: &Series, right: &Series, mode: JoinMode) -> Result<Series> {
    if left.len() != right.len() {
        return Err(TransformError::configuration(format!(
            "cannot join delimited sets of different lengths ({} and {})",
            left.len(),
            right.len()
        )));
    }
    let values: Vec<Option<String>> = row_tokens(left)
        .into_iter()
        .zip(row_tokens(right))
        .map(|(l, r)| {
            let mut codes = match (l, r, mode) {
                (l, None, _) => l.unwrap_or_default(),
                (None, Some(r), _) | (_, Some(r), JoinMode::Overwrite) => r,
                (Some(mut l), Some(r), JoinMode::Append) => {
                    l.extend(r);
                    l
                }
            };
            sort_codes(&mut codes);
            join_codes(&codes)
        })
        .collect();
    Ok(Series::new(left.name().clone(), values))
}

/// Re-render every cell in canonical delimited form.
///
/// Numeric cells become `"<n>;"`, codes are sorted numerically and
/// de-duplicated, and empty answers become null. Canonical input is returned
/// unchanged.
pub fn canonicalize(series: &Series) -> Series {
    let values: Vec<Option<String>> = row_tokens(series)
        .into_iter()
        .map(|row| {
            row.and_then(|mut codes| {
                sort_codes(&mut codes);
                join_codes(&codes)
            })
        })
        .collect();
    Series::new(series.name().clone(), values)
}

/// Union of two delimited cells.
///
/// # Examples
///
/// ```
/// use survey_transform::delimited::merge_codes;
///
/// assert_eq!(merge_codes(Some("1;2;"), Some("2;3;")), Some("1;2;3;".to_string()));
/// assert_eq!(merge_codes(None, Some("4;")), Some("4;".to_string()));
/// assert_eq!(merge_codes(None, None), None);
/// ```
pub fn merge_codes(left: Option<&str>, right: Option<&str>) -> Option<String> {
    let mut codes: Vec<String> = [left, right]
        .into_iter()
        .flatten()
        .filter_map(|cell| code_tokens(AnyValue::String(cell)))
        .flatten()
        .collect();
    sort_codes(&mut codes);
    join_codes(&codes)
}

fn row_tokens(series: &Series) -> Vec<Option<Vec<String>>> {
    (0..series.len())
        .map(|idx| code_tokens(series.get(idx).unwrap_or(AnyValue::Null)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(values: &[Option<&str>]) -> Series {
        Series::new("q2".into(), values.to_vec())
    }

    #[test]
    fn join_append_unions_codes() {
        let left = text(&[Some("1;2;"), None, Some("5;")]);
        let right = text(&[Some("2;3;"), Some("4;"), None]);
        let joined = join(&left, &right, JoinMode::Append).unwrap();
        let joined = joined.str().unwrap();
        assert_eq!(joined.get(0), Some("1;2;3;"));
        assert_eq!(joined.get(1), Some("4;"));
        assert_eq!(joined.get(2), Some("5;"));
    }

    #[test]
    fn join_overwrite_prefers_right_answers() {
        let left = text(&[Some("1;2;"), Some("7;")]);
        let right = text(&[Some("3;"), None]);
        let joined = join(&left, &right, JoinMode::Overwrite).unwrap();
        let joined = joined.str().unwrap();
        assert_eq!(joined.get(0), Some("3;"));
        assert_eq!(joined.get(1), Some("7;"));
    }

    #[test]
    fn canonicalize_upcasts_numbers() {
        let numbers = Series::new("q1".into(), vec![Some(2.0), None, Some(10.0)]);
        let canonical = canonicalize(&numbers);
        let canonical = canonical.str().unwrap();
        assert_eq!(canonical.get(0), Some("2;"));
        assert_eq!(canonical.get(1), None);
        assert_eq!(canonical.get(2), Some("10;"));
    }

    #[test]
    fn value_map_sorts_numerically() {
        let series = text(&[Some("10;2;"), Some("1;"), None]);
        assert_eq!(value_map(&series), vec!["1", "2", "10"]);
    }
}
