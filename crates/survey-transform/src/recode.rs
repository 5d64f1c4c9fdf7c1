//! Metadata-driven recoding.
//!
//! A recode mapper assigns an output value to each logic expression:
//!
//! ```text
//! {"1": {"q1": [1, 2]}, "2": {"q1": [3]}, "3": {"age": {"is_ge": 65}}}
//! ```
//!
//! [`map_logic_to_index`] resolves every expression into the rows it selects
//! and [`recode`] writes the output values into a target column, following
//! the type the metadata declares for it.

use std::fmt;

use polars::prelude::{DataFrame, IntoColumn, NamedFrom, Series};
use regex::escape;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use survey_common::{
    ColumnValues, ValueKind, any_to_string_non_empty, format_numeric, normalize_token, parse_f64,
    sort_codes,
};
use survey_model::{ColumnType, Meta};
use tracing::{debug, warn};

use crate::delimited::{CondenseOptions, JoinMode, canonicalize, condense, join};
use crate::error::{Result, TransformError};
use crate::logic::{Logic, LogicEvaluator, RowIndex};

/// Output value of a recode mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecodeKey {
    Int(i64),
    Float(f64),
    Text(String),
}

impl RecodeKey {
    /// Read a mapper key; numeric strings become numbers.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Ok(int) = trimmed.parse::<i64>() {
            return RecodeKey::Int(int);
        }
        match parse_f64(trimmed) {
            Some(float) => RecodeKey::Float(float),
            None => RecodeKey::Text(raw.to_string()),
        }
    }

    /// The key as a delimited-set code token.
    pub fn token(&self) -> String {
        match self {
            RecodeKey::Int(int) => int.to_string(),
            RecodeKey::Float(float) => format_numeric(*float),
            RecodeKey::Text(text) => normalize_token(text),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            #[allow(clippy::cast_precision_loss)]
            RecodeKey::Int(int) => Some(*int as f64),
            RecodeKey::Float(float) => Some(*float),
            RecodeKey::Text(_) => None,
        }
    }
}

impl fmt::Display for RecodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecodeKey::Text(text) => f.write_str(text),
            other => f.write_str(&other.token()),
        }
    }
}

impl From<i64> for RecodeKey {
    fn from(value: i64) -> Self {
        RecodeKey::Int(value)
    }
}

impl From<i32> for RecodeKey {
    fn from(value: i32) -> Self {
        RecodeKey::Int(i64::from(value))
    }
}

impl From<f64> for RecodeKey {
    fn from(value: f64) -> Self {
        RecodeKey::Float(value)
    }
}

impl From<&str> for RecodeKey {
    fn from(value: &str) -> Self {
        RecodeKey::parse(value)
    }
}

/// Ordered `output value -> logic` pairs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecodeMapper {
    entries: Vec<(RecodeKey, Logic)>,
}

impl RecodeMapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<RecodeKey>, logic: Logic) -> Self {
        self.push(key, logic);
        self
    }

    pub fn push(&mut self, key: impl Into<RecodeKey>, logic: Logic) {
        self.entries.push((key.into(), logic));
    }

    /// Read a JSON object mapping output values to logic, keeping key order.
    pub fn from_json(value: &Value) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(TransformError::configuration(format!(
                "recode mapper must be an object, got {value}"
            )));
        };
        let mut mapper = Self::new();
        for (key, logic) in map {
            mapper.push(RecodeKey::parse(key), Logic::from_json(logic)?);
        }
        Ok(mapper)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(RecodeKey, Logic)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Vec<(RecodeKey, Logic)>> for RecodeMapper {
    fn from(entries: Vec<(RecodeKey, Logic)>) -> Self {
        Self { entries }
    }
}

/// Ordered `output value -> selected rows` pairs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexMapper {
    entries: Vec<(RecodeKey, RowIndex)>,
}

impl IndexMapper {
    pub fn iter(&self) -> impl Iterator<Item = &(RecodeKey, RowIndex)> {
        self.entries.iter()
    }

    pub fn get(&self, key: &RecodeKey) -> Option<&RowIndex> {
        self.entries
            .iter()
            .find(|(candidate, _)| candidate == key)
            .map(|(_, rows)| rows)
    }

    pub fn keys(&self) -> impl Iterator<Item = &RecodeKey> {
        self.entries.iter().map(|(key, _)| key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when no entry selects any row.
    pub fn selects_nothing(&self) -> bool {
        self.entries.iter().all(|(_, rows)| rows.is_empty())
    }
}

/// Resolve every logic of `mapper` into the rows it selects.
///
/// Bare code lists apply to `default`; `intersect` is AND-ed into every
/// entry.
pub fn map_logic_to_index(
    data: &DataFrame,
    mapper: &RecodeMapper,
    default: Option<&str>,
    intersect: Option<&Logic>,
) -> Result<IndexMapper> {
    let evaluator = LogicEvaluator::new(data).with_default(default);
    let mut entries = Vec::with_capacity(mapper.len());
    for (key, logic) in mapper.iter() {
        if matches!(logic, Logic::Codes(_)) && default.is_none() {
            return Err(TransformError::configuration(format!(
                "mapper entry '{key}' is a bare code list but no default column was given"
            )));
        }
        let rows = match intersect {
            Some(extra) => evaluator.resolve(&Logic::And(vec![logic.clone(), extra.clone()]))?,
            None => evaluator.resolve(logic)?,
        };
        debug!(key = %key, rows = rows.len(), "resolved recode entry");
        entries.push((key.clone(), rows));
    }
    Ok(IndexMapper { entries })
}

/// Where the recoded values start from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Initialize {
    /// Copy another column.
    Column(String),
    /// Start with every row missing.
    Empty,
}

/// Options for [`recode`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecodeOptions {
    /// Column used by bare code lists in the mapper.
    pub default: Option<String>,
    /// Add codes to existing delimited-set answers instead of replacing them.
    pub append: bool,
    /// Logic AND-ed into every mapper entry.
    pub intersect: Option<Logic>,
    /// Starting values; defaults to the existing target column.
    pub initialize: Option<Initialize>,
    /// Value written into rows that are still missing afterwards.
    pub fillna: Option<RecodeKey>,
}

impl RecodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default(mut self, column: impl Into<String>) -> Self {
        self.default = Some(column.into());
        self
    }

    pub fn with_append(mut self, append: bool) -> Self {
        self.append = append;
        self
    }

    pub fn with_intersect(mut self, logic: Logic) -> Self {
        self.intersect = Some(logic);
        self
    }

    pub fn with_initialize(mut self, initialize: Initialize) -> Self {
        self.initialize = Some(initialize);
        self
    }

    pub fn with_fillna(mut self, value: impl Into<RecodeKey>) -> Self {
        self.fillna = Some(value.into());
        self
    }
}

/// Recode `target` from `mapper`, returning the new column.
///
/// `data` is not modified; use [`SurveyFrame::apply_recode`] to write the
/// result back.
///
/// [`SurveyFrame::apply_recode`]: crate::frame::SurveyFrame::apply_recode
pub fn recode(
    meta: &Meta,
    data: &DataFrame,
    target: &str,
    mapper: &RecodeMapper,
    options: &RecodeOptions,
) -> Result<Series> {
    let column_type = validate(meta, target, options)?;
    let index = map_logic_to_index(
        data,
        mapper,
        options.default.as_deref(),
        options.intersect.as_ref(),
    )?;
    let seed = seed_values(data, target, options)?;

    let recoded = match column_type {
        ColumnType::DelimitedSet => {
            recode_delimited(meta, data.height(), target, &index, seed, options)?
        }
        _ => recode_scalar(target, column_type, &index, seed)?,
    };
    match options.fillna.as_ref() {
        Some(fill) => fill_missing(recoded, target, column_type, fill),
        None => Ok(recoded),
    }
}

fn validate(meta: &Meta, target: &str, options: &RecodeOptions) -> Result<ColumnType> {
    let Some(column) = meta.columns.get(target) else {
        return Err(TransformError::configuration(format!(
            "target column '{target}' is not declared in meta"
        )));
    };
    let column_type = column.column_type;
    if options.append && column_type != ColumnType::DelimitedSet {
        return Err(TransformError::AppendRequiresDelimitedSet {
            column: target.to_string(),
        });
    }
    if !matches!(
        column_type,
        ColumnType::DelimitedSet | ColumnType::Single | ColumnType::Int | ColumnType::Float
    ) {
        return Err(TransformError::UnsupportedType {
            column: target.to_string(),
            column_type,
        });
    }
    if let Some(default) = options.default.as_deref()
        && !meta.columns.contains_key(default)
    {
        return Err(TransformError::configuration(format!(
            "default column '{default}' is not declared in meta"
        )));
    }
    if let Some(Initialize::Column(source)) = options.initialize.as_ref()
        && !meta.columns.contains_key(source)
    {
        return Err(TransformError::configuration(format!(
            "initialize column '{source}' is not declared in meta"
        )));
    }
    Ok(column_type)
}

fn seed_values(data: &DataFrame, target: &str, options: &RecodeOptions) -> Result<ColumnValues> {
    let height = data.height();
    match options.initialize.as_ref() {
        Some(Initialize::Column(source)) => data
            .column(source)
            .map(ColumnValues::from_column)
            .map_err(|_| TransformError::column_not_found(source)),
        Some(Initialize::Empty) => Ok(ColumnValues::nulls(ValueKind::Int, height)),
        None => Ok(data
            .column(target)
            .map(ColumnValues::from_column)
            .unwrap_or_else(|_| ColumnValues::nulls(ValueKind::Int, height))),
    }
}

fn recode_delimited(
    meta: &Meta,
    height: usize,
    target: &str,
    index: &IndexMapper,
    seed: ColumnValues,
    options: &RecodeOptions,
) -> Result<Series> {
    let seed = canonicalize(&seed.into_series(target));

    let mut codes: Vec<String> = if index.is_empty() {
        meta.value_codes(target)?
            .iter()
            .map(ToString::to_string)
            .collect()
    } else {
        index.keys().map(RecodeKey::token).collect()
    };
    sort_codes(&mut codes);

    let recoded = if codes.is_empty() {
        Series::new(target.into(), vec![None::<String>; height])
    } else {
        let matrix = dichotomous_matrix(target, height, &codes, index)?;
        let options = CondenseOptions::default()
            .with_values_regex(format!("^{}_(.+)$", escape(target)));
        condense(&matrix, target, &options)?
    };

    let mode = if options.append {
        JoinMode::Append
    } else {
        JoinMode::Overwrite
    };
    let joined = join(&seed, &recoded, mode)?;
    if joined.null_count() == joined.len() {
        warn!(column = target, "recode produced no values, keeping original column");
        return Ok(seed);
    }
    Ok(joined)
}

fn dichotomous_matrix(
    target: &str,
    height: usize,
    codes: &[String],
    index: &IndexMapper,
) -> Result<DataFrame> {
    let columns = codes
        .iter()
        .map(|code| {
            let rows = index
                .iter()
                .filter(|(key, _)| key.token() == *code)
                .fold(RowIndex::new(), |acc, (_, rows)| acc | rows);
            let values: Vec<i64> = (0..height)
                .map(|idx| u32::try_from(idx).map_or(0, |row| i64::from(rows.contains(row))))
                .collect();
            Series::new(format!("{target}_{code}").into(), values).into_column()
        })
        .collect();
    Ok(DataFrame::new(columns)?)
}

fn recode_scalar(
    target: &str,
    column_type: ColumnType,
    index: &IndexMapper,
    seed: ColumnValues,
) -> Result<Series> {
    for key in index.keys() {
        if key.as_f64().is_none() {
            return Err(TransformError::configuration(format!(
                "recode value '{key}' is not numeric but '{target}' is of type '{column_type}'"
            )));
        }
    }
    let seed = numeric_seed(seed);
    if index.selects_nothing() {
        warn!(column = target, "recode selected no rows, keeping original column");
        return Ok(seed.into_series(target));
    }

    let keys_are_int = index.keys().all(|key| matches!(key, RecodeKey::Int(_)));
    let values = match seed {
        ColumnValues::Int(mut values) if keys_are_int => {
            for (key, rows) in index.iter() {
                if let RecodeKey::Int(code) = key {
                    assign(&mut values, rows, *code);
                }
            }
            ColumnValues::Int(values)
        }
        other => {
            let ColumnValues::Float(mut values) = other.widen(ValueKind::Float) else {
                return Err(TransformError::configuration(format!(
                    "cannot store numeric recode values in '{target}'"
                )));
            };
            for (key, rows) in index.iter() {
                if let Some(number) = key.as_f64() {
                    assign(&mut values, rows, number);
                }
            }
            ColumnValues::Float(values)
        }
    };
    Ok(values.into_series(target))
}

/// Numeric view of the seed; text cells are parsed.
fn numeric_seed(seed: ColumnValues) -> ColumnValues {
    match seed {
        ColumnValues::Bool(_) => seed.widen(ValueKind::Int),
        ColumnValues::Text(values) => ColumnValues::Float(
            values
                .iter()
                .map(|cell| cell.as_deref().and_then(parse_f64))
                .collect(),
        ),
        numeric => numeric,
    }
}

fn assign<T: Copy>(values: &mut [Option<T>], rows: &RowIndex, value: T) {
    for row in rows {
        if let Some(slot) = values.get_mut(row as usize) {
            *slot = Some(value);
        }
    }
}

fn fill_missing(
    series: Series,
    target: &str,
    column_type: ColumnType,
    fill: &RecodeKey,
) -> Result<Series> {
    if column_type == ColumnType::DelimitedSet {
        let token = fill.token();
        let filled: Vec<Option<String>> = (0..series.len())
            .map(|idx| {
                let cell = series.get(idx).ok().and_then(any_to_string_non_empty);
                Some(cell.unwrap_or_else(|| format!("{token};")))
            })
            .collect();
        return Ok(Series::new(target.into(), filled));
    }
    let Some(number) = fill.as_f64() else {
        return Err(TransformError::configuration(format!(
            "fillna value '{fill}' is not numeric but '{target}' is of type '{column_type}'"
        )));
    };
    let values = ColumnValues::from_column(&series.into_column());
    let filled = match (values, fill) {
        (ColumnValues::Int(values), RecodeKey::Int(int)) => {
            ColumnValues::Int(values.into_iter().map(|v| v.or(Some(*int))).collect())
        }
        (other, _) => match other.widen(ValueKind::Float) {
            ColumnValues::Float(values) => {
                ColumnValues::Float(values.into_iter().map(|v| v.or(Some(number))).collect())
            }
            unexpected => unexpected,
        },
    };
    Ok(filled.into_series(target))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_parse_as_numbers_when_possible() {
        assert_eq!(RecodeKey::parse("10"), RecodeKey::Int(10));
        assert_eq!(RecodeKey::parse("2.5"), RecodeKey::Float(2.5));
        assert_eq!(RecodeKey::parse("x"), RecodeKey::Text("x".to_string()));
        assert_eq!(RecodeKey::Float(3.0).token(), "3");
    }

    #[test]
    fn mapper_keeps_json_order() {
        let raw = serde_json::json!({"20": {"q1": [3]}, "10": {"q1": [1]}});
        let mapper = RecodeMapper::from_json(&raw).unwrap();
        let keys: Vec<String> = mapper.iter().map(|(key, _)| key.to_string()).collect();
        assert_eq!(keys, vec!["20", "10"]);
    }
}
