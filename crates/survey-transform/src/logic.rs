//! Declarative row selection.
//!
//! A [`Logic`] expression describes which rows of a dataset to select in
//! terms of the response codes held by its columns. [`LogicEvaluator`]
//! resolves an expression into a [`RowIndex`], a compressed bitmap of row
//! positions.
//!
//! Expressions are usually written as JSON:
//!
//! ```text
//! [1, 2]                                  has any of 1, 2 in the default column
//! {"q1": [1, 2]}                          q1 has any of 1, 2
//! {"q2": {"has_all": [1, 3]}}             q2 has both 1 and 3
//! {"q2": {"has_count": {"is_ge": 2}}}     q2 has at least two codes
//! {"age": {"is_lt": 30}}                  age < 30
//! {"AND": [{"q1": [1]}, {"NOT": {"q3": {"is_nan": true}}}]}
//! ```

use std::fmt;

use polars::prelude::{AnyValue, DataFrame};
use roaring::RoaringBitmap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use survey_common::{any_to_f64, code_tokens, parse_i64};

use crate::error::{Result, TransformError};

/// Row positions selected by a logic expression.
pub type RowIndex = RoaringBitmap;

/// Name of the pseudo-column that matches every row.
pub const ANCHOR: &str = "@";

/// Comparison operator of a numeric condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Lt,
    Le,
    Eq,
    Ne,
    Ge,
    Gt,
}

impl CompareOp {
    pub fn key(self) -> &'static str {
        match self {
            CompareOp::Lt => "is_lt",
            CompareOp::Le => "is_le",
            CompareOp::Eq => "is_eq",
            CompareOp::Ne => "is_ne",
            CompareOp::Ge => "is_ge",
            CompareOp::Gt => "is_gt",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "is_lt" => Some(CompareOp::Lt),
            "is_le" => Some(CompareOp::Le),
            "is_eq" => Some(CompareOp::Eq),
            "is_ne" => Some(CompareOp::Ne),
            "is_ge" => Some(CompareOp::Ge),
            "is_gt" => Some(CompareOp::Gt),
            _ => None,
        }
    }
}

/// `<op> value`, e.g. `>= 2`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Comparison {
    pub op: CompareOp,
    pub value: f64,
}

impl Comparison {
    pub fn new(op: CompareOp, value: f64) -> Self {
        Self { op, value }
    }

    pub fn matches(&self, candidate: f64) -> bool {
        match self.op {
            CompareOp::Lt => candidate < self.value,
            CompareOp::Le => candidate <= self.value,
            CompareOp::Eq => candidate == self.value,
            CompareOp::Ne => candidate != self.value,
            CompareOp::Ge => candidate >= self.value,
            CompareOp::Gt => candidate > self.value,
        }
    }
}

/// Test applied to the cells of one column.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    HasAny(Vec<i64>),
    HasAll(Vec<i64>),
    /// Answered, but none of the codes.
    NotAny(Vec<i64>),
    /// Answered, but not all of the codes.
    NotAll(Vec<i64>),
    /// Number of codes given.
    HasCount(Comparison),
    /// Numeric value of the cell.
    Compare(Comparison),
    Missing,
    Present,
}

/// A row selection expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub enum Logic {
    /// Every row.
    Anchor,
    /// Has any of these codes, in the evaluator's default column.
    Codes(Vec<i64>),
    Column { name: String, condition: Condition },
    And(Vec<Logic>),
    Or(Vec<Logic>),
    Not(Box<Logic>),
}

impl Logic {
    pub fn column(name: impl Into<String>, condition: Condition) -> Self {
        Logic::Column {
            name: name.into(),
            condition,
        }
    }

    pub fn has_any(name: impl Into<String>, codes: impl Into<Vec<i64>>) -> Self {
        Self::column(name, Condition::HasAny(codes.into()))
    }

    pub fn has_all(name: impl Into<String>, codes: impl Into<Vec<i64>>) -> Self {
        Self::column(name, Condition::HasAll(codes.into()))
    }

    pub fn not_any(name: impl Into<String>, codes: impl Into<Vec<i64>>) -> Self {
        Self::column(name, Condition::NotAny(codes.into()))
    }

    pub fn negate(inner: Logic) -> Self {
        Logic::Not(Box::new(inner))
    }

    /// Parse the JSON form of an expression.
    pub fn from_json(value: &Value) -> Result<Self> {
        match value {
            Value::Array(_) => Ok(Logic::Codes(parse_codes(value)?)),
            Value::String(s) if s == ANCHOR => Ok(Logic::Anchor),
            Value::Object(map) => parse_object(map),
            other => Err(TransformError::malformed(format!(
                "expected a code list or an object, got {other}"
            ))),
        }
    }

    /// Render the JSON form accepted by [`Logic::from_json`].
    pub fn to_json(&self) -> Value {
        match self {
            Logic::Anchor => Value::String(ANCHOR.to_string()),
            Logic::Codes(codes) => json!(codes),
            Logic::Column { name, condition } => {
                let mut map = Map::new();
                map.insert(name.clone(), condition_to_json(condition));
                Value::Object(map)
            }
            Logic::And(parts) => json!({ "AND": parts_to_json(parts) }),
            Logic::Or(parts) => json!({ "OR": parts_to_json(parts) }),
            Logic::Not(inner) => json!({ "NOT": inner.to_json() }),
        }
    }
}

impl TryFrom<Value> for Logic {
    type Error = TransformError;

    fn try_from(value: Value) -> Result<Self> {
        Logic::from_json(&value)
    }
}

impl From<Logic> for Value {
    fn from(logic: Logic) -> Self {
        logic.to_json()
    }
}

impl fmt::Display for Logic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

fn parse_object(map: &Map<String, Value>) -> Result<Logic> {
    let mut parts = Vec::with_capacity(map.len());
    for (key, value) in map {
        parts.push(parse_entry(key, value)?);
    }
    match parts.len() {
        0 => Err(TransformError::malformed("empty logic object")),
        1 => Ok(parts.remove(0)),
        _ => Ok(Logic::And(parts)),
    }
}

fn parse_entry(key: &str, value: &Value) -> Result<Logic> {
    match key {
        ANCHOR => Ok(Logic::Anchor),
        "AND" | "intersection" => Ok(Logic::And(parse_list(key, value)?)),
        "OR" | "union" => Ok(Logic::Or(parse_list(key, value)?)),
        "NOT" => Ok(Logic::negate(Logic::from_json(value)?)),
        column => Ok(Logic::column(column, parse_condition(column, value)?)),
    }
}

fn parse_list(key: &str, value: &Value) -> Result<Vec<Logic>> {
    let Value::Array(items) = value else {
        return Err(TransformError::malformed(format!(
            "'{key}' expects a list of logic, got {value}"
        )));
    };
    if items.is_empty() {
        return Err(TransformError::malformed(format!("'{key}' list is empty")));
    }
    items.iter().map(Logic::from_json).collect()
}

fn parse_condition(column: &str, value: &Value) -> Result<Condition> {
    if value.is_array() {
        return Ok(Condition::HasAny(parse_codes(value)?));
    }
    let malformed = || {
        TransformError::malformed(format!("unsupported condition on '{column}': {value}"))
    };
    let Value::Object(map) = value else {
        return Err(malformed());
    };
    let mut entries = map.iter();
    let (Some((op, arg)), None) = (entries.next(), entries.next()) else {
        return Err(malformed());
    };
    match op.as_str() {
        "has_any" => Ok(Condition::HasAny(parse_codes(arg)?)),
        "has_all" => Ok(Condition::HasAll(parse_codes(arg)?)),
        "not_any" => Ok(Condition::NotAny(parse_codes(arg)?)),
        "not_all" => Ok(Condition::NotAll(parse_codes(arg)?)),
        "has_count" => match arg {
            Value::Number(n) => n
                .as_f64()
                .map(|count| Condition::HasCount(Comparison::new(CompareOp::Eq, count)))
                .ok_or_else(malformed),
            Value::Object(inner) => {
                let mut inner_entries = inner.iter();
                match (inner_entries.next(), inner_entries.next()) {
                    (Some((key, number)), None) => {
                        Ok(Condition::HasCount(parse_comparison(key, number).ok_or_else(malformed)?))
                    }
                    _ => Err(malformed()),
                }
            }
            _ => Err(malformed()),
        },
        "is_nan" => match arg.as_bool() {
            Some(true) => Ok(Condition::Missing),
            Some(false) => Ok(Condition::Present),
            None => Err(malformed()),
        },
        "not_nan" => match arg.as_bool() {
            Some(true) => Ok(Condition::Present),
            Some(false) => Ok(Condition::Missing),
            None => Err(malformed()),
        },
        other => parse_comparison(other, arg)
            .map(Condition::Compare)
            .ok_or_else(malformed),
    }
}

fn parse_comparison(key: &str, value: &Value) -> Option<Comparison> {
    let op = CompareOp::from_key(key)?;
    let number = value.as_f64()?;
    Some(Comparison::new(op, number))
}

fn parse_codes(value: &Value) -> Result<Vec<i64>> {
    let Value::Array(items) = value else {
        return Err(TransformError::malformed(format!(
            "expected a list of codes, got {value}"
        )));
    };
    items
        .iter()
        .map(|item| {
            let code = match item {
                Value::Number(n) => n
                    .as_i64()
                    .or_else(|| n.as_f64().and_then(|f| parse_i64(&f.to_string()))),
                Value::String(s) => parse_i64(s),
                _ => None,
            };
            code.ok_or_else(|| TransformError::malformed(format!("'{item}' is not a code")))
        })
        .collect()
}

fn number_to_json(value: f64) -> Value {
    match parse_i64(&value.to_string()) {
        Some(whole) => json!(whole),
        None => json!(value),
    }
}

fn parts_to_json(parts: &[Logic]) -> Vec<Value> {
    parts.iter().map(Logic::to_json).collect()
}

fn comparison_to_json(cmp: &Comparison) -> Value {
    let mut map = Map::new();
    map.insert(cmp.op.key().to_string(), number_to_json(cmp.value));
    Value::Object(map)
}

fn condition_to_json(condition: &Condition) -> Value {
    match condition {
        Condition::HasAny(codes) => json!(codes),
        Condition::HasAll(codes) => json!({ "has_all": codes }),
        Condition::NotAny(codes) => json!({ "not_any": codes }),
        Condition::NotAll(codes) => json!({ "not_all": codes }),
        Condition::HasCount(cmp) => json!({ "has_count": comparison_to_json(cmp) }),
        Condition::Compare(cmp) => comparison_to_json(cmp),
        Condition::Missing => json!({ "is_nan": true }),
        Condition::Present => json!({ "not_nan": true }),
    }
}

/// Resolves [`Logic`] against one dataset.
#[derive(Debug, Clone, Copy)]
pub struct LogicEvaluator<'a> {
    data: &'a DataFrame,
    default: Option<&'a str>,
}

impl<'a> LogicEvaluator<'a> {
    pub fn new(data: &'a DataFrame) -> Self {
        Self {
            data,
            default: None,
        }
    }

    /// Column used by bare code lists.
    pub fn with_default(mut self, default: Option<&'a str>) -> Self {
        self.default = default;
        self
    }

    pub fn resolve(&self, logic: &Logic) -> Result<RowIndex> {
        let height = self.height()?;
        self.eval(logic, height)
    }

    fn height(&self) -> Result<u32> {
        u32::try_from(self.data.height()).map_err(|_| {
            TransformError::configuration(format!(
                "cannot index {} rows, at most {} are supported",
                self.data.height(),
                u32::MAX
            ))
        })
    }

    fn eval(&self, logic: &Logic, height: u32) -> Result<RowIndex> {
        match logic {
            Logic::Anchor => Ok(all_rows(height)),
            Logic::Codes(codes) => {
                let default = self.default.ok_or_else(|| {
                    TransformError::configuration(format!(
                        "code list {} needs a default column",
                        Logic::Codes(codes.clone())
                    ))
                })?;
                self.condition(default, &Condition::HasAny(codes.clone()))
            }
            Logic::Column { name, condition } => self.condition(name, condition),
            Logic::And(parts) => {
                let mut rows = all_rows(height);
                for part in parts {
                    rows &= self.eval(part, height)?;
                }
                Ok(rows)
            }
            Logic::Or(parts) => {
                let mut rows = RowIndex::new();
                for part in parts {
                    rows |= self.eval(part, height)?;
                }
                Ok(rows)
            }
            Logic::Not(inner) => Ok(all_rows(height) - self.eval(inner, height)?),
        }
    }

    fn condition(&self, name: &str, condition: &Condition) -> Result<RowIndex> {
        let column = self
            .data
            .column(name)
            .map_err(|_| TransformError::column_not_found(name))?;
        let mut rows = RowIndex::new();
        for idx in 0..self.data.height() {
            let cell = column.get(idx).unwrap_or(AnyValue::Null);
            if matches_cell(condition, cell) {
                // height was checked against u32::MAX
                rows.insert(idx as u32);
            }
        }
        Ok(rows)
    }
}

fn matches_cell(condition: &Condition, cell: AnyValue<'_>) -> bool {
    if let Condition::Compare(cmp) = condition {
        return any_to_f64(cell).is_some_and(|value| cmp.matches(value));
    }
    let tokens = code_tokens(cell);
    let has = |code: &i64| {
        let token = code.to_string();
        tokens.as_ref().is_some_and(|t| t.contains(&token))
    };
    match condition {
        Condition::HasAny(codes) => codes.iter().any(has),
        Condition::HasAll(codes) => tokens.is_some() && codes.iter().all(has),
        Condition::NotAny(codes) => tokens.is_some() && !codes.iter().any(has),
        Condition::NotAll(codes) => tokens.is_some() && !codes.iter().all(has),
        Condition::HasCount(cmp) => tokens
            .as_ref()
            .is_some_and(|t| cmp.matches(t.len() as f64)),
        Condition::Missing => tokens.is_none(),
        Condition::Present => tokens.is_some(),
        Condition::Compare(_) => false,
    }
}

/// All rows `0..height`.
pub fn all_rows(height: u32) -> RowIndex {
    let mut rows = RowIndex::new();
    rows.insert_range(0..height);
    rows
}

/// Resolve `logic` against `data` without a default column.
pub fn resolve(data: &DataFrame, logic: &Logic) -> Result<RowIndex> {
    LogicEvaluator::new(data).resolve(logic)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_shorthands() {
        assert_eq!(Logic::from_json(&json!([1, 2])).unwrap(), Logic::Codes(vec![1, 2]));
        assert_eq!(Logic::from_json(&json!("@")).unwrap(), Logic::Anchor);
        assert_eq!(Logic::from_json(&json!({"@": {}})).unwrap(), Logic::Anchor);
        assert_eq!(
            Logic::from_json(&json!({"q1": [3]})).unwrap(),
            Logic::has_any("q1", [3])
        );
    }

    #[test]
    fn parses_conditions() {
        assert_eq!(
            Logic::from_json(&json!({"q2": {"has_count": {"is_ge": 2}}})).unwrap(),
            Logic::column("q2", Condition::HasCount(Comparison::new(CompareOp::Ge, 2.0)))
        );
        assert_eq!(
            Logic::from_json(&json!({"q2": {"has_count": 1}})).unwrap(),
            Logic::column("q2", Condition::HasCount(Comparison::new(CompareOp::Eq, 1.0)))
        );
        assert_eq!(
            Logic::from_json(&json!({"age": {"is_lt": 30}})).unwrap(),
            Logic::column("age", Condition::Compare(Comparison::new(CompareOp::Lt, 30.0)))
        );
        assert_eq!(
            Logic::from_json(&json!({"q3": {"is_nan": true}})).unwrap(),
            Logic::column("q3", Condition::Missing)
        );
    }

    #[test]
    fn multi_key_object_is_intersection() {
        assert_eq!(
            Logic::from_json(&json!({"q1": [1], "q2": {"has_all": [2, 3]}})).unwrap(),
            Logic::And(vec![Logic::has_any("q1", [1]), Logic::has_all("q2", [2, 3])])
        );
    }

    #[test]
    fn rejects_malformed_fragments() {
        for raw in [json!(3), json!({}), json!({"q1": "x"}), json!({"AND": []}), json!(["a"])] {
            assert!(matches!(
                Logic::from_json(&raw),
                Err(TransformError::MalformedLogic { .. })
            ));
        }
    }

    #[test]
    fn json_form_round_trips() {
        let logic = Logic::Or(vec![
            Logic::negate(Logic::has_all("q2", [1, 2])),
            Logic::column("age", Condition::Compare(Comparison::new(CompareOp::Ge, 18.0))),
            Logic::Anchor,
        ]);
        assert_eq!(Logic::from_json(&logic.to_json()).unwrap(), logic);
    }
}
