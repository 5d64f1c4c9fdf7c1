//! The metadata document.
//!
//! A [`Meta`] describes every column of a survey dataset: its semantic type,
//! its labels per locale and the categories it may take. Masks group columns
//! into arrays (grids) and sets carry the order of variables. Fields this
//! model does not know about are kept in `extra` maps so a document survives
//! a load/save round trip unchanged.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{MetaError, Result};
use crate::reference::{ReferenceKind, SourceRef, lib_values_name};
use crate::traversal;

/// Name of the set that records the variable order of the source file.
pub const DATA_FILE_SET: &str = "data file";

/// Text key used when a document does not declare one.
pub const DEFAULT_TEXT_KEY: &str = "en-GB";

/// Semantic type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ColumnType {
    #[serde(rename = "single")]
    Single,
    #[serde(rename = "delimited set")]
    DelimitedSet,
    #[serde(rename = "int")]
    Int,
    #[serde(rename = "float")]
    Float,
    #[serde(rename = "string")]
    String,
    #[serde(rename = "date")]
    Date,
    #[serde(rename = "time")]
    Time,
    #[serde(rename = "boolean")]
    Boolean,
    #[serde(rename = "array")]
    Array,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Single => "single",
            ColumnType::DelimitedSet => "delimited set",
            ColumnType::Int => "int",
            ColumnType::Float => "float",
            ColumnType::String => "string",
            ColumnType::Date => "date",
            ColumnType::Time => "time",
            ColumnType::Boolean => "boolean",
            ColumnType::Array => "array",
        }
    }

    /// Single-code or numeric columns, recodable with scalar keys.
    pub fn is_scalar_numeric(&self) -> bool {
        matches!(self, ColumnType::Single | ColumnType::Int | ColumnType::Float)
    }

    /// Types whose cells hold category codes.
    pub fn is_categorical(&self) -> bool {
        matches!(self, ColumnType::Single | ColumnType::DelimitedSet)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColumnType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "single" => Ok(ColumnType::Single),
            "delimited set" => Ok(ColumnType::DelimitedSet),
            "int" => Ok(ColumnType::Int),
            "float" => Ok(ColumnType::Float),
            "string" => Ok(ColumnType::String),
            "date" => Ok(ColumnType::Date),
            "time" => Ok(ColumnType::Time),
            "boolean" => Ok(ColumnType::Boolean),
            "array" => Ok(ColumnType::Array),
            other => Err(format!("unknown column type: {other}")),
        }
    }
}

/// Labels keyed by locale (`"en-GB"`, `"de-DE"`, ...).
///
/// Labels are stored as JSON values: most are plain strings, but edit blocks
/// (`{"x edits": {...}}`) are objects and must survive unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Text(BTreeMap<String, Value>);

impl Text {
    pub fn new() -> Self {
        Self::default()
    }

    /// A text with a single label.
    pub fn labelled(locale: impl Into<String>, label: impl Into<String>) -> Self {
        let mut text = Self::new();
        text.insert(locale, Value::String(label.into()));
        text
    }

    /// The label for `locale`, if it is a plain string.
    pub fn get(&self, locale: &str) -> Option<&str> {
        self.0.get(locale).and_then(Value::as_str)
    }

    pub fn contains(&self, locale: &str) -> bool {
        self.0.contains_key(locale)
    }

    pub fn insert(&mut self, locale: impl Into<String>, label: Value) {
        self.0.insert(locale.into(), label);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Merge the labels of `other` into this text.
    ///
    /// New locales are always added; labels of existing locales are replaced
    /// only when `overwrite` is set. Returns the locales that changed.
    pub fn merge_from(&mut self, other: &Text, overwrite: bool) -> Vec<String> {
        let mut changed = Vec::new();
        for (locale, label) in other.iter() {
            match self.0.get(locale) {
                Some(existing) if !overwrite || existing == label => {}
                _ => {
                    self.0.insert(locale.clone(), label.clone());
                    changed.push(locale.clone());
                }
            }
        }
        changed
    }
}

/// One category of a categorical column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryValue {
    pub value: i64,
    #[serde(default)]
    pub text: Text,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CategoryValue {
    pub fn new(value: i64, locale: &str, label: impl Into<String>) -> Self {
        Self {
            value,
            text: Text::labelled(locale, label),
            extra: Map::new(),
        }
    }
}

/// A column's categories: inline, or a reference into `lib.values`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Values {
    List(Vec<CategoryValue>),
    Reference(String),
}

/// Definition of one dataset column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    #[serde(default)]
    pub text: Text,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Values>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ColumnDef {
    pub fn new(
        name: impl Into<String>,
        column_type: ColumnType,
        locale: &str,
        label: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            column_type,
            text: Text::labelled(locale, label),
            values: None,
            properties: None,
            extra: Map::new(),
        }
    }

    pub fn with_values(mut self, values: Vec<CategoryValue>) -> Self {
        self.values = Some(Values::List(values));
        self
    }

    /// Attach `(code, label)` categories in the given locale.
    pub fn with_codes(mut self, locale: &str, codes: &[(i64, &str)]) -> Self {
        let values = codes
            .iter()
            .map(|(code, label)| CategoryValue::new(*code, locale, *label))
            .collect();
        self.values = Some(Values::List(values));
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.set_property(key, value);
        self
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: Value) {
        self.properties
            .get_or_insert_with(Map::new)
            .insert(key.into(), value);
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.as_ref().and_then(|props| props.get(key))
    }
}

/// One item of a mask.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskItem {
    pub source: String,
    #[serde(default)]
    pub text: Text,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An array of columns sharing one question (a grid).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mask {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub mask_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    #[serde(default)]
    pub text: Text,
    #[serde(default)]
    pub items: Vec<MaskItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Values>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An ordered list of `columns@`, `masks@` and `sets@` references.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SetDef {
    #[serde(default, skip_serializing_if = "Text::is_empty")]
    pub text: Text,
    #[serde(default)]
    pub items: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SetDef {
    pub fn contains(&self, reference: &str) -> bool {
        self.items.iter().any(|item| item == reference)
    }

    /// Append a reference unless it is already listed.
    pub fn push_unique(&mut self, reference: impl Into<String>) -> bool {
        let reference = reference.into();
        if self.contains(&reference) {
            return false;
        }
        self.items.push(reference);
        true
    }
}

/// An entry of the value library.
///
/// Regular entries are category lists; anything else (for example the `ddf`
/// block written by some converters) is kept as raw JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LibEntry {
    Values(Vec<CategoryValue>),
    Other(Value),
}

/// Shared definitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lib {
    #[serde(rename = "default text", default = "default_text_key")]
    pub default_text: String,
    #[serde(default)]
    pub values: BTreeMap<String, LibEntry>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Lib {
    fn default() -> Self {
        Self {
            default_text: default_text_key(),
            values: BTreeMap::new(),
            extra: Map::new(),
        }
    }
}

fn default_text_key() -> String {
    DEFAULT_TEXT_KEY.to_string()
}

fn default_frame_type() -> String {
    "pandas.DataFrame".to_string()
}

/// A survey metadata document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub info: Value,
    #[serde(default)]
    pub lib: Lib,
    #[serde(default)]
    pub columns: BTreeMap<String, ColumnDef>,
    #[serde(default)]
    pub masks: BTreeMap<String, Mask>,
    #[serde(default)]
    pub sets: BTreeMap<String, SetDef>,
    #[serde(rename = "type", default = "default_frame_type")]
    pub frame_type: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Meta {
    fn default() -> Self {
        Self::new(DEFAULT_TEXT_KEY)
    }
}

impl Meta {
    /// Start an empty document with an empty `data file` set.
    pub fn new(text_key: &str) -> Self {
        let mut info = Map::new();
        info.insert("text".to_string(), Value::String(String::new()));
        let mut sets = BTreeMap::new();
        sets.insert(
            DATA_FILE_SET.to_string(),
            SetDef {
                text: Text::labelled(text_key, "Variable order in source file"),
                items: Vec::new(),
                extra: Map::new(),
            },
        );
        Self {
            info: Value::Object(info),
            lib: Lib {
                default_text: text_key.to_string(),
                ..Lib::default()
            },
            columns: BTreeMap::new(),
            masks: BTreeMap::new(),
            sets,
            frame_type: default_frame_type(),
            extra: Map::new(),
        }
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn text_key(&self) -> &str {
        &self.lib.default_text
    }

    pub fn column(&self, name: &str) -> Result<&ColumnDef> {
        self.columns
            .get(name)
            .ok_or_else(|| MetaError::not_found(ReferenceKind::Column, name))
    }

    pub fn column_type(&self, name: &str) -> Option<ColumnType> {
        self.columns.get(name).map(|column| column.column_type)
    }

    pub fn mask(&self, name: &str) -> Result<&Mask> {
        self.masks
            .get(name)
            .ok_or_else(|| MetaError::not_found(ReferenceKind::Mask, name))
    }

    pub fn set(&self, name: &str) -> Result<&SetDef> {
        self.sets
            .get(name)
            .ok_or_else(|| MetaError::not_found(ReferenceKind::Set, name))
    }

    /// Add a column and list it in the `data file` set.
    pub fn add_column(&mut self, column: ColumnDef) {
        self.add_to_set(DATA_FILE_SET, SourceRef::column(&column.name).to_string());
        self.columns.insert(column.name.clone(), column);
    }

    /// Append a reference to a set, creating the set when it is missing.
    pub fn add_to_set(&mut self, set: &str, reference: impl Into<String>) -> bool {
        self.sets
            .entry(set.to_string())
            .or_default()
            .push_unique(reference)
    }

    /// A category list stored in the value library.
    pub fn lib_values(&self, name: &str) -> Result<&[CategoryValue]> {
        match self.lib.values.get(name) {
            Some(LibEntry::Values(values)) => Ok(values),
            _ => Err(MetaError::not_found(ReferenceKind::LibValues, name)),
        }
    }

    /// Resolve a value specification into a concrete category list.
    pub fn resolve_values(&self, values: &Values) -> Result<Vec<CategoryValue>> {
        match values {
            Values::List(list) => Ok(list.clone()),
            Values::Reference(reference) => {
                let name = lib_values_name(reference).ok_or_else(|| {
                    MetaError::InvalidReference {
                        reference: reference.clone(),
                    }
                })?;
                Ok(self.lib_values(name)?.to_vec())
            }
        }
    }

    /// The categories of a column, with library references resolved.
    pub fn resolved_values(&self, column: &ColumnDef) -> Result<Option<Vec<CategoryValue>>> {
        column
            .values
            .as_ref()
            .map(|values| self.resolve_values(values))
            .transpose()
    }

    /// A copy of a column whose `values` no longer point into the library.
    pub fn emulate_column(&self, name: &str) -> Result<ColumnDef> {
        let mut column = self.column(name)?.clone();
        if let Some(values) = self.resolved_values(&column)? {
            column.values = Some(Values::List(values));
        }
        Ok(column)
    }

    /// Declared codes of a column, in declaration order.
    pub fn value_codes(&self, name: &str) -> Result<Vec<i64>> {
        let column = self.column(name)?;
        Ok(self
            .resolved_values(column)?
            .unwrap_or_default()
            .iter()
            .map(|value| value.value)
            .collect())
    }

    /// For each prefix `p`, the declared columns named `p_<suffix>`.
    ///
    /// Columns are ordered by their suffix, numerically where possible.
    pub fn multicode_columns(&self, prefixes: &[&str]) -> BTreeMap<String, Vec<String>> {
        let mut groups = BTreeMap::new();
        for prefix in prefixes {
            let head = format!("{prefix}_");
            let mut members: Vec<String> = self
                .columns
                .keys()
                .filter(|name| name.len() > head.len() && name.starts_with(&head))
                .cloned()
                .collect();
            members.sort_by(|a, b| compare_suffix(&a[head.len()..], &b[head.len()..]));
            groups.insert((*prefix).to_string(), members);
        }
        groups
    }

    /// Every broken reference of the document.
    pub fn problems(&self) -> Vec<MetaError> {
        let mut problems = Vec::new();
        for name in self.sets.keys() {
            if let Err(error) = traversal::columns_from_set(self, name) {
                problems.push(error);
            }
        }
        for name in self.masks.keys() {
            if let Err(error) = traversal::columns_from_mask(self, name) {
                problems.push(error);
            }
        }
        for column in self.columns.values() {
            if let Err(error) = self.resolved_values(column) {
                problems.push(error);
            }
        }
        problems
    }

    /// Check that every reference resolves and that masks and sets are acyclic.
    pub fn validate(&self) -> Result<()> {
        match self.problems().into_iter().next() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

fn compare_suffix(a: &str, b: &str) -> Ordering {
    match (a.parse::<i64>(), b.parse::<i64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}
