//! Options for dataset merges.

use std::fmt;

use serde::{Deserialize, Serialize};
use survey_common::{ColumnValues, format_numeric, parse_f64};
use survey_model::{ColumnType, MergeExisting, MetaMergeOptions};

use crate::error::{MergeError, Result};

/// Key columns of a merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinKeys {
    pub left: String,
    pub right: String,
}

impl JoinKeys {
    /// The same column name on both sides.
    pub fn on(column: impl Into<String>) -> Self {
        let column = column.into();
        Self {
            left: column.clone(),
            right: column,
        }
    }

    pub fn new(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
        }
    }

    /// Build keys from `on`, or from `left_on` together with `right_on`.
    pub fn from_parts(
        on: Option<&str>,
        left_on: Option<&str>,
        right_on: Option<&str>,
    ) -> Result<Self> {
        match (on, left_on, right_on) {
            (Some(on), None, None) => Ok(Self::on(on)),
            (None, Some(left), Some(right)) => Ok(Self::new(left, right)),
            (None, None, None) => Err(MergeError::configuration(
                "provide a column name for either 'on' or both 'left_on' and 'right_on'",
            )),
            (Some(_), _, _) => Err(MergeError::configuration(
                "'on' cannot be combined with 'left_on' or 'right_on'",
            )),
            (None, _, _) => Err(MergeError::configuration(
                "'left_on' and 'right_on' must be given together",
            )),
        }
    }

    /// True when both sides use the same column.
    pub fn is_shared(&self) -> bool {
        self.left == self.right
    }
}

/// Options for [`hmerge`](crate::hmerge).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HmergeOptions {
    pub keys: JoinKeys,
    #[serde(default)]
    pub merge_existing: MergeExisting,
    #[serde(default)]
    pub meta: MetaMergeOptions,
}

impl HmergeOptions {
    pub fn new(keys: JoinKeys) -> Self {
        Self {
            keys,
            merge_existing: MergeExisting::None,
            meta: MetaMergeOptions::default(),
        }
    }

    pub fn with_merge_existing(mut self, merge_existing: MergeExisting) -> Self {
        self.merge_existing = merge_existing;
        self
    }

    pub fn with_meta(mut self, meta: MetaMergeOptions) -> Self {
        self.meta = meta;
        self
    }
}

/// Literal written into a row id column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RowId {
    Int(i64),
    Float(f64),
    Text(String),
}

impl RowId {
    /// Read an id given as text; numbers become numeric ids.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if let Ok(id) = raw.parse::<i64>() {
            RowId::Int(id)
        } else if let Some(id) = parse_f64(raw) {
            RowId::Float(id)
        } else {
            RowId::Text(raw.to_string())
        }
    }

    /// Column type able to hold every given id.
    pub fn infer_type<'a>(ids: impl IntoIterator<Item = &'a RowId>) -> ColumnType {
        let mut column_type = ColumnType::Int;
        for id in ids {
            match id {
                RowId::Int(_) => {}
                RowId::Float(_) => column_type = ColumnType::Float,
                RowId::Text(_) => return ColumnType::String,
            }
        }
        column_type
    }

    /// `len` copies of this id, stored as `column_type`.
    pub fn repeat(&self, column_type: ColumnType, len: usize) -> ColumnValues {
        match (column_type, self) {
            (ColumnType::Int | ColumnType::Single, RowId::Int(id)) => {
                ColumnValues::Int(vec![Some(*id); len])
            }
            #[allow(clippy::cast_precision_loss)]
            (ColumnType::Float, RowId::Int(id)) => ColumnValues::Float(vec![Some(*id as f64); len]),
            (ColumnType::Float, RowId::Float(id)) => ColumnValues::Float(vec![Some(*id); len]),
            _ => ColumnValues::Text(vec![Some(self.to_string()); len]),
        }
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowId::Int(id) => write!(f, "{id}"),
            RowId::Float(id) => f.write_str(&format_numeric(*id)),
            RowId::Text(id) => f.write_str(id),
        }
    }
}

impl From<i64> for RowId {
    fn from(value: i64) -> Self {
        RowId::Int(value)
    }
}

impl From<i32> for RowId {
    fn from(value: i32) -> Self {
        RowId::Int(i64::from(value))
    }
}

impl From<f64> for RowId {
    fn from(value: f64) -> Self {
        RowId::Float(value)
    }
}

impl From<&str> for RowId {
    fn from(value: &str) -> Self {
        RowId::Text(value.to_string())
    }
}

/// A column marking which input each row came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowIdOptions {
    pub name: String,
    #[serde(default)]
    pub left_id: Option<RowId>,
    #[serde(default)]
    pub right_id: Option<RowId>,
}

impl RowIdOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            left_id: None,
            right_id: None,
        }
    }

    pub fn with_left_id(mut self, id: impl Into<RowId>) -> Self {
        self.left_id = Some(id.into());
        self
    }

    pub fn with_right_id(mut self, id: impl Into<RowId>) -> Self {
        self.right_id = Some(id.into());
        self
    }
}

/// Options for [`vmerge`](crate::vmerge).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VmergeOptions {
    /// Without keys every right row is appended.
    pub keys: Option<JoinKeys>,
    pub row_id: Option<RowIdOptions>,
    pub meta: MetaMergeOptions,
}

impl VmergeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_keys(mut self, keys: JoinKeys) -> Self {
        self.keys = Some(keys);
        self
    }

    pub fn with_row_id(mut self, row_id: RowIdOptions) -> Self {
        self.row_id = Some(row_id);
        self
    }

    pub fn with_meta(mut self, meta: MetaMergeOptions) -> Self {
        self.meta = meta;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_keys_validation() {
        assert_eq!(JoinKeys::from_parts(Some("id"), None, None).unwrap(), JoinKeys::on("id"));
        assert_eq!(
            JoinKeys::from_parts(None, Some("id"), Some("resp")).unwrap(),
            JoinKeys::new("id", "resp")
        );
        assert!(JoinKeys::from_parts(None, None, None).is_err());
        assert!(JoinKeys::from_parts(Some("id"), Some("id"), None).is_err());
        assert!(JoinKeys::from_parts(None, Some("id"), None).is_err());
        assert!(JoinKeys::from_parts(None, None, Some("id")).is_err());
    }

    #[test]
    fn row_id_type_inference() {
        assert_eq!(RowId::infer_type(&[RowId::Int(1), RowId::Int(2)]), ColumnType::Int);
        assert_eq!(RowId::infer_type(&[RowId::Int(1), RowId::Float(2.5)]), ColumnType::Float);
        assert_eq!(
            RowId::infer_type(&[RowId::Float(1.0), RowId::Text("b".into())]),
            ColumnType::String
        );
        assert_eq!(RowId::parse("3"), RowId::Int(3));
        assert_eq!(RowId::parse("0.5"), RowId::Float(0.5));
        assert_eq!(RowId::parse("wave a"), RowId::Text("wave a".to_string()));
        assert_eq!(
            RowId::Float(2.0).repeat(ColumnType::String, 1),
            ColumnValues::Text(vec![Some("2".to_string())])
        );
    }
}
