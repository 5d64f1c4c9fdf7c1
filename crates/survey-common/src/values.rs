//! Typed column buffers.
//!
//! Recodes and synthesized columns are built row by row. [`ColumnValues`]
//! extracts a Polars column into a plain vector of optional values and turns
//! the result back into a `Series`. Kinds widen as `Bool < Int < Float < Text`.

use polars::prelude::{AnyValue, Column, DataType, NamedFrom, Series};

use crate::any_value::{any_to_f64, any_to_i64, any_to_string, format_numeric};

/// Storage kind of a [`ColumnValues`] buffer, ordered by widening.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ValueKind {
    Bool,
    Int,
    Float,
    Text,
}

impl ValueKind {
    /// Storage kind used for a Polars data type.
    pub fn for_dtype(dtype: &DataType) -> Self {
        if dtype.is_integer() {
            Self::Int
        } else if dtype.is_float() {
            Self::Float
        } else if matches!(dtype, DataType::Boolean) {
            Self::Bool
        } else {
            Self::Text
        }
    }
}

/// Optional values of one column, by storage kind.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValues {
    Bool(Vec<Option<bool>>),
    Int(Vec<Option<i64>>),
    Float(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
}

impl ColumnValues {
    /// Extract all values of a Polars column. Empty strings are kept.
    pub fn from_column(column: &Column) -> Self {
        let height = column.len();
        let cell = |idx: usize| column.get(idx).unwrap_or(AnyValue::Null);
        match ValueKind::for_dtype(column.dtype()) {
            ValueKind::Int => Self::Int((0..height).map(|idx| any_to_i64(cell(idx))).collect()),
            ValueKind::Float => {
                Self::Float((0..height).map(|idx| any_to_f64(cell(idx))).collect())
            }
            ValueKind::Bool => Self::Bool(
                (0..height)
                    .map(|idx| match cell(idx) {
                        AnyValue::Boolean(flag) => Some(flag),
                        _ => None,
                    })
                    .collect(),
            ),
            ValueKind::Text => Self::Text(
                (0..height)
                    .map(|idx| match cell(idx) {
                        AnyValue::Null => None,
                        value => Some(any_to_string(value)),
                    })
                    .collect(),
            ),
        }
    }

    /// An all-missing buffer.
    pub fn nulls(kind: ValueKind, len: usize) -> Self {
        match kind {
            ValueKind::Bool => Self::Bool(vec![None; len]),
            ValueKind::Int => Self::Int(vec![None; len]),
            ValueKind::Float => Self::Float(vec![None; len]),
            ValueKind::Text => Self::Text(vec![None; len]),
        }
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Bool(_) => ValueKind::Bool,
            Self::Int(_) => ValueKind::Int,
            Self::Float(_) => ValueKind::Float,
            Self::Text(_) => ValueKind::Text,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Bool(v) => v.len(),
            Self::Int(v) => v.len(),
            Self::Float(v) => v.len(),
            Self::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Convert to a wider kind. Requests for a narrower kind return `self` unchanged.
    pub fn widen(self, kind: ValueKind) -> Self {
        if kind <= self.kind() {
            return self;
        }
        match (self, kind) {
            (Self::Bool(v), ValueKind::Int) => {
                Self::Int(v.into_iter().map(|x| x.map(i64::from)).collect())
            }
            (Self::Bool(v), ValueKind::Float) => Self::Float(
                v.into_iter()
                    .map(|x| x.map(|flag| if flag { 1.0 } else { 0.0 }))
                    .collect(),
            ),
            (Self::Bool(v), _) => {
                Self::Text(v.into_iter().map(|x| x.map(|flag| flag.to_string())).collect())
            }
            (Self::Int(v), ValueKind::Float) => {
                Self::Float(v.into_iter().map(|x| x.map(|n| n as f64)).collect())
            }
            (Self::Int(v), _) => {
                Self::Text(v.into_iter().map(|x| x.map(|n| n.to_string())).collect())
            }
            (Self::Float(v), _) => {
                Self::Text(v.into_iter().map(|x| x.map(format_numeric)).collect())
            }
            (other, _) => other,
        }
    }

    /// Build a named Polars series.
    pub fn into_series(self, name: &str) -> Series {
        match self {
            Self::Bool(v) => Series::new(name.into(), v),
            Self::Int(v) => Series::new(name.into(), v),
            Self::Float(v) => Series::new(name.into(), v),
            Self::Text(v) => Series::new(name.into(), v),
        }
    }
}
