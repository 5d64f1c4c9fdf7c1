//! Which column types may be merged into each other.
//!
//! The table is directed: the left (existing) type decides what it accepts
//! from the right. A few lossless or near-lossless pairs are accepted with a
//! warning; every other differing pair is rejected.

use std::fmt;

use survey_model::ColumnType;

use crate::error::{MergeError, Result};

/// Outcome of comparing a left and a right column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compatibility {
    Same,
    /// Mergeable, but the right data may not fit the left type exactly.
    Warn,
    Incompatible,
}

/// A type mismatch that was merged anyway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeWarning {
    pub column: String,
    pub left: ColumnType,
    pub right: ColumnType,
}

impl fmt::Display for MergeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}': merged inconsistent types, found '{}' in left and '{}' in right",
            self.column, self.left, self.right
        )
    }
}

pub fn compatibility(left: ColumnType, right: ColumnType) -> Compatibility {
    if left == right {
        return Compatibility::Same;
    }
    match (left, right) {
        (ColumnType::Int, ColumnType::Single)
        | (ColumnType::Float, ColumnType::Int | ColumnType::Single)
        | (ColumnType::DelimitedSet, ColumnType::Single)
        | (ColumnType::String, ColumnType::Boolean) => Compatibility::Warn,
        _ => Compatibility::Incompatible,
    }
}

/// Check that `right` may be merged into `left` for `column`.
pub fn check_types(
    column: &str,
    left: ColumnType,
    right: ColumnType,
) -> Result<Option<MergeWarning>> {
    match compatibility(left, right) {
        Compatibility::Same => Ok(None),
        Compatibility::Warn => Ok(Some(MergeWarning {
            column: column.to_string(),
            left,
            right,
        })),
        Compatibility::Incompatible => Err(MergeError::TypeCompatibility {
            column: column.to_string(),
            left,
            right,
        }),
    }
}
