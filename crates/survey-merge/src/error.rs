use std::fmt;

use polars::prelude::PolarsError;
use survey_model::{ColumnType, MetaError};
use survey_transform::TransformError;
use thiserror::Error;

/// Which input of a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => f.write_str("left"),
            Side::Right => f.write_str("right"),
        }
    }
}

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("invalid merge configuration: {message}")]
    Configuration { message: String },

    #[error("'{column}': cannot merge incompatible types, found '{left}' in left and '{right}' in right")]
    TypeCompatibility {
        column: String,
        left: ColumnType,
        right: ColumnType,
    },

    #[error("'{name}' not found in the {side} data")]
    ColumnNotFound { name: String, side: Side },

    #[error(transparent)]
    Meta(#[from] MetaError),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error("polars error: {0}")]
    Polars(#[from] PolarsError),
}

impl MergeError {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MergeError>;
