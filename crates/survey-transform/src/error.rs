use polars::prelude::PolarsError;
use survey_model::{ColumnType, MetaError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("invalid configuration: {message}")]
    Configuration { message: String },

    #[error("column '{name}' not found in data")]
    ColumnNotFound { name: String },

    #[error("malformed logic: {message}")]
    MalformedLogic { message: String },

    #[error("cannot recode column '{column}' of type '{column_type}'")]
    UnsupportedType {
        column: String,
        column_type: ColumnType,
    },

    #[error("append requires a delimited set target, '{column}' is not one")]
    AppendRequiresDelimitedSet { column: String },

    #[error(transparent)]
    Meta(#[from] MetaError),

    #[error("polars error: {0}")]
    Polars(#[from] PolarsError),
}

impl TransformError {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedLogic {
            message: message.into(),
        }
    }

    pub(crate) fn column_not_found(name: &str) -> Self {
        Self::ColumnNotFound {
            name: name.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TransformError>;
