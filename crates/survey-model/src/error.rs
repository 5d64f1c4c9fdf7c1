use thiserror::Error;

use crate::reference::ReferenceKind;

/// Errors raised while reading or traversing a metadata document.
#[derive(Debug, Error)]
pub enum MetaError {
    /// A referenced column, mask, set or value library entry does not exist.
    #[error("{kind} '{name}' not found in meta")]
    NotFound { kind: ReferenceKind, name: String },

    /// A source reference that is not of the form `columns@x`, `masks@x` or `sets@x`.
    #[error("unsupported meta reference: '{reference}'")]
    InvalidReference { reference: String },

    /// Masks and sets reference each other in a loop.
    #[error("cyclic meta reference: {path}")]
    CyclicReference { path: String },

    #[error("invalid meta document: {0}")]
    Json(#[from] serde_json::Error),
}

impl MetaError {
    pub(crate) fn not_found(kind: ReferenceKind, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MetaError>;
