//! Options for merging metadata documents.

use serde::{Deserialize, Serialize};

use crate::meta::DATA_FILE_SET;

/// Options for merging two metadata documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetaMergeOptions {
    /// Set of the right document that defines which columns are merged and in
    /// which order.
    pub from_set: String,
    /// Replace existing labels of shared locales with the right document's.
    pub overwrite_text: bool,
}

impl Default for MetaMergeOptions {
    fn default() -> Self {
        Self {
            from_set: DATA_FILE_SET.to_string(),
            overwrite_text: false,
        }
    }
}

impl MetaMergeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_from_set(mut self, from_set: impl Into<String>) -> Self {
        self.from_set = from_set.into();
        self
    }

    pub fn with_overwrite_text(mut self, overwrite: bool) -> Self {
        self.overwrite_text = overwrite;
        self
    }
}

/// Which shared delimited-set columns union their codes during a merge
/// instead of being overwritten by the right side.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeExisting {
    /// Overwrite shared columns.
    #[default]
    None,
    /// Union every shared delimited set.
    All,
    /// Union only the named delimited sets.
    Columns(Vec<String>),
}

impl MergeExisting {
    pub fn includes(&self, column: &str) -> bool {
        match self {
            MergeExisting::None => false,
            MergeExisting::All => true,
            MergeExisting::Columns(columns) => columns.iter().any(|c| c == column),
        }
    }
}
