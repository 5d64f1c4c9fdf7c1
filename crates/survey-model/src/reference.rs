//! `kind@name` references used by sets, masks and value lists.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MetaError;

/// What a reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    Column,
    Mask,
    Set,
    /// An entry of `lib.values`.
    LibValues,
}

impl ReferenceKind {
    /// The collection prefix used in source references (`columns@`, ...).
    pub fn prefix(self) -> &'static str {
        match self {
            ReferenceKind::Column => "columns",
            ReferenceKind::Mask => "masks",
            ReferenceKind::Set => "sets",
            ReferenceKind::LibValues => "lib@values",
        }
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ReferenceKind::Column => "column",
            ReferenceKind::Mask => "mask",
            ReferenceKind::Set => "set",
            ReferenceKind::LibValues => "value library entry",
        };
        f.write_str(label)
    }
}

/// A parsed `columns@x` / `masks@x` / `sets@x` source reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceRef {
    pub kind: ReferenceKind,
    pub name: String,
}

impl SourceRef {
    pub fn column(name: impl Into<String>) -> Self {
        Self {
            kind: ReferenceKind::Column,
            name: name.into(),
        }
    }

    pub fn mask(name: impl Into<String>) -> Self {
        Self {
            kind: ReferenceKind::Mask,
            name: name.into(),
        }
    }

    pub fn set(name: impl Into<String>) -> Self {
        Self {
            kind: ReferenceKind::Set,
            name: name.into(),
        }
    }

    /// Parse a source reference.
    ///
    /// # Examples
    ///
    /// ```
    /// use survey_model::{ReferenceKind, SourceRef};
    ///
    /// let source = SourceRef::parse("masks@q5").unwrap();
    /// assert_eq!(source.kind, ReferenceKind::Mask);
    /// assert_eq!(source.name, "q5");
    /// assert!(SourceRef::parse("q5").is_err());
    /// ```
    pub fn parse(raw: &str) -> Result<Self, MetaError> {
        let invalid = || MetaError::InvalidReference {
            reference: raw.to_string(),
        };
        let (prefix, name) = raw.split_once('@').ok_or_else(invalid)?;
        if name.is_empty() {
            return Err(invalid());
        }
        let kind = match prefix {
            "columns" => ReferenceKind::Column,
            "masks" => ReferenceKind::Mask,
            "sets" => ReferenceKind::Set,
            _ => return Err(invalid()),
        };
        Ok(Self {
            kind,
            name: name.to_string(),
        })
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.kind.prefix(), self.name)
    }
}

impl FromStr for SourceRef {
    type Err = MetaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Name of the value library entry behind a `lib@values@name` reference.
pub fn lib_values_name(reference: &str) -> Option<&str> {
    reference
        .strip_prefix("lib@values@")
        .filter(|name| !name.is_empty())
}

/// Build a `lib@values@name` reference.
pub fn lib_values_reference(name: &str) -> String {
    format!("lib@values@{name}")
}
