//! Shared utilities for the survey crates.
//!
//! This crate provides Polars `AnyValue` helpers, normalization of response
//! code tokens, and [`ColumnValues`], a typed buffer used when a column has
//! to be rebuilt value by value (recodes, synthesized id columns).

pub mod any_value;
pub mod tokens;
pub mod values;

// Re-export commonly used functions at crate root for convenience
pub use any_value::{
    any_to_f64, any_to_i64, any_to_string, any_to_string_non_empty, format_numeric, parse_f64,
    parse_i64,
};
pub use tokens::{DELIMITER, code_tokens, join_codes, normalize_token, sort_codes};
pub use values::{ColumnValues, ValueKind};
