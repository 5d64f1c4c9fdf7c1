//! Response code tokens.
//!
//! Delimited-set cells store multi-select answers as `"1;3;7;"`. Codes are
//! compared as normalized string tokens so that a float `3.0` read from one
//! file matches the integer `3` read from another.

use std::cmp::Ordering;

use polars::prelude::AnyValue;

use crate::any_value::{any_to_string, format_numeric, parse_f64};

/// Separator between codes in a delimited-set cell.
pub const DELIMITER: char = ';';

/// Normalize a single code token.
///
/// Whole-number floats collapse to their integer form and surrounding
/// whitespace is removed; anything else is kept verbatim.
///
/// # Examples
///
/// ```
/// use survey_common::normalize_token;
///
/// assert_eq!(normalize_token("3.0"), "3");
/// assert_eq!(normalize_token(" 12 "), "12");
/// assert_eq!(normalize_token("2.5"), "2.5");
/// assert_eq!(normalize_token("x"), "x");
/// ```
pub fn normalize_token(raw: &str) -> String {
    let trimmed = raw.trim();
    match parse_f64(trimmed) {
        Some(number) if number.is_finite() => format_numeric(number),
        _ => trimmed.to_string(),
    }
}

/// Split a cell into its normalized code tokens.
///
/// Returns `None` for a missing response: nulls, `NaN`, empty strings and
/// strings that hold only delimiters.
pub fn code_tokens(value: AnyValue<'_>) -> Option<Vec<String>> {
    if let AnyValue::Boolean(flag) = value {
        return Some(vec![if flag { "1" } else { "0" }.to_string()]);
    }
    let text = any_to_string(value);
    let tokens: Vec<String> = text
        .split(DELIMITER)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(normalize_token)
        .collect();
    if tokens.is_empty() { None } else { Some(tokens) }
}

/// Sort tokens ascending (numerically where possible) and drop duplicates.
///
/// Non-numeric tokens sort after all numeric ones, lexically.
pub fn sort_codes(codes: &mut Vec<String>) {
    codes.sort_by(|a, b| compare_codes(a, b));
    codes.dedup();
}

fn compare_codes(a: &str, b: &str) -> Ordering {
    match (parse_f64(a), parse_f64(b)) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

/// Render codes as a canonical delimited-set cell.
///
/// The input is expected to be sorted already; an empty slice is a missing
/// response.
///
/// # Examples
///
/// ```
/// use survey_common::join_codes;
///
/// assert_eq!(join_codes(&["1".to_string(), "3".to_string()]), Some("1;3;".to_string()));
/// assert_eq!(join_codes(&[]), None);
/// ```
pub fn join_codes(codes: &[String]) -> Option<String> {
    if codes.is_empty() {
        return None;
    }
    let mut joined = String::new();
    for code in codes {
        joined.push_str(code);
        joined.push(DELIMITER);
    }
    Some(joined)
}
