//! Horizontal (column-wise) merging on a key column.

use std::collections::HashMap;

use polars::prelude::{AnyValue, DataFrame, NamedFrom, Series};
use survey_common::{any_to_string_non_empty, normalize_token};
use survey_model::ColumnType;
use survey_transform::SurveyFrame;
use survey_transform::delimited::merge_codes;
use tracing::{debug, info};

use crate::columns::{gather, overlay};
use crate::error::{MergeError, Result, Side};
use crate::meta_merge::merge_meta;
use crate::options::HmergeOptions;

/// Merge the columns of `right` into `left`, matching rows on the join keys.
///
/// Every left row is kept exactly once. For each left row the first right
/// row with an equal key supplies the values; right rows without a matching
/// left key are dropped. Columns both datasets have are updated in place and
/// keep the left column's type unless the right values need a wider one;
/// right-only columns are appended in merge order.
pub fn hmerge(left: &SurveyFrame, right: &SurveyFrame, options: &HmergeOptions) -> Result<SurveyFrame> {
    let keys = &options.keys;
    let left_keys = key_values(&left.data, &keys.left, Side::Left)?;
    let right_keys = key_values(&right.data, &keys.right, Side::Right)?;

    let mut first_row: HashMap<&str, usize> = HashMap::new();
    for (idx, key) in right_keys.iter().enumerate() {
        if let Some(key) = key {
            first_row.entry(key.as_str()).or_insert(idx);
        }
    }
    let rows: Vec<Option<usize>> = left_keys
        .iter()
        .map(|key| key.as_deref().and_then(|key| first_row.get(key).copied()))
        .collect();
    let matched = rows.iter().flatten().count();
    debug!(
        left_rows = rows.len(),
        right_rows = right_keys.len(),
        matched,
        "matched join keys"
    );

    let outcome = merge_meta(&left.meta, &right.meta, &options.meta)?;
    let mut data = left.data.clone();
    let mut updated = 0usize;
    let mut appended = 0usize;
    for name in &outcome.columns {
        if keys.is_shared() && *name == keys.left {
            continue;
        }
        let Ok(column) = right.data.column(name) else {
            debug!(column = %name, "column not in right data, skipping");
            continue;
        };
        let incoming = gather(column.as_materialized_series(), &rows)?;
        let merged = match data.column(name) {
            Ok(existing) => {
                let existing = existing.as_materialized_series();
                updated += 1;
                let union = outcome.meta.column_type(name) == Some(ColumnType::DelimitedSet)
                    && options.merge_existing.includes(name);
                if union {
                    debug!(column = %name, "merging delimited set codes");
                    union_codes(existing, &incoming)
                } else {
                    debug!(column = %name, "updating column");
                    overlay(existing, &incoming)?
                }
            }
            Err(_) => {
                debug!(column = %name, "appending column");
                appended += 1;
                incoming
            }
        };
        data.with_column(merged)?;
    }

    info!(
        rows = data.height(),
        matched,
        updated,
        appended,
        "hmerge complete"
    );
    Ok(SurveyFrame::new(outcome.meta, data))
}

/// Merge several right datasets into `left`, one after the other.
pub fn hmerge_many(
    left: &SurveyFrame,
    rights: &[SurveyFrame],
    options: &HmergeOptions,
) -> Result<SurveyFrame> {
    let mut merged = left.clone();
    for right in rights {
        merged = hmerge(&merged, right, options)?;
    }
    Ok(merged)
}

/// Key cells as strings.
///
/// Numeric cells are normalized so that `1`, `1.0` and an integer `1` from
/// another file match. Text cells are compared verbatim: `"007"` and `"7"`
/// are different keys.
pub(crate) fn key_values(data: &DataFrame, name: &str, side: Side) -> Result<Vec<Option<String>>> {
    let column = data.column(name).map_err(|_| MergeError::ColumnNotFound {
        name: name.to_string(),
        side,
    })?;
    let numeric = column.dtype().is_integer() || column.dtype().is_float();
    Ok((0..column.len())
        .map(|idx| {
            any_to_string_non_empty(column.get(idx).unwrap_or(AnyValue::Null))
                .map(|key| if numeric { normalize_token(&key) } else { key })
        })
        .collect())
}

fn union_codes(existing: &Series, incoming: &Series) -> Series {
    let cell = |series: &Series, idx: usize| {
        series
            .get(idx)
            .ok()
            .and_then(any_to_string_non_empty)
    };
    let merged: Vec<Option<String>> = (0..existing.len())
        .map(|idx| merge_codes(cell(existing, idx).as_deref(), cell(incoming, idx).as_deref()))
        .collect();
    Series::new(existing.name().clone(), merged)
}
