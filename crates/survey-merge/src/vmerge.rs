//! Vertical (row-wise) merging.

use std::collections::HashSet;

use polars::prelude::{BooleanChunked, Column, DataFrame, IntoColumn, NewChunkedArray, Series};
use survey_common::{ColumnValues, ValueKind};
use survey_model::{ColumnDef, ColumnType, Meta};
use survey_transform::SurveyFrame;
use survey_transform::delimited::canonicalize;
use tracing::{debug, info};

use crate::columns::{cast_to, common_dtype, overlay};
use crate::error::{MergeError, Result, Side};
use crate::hmerge::key_values;
use crate::meta_merge::merge_meta;
use crate::options::{RowId, RowIdOptions, VmergeOptions};

/// Label of a synthesized row id column.
const ROW_ID_LABEL: &str = "vmerge row id";

/// Append the rows of `right` below the rows of `left`.
///
/// With join keys, right rows whose key already exists in `left` are
/// dropped. The result holds the left data columns followed by the right-only
/// columns of the right `from_set`. Columns keep their Polars type; a column
/// whose two halves differ in type is widened to a type both fit.
pub fn vmerge(left: &SurveyFrame, right: &SurveyFrame, options: &VmergeOptions) -> Result<SurveyFrame> {
    let mut left = left.clone();
    let mut right_data = right.data.clone();

    if let Some(row_id) = options.row_id.as_ref() {
        apply_row_id(&mut left, &mut right_data, &right.meta, row_id)?;
    }

    let outcome = merge_meta(&left.meta, &right.meta, &options.meta)?;

    if let Some(keys) = options.keys.as_ref() {
        let known: HashSet<String> = key_values(&left.data, &keys.left, Side::Left)?
            .into_iter()
            .flatten()
            .collect();
        let keep: Vec<bool> = key_values(&right_data, &keys.right, Side::Right)?
            .iter()
            .map(|key| key.as_ref().is_none_or(|key| !known.contains(key)))
            .collect();
        let dropped = keep.iter().filter(|flag| !**flag).count();
        if dropped > 0 {
            debug!(dropped, "dropping right rows with known keys");
        }
        let mask = BooleanChunked::from_slice("vmerge".into(), &keep);
        right_data = right_data.filter(&mask)?;
    }

    upcast_delimited(&mut right_data, &outcome.meta, &right.meta)?;

    let mut names: Vec<String> = left
        .data
        .get_column_names()
        .iter()
        .map(ToString::to_string)
        .collect();
    for name in &outcome.columns {
        if !names.contains(name) && right_data.column(name).is_ok() {
            names.push(name.clone());
        }
    }

    let left_height = left.data.height();
    let right_height = right_data.height();
    let mut upper: Vec<Column> = Vec::with_capacity(names.len());
    let mut lower: Vec<Column> = Vec::with_capacity(names.len());
    for name in &names {
        let top = left.data.column(name).ok().map(Column::as_materialized_series);
        let bottom = right_data.column(name).ok().map(Column::as_materialized_series);
        let (top, bottom) = match (top, bottom) {
            (Some(top), Some(bottom)) => {
                let dtype = common_dtype(top.dtype(), bottom.dtype());
                (cast_to(top, &dtype)?, cast_to(bottom, &dtype)?)
            }
            (Some(top), None) => (
                top.clone(),
                Series::full_null(name.as_str().into(), right_height, top.dtype()),
            ),
            (None, Some(bottom)) => (
                Series::full_null(name.as_str().into(), left_height, bottom.dtype()),
                bottom.clone(),
            ),
            (None, None) => continue,
        };
        upper.push(top.into_column());
        lower.push(bottom.into_column());
    }
    let mut data = DataFrame::new(upper)?;
    data.vstack_mut(&DataFrame::new(lower)?)?;

    info!(
        left_rows = left_height,
        right_rows = right_height,
        rows = data.height(),
        columns = data.width(),
        "vmerge complete"
    );
    Ok(SurveyFrame::new(outcome.meta, data))
}

/// Append several datasets in order.
///
/// With `row_ids`, the i-th id marks the rows of the i-th dataset and
/// `options.row_id` names the id column.
pub fn vmerge_many(
    frames: &[SurveyFrame],
    options: &VmergeOptions,
    row_ids: Option<&[RowId]>,
) -> Result<SurveyFrame> {
    let [first, rest @ ..] = frames else {
        return Err(MergeError::configuration("vmerge needs at least two datasets"));
    };
    if rest.is_empty() {
        return Err(MergeError::configuration("vmerge needs at least two datasets"));
    }
    if let Some(ids) = row_ids {
        if ids.len() != frames.len() {
            return Err(MergeError::configuration(format!(
                "expected {} row ids, one per dataset, got {}",
                frames.len(),
                ids.len()
            )));
        }
        if options.row_id.is_none() {
            return Err(MergeError::configuration(
                "row ids were given without a row id column name",
            ));
        }
    }

    let mut merged = first.clone();
    for (offset, right) in rest.iter().enumerate() {
        let mut step = options.clone();
        if let (Some(ids), Some(row_id)) = (row_ids, step.row_id.as_mut()) {
            row_id.left_id = Some(ids[0].clone());
            row_id.right_id = Some(ids[offset + 1].clone());
        }
        merged = vmerge(&merged, right, &step)?;
    }
    Ok(merged)
}

fn apply_row_id(
    left: &mut SurveyFrame,
    right_data: &mut DataFrame,
    right_meta: &Meta,
    options: &RowIdOptions,
) -> Result<()> {
    if options.left_id.is_none() && options.right_id.is_none() {
        return Err(MergeError::configuration(format!(
            "row id column '{}' needs a left or a right id",
            options.name
        )));
    }
    let name = options.name.as_str();
    let column_type = match left.meta.column_type(name) {
        Some(column_type) => column_type,
        None => {
            let column_type = RowId::infer_type(options.left_id.iter().chain(&options.right_id));
            debug!(column = name, %column_type, "creating row id column");
            let mut column = ColumnDef::new(name, column_type, left.meta.text_key(), ROW_ID_LABEL);
            column
                .text
                .insert(right_meta.text_key(), ROW_ID_LABEL.into());
            left.meta.add_column(column);
            column_type
        }
    };

    let height = left.data.height();
    let existing = left.data.column(name).ok().map(Column::as_materialized_series);
    let filled = match (options.left_id.as_ref(), existing) {
        (Some(id), Some(existing)) => {
            let ids = cast_to(&id.repeat(column_type, height).into_series(name), existing.dtype())?;
            Some(overlay(&ids, existing)?)
        }
        (Some(id), None) => Some(id.repeat(column_type, height).into_series(name)),
        (None, Some(_)) => None,
        (None, None) => {
            Some(ColumnValues::nulls(storage_kind(column_type), height).into_series(name))
        }
    };
    if let Some(values) = filled {
        left.data.with_column(values)?;
    }
    if let Some(id) = options.right_id.as_ref() {
        let mut values = id.repeat(column_type, right_data.height()).into_series(name);
        if let Ok(existing) = left.data.column(name) {
            values = cast_to(&values, existing.dtype())?;
        }
        right_data.with_column(values)?;
    }
    Ok(())
}

fn storage_kind(column_type: ColumnType) -> ValueKind {
    match column_type {
        ColumnType::Int | ColumnType::Single => ValueKind::Int,
        ColumnType::Float => ValueKind::Float,
        _ => ValueKind::Text,
    }
}

/// Rewrite numeric right columns that the merged meta declares as delimited sets.
fn upcast_delimited(data: &mut DataFrame, merged: &Meta, right: &Meta) -> Result<()> {
    let targets: Vec<String> = data
        .get_columns()
        .iter()
        .filter(|column| {
            let name = column.name().as_str();
            let dtype = column.dtype();
            merged.column_type(name) == Some(ColumnType::DelimitedSet)
                && right.column_type(name) != Some(ColumnType::DelimitedSet)
                && (dtype.is_integer() || dtype.is_float())
        })
        .map(|column| column.name().to_string())
        .collect();
    for name in targets {
        debug!(column = %name, "converting right column to delimited set");
        let series = canonicalize(data.column(&name)?.as_materialized_series());
        data.with_column(series)?;
    }
    Ok(())
}
