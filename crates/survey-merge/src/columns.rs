//! Polars column helpers shared by the dataset merges.
//!
//! Merged columns keep their Polars type. Two columns of different types
//! meet at the narrowest common type: integers widen to `Int64`, mixed
//! numerics to `Float64`, and anything else falls back to text.

use polars::prelude::{DataType, IdxCa, IdxSize, NamedFrom, NewChunkedArray, Series};
use survey_common::format_numeric;

use crate::error::Result;

/// The type both columns can be stored as.
pub(crate) fn common_dtype(left: &DataType, right: &DataType) -> DataType {
    if left == right {
        return left.clone();
    }
    match (left, right) {
        (DataType::Null, other) | (other, DataType::Null) => other.clone(),
        (DataType::Boolean, other) | (other, DataType::Boolean) if is_numeric(other) => {
            other.clone()
        }
        _ if left.is_integer() && right.is_integer() => DataType::Int64,
        _ if is_numeric(left) && is_numeric(right) => DataType::Float64,
        _ => DataType::String,
    }
}

fn is_numeric(dtype: &DataType) -> bool {
    dtype.is_integer() || dtype.is_float()
}

/// Cast `series` to `dtype`. Whole floats become `"3"`, not `"3.0"`, as text.
pub(crate) fn cast_to(series: &Series, dtype: &DataType) -> Result<Series> {
    if series.dtype() == dtype {
        return Ok(series.clone());
    }
    if *dtype == DataType::String && series.dtype().is_float() {
        let floats = series.cast(&DataType::Float64)?;
        let text: Vec<Option<String>> = floats
            .f64()?
            .into_iter()
            .map(|value| value.map(format_numeric))
            .collect();
        return Ok(Series::new(series.name().clone(), text));
    }
    Ok(series.cast(dtype)?)
}

/// Gather rows by position; `None` positions become nulls.
pub(crate) fn gather(series: &Series, rows: &[Option<usize>]) -> Result<Series> {
    let indices = IdxCa::from_iter_options(
        series.name().clone(),
        rows.iter()
            .map(|row| row.and_then(|idx| IdxSize::try_from(idx).ok())),
    );
    Ok(series.take(&indices)?)
}

/// Values of `top` where present, `base` elsewhere, named and typed like
/// `base` unless a wider type is needed.
pub(crate) fn overlay(base: &Series, top: &Series) -> Result<Series> {
    let dtype = common_dtype(base.dtype(), top.dtype());
    let base = cast_to(base, &dtype)?;
    let top = cast_to(top, &dtype)?;
    let mut merged = top.zip_with(&top.is_not_null(), &base)?;
    merged.rename(base.name().clone());
    Ok(merged)
}
