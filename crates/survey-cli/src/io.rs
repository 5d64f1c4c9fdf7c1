//! Reading and writing datasets: JSON metadata and CSV data.

use std::fs::{self, File};
use std::path::Path;

use anyhow::{Context, Result};
use polars::prelude::{CsvReadOptions, CsvWriter, DataFrame, SerReader, SerWriter};
use survey_model::Meta;
use survey_transform::SurveyFrame;
use tracing::info;

pub fn read_meta(path: &Path) -> Result<Meta> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read metadata {}", path.display()))?;
    Meta::from_json_str(&raw).with_context(|| format!("parse metadata {}", path.display()))
}

pub fn write_meta(path: &Path, meta: &Meta) -> Result<()> {
    let json = meta.to_json_string().context("serialize metadata")?;
    fs::write(path, json).with_context(|| format!("write metadata {}", path.display()))
}

/// Read a CSV file with a header row; empty fields become nulls.
pub fn read_data(path: &Path) -> Result<DataFrame> {
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(1000))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .with_context(|| format!("open data {}", path.display()))?
        .finish()
        .with_context(|| format!("parse data {}", path.display()))
}

pub fn write_data(path: &Path, data: &mut DataFrame) -> Result<()> {
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    CsvWriter::new(file)
        .include_header(true)
        .finish(data)
        .with_context(|| format!("write data {}", path.display()))
}

/// Load a metadata document and its data file.
pub fn load_frame(meta: &Path, data: &Path) -> Result<SurveyFrame> {
    let frame = SurveyFrame::new(read_meta(meta)?, read_data(data)?);
    info!(
        meta = %meta.display(),
        data = %data.display(),
        rows = frame.record_count(),
        columns = frame.data.width(),
        "loaded dataset"
    );
    Ok(frame)
}

/// Write the data and, when a path is given, the metadata.
pub fn save_frame(frame: &mut SurveyFrame, data: &Path, meta: Option<&Path>) -> Result<()> {
    write_data(data, &mut frame.data)?;
    if let Some(path) = meta {
        write_meta(path, &frame.meta)?;
    }
    info!(data = %data.display(), rows = frame.record_count(), "wrote dataset");
    Ok(())
}
