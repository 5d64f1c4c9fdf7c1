//! A dataset paired with its metadata.

use polars::prelude::DataFrame;
use survey_model::{DATA_FILE_SET, Meta, SourceRef};
use tracing::debug;

use crate::error::{Result, TransformError};
use crate::recode::{RecodeMapper, RecodeOptions, recode};

/// Survey responses and the metadata document describing them.
#[derive(Debug, Clone)]
pub struct SurveyFrame {
    pub meta: Meta,
    pub data: DataFrame,
}

impl SurveyFrame {
    pub fn new(meta: Meta, data: DataFrame) -> Self {
        Self { meta, data }
    }

    /// Returns the number of respondents.
    pub fn record_count(&self) -> usize {
        self.data.height()
    }

    /// Declared columns that are missing from the data.
    pub fn missing_columns(&self) -> Vec<&str> {
        self.meta
            .columns
            .keys()
            .filter(|name| self.data.column(name).is_err())
            .map(String::as_str)
            .collect()
    }

    /// Keep only `columns`, in a fresh metadata document.
    ///
    /// The value library is carried over so value references keep resolving;
    /// the `data file` set keeps the source order of the kept columns.
    pub fn subset(&self, columns: &[&str]) -> Result<SurveyFrame> {
        let mut meta = Meta::new(self.meta.text_key());
        meta.lib = self.meta.lib.clone();
        for name in columns {
            let column = self.meta.column(name)?;
            if self.data.column(name).is_err() {
                return Err(TransformError::ColumnNotFound {
                    name: (*name).to_string(),
                });
            }
            meta.columns.insert((*name).to_string(), column.clone());
        }
        if let Ok(data_file) = self.meta.set(DATA_FILE_SET) {
            for item in &data_file.items {
                let kept = SourceRef::parse(item)
                    .map(|source| columns.contains(&source.name.as_str()))
                    .unwrap_or(false);
                if kept {
                    meta.add_to_set(DATA_FILE_SET, item.clone());
                }
            }
        }
        let data = self.data.select(columns.iter().copied())?;
        Ok(SurveyFrame { meta, data })
    }

    /// Recode `target` and write the result into the data.
    pub fn apply_recode(
        &mut self,
        target: &str,
        mapper: &RecodeMapper,
        options: &RecodeOptions,
    ) -> Result<()> {
        let series = recode(&self.meta, &self.data, target, mapper, options)?;
        debug!(column = target, rows = series.len(), "writing recoded column");
        self.data.with_column(series)?;
        Ok(())
    }
}
