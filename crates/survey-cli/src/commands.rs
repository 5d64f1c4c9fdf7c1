//! Command implementations.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde_json::Value;
use survey_merge::{
    HmergeOptions, JoinKeys, RowId, RowIdOptions, VmergeOptions, hmerge, vmerge_many,
};
use survey_model::{MergeExisting, MetaMergeOptions};
use survey_transform::{Initialize, Logic, RecodeKey, RecodeMapper, RecodeOptions, SurveyFrame};
use tracing::{info, info_span};

use crate::cli::{HmergeArgs, MergeArgs, RecodeArgs, ValidateArgs, VmergeArgs};
use crate::io::{load_frame, read_meta, save_frame};

/// What a command wrote.
#[derive(Debug, Clone)]
pub struct DatasetSummary {
    pub command: &'static str,
    pub output: PathBuf,
    pub rows: usize,
    pub columns: usize,
    /// Extra `(label, value)` lines for the summary table.
    pub details: Vec<(String, String)>,
}

impl DatasetSummary {
    fn new(command: &'static str, output: &Path, frame: &SurveyFrame) -> Self {
        Self {
            command,
            output: output.to_path_buf(),
            rows: frame.record_count(),
            columns: frame.data.width(),
            details: Vec::new(),
        }
    }

    fn detail(mut self, label: &str, value: impl ToString) -> Self {
        self.details.push((label.to_string(), value.to_string()));
        self
    }
}

/// Reference problems found in a metadata document.
#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub path: PathBuf,
    pub columns: usize,
    pub masks: usize,
    pub sets: usize,
    pub problems: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.problems.is_empty()
    }
}

pub fn run_recode(args: &RecodeArgs) -> Result<DatasetSummary> {
    let span = info_span!("recode", target = %args.target);
    let _guard = span.enter();

    let mut frame = load_frame(&args.dataset.meta, &args.dataset.data)?;
    let mapper = RecodeMapper::from_json(&read_json(&args.mapper)?)
        .with_context(|| format!("parse mapper {}", args.mapper.display()))?;
    let options = recode_options(args)?;
    frame
        .apply_recode(&args.target, &mapper, &options)
        .with_context(|| format!("recode '{}'", args.target))?;

    let answered = frame
        .data
        .column(&args.target)
        .map(|column| column.len() - column.null_count())
        .unwrap_or_default();
    save_frame(&mut frame, &args.output.out_data, args.output.out_meta.as_deref())?;
    Ok(DatasetSummary::new("recode", &args.output.out_data, &frame)
        .detail("Target", &args.target)
        .detail("Mapper entries", mapper.len())
        .detail("Answered rows", answered))
}

fn recode_options(args: &RecodeArgs) -> Result<RecodeOptions> {
    let mut options = RecodeOptions::new().with_append(args.append);
    if let Some(column) = &args.default_column {
        options = options.with_default(column.clone());
    }
    if let Some(raw) = &args.intersect {
        let value: Value = serde_json::from_str(raw).context("parse --intersect")?;
        options = options.with_intersect(Logic::from_json(&value).context("parse --intersect")?);
    }
    if args.empty {
        options = options.with_initialize(Initialize::Empty);
    } else if let Some(column) = &args.initialize {
        options = options.with_initialize(Initialize::Column(column.clone()));
    }
    if let Some(raw) = &args.fillna {
        options = options.with_fillna(RecodeKey::parse(raw));
    }
    Ok(options)
}

pub fn run_hmerge(args: &HmergeArgs) -> Result<DatasetSummary> {
    let span = info_span!("hmerge");
    let _guard = span.enter();

    let keys = join_keys(&args.merge)?.context("hmerge needs --on or --left-on with --right-on")?;
    let options = HmergeOptions::new(keys)
        .with_merge_existing(parse_merge_existing(args.merge_existing.as_deref()))
        .with_meta(meta_options(&args.merge));
    let left = load_frame(&args.left_meta, &args.left_data)?;
    let right = load_frame(&args.right_meta, &args.right_data)?;
    let mut merged = hmerge(&left, &right, &options).context("hmerge")?;
    info!(
        rows = merged.record_count(),
        columns = merged.data.width(),
        "merged datasets"
    );

    save_frame(&mut merged, &args.output.out_data, args.output.out_meta.as_deref())?;
    let added = merged.data.width().saturating_sub(left.data.width());
    Ok(DatasetSummary::new("hmerge", &args.output.out_data, &merged)
        .detail("Left rows", left.record_count())
        .detail("Right rows", right.record_count())
        .detail("New columns", added))
}

pub fn run_vmerge(args: &VmergeArgs) -> Result<DatasetSummary> {
    let span = info_span!("vmerge", datasets = args.data.len());
    let _guard = span.enter();

    if args.meta.len() != args.data.len() {
        bail!(
            "got {} metadata documents for {} data files",
            args.meta.len(),
            args.data.len()
        );
    }
    let mut options = VmergeOptions::new().with_meta(meta_options(&args.merge));
    if let Some(keys) = join_keys(&args.merge)? {
        options = options.with_keys(keys);
    }
    let row_ids: Option<Vec<RowId>> = match &args.row_id_name {
        Some(name) => {
            options = options.with_row_id(RowIdOptions::new(name.clone()));
            Some(args.row_ids.iter().map(|raw| RowId::parse(raw)).collect())
        }
        None => None,
    };

    let frames = args
        .meta
        .iter()
        .zip(&args.data)
        .map(|(meta, data)| load_frame(meta, data))
        .collect::<Result<Vec<_>>>()?;
    let input_rows: usize = frames.iter().map(SurveyFrame::record_count).sum();
    let mut merged = vmerge_many(&frames, &options, row_ids.as_deref()).context("vmerge")?;

    save_frame(&mut merged, &args.output.out_data, args.output.out_meta.as_deref())?;
    Ok(DatasetSummary::new("vmerge", &args.output.out_data, &merged)
        .detail("Datasets", frames.len())
        .detail("Input rows", input_rows))
}

pub fn run_validate(args: &ValidateArgs) -> Result<ValidationReport> {
    let meta = read_meta(&args.meta)?;
    let problems: Vec<String> = meta.problems().iter().map(ToString::to_string).collect();
    info!(problems = problems.len(), "validated metadata");
    Ok(ValidationReport {
        path: args.meta.clone(),
        columns: meta.columns.len(),
        masks: meta.masks.len(),
        sets: meta.sets.len(),
        problems,
    })
}

fn join_keys(args: &MergeArgs) -> Result<Option<JoinKeys>> {
    if args.on.is_none() && args.left_on.is_none() && args.right_on.is_none() {
        return Ok(None);
    }
    let keys = JoinKeys::from_parts(
        args.on.as_deref(),
        args.left_on.as_deref(),
        args.right_on.as_deref(),
    )?;
    Ok(Some(keys))
}

fn meta_options(args: &MergeArgs) -> MetaMergeOptions {
    MetaMergeOptions::new()
        .with_from_set(args.from_set.clone())
        .with_overwrite_text(args.overwrite_text)
}

/// `all` or a comma-separated list of column names.
pub fn parse_merge_existing(raw: Option<&str>) -> MergeExisting {
    match raw.map(str::trim) {
        None | Some("") => MergeExisting::None,
        Some(value) if value.eq_ignore_ascii_case("all") => MergeExisting::All,
        Some(value) => MergeExisting::Columns(
            value
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect(),
        ),
    }
}

fn read_json(path: &Path) -> Result<Value> {
    let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parse {}", path.display()))
}
