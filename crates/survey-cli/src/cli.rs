//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "survey",
    version,
    about = "Recode and merge survey datasets described by JSON metadata",
    long_about = "Recode and merge survey datasets described by JSON metadata.\n\n\
                  Metadata documents are read and written as JSON, data as CSV."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Recode one column from a JSON mapper.
    Recode(RecodeArgs),

    /// Merge the columns of a right dataset into a left dataset on a key.
    Hmerge(HmergeArgs),

    /// Append the rows of a right dataset to a left dataset.
    Vmerge(VmergeArgs),

    /// Check that every reference in a metadata document resolves.
    Validate(ValidateArgs),
}

/// A metadata document and its data file.
#[derive(Args, Clone)]
pub struct DatasetArgs {
    /// Metadata document (JSON).
    #[arg(long = "meta", value_name = "JSON")]
    pub meta: PathBuf,

    /// Data file (CSV with a header row).
    #[arg(long = "data", value_name = "CSV")]
    pub data: PathBuf,
}

/// Where to write a dataset.
#[derive(Args, Clone)]
pub struct OutputArgs {
    /// Output data file (CSV).
    #[arg(long = "out-data", value_name = "CSV")]
    pub out_data: PathBuf,

    /// Output metadata document (JSON).
    #[arg(long = "out-meta", value_name = "JSON")]
    pub out_meta: Option<PathBuf>,
}

#[derive(Args)]
pub struct RecodeArgs {
    #[command(flatten)]
    pub dataset: DatasetArgs,

    #[command(flatten)]
    pub output: OutputArgs,

    /// Column to recode; must be declared in the metadata.
    #[arg(long = "target", value_name = "COLUMN")]
    pub target: String,

    /// Mapper file: a JSON object from output value to logic.
    #[arg(long = "mapper", value_name = "JSON")]
    pub mapper: PathBuf,

    /// Column that bare code lists in the mapper refer to.
    #[arg(long = "default", value_name = "COLUMN")]
    pub default_column: Option<String>,

    /// Add codes to existing delimited-set answers instead of replacing them.
    #[arg(long = "append")]
    pub append: bool,

    /// Logic (inline JSON) every mapper entry is restricted to.
    #[arg(long = "intersect", value_name = "LOGIC")]
    pub intersect: Option<String>,

    /// Start from a copy of this column instead of the target.
    #[arg(long = "initialize", value_name = "COLUMN", conflicts_with = "empty")]
    pub initialize: Option<String>,

    /// Start from an empty column.
    #[arg(long = "empty")]
    pub empty: bool,

    /// Value written into rows that are still missing afterwards.
    #[arg(long = "fillna", value_name = "VALUE")]
    pub fillna: Option<String>,
}

/// Options shared by both merge commands.
#[derive(Args)]
pub struct MergeArgs {
    /// Key column used on both sides.
    #[arg(long = "on", value_name = "COLUMN")]
    pub on: Option<String>,

    /// Key column of the left dataset.
    #[arg(long = "left-on", value_name = "COLUMN")]
    pub left_on: Option<String>,

    /// Key column of the right dataset.
    #[arg(long = "right-on", value_name = "COLUMN")]
    pub right_on: Option<String>,

    /// Right set that controls which columns are merged.
    #[arg(long = "from-set", value_name = "SET", default_value = "data file")]
    pub from_set: String,

    /// Replace existing left labels with right labels.
    #[arg(long = "overwrite-text")]
    pub overwrite_text: bool,
}

#[derive(Args)]
pub struct HmergeArgs {
    /// Left metadata document (JSON).
    #[arg(long = "left-meta", value_name = "JSON")]
    pub left_meta: PathBuf,

    /// Left data file (CSV).
    #[arg(long = "left-data", value_name = "CSV")]
    pub left_data: PathBuf,

    /// Right metadata document (JSON).
    #[arg(long = "right-meta", value_name = "JSON")]
    pub right_meta: PathBuf,

    /// Right data file (CSV).
    #[arg(long = "right-data", value_name = "CSV")]
    pub right_data: PathBuf,

    #[command(flatten)]
    pub merge: MergeArgs,

    /// Union delimited-set codes instead of replacing them.
    /// Pass `all` or a comma-separated list of columns.
    #[arg(long = "merge-existing", value_name = "COLUMNS")]
    pub merge_existing: Option<String>,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args)]
pub struct VmergeArgs {
    /// Metadata documents (JSON), one per dataset, in merge order.
    #[arg(long = "meta", value_name = "JSON", required = true, num_args = 1..)]
    pub meta: Vec<PathBuf>,

    /// Data files (CSV), one per metadata document.
    #[arg(long = "data", value_name = "CSV", required = true, num_args = 1..)]
    pub data: Vec<PathBuf>,

    #[command(flatten)]
    pub merge: MergeArgs,

    /// Name of a column that records which dataset each row came from.
    #[arg(long = "row-id-name", value_name = "COLUMN", requires = "row_ids")]
    pub row_id_name: Option<String>,

    /// Row id per dataset, in the same order as `--data`.
    #[arg(long = "row-ids", value_name = "ID", num_args = 1.., value_delimiter = ',')]
    pub row_ids: Vec<String>,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args)]
pub struct ValidateArgs {
    /// Metadata document (JSON).
    #[arg(value_name = "JSON")]
    pub meta: PathBuf,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
