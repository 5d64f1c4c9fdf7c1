//! Metadata-aware merging of survey datasets.
//!
//! - [`merge_meta`] merges two metadata documents
//! - [`hmerge`] adds the columns of one dataset to another, matching rows on
//!   a key
//! - [`vmerge`] appends the rows of one dataset to another
//!
//! All merges take their inputs by reference and return new values.

mod columns;
pub mod compat;
pub mod error;
pub mod hmerge;
pub mod meta_merge;
pub mod options;
pub mod vmerge;

pub use compat::{Compatibility, MergeWarning, check_types, compatibility};
pub use error::{MergeError, Result, Side};
pub use hmerge::{hmerge, hmerge_many};
pub use meta_merge::{MetaMergeOutcome, merge_column, merge_meta, merge_values};
pub use options::{HmergeOptions, JoinKeys, RowId, RowIdOptions, VmergeOptions};
pub use vmerge::{vmerge, vmerge_many};
