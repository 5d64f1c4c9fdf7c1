//! Survey data transformations driven by metadata.
//!
//! - **logic**: declarative row selection resolved into bitmaps
//! - **delimited**: conversion between dichotomous column groups and
//!   delimited-set columns
//! - **recode**: index mappers and metadata-aware recoding
//! - **frame**: a dataset paired with its metadata
//! - **codes**: code range helpers

pub mod codes;
pub mod delimited;
pub mod error;
pub mod frame;
pub mod logic;
pub mod recode;

pub use delimited::{CondenseOptions, JoinMode};
pub use error::{Result, TransformError};
pub use frame::SurveyFrame;
pub use logic::{CompareOp, Comparison, Condition, Logic, LogicEvaluator, RowIndex};
pub use recode::{
    IndexMapper, Initialize, RecodeKey, RecodeMapper, RecodeOptions, map_logic_to_index, recode,
};
