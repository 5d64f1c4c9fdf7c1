pub mod error;
pub mod meta;
pub mod options;
pub mod reference;
pub mod traversal;

pub use error::{MetaError, Result};
pub use meta::{
    CategoryValue, ColumnDef, ColumnType, DATA_FILE_SET, DEFAULT_TEXT_KEY, Lib, LibEntry, Mask,
    MaskItem, Meta, SetDef, Text, Values,
};
pub use options::{MergeExisting, MetaMergeOptions};
pub use reference::{ReferenceKind, SourceRef, lib_values_name, lib_values_reference};
