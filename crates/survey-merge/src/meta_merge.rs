//! Merging two metadata documents.
//!
//! The right document is merged into a copy of the left one. Columns are
//! taken in the order of the right document's `from_set` (mask columns and
//! nested sets included) or, without that set, alphabetically. Shared columns keep the
//! left definition and gain the right side's new labels and categories;
//! columns only the right side knows are copied and flagged as merged.

use std::collections::BTreeMap;

use survey_model::{
    CategoryValue, ColumnDef, DATA_FILE_SET, LibEntry, Meta, MetaMergeOptions, ReferenceKind,
    SourceRef, Values, lib_values_reference, traversal,
};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::compat::{MergeWarning, check_types};
use crate::error::Result;

/// Value library entry that is never merged.
const DDF_ENTRY: &str = "ddf";

/// Result of [`merge_meta`].
#[derive(Debug, Clone)]
pub struct MetaMergeOutcome {
    pub meta: Meta,
    /// Right columns in merge order.
    pub columns: Vec<String>,
    /// Columns copied from the right document.
    pub new_columns: Vec<String>,
    /// Columns both documents define.
    pub updated_columns: Vec<String>,
    pub warnings: Vec<MergeWarning>,
}

/// Merge `right` into a copy of `left`.
pub fn merge_meta(left: &Meta, right: &Meta, options: &MetaMergeOptions) -> Result<MetaMergeOutcome> {
    let mut meta = left.clone();
    let overwrite = options.overwrite_text;

    let (columns, mask_values) = match right.sets.get(&options.from_set) {
        Some(from_set) => {
            traversal::sets_from_set(right, &options.from_set)?;
            let plan = merge_plan(right, &from_set.items)?;
            for mask in &plan.masks {
                merge_mask(&mut meta, right, mask, overwrite)?;
            }
            for (name, set) in &right.sets {
                if !meta.sets.contains_key(name) {
                    debug!(set = %name, "adding set");
                    meta.sets.insert(name.clone(), set.clone());
                }
            }
            merge_lib_values(&mut meta, right);
            (plan.columns, plan.mask_values)
        }
        None => {
            debug!(
                from_set = %options.from_set,
                "set not found in right meta, merging columns alphabetically"
            );
            let mut columns: Vec<String> = right.columns.keys().cloned().collect();
            columns.sort_by_key(|name| name.to_lowercase());
            (columns, BTreeMap::new())
        }
    };

    let mut new_columns = Vec::new();
    let mut updated_columns = Vec::new();
    let mut warnings = Vec::new();
    for name in &columns {
        let right_props = right.column(name)?.properties.clone();
        let right_column = right.emulate_column(name)?;
        let mut merged = if meta.columns.contains_key(name) {
            debug!(column = %name, "updating column");
            updated_columns.push(name.clone());
            let left_column = meta.emulate_column(name)?;
            let (merged, warning) = merge_column(left_column, &right_column, overwrite)?;
            if let Some(warning) = warning {
                warn!(
                    column = %warning.column,
                    left = %warning.left,
                    right = %warning.right,
                    "merging inconsistent column types"
                );
                warnings.push(warning);
            }
            merged
        } else {
            debug!(column = %name, "adding column");
            new_columns.push(name.clone());
            let mut added = right_column;
            added.set_property("merged", Value::Bool(true));
            added
        };
        if let (Some(props), Some(right_props)) = (merged.properties.as_mut(), right_props) {
            props.extend(right_props);
        }
        if let Some(reference) = mask_values.get(name) {
            merged.values = Some(Values::Reference(reference.clone()));
        }
        meta.columns.insert(name.clone(), merged);
    }

    if let Some(from_set) = right.sets.get(&options.from_set) {
        for item in &from_set.items {
            meta.add_to_set(DATA_FILE_SET, item.clone());
        }
    }

    info!(
        new = new_columns.len(),
        updated = updated_columns.len(),
        warnings = warnings.len(),
        "merged meta"
    );
    Ok(MetaMergeOutcome {
        meta,
        columns,
        new_columns,
        updated_columns,
        warnings,
    })
}

struct MergePlan {
    columns: Vec<String>,
    masks: Vec<String>,
    /// Mask columns whose values live in the mask's library entry.
    mask_values: BTreeMap<String, String>,
}

/// Collect columns and masks from set items, descending into nested sets.
///
/// The caller has already checked the set for cycles.
fn merge_plan(right: &Meta, items: &[String]) -> Result<MergePlan> {
    let mut plan = MergePlan {
        columns: Vec::new(),
        masks: Vec::new(),
        mask_values: BTreeMap::new(),
    };
    plan.extend(right, items)?;
    Ok(plan)
}

impl MergePlan {
    fn extend(&mut self, right: &Meta, items: &[String]) -> Result<()> {
        for item in items {
            let source = SourceRef::parse(item)?;
            match source.kind {
                ReferenceKind::Column => push_unique(&mut self.columns, source.name),
                ReferenceKind::Mask => {
                    let mask = right.mask(&source.name)?;
                    for mask_item in &mask.items {
                        let member = SourceRef::parse(&mask_item.source)?;
                        if member.kind != ReferenceKind::Column {
                            continue;
                        }
                        if mask.values.is_some() {
                            self.mask_values
                                .insert(member.name.clone(), lib_values_reference(&source.name));
                        }
                        push_unique(&mut self.columns, member.name);
                    }
                    push_unique(&mut self.masks, source.name);
                }
                ReferenceKind::Set => {
                    let nested = right.set(&source.name)?;
                    self.extend(right, &nested.items)?;
                }
                ReferenceKind::LibValues => {}
            }
        }
        Ok(())
    }
}

fn push_unique(names: &mut Vec<String>, name: String) {
    if !names.contains(&name) {
        names.push(name);
    }
}

/// Merge a right column into the matching left column.
///
/// Both columns must have their values resolved. The left type is kept.
pub fn merge_column(
    mut left: ColumnDef,
    right: &ColumnDef,
    overwrite: bool,
) -> Result<(ColumnDef, Option<MergeWarning>)> {
    let warning = check_types(&left.name, left.column_type, right.column_type)?;
    left.text.merge_from(&right.text, overwrite);
    if let (Some(Values::List(left_values)), Some(Values::List(right_values))) =
        (left.values.as_mut(), right.values.as_ref())
    {
        merge_values(left_values, right_values, overwrite);
    }
    Ok((left, warning))
}

/// Merge categories by value id: shared ids merge their labels, new ids are appended.
pub fn merge_values(left: &mut Vec<CategoryValue>, right: &[CategoryValue], overwrite: bool) {
    for value in right {
        match left.iter_mut().find(|existing| existing.value == value.value) {
            Some(existing) => {
                existing.text.merge_from(&value.text, overwrite);
            }
            None => left.push(value.clone()),
        }
    }
}

fn merge_mask(meta: &mut Meta, right: &Meta, name: &str, overwrite: bool) -> Result<()> {
    let right_mask = right.mask(name)?;
    let Some(left_mask) = meta.masks.get_mut(name) else {
        debug!(mask = name, "adding mask");
        meta.masks.insert(name.to_string(), right_mask.clone());
        return Ok(());
    };
    left_mask.text.merge_from(&right_mask.text, overwrite);
    let mut added = Vec::new();
    for item in &right_mask.items {
        match left_mask
            .items
            .iter_mut()
            .find(|existing| existing.source == item.source)
        {
            Some(existing) => {
                existing.text.merge_from(&item.text, overwrite);
            }
            None => {
                left_mask.items.push(item.clone());
                added.push(item.source.clone());
            }
        }
    }
    for source in added {
        debug!(mask = name, item = %source, "adding mask item");
        meta.add_to_set(name, source);
    }
    Ok(())
}

fn merge_lib_values(meta: &mut Meta, right: &Meta) {
    for (name, entry) in &right.lib.values {
        let Some(existing) = meta.lib.values.get_mut(name) else {
            meta.lib.values.insert(name.clone(), entry.clone());
            continue;
        };
        if name == DDF_ENTRY || existing == entry {
            continue;
        }
        if let (LibEntry::Values(left_values), LibEntry::Values(right_values)) = (existing, entry) {
            for value in right_values {
                if !left_values.iter().any(|known| known.value == value.value) {
                    left_values.push(value.clone());
                }
            }
        }
    }
}
