//! Walking sets and masks.
//!
//! Sets list `columns@`, `masks@` and `sets@` references; masks list their
//! columns. The walk follows containers depth-first over an explicit visiting
//! stack, so a mask or set that reaches itself again is reported as
//! [`MetaError::CyclicReference`]. Reaching the same target through two
//! different paths is fine and yields it once.

use crate::error::{MetaError, Result};
use crate::meta::Meta;
use crate::reference::{ReferenceKind, SourceRef};

/// All columns reachable from a set, in set order.
pub fn columns_from_set(meta: &Meta, name: &str) -> Result<Vec<String>> {
    collect(meta, SourceRef::set(name), ReferenceKind::Column)
}

/// All columns of a mask.
pub fn columns_from_mask(meta: &Meta, name: &str) -> Result<Vec<String>> {
    collect(meta, SourceRef::mask(name), ReferenceKind::Column)
}

pub fn masks_from_set(meta: &Meta, name: &str) -> Result<Vec<String>> {
    collect(meta, SourceRef::set(name), ReferenceKind::Mask)
}

pub fn masks_from_mask(meta: &Meta, name: &str) -> Result<Vec<String>> {
    collect(meta, SourceRef::mask(name), ReferenceKind::Mask)
}

pub fn sets_from_set(meta: &Meta, name: &str) -> Result<Vec<String>> {
    collect(meta, SourceRef::set(name), ReferenceKind::Set)
}

pub fn sets_from_mask(meta: &Meta, name: &str) -> Result<Vec<String>> {
    collect(meta, SourceRef::mask(name), ReferenceKind::Set)
}

/// The parsed items of a mask or set.
pub fn items_of(meta: &Meta, container: &SourceRef) -> Result<Vec<SourceRef>> {
    match container.kind {
        ReferenceKind::Set => meta
            .set(&container.name)?
            .items
            .iter()
            .map(|item| SourceRef::parse(item))
            .collect(),
        ReferenceKind::Mask => meta
            .mask(&container.name)?
            .items
            .iter()
            .map(|item| SourceRef::parse(&item.source))
            .collect(),
        ReferenceKind::Column | ReferenceKind::LibValues => Ok(Vec::new()),
    }
}

fn collect(meta: &Meta, root: SourceRef, target: ReferenceKind) -> Result<Vec<String>> {
    let mut walk = Walk {
        meta,
        target,
        stack: Vec::new(),
        found: Vec::new(),
    };
    walk.visit(root)?;
    Ok(walk.found)
}

struct Walk<'a> {
    meta: &'a Meta,
    target: ReferenceKind,
    stack: Vec<SourceRef>,
    found: Vec<String>,
}

impl Walk<'_> {
    fn visit(&mut self, container: SourceRef) -> Result<()> {
        if self.stack.contains(&container) {
            let mut path: Vec<String> = self.stack.iter().map(ToString::to_string).collect();
            path.push(container.to_string());
            return Err(MetaError::CyclicReference {
                path: path.join(" -> "),
            });
        }
        let items = items_of(self.meta, &container)?;
        self.stack.push(container);
        for item in items {
            if item.kind == self.target {
                self.ensure_exists(&item)?;
                if !self.found.contains(&item.name) {
                    self.found.push(item.name);
                }
            } else if matches!(item.kind, ReferenceKind::Mask | ReferenceKind::Set) {
                self.visit(item)?;
            }
        }
        self.stack.pop();
        Ok(())
    }

    fn ensure_exists(&self, item: &SourceRef) -> Result<()> {
        let exists = match item.kind {
            ReferenceKind::Column => self.meta.columns.contains_key(&item.name),
            ReferenceKind::Mask => self.meta.masks.contains_key(&item.name),
            ReferenceKind::Set => self.meta.sets.contains_key(&item.name),
            ReferenceKind::LibValues => self.meta.lib.values.contains_key(&item.name),
        };
        if exists {
            Ok(())
        } else {
            Err(MetaError::NotFound {
                kind: item.kind,
                name: item.name.clone(),
            })
        }
    }
}
