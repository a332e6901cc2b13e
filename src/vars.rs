//! Variable descriptors and per-block offset allocation.
//!
//! Every tracked local or `out` parameter gets a descriptor binding it to an
//! offset/length range in the flag space, derived from its type layout.
//! Struct variables additionally get one sub-descriptor per tracked field, so
//! member-by-member assignment and whole-value roll-up can be queried through
//! the same interface.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::diag::Diagnostics;
use crate::layout::{LayoutCache, TypeLayout};
use crate::types::{Type, TypeTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VarInfoId(pub u32);

impl fmt::Display for VarInfoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which flag vector a descriptor indexes into: the method's locals or its
/// `out` parameters. By-value and `ref` parameters are never tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarSpace {
    Local,
    OutParam,
}

#[derive(Debug)]
pub struct VarInfo {
    pub name: String,
    pub offset: usize,
    pub length: usize,
    pub space: VarSpace,
    /// Set only on sub-field descriptors derived from a struct's descriptor.
    pub parent: Option<VarInfoId>,
    /// Tracked fields by name; fields dropped from tracking are absent.
    pub fields: IndexMap<String, VarInfoId>,
}

impl VarInfo {
    pub fn is_parameter(&self) -> bool {
        self.space == VarSpace::OutParam
    }
}

/// Arena of all descriptors created for one analyzed method body.
#[derive(Debug, Default)]
pub struct VarTable {
    infos: Vec<VarInfo>,
}

impl VarTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(&self, id: VarInfoId) -> &VarInfo {
        &self.infos[id.0 as usize]
    }

    pub fn field(&self, id: VarInfoId, name: &str) -> Option<VarInfoId> {
        self.info(id).fields.get(name).copied()
    }

    /// Creates a root descriptor at `offset` together with its sub-field
    /// descriptors, recursively for struct-typed fields.
    pub fn add_root(
        &mut self,
        name: &str,
        offset: usize,
        layout: &Rc<TypeLayout>,
        space: VarSpace,
    ) -> VarInfoId {
        self.add_info(name, offset, layout.total_slots, Some(layout), space, None)
    }

    fn add_info(
        &mut self,
        name: &str,
        offset: usize,
        length: usize,
        layout: Option<&Rc<TypeLayout>>,
        space: VarSpace,
        parent: Option<VarInfoId>,
    ) -> VarInfoId {
        let id = VarInfoId(self.infos.len() as u32);
        self.infos.push(VarInfo {
            name: name.to_string(),
            offset,
            length,
            space,
            parent,
            fields: IndexMap::new(),
        });
        if let Some(layout) = layout {
            for slot in &layout.fields {
                let sub_id = match &slot.layout {
                    Some(sub) => self.add_info(
                        &slot.name,
                        offset + slot.offset,
                        sub.total_slots,
                        Some(sub),
                        space,
                        Some(id),
                    ),
                    None => {
                        self.add_info(&slot.name, offset + slot.offset, 1, None, space, Some(id))
                    }
                };
                self.infos[id.0 as usize]
                    .fields
                    .insert(slot.name.clone(), sub_id);
            }
        }
        id
    }
}

/// Offset allocation table for one block's declarations. A nested block's map
/// continues from the enclosing map's running total, so offsets are never
/// reused within one method activation and a single flat bit vector serves
/// the whole method.
#[derive(Debug, Clone)]
pub struct VariableMap {
    space: VarSpace,
    total: usize,
}

impl VariableMap {
    pub fn new(space: VarSpace) -> Self {
        Self { space, total: 0 }
    }

    pub fn nested(&self) -> Self {
        self.clone()
    }

    pub fn total_len(&self) -> usize {
        self.total
    }

    pub fn add(
        &mut self,
        vars: &mut VarTable,
        layouts: &mut LayoutCache,
        types: &TypeTable,
        name: &str,
        ty: &Type,
        diag: &mut Diagnostics,
    ) -> VarInfoId {
        let layout = layouts.layout_of(ty, types, diag);
        let offset = self.total;
        self.total += layout.total_slots;
        vars.add_root(name, offset, &layout, self.space)
    }
}

#[cfg(test)]
#[path = "tests/t_vars.rs"]
mod tests;
