//! Flag-slot layouts for tracked types.
//!
//! A scalar occupies a single "is it assigned" slot. A struct occupies one
//! whole-value slot, one slot per simple field in declaration order, then the
//! nested layouts of struct-typed fields, contiguous in declaration order.
//! Layouts are memoized per type identity; a recursive layout is a compile
//! error and the offending field is dropped from tracking (treated as opaque,
//! i.e. always assigned).

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::diag::Diagnostics;
use crate::errors::FlowError;
use crate::types::{Type, TypeTable};

#[derive(Debug)]
pub struct TypeLayout {
    /// Whole-value slot plus every tracked field slot, nested layouts included.
    pub total_slots: usize,
    /// Number of simple (single-slot) fields tracked directly.
    pub own_field_count: usize,
    /// Tracked fields in declaration order; offsets are relative to the
    /// struct's own whole-value slot.
    pub fields: Vec<FieldSlot>,
}

#[derive(Debug)]
pub struct FieldSlot {
    pub name: String,
    pub offset: usize,
    /// Present for fields that are themselves value types.
    pub layout: Option<Rc<TypeLayout>>,
}

impl TypeLayout {
    fn scalar() -> Self {
        Self {
            total_slots: 1,
            own_field_count: 0,
            fields: Vec::new(),
        }
    }
}

#[derive(Debug)]
pub struct LayoutCache {
    layouts: HashMap<String, Rc<TypeLayout>>,
    in_progress: HashSet<String>,
    scalar: Rc<TypeLayout>,
}

impl LayoutCache {
    pub fn new() -> Self {
        Self {
            layouts: HashMap::new(),
            in_progress: HashSet::new(),
            scalar: Rc::new(TypeLayout::scalar()),
        }
    }

    pub fn layout_of(&mut self, ty: &Type, types: &TypeTable, diag: &mut Diagnostics) -> Rc<TypeLayout> {
        match ty {
            Type::Struct(name) => self
                .struct_layout(name, types, diag)
                .unwrap_or_else(|| self.scalar.clone()),
            _ => self.scalar.clone(),
        }
    }

    /// `None` signals a layout cycle to the caller, which drops the field.
    fn struct_layout(
        &mut self,
        name: &str,
        types: &TypeTable,
        diag: &mut Diagnostics,
    ) -> Option<Rc<TypeLayout>> {
        if let Some(layout) = self.layouts.get(name) {
            return Some(layout.clone());
        }
        if !self.in_progress.insert(name.to_string()) {
            return None;
        }

        // A name without a definition is outside this engine's view of the
        // type system; track it as an opaque single slot.
        let Some(def) = types.struct_def(name) else {
            self.in_progress.remove(name);
            let layout = self.scalar.clone();
            self.layouts.insert(name.to_string(), layout.clone());
            return Some(layout);
        };

        let mut simple = Vec::new();
        let mut nested = Vec::new();
        for field in &def.fields {
            if let Type::Struct(field_struct) = &field.ty {
                match self.struct_layout(field_struct, types, diag) {
                    Some(sub) => nested.push((field.name.clone(), sub)),
                    None => {
                        diag.report(FlowError::StructLayoutCycle(
                            def.name.clone(),
                            field.name.clone(),
                            field_struct.clone(),
                            def.span,
                        ));
                        // Dropped from tracking: reads of it always succeed.
                    }
                }
            } else {
                simple.push(field.name.clone());
            }
        }

        let own_field_count = simple.len();
        let mut fields = Vec::with_capacity(own_field_count + nested.len());
        let mut offset = 1;
        for name in simple {
            fields.push(FieldSlot {
                name,
                offset,
                layout: None,
            });
            offset += 1;
        }
        for (name, sub) in nested {
            let slots = sub.total_slots;
            fields.push(FieldSlot {
                name,
                offset,
                layout: Some(sub),
            });
            offset += slots;
        }

        let layout = Rc::new(TypeLayout {
            total_slots: offset,
            own_field_count,
            fields,
        });
        self.in_progress.remove(name);
        self.layouts.insert(name.to_string(), layout.clone());
        Some(layout)
    }
}

impl Default for LayoutCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "tests/t_layout.rs"]
mod tests;
