//! One execution path's assignment state.
//!
//! A usage vector pairs the assigned-flags for locals and `out` parameters
//! with an "unreachable from here" marker. Sibling vectors forked at one
//! branching point are alternatives and are intersected when the branching
//! closes; a child scope's result is unioned back into the path that ran it.

use std::fmt;

use crate::bitvec::BitVector;
use crate::vars::{VarInfoId, VarSpace, VarTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiblingKind {
    Toplevel,
    Block,
    Conditional,
    Try,
    Catch,
    Finally,
    SwitchSection,
}

#[derive(Debug, Clone)]
pub struct UsageVector {
    pub kind: SiblingKind,
    locals: BitVector,
    params: BitVector,
    unreachable: bool,
}

impl UsageVector {
    pub fn new(kind: SiblingKind, local_size: usize, param_size: usize) -> Self {
        Self {
            kind,
            locals: BitVector::new(local_size),
            params: BitVector::new(param_size),
            unreachable: false,
        }
    }

    /// Forks a new path from this one, growing the flag vectors to the new
    /// scope's map sizes. The backing storage is shared until first write.
    pub fn fork(&self, kind: SiblingKind, local_size: usize, param_size: usize) -> Self {
        let mut locals = self.locals.clone();
        locals.grow(local_size);
        let mut params = self.params.clone();
        params.grow(param_size);
        Self {
            kind,
            locals,
            params,
            unreachable: self.unreachable,
        }
    }

    pub fn is_unreachable(&self) -> bool {
        self.unreachable
    }

    /// Marks the rest of this path unreachable. The flag vectors switch to
    /// the fully-assigned sentinel so later assignment checks vacuously
    /// succeed and sibling intersection treats this path as identity.
    pub fn goto_unreachable(&mut self) {
        self.unreachable = true;
        self.locals.mark_all_assigned();
        self.params.mark_all_assigned();
    }

    fn flags(&self, space: VarSpace) -> &BitVector {
        match space {
            VarSpace::Local => &self.locals,
            VarSpace::OutParam => &self.params,
        }
    }

    fn flags_mut(&mut self, space: VarSpace) -> &mut BitVector {
        match space {
            VarSpace::Local => &mut self.locals,
            VarSpace::OutParam => &mut self.params,
        }
    }

    /// Whether the variable is definitely assigned on this path. On an
    /// unreachable path every query vacuously succeeds. For a struct
    /// descriptor this rolls the whole-value bit up once all tracked fields
    /// are observed assigned, so subsequent queries are O(1).
    pub fn is_assigned(&mut self, vars: &VarTable, id: VarInfoId) -> bool {
        if self.unreachable {
            return true;
        }
        self.is_assigned_inner(vars, id)
    }

    fn is_assigned_inner(&mut self, vars: &VarTable, id: VarInfoId) -> bool {
        let info = vars.info(id);
        if self.flags(info.space).get(info.offset) {
            return true;
        }
        // An assigned ancestor struct covers all of its fields.
        let mut parent = info.parent;
        while let Some(parent_id) = parent {
            let parent_info = vars.info(parent_id);
            if self.flags(parent_info.space).get(parent_info.offset) {
                return true;
            }
            parent = parent_info.parent;
        }
        if info.length == 1 {
            return false;
        }
        // Struct roll-up: assigned iff every tracked field is.
        let field_ids: Vec<VarInfoId> = info.fields.values().copied().collect();
        let (offset, space) = (info.offset, info.space);
        for field_id in field_ids {
            if !self.is_assigned_inner(vars, field_id) {
                return false;
            }
        }
        self.flags_mut(space).set(offset, true);
        true
    }

    /// Marks the whole value assigned. Field sub-bits are left alone; field
    /// queries already succeed through the ancestor check.
    pub fn set_assigned(&mut self, vars: &VarTable, id: VarInfoId) {
        let info = vars.info(id);
        self.flags_mut(info.space).set(info.offset, true);
    }

    /// Marks one field of a struct variable assigned. Untracked fields
    /// (dropped by a layout cycle) are a no-op.
    pub fn set_field_assigned(&mut self, vars: &VarTable, id: VarInfoId, field: &str) {
        if let Some(field_id) = vars.field(id, field) {
            self.set_assigned(vars, field_id);
        }
    }

    /// Whether one field of a struct variable is definitely assigned.
    /// Untracked fields are opaque and always count as assigned.
    pub fn is_field_assigned(&mut self, vars: &VarTable, id: VarInfoId, field: &str) -> bool {
        match vars.field(id, field) {
            Some(field_id) => self.is_assigned(vars, field_id),
            None => true,
        }
    }

    /// Merges sibling paths of one branching point: a flag survives only if
    /// set on every sibling, and the join is unreachable only if every
    /// sibling is. Unreachable siblings carry the fully-assigned sentinel,
    /// which makes them the identity of the intersection.
    pub fn merge(mut siblings: Vec<UsageVector>) -> UsageVector {
        let mut merged = siblings.remove(0);
        for sibling in &siblings {
            merged.locals.intersect(&sibling.locals);
            merged.params.intersect(&sibling.params);
            merged.unreachable &= sibling.unreachable;
        }
        merged
    }

    /// Folds a closed child scope's result into this path. The child's proven
    /// assignments become additional certainty; its terminal reachability
    /// either fully determines ours (`overwrite`, for labeled statements and
    /// implicit blocks) or merely contributes to it.
    pub fn merge_child_into(&mut self, child: &UsageVector, overwrite: bool) {
        self.locals.union(&child.locals);
        self.params.union(&child.params);
        if overwrite {
            self.unreachable = child.unreachable;
        } else {
            self.unreachable |= child.unreachable;
        }
    }

    /// Merges deferred jump vectors (breaks, continues, gotos, returns) into
    /// this vector. A vector that was unreachable on its own starts from the
    /// permissive fully-assigned state before the origins narrow it down.
    pub fn merge_origins(&mut self, origins: &[UsageVector]) {
        if origins.is_empty() {
            return;
        }
        if self.unreachable {
            self.locals.mark_all_assigned();
            self.params.mark_all_assigned();
        }
        for origin in origins {
            if !origin.unreachable {
                self.locals.intersect(&origin.locals);
                self.params.intersect(&origin.params);
            }
            self.unreachable &= origin.unreachable;
        }
    }

    /// Unions another vector's proven assignments into this one without
    /// touching reachability; used to thread a `finally` block's effects into
    /// exits that cross it.
    pub fn union_assignments(&mut self, other: &UsageVector) {
        self.locals.union(&other.locals);
        self.params.union(&other.params);
    }
}

impl fmt::Display for UsageVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "UsageVector ({:?}{}, locals: {}, params: {})",
            self.kind,
            if self.unreachable { ", unreachable" } else { "" },
            self.locals,
            self.params,
        )
    }
}

#[cfg(test)]
#[path = "tests/t_vector.rs"]
mod tests;
