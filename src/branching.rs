//! The branching-scope tree and non-local exit routing.
//!
//! Scopes mirror the program's control structure and live in an arena
//! addressed by [`ScopeId`]. Each scope owns the sibling usage vectors of its
//! alternative paths plus the deferred exit vectors (breaks, continues,
//! returns, gotos) it captures. Exits walk the ancestor chain with one match
//! arm per scope kind; crossing a try/finally grouping parks the exit until
//! the `finally` block's effects are known.

use indexmap::IndexMap;

use crate::diag::{Diagnostics, Span};
use crate::errors::FlowError;
use crate::vars::{VarInfoId, VarTable};
use crate::vector::{SiblingKind, UsageVector};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeId(pub u32);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeKind {
    Toplevel,
    Block { implicit: bool },
    Conditional,
    Loop { infinite: bool },
    LoopBody,
    Switch { has_default: bool },
    SwitchSection,
    Labeled,
    Exception,
}

impl ScopeKind {
    fn sibling_kind(&self) -> SiblingKind {
        match self {
            ScopeKind::Toplevel => SiblingKind::Toplevel,
            ScopeKind::Block { .. } | ScopeKind::Loop { .. } | ScopeKind::LoopBody => {
                SiblingKind::Block
            }
            ScopeKind::Conditional => SiblingKind::Conditional,
            ScopeKind::Switch { .. } => SiblingKind::SwitchSection,
            ScopeKind::SwitchSection => SiblingKind::SwitchSection,
            ScopeKind::Labeled => SiblingKind::Block,
            ScopeKind::Exception => SiblingKind::Try,
        }
    }
}

#[derive(Debug)]
enum ExitKind {
    Break,
    Continue,
    Return,
    Goto(String),
}

#[derive(Debug)]
struct ParkedExit {
    kind: ExitKind,
    vector: UsageVector,
    span: Span,
}

#[derive(Debug)]
struct LabelState {
    origins: Vec<UsageVector>,
    resolved: bool,
}

#[derive(Debug)]
struct BranchScope {
    kind: ScopeKind,
    parent: Option<ScopeId>,
    /// The frozen starting state every sibling of this scope forks from.
    inherited: UsageVector,
    /// Alternative paths through this scope; the last one is current.
    siblings: Vec<UsageVector>,
    local_size: usize,
    param_size: usize,
    /// Labels declared directly in this scope (blocks and the toplevel).
    labels: IndexMap<String, LabelState>,
    break_origins: Vec<UsageVector>,
    continue_origins: Vec<UsageVector>,
    return_origins: Vec<(UsageVector, Span)>,
    /// Exits that crossed this try/finally grouping, delivered at close.
    parked: Vec<ParkedExit>,
    finally_vector: Option<UsageVector>,
    in_finally: bool,
    finalized: bool,
}

impl BranchScope {
    fn current_vector(&mut self) -> &mut UsageVector {
        if self.in_finally {
            self.finally_vector
                .as_mut()
                .expect("finally vector present while in finally")
        } else {
            self.siblings.last_mut().expect("scope has a sibling")
        }
    }
}

pub struct FlowContext {
    scopes: Vec<BranchScope>,
    current: ScopeId,
}

impl FlowContext {
    /// Creates the implicit toplevel scope of one analyzed body, seeded from
    /// an all-unassigned vector sized by the body's variable maps.
    pub fn new(local_size: usize, param_size: usize) -> Self {
        let toplevel = BranchScope {
            kind: ScopeKind::Toplevel,
            parent: None,
            inherited: UsageVector::new(SiblingKind::Toplevel, local_size, param_size),
            siblings: vec![UsageVector::new(SiblingKind::Toplevel, local_size, param_size)],
            local_size,
            param_size,
            labels: IndexMap::new(),
            break_origins: Vec::new(),
            continue_origins: Vec::new(),
            return_origins: Vec::new(),
            parked: Vec::new(),
            finally_vector: None,
            in_finally: false,
            finalized: false,
        };
        Self {
            scopes: vec![toplevel],
            current: ScopeId(0),
        }
    }

    fn scope(&self, id: ScopeId) -> &BranchScope {
        &self.scopes[id.0 as usize]
    }

    fn scope_mut(&mut self, id: ScopeId) -> &mut BranchScope {
        &mut self.scopes[id.0 as usize]
    }

    /// The usage vector statements are currently resolved against.
    pub fn vector(&mut self) -> &mut UsageVector {
        self.scope_mut(self.current).current_vector()
    }

    /// Enters a control construct. The new scope's first sibling forks from
    /// the enclosing scope's current vector, grown to the given map sizes.
    /// `labels` are the labels declared directly in this scope; a label
    /// already visible in an enclosing scope is a duplicate.
    pub fn open(
        &mut self,
        kind: ScopeKind,
        local_size: usize,
        param_size: usize,
        labels: Vec<(String, Span)>,
        diag: &mut Diagnostics,
    ) -> ScopeId {
        let mut label_table = IndexMap::new();
        for (name, span) in labels {
            let shadows = self.find_label(self.current, &name).is_some();
            if shadows || label_table.contains_key(&name) {
                diag.report(FlowError::DuplicateLabel(name.clone(), span));
            }
            label_table.insert(
                name,
                LabelState {
                    origins: Vec::new(),
                    resolved: false,
                },
            );
        }

        let sibling_kind = kind.sibling_kind();
        let inherited = self.vector().fork(sibling_kind, local_size, param_size);
        let scope = BranchScope {
            kind,
            parent: Some(self.current),
            siblings: vec![inherited.clone()],
            inherited,
            local_size,
            param_size,
            labels: label_table,
            break_origins: Vec::new(),
            continue_origins: Vec::new(),
            return_origins: Vec::new(),
            parked: Vec::new(),
            finally_vector: None,
            in_finally: false,
            finalized: false,
        };
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(scope);
        self.current = id;
        id
    }

    /// Starts another alternative path through the current scope, forked from
    /// the scope's original inherited vector (never from a previous sibling's
    /// ending state).
    pub fn create_sibling(&mut self, kind: SiblingKind) {
        let scope = self.scope_mut(self.current);
        let mut sibling = scope.inherited.clone();
        sibling.kind = kind;
        scope.siblings.push(sibling);
    }

    /// Leaves the current construct: merges its sibling paths, folds in the
    /// exits it captured, and folds the result into the parent's current
    /// vector. Labeled scopes and implicit blocks overwrite the parent's
    /// reachability instead of contributing to it.
    pub fn close(&mut self, diag: &mut Diagnostics) {
        let id = self.current;
        let scope = self.scope_mut(id);
        assert!(!scope.finalized, "branching scope closed twice");
        scope.finalized = true;
        let parent = scope.parent.expect("the toplevel closes via close_toplevel");
        let kind = scope.kind.clone();
        let siblings = std::mem::take(&mut scope.siblings);
        let mut merged = UsageVector::merge(siblings);

        match &kind {
            ScopeKind::Loop { infinite } => {
                // An infinite loop's body end never falls out; only captured
                // breaks can make the code after the loop reachable.
                if *infinite {
                    merged.goto_unreachable();
                }
                let breaks = std::mem::take(&mut self.scope_mut(id).break_origins);
                merged.merge_origins(&breaks);
            }
            ScopeKind::LoopBody => {
                // Continues land at the end of the body, before the condition
                // is re-checked.
                let continues = std::mem::take(&mut self.scope_mut(id).continue_origins);
                merged.merge_origins(&continues);
            }
            ScopeKind::Switch { has_default } => {
                if !has_default {
                    // No default section: the path that matches no case label
                    // skips the switch entirely.
                    let skip = self.scope(id).inherited.clone();
                    merged = UsageVector::merge(vec![merged, skip]);
                }
                let breaks = std::mem::take(&mut self.scope_mut(id).break_origins);
                merged.merge_origins(&breaks);
            }
            ScopeKind::Exception => {
                let scope = self.scope_mut(id);
                let finally = scope.finally_vector.take();
                let mut parked = std::mem::take(&mut scope.parked);
                if let Some(finally) = &finally {
                    // The finally always runs: its assignments hold on the
                    // fallthrough join and on every exit that crossed it.
                    merged.union_assignments(finally);
                    for exit in &mut parked {
                        exit.vector.union_assignments(finally);
                    }
                    if finally.is_unreachable() {
                        merged.goto_unreachable();
                    }
                }
                for exit in parked {
                    self.route_exit(parent, exit.kind, exit.vector, exit.span, diag);
                }
            }
            _ => {}
        }

        self.current = parent;
        let overwrite = matches!(
            kind,
            ScopeKind::Labeled | ScopeKind::Block { implicit: true }
        );
        self.vector().merge_child_into(&merged, overwrite);
    }

    /// Closes the toplevel scope: verifies the out-parameter obligations on
    /// every captured return vector and on the fallthrough join, and yields
    /// whether the method end is unreachable (all paths return).
    pub fn close_toplevel(
        &mut self,
        out_params: &[VarInfoId],
        vars: &VarTable,
        end_span: Span,
        diag: &mut Diagnostics,
    ) -> bool {
        let scope = self.scope_mut(self.current);
        assert!(scope.kind == ScopeKind::Toplevel, "not the toplevel scope");
        assert!(!scope.finalized, "branching scope closed twice");
        scope.finalized = true;
        let siblings = std::mem::take(&mut scope.siblings);
        let returns = std::mem::take(&mut scope.return_origins);
        let mut merged = UsageVector::merge(siblings);

        for (mut vector, span) in returns {
            for &param in out_params {
                if !vector.is_assigned(vars, param) {
                    diag.report(FlowError::OutParamNotAssigned(
                        vars.info(param).name.clone(),
                        span,
                    ));
                }
            }
        }
        if !merged.is_unreachable() {
            for &param in out_params {
                if !merged.is_assigned(vars, param) {
                    diag.report(FlowError::OutParamNotAssigned(
                        vars.info(param).name.clone(),
                        end_span,
                    ));
                }
            }
        }
        merged.is_unreachable()
    }

    // --- Finally bodies ---

    /// Switches the current try/finally grouping to its finally body, which
    /// starts from the scope's inherited state (the finally runs whether or
    /// not the protected region completed).
    pub fn begin_finally(&mut self) {
        let scope = self.scope_mut(self.current);
        assert!(scope.kind == ScopeKind::Exception, "finally outside a try grouping");
        let mut vector = scope.inherited.clone();
        vector.kind = SiblingKind::Finally;
        scope.finally_vector = Some(vector);
        scope.in_finally = true;
    }

    pub fn end_finally(&mut self) {
        let scope = self.scope_mut(self.current);
        assert!(scope.in_finally, "not inside a finally body");
        scope.in_finally = false;
    }

    // --- Non-local exits ---

    pub fn add_break(&mut self, span: Span, diag: &mut Diagnostics) {
        let vector = self.vector().clone();
        if self.route_exit(self.current, ExitKind::Break, vector, span, diag) {
            self.vector().goto_unreachable();
        }
    }

    pub fn add_continue(&mut self, span: Span, diag: &mut Diagnostics) {
        let vector = self.vector().clone();
        if self.route_exit(self.current, ExitKind::Continue, vector, span, diag) {
            self.vector().goto_unreachable();
        }
    }

    pub fn add_return(&mut self, span: Span, diag: &mut Diagnostics) {
        let vector = self.vector().clone();
        if self.route_exit(self.current, ExitKind::Return, vector, span, diag) {
            self.vector().goto_unreachable();
        }
    }

    pub fn add_goto(&mut self, label: &str, span: Span, diag: &mut Diagnostics) {
        let vector = self.vector().clone();
        let exit = ExitKind::Goto(label.to_string());
        if self.route_exit(self.current, exit, vector, span, diag) {
            self.vector().goto_unreachable();
        }
    }

    /// `goto case` / `goto default`: the switch dispatch collaborator resolves
    /// the actual target; the flow engine only needs the jump point to end
    /// its path. Still rejected outside a switch or out of a finally body.
    pub fn add_goto_case(&mut self, span: Span, diag: &mut Diagnostics) {
        let mut scope_id = Some(self.current);
        while let Some(id) = scope_id {
            let scope = self.scope(id);
            if scope.in_finally {
                diag.report(FlowError::LeaveFinallyClause(span));
                return;
            }
            if matches!(scope.kind, ScopeKind::Switch { .. }) {
                self.vector().goto_unreachable();
                return;
            }
            scope_id = scope.parent;
        }
        diag.report(FlowError::GotoCaseNotInSwitch(span));
    }

    /// Resolves a label statement: drains the forward jump origins collected
    /// for it and merges them into the current vector, possibly making an
    /// unreachable point reachable again.
    pub fn resolve_label(&mut self, name: &str) {
        let owner = self
            .find_label(self.current, name)
            .expect("labels are registered when their block opens");
        let state = self.scope_mut(owner).labels.get_mut(name).unwrap();
        state.resolved = true;
        let origins = std::mem::take(&mut state.origins);
        self.vector().merge_origins(&origins);
    }

    fn find_label(&self, from: ScopeId, name: &str) -> Option<ScopeId> {
        let mut scope_id = Some(from);
        while let Some(id) = scope_id {
            let scope = self.scope(id);
            if scope.labels.contains_key(name) {
                return Some(id);
            }
            scope_id = scope.parent;
        }
        None
    }

    /// Walks the exit up the ancestor chain. Every kind either captures the
    /// exit or delegates to its parent; a try/finally grouping on the way
    /// parks it instead, and leaving a finally body is an error. Returns
    /// whether the exit was captured or parked (a structural error leaves the
    /// current path untouched).
    fn route_exit(
        &mut self,
        from: ScopeId,
        kind: ExitKind,
        vector: UsageVector,
        span: Span,
        diag: &mut Diagnostics,
    ) -> bool {
        let mut scope_id = Some(from);
        while let Some(id) = scope_id {
            let scope = self.scope_mut(id);
            if scope.in_finally {
                diag.report(FlowError::LeaveFinallyClause(span));
                return false;
            }
            if let ExitKind::Goto(name) = &kind
                && let Some(state) = scope.labels.get_mut(name)
            {
                // Forward jumps are merged when the label resolves; a jump to
                // an already-resolved label is recorded but the label's own
                // starting vector is fixed at resolve-order time.
                state.origins.push(vector);
                return true;
            }
            match (&scope.kind, &kind) {
                (ScopeKind::Exception, _) => {
                    scope.parked.push(ParkedExit { kind, vector, span });
                    return true;
                }
                (ScopeKind::Loop { .. } | ScopeKind::Switch { .. }, ExitKind::Break) => {
                    scope.break_origins.push(vector);
                    return true;
                }
                (ScopeKind::LoopBody, ExitKind::Continue) => {
                    scope.continue_origins.push(vector);
                    return true;
                }
                (ScopeKind::Toplevel, ExitKind::Return) => {
                    scope.return_origins.push((vector, span));
                    return true;
                }
                (ScopeKind::Toplevel, ExitKind::Break | ExitKind::Continue) => {
                    diag.report(FlowError::NoEnclosingLoop(span));
                    return false;
                }
                (ScopeKind::Toplevel, ExitKind::Goto(name)) => {
                    diag.report(FlowError::NoSuchLabel(name.clone(), span));
                    return false;
                }
                _ => scope_id = scope.parent,
            }
        }
        unreachable!("exit routing always terminates at the toplevel");
    }
}

#[cfg(test)]
#[path = "tests/t_branching.rs"]
mod tests;
