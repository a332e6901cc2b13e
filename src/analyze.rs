//! Definite-assignment and reachability analysis over the statement tree.
//!
//! This is a single synchronous depth-first walk: each statement drives the
//! branching-scope engine (open/fork/close/exit) before returning, each
//! variable reference queries or updates the current usage vector, and every
//! user-facing condition goes to the diagnostics sink without unwinding.

use std::collections::HashMap;

use crate::ast::{
    ArgMode, Block, CaseLabel, Expr, ExprKind, Method, Module, ParamMode, Stmt, StmtKind,
    SwitchSection, VarId,
};
use crate::branching::{FlowContext, ScopeKind};
use crate::diag::{Diagnostics, Span};
use crate::errors::{FlowError, Severity};
use crate::layout::LayoutCache;
use crate::types::TypeTable;
use crate::vars::{VarInfoId, VarSpace, VarTable, VariableMap};
use crate::vector::SiblingKind;

/// The per-body verdict handed back to the compilation pipeline.
#[derive(Debug)]
pub struct FlowReport {
    pub diagnostics: Vec<FlowError>,
    /// Whether the method end is unreachable (every path returns or throws).
    /// The caller uses this to decide whether a missing-return diagnostic is
    /// needed; that diagnostic itself is not this engine's business.
    pub always_returns: bool,
}

impl FlowReport {
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|e| e.severity() == Severity::Error)
    }
}

/// Checks every method body in the module. Bodies are independent: a body
/// that fails analysis only excludes itself from code generation, so all
/// diagnostics are collected and reported together.
pub fn check_module(module: &Module) -> Result<(), Vec<FlowError>> {
    let mut diagnostics = Vec::new();
    let mut failed = false;
    for method in &module.methods {
        let report = check_method(method, &module.types);
        failed |= report.has_errors();
        diagnostics.extend(report.diagnostics);
    }
    if failed { Err(diagnostics) } else { Ok(()) }
}

pub fn check_method(method: &Method, types: &TypeTable) -> FlowReport {
    let mut checker = FlowChecker::new(method, types);
    checker.resolve_block(&method.body, true);
    let always_returns = checker.flow.close_toplevel(
        &checker.out_params,
        &checker.vars,
        method.span,
        &mut checker.diag,
    );
    FlowReport {
        diagnostics: checker.diag.into_vec(),
        always_returns,
    }
}

struct FlowChecker<'a> {
    types: &'a TypeTable,
    layouts: LayoutCache,
    vars: VarTable,
    /// Resolver bindings to descriptors; `None` marks a variable that is
    /// never tracked (by-value/ref parameters, catch bindings) and therefore
    /// always counts as assigned.
    defs: HashMap<VarId, Option<VarInfoId>>,
    /// Stack of locals maps, one per open block; the top map's total is the
    /// current declared size of the locals flag space.
    locals_maps: Vec<VariableMap>,
    param_len: usize,
    out_params: Vec<VarInfoId>,
    flow: FlowContext,
    /// Set while a contiguous unreachable run has already been warned about.
    warned_unreachable: bool,
    diag: Diagnostics,
}

impl<'a> FlowChecker<'a> {
    fn new(method: &Method, types: &'a TypeTable) -> Self {
        let mut layouts = LayoutCache::new();
        let mut vars = VarTable::new();
        let mut defs = HashMap::new();
        let mut diag = Diagnostics::new();
        let mut out_params = Vec::new();

        let mut param_map = VariableMap::new(VarSpace::OutParam);
        for param in &method.params {
            match param.mode {
                ParamMode::Out => {
                    let info = param_map.add(
                        &mut vars,
                        &mut layouts,
                        types,
                        &param.name,
                        &param.ty,
                        &mut diag,
                    );
                    defs.insert(param.id, Some(info));
                    out_params.push(info);
                }
                ParamMode::Value | ParamMode::Ref => {
                    defs.insert(param.id, None);
                }
            }
        }

        let param_len = param_map.total_len();
        Self {
            types,
            layouts,
            vars,
            defs,
            locals_maps: vec![VariableMap::new(VarSpace::Local)],
            param_len,
            out_params,
            flow: FlowContext::new(0, param_len),
            warned_unreachable: false,
            diag,
        }
    }

    // --- Scope plumbing ---

    /// Opens a scope for a statement list: allocates offsets for the list's
    /// direct declarations (flag vectors are sized at scope entry) and
    /// registers its labels.
    fn open_stmts_scope(&mut self, kind: ScopeKind, stmts: &[Stmt]) {
        let mut map = self.locals_maps.last().expect("a locals map is open").nested();
        for stmt in stmts {
            if let StmtKind::VarDecl { id, name, ty, .. } = &stmt.kind {
                let info = map.add(
                    &mut self.vars,
                    &mut self.layouts,
                    self.types,
                    name,
                    ty,
                    &mut self.diag,
                );
                self.defs.insert(*id, Some(info));
            }
        }
        let labels = collect_labels(stmts.iter());
        let local_len = map.total_len();
        self.locals_maps.push(map);
        self.flow
            .open(kind, local_len, self.param_len, labels, &mut self.diag);
    }

    fn close_stmts_scope(&mut self) {
        self.flow.close(&mut self.diag);
        self.locals_maps.pop();
    }

    fn open_scope(&mut self, kind: ScopeKind) {
        let local_len = self.locals_maps.last().expect("a locals map is open").total_len();
        self.flow
            .open(kind, local_len, self.param_len, Vec::new(), &mut self.diag);
    }

    // --- Statements ---

    fn resolve_block(&mut self, block: &Block, implicit: bool) {
        self.open_stmts_scope(ScopeKind::Block { implicit }, &block.stmts);
        self.resolve_stmts(&block.stmts);
        self.close_stmts_scope();
    }

    /// Resolves a statement list on the current vector, reporting at most one
    /// unreachable-code warning per contiguous unreachable run. The run may
    /// span nested statement lists, so the warned state lives on the checker
    /// and is cleared whenever a reachable statement is seen.
    fn resolve_stmts(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            // A label targeted by an earlier goto makes this point reachable
            // again; merge the whole label chain before judging reachability.
            let mut inner = stmt;
            while let StmtKind::Labeled { label, body } = &inner.kind {
                self.flow.resolve_label(label);
                inner = body;
            }
            if self.flow.vector().is_unreachable() {
                if !self.warned_unreachable {
                    self.diag.report(FlowError::UnreachableCode(stmt.span));
                    self.warned_unreachable = true;
                }
            } else {
                self.warned_unreachable = false;
            }
            self.resolve_stmt(stmt);
        }
    }

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Block(block) => self.resolve_block(block, false),
            StmtKind::VarDecl { id, init, .. } => {
                // Declarations are allocated when their block opens; a
                // declaration smuggled into an embedded statement position is
                // left untracked.
                self.defs.entry(*id).or_insert(None);
                if let Some(init) = init {
                    self.resolve_expr(init);
                    if let Some(Some(info)) = self.defs.get(id) {
                        let info = *info;
                        self.flow.vector().set_assigned(&self.vars, info);
                    }
                }
            }
            StmtKind::Assign { place, value } => {
                // The right-hand side is read first, then the target binds.
                self.resolve_expr(value);
                self.resolve_place_assign(place);
            }
            StmtKind::Expr(expr) => self.resolve_expr(expr),
            StmtKind::If {
                cond,
                then_body,
                else_body,
            } => {
                self.resolve_expr(cond);
                self.open_scope(ScopeKind::Conditional);
                self.resolve_stmt(then_body);
                self.flow.create_sibling(SiblingKind::Conditional);
                if let Some(else_body) = else_body {
                    self.resolve_stmt(else_body);
                }
                self.flow.close(&mut self.diag);
            }
            StmtKind::While { cond, body } => {
                let infinite = matches!(cond.kind, ExprKind::BoolLit(true));
                let never_runs = matches!(cond.kind, ExprKind::BoolLit(false));
                self.resolve_expr(cond);
                self.resolve_loop(infinite, never_runs, &[], |this| {
                    this.resolve_stmt(body);
                });
            }
            StmtKind::DoWhile { body, cond } => {
                // The body runs at least once, so no skip path is forked.
                let infinite = matches!(cond.kind, ExprKind::BoolLit(true));
                self.open_scope(ScopeKind::Loop { infinite });
                self.open_scope(ScopeKind::LoopBody);
                self.resolve_stmt(body);
                self.flow.close(&mut self.diag);
                // The condition is re-read after the body and any continue.
                self.resolve_expr(cond);
                self.flow.close(&mut self.diag);
            }
            StmtKind::For {
                init,
                cond,
                step,
                body,
            } => {
                // The initializer declarations live in a block of their own
                // wrapped around the loop.
                self.open_stmts_scope(ScopeKind::Block { implicit: true }, init);
                self.resolve_stmts(init);
                let infinite = match cond {
                    None => true,
                    Some(cond) => matches!(cond.kind, ExprKind::BoolLit(true)),
                };
                let never_runs = cond
                    .as_ref()
                    .is_some_and(|cond| matches!(cond.kind, ExprKind::BoolLit(false)));
                if let Some(cond) = cond {
                    self.resolve_expr(cond);
                }
                self.resolve_loop(infinite, never_runs, step, |this| {
                    this.resolve_stmt(body);
                });
                self.close_stmts_scope();
            }
            StmtKind::Switch {
                scrutinee,
                sections,
            } => self.resolve_switch(scrutinee, sections),
            StmtKind::Break => self.flow.add_break(stmt.span, &mut self.diag),
            StmtKind::Continue => self.flow.add_continue(stmt.span, &mut self.diag),
            StmtKind::Return(value) => {
                if let Some(value) = value {
                    self.resolve_expr(value);
                }
                self.flow.add_return(stmt.span, &mut self.diag);
            }
            StmtKind::Throw(value) => {
                if let Some(value) = value {
                    self.resolve_expr(value);
                }
                self.flow.vector().goto_unreachable();
            }
            StmtKind::Try {
                body,
                catches,
                finally,
            } => {
                self.open_scope(ScopeKind::Exception);
                self.resolve_block(body, false);
                for catch in catches {
                    self.flow.create_sibling(SiblingKind::Catch);
                    if let Some((id, _, _)) = &catch.var {
                        // The caught binding is assigned on entry and needs
                        // no tracking of its own.
                        self.defs.insert(*id, None);
                    }
                    self.resolve_block(&catch.body, false);
                }
                if let Some(finally) = finally {
                    self.flow.begin_finally();
                    self.resolve_block(finally, false);
                    self.flow.end_finally();
                }
                self.flow.close(&mut self.diag);
            }
            StmtKind::Labeled { label, body } => {
                self.flow.resolve_label(label);
                self.open_scope(ScopeKind::Labeled);
                self.resolve_stmt(body);
                self.flow.close(&mut self.diag);
            }
            StmtKind::Goto(label) => self.flow.add_goto(label, stmt.span, &mut self.diag),
            StmtKind::GotoCase(_) | StmtKind::GotoDefault => {
                self.flow.add_goto_case(stmt.span, &mut self.diag)
            }
        }
    }

    /// Shared loop shape for `while` and `for`: the body (plus step) path is
    /// an alternative to skipping the loop entirely, unless the condition is
    /// provably true. Breaks land after the loop, continues before the step.
    fn resolve_loop(
        &mut self,
        infinite: bool,
        never_runs: bool,
        step: &[Stmt],
        resolve_body: impl FnOnce(&mut Self),
    ) {
        if !infinite {
            self.open_scope(ScopeKind::Conditional);
        }
        self.open_scope(ScopeKind::Loop { infinite });
        self.open_scope(ScopeKind::LoopBody);
        if never_runs {
            self.flow.vector().goto_unreachable();
        }
        resolve_body(self);
        self.flow.close(&mut self.diag);
        self.resolve_stmts(step);
        self.flow.close(&mut self.diag);
        if !infinite {
            self.flow.create_sibling(SiblingKind::Conditional);
            self.flow.close(&mut self.diag);
        }
    }

    fn resolve_switch(&mut self, scrutinee: &Expr, sections: &[SwitchSection]) {
        self.resolve_expr(scrutinee);
        let has_default = sections
            .iter()
            .any(|s| s.labels.contains(&CaseLabel::Default));
        // All sections share the switch's declaration space.
        let section_stmts: Vec<&Stmt> = sections.iter().flat_map(|s| &s.stmts).collect();
        let mut map = self.locals_maps.last().expect("a locals map is open").nested();
        for stmt in &section_stmts {
            if let StmtKind::VarDecl { id, name, ty, .. } = &stmt.kind {
                let info = map.add(
                    &mut self.vars,
                    &mut self.layouts,
                    self.types,
                    name,
                    ty,
                    &mut self.diag,
                );
                self.defs.insert(*id, Some(info));
            }
        }
        let labels = collect_labels(section_stmts.iter().copied());
        let local_len = map.total_len();
        self.locals_maps.push(map);
        self.flow.open(
            ScopeKind::Switch { has_default },
            local_len,
            self.param_len,
            labels,
            &mut self.diag,
        );

        for (index, section) in sections.iter().enumerate() {
            if index > 0 {
                self.flow.create_sibling(SiblingKind::SwitchSection);
            }
            self.resolve_stmts(&section.stmts);
            // A section that can still be running at its end would fall into
            // the next case label.
            if index + 1 < sections.len() && !self.flow.vector().is_unreachable() {
                let label = section
                    .labels
                    .first()
                    .map(|l| l.to_string())
                    .unwrap_or_default();
                self.diag
                    .report(FlowError::SwitchFallThrough(label, section.span));
            }
        }

        self.flow.close(&mut self.diag);
        self.locals_maps.pop();
    }

    // --- Expressions ---

    fn resolve_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Var(id) => self.check_var_read(*id, expr.span),
            ExprKind::Field { base, name } => self.check_field_read(base, name, expr.span),
            ExprKind::IntLit(_) | ExprKind::BoolLit(_) | ExprKind::StringLit(_) => {}
            ExprKind::Unary { expr, .. } => self.resolve_expr(expr),
            ExprKind::Binary { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }
            ExprKind::Call { args, .. } => {
                for arg in args {
                    match arg.mode {
                        // By-value and ref arguments are reads; ref
                        // additionally requires the variable assigned, which
                        // the read check already enforces.
                        ArgMode::Value | ArgMode::Ref => self.resolve_expr(&arg.expr),
                        // An out argument is assigned by the callee.
                        ArgMode::Out => self.resolve_place_assign(&arg.expr),
                    }
                }
            }
        }
    }

    fn check_var_read(&mut self, id: VarId, span: Span) {
        let Some(Some(info)) = self.defs.get(&id) else {
            return;
        };
        let info = *info;
        if !self.flow.vector().is_assigned(&self.vars, info) {
            let var = self.vars.info(info);
            let error = match var.space {
                VarSpace::Local => FlowError::UseOfUnassignedLocal(var.name.clone(), span),
                VarSpace::OutParam => FlowError::UseOfUnassignedOutParam(var.name.clone(), span),
            };
            self.diag.report(error);
            // Report once, then assume assigned to avoid cascading repeats.
            self.flow.vector().set_assigned(&self.vars, info);
        }
    }

    fn check_field_read(&mut self, base: &Expr, name: &str, span: Span) {
        if !base.is_place() {
            self.resolve_expr(base);
            return;
        }
        let Some(base_info) = self.resolve_place(base) else {
            return;
        };
        if !self
            .flow
            .vector()
            .is_field_assigned(&self.vars, base_info, name)
        {
            self.diag
                .report(FlowError::UseOfUnassignedField(name.to_string(), span));
            self.flow
                .vector()
                .set_field_assigned(&self.vars, base_info, name);
        }
    }

    /// Handles the target of an assignment (or an out argument): a bare
    /// variable becomes assigned, a field path marks that field of its
    /// struct, anything else is an ordinary read.
    fn resolve_place_assign(&mut self, place: &Expr) {
        match &place.kind {
            ExprKind::Var(id) => {
                if let Some(Some(info)) = self.defs.get(id) {
                    let info = *info;
                    self.flow.vector().set_assigned(&self.vars, info);
                }
            }
            ExprKind::Field { base, name } => {
                if !base.is_place() {
                    self.resolve_expr(base);
                    return;
                }
                if let Some(base_info) = self.resolve_place(base) {
                    self.flow
                        .vector()
                        .set_field_assigned(&self.vars, base_info, name);
                }
            }
            _ => self.resolve_expr(place),
        }
    }

    /// Descriptor of a tracked variable-or-field path; `None` means the path
    /// is rooted in an untracked variable or crosses an untracked (opaque)
    /// field, in which case no assignment checks apply along it.
    fn resolve_place(&mut self, place: &Expr) -> Option<VarInfoId> {
        match &place.kind {
            ExprKind::Var(id) => self.defs.get(id).copied().flatten(),
            ExprKind::Field { base, name } => {
                let base_info = self.resolve_place(base)?;
                self.vars.field(base_info, name)
            }
            _ => None,
        }
    }
}

/// Collects every label declared by a statement list. A labeled statement's
/// body may itself be labeled, so each chain is walked to its end.
fn collect_labels<'s>(stmts: impl Iterator<Item = &'s Stmt>) -> Vec<(String, Span)> {
    let mut labels = Vec::new();
    for stmt in stmts {
        let mut inner = stmt;
        while let StmtKind::Labeled { label, body } = &inner.kind {
            labels.push((label.clone(), inner.span));
            inner = body;
        }
    }
    labels
}

#[cfg(test)]
#[path = "tests/t_analyze.rs"]
mod tests;

#[cfg(test)]
#[path = "tests/t_goto.rs"]
mod goto_tests;
