use crate::branching::{FlowContext, ScopeKind};
use crate::diag::{Diagnostics, Span};
use crate::errors::FlowError;
use crate::layout::LayoutCache;
use crate::types::{Type, TypeTable};
use crate::vars::{VarInfoId, VarSpace, VarTable, VariableMap};
use crate::vector::SiblingKind;

/// Two scalar locals `a` and `b`, no out parameters.
fn setup() -> (VarTable, VarInfoId, VarInfoId, FlowContext, Diagnostics) {
    let types = TypeTable::new();
    let mut vars = VarTable::new();
    let mut layouts = LayoutCache::new();
    let mut diag = Diagnostics::new();
    let mut map = VariableMap::new(VarSpace::Local);
    let a = map.add(&mut vars, &mut layouts, &types, "a", &Type::Int32, &mut diag);
    let b = map.add(&mut vars, &mut layouts, &types, "b", &Type::Int32, &mut diag);
    let flow = FlowContext::new(map.total_len(), 0);
    (vars, a, b, flow, diag)
}

fn open(flow: &mut FlowContext, kind: ScopeKind, diag: &mut Diagnostics) {
    flow.open(kind, 2, 0, Vec::new(), diag);
}

#[test]
fn test_conditional_both_branches_assign() {
    let (vars, a, _, mut flow, mut diag) = setup();
    open(&mut flow, ScopeKind::Conditional, &mut diag);
    flow.vector().set_assigned(&vars, a);
    flow.create_sibling(SiblingKind::Conditional);
    flow.vector().set_assigned(&vars, a);
    flow.close(&mut diag);
    assert!(flow.vector().is_assigned(&vars, a));
    assert!(diag.is_empty());
}

#[test]
fn test_conditional_one_branch_does_not_assign() {
    let (vars, a, _, mut flow, mut diag) = setup();
    open(&mut flow, ScopeKind::Conditional, &mut diag);
    flow.vector().set_assigned(&vars, a);
    flow.create_sibling(SiblingKind::Conditional);
    flow.close(&mut diag);
    assert!(!flow.vector().is_assigned(&vars, a));
}

#[test]
fn test_sibling_forks_from_inherited_state() {
    let (vars, a, b, mut flow, mut diag) = setup();
    flow.vector().set_assigned(&vars, a);
    open(&mut flow, ScopeKind::Conditional, &mut diag);
    flow.vector().set_assigned(&vars, b);
    flow.create_sibling(SiblingKind::Conditional);
    // The second path starts from the state at the branching point, not from
    // the first path's end.
    assert!(flow.vector().is_assigned(&vars, a));
    assert!(!flow.vector().is_assigned(&vars, b));
}

#[test]
fn test_break_escapes_infinite_loop() {
    let (vars, a, b, mut flow, mut diag) = setup();
    open(&mut flow, ScopeKind::Loop { infinite: true }, &mut diag);
    open(&mut flow, ScopeKind::LoopBody, &mut diag);
    flow.vector().set_assigned(&vars, a);
    flow.add_break(Span::default(), &mut diag);
    assert!(flow.vector().is_unreachable());
    flow.close(&mut diag);
    flow.close(&mut diag);

    // The only way past the loop is the break, which had `a` assigned.
    assert!(!flow.vector().is_unreachable());
    assert!(flow.vector().is_assigned(&vars, a));
    assert!(!flow.vector().is_assigned(&vars, b));
    assert!(diag.is_empty());
}

#[test]
fn test_infinite_loop_without_break_kills_fallthrough() {
    let (_, _, _, mut flow, mut diag) = setup();
    open(&mut flow, ScopeKind::Loop { infinite: true }, &mut diag);
    open(&mut flow, ScopeKind::LoopBody, &mut diag);
    flow.close(&mut diag);
    flow.close(&mut diag);
    assert!(flow.vector().is_unreachable());
}

#[test]
fn test_continue_lands_at_body_end() {
    let (vars, a, _, mut flow, mut diag) = setup();
    open(&mut flow, ScopeKind::Loop { infinite: false }, &mut diag);
    open(&mut flow, ScopeKind::LoopBody, &mut diag);
    flow.vector().set_assigned(&vars, a);
    flow.add_continue(Span::default(), &mut diag);
    assert!(flow.vector().is_unreachable());
    flow.close(&mut diag);
    // Back in the loop scope where the condition is re-evaluated; the
    // continue's state flows here.
    assert!(!flow.vector().is_unreachable());
    assert!(flow.vector().is_assigned(&vars, a));
}

#[test]
fn test_break_outside_loop_reports() {
    let (_, _, _, mut flow, mut diag) = setup();
    flow.add_break(Span::default(), &mut diag);
    let reported = diag.into_vec();
    assert_eq!(reported.len(), 1);
    assert!(matches!(reported[0], FlowError::NoEnclosingLoop(_)));
    // The path stays live; the exit never routed anywhere.
    assert!(!flow.vector().is_unreachable());
}

#[test]
fn test_switch_without_default_keeps_skip_path() {
    let (vars, a, _, mut flow, mut diag) = setup();
    open(&mut flow, ScopeKind::Switch { has_default: false }, &mut diag);
    flow.vector().set_assigned(&vars, a);
    flow.add_break(Span::default(), &mut diag);
    flow.close(&mut diag);
    assert!(!flow.vector().is_assigned(&vars, a));
    assert!(!flow.vector().is_unreachable());
}

#[test]
fn test_switch_with_default_merges_sections_only() {
    let (vars, a, _, mut flow, mut diag) = setup();
    open(&mut flow, ScopeKind::Switch { has_default: true }, &mut diag);
    flow.vector().set_assigned(&vars, a);
    flow.add_break(Span::default(), &mut diag);
    flow.create_sibling(SiblingKind::SwitchSection);
    flow.vector().set_assigned(&vars, a);
    flow.add_break(Span::default(), &mut diag);
    flow.close(&mut diag);
    assert!(flow.vector().is_assigned(&vars, a));
    assert!(!flow.vector().is_unreachable());
}

#[test]
fn test_goto_case_requires_switch() {
    let (_, _, _, mut flow, mut diag) = setup();
    flow.add_goto_case(Span::default(), &mut diag);
    let reported = diag.into_vec();
    assert_eq!(reported.len(), 1);
    assert!(matches!(reported[0], FlowError::GotoCaseNotInSwitch(_)));
}

#[test]
fn test_goto_case_inside_switch_ends_path() {
    let (_, _, _, mut flow, mut diag) = setup();
    open(&mut flow, ScopeKind::Switch { has_default: true }, &mut diag);
    flow.add_goto_case(Span::default(), &mut diag);
    assert!(flow.vector().is_unreachable());
    assert!(diag.is_empty());
}

#[test]
fn test_return_obligations_checked_per_return_site() {
    let types = TypeTable::new();
    let mut vars = VarTable::new();
    let mut layouts = LayoutCache::new();
    let mut diag = Diagnostics::new();
    let mut map = VariableMap::new(VarSpace::OutParam);
    let result = map.add(&mut vars, &mut layouts, &types, "result", &Type::Int32, &mut diag);

    let mut flow = FlowContext::new(0, map.total_len());
    flow.add_return(Span::at(2, 1), &mut diag);
    let always_returns = flow.close_toplevel(&[result], &vars, Span::at(9, 1), &mut diag);

    assert!(always_returns);
    let reported = diag.into_vec();
    assert_eq!(reported.len(), 1);
    match &reported[0] {
        FlowError::OutParamNotAssigned(name, span) => {
            assert_eq!(name, "result");
            assert_eq!(span.start.line, 2);
        }
        e => panic!("Expected OutParamNotAssigned error, got {:?}", e),
    }
}

#[test]
fn test_out_param_checked_at_fallthrough() {
    let types = TypeTable::new();
    let mut vars = VarTable::new();
    let mut layouts = LayoutCache::new();
    let mut diag = Diagnostics::new();
    let mut map = VariableMap::new(VarSpace::OutParam);
    let result = map.add(&mut vars, &mut layouts, &types, "result", &Type::Int32, &mut diag);

    let mut flow = FlowContext::new(0, map.total_len());
    let always_returns = flow.close_toplevel(&[result], &vars, Span::at(9, 1), &mut diag);
    assert!(!always_returns);
    let reported = diag.into_vec();
    assert_eq!(reported.len(), 1);
    match &reported[0] {
        FlowError::OutParamNotAssigned(_, span) => assert_eq!(span.start.line, 9),
        e => panic!("Expected OutParamNotAssigned error, got {:?}", e),
    }
}

#[test]
fn test_out_param_assigned_everywhere_is_clean() {
    let types = TypeTable::new();
    let mut vars = VarTable::new();
    let mut layouts = LayoutCache::new();
    let mut diag = Diagnostics::new();
    let mut map = VariableMap::new(VarSpace::OutParam);
    let result = map.add(&mut vars, &mut layouts, &types, "result", &Type::Int32, &mut diag);

    let mut flow = FlowContext::new(0, map.total_len());
    flow.vector().set_assigned(&vars, result);
    flow.add_return(Span::default(), &mut diag);
    let always_returns = flow.close_toplevel(&[result], &vars, Span::default(), &mut diag);
    assert!(always_returns);
    assert!(diag.is_empty());
}

#[test]
fn test_finally_assignments_reach_parked_break() {
    let (vars, a, b, mut flow, mut diag) = setup();
    open(&mut flow, ScopeKind::Loop { infinite: true }, &mut diag);
    open(&mut flow, ScopeKind::LoopBody, &mut diag);
    open(&mut flow, ScopeKind::Exception, &mut diag);
    // The break crosses the try/finally grouping and waits for the finally.
    flow.add_break(Span::default(), &mut diag);
    flow.begin_finally();
    flow.vector().set_assigned(&vars, a);
    flow.end_finally();
    flow.close(&mut diag);
    flow.close(&mut diag);
    flow.close(&mut diag);

    assert!(!flow.vector().is_unreachable());
    assert!(flow.vector().is_assigned(&vars, a), "finally ran before the break landed");
    assert!(!flow.vector().is_assigned(&vars, b));
    assert!(diag.is_empty());
}

#[test]
fn test_dead_finally_kills_fallthrough() {
    let (_, _, _, mut flow, mut diag) = setup();
    open(&mut flow, ScopeKind::Exception, &mut diag);
    flow.begin_finally();
    flow.vector().goto_unreachable();
    flow.end_finally();
    flow.close(&mut diag);
    assert!(flow.vector().is_unreachable());
}

#[test]
fn test_leaving_finally_reports() {
    let (_, _, _, mut flow, mut diag) = setup();
    open(&mut flow, ScopeKind::Loop { infinite: false }, &mut diag);
    open(&mut flow, ScopeKind::LoopBody, &mut diag);
    open(&mut flow, ScopeKind::Exception, &mut diag);
    flow.begin_finally();
    flow.add_break(Span::default(), &mut diag);
    let reported = diag.into_vec();
    assert_eq!(reported.len(), 1);
    assert!(matches!(reported[0], FlowError::LeaveFinallyClause(_)));
}

#[test]
fn test_forward_goto_merges_at_label() {
    let (vars, a, _, mut flow, mut diag) = setup();
    flow.open(
        ScopeKind::Block { implicit: false },
        2,
        0,
        vec![("done".to_string(), Span::default())],
        &mut diag,
    );
    flow.vector().set_assigned(&vars, a);
    flow.add_goto("done", Span::default(), &mut diag);
    assert!(flow.vector().is_unreachable());
    flow.resolve_label("done");
    assert!(!flow.vector().is_unreachable());
    assert!(flow.vector().is_assigned(&vars, a));
    assert!(diag.is_empty());
}

#[test]
fn test_goto_unknown_label_reports() {
    let (_, _, _, mut flow, mut diag) = setup();
    flow.add_goto("missing", Span::default(), &mut diag);
    let reported = diag.into_vec();
    assert_eq!(reported.len(), 1);
    match &reported[0] {
        FlowError::NoSuchLabel(name, _) => assert_eq!(name, "missing"),
        e => panic!("Expected NoSuchLabel error, got {:?}", e),
    }
    assert!(!flow.vector().is_unreachable());
}

#[test]
fn test_duplicate_label_reports() {
    let (_, _, _, mut flow, mut diag) = setup();
    flow.open(
        ScopeKind::Block { implicit: false },
        2,
        0,
        vec![("l".to_string(), Span::default())],
        &mut diag,
    );
    flow.open(
        ScopeKind::Block { implicit: false },
        2,
        0,
        vec![("l".to_string(), Span::default())],
        &mut diag,
    );
    let reported = diag.into_vec();
    assert_eq!(reported.len(), 1);
    assert!(matches!(&reported[0], FlowError::DuplicateLabel(name, _) if name == "l"));
}

#[test]
fn test_labeled_scope_overwrites_reachability() {
    let (_, _, _, mut flow, mut diag) = setup();
    open(&mut flow, ScopeKind::Labeled, &mut diag);
    flow.vector().goto_unreachable();
    flow.close(&mut diag);
    assert!(flow.vector().is_unreachable());
}
