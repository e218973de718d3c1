//! HIR tests: canonical operators, ternary orientation, type hints.

use machine_dialect::hir::{
    build_program, CompareOp, HirExprKind, HirProgram, HirStmtKind, LogicalOp, TypeHint,
};
use machine_dialect::parser::Parser;

fn build(source: &str) -> HirProgram {
    let mut parser = Parser::from_source(source);
    let program = parser.parse_program();
    build_program(&program)
}

#[test]
fn give_back_and_gives_back_are_one_node() {
    for source in ["Give back _1_.", "gives back _1_."] {
        let hir = build(source);
        let HirStmtKind::Return { value: Some(value) } = &hir.statements[0].kind else {
            panic!("{source:?} did not build a return");
        };
        assert!(matches!(value.kind, HirExprKind::IntLit(1)), "{source:?}");
    }
}

#[test]
fn comparator_phrases_become_canonical_ops() {
    let hir = build("Give back `x` is not equal to _1_.");
    let HirStmtKind::Return { value: Some(value) } = &hir.statements[0].kind else {
        panic!("expected return");
    };
    let HirExprKind::Compare { op, .. } = &value.kind else {
        panic!("expected comparison, got {:?}", value.kind);
    };
    assert_eq!(*op, CompareOp::NotEq);
}

#[test]
fn ternary_is_reoriented_condition_first() {
    let hir = build("Give back _1_ if `flag` else _2_.");
    let HirStmtKind::Return { value: Some(value) } = &hir.statements[0].kind else {
        panic!("expected return");
    };
    let HirExprKind::If {
        condition,
        consequence,
        alternative,
    } = &value.kind
    else {
        panic!("expected value-if, got {:?}", value.kind);
    };
    assert!(matches!(condition.kind, HirExprKind::Var(_)));
    assert!(matches!(consequence.kind, HirExprKind::IntLit(1)));
    assert!(matches!(alternative.kind, HirExprKind::IntLit(2)));
}

#[test]
fn error_statements_become_nops() {
    let hir = build("Set `x` to . Give back _1_.");
    assert!(matches!(hir.statements[0].kind, HirStmtKind::Nop));
}

#[test]
fn free_standing_blocks_are_spliced() {
    let hir = build("> Set `x` to _1_.\n> Set `y` to _2_.\n");
    assert_eq!(hir.statements.len(), 2);
    assert!(matches!(hir.statements[0].kind, HirStmtKind::Set { .. }));
}

#[test]
fn methods_become_functions() {
    let source = concat!(
        "### **Interaction**: `id`\n",
        "<details>\n",
        "#### Inputs:\n",
        "- `value`\n",
        "Give back `value`.\n",
        "</details>\n",
        "Give back `id`(_7_).\n",
    );
    let hir = build(source);
    assert_eq!(hir.functions.len(), 1);
    assert_eq!(hir.functions[0].name, "id");
    assert_eq!(hir.functions[0].params, vec!["value".to_string()]);
    assert!(hir.functions[0].public);
    assert_eq!(hir.statements.len(), 1);
}

#[test]
fn literal_hints_are_exact() {
    let hir = build("Give back _1_. Give back _1.5_. Give back _Yes_. Give back _\"s\"_. Give back _empty_.");
    let hints: Vec<TypeHint> = hir
        .statements
        .iter()
        .map(|statement| match &statement.kind {
            HirStmtKind::Return { value: Some(value) } => value.hint,
            other => panic!("expected return, got {other:?}"),
        })
        .collect();
    assert_eq!(
        hints,
        vec![
            TypeHint::Int,
            TypeHint::Float,
            TypeHint::Bool,
            TypeHint::Str,
            TypeHint::Empty
        ]
    );
}

#[test]
fn arithmetic_hints_promote() {
    let hir = build("Give back _1_ + _2_. Give back _1_ + _2.5_. Give back _\"a\"_ + _\"b\"_.");
    let hints: Vec<TypeHint> = hir
        .statements
        .iter()
        .map(|statement| match &statement.kind {
            HirStmtKind::Return { value: Some(value) } => value.hint,
            other => panic!("expected return, got {other:?}"),
        })
        .collect();
    assert_eq!(hints, vec![TypeHint::Int, TypeHint::Float, TypeHint::Str]);
}

#[test]
fn comparisons_hint_bool_and_vars_hint_unknown() {
    let hir = build("Give back `x` equals _1_. Give back `x`.");
    let HirStmtKind::Return { value: Some(first) } = &hir.statements[0].kind else {
        panic!("expected return");
    };
    let HirStmtKind::Return { value: Some(second) } = &hir.statements[1].kind else {
        panic!("expected return");
    };
    assert_eq!(first.hint, TypeHint::Bool);
    assert_eq!(second.hint, TypeHint::Unknown);
}

#[test]
fn logical_operators_stay_logical() {
    let hir = build("Give back `a` and `b` or `c`.");
    let HirStmtKind::Return { value: Some(value) } = &hir.statements[0].kind else {
        panic!("expected return");
    };
    let HirExprKind::Logical { op, .. } = &value.kind else {
        panic!("expected logical, got {:?}", value.kind);
    };
    assert_eq!(*op, LogicalOp::Or);
}
