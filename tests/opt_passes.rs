//! Optimisation tests: folding, propagation, DCE, branch simplification.

use machine_dialect::diag::Diagnostics;
use machine_dialect::hir::build_program;
use machine_dialect::mir::{
    lower_program, verify_module, Constant, InstKind, MirModule, MirValue, TermKind,
};
use machine_dialect::opt::{constant_fold, eliminate_dead_code, optimize, OptLevel};
use machine_dialect::parser::Parser;

fn lowered(source: &str) -> MirModule {
    let mut parser = Parser::from_source(source);
    let program = parser.parse_program();
    let hir = build_program(&program);
    let mut diagnostics = Diagnostics::new();
    let module = lower_program(&hir, &mut diagnostics);
    assert!(!diagnostics.has_errors(), "diagnostics: {diagnostics:?}");
    module
}

fn count<F: Fn(&InstKind) -> bool>(module: &MirModule, pred: F) -> usize {
    module
        .functions
        .iter()
        .flat_map(|function| function.blocks.iter())
        .flat_map(|block| block.instructions.iter())
        .filter(|instruction| pred(&instruction.kind))
        .count()
}

#[test]
fn arithmetic_folds_to_a_constant_return() {
    let mut module = lowered("Give back _2_ + _3_ * _4_.");
    assert!(constant_fold(&mut module));
    verify_module(&module).expect("verifies after folding");
    let main = module.main_function();
    let terminator = main.block(main.entry).terminator.as_ref().unwrap();
    assert!(matches!(
        &terminator.kind,
        TermKind::Return(Some(MirValue::Const(Constant::Int(14))))
    ));
}

#[test]
fn folding_is_a_fixpoint() {
    let mut module = lowered("Give back (_2_ + _3_) * (_4_ - _1_).");
    constant_fold(&mut module);
    let snapshot = module.clone();
    assert!(!constant_fold(&mut module), "second application changed MIR");
    assert_eq!(module, snapshot);
}

#[test]
fn division_by_zero_is_left_for_runtime() {
    let mut module = lowered("Give back _1_ / _0_.");
    constant_fold(&mut module);
    assert_eq!(
        count(&module, |kind| matches!(kind, InstKind::BinaryOp { .. })),
        1,
        "the faulting division must survive folding"
    );
}

#[test]
fn mixed_numeric_comparison_folds() {
    let mut module = lowered("Give back _5_ equals _5.0_.");
    constant_fold(&mut module);
    let main = module.main_function();
    let terminator = main.block(main.entry).terminator.as_ref().unwrap();
    assert!(matches!(
        &terminator.kind,
        TermKind::Return(Some(MirValue::Const(Constant::Bool(true))))
    ));
}

#[test]
fn strict_comparison_folds_false_across_types() {
    let mut module = lowered("Give back _5_ is strictly equal to _5.0_.");
    constant_fold(&mut module);
    let main = module.main_function();
    let terminator = main.block(main.entry).terminator.as_ref().unwrap();
    assert!(matches!(
        &terminator.kind,
        TermKind::Return(Some(MirValue::Const(Constant::Bool(false))))
    ));
}

#[test]
fn integer_overflow_folds_with_wrapping() {
    let mut module = lowered("Give back _9223372036854775807_ + _1_.");
    constant_fold(&mut module);
    let main = module.main_function();
    let terminator = main.block(main.entry).terminator.as_ref().unwrap();
    assert!(matches!(
        &terminator.kind,
        TermKind::Return(Some(MirValue::Const(Constant::Int(i64::MIN))))
    ));
}

#[test]
fn dce_removes_unused_pure_results() {
    let mut module = lowered("Set `x` to _1_ + _2_. Give back _9_.");
    constant_fold(&mut module);
    assert!(eliminate_dead_code(&mut module));
    verify_module(&module).expect("verifies after DCE");
    assert_eq!(
        count(&module, |kind| matches!(kind, InstKind::BinaryOp { .. })),
        0
    );
    // The store itself is an observable effect and must survive.
    assert_eq!(
        count(&module, |kind| matches!(kind, InstKind::StoreVar { .. })),
        1
    );
}

#[test]
fn dce_keeps_calls_and_prints() {
    let mut module = lowered("Say _\"hi\"_. Call `print` with _1_. Give back _1_.");
    eliminate_dead_code(&mut module);
    assert_eq!(
        count(&module, |kind| matches!(kind, InstKind::Print { .. })),
        1
    );
    assert_eq!(
        count(&module, |kind| matches!(kind, InstKind::Call { .. })),
        1
    );
}

#[test]
fn constant_branch_is_simplified_and_dead_arm_removed() {
    let mut module = lowered(concat!(
        "If _Yes_ then:\n",
        "> Say _\"taken\"_.\n",
        "else:\n",
        "> Say _\"dead\"_.\n",
        "Give back _1_.\n",
    ));
    optimize(&mut module, OptLevel::Aggressive);
    verify_module(&module).expect("verifies after aggressive opt");
    // Only the taken arm's print survives.
    assert_eq!(
        count(&module, |kind| matches!(kind, InstKind::Print { .. })),
        1
    );
    let main = module.main_function();
    let cond_jumps = main
        .blocks
        .iter()
        .filter(|block| {
            matches!(
                block.terminator.as_ref().map(|terminator| &terminator.kind),
                Some(TermKind::CondJump { .. })
            )
        })
        .count();
    assert_eq!(cond_jumps, 0);
}

#[test]
fn short_circuit_guard_survives_aggressive_opt() {
    let mut module = lowered("Give back _No_ and (_1_ / _0_ equals _0_).");
    optimize(&mut module, OptLevel::Aggressive);
    verify_module(&module).expect("verifies");
    // The guarded division is unreachable and must be gone entirely.
    assert_eq!(
        count(&module, |kind| matches!(kind, InstKind::BinaryOp { .. })),
        0
    );
}

#[test]
fn opt_level_none_rewrites_nothing() {
    let mut module = lowered("Give back _2_ + _3_.");
    let snapshot = module.clone();
    optimize(&mut module, OptLevel::None);
    assert_eq!(module, snapshot);
}

#[test]
fn opt_level_maps_from_cli_values() {
    assert_eq!(OptLevel::from_cli(0), OptLevel::None);
    assert_eq!(OptLevel::from_cli(1), OptLevel::Basic);
    assert_eq!(OptLevel::from_cli(2), OptLevel::Aggressive);
    assert_eq!(OptLevel::from_cli(3), OptLevel::Aggressive);
}
