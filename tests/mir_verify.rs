//! Verifier tests: lowered modules pass; hand-broken modules fail.

use machine_dialect::diag::Diagnostics;
use machine_dialect::hir::build_program;
use machine_dialect::mir::{
    lower_program, verify_module, BlockId, Constant, FuncId, InstKind, MirFunction,
    MirInstruction, MirModule, MirValue, TempId, TermKind, Terminator, VerifyError,
};
use machine_dialect::parser::Parser;

fn lowered(source: &str) -> MirModule {
    let mut parser = Parser::from_source(source);
    let program = parser.parse_program();
    let hir = build_program(&program);
    let mut diagnostics = Diagnostics::new();
    lower_program(&hir, &mut diagnostics)
}

fn empty_module(function: MirFunction) -> MirModule {
    MirModule {
        functions: vec![function],
        main: FuncId::new(0),
    }
}

#[test]
fn lowered_programs_verify() {
    let sources = [
        "Give back _1_.",
        "Set `x` to _1_. Give back `x` + _2_.",
        "If _Yes_ then:\n> Say _1_.\nelse:\n> Say _2_.\n",
        "Give back _No_ and (_1_ / _0_ equals _0_).",
        "Set `x` to _1_ if _Yes_ else _2_. Give back `x`.",
    ];
    for source in sources {
        verify_module(&lowered(source)).unwrap_or_else(|error| {
            panic!("source {source:?} failed verification: {error}")
        });
    }
}

#[test]
fn missing_terminator_is_rejected() {
    // Entry block never gets a terminator.
    let function = MirFunction::new("broken", true, 1, 1);
    let result = verify_module(&empty_module(function));
    assert!(matches!(
        result,
        Err(VerifyError::MissingTerminator { .. })
    ));
}

#[test]
fn double_definition_is_rejected() {
    let mut function = MirFunction::new("broken", true, 1, 1);
    let entry = function.entry;
    let temp = function.new_temp();
    function.block_mut(entry).push(MirInstruction::new(
        InstKind::LoadConst {
            dest: temp,
            value: Constant::Int(1),
        },
        1,
        1,
    ));
    function.block_mut(entry).push(MirInstruction::new(
        InstKind::LoadConst {
            dest: temp,
            value: Constant::Int(2),
        },
        1,
        1,
    ));
    function.set_terminator(entry, Terminator::new(TermKind::Return(None), 1, 1));
    let result = verify_module(&empty_module(function));
    assert!(matches!(
        result,
        Err(VerifyError::MultipleDefinitions { .. })
    ));
}

#[test]
fn use_before_definition_is_rejected() {
    let mut function = MirFunction::new("broken", true, 1, 1);
    let entry = function.entry;
    let temp = function.new_temp();
    // Use precedes the definition inside the same block.
    function.block_mut(entry).push(MirInstruction::new(
        InstKind::Print {
            value: MirValue::Temp(temp),
        },
        1,
        1,
    ));
    function.block_mut(entry).push(MirInstruction::new(
        InstKind::LoadConst {
            dest: temp,
            value: Constant::Int(1),
        },
        1,
        1,
    ));
    function.set_terminator(entry, Terminator::new(TermKind::Return(None), 1, 1));
    let result = verify_module(&empty_module(function));
    assert!(matches!(result, Err(VerifyError::UseNotDominated { .. })));
}

#[test]
fn undefined_temp_is_rejected() {
    let mut function = MirFunction::new("broken", true, 1, 1);
    let entry = function.entry;
    function.set_terminator(
        entry,
        Terminator::new(TermKind::Return(Some(MirValue::Temp(TempId::new(9)))), 1, 1),
    );
    let result = verify_module(&empty_module(function));
    assert!(matches!(result, Err(VerifyError::UndefinedTemp { .. })));
}

#[test]
fn phi_predecessor_mismatch_is_rejected() {
    let mut function = MirFunction::new("broken", true, 1, 1);
    let entry = function.entry;
    let other = function.new_block("other");
    let temp = function.new_temp();
    // Phi claims an input from a block that is not a predecessor.
    function.block_mut(entry).push(MirInstruction::new(
        InstKind::Phi {
            dest: temp,
            incoming: vec![(other, MirValue::Const(Constant::Int(1)))],
        },
        1,
        1,
    ));
    function.set_terminator(entry, Terminator::new(TermKind::Return(None), 1, 1));
    function.set_terminator(other, Terminator::new(TermKind::Return(None), 1, 1));
    let result = verify_module(&empty_module(function));
    assert!(matches!(
        result,
        Err(VerifyError::PhiPredecessorMismatch { .. })
    ));
}

#[test]
fn predecessor_lists_must_match_edges() {
    let mut function = MirFunction::new("broken", true, 1, 1);
    let entry = function.entry;
    let target = function.new_block("target");
    function.set_terminator(entry, Terminator::new(TermKind::Jump(target), 1, 1));
    function.set_terminator(target, Terminator::new(TermKind::Return(None), 1, 1));
    // Corrupt the recorded predecessor list.
    function.block_mut(target).predecessors.clear();
    let result = verify_module(&empty_module(function));
    assert!(matches!(
        result,
        Err(VerifyError::PredecessorMismatch { .. })
    ));
}

#[test]
fn blockid_newtypes_are_stable() {
    assert_eq!(BlockId::new(3).value(), 3);
    assert_eq!(TempId::new(7).value(), 7);
}
