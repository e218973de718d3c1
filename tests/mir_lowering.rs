//! Lowering tests: SSA structure, phis, short-circuit control flow.

use machine_dialect::diag::Diagnostics;
use machine_dialect::hir::build_program;
use machine_dialect::mir::{
    lower_program, verify_module, InstKind, MirModule, TermKind,
};
use machine_dialect::parser::Parser;

fn lower(source: &str) -> (MirModule, Diagnostics) {
    let mut parser = Parser::from_source(source);
    let program = parser.parse_program();
    let hir = build_program(&program);
    let mut diagnostics = Diagnostics::new();
    let module = lower_program(&hir, &mut diagnostics);
    verify_module(&module).expect("lowered module must verify");
    (module, diagnostics)
}

fn clean_lower(source: &str) -> MirModule {
    let (module, diagnostics) = lower(source);
    assert!(!diagnostics.has_errors(), "diagnostics: {diagnostics:?}");
    module
}

fn count_instructions<F: Fn(&InstKind) -> bool>(module: &MirModule, pred: F) -> usize {
    module
        .functions
        .iter()
        .flat_map(|function| function.blocks.iter())
        .flat_map(|block| block.instructions.iter())
        .filter(|instruction| pred(&instruction.kind))
        .count()
}

#[test]
fn straight_line_program_is_one_block() {
    let module = clean_lower("Set `x` to _1_ + _2_. Give back `x`.");
    let main = module.main_function();
    let reachable = main.reverse_postorder();
    assert_eq!(reachable.len(), 1);
    assert!(matches!(
        main.block(main.entry).terminator.as_ref().unwrap().kind,
        TermKind::Return(Some(_))
    ));
}

#[test]
fn every_block_has_exactly_one_terminator() {
    let module = clean_lower(concat!(
        "Set `x` to _15_.\n",
        "If `x` is greater than _10_ then:\n",
        "> Set `y` to _\"big\"_.\n",
        "else:\n",
        "> Set `y` to _\"small\"_.\n",
        "Give back `y`.\n",
    ));
    for function in &module.functions {
        for block in &function.blocks {
            assert!(block.terminator.is_some(), "block {} open", block.label);
        }
    }
}

#[test]
fn if_with_divergent_assignment_builds_a_phi() {
    let module = clean_lower(concat!(
        "Set `x` to _15_.\n",
        "If `x` is greater than _10_ then:\n",
        "> Set `y` to _\"big\"_.\n",
        "else:\n",
        "> Set `y` to _\"small\"_.\n",
        "Give back `y`.\n",
    ));
    assert_eq!(
        count_instructions(&module, |kind| matches!(kind, InstKind::Phi { .. })),
        1
    );
}

#[test]
fn variable_written_on_one_arm_merges_with_empty() {
    let module = clean_lower(concat!(
        "Set `flag` to _Yes_.\n",
        "If `flag` then:\n",
        "> Set `y` to _1_.\n",
        "Give back `y`.\n",
    ));
    let has_empty_phi_input = module.functions.iter().any(|function| {
        function.blocks.iter().any(|block| {
            block.instructions.iter().any(|instruction| {
                matches!(
                    &instruction.kind,
                    InstKind::Phi { incoming, .. }
                        if incoming.iter().any(|(_, value)| {
                            matches!(
                                value,
                                machine_dialect::mir::MirValue::Const(
                                    machine_dialect::mir::Constant::Empty
                                )
                            )
                        })
                )
            })
        })
    });
    assert!(has_empty_phi_input);
}

#[test]
fn short_circuit_and_lowers_to_control_flow() {
    let (module, _) = lower("Give back `a` and `b`.");
    // Lowered form: a CondJump plus a phi merging the deciding operand.
    // (`a`/`b` are undefined reads here, which is a diagnostic but not a
    // structural problem.)
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
    assert_eq!(cond_jumps, 1);
    assert_eq!(
        count_instructions(&module, |kind| matches!(kind, InstKind::Phi { .. })),
        1
    );
}

#[test]
fn undefined_variable_read_is_a_semantic_diagnostic() {
    let (_, diagnostics) = lower("Give back `missing`.");
    assert!(diagnostics.has_errors());
    assert!(diagnostics
        .entries()
        .iter()
        .any(|diagnostic| diagnostic.message.contains("undefined variable")));
}

#[test]
fn statements_after_return_lower_without_diagnostics() {
    let (module, diagnostics) = lower("Set `x` to _1_. Give back `x`. Say `x`.");
    assert!(!diagnostics.has_errors(), "diagnostics: {diagnostics:?}");
    verify_module(&module).expect("verifies");
}

#[test]
fn say_lowers_to_print() {
    let module = clean_lower("Say _\"hi\"_.");
    assert_eq!(
        count_instructions(&module, |kind| matches!(kind, InstKind::Print { .. })),
        1
    );
}

#[test]
fn methods_lower_to_functions_with_params() {
    let source = concat!(
        "### **Interaction**: `double`\n",
        "<details>\n",
        "#### Inputs:\n",
        "- `n`\n",
        "Give back `n` * _2_.\n",
        "</details>\n",
        "Give back `double`(_4_).\n",
    );
    let module = clean_lower(source);
    assert_eq!(module.functions.len(), 2);
    let double = &module.functions[1];
    assert_eq!(double.name, "double");
    assert_eq!(double.params.len(), 1);
    // The call site resolves to the function, not a runtime name.
    assert_eq!(
        count_instructions(&module, |kind| matches!(
            kind,
            InstKind::Call {
                callee: machine_dialect::mir::Callee::Function(_),
                ..
            }
        )),
        1
    );
}

#[test]
fn named_arguments_resolve_against_parameter_order() {
    let source = concat!(
        "### **Interaction**: `pair`\n",
        "<details>\n",
        "#### Inputs:\n",
        "- `first`\n",
        "- `second`\n",
        "Give back `first` - `second`.\n",
        "</details>\n",
        "Give back `pair`(second: _1_, first: _10_).\n",
    );
    let module = clean_lower(source);
    let call_args = module
        .functions
        .iter()
        .flat_map(|function| function.blocks.iter())
        .flat_map(|block| block.instructions.iter())
        .find_map(|instruction| match &instruction.kind {
            InstKind::Call { args, .. } => Some(args.clone()),
            _ => None,
        })
        .expect("a call instruction");
    assert_eq!(call_args.len(), 2);
    // `first: 10` lands in slot 0 even though it was written second.
    assert!(matches!(
        call_args[0],
        machine_dialect::mir::MirValue::Const(machine_dialect::mir::Constant::Int(10))
    ));
}

#[test]
fn unknown_named_argument_is_a_diagnostic() {
    let source = concat!(
        "### **Interaction**: `one`\n",
        "<details>\n",
        "#### Inputs:\n",
        "- `n`\n",
        "Give back `n`.\n",
        "</details>\n",
        "Give back `one`(bogus: _1_).\n",
    );
    let (_, diagnostics) = lower(source);
    assert!(diagnostics.has_errors());
}

#[test]
fn calls_to_unknown_names_resolve_at_runtime() {
    let module = clean_lower("Give back `abs`(_-3_).");
    assert_eq!(
        count_instructions(&module, |kind| matches!(
            kind,
            InstKind::Call {
                callee: machine_dialect::mir::Callee::Named(_),
                ..
            }
        )),
        1
    );
}
