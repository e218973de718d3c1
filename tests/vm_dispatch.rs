//! Dispatch-loop tests over hand-assembled modules.

use machine_dialect::bytecode::{
    BytecodeModule, Chunk, GlobalSymbol, Opcode, PoolConstant,
};
use machine_dialect::vm::{Value, Vm, VmErrorKind, VmOptions};

enum Op {
    Plain(Opcode),
    U8(Opcode, u8),
    U16(Opcode, u16),
    I16(Opcode, i16),
}

fn assemble(ops: &[Op]) -> Vec<u8> {
    let mut code = Vec::new();
    for op in ops {
        match op {
            Op::Plain(opcode) => code.push(*opcode as u8),
            Op::U8(opcode, value) => {
                code.push(*opcode as u8);
                code.push(*value);
            }
            Op::U16(opcode, value) => {
                code.push(*opcode as u8);
                code.extend_from_slice(&value.to_le_bytes());
            }
            Op::I16(opcode, value) => {
                code.push(*opcode as u8);
                code.extend_from_slice(&value.to_le_bytes());
            }
        }
    }
    code
}

fn module_with_main(constants: Vec<PoolConstant>, locals: u16, ops: &[Op]) -> BytecodeModule {
    let mut module = BytecodeModule::new("test");
    module.constants = constants;
    module.main = Chunk {
        arity: 0,
        locals,
        code: assemble(ops),
        line_info: Vec::new(),
    };
    module
}

#[test]
fn arithmetic_executes_on_the_stack() {
    let module = module_with_main(
        vec![PoolConstant::Int(2), PoolConstant::Int(3), PoolConstant::Int(4)],
        0,
        &[
            Op::U16(Opcode::LoadConst, 0),
            Op::U16(Opcode::LoadConst, 1),
            Op::U16(Opcode::LoadConst, 2),
            Op::Plain(Opcode::Mul),
            Op::Plain(Opcode::Add),
            Op::Plain(Opcode::Return),
        ],
    );
    let mut vm = Vm::new(module);
    assert_eq!(vm.run().unwrap(), Value::Int(14));
}

#[test]
fn locals_store_and_load() {
    let module = module_with_main(
        vec![PoolConstant::Int(41)],
        1,
        &[
            Op::U16(Opcode::LoadConst, 0),
            Op::U16(Opcode::StoreLocal, 0),
            Op::U16(Opcode::LoadLocal, 0),
            Op::U16(Opcode::LoadLocal, 0),
            Op::Plain(Opcode::Swap),
            Op::Plain(Opcode::Pop),
            Op::Plain(Opcode::Return),
        ],
    );
    let mut vm = Vm::new(module);
    assert_eq!(vm.run().unwrap(), Value::Int(41));
}

#[test]
fn jump_skips_and_jump_if_false_branches() {
    // Returns 1 when true, 2 otherwise; condition is false here.
    let module = module_with_main(
        vec![PoolConstant::Int(1), PoolConstant::Int(2)],
        0,
        &[
            Op::Plain(Opcode::LoadFalse),
            Op::I16(Opcode::JumpIfFalse, 4), // skip the then-arm
            Op::U16(Opcode::LoadConst, 0),
            Op::Plain(Opcode::Return),
            Op::U16(Opcode::LoadConst, 1),
            Op::Plain(Opcode::Return),
        ],
    );
    let mut vm = Vm::new(module);
    assert_eq!(vm.run().unwrap(), Value::Int(2));
}

#[test]
fn halt_yields_stack_top_and_empty_when_bare() {
    let module = module_with_main(
        vec![PoolConstant::Int(9)],
        0,
        &[Op::U16(Opcode::LoadConst, 0), Op::Plain(Opcode::Halt)],
    );
    let mut vm = Vm::new(module);
    assert_eq!(vm.run().unwrap(), Value::Int(9));

    let module = module_with_main(vec![], 0, &[Op::Plain(Opcode::Halt)]);
    let mut vm = Vm::new(module);
    assert_eq!(vm.run().unwrap(), Value::Empty);
}

#[test]
fn running_off_the_end_returns_stack_top() {
    let module = module_with_main(
        vec![PoolConstant::Int(5)],
        0,
        &[Op::U16(Opcode::LoadConst, 0)],
    );
    let mut vm = Vm::new(module);
    assert_eq!(vm.run().unwrap(), Value::Int(5));
}

#[test]
fn function_calls_pass_arguments_into_slots() {
    // main: LoadFunction 0; LoadConst 20; LoadConst 22; Call 2; Return
    // fn:   slots[0] + slots[1]; Return
    let mut module = module_with_main(
        vec![PoolConstant::Int(20), PoolConstant::Int(22)],
        0,
        &[
            Op::U16(Opcode::LoadFunction, 0),
            Op::U16(Opcode::LoadConst, 0),
            Op::U16(Opcode::LoadConst, 1),
            Op::U8(Opcode::Call, 2),
            Op::Plain(Opcode::Return),
        ],
    );
    module.functions.push(Chunk {
        arity: 2,
        locals: 2,
        code: assemble(&[
            Op::U16(Opcode::LoadLocal, 0),
            Op::U16(Opcode::LoadLocal, 1),
            Op::Plain(Opcode::Add),
            Op::Plain(Opcode::Return),
        ]),
        line_info: Vec::new(),
    });
    let mut vm = Vm::new(module);
    assert_eq!(vm.run().unwrap(), Value::Int(42));
}

#[test]
fn wrong_arity_raises() {
    let mut module = module_with_main(
        vec![PoolConstant::Int(1)],
        0,
        &[
            Op::U16(Opcode::LoadFunction, 0),
            Op::U16(Opcode::LoadConst, 0),
            Op::U8(Opcode::Call, 1),
            Op::Plain(Opcode::Return),
        ],
    );
    module.functions.push(Chunk {
        arity: 2,
        locals: 2,
        code: assemble(&[Op::Plain(Opcode::Return)]),
        line_info: Vec::new(),
    });
    let mut vm = Vm::new(module);
    let error = vm.run().unwrap_err();
    assert_eq!(error.kind, VmErrorKind::WrongArity);
}

#[test]
fn calling_a_non_function_raises() {
    let module = module_with_main(
        vec![PoolConstant::Int(7)],
        0,
        &[
            Op::U16(Opcode::LoadConst, 0),
            Op::U8(Opcode::Call, 0),
            Op::Plain(Opcode::Return),
        ],
    );
    let mut vm = Vm::new(module);
    let error = vm.run().unwrap_err();
    assert_eq!(error.kind, VmErrorKind::NotCallable);
}

#[test]
fn frame_depth_limit_raises_stack_overflow() {
    // fn 0 calls itself forever.
    let mut module = module_with_main(
        vec![],
        0,
        &[
            Op::U16(Opcode::LoadFunction, 0),
            Op::U8(Opcode::Call, 0),
            Op::Plain(Opcode::Return),
        ],
    );
    module.functions.push(Chunk {
        arity: 0,
        locals: 0,
        code: assemble(&[
            Op::U16(Opcode::LoadFunction, 0),
            Op::U8(Opcode::Call, 0),
            Op::Plain(Opcode::Return),
        ]),
        line_info: Vec::new(),
    });
    let mut vm = Vm::with_options(
        module,
        VmOptions {
            max_frames: 64,
            step_limit: None,
        },
    );
    let error = vm.run().unwrap_err();
    assert_eq!(error.kind, VmErrorKind::StackOverflow);
}

#[test]
fn step_limit_stops_infinite_loops() {
    let module = module_with_main(
        vec![],
        0,
        &[Op::I16(Opcode::Jump, -3)],
    );
    let mut vm = Vm::with_options(
        module,
        VmOptions {
            max_frames: 8,
            step_limit: Some(1000),
        },
    );
    let error = vm.run().unwrap_err();
    assert_eq!(error.kind, VmErrorKind::StepLimitExceeded);
}

#[test]
fn unknown_global_raises_unknown_name() {
    let mut module = module_with_main(vec![], 0, &[]);
    let name = module.strings.intern("missing");
    module.constants.push(PoolConstant::Str(name));
    module.main.code = assemble(&[
        Op::U16(Opcode::LoadGlobal, 0),
        Op::Plain(Opcode::Return),
    ]);
    let mut vm = Vm::new(module);
    let error = vm.run().unwrap_err();
    assert!(matches!(error.kind, VmErrorKind::UnknownName(_)));
}

#[test]
fn builtins_resolve_through_globals() {
    let mut module = module_with_main(vec![], 0, &[]);
    let name = module.strings.intern("abs");
    module.constants.push(PoolConstant::Str(name));
    module.constants.push(PoolConstant::Int(-5));
    module.main.code = assemble(&[
        Op::U16(Opcode::LoadGlobal, 0),
        Op::U16(Opcode::LoadConst, 1),
        Op::U8(Opcode::Call, 1),
        Op::Plain(Opcode::Return),
    ]);
    let mut vm = Vm::new(module);
    assert_eq!(vm.run().unwrap(), Value::Int(5));
}

#[test]
fn module_globals_are_installed_before_execution() {
    let mut module = module_with_main(vec![], 0, &[]);
    let name = module.strings.intern("answer");
    module.constants.push(PoolConstant::Str(name));
    module.constants.push(PoolConstant::Int(42));
    module.globals.push(GlobalSymbol { name, constant: 1 });
    module.main.code = assemble(&[
        Op::U16(Opcode::LoadGlobal, 0),
        Op::Plain(Opcode::Return),
    ]);
    let mut vm = Vm::new(module);
    assert_eq!(vm.run().unwrap(), Value::Int(42));
}

#[test]
fn store_global_updates_the_map() {
    let mut module = module_with_main(vec![], 0, &[]);
    let name = module.strings.intern("counter");
    module.constants.push(PoolConstant::Str(name));
    module.constants.push(PoolConstant::Int(7));
    module.main.code = assemble(&[
        Op::U16(Opcode::LoadConst, 1),
        Op::U16(Opcode::StoreGlobal, 0),
        Op::U16(Opcode::LoadGlobal, 0),
        Op::Plain(Opcode::Return),
    ]);
    let mut vm = Vm::new(module);
    assert_eq!(vm.run().unwrap(), Value::Int(7));
}

#[test]
fn print_goes_to_the_captured_sink() {
    let mut module = module_with_main(vec![], 0, &[]);
    let text = module.strings.intern("out!");
    module.constants.push(PoolConstant::Str(text));
    module.main.code = assemble(&[
        Op::U16(Opcode::LoadConst, 0),
        Op::Plain(Opcode::Print),
        Op::Plain(Opcode::Halt),
    ]);
    let mut vm = Vm::new(module);
    vm.capture_output();
    assert_eq!(vm.run().unwrap(), Value::Empty);
    assert_eq!(vm.captured_output(), ["out!"]);
}

#[test]
fn division_by_zero_carries_position_from_line_info() {
    let mut module = module_with_main(
        vec![PoolConstant::Int(1), PoolConstant::Int(0)],
        0,
        &[
            Op::U16(Opcode::LoadConst, 0),
            Op::U16(Opcode::LoadConst, 1),
            Op::Plain(Opcode::Div),
            Op::Plain(Opcode::Return),
        ],
    );
    module.main.push_line_info(module.main.code.len(), 3, 9);
    let mut vm = Vm::new(module);
    let error = vm.run().unwrap_err();
    assert_eq!(error.kind, VmErrorKind::DivisionByZero);
    assert_eq!(error.line, Some(3));
    assert_eq!(error.column, Some(9));
    assert_eq!(error.call_chain, vec!["main".to_string()]);
}

#[test]
fn invalid_opcode_is_reported() {
    let mut module = module_with_main(vec![], 0, &[]);
    module.main.code = vec![0xEE];
    let mut vm = Vm::new(module);
    let error = vm.run().unwrap_err();
    assert_eq!(error.kind, VmErrorKind::InvalidInstruction);
}

#[test]
fn nop_and_dup_behave() {
    let module = module_with_main(
        vec![PoolConstant::Int(6)],
        0,
        &[
            Op::U16(Opcode::LoadConst, 0),
            Op::Plain(Opcode::Nop),
            Op::Plain(Opcode::Dup),
            Op::Plain(Opcode::Add),
            Op::Plain(Opcode::Return),
        ],
    );
    let mut vm = Vm::new(module);
    assert_eq!(vm.run().unwrap(), Value::Int(12));
}
