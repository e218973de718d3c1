//! Bytecode-level peephole rewriting over the symbolic stream.
//!
//! Three patterns, applied to a fixpoint before jump offsets exist:
//! a pushed value that is immediately popped, a jump whose target is the
//! next instruction, and a conditional jump on a constant condition.
//! Labels are join points, so no pattern may reach across one.

use crate::bytecode::{BytecodeModule, Opcode, PoolConstant};
use crate::codegen::{AsmItem, AsmOperand};

/// Rewrites `items` in place until no pattern applies.
pub(crate) fn run(items: &mut Vec<AsmItem>, module: &BytecodeModule) {
    loop {
        let mut changed = false;
        changed |= drop_push_pop(items);
        changed |= drop_jump_to_next(items);
        changed |= fold_constant_condition(items, module);
        if !changed {
            break;
        }
    }
}

/// Returns `true` for opcodes that push exactly one value and cannot
/// fail or have side effects (`LoadGlobal` can fail, so it stays).
fn pure_push(op: Opcode) -> bool {
    matches!(
        op,
        Opcode::LoadConst
            | Opcode::LoadLocal
            | Opcode::LoadTrue
            | Opcode::LoadFalse
            | Opcode::LoadEmpty
            | Opcode::LoadUrl
            | Opcode::LoadFunction
    )
}

fn drop_push_pop(items: &mut Vec<AsmItem>) -> bool {
    let mut changed = false;
    let mut index = 0;
    while index + 1 < items.len() {
        let (AsmItem::Inst(first), AsmItem::Inst(second)) = (&items[index], &items[index + 1])
        else {
            index += 1;
            continue;
        };
        if pure_push(first.op) && second.op == Opcode::Pop {
            items.drain(index..index + 2);
            changed = true;
            index = index.saturating_sub(1);
        } else {
            index += 1;
        }
    }
    changed
}

fn drop_jump_to_next(items: &mut Vec<AsmItem>) -> bool {
    let mut changed = false;
    let mut index = 0;
    while index < items.len() {
        let AsmItem::Inst(inst) = &items[index] else {
            index += 1;
            continue;
        };
        if inst.op != Opcode::Jump {
            index += 1;
            continue;
        }
        let AsmOperand::Target(target) = inst.operand else {
            index += 1;
            continue;
        };
        // The jump is redundant when only labels separate it from its
        // target label.
        let mut lookahead = index + 1;
        let mut falls_through = false;
        while let Some(AsmItem::Label(label)) = items.get(lookahead) {
            if *label == target {
                falls_through = true;
                break;
            }
            lookahead += 1;
        }
        if falls_through {
            items.remove(index);
            changed = true;
        } else {
            index += 1;
        }
    }
    changed
}

fn fold_constant_condition(items: &mut Vec<AsmItem>, module: &BytecodeModule) -> bool {
    let mut changed = false;
    let mut index = 0;
    while index + 1 < items.len() {
        let (AsmItem::Inst(first), AsmItem::Inst(second)) = (&items[index], &items[index + 1])
        else {
            index += 1;
            continue;
        };
        if second.op != Opcode::JumpIfFalse {
            index += 1;
            continue;
        }
        let (target, line, column) = (second.operand, second.line, second.column);
        let truthiness = match first.op {
            Opcode::LoadTrue => Some(true),
            Opcode::LoadFalse => Some(false),
            Opcode::LoadEmpty => Some(false),
            Opcode::LoadConst => match first.operand {
                AsmOperand::U16(constant) => constant_truthiness(module, constant),
                _ => None,
            },
            _ => None,
        };
        let Some(truthy) = truthiness else {
            index += 1;
            continue;
        };
        if truthy {
            // The branch never fires; drop both instructions.
            items.drain(index..index + 2);
        } else {
            // The branch always fires; keep one unconditional jump.
            items.drain(index..index + 2);
            items.insert(
                index,
                AsmItem::Inst(super::AsmInst {
                    op: Opcode::Jump,
                    operand: target,
                    line,
                    column,
                }),
            );
        }
        changed = true;
    }
    changed
}

fn constant_truthiness(module: &BytecodeModule, index: u16) -> Option<bool> {
    let constant = module.constants.get(index as usize)?;
    let truthy = match constant {
        PoolConstant::Empty => false,
        PoolConstant::Int(value) => *value != 0,
        PoolConstant::Float(value) => *value != 0.0,
        PoolConstant::Str(string) => !module.strings.get(*string)?.is_empty(),
        PoolConstant::Function(_) => true,
    };
    Some(truthy)
}
