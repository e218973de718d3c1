//! Constant folding and propagation over MIR.
//!
//! Folding evaluates `UnaryOp`/`BinaryOp`/`Compare` through the same
//! operator semantics the VM executes (`vm::ops`), so an optimised
//! program cannot diverge from an unoptimised one. Operations that would
//! raise at runtime (division by zero, type mismatches) are left in
//! place. The pass is a fixpoint: a second application changes nothing.

use std::collections::HashMap;

use crate::hir::{BinaryOp, CompareOp, UnaryOp};
use crate::mir::{Constant, InstKind, MirFunction, MirModule, MirValue, TempId, TermKind};
use crate::vm::{ops, Value};

/// Runs the pass over every function; returns whether anything changed.
pub fn constant_fold(module: &mut MirModule) -> bool {
    let mut changed = false;
    for function in &mut module.functions {
        changed |= fold_function(function);
    }
    changed
}

fn fold_function(function: &mut MirFunction) -> bool {
    let mut changed = false;
    loop {
        let mut round_changed = false;

        // Temps with known constant definitions.
        let mut known: HashMap<TempId, Constant> = HashMap::new();
        for block in &function.blocks {
            for instruction in &block.instructions {
                if let InstKind::LoadConst { dest, value } = &instruction.kind {
                    known.insert(*dest, value.clone());
                }
            }
        }

        // Propagate known constants into operand positions.
        let substitute = |value: &mut MirValue, changed: &mut bool| {
            let replacement = match &*value {
                MirValue::Temp(temp) => known.get(temp).cloned(),
                _ => None,
            };
            if let Some(constant) = replacement {
                *value = MirValue::Const(constant);
                *changed = true;
            }
        };
        for block in &mut function.blocks {
            for instruction in &mut block.instructions {
                let mut touched = false;
                instruction.kind.map_uses(|value| substitute(value, &mut touched));
                round_changed |= touched;
            }
            if let Some(terminator) = &mut block.terminator {
                match &mut terminator.kind {
                    TermKind::CondJump { cond, .. } => {
                        substitute(cond, &mut round_changed);
                    }
                    TermKind::Return(Some(value)) => {
                        substitute(value, &mut round_changed);
                    }
                    _ => {}
                }
            }
        }

        // Fold operations whose operands are all constants.
        for block in &mut function.blocks {
            for instruction in &mut block.instructions {
                let folded = match &instruction.kind {
                    InstKind::UnaryOp { dest, op, operand } => operand
                        .as_const()
                        .and_then(|constant| eval_unary(*op, constant))
                        .map(|value| (*dest, value)),
                    InstKind::BinaryOp {
                        dest,
                        op,
                        left,
                        right,
                    } => match (left.as_const(), right.as_const()) {
                        (Some(l), Some(r)) => {
                            eval_binary(*op, l, r).map(|value| (*dest, value))
                        }
                        _ => None,
                    },
                    InstKind::Compare {
                        dest,
                        op,
                        left,
                        right,
                    } => match (left.as_const(), right.as_const()) {
                        (Some(l), Some(r)) => {
                            eval_compare(*op, l, r).map(|value| (*dest, value))
                        }
                        _ => None,
                    },
                    _ => None,
                };
                if let Some((dest, value)) = folded {
                    instruction.kind = InstKind::LoadConst { dest, value };
                    round_changed = true;
                }
            }
        }

        changed |= round_changed;
        if !round_changed {
            return changed;
        }
    }
}

fn eval_unary(op: UnaryOp, operand: &Constant) -> Option<Constant> {
    ops::unary(op, &Value::from_constant(operand))
        .ok()?
        .to_constant()
}

fn eval_binary(op: BinaryOp, left: &Constant, right: &Constant) -> Option<Constant> {
    ops::binary(op, &Value::from_constant(left), &Value::from_constant(right))
        .ok()?
        .to_constant()
}

fn eval_compare(op: CompareOp, left: &Constant, right: &Constant) -> Option<Constant> {
    ops::compare(op, &Value::from_constant(left), &Value::from_constant(right))
        .ok()?
        .to_constant()
}
