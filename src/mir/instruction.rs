//! Typed MIR instruction and terminator contracts.

use std::fmt;

use crate::hir::{BinaryOp, CompareOp, UnaryOp};
use crate::mir::ids::{BlockId, FuncId, LocalId, TempId};
use crate::mir::value::{Constant, MirValue};

/// Call target reference.
#[derive(Debug, Clone, PartialEq)]
pub enum Callee {
    /// A function defined in this module.
    Function(FuncId),
    /// A name resolved at runtime (builtins, unknown targets).
    Named(String),
}

/// Non-terminator MIR instruction payloads.
#[derive(Debug, Clone, PartialEq)]
pub enum InstKind {
    /// `dest = constant`
    LoadConst {
        /// Destination temp.
        dest: TempId,
        /// Loaded constant.
        value: Constant,
    },
    /// `dest = local`
    LoadVar {
        /// Destination temp.
        dest: TempId,
        /// Source local.
        var: LocalId,
    },
    /// `local = value`
    StoreVar {
        /// Destination local.
        var: LocalId,
        /// Stored value.
        value: MirValue,
    },
    /// `dest = op operand`
    UnaryOp {
        /// Destination temp.
        dest: TempId,
        /// Operator.
        op: UnaryOp,
        /// Operand.
        operand: MirValue,
    },
    /// `dest = left op right`
    BinaryOp {
        /// Destination temp.
        dest: TempId,
        /// Operator.
        op: BinaryOp,
        /// Left operand.
        left: MirValue,
        /// Right operand.
        right: MirValue,
    },
    /// `dest = left cmp right`
    Compare {
        /// Destination temp.
        dest: TempId,
        /// Comparison operator.
        op: CompareOp,
        /// Left operand.
        left: MirValue,
        /// Right operand.
        right: MirValue,
    },
    /// `dest = call callee(args…)`
    Call {
        /// Optional destination temp.
        dest: Option<TempId>,
        /// Call target.
        callee: Callee,
        /// Evaluated arguments in call order.
        args: Vec<MirValue>,
    },
    /// Writes the value to the output stream.
    Print {
        /// Printed value.
        value: MirValue,
    },
    /// SSA join: `dest = φ((block, value)…)`
    Phi {
        /// Destination temp.
        dest: TempId,
        /// Incoming values per predecessor.
        incoming: Vec<(BlockId, MirValue)>,
    },
}

impl InstKind {
    /// Returns the temp this instruction defines, if any.
    pub fn dest(&self) -> Option<TempId> {
        match self {
            Self::LoadConst { dest, .. }
            | Self::LoadVar { dest, .. }
            | Self::UnaryOp { dest, .. }
            | Self::BinaryOp { dest, .. }
            | Self::Compare { dest, .. }
            | Self::Phi { dest, .. } => Some(*dest),
            Self::Call { dest, .. } => *dest,
            Self::StoreVar { .. } | Self::Print { .. } => None,
        }
    }

    /// Returns `true` when removing an unused definition is safe.
    pub fn is_pure(&self) -> bool {
        matches!(
            self,
            Self::LoadConst { .. }
                | Self::LoadVar { .. }
                | Self::UnaryOp { .. }
                | Self::BinaryOp { .. }
                | Self::Compare { .. }
                | Self::Phi { .. }
        )
    }

    /// Visits every operand read by this instruction.
    pub fn for_each_use<F: FnMut(&MirValue)>(&self, mut visit: F) {
        match self {
            Self::LoadConst { .. } | Self::LoadVar { .. } => {}
            Self::StoreVar { value, .. } | Self::Print { value } => visit(value),
            Self::UnaryOp { operand, .. } => visit(operand),
            Self::BinaryOp { left, right, .. } | Self::Compare { left, right, .. } => {
                visit(left);
                visit(right);
            }
            Self::Call { args, .. } => {
                for arg in args {
                    visit(arg);
                }
            }
            Self::Phi { incoming, .. } => {
                for (_, value) in incoming {
                    visit(value);
                }
            }
        }
    }

    /// Rewrites every operand read by this instruction.
    pub fn map_uses<F: FnMut(&mut MirValue)>(&mut self, mut rewrite: F) {
        match self {
            Self::LoadConst { .. } | Self::LoadVar { .. } => {}
            Self::StoreVar { value, .. } | Self::Print { value } => rewrite(value),
            Self::UnaryOp { operand, .. } => rewrite(operand),
            Self::BinaryOp { left, right, .. } | Self::Compare { left, right, .. } => {
                rewrite(left);
                rewrite(right);
            }
            Self::Call { args, .. } => {
                for arg in args {
                    rewrite(arg);
                }
            }
            Self::Phi { incoming, .. } => {
                for (_, value) in incoming {
                    rewrite(value);
                }
            }
        }
    }
}

/// A MIR instruction with its source position.
#[derive(Debug, Clone, PartialEq)]
pub struct MirInstruction {
    /// Instruction payload.
    pub kind: InstKind,
    /// 1-based source line.
    pub line: u32,
    /// 1-based source column.
    pub column: u32,
}

impl MirInstruction {
    /// Creates an instruction value.
    pub fn new(kind: InstKind, line: u32, column: u32) -> Self {
        Self { kind, line, column }
    }
}

/// Control-flow terminator payloads.
#[derive(Debug, Clone, PartialEq)]
pub enum TermKind {
    /// Unconditional edge.
    Jump(BlockId),
    /// Two-way branch on truthiness.
    CondJump {
        /// Branch condition.
        cond: MirValue,
        /// Target when truthy.
        then_block: BlockId,
        /// Target when falsy.
        else_block: BlockId,
    },
    /// Function return.
    Return(Option<MirValue>),
}

impl TermKind {
    /// Returns the successor blocks of this terminator.
    pub fn successors(&self) -> Vec<BlockId> {
        match self {
            Self::Jump(target) => vec![*target],
            Self::CondJump {
                then_block,
                else_block,
                ..
            } => vec![*then_block, *else_block],
            Self::Return(_) => Vec::new(),
        }
    }

    /// Visits every operand read by this terminator.
    pub fn for_each_use<F: FnMut(&MirValue)>(&self, mut visit: F) {
        match self {
            Self::Jump(_) => {}
            Self::CondJump { cond, .. } => visit(cond),
            Self::Return(value) => {
                if let Some(value) = value {
                    visit(value);
                }
            }
        }
    }
}

/// A terminator with its source position.
#[derive(Debug, Clone, PartialEq)]
pub struct Terminator {
    /// Terminator payload.
    pub kind: TermKind,
    /// 1-based source line.
    pub line: u32,
    /// 1-based source column.
    pub column: u32,
}

impl Terminator {
    /// Creates a terminator value.
    pub fn new(kind: TermKind, line: u32, column: u32) -> Self {
        Self { kind, line, column }
    }
}

impl fmt::Display for InstKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LoadConst { dest, value } => write!(f, "%t{} = const {value}", dest.value()),
            Self::LoadVar { dest, var } => write!(f, "%t{} = load %l{}", dest.value(), var.value()),
            Self::StoreVar { var, value } => write!(f, "%l{} = {value}", var.value()),
            Self::UnaryOp { dest, op, operand } => {
                write!(f, "%t{} = {op:?} {operand}", dest.value())
            }
            Self::BinaryOp {
                dest,
                op,
                left,
                right,
            } => write!(f, "%t{} = {left} {op:?} {right}", dest.value()),
            Self::Compare {
                dest,
                op,
                left,
                right,
            } => write!(f, "%t{} = {left} {op:?} {right}", dest.value()),
            Self::Call { dest, callee, args } => {
                if let Some(dest) = dest {
                    write!(f, "%t{} = call {callee:?}(", dest.value())?;
                } else {
                    write!(f, "call {callee:?}(")?;
                }
                for (index, arg) in args.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
            Self::Print { value } => write!(f, "print {value}"),
            Self::Phi { dest, incoming } => {
                write!(f, "%t{} = phi ", dest.value())?;
                for (index, (block, value)) in incoming.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "[bb{}: {value}]", block.value())?;
                }
                Ok(())
            }
        }
    }
}
