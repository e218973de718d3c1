//! Expression lowering: SSA temps, short-circuit control flow, calls.

use crate::hir::{HirArguments, HirExpr, HirExprKind, LogicalOp};
use crate::mir::instruction::{Callee, InstKind, TermKind};
use crate::mir::lower::FunctionLowerer;
use crate::mir::value::{Constant, MirValue};

impl FunctionLowerer<'_> {
    /// Lowers one expression, returning the value holding its result.
    ///
    /// Evaluation order is left-to-right; literals become inline constants
    /// and every computed result is a fresh SSA temp.
    pub(super) fn lower_expr(&mut self, expr: &HirExpr) -> MirValue {
        let line = expr.line;
        let column = expr.column;
        match &expr.kind {
            HirExprKind::IntLit(value) => MirValue::Const(Constant::Int(*value)),
            HirExprKind::FloatLit(value) => MirValue::Const(Constant::Float(*value)),
            HirExprKind::StrLit(value) => MirValue::Const(Constant::Str(value.clone())),
            HirExprKind::UrlLit(value) => MirValue::Const(Constant::Url(value.clone())),
            HirExprKind::BoolLit(value) => MirValue::Const(Constant::Bool(*value)),
            HirExprKind::EmptyLit => MirValue::Const(Constant::Empty),
            HirExprKind::Var(name) => self.read_var(name, line, column),
            HirExprKind::Unary { op, operand } => {
                let operand = self.lower_expr(operand);
                let dest = self.func.new_temp();
                self.emit(
                    InstKind::UnaryOp {
                        dest,
                        op: *op,
                        operand,
                    },
                    line,
                    column,
                );
                MirValue::Temp(dest)
            }
            HirExprKind::Binary { op, left, right } => {
                let left = self.lower_expr(left);
                let right = self.lower_expr(right);
                let dest = self.func.new_temp();
                self.emit(
                    InstKind::BinaryOp {
                        dest,
                        op: *op,
                        left,
                        right,
                    },
                    line,
                    column,
                );
                MirValue::Temp(dest)
            }
            HirExprKind::Compare { op, left, right } => {
                let left = self.lower_expr(left);
                let right = self.lower_expr(right);
                let dest = self.func.new_temp();
                self.emit(
                    InstKind::Compare {
                        dest,
                        op: *op,
                        left,
                        right,
                    },
                    line,
                    column,
                );
                MirValue::Temp(dest)
            }
            HirExprKind::Logical { op, left, right } => {
                self.lower_logical(*op, left, right, line, column)
            }
            HirExprKind::If {
                condition,
                consequence,
                alternative,
            } => self.lower_value_if(condition, consequence, alternative, line, column),
            HirExprKind::Call { callee, arguments } => {
                let (callee, args) = self.lower_call_parts(callee, arguments, line, column);
                let dest = self.func.new_temp();
                self.emit(
                    InstKind::Call {
                        dest: Some(dest),
                        callee,
                        args,
                    },
                    line,
                    column,
                );
                MirValue::Temp(dest)
            }
        }
    }

    /// Lowers `and`/`or` to control flow so the right-hand side only
    /// evaluates when it decides the result. The expression yields the
    /// deciding operand, merged through a phi.
    ///
    /// Phi predecessors always end in unconditional jumps (the extra
    /// `short` block exists for that), which is what codegen's phi-move
    /// placement relies on.
    fn lower_logical(
        &mut self,
        op: LogicalOp,
        left: &HirExpr,
        right: &HirExpr,
        line: u32,
        column: u32,
    ) -> MirValue {
        let left_value = self.lower_expr(left);
        let rhs_block = self.func.new_block("rhs");
        let short_block = self.func.new_block("short");
        let join_block = self.func.new_block("join");

        let (then_block, else_block) = match op {
            LogicalOp::And => (rhs_block, short_block),
            LogicalOp::Or => (short_block, rhs_block),
        };
        self.terminate(
            TermKind::CondJump {
                cond: left_value.clone(),
                then_block,
                else_block,
            },
            line,
            column,
        );

        self.current = rhs_block;
        let right_value = self.lower_expr(right);
        let rhs_end = self.current;
        self.terminate(TermKind::Jump(join_block), line, column);

        self.current = short_block;
        self.terminate(TermKind::Jump(join_block), line, column);

        self.current = join_block;
        let dest = self.func.new_temp();
        self.emit(
            InstKind::Phi {
                dest,
                incoming: vec![(rhs_end, right_value), (short_block, left_value)],
            },
            line,
            column,
        );
        MirValue::Temp(dest)
    }

    /// Lowers the value-bearing conditional to a diamond with a phi.
    fn lower_value_if(
        &mut self,
        condition: &HirExpr,
        consequence: &HirExpr,
        alternative: &HirExpr,
        line: u32,
        column: u32,
    ) -> MirValue {
        let cond = self.lower_expr(condition);
        let then_block = self.func.new_block("then");
        let else_block = self.func.new_block("else");
        let join_block = self.func.new_block("join");
        self.terminate(
            TermKind::CondJump {
                cond,
                then_block,
                else_block,
            },
            line,
            column,
        );

        self.current = then_block;
        let then_value = self.lower_expr(consequence);
        let then_end = self.current;
        self.terminate(TermKind::Jump(join_block), line, column);

        self.current = else_block;
        let else_value = self.lower_expr(alternative);
        let else_end = self.current;
        self.terminate(TermKind::Jump(join_block), line, column);

        self.current = join_block;
        let dest = self.func.new_temp();
        self.emit(
            InstKind::Phi {
                dest,
                incoming: vec![(then_end, then_value), (else_end, else_value)],
            },
            line,
            column,
        );
        MirValue::Temp(dest)
    }

    /// Resolves a call target and evaluates its arguments.
    ///
    /// Named arguments are matched against the callee's declared parameter
    /// order; unknown and missing names are semantic diagnostics. Calls to
    /// undeclared names resolve at runtime (builtins).
    pub(super) fn lower_call_parts(
        &mut self,
        name: &str,
        arguments: &HirArguments,
        line: u32,
        column: u32,
    ) -> (Callee, Vec<MirValue>) {
        if let Some(signature) = self.signatures.get(name) {
            let callee = Callee::Function(signature.id);
            let params = signature.params.clone();
            let mut resolved: Vec<Option<MirValue>> = vec![None; params.len()];
            let mut extras = Vec::new();

            for (index, argument) in arguments.positional.iter().enumerate() {
                let value = self.lower_expr(argument);
                if index < resolved.len() {
                    resolved[index] = Some(value);
                } else {
                    extras.push(value);
                }
            }
            for (arg_name, argument) in &arguments.named {
                let value = self.lower_expr(argument);
                match params.iter().position(|param| param == arg_name) {
                    Some(index) => {
                        if resolved[index].is_some() {
                            self.semantic_error(
                                format!("argument `{arg_name}` was already supplied"),
                                line,
                                column,
                            );
                        } else {
                            resolved[index] = Some(value);
                        }
                    }
                    None => {
                        self.semantic_error(
                            format!("`{name}` has no parameter named `{arg_name}`"),
                            line,
                            column,
                        );
                    }
                }
            }

            let mut args = Vec::with_capacity(resolved.len() + extras.len());
            for (index, slot) in resolved.into_iter().enumerate() {
                match slot {
                    Some(value) => args.push(value),
                    None => {
                        self.semantic_error(
                            format!("missing argument `{}` in call to `{name}`", params[index]),
                            line,
                            column,
                        );
                        args.push(MirValue::Const(Constant::Empty));
                    }
                }
            }
            args.extend(extras);
            (callee, args)
        } else {
            if !arguments.named.is_empty() {
                self.semantic_error(
                    format!("named arguments require a declared method, `{name}` is not one"),
                    line,
                    column,
                );
            }
            let args = arguments
                .positional
                .iter()
                .map(|argument| self.lower_expr(argument))
                .collect();
            (Callee::Named(name.to_string()), args)
        }
    }
}
