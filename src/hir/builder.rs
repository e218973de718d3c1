//! AST → HIR construction.
//!
//! A purely structural walk: synonym operators are already canonical in
//! the AST, so the work here is re-orienting the ternary, flattening
//! grouping and free-standing blocks, turning recovered error statements
//! into no-ops, and computing static type hints bottom-up.

use crate::hir::model::{
    BinaryOp, CompareOp, HirArguments, HirExpr, HirExprKind, HirFunction, HirProgram, HirStmt,
    HirStmtKind, LogicalOp, TypeHint, UnaryOp,
};
use crate::parser::ast::{
    Arguments, Block, Expression, InfixOperator, PrefixOperator, Program, Statement, Visibility,
};

/// Builds the HIR for a parsed program.
pub fn build_program(program: &Program) -> HirProgram {
    let mut hir = HirProgram::default();
    collect_statements(&program.statements, &mut hir);
    hir
}

fn collect_statements(statements: &[Statement], hir: &mut HirProgram) {
    for statement in statements {
        match statement {
            Statement::Method(method) => {
                let body = build_statements(&method.body);
                hir.functions.push(HirFunction {
                    name: method.name.name.clone(),
                    public: method.visibility == Visibility::Public,
                    params: method
                        .parameters
                        .iter()
                        .map(|parameter| parameter.name.name.clone())
                        .collect(),
                    returns_value: method.returns_value,
                    body,
                    line: method.token.line,
                    column: method.token.column,
                });
            }
            other => {
                if let Some(stmt) = build_statement(other) {
                    hir.statements.push(stmt);
                }
            }
        }
    }
}

fn build_statements(statements: &[Statement]) -> Vec<HirStmt> {
    let mut built = Vec::new();
    for statement in statements {
        match statement {
            // Free-standing blocks execute sequentially; splice them in.
            Statement::Block(block) => built.extend(build_block(block)),
            other => {
                if let Some(stmt) = build_statement(other) {
                    built.push(stmt);
                }
            }
        }
    }
    built
}

fn build_block(block: &Block) -> Vec<HirStmt> {
    build_statements(&block.statements)
}

fn build_statement(statement: &Statement) -> Option<HirStmt> {
    let token = statement.token();
    let (line, column) = (token.line, token.column);
    let kind = match statement {
        Statement::Set { name, value, .. } => HirStmtKind::Set {
            name: name.name.clone(),
            value: build_expression(value),
        },
        Statement::Return { value, .. } => HirStmtKind::Return {
            value: value.as_ref().map(build_expression),
        },
        Statement::Say { value, .. } => HirStmtKind::Say {
            value: build_expression(value),
        },
        Statement::Call {
            callee, arguments, ..
        } => HirStmtKind::CallStmt {
            callee: callee.name.clone(),
            arguments: build_arguments(arguments),
        },
        Statement::If {
            condition,
            consequence,
            alternative,
            ..
        } => HirStmtKind::If {
            condition: build_expression(condition),
            consequence: build_block(consequence),
            alternative: alternative.as_ref().map(build_block).unwrap_or_default(),
        },
        Statement::Expression { expression, .. } => HirStmtKind::Expr {
            value: build_expression(expression),
        },
        // Recovered parse failures run as no-ops; they were already
        // reported as diagnostics.
        Statement::Error(_) => HirStmtKind::Nop,
        Statement::Block(_) | Statement::Method(_) => return None,
    };
    Some(HirStmt { kind, line, column })
}

fn build_arguments(arguments: &Arguments) -> HirArguments {
    HirArguments {
        positional: arguments.positional.iter().map(build_expression).collect(),
        named: arguments
            .named
            .iter()
            .map(|named| (named.name.name.clone(), build_expression(&named.value)))
            .collect(),
    }
}

fn build_expression(expression: &Expression) -> HirExpr {
    let token = expression.token();
    let (line, column) = (token.line, token.column);
    let kind = match expression {
        Expression::IntLiteral { value, .. } => HirExprKind::IntLit(*value),
        Expression::FloatLiteral { value, .. } => HirExprKind::FloatLit(*value),
        Expression::StringLiteral { value, .. } => HirExprKind::StrLit(value.clone()),
        Expression::UrlLiteral { value, .. } => HirExprKind::UrlLit(value.clone()),
        Expression::BooleanLiteral { value, .. } => HirExprKind::BoolLit(*value),
        Expression::EmptyLiteral { .. } => HirExprKind::EmptyLit,
        Expression::Identifier(identifier) => HirExprKind::Var(identifier.name.clone()),
        Expression::Prefix {
            operator, operand, ..
        } => HirExprKind::Unary {
            op: match operator {
                PrefixOperator::Neg => UnaryOp::Neg,
                PrefixOperator::Not => UnaryOp::Not,
            },
            operand: Box::new(build_expression(operand)),
        },
        Expression::Infix {
            operator,
            left,
            right,
            ..
        } => build_infix(*operator, left, right),
        Expression::Conditional {
            consequence,
            condition,
            alternative,
            ..
        } => HirExprKind::If {
            condition: Box::new(build_expression(condition)),
            consequence: Box::new(build_expression(consequence)),
            alternative: Box::new(build_expression(alternative)),
        },
        Expression::Call {
            callee, arguments, ..
        } => HirExprKind::Call {
            callee: callee.name.clone(),
            arguments: build_arguments(arguments),
        },
        Expression::Grouped { inner, .. } => return build_expression(inner),
        // Error expressions only survive inside recovered statements;
        // produce the empty value so the tree stays well-formed.
        Expression::Error(_) => HirExprKind::EmptyLit,
    };
    let hint = hint_of(&kind);
    HirExpr {
        kind,
        hint,
        line,
        column,
    }
}

fn build_infix(operator: InfixOperator, left: &Expression, right: &Expression) -> HirExprKind {
    let left = Box::new(build_expression(left));
    let right = Box::new(build_expression(right));
    match operator {
        InfixOperator::Add => HirExprKind::Binary {
            op: BinaryOp::Add,
            left,
            right,
        },
        InfixOperator::Sub => HirExprKind::Binary {
            op: BinaryOp::Sub,
            left,
            right,
        },
        InfixOperator::Mul => HirExprKind::Binary {
            op: BinaryOp::Mul,
            left,
            right,
        },
        InfixOperator::Div => HirExprKind::Binary {
            op: BinaryOp::Div,
            left,
            right,
        },
        InfixOperator::Mod => HirExprKind::Binary {
            op: BinaryOp::Mod,
            left,
            right,
        },
        InfixOperator::Pow => HirExprKind::Binary {
            op: BinaryOp::Pow,
            left,
            right,
        },
        InfixOperator::Eq => HirExprKind::Compare {
            op: CompareOp::Eq,
            left,
            right,
        },
        InfixOperator::NotEq => HirExprKind::Compare {
            op: CompareOp::NotEq,
            left,
            right,
        },
        InfixOperator::StrictEq => HirExprKind::Compare {
            op: CompareOp::StrictEq,
            left,
            right,
        },
        InfixOperator::StrictNotEq => HirExprKind::Compare {
            op: CompareOp::StrictNotEq,
            left,
            right,
        },
        InfixOperator::Lt => HirExprKind::Compare {
            op: CompareOp::Lt,
            left,
            right,
        },
        InfixOperator::Gt => HirExprKind::Compare {
            op: CompareOp::Gt,
            left,
            right,
        },
        InfixOperator::Lte => HirExprKind::Compare {
            op: CompareOp::Lte,
            left,
            right,
        },
        InfixOperator::Gte => HirExprKind::Compare {
            op: CompareOp::Gte,
            left,
            right,
        },
        InfixOperator::And => HirExprKind::Logical {
            op: LogicalOp::And,
            left,
            right,
        },
        InfixOperator::Or => HirExprKind::Logical {
            op: LogicalOp::Or,
            left,
            right,
        },
    }
}

/// Computes the static type hint for a freshly built expression.
fn hint_of(kind: &HirExprKind) -> TypeHint {
    match kind {
        HirExprKind::IntLit(_) => TypeHint::Int,
        HirExprKind::FloatLit(_) => TypeHint::Float,
        HirExprKind::StrLit(_) => TypeHint::Str,
        HirExprKind::UrlLit(_) => TypeHint::Url,
        HirExprKind::BoolLit(_) => TypeHint::Bool,
        HirExprKind::EmptyLit => TypeHint::Empty,
        HirExprKind::Var(_) | HirExprKind::Call { .. } => TypeHint::Unknown,
        HirExprKind::Unary { op, operand } => match op {
            UnaryOp::Not => TypeHint::Bool,
            UnaryOp::Neg => match operand.hint {
                TypeHint::Int => TypeHint::Int,
                TypeHint::Float => TypeHint::Float,
                _ => TypeHint::Unknown,
            },
        },
        HirExprKind::Binary { op, left, right } => match (op, left.hint, right.hint) {
            (BinaryOp::Add, TypeHint::Str, TypeHint::Str) => TypeHint::Str,
            (_, TypeHint::Int, TypeHint::Int) => TypeHint::Int,
            (_, TypeHint::Int | TypeHint::Float, TypeHint::Int | TypeHint::Float) => {
                TypeHint::Float
            }
            _ => TypeHint::Unknown,
        },
        HirExprKind::Compare { .. } => TypeHint::Bool,
        HirExprKind::Logical { left, right, .. } => {
            if left.hint == TypeHint::Bool && right.hint == TypeHint::Bool {
                TypeHint::Bool
            } else {
                TypeHint::Unknown
            }
        }
        HirExprKind::If {
            consequence,
            alternative,
            ..
        } => {
            if consequence.hint == alternative.hint {
                consequence.hint
            } else {
                TypeHint::Unknown
            }
        }
    }
}
