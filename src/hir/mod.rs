//! High-level IR: the AST after desugaring.
//!
//! HIR normalises operator synonyms onto canonical forms, folds away
//! stopwords and presentational tokens, re-orients the ternary so the
//! condition comes first, and tags every expression with a static type
//! hint for later lowering decisions.

mod builder;
mod model;

pub use builder::build_program;
pub use model::{
    BinaryOp, CompareOp, HirArguments, HirExpr, HirExprKind, HirFunction, HirProgram, HirStmt,
    HirStmtKind, LogicalOp, TypeHint, UnaryOp,
};
