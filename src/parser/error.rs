//! Parser error contracts.

use crate::diag::{Diagnostic, DiagnosticCategory};
use crate::lexer::Token;

/// Stable parser error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseErrorKind {
    /// A concrete token did not match grammar expectations.
    UnexpectedToken,
    /// Input ended before required grammar elements were found.
    UnexpectedEndOfInput,
    /// A statement is missing its period terminator.
    MissingTerminator,
    /// A block line's depth does not fit the enclosing block.
    BlockDepthMismatch,
    /// The same argument name was supplied twice.
    DuplicateNamedArgument,
    /// A positional argument followed a named argument.
    PositionalAfterNamed,
    /// An integer literal does not fit the 64-bit value range.
    IntegerOutOfRange,
    /// The recovery budget was exhausted; parsing stopped early.
    TooManyErrors,
}

/// Parser error payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// Error category.
    pub kind: ParseErrorKind,
    /// Human-readable message.
    pub message: String,
    /// 1-based source line.
    pub line: u32,
    /// 1-based source column.
    pub column: u32,
}

impl ParseError {
    /// Creates a parser error.
    pub fn new(kind: ParseErrorKind, message: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            kind,
            message: message.into(),
            line,
            column,
        }
    }

    /// Creates an `UnexpectedToken` error describing what was expected.
    pub fn unexpected_token(token: &Token, expected: &str) -> Self {
        let found = if token.is_eof() {
            "end of input".to_string()
        } else {
            format!("`{}`", token.lexeme)
        };
        let kind = if token.is_eof() {
            ParseErrorKind::UnexpectedEndOfInput
        } else {
            ParseErrorKind::UnexpectedToken
        };
        Self::new(
            kind,
            format!("expected {expected}, found {found}"),
            token.line,
            token.column,
        )
    }

    /// Creates a `MissingTerminator` error at the offending token.
    pub fn missing_terminator(token: &Token) -> Self {
        Self::new(
            ParseErrorKind::MissingTerminator,
            format!("expected `.` to end the statement, found `{}`", token.lexeme),
            token.line,
            token.column,
        )
    }

    /// Creates a `BlockDepthMismatch` error at the offending token.
    pub fn block_depth_mismatch(token: &Token, enclosing: u8) -> Self {
        Self::new(
            ParseErrorKind::BlockDepthMismatch,
            format!("expected a block indented deeper than level {enclosing}"),
            token.line,
            token.column,
        )
    }

    /// Creates a `DuplicateNamedArgument` error.
    pub fn duplicate_named_argument(token: &Token, name: &str) -> Self {
        Self::new(
            ParseErrorKind::DuplicateNamedArgument,
            format!("argument `{name}` was already supplied"),
            token.line,
            token.column,
        )
    }

    /// Creates a `PositionalAfterNamed` error.
    pub fn positional_after_named(token: &Token) -> Self {
        Self::new(
            ParseErrorKind::PositionalAfterNamed,
            "positional arguments must precede named arguments",
            token.line,
            token.column,
        )
    }

    /// Creates an `IntegerOutOfRange` error.
    pub fn integer_out_of_range(token: &Token) -> Self {
        Self::new(
            ParseErrorKind::IntegerOutOfRange,
            format!("integer literal `{}` does not fit 64 bits", token.lexeme),
            token.line,
            token.column,
        )
    }

    /// Converts the error into a syntax diagnostic.
    pub fn into_diagnostic(self) -> Diagnostic {
        Diagnostic::error(DiagnosticCategory::Syntax, self.message, self.line, self.column)
    }
}
