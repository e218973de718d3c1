//! MIR value types.

use std::fmt;

use crate::hir::TypeHint;

/// Runtime-facing type tags carried on MIR locals and constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MirType {
    /// The empty value.
    Empty,
    /// Boolean.
    Bool,
    /// 64-bit signed integer.
    Int,
    /// IEEE-754 double.
    Float,
    /// UTF-8 string (reference-counted, immutable at runtime).
    String,
    /// Validated URL string.
    Url,
    /// Reference to a function definition.
    Function,
    /// Error marker produced by recovered lowering.
    Error,
}

impl MirType {
    /// Maps a static hint to a MIR type; `Unknown` has no MIR type.
    pub fn from_hint(hint: TypeHint) -> Option<Self> {
        let ty = match hint {
            TypeHint::Int => Self::Int,
            TypeHint::Float => Self::Float,
            TypeHint::Bool => Self::Bool,
            TypeHint::Str => Self::String,
            TypeHint::Url => Self::Url,
            TypeHint::Empty => Self::Empty,
            TypeHint::Unknown => return None,
        };
        Some(ty)
    }
}

impl fmt::Display for MirType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Empty => "empty",
            Self::Bool => "boolean",
            Self::Int => "whole number",
            Self::Float => "number",
            Self::String => "text",
            Self::Url => "url",
            Self::Function => "function",
            Self::Error => "error",
        };
        write!(f, "{name}")
    }
}
