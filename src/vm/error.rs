//! VM error contracts.

use std::fmt;

/// Stable runtime error categories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VmErrorKind {
    /// Call-frame depth exceeded its configured limit.
    StackOverflow,
    /// Pop or peek on an empty operand stack.
    StackUnderflow,
    /// Slot index exceeds the frame's local array.
    SlotOutOfBounds,
    /// Opcode or operand decoding failed.
    InvalidInstruction,
    /// Constant-pool index does not resolve.
    InvalidConstant,
    /// Function index does not resolve.
    InvalidFunction,
    /// Operand types do not fit the operation.
    TypeMismatch,
    /// Integer or float division/modulo by zero.
    DivisionByZero,
    /// A name was not found at call or load time.
    UnknownName(String),
    /// A call supplied the wrong number of arguments.
    WrongArity,
    /// The called value is not a function.
    NotCallable,
    /// The configured step budget ran out.
    StepLimitExceeded,
    /// The loaded module is structurally invalid.
    InvalidModule,
    /// Unexpected internal state; indicates a VM bug.
    Internal,
}

impl fmt::Display for VmErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StackOverflow => write!(f, "stack overflow"),
            Self::StackUnderflow => write!(f, "stack underflow"),
            Self::SlotOutOfBounds => write!(f, "slot out of bounds"),
            Self::InvalidInstruction => write!(f, "invalid instruction"),
            Self::InvalidConstant => write!(f, "invalid constant"),
            Self::InvalidFunction => write!(f, "invalid function"),
            Self::TypeMismatch => write!(f, "type mismatch"),
            Self::DivisionByZero => write!(f, "division by zero"),
            Self::UnknownName(name) => write!(f, "unknown name `{name}`"),
            Self::WrongArity => write!(f, "wrong arity"),
            Self::NotCallable => write!(f, "not callable"),
            Self::StepLimitExceeded => write!(f, "step limit exceeded"),
            Self::InvalidModule => write!(f, "invalid module"),
            Self::Internal => write!(f, "internal error"),
        }
    }
}

/// Runtime error payload with source position and call chain.
#[derive(Debug, Clone, PartialEq)]
pub struct VmError {
    /// Error category.
    pub kind: VmErrorKind,
    /// Human-readable message.
    pub message: String,
    /// 1-based source line, when line info resolved it.
    pub line: Option<u32>,
    /// 1-based source column, when line info resolved it.
    pub column: Option<u32>,
    /// Active call chain, innermost last.
    pub call_chain: Vec<String>,
}

impl VmError {
    /// Creates a VM error without position information.
    pub fn new(kind: VmErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            line: None,
            column: None,
            call_chain: Vec::new(),
        }
    }

    /// Creates a `StackOverflow` error.
    pub fn stack_overflow(depth: usize, limit: usize) -> Self {
        Self::new(
            VmErrorKind::StackOverflow,
            format!("call depth {depth} exceeds the limit of {limit}"),
        )
    }

    /// Creates a `StackUnderflow` error.
    pub fn stack_underflow() -> Self {
        Self::new(VmErrorKind::StackUnderflow, "operand stack is empty")
    }

    /// Creates a `SlotOutOfBounds` error.
    pub fn slot_out_of_bounds(index: usize, limit: usize) -> Self {
        Self::new(
            VmErrorKind::SlotOutOfBounds,
            format!("slot {index} out of bounds (limit {limit})"),
        )
    }

    /// Creates an `InvalidInstruction` error.
    pub fn invalid_instruction(message: impl Into<String>) -> Self {
        Self::new(VmErrorKind::InvalidInstruction, message)
    }

    /// Creates an `InvalidConstant` error.
    pub fn invalid_constant(index: u16) -> Self {
        Self::new(
            VmErrorKind::InvalidConstant,
            format!("constant index {index} does not resolve"),
        )
    }

    /// Creates an `InvalidFunction` error.
    pub fn invalid_function(index: u16) -> Self {
        Self::new(
            VmErrorKind::InvalidFunction,
            format!("function index {index} does not resolve"),
        )
    }

    /// Creates a `TypeMismatch` error.
    pub fn type_mismatch(message: impl Into<String>) -> Self {
        Self::new(VmErrorKind::TypeMismatch, message)
    }

    /// Creates a `DivisionByZero` error.
    pub fn division_by_zero() -> Self {
        Self::new(VmErrorKind::DivisionByZero, "division by zero")
    }

    /// Creates an `UnknownName` error.
    pub fn unknown_name(name: impl Into<String>) -> Self {
        let name = name.into();
        let message = format!("`{name}` is not defined");
        Self::new(VmErrorKind::UnknownName(name), message)
    }

    /// Creates a `WrongArity` error.
    pub fn wrong_arity(name: &str, expected: impl fmt::Display, found: u8) -> Self {
        Self::new(
            VmErrorKind::WrongArity,
            format!("`{name}` expects {expected} argument(s), got {found}"),
        )
    }

    /// Creates a `NotCallable` error.
    pub fn not_callable(type_name: &str) -> Self {
        Self::new(
            VmErrorKind::NotCallable,
            format!("a value of type {type_name} is not callable"),
        )
    }

    /// Creates a `StepLimitExceeded` error.
    pub fn step_limit_exceeded(limit: u64) -> Self {
        Self::new(
            VmErrorKind::StepLimitExceeded,
            format!("execution exceeded the limit of {limit} steps"),
        )
    }

    /// Creates an `InvalidModule` error.
    pub fn invalid_module(message: impl Into<String>) -> Self {
        Self::new(VmErrorKind::InvalidModule, message)
    }

    /// Creates an `Internal` error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(VmErrorKind::Internal, message)
    }

    /// Attaches a source position unless one is already present.
    pub fn with_position(mut self, line: u32, column: u32) -> Self {
        if self.line.is_none() {
            self.line = Some(line);
            self.column = Some(column);
        }
        self
    }

    /// Attaches the active call chain (innermost last).
    pub fn with_call_chain(mut self, chain: Vec<String>) -> Self {
        if self.call_chain.is_empty() {
            self.call_chain = chain;
        }
        self
    }
}

impl fmt::Display for VmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        if let (Some(line), Some(column)) = (self.line, self.column) {
            write!(f, " (line {line}, column {column})")?;
        }
        if !self.call_chain.is_empty() {
            write!(f, " in {}", self.call_chain.join(" -> "))?;
        }
        Ok(())
    }
}

impl std::error::Error for VmError {}
