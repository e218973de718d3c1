//! AST node variants with their originating tokens.
//!
//! Every node keeps the token that introduced it so diagnostics and later
//! IR stages can report 1-based source positions. `Display` renders the
//! canonical source form (literals underscore-wrapped, identifiers in
//! backticks), which is what the parse→print round-trip tests exercise.

use std::fmt;

use crate::lexer::{OperatorKind, Token};

/// Prefix operator forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixOperator {
    /// Arithmetic negation (`-`).
    Neg,
    /// Logical negation (`not`).
    Not,
}

impl PrefixOperator {
    /// Canonical source spelling.
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Neg => "-",
            Self::Not => "not",
        }
    }
}

/// Canonical infix operator forms.
///
/// Natural-language comparators map 1:1 onto these during parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfixOperator {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Mod,
    /// `**`
    Pow,
    /// value equality
    Eq,
    /// value inequality
    NotEq,
    /// strict (type-and-value) equality
    StrictEq,
    /// strict inequality
    StrictNotEq,
    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `<=`
    Lte,
    /// `>=`
    Gte,
    /// short-circuit conjunction
    And,
    /// short-circuit disjunction
    Or,
}

impl InfixOperator {
    /// Maps a lexer operator onto its canonical infix form.
    pub fn from_operator(kind: OperatorKind) -> Option<Self> {
        let mapped = match kind {
            OperatorKind::Plus => Self::Add,
            OperatorKind::Minus => Self::Sub,
            OperatorKind::Star => Self::Mul,
            OperatorKind::Slash => Self::Div,
            OperatorKind::Percent => Self::Mod,
            OperatorKind::Pow => Self::Pow,
            OperatorKind::Eq => Self::Eq,
            OperatorKind::NotEq => Self::NotEq,
            OperatorKind::StrictEq => Self::StrictEq,
            OperatorKind::StrictNotEq => Self::StrictNotEq,
            OperatorKind::Lt => Self::Lt,
            OperatorKind::Gt => Self::Gt,
            OperatorKind::Lte => Self::Lte,
            OperatorKind::Gte => Self::Gte,
            OperatorKind::And => Self::And,
            OperatorKind::Or => Self::Or,
            OperatorKind::Not => return None,
        };
        Some(mapped)
    }

    /// Canonical source spelling.
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Pow => "**",
            Self::Eq => "equals",
            Self::NotEq => "is not equal to",
            Self::StrictEq => "is strictly equal to",
            Self::StrictNotEq => "is not strictly equal to",
            Self::Lt => "is less than",
            Self::Gt => "is greater than",
            Self::Lte => "is less than or equal to",
            Self::Gte => "is greater than or equal to",
            Self::And => "and",
            Self::Or => "or",
        }
    }
}

/// A named reference with its source token.
#[derive(Debug, Clone, PartialEq)]
pub struct Identifier {
    /// Originating token.
    pub token: Token,
    /// The name as written (without backticks).
    pub name: String,
}

impl Identifier {
    /// Creates an identifier from its token.
    pub fn from_token(token: Token) -> Self {
        let name = token.lexeme.clone();
        Self { token, name }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}`", self.name)
    }
}

/// One `name: value` argument pair.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedArgument {
    /// Argument name.
    pub name: Identifier,
    /// Argument value.
    pub value: Expression,
}

/// Mixed positional + named call arguments.
///
/// Positional arguments always precede named arguments; the parser reports
/// violations but still records the values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Arguments {
    /// Positional values in call order.
    pub positional: Vec<Expression>,
    /// Named pairs in call order.
    pub named: Vec<NamedArgument>,
}

impl Arguments {
    /// Returns `true` when no argument was supplied.
    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.named.is_empty()
    }
}

impl fmt::Display for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for value in &self.positional {
            if !first {
                write!(f, ", ")?;
            }
            first = false;
            write!(f, "{value}")?;
        }
        for named in &self.named {
            if !first {
                write!(f, ", ")?;
            }
            first = false;
            write!(f, "{}: {}", named.name.name, named.value)?;
        }
        Ok(())
    }
}

/// Placeholder for an expression that failed to parse.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorExpression {
    /// The token where parsing failed.
    pub token: Token,
}

/// Expression node family.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// `_42_`
    IntLiteral {
        /// Originating token.
        token: Token,
        /// Parsed value.
        value: i64,
    },
    /// `_3.14_`
    FloatLiteral {
        /// Originating token.
        token: Token,
        /// Parsed value.
        value: f64,
    },
    /// `_"hi"_`
    StringLiteral {
        /// Originating token.
        token: Token,
        /// Cooked content.
        value: String,
    },
    /// A string literal whose content is a valid URI.
    UrlLiteral {
        /// Originating token.
        token: Token,
        /// URI text.
        value: String,
    },
    /// `_Yes_` / `_No_`
    BooleanLiteral {
        /// Originating token.
        token: Token,
        /// Parsed value.
        value: bool,
    },
    /// `_empty_`
    EmptyLiteral {
        /// Originating token.
        token: Token,
    },
    /// Variable reference.
    Identifier(Identifier),
    /// `-x`, `not x`
    Prefix {
        /// Operator token.
        token: Token,
        /// Operator form.
        operator: PrefixOperator,
        /// Operand.
        operand: Box<Expression>,
    },
    /// Binary operation.
    Infix {
        /// Operator token.
        token: Token,
        /// Canonical operator.
        operator: InfixOperator,
        /// Left operand.
        left: Box<Expression>,
        /// Right operand.
        right: Box<Expression>,
    },
    /// `X if COND else Y` — the condition sits in the middle.
    Conditional {
        /// The `if`/`when` token.
        token: Token,
        /// Value when the condition holds.
        consequence: Box<Expression>,
        /// The middle condition.
        condition: Box<Expression>,
        /// Value when the condition fails.
        alternative: Box<Expression>,
    },
    /// `` `name`(args…) ``
    Call {
        /// The opening parenthesis token.
        token: Token,
        /// Call target.
        callee: Identifier,
        /// Evaluated arguments.
        arguments: Arguments,
    },
    /// Parenthesised expression.
    Grouped {
        /// The opening parenthesis token.
        token: Token,
        /// Inner expression.
        inner: Box<Expression>,
    },
    /// Recovered parse failure.
    Error(ErrorExpression),
}

impl Expression {
    /// Returns the originating token of this expression.
    pub fn token(&self) -> &Token {
        match self {
            Self::IntLiteral { token, .. }
            | Self::FloatLiteral { token, .. }
            | Self::StringLiteral { token, .. }
            | Self::UrlLiteral { token, .. }
            | Self::BooleanLiteral { token, .. }
            | Self::EmptyLiteral { token }
            | Self::Prefix { token, .. }
            | Self::Infix { token, .. }
            | Self::Conditional { token, .. }
            | Self::Call { token, .. }
            | Self::Grouped { token, .. } => token,
            Self::Identifier(identifier) => &identifier.token,
            Self::Error(error) => &error.token,
        }
    }

    /// Returns `true` for a recovered parse failure.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IntLiteral { value, .. } => write!(f, "_{value}_"),
            Self::FloatLiteral { value, .. } => write!(f, "_{value:?}_"),
            Self::StringLiteral { value, .. } => write!(f, "_\"{value}\"_"),
            Self::UrlLiteral { value, .. } => write!(f, "_\"{value}\"_"),
            Self::BooleanLiteral { value, .. } => {
                write!(f, "_{}_", if *value { "Yes" } else { "No" })
            }
            Self::EmptyLiteral { .. } => write!(f, "_empty_"),
            Self::Identifier(identifier) => write!(f, "{identifier}"),
            Self::Prefix {
                operator, operand, ..
            } => match operator {
                PrefixOperator::Neg => write!(f, "(-{operand})"),
                PrefixOperator::Not => write!(f, "(not {operand})"),
            },
            Self::Infix {
                operator,
                left,
                right,
                ..
            } => write!(f, "({left} {} {right})", operator.symbol()),
            Self::Conditional {
                consequence,
                condition,
                alternative,
                ..
            } => write!(f, "({consequence} if {condition} else {alternative})"),
            Self::Call {
                callee, arguments, ..
            } => write!(f, "{callee}({arguments})"),
            Self::Grouped { inner, .. } => write!(f, "{inner}"),
            Self::Error(_) => write!(f, "<error>"),
        }
    }
}

/// An indented block of statements (depth ≥ 1).
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    /// The first block-marker token.
    pub token: Token,
    /// Marker depth of the block's lines.
    pub depth: u8,
    /// Statements in source order.
    pub statements: Vec<Statement>,
}

/// Method visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// `Action`: callable from the same scope only.
    Private,
    /// `Interaction`: callable from outside.
    Public,
}

/// One declared parameter from an `#### Inputs` section.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// Parameter name.
    pub name: Identifier,
}

/// An `### **Action**:` / `### **Interaction**:` definition.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDefinition {
    /// The header marker token.
    pub token: Token,
    /// Method name.
    pub name: Identifier,
    /// Private (`Action`) or public (`Interaction`).
    pub visibility: Visibility,
    /// Declared parameters in order.
    pub parameters: Vec<Parameter>,
    /// `true` when an `#### Outputs` section is present.
    pub returns_value: bool,
    /// Body statements from the `<details>` block.
    pub body: Vec<Statement>,
}

/// Placeholder for a statement that failed to parse.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorStatement {
    /// The token where parsing failed.
    pub token: Token,
    /// Tokens skipped while resynchronising.
    pub skipped: Vec<Token>,
}

/// Statement node family.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `Set `x` to EXPR.`
    Set {
        /// The `Set` keyword token.
        token: Token,
        /// Target variable.
        name: Identifier,
        /// Assigned value.
        value: Expression,
    },
    /// `Give back EXPR.`
    Return {
        /// The `give back` token.
        token: Token,
        /// Optional return value.
        value: Option<Expression>,
    },
    /// `Call `f` with args.`
    Call {
        /// The `call` keyword token.
        token: Token,
        /// Call target.
        callee: Identifier,
        /// Supplied arguments.
        arguments: Arguments,
    },
    /// `If COND then: …block… else: …block…`
    If {
        /// The `if`/`when`/`whenever` token.
        token: Token,
        /// Branch condition.
        condition: Expression,
        /// Taken when the condition holds.
        consequence: Block,
        /// Taken otherwise, when present.
        alternative: Option<Block>,
    },
    /// `Say EXPR.`
    Say {
        /// The `say` keyword token.
        token: Token,
        /// Printed value.
        value: Expression,
    },
    /// A free-standing indented block.
    Block(Block),
    /// Method definition.
    Method(MethodDefinition),
    /// Expression evaluated for its value.
    Expression {
        /// First token of the expression.
        token: Token,
        /// The expression.
        expression: Expression,
    },
    /// Recovered parse failure; a no-op at runtime.
    Error(ErrorStatement),
}

impl Statement {
    /// Returns the originating token of this statement.
    pub fn token(&self) -> &Token {
        match self {
            Self::Set { token, .. }
            | Self::Return { token, .. }
            | Self::Call { token, .. }
            | Self::If { token, .. }
            | Self::Say { token, .. }
            | Self::Expression { token, .. } => token,
            Self::Block(block) => &block.token,
            Self::Method(method) => &method.token,
            Self::Error(error) => &error.token,
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Set { name, value, .. } => write!(f, "Set {name} to {value}."),
            Self::Return { value: Some(value), .. } => write!(f, "Give back {value}."),
            Self::Return { value: None, .. } => write!(f, "Give back."),
            Self::Call {
                callee, arguments, ..
            } => {
                if arguments.is_empty() {
                    write!(f, "Call {callee}.")
                } else {
                    write!(f, "Call {callee} with {arguments}.")
                }
            }
            Self::If {
                condition,
                consequence,
                alternative,
                ..
            } => {
                write!(f, "If {condition} then:")?;
                for statement in &consequence.statements {
                    write!(f, " {} {statement}", ">".repeat(consequence.depth as usize))?;
                }
                if let Some(block) = alternative {
                    write!(f, " else:")?;
                    for statement in &block.statements {
                        write!(f, " {} {statement}", ">".repeat(block.depth as usize))?;
                    }
                }
                Ok(())
            }
            Self::Say { value, .. } => write!(f, "Say {value}."),
            Self::Block(block) => {
                let mut first = true;
                for statement in &block.statements {
                    if !first {
                        write!(f, " ")?;
                    }
                    first = false;
                    write!(f, "{} {statement}", ">".repeat(block.depth as usize))?;
                }
                Ok(())
            }
            Self::Method(method) => {
                let keyword = match method.visibility {
                    Visibility::Private => "Action",
                    Visibility::Public => "Interaction",
                };
                write!(f, "### **{keyword}**: {}", method.name)
            }
            Self::Expression { expression, .. } => write!(f, "{expression}."),
            Self::Error(_) => write!(f, "<error>"),
        }
    }
}

/// An ordered list of top-level statements.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    /// Top-level statements in source order.
    pub statements: Vec<Statement>,
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for statement in &self.statements {
            if !first {
                writeln!(f)?;
            }
            first = false;
            write!(f, "{statement}")?;
        }
        Ok(())
    }
}
