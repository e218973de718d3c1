//! Token model: kinds, literal classes, and source positions.

use std::fmt;

/// Statement and structural keywords.
///
/// Synonyms collapse at the lexer: `use`/`apply` become [`KeywordKind::Call`],
/// `give back`/`gives back` become [`KeywordKind::GiveBack`]. Matching is
/// case-insensitive; the token lexeme preserves the source spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeywordKind {
    /// `set`
    Set,
    /// `to`
    To,
    /// `give back` / `gives back`
    GiveBack,
    /// `if`
    If,
    /// `when`
    When,
    /// `whenever`
    Whenever,
    /// `then`
    Then,
    /// `else`
    Else,
    /// `otherwise`
    Otherwise,
    /// `call` / `use` / `apply`
    Call,
    /// `with`
    With,
    /// `action` (private method definition)
    Action,
    /// `interaction` (public method definition)
    Interaction,
    /// `say`
    Say,
    /// `as` (type annotations in declarations)
    As,
}

/// Operators, including canonical comparators produced from
/// natural-language phrases (`is greater than or equal to` and friends).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorKind {
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `%`
    Percent,
    /// `**`
    Pow,
    /// `not`
    Not,
    /// `and`
    And,
    /// `or`
    Or,
    /// `equals` / `is equal to` / `is the same as`
    Eq,
    /// `is not equal to` / `does not equal`
    NotEq,
    /// `is strictly equal to`
    StrictEq,
    /// `is not strictly equal to`
    StrictNotEq,
    /// `<` / `is less than`
    Lt,
    /// `>` / `is greater than`
    Gt,
    /// `is less than or equal to`
    Lte,
    /// `is greater than or equal to`
    Gte,
}

/// Punctuation tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PunctKind {
    /// `.`
    Period,
    /// `,`
    Comma,
    /// `:`
    Colon,
    /// `;`
    Semicolon,
    /// `(`
    LParen,
    /// `)`
    RParen,
}

/// Literal classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiteralKind {
    /// `42` / `_42_`
    Int,
    /// `3.14` / `_3.14_`
    Float,
    /// `"hi"` / `_"hi"_`
    Text,
    /// A quoted string whose content is a valid URI.
    Url,
    /// `_Yes_` / `true`
    True,
    /// `_No_` / `false`
    False,
    /// `_empty_` / `empty`
    Empty,
}

/// How an identifier was written in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentifierForm {
    /// `` `name with spaces` `` — interior whitespace and hyphens preserved.
    Backtick,
    /// A bare word that matched no keyword/stopword table.
    Bare,
}

/// Token classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Statement/structural keyword.
    Keyword(KeywordKind),
    /// Operator (symbolic or phrase-derived).
    Operator(OperatorKind),
    /// Punctuation.
    Punct(PunctKind),
    /// Literal with its class; the lexeme holds the semantic text.
    Literal(LiteralKind),
    /// Identifier; the lexeme holds the name without delimiters.
    Identifier(IdentifierForm),
    /// Skippable English filler word (`a`, `the`, bare `is`, ...).
    Stopword,
    /// Run of `>` at the start of a logical line; payload is the depth.
    BlockMarker(u8),
    /// Run of `#` at the start of a logical line; payload is the level.
    HeaderMarker(u8),
    /// Interior of a `<summary>…</summary>` tag.
    Comment,
    /// `<details>`
    DetailsOpen,
    /// `</details>`
    DetailsClose,
    /// End of input.
    Eof,
    /// Unrecognised or malformed input; a diagnostic accompanies it.
    Illegal,
}

/// A lexical token with its semantic text and 1-based source position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Token category.
    pub kind: TokenKind,
    /// Semantic text: literal value, identifier name, or raw spelling.
    pub lexeme: String,
    /// 1-based source line of the first character.
    pub line: u32,
    /// 1-based source column of the first character.
    pub column: u32,
}

impl Token {
    /// Creates a token value.
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            line,
            column,
        }
    }

    /// Returns `true` for the given keyword.
    pub fn is_keyword(&self, keyword: KeywordKind) -> bool {
        self.kind == TokenKind::Keyword(keyword)
    }

    /// Returns `true` for the given operator.
    pub fn is_operator(&self, operator: OperatorKind) -> bool {
        self.kind == TokenKind::Operator(operator)
    }

    /// Returns `true` for the given punctuation.
    pub fn is_punct(&self, punct: PunctKind) -> bool {
        self.kind == TokenKind::Punct(punct)
    }

    /// Returns `true` for any identifier form.
    pub fn is_identifier(&self) -> bool {
        matches!(self.kind, TokenKind::Identifier(_))
    }

    /// Returns `true` for a backtick-wrapped identifier.
    pub fn is_backtick_identifier(&self) -> bool {
        self.kind == TokenKind::Identifier(IdentifierForm::Backtick)
    }

    /// Returns `true` when this token can open a statement.
    ///
    /// Used by panic-mode recovery to find resynchronisation points.
    pub fn starts_statement(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Keyword(
                KeywordKind::Set
                    | KeywordKind::GiveBack
                    | KeywordKind::If
                    | KeywordKind::When
                    | KeywordKind::Whenever
                    | KeywordKind::Call
                    | KeywordKind::Say
            ) | TokenKind::HeaderMarker(_)
        )
    }

    /// Returns `true` at end of input.
    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({:?})@{}:{}", self.kind, self.lexeme, self.line, self.column)
    }
}
