//! Shared diagnostic contracts for the compile pipeline.

use std::fmt;

/// Stage family that reported a problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticCategory {
    /// Produced while tokenizing.
    Lexical,
    /// Produced while parsing.
    Syntax,
    /// Produced while lowering (name resolution, argument binding).
    Semantic,
}

impl fmt::Display for DiagnosticCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lexical => write!(f, "lexical"),
            Self::Syntax => write!(f, "syntax"),
            Self::Semantic => write!(f, "semantic"),
        }
    }
}

/// Whether a diagnostic blocks strict callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    /// The construct was recovered but is wrong.
    Error,
    /// Suspicious but well-formed input.
    Warning,
}

/// One reported problem with its source position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Stage family.
    pub category: DiagnosticCategory,
    /// Blocking or advisory.
    pub severity: Severity,
    /// Human-readable message.
    pub message: String,
    /// 1-based source line.
    pub line: u32,
    /// 1-based source column.
    pub column: u32,
}

impl Diagnostic {
    /// Creates a diagnostic.
    pub fn new(
        category: DiagnosticCategory,
        severity: Severity,
        message: impl Into<String>,
        line: u32,
        column: u32,
    ) -> Self {
        Self {
            category,
            severity,
            message: message.into(),
            line,
            column,
        }
    }

    /// Creates an error-severity diagnostic.
    pub fn error(
        category: DiagnosticCategory,
        message: impl Into<String>,
        line: u32,
        column: u32,
    ) -> Self {
        Self::new(category, Severity::Error, message, line, column)
    }

    /// Creates a warning-severity diagnostic.
    pub fn warning(
        category: DiagnosticCategory,
        message: impl Into<String>,
        line: u32,
        column: u32,
    ) -> Self {
        Self::new(category, Severity::Warning, message, line, column)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {}: {}",
            self.line, self.column, self.category, self.message
        )
    }
}

/// Ordered diagnostic sink.
///
/// Entries keep their insertion order; exact duplicates are dropped so that
/// recovery loops cannot flood the report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a diagnostic unless an identical one is already recorded.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        if !self.entries.contains(&diagnostic) {
            self.entries.push(diagnostic);
        }
    }

    /// Appends every diagnostic from `other` with the same dedup rule.
    pub fn extend(&mut self, other: impl IntoIterator<Item = Diagnostic>) {
        for diagnostic in other {
            self.push(diagnostic);
        }
    }

    /// Returns the recorded diagnostics in order.
    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    /// Returns `true` when any entry has error severity.
    pub fn has_errors(&self) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.severity == Severity::Error)
    }

    /// Returns the number of recorded diagnostics.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consumes the sink and returns the ordered entries.
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
