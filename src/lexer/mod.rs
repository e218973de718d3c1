//! Streaming tokenizer for Machine Dialect source.
//!
//! Recognises multi-word natural-language operators and keywords with
//! longest-match semantics, classifies underscore-wrapped literal forms,
//! emits stopwords as a dedicated token class, and reports block depth from
//! leading `>` markers. Lexing never aborts: malformed input produces
//! [`TokenKind::Illegal`] tokens plus diagnostics and scanning continues.

mod cursor;
mod keyword;
mod literal;
pub mod token;

use crate::diag::{Diagnostic, DiagnosticCategory};
use crate::lexer::cursor::Cursor;
use crate::lexer::keyword::{
    is_stopword, lookup_bold, lookup_keyword, lookup_literal_word, lookup_operator_word,
    PhraseKind, PHRASES,
};

pub use crate::lexer::keyword::PhraseKind as KeywordPhraseKind;
pub use crate::lexer::literal::is_valid_url;
pub use crate::lexer::token::{
    IdentifierForm, KeywordKind, LiteralKind, OperatorKind, PunctKind, Token, TokenKind,
};

/// Streaming tokenizer with single-token granularity.
///
/// Call [`Lexer::next_token`] until it returns an [`TokenKind::Eof`] token;
/// further calls keep returning `Eof`. Lexical diagnostics accumulate on the
/// lexer and are drained by the caller once scanning is done.
pub struct Lexer {
    cursor: Cursor,
    diagnostics: Vec<Diagnostic>,
    at_line_start: bool,
}

impl Lexer {
    /// Creates a lexer over `source`.
    pub fn new(source: &str) -> Self {
        Self {
            cursor: Cursor::new(source),
            diagnostics: Vec::new(),
            at_line_start: true,
        }
    }

    /// Returns the lexical diagnostics collected so far.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Consumes the lexer and returns its diagnostics.
    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    /// Tokenizes an entire source, returning tokens (ending with `Eof`)
    /// and the collected diagnostics.
    pub fn tokenize(source: &str) -> (Vec<Token>, Vec<Diagnostic>) {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token();
            let done = token.is_eof();
            tokens.push(token);
            if done {
                break;
            }
        }
        (tokens, lexer.diagnostics)
    }

    /// Scans and returns the next token.
    pub fn next_token(&mut self) -> Token {
        self.skip_blank();

        let line = self.cursor.line();
        let column = self.cursor.column();
        let Some(ch) = self.cursor.peek() else {
            return Token::new(TokenKind::Eof, "", line, column);
        };

        if self.at_line_start {
            if ch == '>' {
                self.at_line_start = false;
                return self.scan_block_marker(line, column);
            }
            if ch == '#' {
                self.at_line_start = false;
                return self.scan_header_marker(line, column);
            }
        }
        self.at_line_start = false;

        match ch {
            '<' => self.scan_tag(line, column),
            '`' => self.scan_backtick_identifier(line, column),
            '"' | '\'' => self.scan_string_literal(line, column),
            '*' => self.scan_star(line, column),
            '_' => match literal::scan_underscore_literal(&mut self.cursor) {
                Some(token) => token,
                None => self.scan_word(line, column),
            },
            c if c.is_ascii_digit() => self.scan_number_literal(line, column),
            c if c.is_alphabetic() => self.scan_word(line, column),
            _ => self.scan_punct_or_illegal(line, column),
        }
    }

    // -- Whitespace and line structure --

    fn skip_blank(&mut self) {
        while let Some(ch) = self.cursor.peek() {
            match ch {
                ' ' | '\t' | '\r' => {
                    self.cursor.advance();
                }
                '\n' => {
                    self.cursor.advance();
                    self.at_line_start = true;
                }
                _ => break,
            }
        }
    }

    fn scan_block_marker(&mut self, line: u32, column: u32) -> Token {
        let mut depth: u8 = 0;
        while self.cursor.peek() == Some('>') {
            self.cursor.advance();
            depth = depth.saturating_add(1);
            while matches!(self.cursor.peek(), Some(' ') | Some('\t')) {
                self.cursor.advance();
            }
        }
        Token::new(TokenKind::BlockMarker(depth), ">".repeat(depth as usize), line, column)
    }

    fn scan_header_marker(&mut self, line: u32, column: u32) -> Token {
        let mut level: u8 = 0;
        while self.cursor.peek() == Some('#') {
            self.cursor.advance();
            level = level.saturating_add(1);
        }
        Token::new(TokenKind::HeaderMarker(level), "#".repeat(level as usize), line, column)
    }

    // -- Tags and comments --

    fn scan_tag(&mut self, line: u32, column: u32) -> Token {
        let start = self.cursor.checkpoint();
        self.cursor.advance();
        let closing = if self.cursor.peek() == Some('/') {
            self.cursor.advance();
            true
        } else {
            false
        };
        let mut name = String::new();
        while let Some(ch) = self.cursor.peek() {
            if ch.is_ascii_alphabetic() {
                name.push(ch);
                self.cursor.advance();
            } else {
                break;
            }
        }
        if self.cursor.peek() == Some('>') && !name.is_empty() {
            self.cursor.advance();
            match (closing, name.to_ascii_lowercase().as_str()) {
                (false, "summary") => return self.scan_summary_content(line, column),
                (false, "details") => {
                    return Token::new(TokenKind::DetailsOpen, "<details>", line, column)
                }
                (true, "details") => {
                    return Token::new(TokenKind::DetailsClose, "</details>", line, column)
                }
                _ => {}
            }
        }
        // Not a recognised tag: plain less-than comparison.
        self.cursor.restore(start);
        self.cursor.advance();
        Token::new(TokenKind::Operator(OperatorKind::Lt), "<", line, column)
    }

    fn scan_summary_content(&mut self, line: u32, column: u32) -> Token {
        const CLOSE: &str = "</summary>";
        let mut content = String::new();
        loop {
            if self.cursor.is_eof() {
                self.diagnostics.push(Diagnostic::error(
                    DiagnosticCategory::Lexical,
                    "unterminated <summary> comment",
                    line,
                    column,
                ));
                break;
            }
            if self.cursor.peek() == Some('<') && self.matches_ahead(CLOSE) {
                for _ in 0..CLOSE.len() {
                    self.cursor.advance();
                }
                break;
            }
            if let Some(ch) = self.cursor.advance() {
                content.push(ch);
            }
        }
        Token::new(TokenKind::Comment, content.trim(), line, column)
    }

    fn matches_ahead(&self, text: &str) -> bool {
        text.chars()
            .enumerate()
            .all(|(offset, expected)| self.cursor.peek_at(offset) == Some(expected))
    }

    // -- Identifiers, strings, numbers --

    fn scan_backtick_identifier(&mut self, line: u32, column: u32) -> Token {
        self.cursor.advance();
        let mut name = String::new();
        loop {
            match self.cursor.peek() {
                None | Some('\n') => {
                    self.diagnostics.push(Diagnostic::error(
                        DiagnosticCategory::Lexical,
                        "unterminated backtick identifier",
                        line,
                        column,
                    ));
                    return Token::new(TokenKind::Illegal, name, line, column);
                }
                Some('`') => {
                    self.cursor.advance();
                    break;
                }
                Some(ch) => {
                    name.push(ch);
                    self.cursor.advance();
                }
            }
        }
        if name.trim().is_empty() {
            self.diagnostics.push(Diagnostic::error(
                DiagnosticCategory::Lexical,
                "empty backtick identifier",
                line,
                column,
            ));
            return Token::new(TokenKind::Illegal, "``", line, column);
        }
        Token::new(
            TokenKind::Identifier(IdentifierForm::Backtick),
            name,
            line,
            column,
        )
    }

    fn scan_string_literal(&mut self, line: u32, column: u32) -> Token {
        let scanned = literal::scan_string(&mut self.cursor);
        if !scanned.terminated {
            self.diagnostics.push(Diagnostic::error(
                DiagnosticCategory::Lexical,
                "unterminated string literal",
                line,
                column,
            ));
            return Token::new(TokenKind::Illegal, scanned.value, line, column);
        }
        let kind = if literal::is_valid_url(&scanned.value) {
            LiteralKind::Url
        } else {
            LiteralKind::Text
        };
        Token::new(TokenKind::Literal(kind), scanned.value, line, column)
    }

    fn scan_number_literal(&mut self, line: u32, column: u32) -> Token {
        let (text, is_float) = literal::scan_number(&mut self.cursor);
        let kind = if is_float {
            LiteralKind::Float
        } else {
            LiteralKind::Int
        };
        Token::new(TokenKind::Literal(kind), text, line, column)
    }

    // -- Bold keywords and the star operators --

    fn scan_star(&mut self, line: u32, column: u32) -> Token {
        if self.cursor.peek_at(1) != Some('*') {
            self.cursor.advance();
            return Token::new(TokenKind::Operator(OperatorKind::Star), "*", line, column);
        }

        let start = self.cursor.checkpoint();
        self.cursor.advance();
        self.cursor.advance();

        let mut content = String::new();
        let mut closed = false;
        loop {
            match self.cursor.peek() {
                None | Some('\n') => break,
                Some('*') if self.cursor.peek_at(1) == Some('*') => {
                    self.cursor.advance();
                    self.cursor.advance();
                    closed = true;
                    break;
                }
                Some(ch) => {
                    content.push(ch);
                    self.cursor.advance();
                }
            }
        }

        if closed {
            let inner = content.trim().to_string();
            match lookup_bold(&inner) {
                Some(PhraseKind::Keyword(keyword)) => {
                    return Token::new(TokenKind::Keyword(keyword), inner, line, column)
                }
                Some(PhraseKind::Operator(operator)) => {
                    return Token::new(TokenKind::Operator(operator), inner, line, column)
                }
                None => {
                    self.diagnostics.push(Diagnostic::error(
                        DiagnosticCategory::Lexical,
                        format!("`{inner}` inside bold markers is not a keyword"),
                        line,
                        column,
                    ));
                }
            }
        }

        // Re-lex the content as ordinary tokens after the power operator.
        self.cursor.restore(start);
        self.cursor.advance();
        self.cursor.advance();
        Token::new(TokenKind::Operator(OperatorKind::Pow), "**", line, column)
    }

    // -- Words, phrases, keywords --

    fn scan_word(&mut self, line: u32, column: u32) -> Token {
        let mut word = String::new();
        while let Some(ch) = self.cursor.peek() {
            if ch.is_alphanumeric() || ch == '_' {
                word.push(ch);
                self.cursor.advance();
            } else {
                break;
            }
        }

        if let Some(token) = self.try_phrase(&word, line, column) {
            return token;
        }
        if let Some(keyword) = lookup_keyword(&word) {
            return Token::new(TokenKind::Keyword(keyword), word, line, column);
        }
        if let Some(operator) = lookup_operator_word(&word) {
            return Token::new(TokenKind::Operator(operator), word, line, column);
        }
        if let Some(kind) = lookup_literal_word(&word) {
            return Token::new(TokenKind::Literal(kind), word, line, column);
        }
        if is_stopword(&word) {
            return Token::new(TokenKind::Stopword, word, line, column);
        }
        Token::new(
            TokenKind::Identifier(IdentifierForm::Bare),
            word,
            line,
            column,
        )
    }

    /// Attempts longest-match phrase recognition starting at `first_word`.
    ///
    /// Interior whitespace (spaces/tabs) between phrase words is consumed;
    /// a phrase never crosses a line boundary.
    fn try_phrase(&mut self, first_word: &str, line: u32, column: u32) -> Option<Token> {
        let first_lower = first_word.to_ascii_lowercase();
        for (phrase, kind) in PHRASES {
            if phrase[0] != first_lower {
                continue;
            }
            let start = self.cursor.checkpoint();
            let mut words = vec![first_word.to_string()];
            let mut matched = true;
            for expected in &phrase[1..] {
                while matches!(self.cursor.peek(), Some(' ') | Some('\t')) {
                    self.cursor.advance();
                }
                let mut word = String::new();
                while let Some(ch) = self.cursor.peek() {
                    if ch.is_ascii_alphabetic() {
                        word.push(ch);
                        self.cursor.advance();
                    } else {
                        break;
                    }
                }
                if word.to_ascii_lowercase() != **expected {
                    matched = false;
                    break;
                }
                words.push(word);
            }
            if matched {
                let lexeme = words.join(" ");
                let token = match kind {
                    PhraseKind::Keyword(keyword) => {
                        Token::new(TokenKind::Keyword(*keyword), lexeme, line, column)
                    }
                    PhraseKind::Operator(operator) => {
                        Token::new(TokenKind::Operator(*operator), lexeme, line, column)
                    }
                };
                return Some(token);
            }
            self.cursor.restore(start);
        }
        None
    }

    // -- Punctuation --

    fn scan_punct_or_illegal(&mut self, line: u32, column: u32) -> Token {
        let ch = match self.cursor.advance() {
            Some(ch) => ch,
            None => return Token::new(TokenKind::Eof, "", line, column),
        };
        let kind = match ch {
            '.' => TokenKind::Punct(PunctKind::Period),
            ',' => TokenKind::Punct(PunctKind::Comma),
            ':' => TokenKind::Punct(PunctKind::Colon),
            ';' => TokenKind::Punct(PunctKind::Semicolon),
            '(' => TokenKind::Punct(PunctKind::LParen),
            ')' => TokenKind::Punct(PunctKind::RParen),
            '+' => TokenKind::Operator(OperatorKind::Plus),
            '-' => TokenKind::Operator(OperatorKind::Minus),
            '/' => TokenKind::Operator(OperatorKind::Slash),
            '%' => TokenKind::Operator(OperatorKind::Percent),
            '>' => TokenKind::Operator(OperatorKind::Gt),
            _ => {
                self.diagnostics.push(Diagnostic::error(
                    DiagnosticCategory::Lexical,
                    format!("invalid character `{ch}`"),
                    line,
                    column,
                ));
                TokenKind::Illegal
            }
        };
        Token::new(kind, ch.to_string(), line, column)
    }
}
