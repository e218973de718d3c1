//! Statement-level parsing with panic-mode recovery.

use crate::diag::Diagnostic;
use crate::lexer::{KeywordKind, Lexer, OperatorKind, PunctKind, Token, TokenKind};
use crate::parser::ast::{
    Arguments, Block, ErrorStatement, Identifier, MethodDefinition, NamedArgument, Parameter,
    Program, Statement, Visibility,
};
use crate::parser::error::{ParseError, ParseErrorKind};
use crate::parser::expr::Precedence;
use crate::parser::recovery::{is_sync_point, MAX_RECOVERIES};
use crate::parser::token_stream::TokenStream;

/// Parser behaviour options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Panic-mode recovery budget per parse.
    pub max_recoveries: u32,
    /// Whether stopwords/comments are filtered before the grammar.
    pub skip_stopwords: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_recoveries: MAX_RECOVERIES,
            skip_stopwords: true,
        }
    }
}

/// Hybrid recursive-descent + Pratt parser.
pub struct Parser {
    stream: TokenStream,
    options: ParseOptions,
    diagnostics: Vec<Diagnostic>,
    recoveries: u32,
}

impl Parser {
    /// Creates a parser with default options.
    pub fn new(lexer: Lexer) -> Self {
        Self::with_options(lexer, ParseOptions::default())
    }

    /// Creates a parser with explicit options.
    pub fn with_options(lexer: Lexer, options: ParseOptions) -> Self {
        Self {
            stream: TokenStream::with_trivia_filter(lexer, options.skip_stopwords),
            options,
            diagnostics: Vec::new(),
            recoveries: 0,
        }
    }

    /// Creates a parser directly over a source string.
    pub fn from_source(source: &str) -> Self {
        Self::new(Lexer::new(source))
    }

    /// Parses a whole program, recovering from syntax errors.
    pub fn parse_program(&mut self) -> Program {
        let mut program = Program::default();
        loop {
            self.skip_presentational();
            if self.peek(0).is_eof() {
                break;
            }
            if self.recoveries >= self.options.max_recoveries {
                let token = self.peek(0).clone();
                self.report(ParseError::new(
                    ParseErrorKind::TooManyErrors,
                    "too many syntax errors; giving up on the rest of the input",
                    token.line,
                    token.column,
                ));
                while !self.peek(0).is_eof() {
                    self.advance();
                }
                break;
            }
            program.statements.push(self.parse_statement(0));
        }
        program
    }

    /// Returns the syntax diagnostics collected so far (parser side only).
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Consumes the parser and returns all diagnostics (lexical first,
    /// then syntactic), stably ordered by source position.
    pub fn finish(self) -> Vec<Diagnostic> {
        let mut merged = self.stream.into_lexer_diagnostics();
        merged.extend(self.diagnostics);
        merged.sort_by_key(|diagnostic| (diagnostic.line, diagnostic.column));
        merged
    }

    // -- Token helpers shared with the expression parser --

    pub(super) fn peek(&mut self, n: usize) -> &Token {
        self.stream.peek(n)
    }

    pub(super) fn advance(&mut self) -> Token {
        self.stream.next()
    }

    pub(super) fn report(&mut self, error: ParseError) {
        let diagnostic = error.into_diagnostic();
        if !self.diagnostics.contains(&diagnostic) {
            self.diagnostics.push(diagnostic);
        }
    }

    pub(super) fn consume_keyword(&mut self, keyword: KeywordKind) -> Option<Token> {
        self.stream.consume_if(|token| token.is_keyword(keyword))
    }

    pub(super) fn consume_punct(&mut self, punct: PunctKind) -> Option<Token> {
        self.stream.consume_if(|token| token.is_punct(punct))
    }

    fn expect_keyword(&mut self, keyword: KeywordKind, expected: &str) -> Result<Token, ParseError> {
        match self.consume_keyword(keyword) {
            Some(token) => Ok(token),
            None => Err(ParseError::unexpected_token(self.peek(0), expected)),
        }
    }

    pub(super) fn expect_backtick_identifier(
        &mut self,
        expected: &str,
    ) -> Result<Identifier, ParseError> {
        if self.peek(0).is_backtick_identifier() {
            Ok(Identifier::from_token(self.advance()))
        } else {
            Err(ParseError::unexpected_token(self.peek(0), expected))
        }
    }

    fn expect_terminator(&mut self) {
        if self.consume_punct(PunctKind::Period).is_some() {
            return;
        }
        if !self.peek(0).is_eof() {
            let error = ParseError::missing_terminator(self.peek(0));
            self.report(error);
        }
    }

    // -- Presentational markdown --

    /// Skips prose headers and stray details markers between statements.
    fn skip_presentational(&mut self) {
        loop {
            let kind = self.peek(0).kind;
            match kind {
                TokenKind::HeaderMarker(_) if !self.header_opens_method() => {
                    self.skip_header_line();
                }
                TokenKind::DetailsOpen | TokenKind::DetailsClose => {
                    self.advance();
                }
                _ => break,
            }
        }
    }

    fn header_opens_method(&mut self) -> bool {
        matches!(
            self.peek(1).kind,
            TokenKind::Keyword(KeywordKind::Action | KeywordKind::Interaction)
        )
    }

    fn skip_header_line(&mut self) {
        let marker = self.advance();
        self.skip_rest_of_line(marker.line);
    }

    fn skip_rest_of_line(&mut self, line: u32) {
        loop {
            let token = self.peek(0);
            if token.is_eof() || token.line != line {
                break;
            }
            if matches!(
                token.kind,
                TokenKind::DetailsClose | TokenKind::HeaderMarker(_)
            ) {
                break;
            }
            self.advance();
        }
    }

    // -- Statements --

    fn parse_statement(&mut self, depth: u8) -> Statement {
        loop {
            let kind = self.peek(0).kind;
            return match kind {
                TokenKind::Keyword(KeywordKind::Set) => self.parse_set(),
                TokenKind::Keyword(KeywordKind::GiveBack) => self.parse_return(),
                TokenKind::Keyword(
                    KeywordKind::If | KeywordKind::When | KeywordKind::Whenever,
                ) => self.parse_if(depth),
                TokenKind::Keyword(KeywordKind::Call) => self.parse_call_statement(),
                TokenKind::Keyword(KeywordKind::Say) => self.parse_say(),
                TokenKind::HeaderMarker(_) if self.header_opens_method() => self.parse_method(),
                TokenKind::HeaderMarker(_) => {
                    self.skip_header_line();
                    continue;
                }
                TokenKind::BlockMarker(_) => Statement::Block(self.parse_block(depth)),
                _ => self.parse_expression_statement(),
            };
        }
    }

    fn parse_set(&mut self) -> Statement {
        let token = self.advance();
        let name = match self.expect_backtick_identifier("a backtick variable name after `Set`") {
            Ok(name) => name,
            Err(error) => return self.recover_statement(token, Some(error)),
        };
        if let Err(error) = self.expect_keyword(KeywordKind::To, "`to` after the variable name") {
            return self.recover_statement(token, Some(error));
        }
        let value = self.parse_expression(Precedence::Lowest);
        if value.is_error() {
            return self.recover_statement(token, None);
        }
        self.expect_terminator();
        Statement::Set { token, name, value }
    }

    fn parse_return(&mut self) -> Statement {
        let token = self.advance();
        let value = if self.peek(0).is_punct(PunctKind::Period) || self.peek(0).is_eof() {
            None
        } else {
            let value = self.parse_expression(Precedence::Lowest);
            if value.is_error() {
                return self.recover_statement(token, None);
            }
            Some(value)
        };
        self.expect_terminator();
        Statement::Return { token, value }
    }

    fn parse_say(&mut self) -> Statement {
        let token = self.advance();
        let value = self.parse_expression(Precedence::Lowest);
        if value.is_error() {
            return self.recover_statement(token, None);
        }
        self.expect_terminator();
        Statement::Say { token, value }
    }

    fn parse_call_statement(&mut self) -> Statement {
        let token = self.advance();
        let callee = match self.expect_backtick_identifier("a backtick method name after `Call`") {
            Ok(callee) => callee,
            Err(error) => return self.recover_statement(token, Some(error)),
        };
        let arguments = if self.consume_keyword(KeywordKind::With).is_some() {
            self.parse_arguments(None)
        } else {
            Arguments::default()
        };
        self.expect_terminator();
        Statement::Call {
            token,
            callee,
            arguments,
        }
    }

    /// Parses a comma-separated mixed argument list.
    ///
    /// Stops before `closing` (when given), a period, or end of input.
    pub(super) fn parse_arguments(&mut self, closing: Option<PunctKind>) -> Arguments {
        let mut arguments = Arguments::default();
        loop {
            let token = self.peek(0).clone();
            if token.is_eof() || token.is_punct(PunctKind::Period) {
                break;
            }
            if let Some(close) = closing {
                if token.is_punct(close) {
                    break;
                }
            }
            if token.is_identifier() && self.peek(1).is_punct(PunctKind::Colon) {
                let name = Identifier::from_token(self.advance());
                self.advance();
                let value = self.parse_expression(Precedence::Lowest);
                if value.is_error() {
                    break;
                }
                if arguments
                    .named
                    .iter()
                    .any(|existing| existing.name.name == name.name)
                {
                    self.report(ParseError::duplicate_named_argument(&name.token, &name.name));
                } else {
                    arguments.named.push(NamedArgument { name, value });
                }
            } else {
                let value = self.parse_expression(Precedence::Lowest);
                if value.is_error() {
                    break;
                }
                if !arguments.named.is_empty() {
                    self.report(ParseError::positional_after_named(value.token()));
                }
                arguments.positional.push(value);
            }
            if self.consume_punct(PunctKind::Comma).is_none() {
                break;
            }
        }
        arguments
    }

    fn parse_if(&mut self, depth: u8) -> Statement {
        let token = self.advance();
        let condition = self.parse_expression(Precedence::Lowest);
        if condition.is_error() {
            return self.recover_statement(token, None);
        }
        self.consume_keyword(KeywordKind::Then);
        self.consume_punct(PunctKind::Colon);
        let consequence = self.parse_block(depth);

        let direct = matches!(
            self.peek(0).kind,
            TokenKind::Keyword(KeywordKind::Else | KeywordKind::Otherwise)
        );
        let marked = matches!(self.peek(0).kind, TokenKind::BlockMarker(d) if d == depth)
            && matches!(
                self.peek(1).kind,
                TokenKind::Keyword(KeywordKind::Else | KeywordKind::Otherwise)
            );
        let alternative = if direct || marked {
            if marked {
                self.advance();
            }
            self.advance();
            self.consume_punct(PunctKind::Colon);
            Some(self.parse_block(depth))
        } else {
            None
        };

        Statement::If {
            token,
            condition,
            consequence,
            alternative,
        }
    }

    /// Parses a block of lines whose marker depth exceeds `enclosing`.
    ///
    /// The block ends at the first line of depth ≤ `enclosing`, an
    /// `else`/`otherwise` keyword, end of input, or any non-marker token on
    /// a later line.
    fn parse_block(&mut self, enclosing: u8) -> Block {
        let first = self.peek(0).clone();
        let depth = match first.kind {
            TokenKind::BlockMarker(d) if d > enclosing => d,
            _ => {
                let error = ParseError::block_depth_mismatch(&first, enclosing);
                self.report(error);
                if matches!(first.kind, TokenKind::BlockMarker(_)) {
                    self.advance();
                }
                return Block {
                    token: first,
                    depth: enclosing.saturating_add(1),
                    statements: Vec::new(),
                };
            }
        };

        let mut statements = Vec::new();
        loop {
            match self.peek(0).kind {
                TokenKind::BlockMarker(d) if d == depth => {
                    let marker = self.advance();
                    let line = marker.line;
                    loop {
                        let token = self.peek(0);
                        if token.is_eof() || token.line != line {
                            break;
                        }
                        if matches!(
                            token.kind,
                            TokenKind::BlockMarker(_)
                                | TokenKind::Keyword(KeywordKind::Else | KeywordKind::Otherwise)
                        ) {
                            break;
                        }
                        statements.push(self.parse_statement(depth));
                    }
                }
                TokenKind::BlockMarker(d) if d > depth => {
                    statements.push(Statement::Block(self.parse_block(depth)));
                }
                _ => break,
            }
        }

        Block {
            token: first,
            depth,
            statements,
        }
    }

    // -- Method definitions --

    fn parse_method(&mut self) -> Statement {
        let token = self.advance();
        let keyword = self.advance();
        let visibility = if keyword.is_keyword(KeywordKind::Action) {
            Visibility::Private
        } else {
            Visibility::Public
        };
        self.consume_punct(PunctKind::Colon);
        let name = match self.expect_backtick_identifier("a backtick method name in the header") {
            Ok(name) => name,
            Err(error) => return self.recover_statement(token, Some(error)),
        };

        let had_details = self
            .stream
            .consume_if(|t| t.kind == TokenKind::DetailsOpen)
            .is_some();
        if !had_details {
            let error =
                ParseError::unexpected_token(self.peek(0), "`<details>` to open the method body");
            self.report(error);
        }

        let mut parameters = Vec::new();
        let mut returns_value = false;
        let mut body = Vec::new();
        loop {
            match self.peek(0).kind {
                TokenKind::Eof => {
                    if had_details {
                        let token = self.peek(0).clone();
                        self.report(ParseError::unexpected_token(
                            &token,
                            "`</details>` to close the method body",
                        ));
                    }
                    break;
                }
                TokenKind::DetailsClose => {
                    self.advance();
                    break;
                }
                TokenKind::DetailsOpen => {
                    self.advance();
                }
                TokenKind::HeaderMarker(4) => {
                    self.parse_io_section(&mut parameters, &mut returns_value);
                }
                TokenKind::HeaderMarker(_) => {
                    if had_details {
                        let token = self.peek(0).clone();
                        self.report(ParseError::unexpected_token(
                            &token,
                            "`</details>` to close the method body",
                        ));
                    }
                    break;
                }
                _ => body.push(self.parse_statement(0)),
            }
        }

        Statement::Method(MethodDefinition {
            token,
            name,
            visibility,
            parameters,
            returns_value,
            body,
        })
    }

    /// Parses an `#### Inputs` / `#### Outputs` declaration section.
    fn parse_io_section(&mut self, parameters: &mut Vec<Parameter>, returns_value: &mut bool) {
        let marker = self.advance();
        let label = self.peek(0).clone();
        let section = if label.is_identifier() {
            label.lexeme.to_ascii_lowercase()
        } else {
            String::new()
        };
        match section.as_str() {
            "inputs" => {
                self.advance();
                self.consume_punct(PunctKind::Colon);
                while self.peek(0).is_operator(OperatorKind::Minus) {
                    let dash = self.advance();
                    match self.expect_backtick_identifier("a backtick parameter name") {
                        Ok(name) => parameters.push(Parameter { name }),
                        Err(error) => self.report(error),
                    }
                    self.skip_rest_of_line(dash.line);
                }
            }
            "outputs" => {
                self.advance();
                self.consume_punct(PunctKind::Colon);
                *returns_value = true;
                while self.peek(0).is_operator(OperatorKind::Minus) {
                    let dash = self.advance();
                    self.skip_rest_of_line(dash.line);
                }
            }
            _ => {
                self.report(ParseError::unexpected_token(
                    &label,
                    "`Inputs` or `Outputs` after `####`",
                ));
                self.skip_rest_of_line(marker.line);
            }
        }
    }

    // -- Recovery --

    fn parse_expression_statement(&mut self) -> Statement {
        let token = self.peek(0).clone();
        let expression = self.parse_expression(Precedence::Lowest);
        if expression.is_error() {
            return self.recover_statement(token, None);
        }
        self.expect_terminator();
        Statement::Expression { token, expression }
    }

    /// Panic-mode recovery: records a diagnostic (when one was not already
    /// reported), skips to the next synchronisation point, and yields an
    /// error statement carrying the skipped tokens.
    pub(super) fn recover_statement(
        &mut self,
        token: Token,
        error: Option<ParseError>,
    ) -> Statement {
        if let Some(error) = error {
            self.report(error);
        }
        self.recoveries += 1;

        let mut skipped = Vec::new();
        // Guarantee progress: consume the failure token unless it opens the
        // next statement or block line.
        {
            let current = self.peek(0).clone();
            if !current.is_eof()
                && !current.starts_statement()
                && !matches!(current.kind, TokenKind::BlockMarker(_))
            {
                if current.is_punct(PunctKind::Period) {
                    self.advance();
                } else {
                    skipped.push(self.advance());
                }
            }
        }
        loop {
            let current = self.peek(0);
            if is_sync_point(current) {
                if current.is_punct(PunctKind::Period) {
                    self.advance();
                }
                break;
            }
            skipped.push(self.advance());
        }
        Statement::Error(ErrorStatement { token, skipped })
    }
}
