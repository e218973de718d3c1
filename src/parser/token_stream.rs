//! Lexer-backed token stream with bounded lookahead.

use std::collections::VecDeque;

use crate::diag::Diagnostic;
use crate::lexer::{Lexer, Token, TokenKind};

/// Maximum supported lookahead index (`peek(0..=3)`).
pub const MAX_LOOKAHEAD: usize = 3;

/// Fixed-lookahead token stream over the lexer.
///
/// The stream optionally filters trivia (stopwords and comments) so the
/// grammar code never sees them; the produced AST is therefore identical
/// with or without filler words in the source.
pub struct TokenStream {
    lexer: Lexer,
    lookahead: VecDeque<Token>,
    skip_trivia: bool,
}

impl TokenStream {
    /// Creates a stream that skips stopwords and comments.
    pub fn new(lexer: Lexer) -> Self {
        Self::with_trivia_filter(lexer, true)
    }

    /// Creates a stream with explicit trivia filtering behaviour.
    pub fn with_trivia_filter(lexer: Lexer, skip_trivia: bool) -> Self {
        Self {
            lexer,
            lookahead: VecDeque::new(),
            skip_trivia,
        }
    }

    /// Peeks a token by bounded lookahead index.
    ///
    /// `peek(0)` is the next token to be consumed by [`Self::next`].
    /// Indices past the end of input observe the `Eof` token.
    pub fn peek(&mut self, n: usize) -> &Token {
        debug_assert!(n <= MAX_LOOKAHEAD, "lookahead bound exceeded");
        self.fill_to(n);
        &self.lookahead[n]
    }

    /// Consumes and returns the next token.
    ///
    /// At end of input this keeps returning the `Eof` token.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Token {
        self.fill_to(0);
        let token = self.lookahead.pop_front().unwrap_or_else(|| {
            Token::new(TokenKind::Eof, "", 0, 0)
        });
        if token.is_eof() {
            // Keep Eof observable for subsequent peeks.
            self.lookahead.push_front(token.clone());
        }
        token
    }

    /// Consumes and returns the next token when the predicate matches.
    pub fn consume_if<P>(&mut self, predicate: P) -> Option<Token>
    where
        P: Fn(&Token) -> bool,
    {
        if predicate(self.peek(0)) {
            Some(self.next())
        } else {
            None
        }
    }

    /// Returns the lexical diagnostics collected so far.
    pub fn lexer_diagnostics(&self) -> &[Diagnostic] {
        self.lexer.diagnostics()
    }

    /// Consumes the stream and returns the lexer diagnostics.
    pub fn into_lexer_diagnostics(self) -> Vec<Diagnostic> {
        self.lexer.into_diagnostics()
    }

    fn fill_to(&mut self, index: usize) {
        while self.lookahead.len() <= index {
            let token = self.pull();
            let done = token.is_eof();
            self.lookahead.push_back(token);
            if done && self.lookahead.len() <= index {
                // Pad with Eof clones so deep peeks stay in bounds.
                let eof = self.lookahead.back().cloned().unwrap_or_else(|| {
                    Token::new(TokenKind::Eof, "", 0, 0)
                });
                while self.lookahead.len() <= index {
                    self.lookahead.push_back(eof.clone());
                }
            }
        }
    }

    fn pull(&mut self) -> Token {
        loop {
            let token = self.lexer.next_token();
            if self.skip_trivia
                && matches!(token.kind, TokenKind::Stopword | TokenKind::Comment)
            {
                continue;
            }
            return token;
        }
    }
}
