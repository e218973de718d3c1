//! Literal scanning: numbers, strings, URLs, and underscore-wrapped forms.

use crate::lexer::cursor::Cursor;
use crate::lexer::token::{LiteralKind, Token, TokenKind};

/// Scans digits with an optional single `.digits` fraction.
///
/// The cursor must sit on an ASCII digit. Returns the scanned text and
/// whether a fraction was consumed. No exponent forms exist in v1.
pub(super) fn scan_number(cursor: &mut Cursor) -> (String, bool) {
    let mut text = String::new();
    let mut has_dot = false;
    while let Some(ch) = cursor.peek() {
        if ch.is_ascii_digit() {
            text.push(ch);
            cursor.advance();
        } else if ch == '.' && !has_dot {
            // Only a digit-led fraction continues the number; `42.` is an
            // integer followed by a period terminator.
            match cursor.peek_at(1) {
                Some(next) if next.is_ascii_digit() => {
                    has_dot = true;
                    text.push(ch);
                    cursor.advance();
                }
                _ => break,
            }
        } else {
            break;
        }
    }
    (text, has_dot)
}

/// Result of a quoted-string scan.
pub(super) struct ScannedString {
    /// Cooked content with escapes resolved and quotes removed.
    pub value: String,
    /// `false` when input ended before the closing quote.
    pub terminated: bool,
}

/// Scans a single- or double-quoted string.
///
/// The cursor must sit on the opening quote. Backslash escapes only the
/// quote character and the backslash itself; everything else is literal.
/// The scan stops at the closing quote, a newline, or end of input.
pub(super) fn scan_string(cursor: &mut Cursor) -> ScannedString {
    let quote = cursor.advance().unwrap_or('"');
    let mut value = String::new();
    loop {
        match cursor.peek() {
            None | Some('\n') => {
                return ScannedString {
                    value,
                    terminated: false,
                }
            }
            Some('\\') => {
                let next = cursor.peek_at(1);
                if next == Some(quote) || next == Some('\\') {
                    cursor.advance();
                    if let Some(escaped) = cursor.advance() {
                        value.push(escaped);
                    }
                } else {
                    cursor.advance();
                    value.push('\\');
                }
            }
            Some(ch) if ch == quote => {
                cursor.advance();
                return ScannedString {
                    value,
                    terminated: true,
                };
            }
            Some(ch) => {
                cursor.advance();
                value.push(ch);
            }
        }
    }
}

/// Returns `true` when `text` has the shape of an absolute URI.
///
/// Checks the RFC-3986 scheme production (`ALPHA *( ALPHA / DIGIT / "+" /
/// "-" / "." )`) followed by `://` and a non-empty remainder without
/// whitespace or control characters. `mailto:` and `urn:` forms are also
/// accepted without the authority slashes.
pub fn is_valid_url(text: &str) -> bool {
    let Some(colon) = text.find(':') else {
        return false;
    };
    let (scheme, rest) = text.split_at(colon);
    let rest = &rest[1..];
    let mut scheme_chars = scheme.chars();
    let Some(first) = scheme_chars.next() else {
        return false;
    };
    if !first.is_ascii_alphabetic() {
        return false;
    }
    if !scheme_chars.all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '+' | '-' | '.')) {
        return false;
    }
    if text.chars().any(|ch| ch.is_whitespace() || ch.is_control()) {
        return false;
    }
    let lowered = scheme.to_ascii_lowercase();
    if lowered == "mailto" || lowered == "urn" {
        return !rest.is_empty();
    }
    match rest.strip_prefix("//") {
        Some(authority) => !authority.is_empty(),
        None => false,
    }
}

/// Scans an underscore-wrapped literal (`_42_`, `_-3.14_`, `_"hi"_`,
/// `_Yes_`, `_No_`, `_empty_`).
///
/// The cursor must sit on the opening underscore. Returns `None` (with the
/// cursor restored) when the wrapped form does not parse; the caller then
/// treats the underscore as an ordinary word character.
pub(super) fn scan_underscore_literal(cursor: &mut Cursor) -> Option<Token> {
    let start = cursor.checkpoint();
    let line = cursor.line();
    let column = cursor.column();
    cursor.advance();

    let token = match cursor.peek() {
        Some(ch) if ch.is_ascii_digit() || ch == '-' => {
            let mut text = String::new();
            if ch == '-' {
                cursor.advance();
                text.push('-');
                if !matches!(cursor.peek(), Some(next) if next.is_ascii_digit()) {
                    cursor.restore(start);
                    return None;
                }
            }
            let (digits, is_float) = scan_number(cursor);
            text.push_str(&digits);
            let kind = if is_float {
                LiteralKind::Float
            } else {
                LiteralKind::Int
            };
            Token::new(TokenKind::Literal(kind), text, line, column)
        }
        Some('"') | Some('\'') => {
            let scanned = scan_string(cursor);
            if !scanned.terminated {
                cursor.restore(start);
                return None;
            }
            let kind = if is_valid_url(&scanned.value) {
                LiteralKind::Url
            } else {
                LiteralKind::Text
            };
            Token::new(TokenKind::Literal(kind), scanned.value, line, column)
        }
        Some(ch) if ch.is_alphabetic() => {
            let mut word = String::new();
            while let Some(next) = cursor.peek() {
                if next.is_alphanumeric() {
                    word.push(next);
                    cursor.advance();
                } else {
                    break;
                }
            }
            let kind = match word.to_ascii_lowercase().as_str() {
                "yes" | "true" => LiteralKind::True,
                "no" | "false" => LiteralKind::False,
                "empty" => LiteralKind::Empty,
                _ => {
                    cursor.restore(start);
                    return None;
                }
            };
            Token::new(TokenKind::Literal(kind), word, line, column)
        }
        _ => {
            cursor.restore(start);
            return None;
        }
    };

    if cursor.peek() == Some('_') {
        cursor.advance();
        Some(token)
    } else {
        cursor.restore(start);
        None
    }
}
