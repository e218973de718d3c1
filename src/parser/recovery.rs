//! Panic-mode recovery contracts.
//!
//! On an unexpected token the parser collects tokens up to the next
//! synchronisation point, records them on an error node, and continues.
//! Recovery is bounded so pathological input cannot loop forever.

use crate::lexer::{KeywordKind, PunctKind, Token, TokenKind};

/// Maximum panic-mode recoveries before the parser gives up on the rest
/// of the input.
pub const MAX_RECOVERIES: u32 = 20;

/// Returns `true` when `token` is a resynchronisation point.
///
/// Periods end the malformed statement (and are consumed by recovery);
/// statement keywords, block structure, and end of input begin new context
/// (and are left in place).
pub fn is_sync_point(token: &Token) -> bool {
    token.is_eof()
        || token.is_punct(PunctKind::Period)
        || token.starts_statement()
        || matches!(
            token.kind,
            TokenKind::BlockMarker(_)
                | TokenKind::DetailsClose
                | TokenKind::Keyword(KeywordKind::Else | KeywordKind::Otherwise)
        )
}
