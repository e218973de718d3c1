//! Keyword, operator-word, phrase, and stopword lookup tables.
//!
//! All matching is ASCII case-insensitive. Multi-word phrases are listed
//! longest-first so the scanner's first full match is the longest match.

use crate::lexer::token::{KeywordKind, LiteralKind, OperatorKind};

/// Token produced by a matched keyword phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhraseKind {
    /// The phrase is an operator (`is greater than`, ...).
    Operator(OperatorKind),
    /// The phrase is a keyword (`give back`, ...).
    Keyword(KeywordKind),
}

/// Multi-word operator/keyword phrases, longest-first.
///
/// Entries sharing a head word must keep the longer phrase earlier so that
/// `is not strictly equal to` wins over `is not equal to`.
pub const PHRASES: &[(&[&str], PhraseKind)] = &[
    (
        &["is", "greater", "than", "or", "equal", "to"],
        PhraseKind::Operator(OperatorKind::Gte),
    ),
    (
        &["is", "less", "than", "or", "equal", "to"],
        PhraseKind::Operator(OperatorKind::Lte),
    ),
    (
        &["is", "not", "strictly", "equal", "to"],
        PhraseKind::Operator(OperatorKind::StrictNotEq),
    ),
    (
        &["is", "strictly", "equal", "to"],
        PhraseKind::Operator(OperatorKind::StrictEq),
    ),
    (
        &["is", "not", "equal", "to"],
        PhraseKind::Operator(OperatorKind::NotEq),
    ),
    (
        &["is", "the", "same", "as"],
        PhraseKind::Operator(OperatorKind::Eq),
    ),
    (
        &["is", "greater", "than"],
        PhraseKind::Operator(OperatorKind::Gt),
    ),
    (
        &["is", "less", "than"],
        PhraseKind::Operator(OperatorKind::Lt),
    ),
    (
        &["is", "equal", "to"],
        PhraseKind::Operator(OperatorKind::Eq),
    ),
    (
        &["does", "not", "equal"],
        PhraseKind::Operator(OperatorKind::NotEq),
    ),
    (
        &["gives", "back"],
        PhraseKind::Keyword(KeywordKind::GiveBack),
    ),
    (
        &["give", "back"],
        PhraseKind::Keyword(KeywordKind::GiveBack),
    ),
];

/// Maps a single word onto a statement keyword.
pub fn lookup_keyword(word: &str) -> Option<KeywordKind> {
    let lowered = word.to_ascii_lowercase();
    let kind = match lowered.as_str() {
        "set" => KeywordKind::Set,
        "to" => KeywordKind::To,
        "if" => KeywordKind::If,
        "when" => KeywordKind::When,
        "whenever" => KeywordKind::Whenever,
        "then" => KeywordKind::Then,
        "else" => KeywordKind::Else,
        "otherwise" => KeywordKind::Otherwise,
        "call" | "use" | "apply" => KeywordKind::Call,
        "with" => KeywordKind::With,
        "action" => KeywordKind::Action,
        "interaction" => KeywordKind::Interaction,
        "say" => KeywordKind::Say,
        "as" => KeywordKind::As,
        _ => return None,
    };
    Some(kind)
}

/// Maps a single word onto an operator.
pub fn lookup_operator_word(word: &str) -> Option<OperatorKind> {
    let lowered = word.to_ascii_lowercase();
    let kind = match lowered.as_str() {
        "not" => OperatorKind::Not,
        "and" => OperatorKind::And,
        "or" => OperatorKind::Or,
        "equals" => OperatorKind::Eq,
        _ => return None,
    };
    Some(kind)
}

/// Maps a bare word onto a boolean/empty literal class.
pub fn lookup_literal_word(word: &str) -> Option<LiteralKind> {
    let lowered = word.to_ascii_lowercase();
    let kind = match lowered.as_str() {
        "true" | "yes" => LiteralKind::True,
        "false" | "no" => LiteralKind::False,
        "empty" => LiteralKind::Empty,
        _ => return None,
    };
    Some(kind)
}

/// Returns `true` for the fixed stopword set.
///
/// A bare `is` only reaches this table after phrase matching failed.
pub fn is_stopword(word: &str) -> bool {
    matches!(
        word.to_ascii_lowercase().as_str(),
        "a" | "an" | "the" | "is" | "are" | "was" | "were" | "be" | "been"
    )
}

/// Resolves bold-wrapped content (`**Set**`, `**give back**`) to its token.
///
/// Returns `None` when the content matches no keyword or keyword phrase;
/// the caller then re-lexes the content as its constituent tokens.
pub fn lookup_bold(content: &str) -> Option<PhraseKind> {
    let words: Vec<String> = content
        .split_whitespace()
        .map(|word| word.to_ascii_lowercase())
        .collect();
    match words.len() {
        0 => None,
        1 => lookup_keyword(&words[0])
            .map(PhraseKind::Keyword)
            .or_else(|| lookup_operator_word(&words[0]).map(PhraseKind::Operator)),
        _ => PHRASES
            .iter()
            .find(|(phrase, _)| {
                phrase.len() == words.len()
                    && phrase.iter().zip(&words).all(|(expected, got)| *expected == got)
            })
            .map(|(_, kind)| *kind),
    }
}
