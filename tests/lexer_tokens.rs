//! Lexer tests: keywords, phrases, stopwords, markers, bold forms.

use machine_dialect::lexer::{
    IdentifierForm, KeywordKind, Lexer, LiteralKind, OperatorKind, PunctKind, Token, TokenKind,
};

fn kinds(source: &str) -> Vec<TokenKind> {
    let (tokens, _) = Lexer::tokenize(source);
    tokens.into_iter().map(|token| token.kind).collect()
}

fn tokens(source: &str) -> Vec<Token> {
    let (tokens, _) = Lexer::tokenize(source);
    tokens
}

#[test]
fn keywords_are_case_insensitive() {
    for spelling in ["Set", "set", "SET", "sEt"] {
        assert_eq!(
            kinds(spelling),
            vec![TokenKind::Keyword(KeywordKind::Set), TokenKind::Eof],
            "spelling {spelling:?}"
        );
    }
}

#[test]
fn call_synonyms_collapse() {
    for spelling in ["call", "use", "Apply"] {
        assert_eq!(
            kinds(spelling),
            vec![TokenKind::Keyword(KeywordKind::Call), TokenKind::Eof],
            "spelling {spelling:?}"
        );
    }
}

#[test]
fn multi_word_phrases_use_longest_match() {
    assert_eq!(
        kinds("is greater than or equal to"),
        vec![TokenKind::Operator(OperatorKind::Gte), TokenKind::Eof]
    );
    assert_eq!(
        kinds("is greater than"),
        vec![TokenKind::Operator(OperatorKind::Gt), TokenKind::Eof]
    );
    assert_eq!(
        kinds("is not strictly equal to"),
        vec![TokenKind::Operator(OperatorKind::StrictNotEq), TokenKind::Eof]
    );
    assert_eq!(
        kinds("is strictly equal to"),
        vec![TokenKind::Operator(OperatorKind::StrictEq), TokenKind::Eof]
    );
}

#[test]
fn phrase_matching_consumes_interior_whitespace() {
    assert_eq!(
        kinds("is   greater \t than"),
        vec![TokenKind::Operator(OperatorKind::Gt), TokenKind::Eof]
    );
}

#[test]
fn phrases_do_not_cross_line_boundaries() {
    let result = kinds("is greater\nthan");
    // The bare `is` falls back to a stopword; the rest are identifiers.
    assert_eq!(
        result,
        vec![
            TokenKind::Stopword,
            TokenKind::Identifier(IdentifierForm::Bare),
            TokenKind::Identifier(IdentifierForm::Bare),
            TokenKind::Eof
        ]
    );
}

#[test]
fn give_back_variants_become_one_keyword() {
    assert_eq!(
        kinds("give back"),
        vec![TokenKind::Keyword(KeywordKind::GiveBack), TokenKind::Eof]
    );
    assert_eq!(
        kinds("Gives Back"),
        vec![TokenKind::Keyword(KeywordKind::GiveBack), TokenKind::Eof]
    );
}

#[test]
fn stopwords_get_their_own_class() {
    for word in ["a", "an", "the", "is", "are", "was", "were", "be", "been"] {
        assert_eq!(
            kinds(word),
            vec![TokenKind::Stopword, TokenKind::Eof],
            "word {word:?}"
        );
    }
}

#[test]
fn equals_is_an_operator_word() {
    assert_eq!(
        kinds("equals"),
        vec![TokenKind::Operator(OperatorKind::Eq), TokenKind::Eof]
    );
}

#[test]
fn block_markers_report_depth() {
    assert_eq!(
        kinds(">"),
        vec![TokenKind::BlockMarker(1), TokenKind::Eof]
    );
    assert_eq!(
        kinds(">>>"),
        vec![TokenKind::BlockMarker(3), TokenKind::Eof]
    );
    assert_eq!(
        kinds("> > x"),
        vec![
            TokenKind::BlockMarker(2),
            TokenKind::Identifier(IdentifierForm::Bare),
            TokenKind::Eof
        ]
    );
}

#[test]
fn greater_than_mid_line_is_an_operator() {
    assert_eq!(
        kinds("x > y"),
        vec![
            TokenKind::Identifier(IdentifierForm::Bare),
            TokenKind::Operator(OperatorKind::Gt),
            TokenKind::Identifier(IdentifierForm::Bare),
            TokenKind::Eof
        ]
    );
}

#[test]
fn header_markers_report_level() {
    assert_eq!(
        kinds("### x"),
        vec![
            TokenKind::HeaderMarker(3),
            TokenKind::Identifier(IdentifierForm::Bare),
            TokenKind::Eof
        ]
    );
}

#[test]
fn backtick_identifiers_preserve_interior_text() {
    let scanned = tokens("`name with spaces` `with-hyphen`");
    assert_eq!(
        scanned[0].kind,
        TokenKind::Identifier(IdentifierForm::Backtick)
    );
    assert_eq!(scanned[0].lexeme, "name with spaces");
    assert_eq!(scanned[1].lexeme, "with-hyphen");
}

#[test]
fn unterminated_backtick_identifier_is_illegal() {
    let (scanned, diagnostics) = Lexer::tokenize("`broken\n");
    assert_eq!(scanned[0].kind, TokenKind::Illegal);
    assert_eq!(diagnostics.len(), 1);
}

#[test]
fn bold_keyword_resolves_to_keyword() {
    assert_eq!(
        kinds("**Set**"),
        vec![TokenKind::Keyword(KeywordKind::Set), TokenKind::Eof]
    );
    assert_eq!(
        kinds("**give back**"),
        vec![TokenKind::Keyword(KeywordKind::GiveBack), TokenKind::Eof]
    );
}

#[test]
fn bold_non_keyword_reports_and_splits() {
    let (scanned, diagnostics) = Lexer::tokenize("**shout**");
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(scanned[0].kind, TokenKind::Operator(OperatorKind::Pow));
    assert_eq!(scanned[1].kind, TokenKind::Identifier(IdentifierForm::Bare));
    assert_eq!(scanned[2].kind, TokenKind::Operator(OperatorKind::Pow));
}

#[test]
fn power_operator_still_lexes() {
    let (scanned, diagnostics) = Lexer::tokenize("2 ** 3");
    assert!(diagnostics.is_empty());
    assert_eq!(scanned[1].kind, TokenKind::Operator(OperatorKind::Pow));
}

#[test]
fn summary_comment_is_a_comment_token() {
    let scanned = tokens("<summary>explains things</summary>");
    assert_eq!(scanned[0].kind, TokenKind::Comment);
    assert_eq!(scanned[0].lexeme, "explains things");
}

#[test]
fn details_tags_are_recognised() {
    assert_eq!(
        kinds("<details></details>"),
        vec![TokenKind::DetailsOpen, TokenKind::DetailsClose, TokenKind::Eof]
    );
}

#[test]
fn stray_less_than_is_an_operator() {
    assert_eq!(
        kinds("x < y"),
        vec![
            TokenKind::Identifier(IdentifierForm::Bare),
            TokenKind::Operator(OperatorKind::Lt),
            TokenKind::Identifier(IdentifierForm::Bare),
            TokenKind::Eof
        ]
    );
}

#[test]
fn punctuation_and_literals_mix() {
    assert_eq!(
        kinds("( _1_ , _2_ ) ."),
        vec![
            TokenKind::Punct(PunctKind::LParen),
            TokenKind::Literal(LiteralKind::Int),
            TokenKind::Punct(PunctKind::Comma),
            TokenKind::Literal(LiteralKind::Int),
            TokenKind::Punct(PunctKind::RParen),
            TokenKind::Punct(PunctKind::Period),
            TokenKind::Eof
        ]
    );
}

#[test]
fn invalid_character_is_illegal_and_lexing_continues() {
    let (scanned, diagnostics) = Lexer::tokenize("@ _1_");
    assert_eq!(scanned[0].kind, TokenKind::Illegal);
    assert_eq!(scanned[1].kind, TokenKind::Literal(LiteralKind::Int));
    assert_eq!(diagnostics.len(), 1);
}

#[test]
fn positions_are_one_based() {
    let scanned = tokens("Set `x`\nto");
    assert_eq!((scanned[0].line, scanned[0].column), (1, 1));
    assert_eq!((scanned[1].line, scanned[1].column), (1, 5));
    assert_eq!((scanned[2].line, scanned[2].column), (2, 1));
}
