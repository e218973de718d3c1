//! Pratt expression parsing with operator binding powers.

use crate::lexer::{KeywordKind, LiteralKind, OperatorKind, PunctKind, TokenKind};
use crate::parser::ast::{
    ErrorExpression, Expression, Identifier, InfixOperator, PrefixOperator,
};
use crate::parser::error::ParseError;
use crate::parser::parser::Parser;

/// Operator binding powers, lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Precedence {
    /// Entry level for full expressions.
    Lowest,
    /// `X if COND else Y`
    Conditional,
    /// `or`
    LogicalOr,
    /// `and`
    LogicalAnd,
    /// `equals`, strict equality and their negations
    Equality,
    /// `<`, `>`, `<=`, `>=`
    Relational,
    /// `+`, `-`
    Additive,
    /// `*`, `/`, `%`, `**`
    Multiplicative,
    /// unary `-`, `not`
    Unary,
    /// call parentheses
    Call,
}

/// Returns the infix binding power of `kind`, if it can continue an
/// expression.
fn infix_precedence(kind: TokenKind) -> Option<Precedence> {
    let precedence = match kind {
        TokenKind::Operator(OperatorKind::Plus | OperatorKind::Minus) => Precedence::Additive,
        TokenKind::Operator(
            OperatorKind::Star | OperatorKind::Slash | OperatorKind::Percent | OperatorKind::Pow,
        ) => Precedence::Multiplicative,
        TokenKind::Operator(
            OperatorKind::Eq
            | OperatorKind::NotEq
            | OperatorKind::StrictEq
            | OperatorKind::StrictNotEq,
        ) => Precedence::Equality,
        TokenKind::Operator(
            OperatorKind::Lt | OperatorKind::Gt | OperatorKind::Lte | OperatorKind::Gte,
        ) => Precedence::Relational,
        TokenKind::Operator(OperatorKind::And) => Precedence::LogicalAnd,
        TokenKind::Operator(OperatorKind::Or) => Precedence::LogicalOr,
        TokenKind::Keyword(KeywordKind::If | KeywordKind::When) => Precedence::Conditional,
        TokenKind::Punct(PunctKind::LParen) => Precedence::Call,
        _ => return None,
    };
    Some(precedence)
}

impl Parser {
    /// Parses an expression with the given minimum binding power.
    ///
    /// On failure a diagnostic is recorded and an error expression is
    /// returned; the offending token is left for statement-level recovery.
    pub(super) fn parse_expression(&mut self, min: Precedence) -> Expression {
        let mut left = self.parse_prefix();
        if left.is_error() {
            return left;
        }
        loop {
            let Some(precedence) = infix_precedence(self.peek(0).kind) else {
                break;
            };
            if precedence <= min {
                break;
            }
            left = self.parse_infix(left, precedence);
            if left.is_error() {
                break;
            }
        }
        left
    }

    fn parse_prefix(&mut self) -> Expression {
        let token = self.peek(0).clone();
        match token.kind {
            TokenKind::Literal(LiteralKind::Int) => {
                let token = self.advance();
                match token.lexeme.parse::<i64>() {
                    Ok(value) => Expression::IntLiteral { token, value },
                    Err(_) => {
                        self.report(ParseError::integer_out_of_range(&token));
                        Expression::Error(ErrorExpression { token })
                    }
                }
            }
            TokenKind::Literal(LiteralKind::Float) => {
                let token = self.advance();
                match token.lexeme.parse::<f64>() {
                    Ok(value) => Expression::FloatLiteral { token, value },
                    Err(_) => {
                        self.report(ParseError::unexpected_token(&token, "a float literal"));
                        Expression::Error(ErrorExpression { token })
                    }
                }
            }
            TokenKind::Literal(LiteralKind::Text) => {
                let token = self.advance();
                let value = token.lexeme.clone();
                Expression::StringLiteral { token, value }
            }
            TokenKind::Literal(LiteralKind::Url) => {
                let token = self.advance();
                let value = token.lexeme.clone();
                Expression::UrlLiteral { token, value }
            }
            TokenKind::Literal(LiteralKind::True) => {
                let token = self.advance();
                Expression::BooleanLiteral { token, value: true }
            }
            TokenKind::Literal(LiteralKind::False) => {
                let token = self.advance();
                Expression::BooleanLiteral { token, value: false }
            }
            TokenKind::Literal(LiteralKind::Empty) => {
                let token = self.advance();
                Expression::EmptyLiteral { token }
            }
            TokenKind::Identifier(_) => {
                let token = self.advance();
                Expression::Identifier(Identifier::from_token(token))
            }
            TokenKind::Operator(OperatorKind::Minus) => self.parse_negative(),
            TokenKind::Operator(OperatorKind::Not) => {
                let token = self.advance();
                let operand = self.parse_expression(Precedence::Unary);
                if operand.is_error() {
                    return operand;
                }
                Expression::Prefix {
                    token,
                    operator: PrefixOperator::Not,
                    operand: Box::new(operand),
                }
            }
            TokenKind::Punct(PunctKind::LParen) => {
                let token = self.advance();
                let inner = self.parse_expression(Precedence::Lowest);
                if inner.is_error() {
                    return inner;
                }
                if self.consume_punct(PunctKind::RParen).is_none() {
                    let error =
                        ParseError::unexpected_token(self.peek(0), "`)` to close the group");
                    self.report(error);
                }
                Expression::Grouped {
                    token,
                    inner: Box::new(inner),
                }
            }
            _ => {
                self.report(ParseError::unexpected_token(&token, "an expression"));
                Expression::Error(ErrorExpression { token })
            }
        }
    }

    /// Parses a `-` in prefix position.
    ///
    /// A minus fused directly with a numeric literal is folded here so that
    /// `-9223372036854775808` parses as the i64 minimum instead of
    /// overflowing during negation.
    fn parse_negative(&mut self) -> Expression {
        let minus = self.advance();
        match self.peek(0).kind {
            TokenKind::Literal(LiteralKind::Int) => {
                let literal = self.advance();
                let text = format!("-{}", literal.lexeme);
                match text.parse::<i64>() {
                    Ok(value) => Expression::IntLiteral {
                        token: minus,
                        value,
                    },
                    Err(_) => {
                        self.report(ParseError::integer_out_of_range(&literal));
                        Expression::Error(ErrorExpression { token: literal })
                    }
                }
            }
            TokenKind::Literal(LiteralKind::Float) => {
                let literal = self.advance();
                let text = format!("-{}", literal.lexeme);
                match text.parse::<f64>() {
                    Ok(value) => Expression::FloatLiteral {
                        token: minus,
                        value,
                    },
                    Err(_) => {
                        self.report(ParseError::unexpected_token(&literal, "a float literal"));
                        Expression::Error(ErrorExpression { token: literal })
                    }
                }
            }
            _ => {
                let operand = self.parse_expression(Precedence::Unary);
                if operand.is_error() {
                    return operand;
                }
                Expression::Prefix {
                    token: minus,
                    operator: PrefixOperator::Neg,
                    operand: Box::new(operand),
                }
            }
        }
    }

    fn parse_infix(&mut self, left: Expression, precedence: Precedence) -> Expression {
        let token = self.peek(0).clone();
        match token.kind {
            TokenKind::Operator(kind) => {
                let token = self.advance();
                let Some(operator) = InfixOperator::from_operator(kind) else {
                    self.report(ParseError::unexpected_token(&token, "a binary operator"));
                    return Expression::Error(ErrorExpression { token });
                };
                let right = self.parse_expression(precedence);
                if right.is_error() {
                    return right;
                }
                Expression::Infix {
                    token,
                    operator,
                    left: Box::new(left),
                    right: Box::new(right),
                }
            }
            TokenKind::Keyword(KeywordKind::If | KeywordKind::When) => {
                let token = self.advance();
                let condition = self.parse_expression(Precedence::Conditional);
                if condition.is_error() {
                    return condition;
                }
                let closed = self
                    .consume_keyword(KeywordKind::Else)
                    .or_else(|| self.consume_keyword(KeywordKind::Otherwise));
                if closed.is_none() {
                    let current = self.peek(0).clone();
                    self.report(ParseError::unexpected_token(
                        &current,
                        "`else` after the condition",
                    ));
                    return Expression::Error(ErrorExpression { token: current });
                }
                let alternative = self.parse_expression(Precedence::Conditional);
                if alternative.is_error() {
                    return alternative;
                }
                Expression::Conditional {
                    token,
                    consequence: Box::new(left),
                    condition: Box::new(condition),
                    alternative: Box::new(alternative),
                }
            }
            TokenKind::Punct(PunctKind::LParen) => {
                let callee = match left {
                    Expression::Identifier(identifier) => identifier,
                    other => {
                        self.report(ParseError::unexpected_token(
                            other.token(),
                            "an identifier before call arguments",
                        ));
                        return Expression::Error(ErrorExpression { token });
                    }
                };
                let token = self.advance();
                let arguments = self.parse_arguments(Some(PunctKind::RParen));
                if self.consume_punct(PunctKind::RParen).is_none() {
                    let error = ParseError::unexpected_token(
                        self.peek(0),
                        "`)` to close the argument list",
                    );
                    self.report(error);
                }
                Expression::Call {
                    token,
                    callee,
                    arguments,
                }
            }
            _ => left,
        }
    }
}
