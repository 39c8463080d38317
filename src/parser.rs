use super::expr::*;
use nom::{
    bytes::complete::{take_till1, take_while},
    character::complete::{i64 as integer, one_of},
    combinator::{all_consuming, map},
    sequence::preceded,
    IResult, Offset,
};
use std::fmt::{self, Display, Formatter};
use thiserror::Error;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expected {
    Number,
    Operator,
}

impl Display for Expected {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number => write!(f, "a number"),
            Self::Operator => write!(f, "`+` or `-`"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Syntax error: empty expression")]
    EmptyExpression,
    #[error("Syntax error: expected {expected} at offset {offset}, found `{token}`")]
    MalformedExpression {
        token: String,
        offset: usize,
        expected: Expected,
    },
    #[error("Syntax error: operator `{operator}` at offset {offset} has no right operand")]
    IncompleteExpression { operator: Operator, offset: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind<'a> {
    Number(i64),
    Operator(Operator),
    Unknown(&'a str),
}

/// A whitespace-delimited word of the input and its byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind<'a>,
    pub text: &'a str,
    pub offset: usize,
}

fn word(s: &str) -> IResult<&str, &str> {
    preceded(take_while(char::is_whitespace), take_till1(char::is_whitespace))(s)
}

fn number(s: &str) -> IResult<&str, i64> {
    integer(s)
}

fn operator(s: &str) -> IResult<&str, Operator> {
    map(one_of("+-"), |op| match op {
        '+' => Operator::Add,
        '-' => Operator::Sub,
        _ => unreachable!(),
    })(s)
}

fn classify(text: &str) -> TokenKind<'_> {
    if let Ok((_, n)) = all_consuming(number)(text) {
        TokenKind::Number(n)
    } else if let Ok((_, op)) = all_consuming(operator)(text) {
        TokenKind::Operator(op)
    } else {
        TokenKind::Unknown(text)
    }
}

/// Splits `s` on Unicode whitespace. Only trailing whitespace is left unconsumed.
pub fn tokenize(s: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut rest = s;
    while let Ok((next, text)) = word(rest) {
        tokens.push(Token {
            kind: classify(text),
            text,
            offset: s.offset(text),
        });
        rest = next;
    }
    tokens
}

fn malformed(token: &Token<'_>, expected: Expected) -> ParseError {
    ParseError::MalformedExpression {
        token: token.text.to_owned(),
        offset: token.offset,
        expected,
    }
}

fn expect_number(token: &Token<'_>) -> Result<i64, ParseError> {
    match token.kind {
        TokenKind::Number(n) => Ok(n),
        _ => Err(malformed(token, Expected::Number)),
    }
}

fn expect_operator(token: &Token<'_>) -> Result<Operator, ParseError> {
    match token.kind {
        TokenKind::Operator(op) => Ok(op),
        _ => Err(malformed(token, Expected::Operator)),
    }
}

/// Parses `NUMBER (('+'|'-') NUMBER)*` into a left-leaning tree.
///
/// Every operator binds equally, so `10 - 4 + 2` becomes `(10 - 4) + 2`.
pub fn parse(s: &str) -> Result<Expression, ParseError> {
    let mut tokens = tokenize(s).into_iter();

    let first = tokens.next().ok_or(ParseError::EmptyExpression)?;
    let mut expr = Expression::number(expect_number(&first)?);

    while let Some(token) = tokens.next() {
        let op = expect_operator(&token)?;
        let rhs = match tokens.next() {
            Some(operand) => expect_number(&operand)?,
            None => {
                return Err(ParseError::IncompleteExpression {
                    operator: op,
                    offset: token.offset,
                })
            }
        };
        trace!("fold `{op} {rhs}` onto accumulator");
        expr = Expression::binary(op, expr, Expression::number(rhs));
    }

    debug!(operators = expr.operator_count(), "parsed `{expr}`");
    Ok(expr)
}
