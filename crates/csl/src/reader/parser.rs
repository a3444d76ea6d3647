//! Token stream → value tree

use super::token::{Lexer, Token, TokenKind};
use crate::error::{ParseError, ValueError};
use crate::value::{List, Value, ValueKind};

/// Read every top-level form in `src`.
pub fn parse(src: &str) -> Result<Vec<Value>, ParseError> {
    parse_tokens(Lexer::new(src).tokenize()?)
}

/// Fold a token stream into top-level forms.
///
/// Lists are built between start/end markers; a quote token becomes a
/// [`Value::Quote`] item in front of whatever follows it.
pub fn parse_tokens(tokens: Vec<Token>) -> Result<Vec<Value>, ParseError> {
    // Open lists with the position of their `(`.
    let mut open: Vec<(List, usize, usize)> = Vec::new();
    let mut top = Vec::new();

    for token in tokens {
        let value = match token.kind {
            TokenKind::StartList => {
                open.push((List::new(), token.line, token.column));
                continue;
            }
            TokenKind::EndList => match open.pop() {
                Some((list, _, _)) => Value::List(list),
                None => {
                    return Err(ParseError::UnexpectedClose {
                        line: token.line,
                        column: token.column,
                    })
                }
            },
            TokenKind::Quote => Value::Quote,
            TokenKind::Nil => Value::Nil,
            TokenKind::String => Value::String(token.text),
            TokenKind::Symbol | TokenKind::Operator => Value::Symbol(token.text),
            TokenKind::Int => literal(ValueKind::Int, &token)?,
            TokenKind::Float => literal(ValueKind::Float, &token)?,
        };

        match open.last_mut() {
            Some((list, _, _)) => list.insert_tail(value),
            None => top.push(value),
        }
    }

    if let Some((_, line, column)) = open.first() {
        return Err(ParseError::UnclosedList {
            line: *line,
            column: *column,
        });
    }

    Ok(top)
}

fn literal(kind: ValueKind, token: &Token) -> Result<Value, ParseError> {
    Value::from_literal(kind, &token.text).map_err(|err: ValueError| ParseError::InvalidToken {
        text: format!("{} ({})", token.text, err),
        line: token.line,
        column: token.column,
    })
}
