//! Source text → value trees

mod parser;
mod token;

pub use parser::{parse, parse_tokens};
pub use token::{Lexer, Token, TokenKind};
