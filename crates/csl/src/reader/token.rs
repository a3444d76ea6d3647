//! Lexer

use std::iter::Peekable;
use std::str::Chars;

use crate::error::ParseError;

/// Characters that make up operator tokens.
const OPERATOR_CHARS: &str = "+-*/!,:<>=%";

/// Token classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// `(`
    StartList,
    /// `)`
    EndList,
    /// `'`
    Quote,
    /// `"…"`, text holds the unescaped contents
    String,
    /// Integer literal
    Int,
    /// Floating point literal
    Float,
    /// Name
    Symbol,
    /// Run of operator characters, e.g. `+` or `<=`
    Operator,
    /// `nil`
    Nil,
}

/// A classified token with its source position.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// Classification
    pub kind: TokenKind,
    /// Token text
    pub text: String,
    /// Line (1-indexed)
    pub line: usize,
    /// Column (1-indexed)
    pub column: usize,
}

/// Splits source text into tokens. `;` starts a comment running to the
/// end of the line.
pub struct Lexer<'s> {
    chars: Peekable<Chars<'s>>,
    line: usize,
    column: usize,
}

impl<'s> Lexer<'s> {
    /// Create a lexer over `src`.
    pub fn new(src: &'s str) -> Self {
        Self {
            chars: src.chars().peekable(),
            line: 1,
            column: 1,
        }
    }

    /// Tokenize the whole input.
    pub fn tokenize(mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn skip_trivia(&mut self) {
        while let Some(&c) = self.chars.peek() {
            if c.is_whitespace() {
                self.bump();
            } else if c == ';' {
                while let Some(c) = self.bump() {
                    if c == '\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    fn next_token(&mut self) -> Result<Option<Token>, ParseError> {
        self.skip_trivia();

        let (line, column) = (self.line, self.column);
        let Some(c) = self.bump() else {
            return Ok(None);
        };

        let token = |kind, text: String| Token {
            kind,
            text,
            line,
            column,
        };

        match c {
            '(' => Ok(Some(token(TokenKind::StartList, "(".into()))),
            ')' => Ok(Some(token(TokenKind::EndList, ")".into()))),
            '\'' => Ok(Some(token(TokenKind::Quote, "'".into()))),
            '"' => {
                let text = self.string_body(line, column)?;
                Ok(Some(token(TokenKind::String, text)))
            }
            first => {
                let mut text = String::from(first);
                while let Some(&c) = self.chars.peek() {
                    if c.is_whitespace() || "()'\";".contains(c) {
                        break;
                    }
                    text.push(c);
                    self.bump();
                }
                let kind = classify(&text).ok_or_else(|| ParseError::InvalidToken {
                    text: text.clone(),
                    line,
                    column,
                })?;
                Ok(Some(token(kind, text)))
            }
        }
    }

    fn string_body(&mut self, line: usize, column: usize) -> Result<String, ParseError> {
        let mut text = String::new();
        loop {
            match self.bump() {
                None => return Err(ParseError::UnterminatedString { line, column }),
                Some('"') => return Ok(text),
                Some('\\') => match self.bump() {
                    Some('n') => text.push('\n'),
                    Some('t') => text.push('\t'),
                    Some('r') => text.push('\r'),
                    Some('0') => text.push('\0'),
                    Some(other) => text.push(other),
                    None => return Err(ParseError::UnterminatedString { line, column }),
                },
                Some(c) => text.push(c),
            }
        }
    }
}

/// Classify an atom. `None` means the text starts like a number but is
/// not one.
fn classify(text: &str) -> Option<TokenKind> {
    if text == "nil" {
        return Some(TokenKind::Nil);
    }

    let unsigned = text.strip_prefix(['-', '+']).unwrap_or(text);
    if unsigned.starts_with(|c: char| c.is_ascii_digit()) {
        return if is_int(unsigned) {
            Some(TokenKind::Int)
        } else if is_float(unsigned) {
            Some(TokenKind::Float)
        } else {
            None
        };
    }

    if text.chars().all(|c| OPERATOR_CHARS.contains(c)) {
        Some(TokenKind::Operator)
    } else {
        Some(TokenKind::Symbol)
    }
}

fn is_int(text: &str) -> bool {
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => text.chars().all(|c| c.is_ascii_digit()),
    }
}

fn is_float(text: &str) -> bool {
    (text.contains('.') || text.contains(['e', 'E'])) && text.parse::<f64>().is_ok()
}
