//! Pattern lexer.
//!
//! Tokenizes pattern text like `(function_declaration name: (identifier) @name)`.
//! Every token remembers the byte offset it started at so compile errors can
//! point back into the pattern text.

use super::{PatternError, Position};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    LParen,
    RParen,
    Wildcard,            // _
    Ident(String),       // node types: function_declaration, ERROR
    Field(String),       // name:
    NegatedField(String), // !name
    Capture(String),     // @name
    Predicate(String),   // #eq?
    Str(String),         // "literal"
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spanned {
    pub token: Token,
    pub offset: usize,
}

pub struct Lexer<'a> {
    text: &'a str,
    input: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            input: text.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn skip_trivia(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_ascii_whitespace() {
                self.pos += 1;
            } else if ch == b';' {
                while self.peek().is_some_and(|c| c != b'\n') {
                    self.pos += 1;
                }
            } else {
                break;
            }
        }
    }

    fn read_while(&mut self, pred: impl Fn(u8) -> bool) -> String {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.pos += 1;
        }
        self.text[start..self.pos].to_string()
    }

    fn is_ident_char(ch: u8) -> bool {
        ch.is_ascii_alphanumeric() || ch == b'_'
    }

    fn is_capture_char(ch: u8) -> bool {
        Self::is_ident_char(ch) || ch == b'.' || ch == b'-'
    }

    fn error(&self, offset: usize, message: impl Into<String>) -> PatternError {
        PatternError::Syntax {
            message: message.into(),
            position: Position::at(self.text, offset),
        }
    }

    /// Read a name after a one-byte sigil (`@`, `!`, `#`)
    fn read_name(&mut self, start: usize, what: &str, pred: impl Fn(u8) -> bool) -> Result<String, PatternError> {
        self.pos += 1;
        let name = self.read_while(pred);
        if name.is_empty() {
            return Err(self.error(start, format!("expected a {} name", what)));
        }
        Ok(name)
    }

    fn read_string(&mut self, start: usize) -> Result<String, PatternError> {
        self.pos += 1; // opening quote
        let mut out = String::new();
        let mut chunk_start = self.pos;
        loop {
            match self.peek() {
                None => return Err(self.error(start, "unterminated string")),
                Some(b'"') => {
                    out.push_str(&self.text[chunk_start..self.pos]);
                    self.pos += 1;
                    return Ok(out);
                }
                Some(b'\\') => {
                    out.push_str(&self.text[chunk_start..self.pos]);
                    let escaped = match self.input.get(self.pos + 1) {
                        Some(b'n') => '\n',
                        Some(b't') => '\t',
                        Some(b'r') => '\r',
                        Some(b'"') => '"',
                        Some(b'\\') => '\\',
                        _ => return Err(self.error(self.pos, "invalid escape sequence")),
                    };
                    out.push(escaped);
                    self.pos += 2;
                    chunk_start = self.pos;
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    pub fn tokenize(&mut self) -> Result<Vec<Spanned>, PatternError> {
        let mut tokens = Vec::new();

        loop {
            self.skip_trivia();
            let Some(ch) = self.peek() else { break };
            let offset = self.pos;

            let token = match ch {
                b'(' => {
                    self.pos += 1;
                    Token::LParen
                }
                b')' => {
                    self.pos += 1;
                    Token::RParen
                }
                b'"' => Token::Str(self.read_string(offset)?),
                b'@' => Token::Capture(self.read_name(offset, "capture", Self::is_capture_char)?),
                b'!' => Token::NegatedField(self.read_name(offset, "field", Self::is_ident_char)?),
                b'#' => Token::Predicate(self.read_name(offset, "predicate", |c| {
                    Self::is_ident_char(c) || c == b'-' || c == b'?'
                })?),
                _ if Self::is_ident_char(ch) => {
                    let word = self.read_while(Self::is_ident_char);
                    if self.peek() == Some(b':') {
                        self.pos += 1;
                        Token::Field(word)
                    } else if word == "_" {
                        Token::Wildcard
                    } else {
                        Token::Ident(word)
                    }
                }
                _ => {
                    let shown = self.text[offset..].chars().next().unwrap_or('?');
                    return Err(self.error(offset, format!("unexpected character `{}`", shown)));
                }
            };
            tokens.push(Spanned { token, offset });
        }

        Ok(tokens)
    }
}
