//! Pattern parser.
//!
//! Turns a token stream into validated [`PatternClause`]s. Node types and
//! fields are checked against the grammar vocabulary while parsing, capture
//! labels and predicate references once per top-level clause.

use super::lexer::{Spanned, Token};
use super::{
    ChildConstraint, NodeConstraint, Operand, PatternClause, PatternError, Position, Predicate,
    TextRegex,
};
use crate::adapter::Vocabulary;
use std::collections::HashSet;

pub struct Parser<'a> {
    text: &'a str,
    tokens: Vec<Spanned>,
    pos: usize,
    vocabulary: &'a Vocabulary,
    // Per top-level clause
    bound: HashSet<String>,
    referenced: Vec<(String, usize)>,
}

impl<'a> Parser<'a> {
    pub fn new(text: &'a str, tokens: Vec<Spanned>, vocabulary: &'a Vocabulary) -> Self {
        Self {
            text,
            tokens,
            pos: 0,
            vocabulary,
            bound: HashSet::new(),
            referenced: Vec::new(),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn peek_at(&self, ahead: usize) -> Option<&Token> {
        self.tokens.get(self.pos + ahead).map(|s| &s.token)
    }

    /// Offset of the current token, or the end of the text
    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map_or(self.text.len(), |s| s.offset)
    }

    fn advance(&mut self) -> Option<Spanned> {
        let tok = self.tokens.get(self.pos).cloned()?;
        self.pos += 1;
        Some(tok)
    }

    fn position(&self, offset: usize) -> Position {
        Position::at(self.text, offset)
    }

    fn syntax(&self, offset: usize, message: impl Into<String>) -> PatternError {
        PatternError::Syntax {
            message: message.into(),
            position: self.position(offset),
        }
    }

    /// Parse every top-level clause
    pub fn parse(&mut self) -> Result<Vec<PatternClause>, PatternError> {
        let mut clauses = Vec::new();
        while self.peek().is_some() {
            self.bound.clear();
            self.referenced.clear();
            if self.peek() == Some(&Token::LParen) && matches!(self.peek_at(1), Some(Token::Predicate(_))) {
                return Err(self.syntax(self.offset(), "predicate outside of a node"));
            }
            let clause = self.parse_clause()?;
            for (name, offset) in &self.referenced {
                if !self.bound.contains(name) {
                    return Err(PatternError::UnknownCapture {
                        name: name.clone(),
                        position: self.position(*offset),
                    });
                }
            }
            clauses.push(clause);
        }
        if clauses.is_empty() {
            return Err(self.syntax(0, "empty pattern"));
        }
        Ok(clauses)
    }

    fn parse_clause(&mut self) -> Result<PatternClause, PatternError> {
        let offset = self.offset();
        let Some(tok) = self.advance() else {
            return Err(self.syntax(offset, "expected a node"));
        };

        let mut clause = match tok.token {
            Token::LParen => self.parse_node(tok.offset)?,
            Token::Str(literal) => {
                if !self.vocabulary.has_anonymous(&literal) {
                    return Err(PatternError::UnknownNodeType {
                        name: literal,
                        position: self.position(tok.offset),
                    });
                }
                PatternClause::new(NodeConstraint::Anonymous(literal))
            }
            Token::Wildcard => PatternClause::new(NodeConstraint::Any),
            Token::RParen => return Err(self.syntax(tok.offset, "unexpected `)`")),
            Token::Capture(name) => {
                return Err(self.syntax(tok.offset, format!("capture @{} does not follow a node", name)));
            }
            other => return Err(self.syntax(tok.offset, format!("expected a node, found {}", describe(&other)))),
        };

        if let Some(Spanned { token: Token::Capture(name), offset }) = self.tokens.get(self.pos).cloned() {
            self.pos += 1;
            if let Some(Token::Capture(_)) = self.peek() {
                return Err(self.syntax(self.offset(), "a node may carry only one capture"));
            }
            if !self.bound.insert(name.clone()) {
                return Err(PatternError::DuplicateCapture {
                    name,
                    position: self.position(offset),
                });
            }
            clause.capture = Some(name);
        }

        Ok(clause)
    }

    /// Parse the rest of `( kind item* )` after the opening paren
    fn parse_node(&mut self, open_offset: usize) -> Result<PatternClause, PatternError> {
        let offset = self.offset();
        let node = match self.advance().map(|s| s.token) {
            Some(Token::Wildcard) => NodeConstraint::AnyNamed,
            Some(Token::Ident(kind)) => {
                if !self.vocabulary.has_named(&kind) {
                    return Err(PatternError::UnknownNodeType {
                        name: kind,
                        position: self.position(offset),
                    });
                }
                NodeConstraint::Named(kind)
            }
            Some(other) => {
                return Err(self.syntax(offset, format!("expected a node type, found {}", describe(&other))));
            }
            None => return Err(self.syntax(open_offset, "unclosed `(`")),
        };

        let mut clause = PatternClause::new(node);
        loop {
            let Some(Spanned { token, offset }) = self.tokens.get(self.pos).cloned() else {
                return Err(self.syntax(open_offset, "unclosed `(`"));
            };
            match token {
                Token::RParen => {
                    self.pos += 1;
                    return Ok(clause);
                }
                Token::Field(name) => {
                    self.pos += 1;
                    self.check_field(&name, offset)?;
                    let child = self.parse_clause()?;
                    clause.children.push(ChildConstraint::Field { name, clause: child });
                }
                Token::NegatedField(name) => {
                    self.pos += 1;
                    self.check_field(&name, offset + 1)?;
                    clause.children.push(ChildConstraint::NotField(name));
                }
                Token::LParen if matches!(self.peek_at(1), Some(Token::Predicate(_))) => {
                    let predicate = self.parse_predicate()?;
                    clause.predicates.push(predicate);
                }
                _ => {
                    let child = self.parse_clause()?;
                    clause.children.push(ChildConstraint::Positional(child));
                }
            }
        }
    }

    fn check_field(&self, name: &str, offset: usize) -> Result<(), PatternError> {
        if self.vocabulary.has_field(name) {
            Ok(())
        } else {
            Err(PatternError::UnknownField {
                name: name.to_string(),
                position: self.position(offset),
            })
        }
    }

    /// Parse `( #name? arg* )`
    fn parse_predicate(&mut self) -> Result<Predicate, PatternError> {
        let open = self.offset();
        self.pos += 1; // (
        let Some(Spanned { token: Token::Predicate(name), offset: name_offset }) = self.advance() else {
            return Err(self.syntax(open, "expected a predicate"));
        };

        let mut args = Vec::new();
        loop {
            match self.advance() {
                None => return Err(self.syntax(open, "unclosed `(`")),
                Some(Spanned { token: Token::RParen, .. }) => break,
                Some(Spanned { token: Token::Capture(c), offset }) => {
                    self.referenced.push((c.clone(), offset));
                    args.push((Operand::Capture(c), offset));
                }
                Some(Spanned { token: Token::Str(s), offset }) => args.push((Operand::Text(s), offset)),
                Some(other) => {
                    return Err(self.invalid_predicate(
                        other.offset,
                        format!("unexpected {} in #{}", describe(&other.token), name),
                    ));
                }
            }
        }

        let (negate, base) = match name.strip_prefix("not-") {
            Some(rest) => (true, rest),
            None => (false, name.as_str()),
        };

        let mut args = args.into_iter();
        let (first, second) = match (args.next(), args.next(), args.next()) {
            (Some(first), Some(second), None) => (first, second),
            _ => {
                return Err(self.invalid_predicate(name_offset, format!("#{} takes exactly two arguments", name)));
            }
        };
        let (first, first_offset) = first;
        let Operand::Capture(capture) = first else {
            return Err(self.invalid_predicate(first_offset, format!("first argument of #{} must be a capture", name)));
        };
        let (second, second_offset) = second;

        match base {
            "eq?" => Ok(Predicate::Eq {
                capture,
                operand: second,
                negate,
            }),
            "match?" => {
                let Operand::Text(source) = second else {
                    return Err(self.invalid_predicate(second_offset, format!("#{} expects a regex string", name)));
                };
                let regex = TextRegex::new(&source).map_err(|e| PatternError::InvalidRegex {
                    message: e.to_string(),
                    position: self.position(second_offset),
                })?;
                Ok(Predicate::Match { capture, regex, negate })
            }
            _ => Err(self.invalid_predicate(name_offset, format!("unknown predicate #{}", name))),
        }
    }

    fn invalid_predicate(&self, offset: usize, message: String) -> PatternError {
        PatternError::InvalidPredicate {
            message,
            position: self.position(offset),
        }
    }
}

fn describe(token: &Token) -> String {
    match token {
        Token::LParen => "`(`".to_string(),
        Token::RParen => "`)`".to_string(),
        Token::Wildcard => "`_`".to_string(),
        Token::Ident(s) => format!("`{}`", s),
        Token::Field(s) => format!("field `{}:`", s),
        Token::NegatedField(s) => format!("`!{}`", s),
        Token::Capture(s) => format!("capture `@{}`", s),
        Token::Predicate(s) => format!("predicate `#{}`", s),
        Token::Str(s) => format!("string {:?}", s),
    }
}
