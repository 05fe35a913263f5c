//! Pattern compiler
//!
//! Compiles s-expression pattern text into a validated, immutable
//! [`Pattern`]:
//!
//! ```text
//! (function_declaration
//!   name: (identifier) @function_name
//!   !type_parameters
//!   (#match? @function_name "^get"))
//! ```
//!
//! - `(kind ...)` a named node, `(_)` any named node, `_` any node
//! - `"lit"` an anonymous node such as a keyword or operator
//! - `field: clause` a child in a field, `!field` no child in that field
//! - unfielded child clauses match children in order, gaps allowed
//! - `@label` binds the preceding node
//! - `(#eq? @a "x")`, `(#match? @a "re")` and their `#not-` forms filter matches
//!
//! Compilation validates node types and fields against the grammar's
//! vocabulary and is deterministic: the same text and grammar always produce
//! an equal pattern. `Display` renders canonical pattern text that compiles
//! back to an equal pattern.

mod lexer;
mod parser;

use crate::adapter::{Grammar, Vocabulary};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A 1-based line/column location in pattern text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Position {
    /// Byte offset into the pattern text
    pub offset: usize,
    pub line: usize,
    /// Counted in characters, not bytes
    pub column: usize,
}

impl Position {
    /// Resolve a byte offset into line and column
    pub fn at(text: &str, offset: usize) -> Self {
        let offset = offset.min(text.len());
        let before = &text.as_bytes()[..offset];
        let line = before.iter().filter(|&&b| b == b'\n').count() + 1;
        let line_start = before.iter().rposition(|&b| b == b'\n').map_or(0, |i| i + 1);
        Self {
            offset,
            line,
            // Skip UTF-8 continuation bytes
            column: before[line_start..].iter().filter(|&&b| b & 0xC0 != 0x80).count() + 1,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Pattern compilation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    #[error("{position}: unknown node type `{name}`")]
    UnknownNodeType { name: String, position: Position },

    #[error("{position}: unknown field `{name}`")]
    UnknownField { name: String, position: Position },

    #[error("{position}: capture @{name} is bound twice")]
    DuplicateCapture { name: String, position: Position },

    #[error("{position}: predicate refers to unbound capture @{name}")]
    UnknownCapture { name: String, position: Position },

    #[error("{position}: {message}")]
    InvalidPredicate { message: String, position: Position },

    #[error("{position}: invalid regex: {message}")]
    InvalidRegex { message: String, position: Position },

    #[error("{position}: {message}")]
    Syntax { message: String, position: Position },
}

impl PatternError {
    /// Where in the pattern text the error was found
    pub fn position(&self) -> Position {
        match self {
            PatternError::UnknownNodeType { position, .. }
            | PatternError::UnknownField { position, .. }
            | PatternError::DuplicateCapture { position, .. }
            | PatternError::UnknownCapture { position, .. }
            | PatternError::InvalidPredicate { position, .. }
            | PatternError::InvalidRegex { position, .. }
            | PatternError::Syntax { position, .. } => *position,
        }
    }
}

/// Whether nested occurrences are reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchMode {
    /// Every node where a clause matches, including nodes inside another match
    #[default]
    All,
    /// Once a node matches, nothing inside it is considered
    NonOverlapping,
}

/// What a clause requires of the node itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeConstraint {
    /// `(kind)`
    Named(String),
    /// `"literal"`
    Anonymous(String),
    /// `(_)`
    AnyNamed,
    /// `_`
    Any,
}

/// What a clause requires of the node's children
#[derive(Debug, Clone, PartialEq)]
pub enum ChildConstraint {
    /// `field: clause`
    Field { name: String, clause: PatternClause },
    /// `clause`, matched in order against the children
    Positional(PatternClause),
    /// `!field`
    NotField(String),
}

/// Right-hand side of `#eq?`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Capture(String),
    Text(String),
}

/// A regex compared by its source text
#[derive(Debug, Clone)]
pub struct TextRegex(Regex);

impl TextRegex {
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        Regex::new(source).map(TextRegex)
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.0.is_match(text)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl PartialEq for TextRegex {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

/// A text filter checked once a top-level clause has matched structurally
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Eq {
        capture: String,
        operand: Operand,
        negate: bool,
    },
    Match {
        capture: String,
        regex: TextRegex,
        negate: bool,
    },
}

/// One node constraint with its child constraints and optional capture
#[derive(Debug, Clone, PartialEq)]
pub struct PatternClause {
    pub node: NodeConstraint,
    pub children: Vec<ChildConstraint>,
    pub predicates: Vec<Predicate>,
    pub capture: Option<String>,
}

impl PatternClause {
    pub fn new(node: NodeConstraint) -> Self {
        Self {
            node,
            children: Vec::new(),
            predicates: Vec::new(),
            capture: None,
        }
    }

    fn collect_captures(&self, out: &mut Vec<String>) {
        if let Some(capture) = &self.capture {
            if !out.contains(capture) {
                out.push(capture.clone());
            }
        }
        for child in &self.children {
            match child {
                ChildConstraint::Field { clause, .. } | ChildConstraint::Positional(clause) => {
                    clause.collect_captures(out)
                }
                ChildConstraint::NotField(_) => {}
            }
        }
    }
}

/// A compiled structural query for one grammar
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    language: String,
    clauses: Vec<PatternClause>,
    capture_names: Vec<String>,
    mode: MatchMode,
}

impl Pattern {
    /// Compile pattern text against a grammar's vocabulary
    pub fn compile(text: &str, grammar: &dyn Grammar) -> Result<Self, PatternError> {
        Self::compile_with(text, grammar.language_name(), grammar.vocabulary())
    }

    /// Compile pattern text against an explicit vocabulary
    pub fn compile_with(text: &str, language: &str, vocabulary: &Vocabulary) -> Result<Self, PatternError> {
        let tokens = lexer::Lexer::new(text).tokenize()?;
        let clauses = parser::Parser::new(text, tokens, vocabulary).parse()?;

        let mut capture_names = Vec::new();
        for clause in &clauses {
            clause.collect_captures(&mut capture_names);
        }

        Ok(Self {
            language: language.to_string(),
            clauses,
            capture_names,
            mode: MatchMode::default(),
        })
    }

    pub fn with_mode(mut self, mode: MatchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    /// Language tag of the grammar this pattern was validated against
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Top-level clauses, tried in this order at every node
    pub fn clauses(&self) -> &[PatternClause] {
        &self.clauses
    }

    /// Every capture label, in order of first appearance
    pub fn capture_names(&self) -> &[String] {
        &self.capture_names
    }
}

/// Compile `text` for `grammar`
pub fn compile(text: &str, grammar: &dyn Grammar) -> Result<Pattern, PatternError> {
    Pattern::compile(text, grammar)
}

fn write_quoted(f: &mut fmt::Formatter<'_>, text: &str) -> fmt::Result {
    f.write_str("\"")?;
    for ch in text.chars() {
        match ch {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            '\r' => f.write_str("\\r")?,
            _ => write!(f, "{}", ch)?,
        }
    }
    f.write_str("\"")
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (name, capture, negate) = match self {
            Predicate::Eq { capture, negate, .. } => ("eq?", capture, *negate),
            Predicate::Match { capture, negate, .. } => ("match?", capture, *negate),
        };
        write!(f, "(#{}{} @{} ", if negate { "not-" } else { "" }, name, capture)?;
        match self {
            Predicate::Eq { operand: Operand::Capture(other), .. } => write!(f, "@{}", other)?,
            Predicate::Eq { operand: Operand::Text(text), .. } => write_quoted(f, text)?,
            Predicate::Match { regex, .. } => write_quoted(f, regex.as_str())?,
        }
        f.write_str(")")
    }
}

impl fmt::Display for PatternClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.node {
            NodeConstraint::Anonymous(literal) => write_quoted(f, literal)?,
            NodeConstraint::Any => f.write_str("_")?,
            NodeConstraint::Named(_) | NodeConstraint::AnyNamed => {
                let kind = match &self.node {
                    NodeConstraint::Named(kind) => kind.as_str(),
                    _ => "_",
                };
                write!(f, "({}", kind)?;
                for child in &self.children {
                    match child {
                        ChildConstraint::Field { name, clause } => write!(f, " {}: {}", name, clause)?,
                        ChildConstraint::Positional(clause) => write!(f, " {}", clause)?,
                        ChildConstraint::NotField(name) => write!(f, " !{}", name)?,
                    }
                }
                for predicate in &self.predicates {
                    write!(f, " {}", predicate)?;
                }
                f.write_str(")")?;
            }
        }
        if let Some(capture) = &self.capture {
            write!(f, " @{}", capture)?;
        }
        Ok(())
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, clause) in self.clauses.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{}", clause)?;
        }
        Ok(())
    }
}
