//! Tree-sitter grammar backend
//!
//! Wraps a tree-sitter `Language` as a [`Grammar`] and lowers tree-sitter
//! trees into the backend-independent [`SyntaxTree`] arena. Tree-sitter's
//! error recovery means broken input still yields a tree, with `ERROR` and
//! `MISSING` nodes marking the damage.

use super::framework::{Grammar, ParseFailure, ParserAdapter, Vocabulary};
use crate::tree::{Point, Span, SyntaxTree, TreeBuilder};
use std::time::Duration;
use tree_sitter::{Language, Parser, Tree};

/// A grammar backed by a compiled tree-sitter language
pub struct TreeSitterGrammar {
    language: Language,
    language_name: &'static str,
    extensions: Vec<&'static str>,
    vocabulary: Vocabulary,
}

impl TreeSitterGrammar {
    /// Create a grammar from a tree-sitter language
    pub fn new(language: Language, language_name: &'static str, extensions: &[&'static str]) -> Self {
        let vocabulary = vocabulary_of(&language);
        Self {
            language,
            language_name,
            extensions: extensions.to_vec(),
            vocabulary,
        }
    }

    /// Create a JavaScript grammar
    pub fn javascript() -> Self {
        Self::new(tree_sitter_javascript::LANGUAGE.into(), "javascript", &["js", "jsx", "mjs", "cjs"])
    }

    /// Create a TypeScript grammar
    pub fn typescript() -> Self {
        Self::new(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(), "typescript", &["ts", "mts", "cts"])
    }

    /// Create a TSX grammar
    pub fn tsx() -> Self {
        Self::new(tree_sitter_typescript::LANGUAGE_TSX.into(), "tsx", &["tsx"])
    }

    /// Create a Python grammar
    pub fn python() -> Self {
        Self::new(tree_sitter_python::LANGUAGE.into(), "python", &["py", "pyi"])
    }

    /// Create a Rust grammar
    pub fn rust() -> Self {
        Self::new(tree_sitter_rust::LANGUAGE.into(), "rust", &["rs"])
    }

    /// Create a Go grammar
    pub fn go() -> Self {
        Self::new(tree_sitter_go::LANGUAGE.into(), "go", &["go"])
    }

    /// Get all built-in grammars
    pub fn all() -> Vec<Self> {
        vec![
            Self::javascript(),
            Self::typescript(),
            Self::tsx(),
            Self::python(),
            Self::rust(),
            Self::go(),
        ]
    }
}

fn vocabulary_of(language: &Language) -> Vocabulary {
    let mut vocabulary = Vocabulary::new();
    for id in 0..language.node_kind_count() {
        let Ok(id) = u16::try_from(id) else { break };
        let Some(kind) = language.node_kind_for_id(id) else { continue };
        if kind.is_empty() {
            continue;
        }
        if language.node_kind_is_named(id) {
            // Hidden rules never appear in trees
            if !kind.starts_with('_') {
                vocabulary.add_named(kind);
            }
        } else {
            vocabulary.add_anonymous(kind);
        }
    }
    // Field ids start at 1
    for id in 1..=language.field_count() {
        let Ok(id) = u16::try_from(id) else { break };
        if let Some(field) = language.field_name_for_id(id) {
            vocabulary.add_field(field);
        }
    }
    vocabulary
}

impl Grammar for TreeSitterGrammar {
    fn language_name(&self) -> &str {
        self.language_name
    }

    fn file_extensions(&self) -> &[&str] {
        &self.extensions
    }

    fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    fn adapter(&self) -> Result<Box<dyn ParserAdapter>, ParseFailure> {
        let mut parser = Parser::new();
        parser
            .set_language(&self.language)
            .map_err(|e| ParseFailure::Incompatible {
                language: self.language_name.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Box::new(TreeSitterParser {
            parser,
            language_name: self.language_name,
        }))
    }
}

/// One tree-sitter parser configured for one language
pub struct TreeSitterParser {
    parser: Parser,
    language_name: &'static str,
}

impl ParserAdapter for TreeSitterParser {
    fn language_name(&self) -> &str {
        self.language_name
    }

    fn set_timeout(&mut self, timeout: Option<Duration>) {
        let micros = timeout.map_or(0, |t| u64::try_from(t.as_micros()).unwrap_or(u64::MAX));
        self.parser.set_timeout_micros(micros);
    }

    fn parse(&mut self, source: &[u8]) -> Result<SyntaxTree, ParseFailure> {
        let tree = self.parser.parse(source, None);
        // Drop any state left over from an aborted parse
        self.parser.reset();

        let tree = tree.ok_or_else(|| ParseFailure::Aborted {
            language: self.language_name.to_string(),
        })?;
        lower(&tree, self.language_name, source).map_err(|e| ParseFailure::Malformed(e.to_string()))
    }
}

fn span_of(node: &tree_sitter::Node<'_>) -> Span {
    let start = node.start_position();
    let end = node.end_position();
    Span::new(
        node.start_byte(),
        node.end_byte(),
        Point::new(start.row, start.column),
        Point::new(end.row, end.column),
    )
}

/// Copy a tree-sitter tree into the arena, visiting nodes in pre-order
fn lower(tree: &Tree, language: &str, source: &[u8]) -> crate::Result<SyntaxTree> {
    let mut builder = TreeBuilder::new(language, source);
    let mut cursor = tree.walk();

    loop {
        let node = cursor.node();
        builder.open(node.kind(), node.is_named(), cursor.field_name(), span_of(&node))?;
        if node.is_missing() {
            builder.mark_missing()?;
        }
        if cursor.goto_first_child() {
            continue;
        }
        builder.close()?;

        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return builder.finish();
            }
            builder.close()?;
        }
    }
}
