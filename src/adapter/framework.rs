//! Core adapter framework
//!
//! Defines the traits every grammar backend implements and the registry
//! that maps language tags and file extensions to grammars.

use crate::tree::SyntaxTree;
use crate::{Error, Result};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Why a parser could not produce a tree at all.
///
/// Malformed *input* is not a failure: it yields a tree with error nodes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseFailure {
    #[error("parser for {language} could not be configured: {reason}")]
    Incompatible { language: String, reason: String },

    #[error("parsing {language} source was aborted (timeout or cancellation)")]
    Aborted { language: String },

    #[error("parser produced a malformed tree: {0}")]
    Malformed(String),
}

/// The node types and field names a grammar can produce
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    named: BTreeSet<String>,
    anonymous: BTreeSet<String>,
    fields: BTreeSet<String>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::new()
    }
}

impl Vocabulary {
    /// Create a vocabulary that only knows the `ERROR` node type
    pub fn new() -> Self {
        let mut named = BTreeSet::new();
        named.insert("ERROR".to_string());
        Self {
            named,
            anonymous: BTreeSet::new(),
            fields: BTreeSet::new(),
        }
    }

    pub fn add_named(&mut self, kind: impl Into<String>) {
        self.named.insert(kind.into());
    }

    pub fn add_anonymous(&mut self, kind: impl Into<String>) {
        self.anonymous.insert(kind.into());
    }

    pub fn add_field(&mut self, field: impl Into<String>) {
        self.fields.insert(field.into());
    }

    pub fn has_named(&self, kind: &str) -> bool {
        self.named.contains(kind)
    }

    pub fn has_anonymous(&self, kind: &str) -> bool {
        self.anonymous.contains(kind)
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.fields.contains(field)
    }

    /// Named node types in sorted order
    pub fn named_kinds(&self) -> impl Iterator<Item = &str> {
        self.named.iter().map(String::as_str)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(String::as_str)
    }
}

/// A parser instance for one language.
///
/// Instances are handed out per task and never shared between threads.
/// Each call to [`parse`](Self::parse) is independent of the previous one.
pub trait ParserAdapter: Send {
    /// Language tag of the grammar this parser was created from
    fn language_name(&self) -> &str;

    /// Bound the time a single parse may take. `None` removes the bound.
    fn set_timeout(&mut self, _timeout: Option<Duration>) {}

    /// Parse source text into a tree.
    ///
    /// Syntactically broken input still produces a tree; its error nodes are
    /// listed in [`SyntaxTree::errors`].
    fn parse(&mut self, source: &[u8]) -> std::result::Result<SyntaxTree, ParseFailure>;
}

/// Trait for grammar backends
///
/// Each grammar is responsible for:
/// 1. Identifying files it can parse
/// 2. Publishing the vocabulary patterns are validated against
/// 3. Creating fresh parser adapters on demand
pub trait Grammar: Send + Sync {
    /// Get the language tag (lowercase, used on the command line)
    fn language_name(&self) -> &str;

    /// Get file extensions this grammar handles
    fn file_extensions(&self) -> &[&str];

    /// Node types and fields this grammar can produce
    fn vocabulary(&self) -> &Vocabulary;

    /// Create a new parser for this grammar
    fn adapter(&self) -> std::result::Result<Box<dyn ParserAdapter>, ParseFailure>;

    /// Check if this grammar can handle a file
    fn can_handle(&self, path: &Path) -> bool {
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            let ext = ext.to_ascii_lowercase();
            self.file_extensions().contains(&ext.as_str())
        } else {
            false
        }
    }
}

/// Registry of grammars, keyed by language tag and by file extension.
///
/// Built once at startup and read-only afterwards, so it can be shared
/// across worker threads behind an `Arc`.
#[derive(Default)]
pub struct GrammarRegistry {
    grammars: HashMap<String, Arc<dyn Grammar>>,
    extensions: HashMap<String, String>,
    order: Vec<String>,
}

impl GrammarRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a grammar. A later grammar claiming an extension wins.
    pub fn register(&mut self, grammar: impl Grammar + 'static) {
        let tag = grammar.language_name().to_ascii_lowercase();
        for ext in grammar.file_extensions() {
            if let Some(previous) = self.extensions.insert(ext.to_ascii_lowercase(), tag.clone()) {
                if previous != tag {
                    tracing::debug!("Extension .{} moved from {} to {}", ext, previous, tag);
                }
            }
        }
        if !self.grammars.contains_key(&tag) {
            self.order.push(tag.clone());
        }
        self.grammars.insert(tag, Arc::new(grammar));
    }

    /// Find a grammar by language tag
    pub fn get(&self, tag: &str) -> Result<Arc<dyn Grammar>> {
        self.grammars
            .get(&tag.to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| Error::UnsupportedLanguage(tag.to_string()))
    }

    /// Language tag for a file, derived from its extension
    pub fn language_for_path(&self, path: &Path) -> Option<&str> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        self.extensions.get(&ext).map(String::as_str)
    }

    /// Find the grammar for a file
    pub fn for_path(&self, path: &Path) -> Result<Arc<dyn Grammar>> {
        match self.language_for_path(path) {
            Some(tag) => self.get(tag),
            None => Err(Error::UnsupportedLanguage(
                path.extension()
                    .map(|e| format!(".{}", e.to_string_lossy()))
                    .unwrap_or_else(|| path.display().to_string()),
            )),
        }
    }

    /// Language tags in registration order
    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Get all registered grammars in registration order
    pub fn grammars(&self) -> impl Iterator<Item = &Arc<dyn Grammar>> {
        self.order.iter().filter_map(|tag| self.grammars.get(tag))
    }

    /// All extensions any grammar claims
    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.extensions.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Create a default registry with all built-in grammars
pub fn default_registry() -> GrammarRegistry {
    let mut registry = GrammarRegistry::new();
    for grammar in super::treesitter::TreeSitterGrammar::all() {
        registry.register(grammar);
    }
    registry
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::tree::{line_span, TreeBuilder};

    /// Whitespace-separated words under a `document` root, one line only.
    pub(crate) struct WordGrammar {
        vocabulary: Vocabulary,
    }

    impl WordGrammar {
        pub(crate) fn new() -> Self {
            let mut vocabulary = Vocabulary::new();
            vocabulary.add_named("document");
            vocabulary.add_named("word");
            vocabulary.add_field("item");
            Self { vocabulary }
        }
    }

    struct WordParser;

    impl ParserAdapter for WordParser {
        fn language_name(&self) -> &str {
            "words"
        }

        fn parse(&mut self, source: &[u8]) -> std::result::Result<SyntaxTree, ParseFailure> {
            let build = || -> crate::Result<SyntaxTree> {
                let mut b = TreeBuilder::new("words", source);
                b.open("document", true, None, line_span(0, source.len()))?;
                let mut start = None;
                for (i, byte) in source.iter().chain(std::iter::once(&b' ')).enumerate() {
                    match (byte.is_ascii_whitespace(), start) {
                        (false, None) => start = Some(i),
                        (true, Some(s)) => {
                            b.leaf("word", true, Some("item"), line_span(s, i))?;
                            start = None;
                        }
                        _ => {}
                    }
                }
                b.close()?;
                b.finish()
            };
            build().map_err(|e| ParseFailure::Malformed(e.to_string()))
        }
    }

    impl Grammar for WordGrammar {
        fn language_name(&self) -> &str {
            "words"
        }

        fn file_extensions(&self) -> &[&str] {
            &["txt", "words"]
        }

        fn vocabulary(&self) -> &Vocabulary {
            &self.vocabulary
        }

        fn adapter(&self) -> std::result::Result<Box<dyn ParserAdapter>, ParseFailure> {
            Ok(Box::new(WordParser))
        }
    }

    #[test]
    fn test_registry() {
        let mut registry = GrammarRegistry::new();
        registry.register(WordGrammar::new());

        assert!(registry.for_path(Path::new("notes.txt")).is_ok());
        assert!(registry.for_path(Path::new("NOTES.TXT")).is_ok());
        assert_eq!(registry.language_for_path(Path::new("a.words")), Some("words"));

        let err = registry.for_path(Path::new("foo.other")).err().unwrap();
        assert!(matches!(err, Error::UnsupportedLanguage(ref ext) if ext == ".other"));
        assert!(registry.for_path(Path::new("Makefile")).is_err());
        assert!(registry.get("WORDS").is_ok());
        assert!(registry.get("klingon").is_err());
    }

    #[test]
    fn test_adapters_are_independent() {
        let grammar = WordGrammar::new();
        let mut a = grammar.adapter().unwrap();
        let mut b = grammar.adapter().unwrap();
        let first = a.parse(b"alpha beta").unwrap();
        let _ = a.parse(b"gamma").unwrap();
        assert_eq!(a.parse(b"alpha beta").unwrap(), first);
        assert_eq!(b.parse(b"alpha beta").unwrap(), first);
        assert_eq!(first.root().named_children().count(), 2);
    }

    #[test]
    fn test_vocabulary_always_knows_error() {
        let vocabulary = Vocabulary::new();
        assert!(vocabulary.has_named("ERROR"));
        assert!(!vocabulary.has_named("word"));
    }

    #[test]
    fn test_default_registry_languages() {
        let registry = default_registry();
        let tags: Vec<_> = registry.languages().collect();
        assert_eq!(tags, vec!["javascript", "typescript", "tsx", "python", "rust", "go"]);
        assert_eq!(registry.language_for_path(Path::new("a.ts")), Some("typescript"));
        assert_eq!(registry.language_for_path(Path::new("a.tsx")), Some("tsx"));
        assert_eq!(registry.language_for_path(Path::new("a.mjs")), Some("javascript"));
    }
}
