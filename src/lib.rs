//! # Shapegrep - Structural Code Search
//!
//! Walks a source tree, parses every supported file into a syntax tree and
//! reports every place a declarative tree pattern matches.
//!
//! Shapegrep provides:
//! - A lazy, cycle-safe source tree walker with gitignore-style excludes
//! - A grammar registry of pluggable parser adapters (tree-sitter backed)
//! - A backend-independent syntax tree arena
//! - A pattern compiler for an s-expression pattern language
//! - A lazy match engine that yields matches in document order
//! - A parallel search pipeline with backpressure and cancellation

pub mod adapter;
pub mod config;
pub mod ignore;
pub mod output;
pub mod pattern;
pub mod pipeline;
pub mod query;
pub mod report;
pub mod source;
pub mod tree;
pub mod ui;
pub mod walker;

use std::path::PathBuf;

// Re-exports for convenient access
pub use adapter::{default_registry, Grammar, GrammarRegistry, ParseFailure, ParserAdapter, Vocabulary};
pub use pattern::{MatchMode, Pattern, PatternError};
pub use pipeline::{CancelToken, FileOutcome, SearchOptions, SearchSummary, Searcher, SkippedEntry};
pub use query::{evaluate, evaluate_in, Capture, Match, MatchRecord, Matches};
pub use source::SourceFile;
pub use tree::{Node, NodeId, Point, Span, SyntaxTree, TreeBuilder};
pub use walker::{SourceWalker, WalkOptions};

/// Result type alias for Shapegrep operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Shapegrep operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Path not found: {}", .0.display())]
    PathNotFound(PathBuf),

    #[error("Permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),

    #[error("Symbolic link loop: {} points back to {}", .child.display(), .ancestor.display())]
    SymlinkLoop { ancestor: PathBuf, child: PathBuf },

    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseFailure),

    #[error("Pattern error: {0}")]
    Pattern(#[from] PatternError),

    #[error("No compiled pattern for language {0}")]
    PatternUnavailable(String),

    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Walk error: {0}")]
    Walk(String),

    #[error("Malformed tree: {0}")]
    Tree(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Failed to write results: {0}")]
    Output(#[source] std::io::Error),
}

impl Error {
    /// Map an IO error on `path` into the taxonomy, keeping permission
    /// failures distinguishable from other IO failures.
    pub fn from_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Error::PathNotFound(path),
            std::io::ErrorKind::PermissionDenied => Error::PermissionDenied(path),
            _ => Error::Io { path, source },
        }
    }

    /// The file system path the error is about, if any
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            Error::PathNotFound(path) | Error::PermissionDenied(path) => Some(path),
            Error::SymlinkLoop { child, .. } => Some(child),
            Error::Io { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Short machine-readable tag for the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Error::PathNotFound(_) => "path_not_found",
            Error::PermissionDenied(_) => "permission_denied",
            Error::SymlinkLoop { .. } => "symlink_loop",
            Error::UnsupportedLanguage(_) => "unsupported_language",
            Error::Parse(_) => "parse_failure",
            Error::Pattern(_) => "pattern_error",
            Error::PatternUnavailable(_) => "pattern_unavailable",
            Error::Io { .. } => "io",
            Error::Walk(_) => "walk",
            Error::Tree(_) => "tree",
            Error::Config(_) => "config",
            Error::Output(_) => "output",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_from_io_keeps_permission_kind() {
        let err = Error::from_io("/secret", io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(matches!(err, Error::PermissionDenied(_)));
        assert_eq!(err.kind(), "permission_denied");

        let err = Error::from_io("/gone", io::Error::from(io::ErrorKind::NotFound));
        assert!(matches!(err, Error::PathNotFound(_)));

        let err = Error::from_io("/odd", io::Error::other("boom"));
        assert_eq!(err.kind(), "io");
        assert!(err.to_string().contains("/odd"));
    }
}
