//! Grammar Adapter Framework
//!
//! Each language provides a grammar (node-type vocabulary plus a parser
//! factory). The search core never sees a backend's own API: grammars lower
//! their trees into [`crate::tree::SyntaxTree`].

pub mod framework;
pub mod treesitter;

pub use framework::{default_registry, Grammar, GrammarRegistry, ParseFailure, ParserAdapter, Vocabulary};
pub use treesitter::{TreeSitterGrammar, TreeSitterParser};
