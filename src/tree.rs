//! Syntax tree arena
//!
//! Grammar backends lower their native trees into a [`SyntaxTree`], an owned
//! arena stored in pre-order. Node ids are arena indices, so ascending id
//! order is document order, and every node knows the id one past its last
//! descendant so whole subtrees can be skipped in O(1).
//!
//! Nothing in this module knows about tree-sitter; the matcher and the
//! pipeline only ever see these types.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt::{self, Write};

/// Index of a node inside its [`SyntaxTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A 0-based row/column position in source text. Columns count bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Point {
    pub row: usize,
    pub column: usize,
}

impl Point {
    pub fn new(row: usize, column: usize) -> Self {
        Self { row, column }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.row + 1, self.column + 1)
    }
}

/// Byte and point extent of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub start_byte: usize,
    pub end_byte: usize,
    pub start: Point,
    pub end: Point,
}

impl Span {
    pub fn new(start_byte: usize, end_byte: usize, start: Point, end: Point) -> Self {
        Self { start_byte, end_byte, start, end }
    }

    /// Whether `other` lies entirely inside this span
    pub fn contains(&self, other: &Span) -> bool {
        self.start_byte <= other.start_byte && other.end_byte <= self.end_byte
    }

    pub fn len(&self) -> usize {
        self.end_byte - self.start_byte
    }

    pub fn is_empty(&self) -> bool {
        self.start_byte == self.end_byte
    }
}

/// Why a node was flagged by the parser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// Input the grammar could not place (`ERROR` node)
    Error,
    /// A token the parser inserted to recover (zero width)
    Missing,
}

/// Location of one parse error inside a tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorSite {
    pub kind: ErrorKind,
    pub node: NodeId,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct NodeData {
    kind: &'static str,
    named: bool,
    field: Option<&'static str>,
    span: Span,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    subtree_end: usize,
    missing: bool,
}

impl NodeData {
    fn is_error(&self) -> bool {
        self.kind == "ERROR"
    }
}

/// An immutable syntax tree produced by one parse of one source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxTree {
    language: String,
    source: Vec<u8>,
    nodes: Vec<NodeData>,
    errors: Vec<ErrorSite>,
}

impl SyntaxTree {
    /// Language tag of the grammar that produced this tree
    pub fn language(&self) -> &str {
        &self.language
    }

    /// The source bytes the tree was parsed from
    pub fn source(&self) -> &[u8] {
        &self.source
    }

    pub fn root(&self) -> Node<'_> {
        Node { tree: self, id: NodeId(0) }
    }

    pub fn node(&self, id: NodeId) -> Option<Node<'_>> {
        (id.0 < self.nodes.len()).then_some(Node { tree: self, id })
    }

    /// Total number of nodes, named and anonymous
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes in document (pre-)order
    pub fn nodes(&self) -> impl Iterator<Item = Node<'_>> + '_ {
        (0..self.nodes.len()).map(move |i| Node { tree: self, id: NodeId(i) })
    }

    /// Every `ERROR` and `MISSING` node, in document order
    pub fn errors(&self) -> &[ErrorSite] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Render the named-node structure as an s-expression
    pub fn to_sexp(&self) -> String {
        let mut out = String::new();
        write_sexp(self.root(), &mut out);
        out
    }

    fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0]
    }

    pub(crate) fn at(&self, index: usize) -> Node<'_> {
        Node { tree: self, id: NodeId(index) }
    }

    pub(crate) fn subtree_end(&self, id: NodeId) -> usize {
        self.nodes[id.0].subtree_end
    }
}

fn write_sexp(node: Node<'_>, out: &mut String) {
    if node.is_missing() {
        let _ = write!(out, "(MISSING {})", node.kind());
        return;
    }
    out.push('(');
    out.push_str(node.kind());
    for child in node.children().filter(|c| c.is_named() || c.is_missing()) {
        out.push(' ');
        if let Some(field) = child.field_name() {
            out.push_str(field);
            out.push_str(": ");
        }
        write_sexp(child, out);
    }
    out.push(')');
}

/// A borrowed handle to one node of a [`SyntaxTree`].
///
/// The borrow ties the handle to its tree, so a node can never outlive the
/// tree that owns it.
#[derive(Clone, Copy)]
pub struct Node<'t> {
    tree: &'t SyntaxTree,
    id: NodeId,
}

impl<'t> Node<'t> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn tree(&self) -> &'t SyntaxTree {
        self.tree
    }

    /// Node type tag from the grammar's vocabulary
    pub fn kind(&self) -> &'static str {
        self.data().kind
    }

    pub fn is_named(&self) -> bool {
        self.data().named
    }

    pub fn is_error(&self) -> bool {
        self.data().is_error()
    }

    pub fn is_missing(&self) -> bool {
        self.data().missing
    }

    /// Field this node occupies under its parent, if any
    pub fn field_name(&self) -> Option<&'static str> {
        self.data().field
    }

    pub fn span(&self) -> Span {
        self.data().span
    }

    pub fn start_position(&self) -> Point {
        self.data().span.start
    }

    pub fn end_position(&self) -> Point {
        self.data().span.end
    }

    pub fn byte_range(&self) -> std::ops::Range<usize> {
        let span = self.data().span;
        span.start_byte..span.end_byte
    }

    /// Source text covered by this node, decoded lossily as UTF-8
    pub fn text(&self) -> Cow<'t, str> {
        String::from_utf8_lossy(&self.tree.source[self.byte_range()])
    }

    pub fn parent(&self) -> Option<Node<'t>> {
        self.data().parent.map(|id| Node { tree: self.tree, id })
    }

    pub fn child_count(&self) -> usize {
        self.data().children.len()
    }

    pub fn child(&self, index: usize) -> Option<Node<'t>> {
        let tree = self.tree;
        self.data().children.get(index).map(|&id| Node { tree, id })
    }

    pub fn children(&self) -> impl Iterator<Item = Node<'t>> + use<'t> {
        let tree = self.tree;
        tree.data(self.id).children.iter().map(move |&id| Node { tree, id })
    }

    pub fn named_children(&self) -> impl Iterator<Item = Node<'t>> + use<'t> {
        self.children().filter(|c| c.is_named())
    }

    /// Children occupying `field`, in order
    pub fn children_by_field(&self, field: &str) -> impl Iterator<Item = Node<'t>> + use<'t> {
        let field = field.to_string();
        self.children().filter(move |c| c.field_name() == Some(field.as_str()))
    }

    pub fn child_by_field(&self, field: &str) -> Option<Node<'t>> {
        self.children().find(|c| c.field_name() == Some(field))
    }

    /// This node and all of its descendants in document order
    pub fn descendants(&self) -> impl Iterator<Item = Node<'t>> + use<'t> {
        let tree = self.tree;
        (self.id.0..self.data().subtree_end).map(move |i| Node { tree, id: NodeId(i) })
    }

    /// Whether this node or any descendant is an error or missing node
    pub fn has_error(&self) -> bool {
        self.descendants().any(|n| n.is_error() || n.is_missing())
    }

    fn data(&self) -> &'t NodeData {
        self.tree.data(self.id)
    }
}

impl PartialEq for Node<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

impl Eq for Node<'_> {}

impl fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let span = self.span();
        write!(f, "{} [{} - {}]", self.kind(), span.start, span.end)
    }
}

/// Incremental builder for [`SyntaxTree`].
///
/// Nodes are opened and closed in pre-order. The builder rejects spans that
/// escape their parent or overlap an earlier sibling, and a second root.
pub struct TreeBuilder {
    language: String,
    source: Vec<u8>,
    nodes: Vec<NodeData>,
    stack: Vec<NodeId>,
    errors: Vec<ErrorSite>,
}

impl TreeBuilder {
    pub fn new(language: impl Into<String>, source: impl Into<Vec<u8>>) -> Self {
        Self {
            language: language.into(),
            source: source.into(),
            nodes: Vec::new(),
            stack: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Open a node as the next child of the currently open node
    pub fn open(
        &mut self,
        kind: &'static str,
        named: bool,
        field: Option<&'static str>,
        span: Span,
    ) -> Result<NodeId> {
        if span.start_byte > span.end_byte || span.end_byte > self.source.len() {
            return Err(Error::Tree(format!(
                "span {}..{} of `{}` is outside the source ({} bytes)",
                span.start_byte,
                span.end_byte,
                kind,
                self.source.len()
            )));
        }

        let parent = self.stack.last().copied();
        match parent {
            Some(parent_id) => {
                let parent_data = &self.nodes[parent_id.0];
                if !parent_data.span.contains(&span) {
                    return Err(Error::Tree(format!(
                        "`{}` escapes its parent `{}`",
                        kind, parent_data.kind
                    )));
                }
                if let Some(&prev) = parent_data.children.last() {
                    if self.nodes[prev.0].span.end_byte > span.start_byte {
                        return Err(Error::Tree(format!(
                            "`{}` overlaps its previous sibling `{}`",
                            kind, self.nodes[prev.0].kind
                        )));
                    }
                }
            }
            None if !self.nodes.is_empty() => {
                return Err(Error::Tree(format!("second root node `{}`", kind)));
            }
            None => {}
        }

        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            kind,
            named,
            field,
            span,
            parent,
            children: Vec::new(),
            subtree_end: id.0 + 1,
            missing: false,
        });
        if let Some(parent_id) = parent {
            self.nodes[parent_id.0].children.push(id);
        }
        if named && kind == "ERROR" {
            self.errors.push(ErrorSite { kind: ErrorKind::Error, node: id, span });
        }
        self.stack.push(id);
        Ok(id)
    }

    /// Flag the currently open node as parser-inserted
    pub fn mark_missing(&mut self) -> Result<()> {
        let id = *self
            .stack
            .last()
            .ok_or_else(|| Error::Tree("mark_missing with no open node".to_string()))?;
        let data = &mut self.nodes[id.0];
        data.missing = true;
        self.errors.push(ErrorSite { kind: ErrorKind::Missing, node: id, span: data.span });
        Ok(())
    }

    /// Close the currently open node
    pub fn close(&mut self) -> Result<()> {
        let id = self
            .stack
            .pop()
            .ok_or_else(|| Error::Tree("close with no open node".to_string()))?;
        self.nodes[id.0].subtree_end = self.nodes.len();
        Ok(())
    }

    /// Open and immediately close a childless node
    pub fn leaf(
        &mut self,
        kind: &'static str,
        named: bool,
        field: Option<&'static str>,
        span: Span,
    ) -> Result<NodeId> {
        let id = self.open(kind, named, field, span)?;
        self.close()?;
        Ok(id)
    }

    pub fn finish(self) -> Result<SyntaxTree> {
        if !self.stack.is_empty() {
            return Err(Error::Tree(format!("{} node(s) left open", self.stack.len())));
        }
        if self.nodes.is_empty() {
            return Err(Error::Tree("tree has no root".to_string()));
        }
        Ok(SyntaxTree {
            language: self.language,
            source: self.source,
            nodes: self.nodes,
            errors: self.errors,
        })
    }
}

/// Span helper for single-line sources, used by tests and fixtures
pub fn line_span(start: usize, end: usize) -> Span {
    Span::new(start, end, Point::new(0, start), Point::new(0, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    // let x = f;
    fn sample() -> SyntaxTree {
        let src = "let x = f;";
        let mut b = TreeBuilder::new("toy", src);
        b.open("program", true, None, line_span(0, 10)).unwrap();
        b.open("let_declaration", true, None, line_span(0, 10)).unwrap();
        b.leaf("let", false, None, line_span(0, 3)).unwrap();
        b.leaf("identifier", true, Some("name"), line_span(4, 5)).unwrap();
        b.leaf("=", false, None, line_span(6, 7)).unwrap();
        b.leaf("identifier", true, Some("value"), line_span(8, 9)).unwrap();
        b.leaf(";", false, None, line_span(9, 10)).unwrap();
        b.close().unwrap();
        b.close().unwrap();
        b.finish().unwrap()
    }

    #[test]
    fn test_preorder_ids_and_text() {
        let tree = sample();
        let kinds: Vec<_> = tree.nodes().map(|n| n.kind()).collect();
        assert_eq!(kinds, vec!["program", "let_declaration", "let", "identifier", "=", "identifier", ";"]);

        let decl = tree.root().child(0).unwrap();
        assert_eq!(decl.child_by_field("name").unwrap().text(), "x");
        assert_eq!(decl.child_by_field("value").unwrap().text(), "f");
        assert_eq!(decl.named_children().count(), 2);
        assert_eq!(decl.descendants().count(), 6);
        assert_eq!(decl.parent(), Some(tree.root()));
        assert!(!tree.has_errors());
    }

    #[test]
    fn test_sexp_shows_named_structure() {
        let tree = sample();
        assert_eq!(
            tree.to_sexp(),
            "(program (let_declaration name: (identifier) value: (identifier)))"
        );
    }

    #[test]
    fn test_builder_rejects_escaping_child() {
        let mut b = TreeBuilder::new("toy", "abc");
        b.open("root", true, None, line_span(0, 2)).unwrap();
        let err = b.open("child", true, None, line_span(1, 3)).unwrap_err();
        assert!(matches!(err, Error::Tree(_)));
    }

    #[test]
    fn test_builder_rejects_overlapping_siblings() {
        let mut b = TreeBuilder::new("toy", "abcd");
        b.open("root", true, None, line_span(0, 4)).unwrap();
        b.leaf("a", true, None, line_span(0, 2)).unwrap();
        assert!(b.leaf("b", true, None, line_span(1, 3)).is_err());
    }

    #[test]
    fn test_builder_rejects_second_root_and_open_nodes() {
        let mut b = TreeBuilder::new("toy", "ab");
        b.leaf("a", true, None, line_span(0, 1)).unwrap();
        assert!(b.open("b", true, None, line_span(1, 2)).is_err());

        let mut b = TreeBuilder::new("toy", "ab");
        b.open("a", true, None, line_span(0, 2)).unwrap();
        assert!(b.finish().is_err());

        assert!(TreeBuilder::new("toy", "").finish().is_err());
    }

    #[test]
    fn test_error_and_missing_sites_are_recorded() {
        let mut b = TreeBuilder::new("toy", "f(");
        b.open("program", true, None, line_span(0, 2)).unwrap();
        b.leaf("ERROR", true, None, line_span(0, 1)).unwrap();
        b.open(")", false, None, line_span(2, 2)).unwrap();
        b.mark_missing().unwrap();
        b.close().unwrap();
        b.close().unwrap();
        let tree = b.finish().unwrap();

        assert!(tree.has_errors());
        let kinds: Vec<_> = tree.errors().iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![ErrorKind::Error, ErrorKind::Missing]);
        assert!(tree.root().has_error());
        assert_eq!(tree.to_sexp(), "(program (ERROR) (MISSING )))");
    }
}
