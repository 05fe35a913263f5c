//! Match engine implementation
//!
//! Evaluates a compiled [`Pattern`] against a [`SyntaxTree`]:
//! - Nodes are visited in document order (pre-order, children left to right)
//! - At each node the pattern's top-level clauses are tried in order
//! - Matches are produced lazily as the iterator is pulled
//! - Nested occurrences are reported unless the pattern is non-overlapping

use crate::pattern::{ChildConstraint, MatchMode, NodeConstraint, Operand, Pattern, PatternClause, Predicate};
use crate::tree::{Node, Point, SyntaxTree};
use serde::Serialize;
use std::collections::VecDeque;

/// A label bound to a node within one match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capture<'p, 't> {
    pub label: &'p str,
    pub node: Node<'t>,
}

/// One satisfied occurrence of a top-level clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match<'p, 't> {
    pattern_index: usize,
    anchor: Node<'t>,
    captures: Vec<Capture<'p, 't>>,
}

impl<'p, 't> Match<'p, 't> {
    /// Index of the top-level clause that produced this match
    pub fn pattern_index(&self) -> usize {
        self.pattern_index
    }

    /// The node the top-level clause matched at
    pub fn anchor(&self) -> Node<'t> {
        self.anchor
    }

    /// Captures in clause order
    pub fn captures(&self) -> &[Capture<'p, 't>] {
        &self.captures
    }

    pub fn get(&self, label: &str) -> Option<Node<'t>> {
        self.captures.iter().find(|c| c.label == label).map(|c| c.node)
    }
}

/// Lazy iterator over the matches of a pattern in one tree
pub struct Matches<'p, 't> {
    pattern: &'p Pattern,
    tree: &'t SyntaxTree,
    next: usize,
    end: usize,
    pending: VecDeque<Match<'p, 't>>,
}

impl<'p, 't> Iterator for Matches<'p, 't> {
    type Item = Match<'p, 't>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(found) = self.pending.pop_front() {
                return Some(found);
            }
            if self.next >= self.end {
                return None;
            }

            let node = self.tree.at(self.next);
            self.next += 1;

            for (index, clause) in self.pattern.clauses().iter().enumerate() {
                if let Some(captures) = match_top(clause, node) {
                    self.pending.push_back(Match {
                        pattern_index: index,
                        anchor: node,
                        captures,
                    });
                }
            }

            if self.pattern.mode() == MatchMode::NonOverlapping && !self.pending.is_empty() {
                self.next = self.tree.subtree_end(node.id());
            }
        }
    }
}

/// Evaluate `pattern` over the whole tree
pub fn evaluate<'p, 't>(pattern: &'p Pattern, tree: &'t SyntaxTree) -> Matches<'p, 't> {
    evaluate_in(pattern, tree.root())
}

/// Evaluate `pattern` over the subtree rooted at `node`
pub fn evaluate_in<'p, 't>(pattern: &'p Pattern, node: Node<'t>) -> Matches<'p, 't> {
    let tree = node.tree();
    Matches {
        pattern,
        tree,
        next: node.id().index(),
        end: tree.subtree_end(node.id()),
        pending: VecDeque::new(),
    }
}

fn match_top<'p, 't>(clause: &'p PatternClause, node: Node<'t>) -> Option<Vec<Capture<'p, 't>>> {
    let mut captures = Vec::new();
    let mut accept = |captures: &mut Vec<Capture<'p, 't>>| predicates_hold(clause, captures);
    match_clause(clause, node, &mut captures, &mut accept).then_some(captures)
}

fn node_satisfies(constraint: &NodeConstraint, node: Node<'_>) -> bool {
    match constraint {
        NodeConstraint::Named(kind) => node.is_named() && node.kind() == kind,
        NodeConstraint::Anonymous(literal) => !node.is_named() && node.kind() == literal,
        NodeConstraint::AnyNamed => node.is_named(),
        NodeConstraint::Any => true,
    }
}

/// Rest of the search once a clause is satisfied; `false` asks for the
/// next alternative
type Continuation<'a, 'p, 't> = dyn FnMut(&mut Vec<Capture<'p, 't>>) -> bool + 'a;

/// Try to satisfy `clause` at `node` and then `rest`, backtracking over
/// alternative child assignments. On failure the capture list is left as
/// it was.
fn match_clause<'p, 't>(
    clause: &'p PatternClause,
    node: Node<'t>,
    captures: &mut Vec<Capture<'p, 't>>,
    rest: &mut Continuation<'_, 'p, 't>,
) -> bool {
    if !node_satisfies(&clause.node, node) {
        return false;
    }
    let forbidden = clause.children.iter().any(|c| match c {
        ChildConstraint::NotField(name) => node.child_by_field(name).is_some(),
        _ => false,
    });
    if forbidden {
        return false;
    }

    let mark = captures.len();
    if let Some(label) = &clause.capture {
        captures.push(Capture { label, node });
    }
    let constraints: Vec<&'p ChildConstraint> = clause
        .children
        .iter()
        .filter(|c| !matches!(c, ChildConstraint::NotField(_)))
        .collect();
    if match_children(&constraints, 0, node, captures, rest) {
        true
    } else {
        captures.truncate(mark);
        false
    }
}

/// `cursor` is the first child index the next positional constraint may use
fn match_children<'p, 't>(
    constraints: &[&'p ChildConstraint],
    cursor: usize,
    node: Node<'t>,
    captures: &mut Vec<Capture<'p, 't>>,
    rest: &mut Continuation<'_, 'p, 't>,
) -> bool {
    let Some((first, remaining)) = constraints.split_first() else {
        return rest(captures);
    };

    match first {
        ChildConstraint::Field { name, clause } => {
            for child in node.children_by_field(name) {
                let mut next = |captures: &mut Vec<Capture<'p, 't>>| {
                    match_children(remaining, cursor, node, captures, rest)
                };
                if match_clause(clause, child, captures, &mut next) {
                    return true;
                }
            }
            false
        }
        ChildConstraint::Positional(clause) => {
            for index in cursor..node.child_count() {
                let Some(child) = node.child(index) else { break };
                let mut next = |captures: &mut Vec<Capture<'p, 't>>| {
                    match_children(remaining, index + 1, node, captures, rest)
                };
                if match_clause(clause, child, captures, &mut next) {
                    return true;
                }
            }
            false
        }
        ChildConstraint::NotField(_) => match_children(remaining, cursor, node, captures, rest),
    }
}

fn predicates_hold(clause: &PatternClause, captures: &[Capture<'_, '_>]) -> bool {
    let lookup = |label: &str| captures.iter().find(|c| c.label == label).map(|c| c.node.text());

    for predicate in &clause.predicates {
        let holds = match predicate {
            Predicate::Eq { capture, operand, negate } => {
                let Some(left) = lookup(capture) else { continue };
                let equal = match operand {
                    Operand::Text(text) => left == text.as_str(),
                    Operand::Capture(other) => match lookup(other) {
                        Some(right) => left == right,
                        None => continue,
                    },
                };
                equal != *negate
            }
            Predicate::Match { capture, regex, negate } => {
                let Some(text) = lookup(capture) else { continue };
                regex.is_match(&text) != *negate
            }
        };
        if !holds {
            return false;
        }
    }

    clause.children.iter().all(|child| match child {
        ChildConstraint::Field { clause, .. } | ChildConstraint::Positional(clause) => {
            predicates_hold(clause, captures)
        }
        ChildConstraint::NotField(_) => true,
    })
}

/// One entry of the result stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRecord {
    pub file_path: String,
    pub pattern_index: usize,
    /// `None` for the anchor of a match without captures
    pub capture_label: Option<String>,
    pub node_text: String,
    pub start_position: Point,
    pub end_position: Point,
}

impl MatchRecord {
    fn new(file_path: &str, pattern_index: usize, label: Option<&str>, node: Node<'_>) -> Self {
        Self {
            file_path: file_path.to_string(),
            pattern_index,
            capture_label: label.map(str::to_string),
            node_text: node.text().into_owned(),
            start_position: node.start_position(),
            end_position: node.end_position(),
        }
    }

    /// Flatten a match into one record per capture, or one anchor record
    pub fn from_match(file_path: &str, found: &Match<'_, '_>) -> Vec<Self> {
        if found.captures.is_empty() {
            return vec![Self::new(file_path, found.pattern_index, None, found.anchor)];
        }
        found
            .captures
            .iter()
            .map(|c| Self::new(file_path, found.pattern_index, Some(c.label), c.node))
            .collect()
    }
}
