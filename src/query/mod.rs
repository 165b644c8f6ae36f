//! Structural query engine
//!
//! A [`Query`] is compiled once from S-expression patterns and can then be
//! run against any subtree with [`Query::matches`]. Every run walks the
//! subtree afresh; nothing is cached between runs.
//!
//! Matches come back in document order: nodes are visited in pre-order, and
//! for a single node the patterns are tried in the order they appear in the
//! query source. When a pattern's children can bind to several child
//! sequences, each binding is its own match, ordered left to right.

mod pattern;

use tracing::trace;

use crate::syntax::{Language, Node, Range};

use pattern::{ChildPattern, CompiledQuery, NodeMatcher, Pattern};

pub use pattern::{QueryError, QueryErrorKind};

/// Compiled query.
#[derive(Debug, Clone)]
pub struct Query {
    compiled: CompiledQuery,
}

/// One node bound to a capture name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryCapture<'tree> {
    pub index: u32,
    pub node: Node<'tree>,
}

impl QueryCapture<'_> {
    pub fn range(&self) -> Range {
        self.node.range()
    }
}

/// One successful match of a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryMatch<'tree> {
    pub pattern_index: usize,
    pub captures: Vec<QueryCapture<'tree>>,
}

impl<'tree> QueryMatch<'tree> {
    /// First node captured under `index`.
    pub fn node_for_capture(&self, index: u32) -> Option<Node<'tree>> {
        self.captures.iter().find(|c| c.index == index).map(|c| c.node)
    }

    /// All nodes captured under `index`, in capture order.
    pub fn nodes_for_capture(&self, index: u32) -> impl Iterator<Item = Node<'tree>> + '_ {
        self.captures
            .iter()
            .filter(move |c| c.index == index)
            .map(|c| c.node)
    }
}

impl Query {
    /// Compiles `source` against `language`.
    ///
    /// # Returns
    /// The query, or a [`QueryError`] describing the first problem found.
    pub fn new(language: &Language, source: &str) -> Result<Self, QueryError> {
        let compiled = pattern::compile(language, source)?;
        trace!(
            "Compiled query with {} patterns and {} captures",
            compiled.patterns.len(),
            compiled.capture_names.len()
        );
        Ok(Self { compiled })
    }

    pub fn pattern_count(&self) -> usize {
        self.compiled.patterns.len()
    }

    pub fn capture_names(&self) -> &[String] {
        &self.compiled.capture_names
    }

    pub fn capture_index_for_name(&self, name: &str) -> Option<u32> {
        self.compiled
            .capture_names
            .iter()
            .position(|n| n == name)
            .map(|i| i as u32)
    }

    /// Runs the query over `root` and its descendants.
    pub fn matches<'tree>(&self, root: Node<'tree>) -> Vec<QueryMatch<'tree>> {
        let mut out = Vec::new();
        for node in root.preorder() {
            for (pattern_index, pattern) in self.compiled.patterns.iter().enumerate() {
                let mut previous: Option<Vec<QueryCapture<'tree>>> = None;
                for captures in match_pattern(pattern, node) {
                    // Distinct child bindings may capture the same nodes.
                    if previous.as_ref() == Some(&captures) {
                        continue;
                    }
                    previous = Some(captures.clone());
                    out.push(QueryMatch {
                        pattern_index,
                        captures,
                    });
                }
            }
        }
        out
    }

    /// Runs the query and flattens the result into captures, in match order.
    pub fn captures<'tree>(&self, root: Node<'tree>) -> Vec<QueryCapture<'tree>> {
        self.matches(root)
            .into_iter()
            .flat_map(|m| m.captures)
            .collect()
    }
}

fn matcher_accepts(matcher: &NodeMatcher, node: Node<'_>) -> bool {
    match matcher {
        NodeMatcher::Named(kind) => node.is_named() && node.kind() == *kind,
        NodeMatcher::NamedWildcard => node.is_named(),
        NodeMatcher::Any => true,
        NodeMatcher::Anonymous(kind) => !node.is_named() && node.kind() == *kind,
    }
}

/// All capture sets for `pattern` rooted at `node`; empty if it does not match.
fn match_pattern<'tree>(pattern: &Pattern, node: Node<'tree>) -> Vec<Vec<QueryCapture<'tree>>> {
    match pattern {
        Pattern::Node {
            matcher,
            children,
            captures,
        } => {
            if !matcher_accepts(matcher, node) {
                return Vec::new();
            }
            let own: Vec<QueryCapture<'tree>> = captures
                .iter()
                .map(|&index| QueryCapture { index, node })
                .collect();
            let candidates: Vec<Node<'tree>> = node.children().collect();
            match_children(children, &candidates, 0)
                .into_iter()
                .map(|rest| own.iter().copied().chain(rest).collect())
                .collect()
        }
        Pattern::Alternation {
            alternatives,
            captures,
        } => alternatives
            .iter()
            .flat_map(|alternative| match_pattern(alternative, node))
            .map(|inner| {
                captures
                    .iter()
                    .map(|&index| QueryCapture { index, node })
                    .chain(inner)
                    .collect()
            })
            .collect(),
    }
}

/// Binds `patterns` to an ordered subsequence of `candidates[from..]`.
fn match_children<'tree>(
    patterns: &[ChildPattern],
    candidates: &[Node<'tree>],
    from: usize,
) -> Vec<Vec<QueryCapture<'tree>>> {
    let Some((first, rest)) = patterns.split_first() else {
        return vec![Vec::new()];
    };

    let mut out = Vec::new();
    for (offset, &child) in candidates.iter().enumerate().skip(from) {
        if let Some(field) = first.field {
            if child.field_name() != Some(field) {
                continue;
            }
        }
        if first.pattern.requires_named() && !child.is_named() {
            continue;
        }
        for head in match_pattern(&first.pattern, child) {
            for tail in match_children(rest, candidates, offset + 1) {
                let mut captures = head.clone();
                captures.extend(tail);
                out.push(captures);
            }
        }
    }
    out
}
