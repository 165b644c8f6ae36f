//! Construction of immutable trees from parser output
//!
//! Parsers produce an owned [`RawNode`] hierarchy. [`build_tree`] flattens it
//! into the arena used by [`Tree`], computing row/column points once so that
//! every later position lookup is O(1).

use std::sync::Arc;

use super::kinds::ERROR;
use super::tree::{NodeData, Point, Tree};

/// Owned node produced while parsing, before it is frozen into a [`Tree`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawNode {
    pub kind: &'static str,
    pub named: bool,
    pub extra: bool,
    pub field: Option<&'static str>,
    pub start: usize,
    pub end: usize,
    pub children: Vec<RawNode>,
}

impl RawNode {
    /// Creates a childless node covering `start..end`.
    pub fn leaf(kind: &'static str, named: bool, start: usize, end: usize) -> Self {
        Self {
            kind,
            named,
            extra: false,
            field: None,
            start,
            end,
            children: Vec::new(),
        }
    }

    /// Creates a named node spanning its children.
    ///
    /// A node without children is placed at offset 0 with zero width; parsers
    /// only build such nodes for the root of an empty document.
    pub fn branch(kind: &'static str, children: Vec<RawNode>) -> Self {
        let start = children.first().map_or(0, |c| c.start);
        let end = children.last().map_or(start, |c| c.end);
        Self {
            kind,
            named: true,
            extra: false,
            field: None,
            start,
            end,
            children,
        }
    }

    /// Creates an error node over `children`.
    ///
    /// Nested error nodes are spliced into the new one, and error leaves lose
    /// their named status, so that one malformed region yields one error node.
    pub fn error(children: Vec<RawNode>) -> Self {
        let mut flat = Vec::with_capacity(children.len());
        for child in children {
            if child.kind == ERROR && child.named {
                if child.children.is_empty() {
                    flat.push(RawNode { named: false, field: None, ..child });
                } else {
                    flat.extend(child.children);
                }
            } else {
                flat.push(RawNode { field: None, ..child });
            }
        }
        Self::branch(ERROR, flat)
    }

    pub fn with_field(mut self, field: &'static str) -> Self {
        self.field = Some(field);
        self
    }

    pub fn into_extra(mut self) -> Self {
        self.extra = true;
        self
    }

    /// Overrides the span, used for the root node which covers the whole text.
    pub fn spanning(mut self, start: usize, end: usize) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    pub fn is_error(&self) -> bool {
        self.kind == ERROR && self.named
    }
}

/// Freezes `root` into a [`Tree`] over `source`.
///
/// Nodes are numbered in preorder. The walk keeps its own stack, so the
/// depth of `root` is not limited by the thread's stack.
pub fn build_tree(language: &'static str, source: Arc<str>, root: RawNode) -> Tree {
    let line_starts = line_starts(&source);
    let mut nodes: Vec<NodeData> = Vec::new();
    let mut stack: Vec<(RawNode, Option<usize>)> = vec![(root, None)];

    while let Some((mut raw, parent)) = stack.pop() {
        let id = nodes.len();
        let index_in_parent = match parent {
            Some(parent) => {
                let siblings: &mut Vec<usize> = &mut nodes[parent].children;
                siblings.push(id);
                siblings.len() - 1
            }
            None => 0,
        };
        let children = std::mem::take(&mut raw.children);
        nodes.push(NodeData {
            kind: raw.kind,
            named: raw.named,
            extra: raw.extra,
            field: raw.field,
            start_byte: raw.start,
            end_byte: raw.end,
            start_point: point_at(&line_starts, raw.start),
            end_point: point_at(&line_starts, raw.end),
            parent,
            index_in_parent,
            children: Vec::with_capacity(children.len()),
        });
        stack.extend(children.into_iter().rev().map(|child| (child, Some(id))));
    }
    Tree::from_parts(language, source, nodes)
}

fn line_starts(source: &str) -> Vec<usize> {
    std::iter::once(0)
        .chain(source.match_indices('\n').map(|(i, _)| i + 1))
        .collect()
}

fn point_at(line_starts: &[usize], byte: usize) -> Point {
    let row = line_starts.partition_point(|&start| start <= byte).saturating_sub(1);
    Point::new(row, byte - line_starts[row])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_at_line_boundaries() {
        let starts = line_starts("ab\ncd\n");
        assert_eq!(starts, vec![0, 3, 6]);
        assert_eq!(point_at(&starts, 0), Point::new(0, 0));
        assert_eq!(point_at(&starts, 2), Point::new(0, 2));
        assert_eq!(point_at(&starts, 3), Point::new(1, 0));
        assert_eq!(point_at(&starts, 6), Point::new(2, 0));
    }

    #[test]
    fn test_nodes_are_numbered_in_preorder() {
        let first = RawNode::branch("statement", vec![RawNode::leaf("identifier", true, 0, 1)]);
        let second = RawNode::leaf("identifier", true, 2, 3);
        let root = RawNode::branch("source_file", vec![first, second]);
        let tree = build_tree("test", Arc::from("a b"), root);

        let kinds: Vec<_> = tree.root_node().preorder().map(|n| n.kind()).collect();
        assert_eq!(kinds, vec!["source_file", "statement", "identifier", "identifier"]);
        let statement = tree.root_node().child(0).unwrap();
        assert_eq!(statement.next_sibling().unwrap().start_byte(), 2);
        assert_eq!(statement.next_sibling().unwrap().prev_sibling(), Some(statement));
        assert_eq!(statement.child(0).unwrap().parent(), Some(statement));
    }

    #[test]
    fn test_deep_nesting_builds_without_recursion() {
        let mut raw = RawNode::leaf("identifier", true, 0, 1);
        for _ in 0..100_000 {
            raw = RawNode::branch("expression", vec![raw]);
        }
        let tree = build_tree("test", Arc::from("a"), raw);
        assert_eq!(tree.node_count(), 100_001);
        assert_eq!(tree.root_node().preorder().last().unwrap().kind(), "identifier");
    }

    #[test]
    fn test_error_flattens_nested_errors() {
        let inner = RawNode::error(vec![RawNode::leaf("identifier", true, 0, 3)]);
        let unknown = RawNode::leaf(ERROR, true, 4, 5);
        let outer = RawNode::error(vec![inner, unknown]);
        assert_eq!(outer.children.len(), 2);
        assert_eq!(outer.children[0].kind, "identifier");
        assert!(!outer.children[1].named);
        assert_eq!((outer.start, outer.end), (0, 5));
    }
}
