//! Immutable syntax tree and lightweight node handles
//!
//! A [`Tree`] stores its nodes in a flat arena. [`Node`] is a `Copy` handle
//! (tree reference plus index) exposing the read-only navigation API the rest
//! of the crate relies on: kind tags, byte and point ranges, ordered children,
//! named children and field lookup. Nothing here mutates a tree after it has
//! been built.

use std::fmt;
use std::sync::Arc;

use super::kinds::ERROR;

/// Zero-based row and byte column of a position in the source text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Point {
    pub row: usize,
    pub column: usize,
}

impl Point {
    pub const fn new(row: usize, column: usize) -> Self {
        Self { row, column }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.column)
    }
}

/// Byte and point extent of a node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Range {
    pub start_byte: usize,
    pub end_byte: usize,
    pub start_point: Point,
    pub end_point: Point,
}

impl Range {
    /// Range starting where `first` starts and ending where `last` ends.
    pub fn spanning(first: Range, last: Range) -> Self {
        Self {
            start_byte: first.start_byte,
            end_byte: last.end_byte,
            start_point: first.start_point,
            end_point: last.end_point,
        }
    }

    pub fn contains(&self, other: &Range) -> bool {
        self.start_byte <= other.start_byte && other.end_byte <= self.end_byte
    }

    pub fn is_empty(&self) -> bool {
        self.start_byte == self.end_byte
    }
}

#[derive(Debug, Clone)]
pub(crate) struct NodeData {
    pub(crate) kind: &'static str,
    pub(crate) named: bool,
    pub(crate) extra: bool,
    pub(crate) field: Option<&'static str>,
    pub(crate) start_byte: usize,
    pub(crate) end_byte: usize,
    pub(crate) start_point: Point,
    pub(crate) end_point: Point,
    pub(crate) parent: Option<usize>,
    /// Position among the parent's children; 0 for the root.
    pub(crate) index_in_parent: usize,
    pub(crate) children: Vec<usize>,
}

/// A parsed document.
#[derive(Debug, Clone)]
pub struct Tree {
    language: &'static str,
    source: Arc<str>,
    nodes: Arc<[NodeData]>,
}

impl Tree {
    pub(crate) fn from_parts(language: &'static str, source: Arc<str>, nodes: Vec<NodeData>) -> Self {
        Self {
            language,
            source,
            nodes: nodes.into(),
        }
    }

    pub fn root_node(&self) -> Node<'_> {
        Node { tree: self, id: 0 }
    }

    /// Name of the language that produced this tree.
    pub fn language(&self) -> &'static str {
        self.language
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree contains at least one error node.
    pub fn has_error(&self) -> bool {
        self.root_node().preorder().any(|n| n.is_error())
    }

    /// Whether two trees share the same node storage.
    pub fn ptr_eq(&self, other: &Tree) -> bool {
        Arc::ptr_eq(&self.nodes, &other.nodes)
    }
}

/// Read-only view of one node inside a [`Tree`].
#[derive(Clone, Copy)]
pub struct Node<'tree> {
    tree: &'tree Tree,
    id: usize,
}

impl PartialEq for Node<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

impl Eq for Node<'_> {}

impl fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{Node {} {} - {}}}",
            self.kind(),
            self.start_position(),
            self.end_position()
        )
    }
}

impl<'tree> Node<'tree> {
    fn data(&self) -> &'tree NodeData {
        &self.tree.nodes[self.id]
    }

    fn at(&self, id: usize) -> Node<'tree> {
        Node { tree: self.tree, id }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn kind(&self) -> &'static str {
        self.data().kind
    }

    pub fn is_named(&self) -> bool {
        self.data().named
    }

    /// Whether this node is a comment or directive that may appear anywhere.
    pub fn is_extra(&self) -> bool {
        self.data().extra
    }

    pub fn is_error(&self) -> bool {
        let data = self.data();
        data.named && data.kind == ERROR
    }

    pub fn start_byte(&self) -> usize {
        self.data().start_byte
    }

    pub fn end_byte(&self) -> usize {
        self.data().end_byte
    }

    pub fn byte_range(&self) -> std::ops::Range<usize> {
        self.start_byte()..self.end_byte()
    }

    pub fn start_position(&self) -> Point {
        self.data().start_point
    }

    pub fn end_position(&self) -> Point {
        self.data().end_point
    }

    pub fn range(&self) -> Range {
        let data = self.data();
        Range {
            start_byte: data.start_byte,
            end_byte: data.end_byte,
            start_point: data.start_point,
            end_point: data.end_point,
        }
    }

    /// Source text covered by this node.
    pub fn text(&self) -> &'tree str {
        self.tree.source.get(self.byte_range()).unwrap_or_default()
    }

    pub fn parent(&self) -> Option<Node<'tree>> {
        self.data().parent.map(|id| self.at(id))
    }

    /// Field name under which this node is stored in its parent.
    pub fn field_name(&self) -> Option<&'static str> {
        self.data().field
    }

    pub fn child_count(&self) -> usize {
        self.data().children.len()
    }

    pub fn child(&self, index: usize) -> Option<Node<'tree>> {
        self.data().children.get(index).map(|&id| self.at(id))
    }

    pub fn children(&self) -> impl DoubleEndedIterator<Item = Node<'tree>> + use<'tree> {
        let tree = self.tree;
        self.data().children.iter().map(move |&id| Node { tree, id })
    }

    pub fn named_children(&self) -> impl DoubleEndedIterator<Item = Node<'tree>> + use<'tree> {
        self.children().filter(|c| c.is_named())
    }

    pub fn named_child_count(&self) -> usize {
        self.named_children().count()
    }

    pub fn named_child(&self, index: usize) -> Option<Node<'tree>> {
        self.named_children().nth(index)
    }

    /// Named children that are not comments or directives.
    pub fn significant_children(&self) -> impl DoubleEndedIterator<Item = Node<'tree>> + use<'tree> {
        self.named_children().filter(|c| !c.is_extra())
    }

    pub fn child_by_field_name(&self, field: &str) -> Option<Node<'tree>> {
        self.children().find(|c| c.field_name() == Some(field))
    }

    fn index_in_parent(&self) -> Option<usize> {
        self.data().parent.map(|_| self.data().index_in_parent)
    }

    fn siblings_after(&self) -> impl Iterator<Item = Node<'tree>> + use<'tree> {
        let tree = self.tree;
        let (parent, index) = match (self.data().parent, self.index_in_parent()) {
            (Some(parent), Some(index)) => (parent, index + 1),
            _ => (self.id, usize::MAX),
        };
        tree.nodes[parent]
            .children
            .get(index..)
            .unwrap_or_default()
            .iter()
            .map(move |&id| Node { tree, id })
    }

    fn siblings_before(&self) -> impl Iterator<Item = Node<'tree>> + use<'tree> {
        let tree = self.tree;
        let (parent, index) = match (self.data().parent, self.index_in_parent()) {
            (Some(parent), Some(index)) => (parent, index),
            _ => (self.id, 0),
        };
        tree.nodes[parent].children[..index]
            .iter()
            .rev()
            .map(move |&id| Node { tree, id })
    }

    pub fn next_sibling(&self) -> Option<Node<'tree>> {
        self.siblings_after().next()
    }

    pub fn prev_sibling(&self) -> Option<Node<'tree>> {
        self.siblings_before().next()
    }

    pub fn next_named_sibling(&self) -> Option<Node<'tree>> {
        self.siblings_after().find(|n| n.is_named())
    }

    pub fn prev_named_sibling(&self) -> Option<Node<'tree>> {
        self.siblings_before().find(|n| n.is_named())
    }

    /// Next named sibling, skipping comments and directives.
    pub fn next_significant_sibling(&self) -> Option<Node<'tree>> {
        self.siblings_after().find(|n| n.is_named() && !n.is_extra())
    }

    /// Previous named sibling, skipping comments and directives.
    pub fn prev_significant_sibling(&self) -> Option<Node<'tree>> {
        self.siblings_before().find(|n| n.is_named() && !n.is_extra())
    }

    /// Smallest node (named or not) whose range covers `start..=end`.
    pub fn descendant_for_point_range(&self, start: Point, end: Point) -> Option<Node<'tree>> {
        self.descend(start, end, false)
    }

    /// Smallest named node whose range covers `start..=end`.
    pub fn named_descendant_for_point_range(&self, start: Point, end: Point) -> Option<Node<'tree>> {
        self.descend(start, end, true)
    }

    fn descend(&self, start: Point, end: Point, named_only: bool) -> Option<Node<'tree>> {
        if start < self.start_position() || end > self.end_position() {
            return None;
        }

        let mut node = *self;
        let mut last_match = *self;
        loop {
            // Prefer a child that strictly contains the point; a cursor sitting
            // right after a token still resolves to that token.
            let next = node
                .children()
                .find(|c| c.start_position() <= start && end < c.end_position())
                .or_else(|| {
                    node.children().rev().find(|c| {
                        c.start_position() <= start
                            && end <= c.end_position()
                            && c.start_position() != c.end_position()
                    })
                });

            match next {
                Some(child) => {
                    if !named_only || child.is_named() {
                        last_match = child;
                    }
                    node = child;
                }
                None => break,
            }
        }
        Some(last_match)
    }

    /// Iterates this node and all of its descendants in pre-order.
    pub fn preorder(&self) -> Preorder<'tree> {
        Preorder {
            tree: self.tree,
            stack: vec![self.id],
        }
    }

    /// Renders the named structure of the subtree as an S-expression.
    ///
    /// Extras are omitted; field names prefix the children they label.
    pub fn to_sexp(&self) -> String {
        let mut out = String::new();
        self.write_sexp(&mut out);
        out
    }

    fn write_sexp(&self, out: &mut String) {
        out.push('(');
        out.push_str(self.kind());
        for child in self.children() {
            if !child.is_named() || child.is_extra() {
                continue;
            }
            out.push(' ');
            if let Some(field) = child.field_name() {
                out.push_str(field);
                out.push_str(": ");
            }
            child.write_sexp(out);
        }
        out.push(')');
    }
}

/// Pre-order iterator over a subtree.
pub struct Preorder<'tree> {
    tree: &'tree Tree,
    stack: Vec<usize>,
}

impl<'tree> Iterator for Preorder<'tree> {
    type Item = Node<'tree>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.tree.nodes[id].children.iter().rev().copied());
        Some(Node { tree: self.tree, id })
    }
}
