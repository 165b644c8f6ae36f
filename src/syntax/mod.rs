//! Syntax tree model
//!
//! Grammar-independent, read-only view over a parsed document plus the kind
//! constants and language descriptor of the Kamailio grammar.

pub mod builder;
pub mod kinds;
pub mod language;
pub mod tree;

pub use builder::{RawNode, build_tree};
pub use language::{LANGUAGE_VERSION, Language, MIN_COMPATIBLE_LANGUAGE_VERSION};
pub use tree::{Node, Point, Preorder, Range, Tree};
