//! Editor features answered from an analysed document
//!
//! Each feature is a plain function over the document's tree, symbol
//! tables and the documentation collaborator; none of them keeps state.
//! [`crate::lsp::document::DocumentStore`] wires them to open documents.

pub mod completion;
pub mod formatting;
pub mod goto_definition;
pub mod hover;

pub use completion::{CompletionItem, CompletionKind, completion_items};
pub use formatting::{FormattingOptions, format_text};
pub use goto_definition::definition_for;
pub use hover::{NOT_FOUND, documentation_for};
