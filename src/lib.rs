pub mod diagnostics;
pub mod docs;
pub mod logging;
pub mod lsp;
pub mod parsers;
pub mod query;
pub mod settings;
pub mod symbols;
pub mod syntax;
