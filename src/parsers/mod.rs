//! Parser adapter
//!
//! [`ParserAdapter`] owns a [`Grammar`] and turns source text into [`Tree`]s.
//! A reparse takes the previous tree as a hint; the hint may only make the
//! call cheaper, never change its result.

pub mod kamailio;

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, trace};

use crate::syntax::{LANGUAGE_VERSION, Language, MIN_COMPATIBLE_LANGUAGE_VERSION, Tree};

pub use kamailio::KamailioGrammar;

/// A grammar that can produce syntax trees.
///
/// Implementations must be total: every input yields a tree, with malformed
/// regions represented as error nodes.
pub trait Grammar: Send + Sync {
    fn language(&self) -> Language;

    fn parse(&self, source: Arc<str>) -> Tree;
}

/// Failure to set up a parser. Parsing itself cannot fail.
#[derive(Debug, Error)]
pub enum ParserError {
    #[error(
        "grammar '{name}' has version {version}, supported versions are {min}..={max}"
    )]
    IncompatibleLanguage {
        name: &'static str,
        version: u32,
        min: u32,
        max: u32,
    },
    #[error("grammar '{0}' declares no node kinds")]
    EmptyLanguage(&'static str),
}

pub struct ParserAdapter {
    grammar: Box<dyn Grammar>,
    language: Language,
}

impl std::fmt::Debug for ParserAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParserAdapter")
            .field("language", &self.language.name())
            .finish()
    }
}

impl ParserAdapter {
    /// Loads `grammar`, validating its language descriptor.
    ///
    /// # Returns
    /// The adapter, or a [`ParserError`] if the grammar cannot be used. This is
    /// the only failure the adapter can report.
    pub fn new(grammar: Box<dyn Grammar>) -> Result<Self, ParserError> {
        let language = grammar.language();
        let version = language.version();
        if !(MIN_COMPATIBLE_LANGUAGE_VERSION..=LANGUAGE_VERSION).contains(&version) {
            return Err(ParserError::IncompatibleLanguage {
                name: language.name(),
                version,
                min: MIN_COMPATIBLE_LANGUAGE_VERSION,
                max: LANGUAGE_VERSION,
            });
        }
        if language.node_kind_count() == 0 {
            return Err(ParserError::EmptyLanguage(language.name()));
        }
        debug!(
            "Loaded grammar '{}' (version {}, {} node kinds, {} fields)",
            language.name(),
            version,
            language.node_kind_count(),
            language.field_count()
        );
        Ok(Self { grammar, language })
    }

    /// Adapter for the built-in Kamailio grammar.
    pub fn kamailio() -> Result<Self, ParserError> {
        Self::new(Box::new(KamailioGrammar::new()))
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Parses `source` from scratch.
    pub fn parse(&self, source: &str) -> Tree {
        trace!("Full parse of {} bytes", source.len());
        self.grammar.parse(Arc::from(source))
    }

    /// Parses `source` using `previous` as a hint.
    ///
    /// The previous tree is reused as-is when the text is unchanged and it was
    /// produced by the same language; otherwise this is a fresh parse.
    pub fn reparse(&self, source: &str, previous: &Tree) -> Tree {
        if previous.language() != self.language.name() {
            debug!(
                "Ignoring reparse hint from language '{}', parsing afresh",
                previous.language()
            );
            return self.parse(source);
        }
        if previous.source() == source {
            trace!("Source unchanged, reusing previous tree");
            return previous.clone();
        }
        self.parse(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::kinds::NAMED_KINDS;

    struct LegacyGrammar;

    impl Grammar for LegacyGrammar {
        fn language(&self) -> Language {
            Language::new("legacy", LANGUAGE_VERSION + 1, NAMED_KINDS, &[], &[])
        }

        fn parse(&self, source: Arc<str>) -> Tree {
            KamailioGrammar::new().parse(source)
        }
    }

    struct ForeignGrammar;

    impl Grammar for ForeignGrammar {
        fn language(&self) -> Language {
            Language::new("foreign", LANGUAGE_VERSION, NAMED_KINDS, &[], &[])
        }

        fn parse(&self, source: Arc<str>) -> Tree {
            let root = crate::syntax::RawNode::branch("source_file", Vec::new())
                .spanning(0, source.len());
            crate::syntax::build_tree("foreign", source, root)
        }
    }

    #[test]
    fn test_incompatible_grammar_is_rejected() {
        let result = ParserAdapter::new(Box::new(LegacyGrammar));
        assert!(matches!(
            result,
            Err(ParserError::IncompatibleLanguage { name: "legacy", .. })
        ));
    }

    #[test]
    fn test_reparse_reuses_identical_tree() {
        let adapter = ParserAdapter::kamailio().expect("grammar loads");
        let first = adapter.parse("xlog(\"hi\");");
        let second = adapter.reparse("xlog(\"hi\");", &first);
        assert!(first.ptr_eq(&second));
    }

    #[test]
    fn test_reparse_matches_fresh_parse_after_edit() {
        let adapter = ParserAdapter::kamailio().expect("grammar loads");
        let first = adapter.parse("xlog(\"hi\");");
        let edited = "xlog(\"hi\"); drop;";
        let reparsed = adapter.reparse(edited, &first);
        let fresh = adapter.parse(edited);
        assert!(!first.ptr_eq(&reparsed));
        assert_eq!(reparsed.root_node().to_sexp(), fresh.root_node().to_sexp());
    }

    #[test]
    fn test_reparse_with_foreign_hint_falls_back() {
        let foreign = ParserAdapter::new(Box::new(ForeignGrammar)).expect("grammar loads");
        let hint = foreign.parse("drop;");
        let adapter = ParserAdapter::kamailio().expect("grammar loads");
        let tree = adapter.reparse("drop;", &hint);
        assert_eq!(tree.language(), "kamailio_cfg");
        assert_eq!(
            tree.root_node().to_sexp(),
            "(source_file (statement (core_function)))"
        );
    }
}
