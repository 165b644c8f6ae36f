//! Kamailio routing-script grammar

pub mod lexer;
pub mod parser;

use std::sync::Arc;

use crate::parsers::Grammar;
use crate::syntax::kinds::{FIELDS, KEYWORDS, NAMED_KINDS, PUNCTUATION};
use crate::syntax::{LANGUAGE_VERSION, Language, Tree, build_tree};

pub const LANGUAGE_NAME: &str = "kamailio_cfg";

/// Descriptor of the Kamailio grammar.
pub const LANGUAGE: Language = Language::new(
    LANGUAGE_NAME,
    LANGUAGE_VERSION,
    NAMED_KINDS,
    &[KEYWORDS, PUNCTUATION],
    FIELDS,
);

/// Grammar for `kamailio.cfg` style routing scripts.
#[derive(Debug, Clone, Copy, Default)]
pub struct KamailioGrammar;

impl KamailioGrammar {
    pub fn new() -> Self {
        Self
    }
}

impl Grammar for KamailioGrammar {
    fn language(&self) -> Language {
        LANGUAGE
    }

    fn parse(&self, source: Arc<str>) -> Tree {
        let root = parser::parse(&source);
        build_tree(LANGUAGE_NAME, source, root)
    }
}
