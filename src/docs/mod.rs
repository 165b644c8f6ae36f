//! Documentation sources behind hover and completion
//!
//! [`DocumentationProvider`] is the lookup interface the document store
//! consumes. [`KnowledgeBase`] implements it over module READMEs, an
//! optional cookbook file and a built-in table of SIP headers.

pub mod cookbook;
pub mod modules;

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

pub use cookbook::{Cookbook, SIP_HEADERS};
pub use modules::{FunctionDoc, ModuleDoc, ModuleDocs};

#[derive(Debug, Error)]
pub enum DocumentationError {
    #[error("no module directory at {0:?}")]
    MissingModules(PathBuf),
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid cookbook {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Read-only documentation lookups.
pub trait DocumentationProvider: Send + Sync {
    /// Rendered documentation of a module function.
    fn find_function_doc(&self, name: &str) -> Option<String>;

    /// Documentation for a keyword or other free-text key.
    fn find_free_text_doc(&self, key: &str) -> Option<String>;

    /// All documented functions, in a stable order.
    fn functions(&self) -> Vec<&FunctionDoc>;

    /// All documented modules with a short summary, in a stable order.
    fn modules(&self) -> Vec<(&str, String)>;

    /// Keywords with their descriptions.
    fn keywords(&self) -> Vec<(&str, &str)>;

    /// Cookbook entries with their documentation.
    fn cookbook_entries(&self) -> Vec<(&str, &str)>;
}

#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    modules: ModuleDocs,
    cookbook: Cookbook,
}

impl KnowledgeBase {
    pub fn new(modules: ModuleDocs, cookbook: Cookbook) -> Self {
        Self { modules, cookbook }
    }

    /// Loads whatever sources are configured. A source that fails to load is
    /// logged and left empty; the server still runs without documentation.
    pub fn load(source: Option<&Path>, cookbook: Option<&Path>) -> Self {
        let modules = match source {
            Some(path) => ModuleDocs::load(path).unwrap_or_else(|err| {
                warn!("Module documentation unavailable: {}", err);
                ModuleDocs::default()
            }),
            None => ModuleDocs::default(),
        };
        let cookbook = match cookbook {
            Some(path) => Cookbook::load(path).unwrap_or_else(|err| {
                warn!("Cookbook unavailable: {}", err);
                Cookbook::default()
            }),
            None => Cookbook::default(),
        };
        info!(
            "Documentation ready: {} modules, {} cookbook entries",
            modules.modules().count(),
            cookbook.len()
        );
        Self { modules, cookbook }
    }
}

impl DocumentationProvider for KnowledgeBase {
    fn find_function_doc(&self, name: &str) -> Option<String> {
        self.modules
            .find_function(name)
            .map(FunctionDoc::render_with_module)
    }

    fn find_free_text_doc(&self, key: &str) -> Option<String> {
        if key.is_empty() {
            return None;
        }
        if let Some(doc) = self.cookbook.get(key) {
            return Some(doc.to_string());
        }
        SIP_HEADERS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(key))
            .map(|(name, description)| format!("## {}\n{}", name, description))
    }

    fn functions(&self) -> Vec<&FunctionDoc> {
        self.modules.functions().collect()
    }

    fn modules(&self) -> Vec<(&str, String)> {
        self.modules
            .modules()
            .map(|m| (m.name.as_str(), m.summary()))
            .collect()
    }

    fn keywords(&self) -> Vec<(&str, &str)> {
        SIP_HEADERS.to_vec()
    }

    fn cookbook_entries(&self) -> Vec<(&str, &str)> {
        self.cookbook.entries().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn knowledge_base() -> KnowledgeBase {
        let mut modules = ModuleDocs::default();
        modules.insert(modules::parse_readme(
            "tm",
            "1.1. t_relay()\n   Relays statefully.\n",
        ));
        let cookbook =
            Cookbook::from_json(r#"{"docs":[{"name":"xlog","documentation":"Logs."}]}"#).unwrap();
        KnowledgeBase::new(modules, cookbook)
    }

    #[test]
    fn test_function_lookup() {
        let kb = knowledge_base();
        let doc = kb.find_function_doc("t_relay").unwrap();
        assert!(doc.starts_with("# Module: tm\n\n## Function:\n\tt_relay"));
        assert!(kb.find_function_doc("t_reply").is_none());
    }

    #[test]
    fn test_free_text_lookup() {
        let kb = knowledge_base();
        assert_eq!(kb.find_free_text_doc("xlog").as_deref(), Some("Logs."));
        assert!(kb.find_free_text_doc("via").unwrap().starts_with("## Via"));
        assert!(kb.find_free_text_doc("").is_none());
        assert!(kb.find_free_text_doc("nothing").is_none());
    }

    #[test]
    fn test_missing_sources_leave_empty_docs() {
        let kb = KnowledgeBase::load(
            Some(Path::new("/nonexistent/kamailio")),
            Some(Path::new("/nonexistent/cookbook.json")),
        );
        assert!(kb.functions().is_empty());
        assert!(kb.cookbook_entries().is_empty());
        assert_eq!(kb.keywords().len(), SIP_HEADERS.len());
    }
}
