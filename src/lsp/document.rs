//! Per-document analysis state
//!
//! [`DocumentStore`] holds every open document together with the result of
//! its last analysis pass. `open` and `change` run the whole pipeline
//! (parse, diagnose, extract) before storing anything, so a stored document
//! never mixes results from two different texts.
//!
//! The store does no locking of its own; callers serialise access.

use std::fmt;
use std::sync::Arc;

use ropey::Rope;
use rustc_hash::FxHashMap;
use tower_lsp::lsp_types::{TextDocumentContentChangeEvent, Url};
use tracing::{debug, info, trace, warn};

use crate::diagnostics::{Diagnostic, DiagnosticAnalyzer};
use crate::docs::{DocumentationProvider, KnowledgeBase};
use crate::lsp::features::{
    self, CompletionItem, FormattingOptions, NOT_FOUND, completion_items,
};
use crate::lsp::position::position_to_char;
use crate::parsers::{ParserAdapter, ParserError};
use crate::settings::ServerSettings;
use crate::symbols::{RouteDefinition, RouteIndex, SymbolTables, VariableExtractor};
use crate::syntax::{Node, Point, Range, Tree};

/// One open document and the results of its last analysis.
#[derive(Debug, Clone)]
pub struct Document {
    pub uri: Url,
    pub version: i32,
    pub text: Rope,
    pub tree: Tree,
    pub diagnostics: Vec<Diagnostic>,
    pub symbols: SymbolTables,
    pub routes: RouteIndex,
}

impl Document {
    /// Smallest named node covering `point`.
    pub fn node_at(&self, point: Point) -> Option<Node<'_>> {
        self.tree
            .root_node()
            .named_descendant_for_point_range(point, point)
    }
}

/// Applies ranged or full-text changes to `text` in order.
pub fn apply_content_changes(text: &mut Rope, changes: &[TextDocumentContentChangeEvent]) {
    for change in changes {
        match change.range {
            Some(range) => {
                let start = position_to_char(text, range.start);
                let end = position_to_char(text, range.end).max(start);
                text.remove(start..end);
                text.insert(start, &change.text);
            }
            None => *text = Rope::from_str(&change.text),
        }
    }
}

pub struct DocumentStore {
    parser: ParserAdapter,
    analyzer: DiagnosticAnalyzer,
    extractor: VariableExtractor,
    docs: Arc<dyn DocumentationProvider>,
    settings: ServerSettings,
    documents: FxHashMap<Url, Document>,
}

impl fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentStore")
            .field("parser", &self.parser)
            .field("analyzer", &self.analyzer)
            .field("settings", &self.settings)
            .field("documents", &self.documents.len())
            .finish()
    }
}

impl DocumentStore {
    /// Store over the built-in grammar, without documentation.
    ///
    /// # Returns
    /// [`ParserError`] if the grammar cannot be loaded; nothing can be
    /// analysed in that case.
    pub fn new(settings: ServerSettings) -> Result<Self, ParserError> {
        let parser = ParserAdapter::kamailio()?;
        let language = parser.language();
        Ok(Self {
            analyzer: DiagnosticAnalyzer::new(&language),
            extractor: VariableExtractor::new(&language),
            parser,
            docs: Arc::new(KnowledgeBase::default()),
            settings,
            documents: FxHashMap::default(),
        })
    }

    pub fn settings(&self) -> &ServerSettings {
        &self.settings
    }

    /// Replaces the settings. Stored documents keep their results until
    /// [`Self::reanalyze_all`] runs.
    pub fn set_settings(&mut self, settings: ServerSettings) {
        self.settings = settings;
    }

    pub fn set_documentation(&mut self, docs: Arc<dyn DocumentationProvider>) {
        self.docs = docs;
    }

    fn analyze(&self, uri: &Url, version: i32, text: Rope, tree: Tree) -> Document {
        let diagnostics = self.analyzer.analyze(&tree, &self.settings.analysis());
        let symbols = self.extractor.extract(&tree);
        let routes = RouteIndex::from_tree(&tree);
        debug!(
            "Analysed {}: {} diagnostics, {} variables, {} routes",
            uri,
            diagnostics.len(),
            symbols.len(),
            routes.routes().len()
        );
        Document {
            uri: uri.clone(),
            version,
            text,
            tree,
            diagnostics,
            symbols,
            routes,
        }
    }

    fn published(&self, document: &Document) -> Vec<Diagnostic> {
        if self.settings.diagnostics_enabled {
            document.diagnostics.clone()
        } else {
            Vec::new()
        }
    }

    /// Parses and analyses a newly opened document.
    ///
    /// # Returns
    /// The diagnostics to publish; empty when diagnostics are disabled.
    pub fn open(&mut self, uri: &Url, version: i32, text: &str) -> Vec<Diagnostic> {
        info!("Opening {} (version {})", uri, version);
        let tree = self.parser.parse(text);
        let document = self.analyze(uri, version, Rope::from_str(text), tree);
        let published = self.published(&document);
        self.documents.insert(uri.clone(), document);
        published
    }

    /// Re-analyses a document from its full new text.
    ///
    /// A change for a document that was never opened is treated as an open.
    /// An empty result means the document currently has no diagnostics.
    pub fn change(&mut self, uri: &Url, version: i32, text: &str) -> Vec<Diagnostic> {
        let Some(previous) = self.documents.get(uri) else {
            warn!("Change for unopened document {}, opening it", uri);
            return self.open(uri, version, text);
        };
        trace!("Changing {} to version {}", uri, version);
        let tree = self.parser.reparse(text, &previous.tree);
        let document = self.analyze(uri, version, Rope::from_str(text), tree);
        let published = self.published(&document);
        self.documents.insert(uri.clone(), document);
        published
    }

    /// Applies editor changes to the stored text and re-analyses it.
    ///
    /// # Returns
    /// `None` if the document is not open.
    pub fn apply_changes(
        &mut self,
        uri: &Url,
        version: i32,
        changes: &[TextDocumentContentChangeEvent],
    ) -> Option<Vec<Diagnostic>> {
        let mut text = self.documents.get(uri)?.text.clone();
        apply_content_changes(&mut text, changes);
        Some(self.change(uri, version, &text.to_string()))
    }

    pub fn close(&mut self, uri: &Url) -> bool {
        let removed = self.documents.remove(uri).is_some();
        if removed {
            info!("Closed {}", uri);
        } else {
            warn!("Close for unopened document {}", uri);
        }
        removed
    }

    pub fn get(&self, uri: &Url) -> Option<&Document> {
        self.documents.get(uri)
    }

    pub fn uris(&self) -> Vec<Url> {
        let mut uris: Vec<Url> = self.documents.keys().cloned().collect();
        uris.sort();
        uris
    }

    /// Re-runs analysis on every open document under the current settings.
    ///
    /// # Returns
    /// The diagnostics to publish per document, ordered by URI.
    pub fn reanalyze_all(&mut self) -> Vec<(Url, i32, Vec<Diagnostic>)> {
        let mut published = Vec::new();
        for uri in self.uris() {
            let Some(previous) = self.documents.remove(&uri) else {
                continue;
            };
            let document = self.analyze(&uri, previous.version, previous.text, previous.tree);
            published.push((uri.clone(), document.version, self.published(&document)));
            self.documents.insert(uri, document);
        }
        published
    }

    /// Smallest named node covering `point` in the document at `uri`.
    pub fn resolve(&self, uri: &Url, point: Point) -> Option<Node<'_>> {
        self.documents.get(uri)?.node_at(point)
    }

    /// Documentation for the node at `point`, with the node's range.
    pub fn hover(&self, uri: &Url, point: Point) -> Option<(String, Range)> {
        let document = self.documents.get(uri)?;
        let node = document.node_at(point)?;
        let text = features::documentation_for(node, &document.symbols, self.docs.as_ref())
            .unwrap_or_else(|| NOT_FOUND.to_string());
        Some((text, node.range()))
    }

    /// Documentation for the node at `point`, or the not-found sentinel.
    pub fn hover_docs(&self, uri: &Url, point: Point) -> String {
        self.hover(uri, point)
            .map(|(text, _)| text)
            .unwrap_or_else(|| NOT_FOUND.to_string())
    }

    /// Completion candidates for the document at `uri`. An unknown
    /// document still gets the documentation-backed candidates.
    pub fn list_completions(&self, uri: &Url) -> Vec<CompletionItem> {
        let empty = SymbolTables::new();
        let symbols = self.documents.get(uri).map_or(&empty, |d| &d.symbols);
        completion_items(symbols, self.docs.as_ref())
    }

    /// Route declaration referenced at `point`.
    pub fn definition(&self, uri: &Url, point: Point) -> Option<&RouteDefinition> {
        let document = self.documents.get(uri)?;
        features::definition_for(document.node_at(point)?, &document.routes)
    }

    pub fn document_symbols(&self, uri: &Url) -> Option<&[RouteDefinition]> {
        self.documents.get(uri).map(|d| d.routes.routes())
    }

    /// Re-indented text of the document, if it differs from the current one.
    pub fn format(&self, uri: &Url, options: FormattingOptions) -> Option<String> {
        let document = self.documents.get(uri)?;
        let current = document.text.to_string();
        features::format_text(&current, options).filter(|formatted| *formatted != current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower_lsp::lsp_types::{Position, Range as LspRange};

    fn uri() -> Url {
        Url::parse("file:///etc/kamailio/kamailio.cfg").unwrap()
    }

    fn store() -> DocumentStore {
        DocumentStore::new(ServerSettings::default()).unwrap()
    }

    #[test]
    fn test_open_change_close() {
        let mut store = store();
        let diagnostics = store.open(&uri(), 1, "request_route {\n  exit;\n  drop;\n}\n");
        assert_eq!(diagnostics.len(), 1);

        let cleared = store.change(&uri(), 2, "request_route {\n  exit;\n}\n");
        assert!(cleared.is_empty());
        assert_eq!(store.get(&uri()).unwrap().version, 2);

        assert!(store.close(&uri()));
        assert!(store.get(&uri()).is_none());
        assert!(!store.close(&uri()));
    }

    #[test]
    fn test_change_without_open_opens() {
        let mut store = store();
        store.change(&uri(), 3, "$var(a) = 1;\n");
        assert_eq!(store.uris(), vec![uri()]);
    }

    #[test]
    fn test_disabled_diagnostics_are_still_computed() {
        let mut store = DocumentStore::new(ServerSettings {
            diagnostics_enabled: false,
            ..ServerSettings::default()
        })
        .unwrap();
        let published = store.open(&uri(), 1, "request_route {\n  exit;\n  drop;\n}\n");
        assert!(published.is_empty());
        assert_eq!(store.get(&uri()).unwrap().diagnostics.len(), 1);
    }

    #[test]
    fn test_settings_change_needs_reanalysis() {
        let mut store = store();
        store.open(&uri(), 1, "# old style\nrequest_route {\n}\n");
        assert!(store.get(&uri()).unwrap().diagnostics.is_empty());

        store.set_settings(ServerSettings {
            deprecated_comment_hints_enabled: true,
            ..ServerSettings::default()
        });
        let published = store.reanalyze_all();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].2[0].message, "use /* comment */");
    }

    #[test]
    fn test_apply_ranged_changes() {
        let mut store = store();
        store.open(&uri(), 1, "request_route {\n  drop;\n}\n");
        let change = TextDocumentContentChangeEvent {
            range: Some(LspRange::new(Position::new(1, 2), Position::new(1, 6))),
            range_length: None,
            text: "exit".to_string(),
        };
        store.apply_changes(&uri(), 2, &[change]).unwrap();
        assert_eq!(
            store.get(&uri()).unwrap().text.to_string(),
            "request_route {\n  exit;\n}\n"
        );
        assert!(store.apply_changes(&Url::parse("file:///other.cfg").unwrap(), 1, &[]).is_none());
    }

    #[test]
    fn test_hover_sentinel() {
        let mut store = store();
        store.open(&uri(), 1, "request_route {\n  drop;\n}\n");
        assert_eq!(store.hover_docs(&uri(), Point::new(1, 3)), NOT_FOUND);
        assert_eq!(store.hover_docs(&uri(), Point::new(40, 0)), NOT_FOUND);
    }

    #[test]
    fn test_format_only_when_changed() {
        let mut store = store();
        store.open(&uri(), 1, "route[A] {\n\texit;\n}\n");
        assert_eq!(store.format(&uri(), FormattingOptions::default()), None);
        store.change(&uri(), 2, "route[A]{\nexit;\n}\n");
        assert_eq!(
            store.format(&uri(), FormattingOptions::default()).as_deref(),
            Some("route[A] {\n\texit;\n}\n")
        );
    }
}
