//! LSP protocol handler implementations
//!
//! - Lifecycle handlers (initialize, initialized, shutdown)
//! - Document lifecycle (did_open, did_change, did_close)
//! - Configuration (did_change_configuration)
//! - Information providers (hover, completion, goto_definition,
//!   document_symbol, formatting)

use tower_lsp::jsonrpc::Result as LspResult;
use tower_lsp::lsp_types::{
    CompletionOptions, CompletionParams, CompletionResponse, DidChangeConfigurationParams,
    DidChangeTextDocumentParams, DidCloseTextDocumentParams, DidOpenTextDocumentParams,
    DocumentFormattingParams, DocumentSymbol, DocumentSymbolParams, DocumentSymbolResponse,
    GotoDefinitionParams, GotoDefinitionResponse, Hover, HoverContents, HoverParams,
    HoverProviderCapability, InitializeParams, InitializeResult, InitializedParams, Location,
    MarkupContent, MarkupKind, OneOf, ServerCapabilities, ServerInfo, SymbolKind,
    TextDocumentSyncCapability, TextDocumentSyncKind, TextEdit,
};
use tower_lsp::LanguageServer;
use tracing::{debug, info, warn};

use super::state::KamailioBackend;
use super::utils::{to_lsp_completion, whole_document};
use crate::lsp::features::FormattingOptions;
use crate::lsp::position::{position_to_point, range_to_lsp};
use crate::settings::ServerSettings;

#[tower_lsp::async_trait]
impl LanguageServer for KamailioBackend {
    /// Merges client settings over the command line and loads documentation.
    async fn initialize(&self, params: InitializeParams) -> LspResult<InitializeResult> {
        info!(
            "Received initialize from {:?}",
            params.client_info.as_ref().map(|c| c.name.as_str())
        );

        let client_settings = match params.initialization_options.as_ref() {
            Some(options) => ServerSettings::from_value(options).unwrap_or_else(|e| {
                warn!("Ignoring initializationOptions: {}", e);
                ServerSettings::default()
            }),
            None => ServerSettings::default(),
        };
        let settings = client_settings.with_fallback(&self.cli_settings);
        // The store starts without documentation, so load unconditionally.
        let docs = Self::load_documentation(&settings).await;
        {
            let mut store = self.store.lock();
            store.set_documentation(docs);
            store.set_settings(settings);
        }

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::FULL,
                )),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                completion_provider: Some(CompletionOptions {
                    resolve_provider: Some(false),
                    trigger_characters: Some(vec!["$".to_string()]),
                    ..Default::default()
                }),
                definition_provider: Some(OneOf::Left(true)),
                document_symbol_provider: Some(OneOf::Left(true)),
                document_formatting_provider: Some(OneOf::Left(true)),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _params: InitializedParams) {
        info!("Initialized");
    }

    async fn shutdown(&self) -> LspResult<()> {
        info!("Received shutdown request");
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let document = params.text_document;
        let diagnostics = self
            .store
            .lock()
            .open(&document.uri, document.version, &document.text);
        self.publish(document.uri, Some(document.version), diagnostics)
            .await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        let version = params.text_document.version;
        debug!("textDocument/didChange: {} version {}", uri, version);
        let diagnostics = {
            let mut store = self.store.lock();
            match store.apply_changes(&uri, version, &params.content_changes) {
                Some(diagnostics) => Some(diagnostics),
                // Not open: only a full-text change can stand in for an open.
                None => params
                    .content_changes
                    .iter()
                    .rev()
                    .find(|c| c.range.is_none())
                    .map(|c| store.change(&uri, version, &c.text)),
            }
        };
        match diagnostics {
            Some(diagnostics) => self.publish(uri, Some(version), diagnostics).await,
            None => warn!("Dropping ranged change for unopened document {}", uri),
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        self.store.lock().close(&uri);
        self.client.publish_diagnostics(uri, Vec::new(), None).await;
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        let settings = match ServerSettings::from_value(&params.settings) {
            Ok(settings) => settings.with_fallback(&self.cli_settings),
            Err(e) => {
                warn!("Ignoring configuration change: {}", e);
                return;
            }
        };
        self.apply_settings(settings).await;
        let published = self.store.lock().reanalyze_all();
        for (uri, version, diagnostics) in published {
            self.publish(uri, Some(version), diagnostics).await;
        }
    }

    async fn hover(&self, params: HoverParams) -> LspResult<Option<Hover>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;
        let store = self.store.lock();
        let Some(document) = store.get(&uri) else {
            return Ok(None);
        };
        let point = position_to_point(&document.text, position);
        let Some((value, range)) = store.hover(&uri, point) else {
            return Ok(None);
        };
        Ok(Some(Hover {
            contents: HoverContents::Markup(MarkupContent {
                kind: MarkupKind::Markdown,
                value,
            }),
            range: Some(range_to_lsp(&document.text, &range)),
        }))
    }

    async fn completion(&self, params: CompletionParams) -> LspResult<Option<CompletionResponse>> {
        let uri = params.text_document_position.text_document.uri;
        let items: Vec<_> = self
            .store
            .lock()
            .list_completions(&uri)
            .into_iter()
            .map(to_lsp_completion)
            .collect();
        debug!("Returning {} completion items for {}", items.len(), uri);
        Ok(Some(CompletionResponse::Array(items)))
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> LspResult<Option<GotoDefinitionResponse>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;
        let store = self.store.lock();
        let Some(document) = store.get(&uri) else {
            return Ok(None);
        };
        let point = position_to_point(&document.text, position);
        Ok(store.definition(&uri, point).map(|route| {
            GotoDefinitionResponse::Scalar(Location::new(
                uri.clone(),
                range_to_lsp(&document.text, &route.selection_range),
            ))
        }))
    }

    async fn document_symbol(
        &self,
        params: DocumentSymbolParams,
    ) -> LspResult<Option<DocumentSymbolResponse>> {
        let uri = params.text_document.uri;
        let store = self.store.lock();
        let (Some(document), Some(routes)) = (store.get(&uri), store.document_symbols(&uri)) else {
            return Ok(None);
        };
        #[allow(deprecated)]
        let symbols = routes
            .iter()
            .map(|route| DocumentSymbol {
                name: route.label(),
                detail: None,
                kind: SymbolKind::FUNCTION,
                tags: None,
                deprecated: None,
                range: range_to_lsp(&document.text, &route.range),
                selection_range: range_to_lsp(&document.text, &route.selection_range),
                children: None,
            })
            .collect();
        Ok(Some(DocumentSymbolResponse::Nested(symbols)))
    }

    async fn formatting(&self, params: DocumentFormattingParams) -> LspResult<Option<Vec<TextEdit>>> {
        let uri = params.text_document.uri;
        let options = FormattingOptions {
            insert_spaces: params.options.insert_spaces,
            tab_size: params.options.tab_size,
        };
        let store = self.store.lock();
        let Some(document) = store.get(&uri) else {
            return Ok(None);
        };
        let edits = match store.format(&uri, options) {
            Some(new_text) => vec![TextEdit::new(whole_document(&document.text), new_text)],
            None => Vec::new(),
        };
        Ok(Some(edits))
    }
}
