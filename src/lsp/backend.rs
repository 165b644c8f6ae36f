use std::sync::Arc;

use parking_lot::Mutex;
use tower_lsp::Client;
use tower_lsp::lsp_types::Url;
use tracing::{debug, error, info};

use crate::docs::{DocumentationProvider, KnowledgeBase};
use crate::diagnostics::Diagnostic;
use crate::lsp::document::DocumentStore;
use crate::settings::ServerSettings;

mod handlers;
mod state;
mod utils;

pub use state::KamailioBackend;
use utils::to_lsp_diagnostics;

impl KamailioBackend {
    /// Creates the backend around `store`, whose settings are taken as the
    /// command-line defaults.
    pub fn new(client: Client, store: DocumentStore) -> Self {
        let cli_settings = Arc::new(store.settings().clone());
        Self {
            client,
            store: Arc::new(Mutex::new(store)),
            cli_settings,
        }
    }

    /// Loads module READMEs and the cookbook off the async runtime.
    async fn load_documentation(settings: &ServerSettings) -> Arc<dyn DocumentationProvider> {
        let source = settings.kamailio_source_path.clone();
        let cookbook = settings.cookbook_path.clone();
        match tokio::task::spawn_blocking(move || {
            KnowledgeBase::load(source.as_deref(), cookbook.as_deref())
        })
        .await
        {
            Ok(docs) => Arc::new(docs),
            Err(e) => {
                error!("Documentation loading task failed: {}", e);
                Arc::new(KnowledgeBase::default())
            }
        }
    }

    /// Applies new settings, reloading documentation when its sources moved.
    async fn apply_settings(&self, settings: ServerSettings) {
        let reload = {
            let store = self.store.lock();
            let current = store.settings();
            current.kamailio_source_path != settings.kamailio_source_path
                || current.cookbook_path != settings.cookbook_path
        };
        if reload {
            info!(
                "Loading documentation (source: {:?}, cookbook: {:?})",
                settings.kamailio_source_path, settings.cookbook_path
            );
            let docs = Self::load_documentation(&settings).await;
            self.store.lock().set_documentation(docs);
        }
        debug!("Applying settings: {:?}", settings);
        self.store.lock().set_settings(settings);
    }

    /// Publishes `diagnostics` for `uri`, converting ranges against the
    /// stored text.
    async fn publish(&self, uri: Url, version: Option<i32>, diagnostics: Vec<Diagnostic>) {
        let converted = {
            let store = self.store.lock();
            match store.get(&uri) {
                Some(document) => to_lsp_diagnostics(&document.text, &diagnostics),
                None => Vec::new(),
            }
        };
        debug!("Publishing {} diagnostics for {}", converted.len(), uri);
        self.client.publish_diagnostics(uri, converted, version).await;
    }
}
