//! Backend state
//!
//! [`KamailioBackend`] is cloned into every request handler; the clones share
//! one [`DocumentStore`] behind a mutex. The lock is only ever held for a
//! synchronous analysis or lookup, never across an `.await`.

use std::sync::Arc;

use parking_lot::Mutex;
use tower_lsp::Client;

use crate::lsp::document::DocumentStore;
use crate::settings::ServerSettings;

/// The Kamailio language server backend.
#[derive(Clone)]
pub struct KamailioBackend {
    pub(super) client: Client,
    pub(super) store: Arc<Mutex<DocumentStore>>,
    /// Settings given on the command line; client settings fall back to them.
    pub(super) cli_settings: Arc<ServerSettings>,
}

impl std::fmt::Debug for KamailioBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KamailioBackend")
            .field("store", &*self.store.lock())
            .field("cli_settings", &self.cli_settings)
            .finish()
    }
}
