//! Shared application state.

use parking_lot::Mutex;
use supportdesk_chat::ResponseGenerator;
use supportdesk_core::SupportDeskConfig;
use supportdesk_store::SqliteStore;
use tokio::sync::mpsc;
use tracing::error;

use crate::auth::AuthManager;

/// A request to (re)ingest an uploaded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestionRequest {
    pub document_id: i64,
}

/// Shared application state accessible from all route handlers.
pub struct AppState {
    pub config: SupportDeskConfig,
    pub store: SqliteStore,
    pub generator: ResponseGenerator,
    pub auth: AuthManager,
    pub ingestion_tx: mpsc::UnboundedSender<IngestionRequest>,
    ingestion_rx: Mutex<Option<mpsc::UnboundedReceiver<IngestionRequest>>>,
}

impl AppState {
    pub fn new(config: SupportDeskConfig, store: SqliteStore, generator: ResponseGenerator) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let auth = AuthManager::new(&config.jwt_secret, config.token_ttl);

        Self {
            config,
            store,
            generator,
            auth,
            ingestion_tx: tx,
            ingestion_rx: Mutex::new(Some(rx)),
        }
    }

    /// Take the ingestion receiver (can only be called once, by the worker).
    pub fn take_ingestion_rx(&self) -> Option<mpsc::UnboundedReceiver<IngestionRequest>> {
        self.ingestion_rx.lock().take()
    }

    /// Queue a document for background ingestion.
    pub fn queue_ingestion(&self, document_id: i64) {
        if self.ingestion_tx.send(IngestionRequest { document_id }).is_err() {
            error!("Ingestion queue closed, document {} not queued", document_id);
        }
    }
}
