//! Background ingestion queue: extracts and chunks uploaded documents.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::state::AppState;
use supportdesk_ingest::Ingester;

/// Start the background ingestion worker task.
pub fn start_ingestion_worker(state: Arc<AppState>) {
    let mut rx = match state.take_ingestion_rx() {
        Some(rx) => rx,
        None => {
            error!("Ingestion worker already started");
            return;
        }
    };

    tokio::spawn(async move {
        info!("Background ingestion worker started");
        while let Some(request) = rx.recv().await {
            let state = state.clone();
            // SQLite and file extraction block
            let result = tokio::task::spawn_blocking(move || {
                process_document(&state, request.document_id)
            })
            .await;
            if let Err(e) = result {
                error!("Ingestion task for document {} panicked: {}", request.document_id, e);
            }
        }
    });
}

/// Ingest one document. Failures are recorded on the document row.
pub fn process_document(state: &AppState, document_id: i64) {
    info!("Processing document {}", document_id);
    match Ingester::new(&state.store).ingest_document(document_id) {
        Ok(outcome) => match outcome.note {
            Some(note) => warn!("Document {} ingested with note: {}", document_id, note),
            None => info!("Document {} ingested: {} chunks", document_id, outcome.chunk_count),
        },
        Err(e) => error!("Failed to ingest document {}: {}", document_id, e),
    }
}
