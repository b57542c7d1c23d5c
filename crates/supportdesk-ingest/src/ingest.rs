//! Document ingestion pipeline: file → text → chunk → store.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::chunking::RecursiveChunker;
use crate::file::{self, FileType};
use supportdesk_core::{Error, Result};
use supportdesk_store::{DocumentStatus, NewChunk, SqliteStore};

/// Result of ingesting one document.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestOutcome {
    pub document_id: i64,
    pub chunk_count: usize,
    /// Set when the document completed without extractable text.
    pub note: Option<String>,
}

/// Handles document ingestion: text extraction, chunking, and storage.
pub struct Ingester<'a> {
    store: &'a SqliteStore,
    chunker: RecursiveChunker,
}

impl<'a> Ingester<'a> {
    pub fn new(store: &'a SqliteStore) -> Self {
        Self {
            store,
            chunker: RecursiveChunker::default(),
        }
    }

    pub fn with_chunker(store: &'a SqliteStore, chunker: RecursiveChunker) -> Self {
        Self { store, chunker }
    }

    /// Ingest a stored document by ID.
    ///
    /// Status moves pending → processing → completed, or failed with the error
    /// recorded. Existing chunks are replaced, so re-ingestion never duplicates.
    pub fn ingest_document(&self, doc_id: i64) -> Result<IngestOutcome> {
        let doc = self
            .store
            .get_document(doc_id)?
            .ok_or_else(|| Error::NotFound(format!("document {}", doc_id)))?;

        self.store.mark_document_processing(doc_id)?;

        match self.process(doc_id, Path::new(&doc.file_path)) {
            Ok(outcome) => {
                self.store.finish_document(
                    doc_id,
                    DocumentStatus::Completed,
                    outcome.chunk_count as i64,
                    outcome.note.as_deref(),
                )?;
                info!(
                    "Ingested document {} ({}) with {} chunks",
                    doc_id, doc.original_name, outcome.chunk_count
                );
                Ok(outcome)
            }
            Err(e) => {
                warn!("Ingestion failed for document {}: {}", doc_id, e);
                self.store
                    .finish_document(doc_id, DocumentStatus::Failed, 0, Some(&e.to_string()))?;
                Err(e)
            }
        }
    }

    fn process(&self, doc_id: i64, path: &Path) -> Result<IngestOutcome> {
        let text = match file::extract_text(path)? {
            Some(t) if !t.trim().is_empty() => t,
            _ => {
                debug!("No text extracted from {}", path.display());
                let note = if FileType::from_path(path) == FileType::Pdf {
                    "PDF text extraction is not available"
                } else {
                    "No extractable text"
                };
                self.store.replace_document_chunks(doc_id, &[])?;
                return Ok(IngestOutcome {
                    document_id: doc_id,
                    chunk_count: 0,
                    note: Some(note.to_string()),
                });
            }
        };

        let chunks: Vec<NewChunk> = self
            .chunker
            .chunk(&text)
            .into_iter()
            .map(|c| NewChunk {
                chunk_index: c.chunk_index as i32,
                content: c.text,
                start_char: Some(c.start_char as i64),
                end_char: Some(c.end_char as i64),
            })
            .collect();

        let chunk_count = self.store.replace_document_chunks(doc_id, &chunks)?;
        Ok(IngestOutcome {
            document_id: doc_id,
            chunk_count,
            note: None,
        })
    }
}
