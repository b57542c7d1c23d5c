//! Best-effort context retrieval for a support question.
//!
//! Each source (FAQs, document chunks) is searched with FTS5 first. A source
//! that yields nothing falls back to substring matching on the raw query
//! terms; the other source is left untouched.

use serde::Serialize;
use tracing::{debug, warn};

use supportdesk_core::Result;
use supportdesk_store::{ChunkHit, FaqHit, SqliteStore};

pub const MAX_FAQ_RESULTS: usize = 5;
pub const MAX_CHUNK_RESULTS: usize = 5;

/// Which strategy produced a source's results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStrategy {
    FullText,
    Substring,
    /// Retrieval failed; the result set is empty.
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FaqSnippet {
    pub id: i64,
    pub question: String,
    pub answer: String,
    pub score: f64,
}

impl From<FaqHit> for FaqSnippet {
    fn from(hit: FaqHit) -> Self {
        Self {
            id: hit.faq_id,
            question: hit.question,
            answer: hit.answer,
            score: hit.score,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkSnippet {
    pub id: i64,
    pub document_id: i64,
    pub content: String,
    /// Original name of the source document.
    pub source_name: Option<String>,
    pub score: f64,
}

impl From<ChunkHit> for ChunkSnippet {
    fn from(hit: ChunkHit) -> Self {
        Self {
            id: hit.chunk_id,
            document_id: hit.document_id,
            content: hit.content,
            source_name: hit.original_name,
            score: hit.score,
        }
    }
}

/// Context for one query: up to five FAQs and five document chunks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedContext {
    pub faqs: Vec<FaqSnippet>,
    pub chunks: Vec<ChunkSnippet>,
    pub faq_strategy: SearchStrategy,
    pub chunk_strategy: SearchStrategy,
    /// Why retrieval degraded, when it did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degraded: Option<String>,
}

impl RetrievedContext {
    /// Empty context.
    pub fn empty() -> Self {
        Self {
            faqs: Vec::new(),
            chunks: Vec::new(),
            faq_strategy: SearchStrategy::FullText,
            chunk_strategy: SearchStrategy::FullText,
            degraded: None,
        }
    }

    /// Empty context after a retrieval failure.
    pub fn degraded(reason: impl Into<String>) -> Self {
        Self {
            faqs: Vec::new(),
            chunks: Vec::new(),
            faq_strategy: SearchStrategy::Unavailable,
            chunk_strategy: SearchStrategy::Unavailable,
            degraded: Some(reason.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.faqs.is_empty() && self.chunks.is_empty()
    }
}

/// Keyword retriever over the FAQ and chunk indexes.
pub struct ContextRetriever<'a> {
    store: &'a SqliteStore,
}

impl<'a> ContextRetriever<'a> {
    pub fn new(store: &'a SqliteStore) -> Self {
        Self { store }
    }

    /// Retrieve context; never fails. Store errors yield a degraded, empty context.
    pub fn retrieve(&self, query: &str) -> RetrievedContext {
        match self.try_retrieve(query) {
            Ok(ctx) => ctx,
            Err(e) => {
                warn!("Context retrieval failed, answering without context: {}", e);
                RetrievedContext::degraded(e.to_string())
            }
        }
    }

    /// Retrieve context, surfacing store errors.
    pub fn try_retrieve(&self, query: &str) -> Result<RetrievedContext> {
        let terms: Vec<&str> = query.split_whitespace().collect();

        let (faqs, faq_strategy) = {
            let hits = self.store.search_faqs(query, MAX_FAQ_RESULTS)?;
            if hits.is_empty() {
                (
                    self.store.search_faqs_substring(&terms, MAX_FAQ_RESULTS)?,
                    SearchStrategy::Substring,
                )
            } else {
                (hits, SearchStrategy::FullText)
            }
        };

        let (chunks, chunk_strategy) = {
            let hits = self.store.search_chunks(query, MAX_CHUNK_RESULTS)?;
            if hits.is_empty() {
                (
                    self.store.search_chunks_substring(&terms, MAX_CHUNK_RESULTS)?,
                    SearchStrategy::Substring,
                )
            } else {
                (hits, SearchStrategy::FullText)
            }
        };

        debug!(
            "Retrieved {} faqs ({:?}), {} chunks ({:?}) for query",
            faqs.len(),
            faq_strategy,
            chunks.len(),
            chunk_strategy
        );

        Ok(RetrievedContext {
            faqs: faqs.into_iter().map(FaqSnippet::from).collect(),
            chunks: chunks.into_iter().map(ChunkSnippet::from).collect(),
            faq_strategy,
            chunk_strategy,
            degraded: None,
        })
    }
}
