//! Resolve: context retrieval over FAQs and document chunks, prompt assembly.

pub mod context;
pub mod prompt;

pub use context::{
    ChunkSnippet, ContextRetriever, FaqSnippet, RetrievedContext, SearchStrategy,
    MAX_CHUNK_RESULTS, MAX_FAQ_RESULTS,
};
pub use prompt::{build_prompt, HISTORY_TURNS};
