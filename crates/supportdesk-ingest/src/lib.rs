//! SupportDesk Ingest: text extraction, chunking, document ingestion.

pub mod chunking;
pub mod file;
pub mod ingest;

pub use chunking::{RecursiveChunker, TextChunk};
pub use file::{extract_text, FileType};
pub use ingest::{IngestOutcome, Ingester};
