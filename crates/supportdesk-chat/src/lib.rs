//! SupportDesk Chat: LLM provider clients, response generation, and
//! normalization of streamed provider payloads.

pub mod config;
pub mod error;
pub mod generator;
pub mod normalizer;
pub mod providers;
pub mod registry;
pub mod sse;
pub mod types;

pub use config::LLMConfig;
pub use error::LlmError;
pub use generator::ResponseGenerator;
pub use normalizer::{normalize, IncrementalTextSource, NormalizedStream, StreamEvent, Transcript};
pub use registry::{ProviderClient, ProviderRegistry};
pub use types::{Completion, CompletionRequest, MediaKind, MediaRef, ProviderKind};
