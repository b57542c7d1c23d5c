//! Provider selection and completion request/result types.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LlmError;
use crate::normalizer::IncrementalTextSource;

/// LLM vendor identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    Azure,
    Gemini,
    Claude,
    DeepSeek,
    Groq,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 6] = [
        Self::OpenAi,
        Self::Azure,
        Self::Gemini,
        Self::Claude,
        Self::DeepSeek,
        Self::Groq,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Azure => "azure",
            Self::Gemini => "gemini",
            Self::Claude => "claude",
            Self::DeepSeek => "deepseek",
            Self::Groq => "groq",
        }
    }

    /// Whether the vendor delivers incremental output. Groq is always
    /// called in blocking mode.
    pub fn streams_natively(&self) -> bool {
        !matches!(self, Self::Groq)
    }
}

impl FromStr for ProviderKind {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == name)
            .ok_or_else(|| LlmError::UnsupportedProvider(s.to_string()))
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Pdf,
    Document,
}

impl MediaKind {
    /// `pdf` for PDF files, `document` for everything else.
    pub fn from_file_type(file_type: &str) -> Self {
        if file_type.eq_ignore_ascii_case("pdf") {
            Self::Pdf
        } else {
            Self::Document
        }
    }
}

/// Reference to an uploaded file, by public URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    pub url: String,
    #[serde(rename = "type")]
    pub kind: MediaKind,
}

/// One completion call. Built per chat message and discarded after use.
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    pub prompt: String,
    pub stream: bool,
    pub media: Vec<MediaRef>,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn streaming(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    pub fn with_media(mut self, media: Vec<MediaRef>) -> Self {
        self.media = media;
        self
    }
}

/// Result of a completion: the whole answer, or a lazy source of raw payloads.
pub enum Completion {
    Text(String),
    Stream(IncrementalTextSource),
}

impl std::fmt::Debug for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Stream(source) => f.debug_tuple("Stream").field(source).finish(),
        }
    }
}
