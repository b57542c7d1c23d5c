use thiserror::Error;

/// Errors from LLM provider selection and completion.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LlmError {
    /// The active provider has no credential (or endpoint) configured
    #[error("{0}")]
    Configuration(String),

    /// The configured provider name is not one of the known vendors
    #[error("Unsupported LLM provider: {0}")]
    UnsupportedProvider(String),

    /// Transport or vendor failure, carrying the vendor's message
    #[error("Failed to generate response: {0}")]
    Generation(String),
}

impl LlmError {
    pub fn generation(msg: impl Into<String>) -> Self {
        Self::Generation(msg.into())
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        Self::Generation(e.to_string())
    }
}
