//! LLM configuration: active provider, credentials, models, endpoints.
//!
//! Loaded from `llm-config.json` when present; any field the file leaves out
//! is taken from the environment, then from built-in defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::types::ProviderKind;

/// Sampling temperature for every completion call.
pub const TEMPERATURE: f64 = 0.7;
/// Maximum output tokens for every completion call.
pub const MAX_TOKENS: u32 = 1000;

pub const DEFAULT_PROVIDER: &str = "openai";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_AZURE_DEPLOYMENT: &str = "gpt-4";
pub const DEFAULT_AZURE_API_VERSION: &str = "2024-02-15-preview";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash-latest";
pub const DEFAULT_CLAUDE_MODEL: &str = "claude-3-sonnet-20240229";
pub const DEFAULT_DEEPSEEK_MODEL: &str = "deepseek-chat";
pub const DEFAULT_GROQ_MODEL: &str = "llama-3.1-8b-instant";

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const CLAUDE_BASE_URL: &str = "https://api.anthropic.com";
pub const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com";
pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Stored LLM configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LLMConfig {
    pub provider: Option<String>,

    pub openai_api_key: Option<String>,
    pub openai_model: Option<String>,
    pub openai_base_url: Option<String>,

    pub azure_endpoint: Option<String>,
    pub azure_api_key: Option<String>,
    pub azure_deployment: Option<String>,
    pub azure_api_version: Option<String>,

    pub gemini_api_key: Option<String>,
    pub gemini_model: Option<String>,
    pub gemini_base_url: Option<String>,

    pub claude_api_key: Option<String>,
    pub claude_model: Option<String>,
    pub claude_base_url: Option<String>,

    pub deepseek_api_key: Option<String>,
    pub deepseek_model: Option<String>,
    pub deepseek_base_url: Option<String>,

    pub groq_api_key: Option<String>,
    pub groq_model: Option<String>,
    pub groq_base_url: Option<String>,
}

fn fill(slot: &mut Option<String>, var: &str) {
    if slot.as_deref().map_or(true, str::is_empty) {
        *slot = std::env::var(var).ok().filter(|v| !v.trim().is_empty());
    }
}

impl LLMConfig {
    /// Load config from file, falling back to env vars and defaults.
    pub fn load(config_path: &Path) -> Self {
        let mut config: LLMConfig = match std::fs::read_to_string(config_path) {
            Ok(s) => match serde_json::from_str(&s) {
                Ok(c) => {
                    info!("Loaded LLM config from {}", config_path.display());
                    c
                }
                Err(e) => {
                    warn!("Ignoring malformed {}: {}", config_path.display(), e);
                    LLMConfig::default()
                }
            },
            Err(_) => LLMConfig::default(),
        };
        config.apply_env();
        config
    }

    /// Fill every unset field from its environment variable.
    pub fn apply_env(&mut self) {
        fill(&mut self.provider, "LLM_PROVIDER");
        fill(&mut self.openai_api_key, "OPENAI_API_KEY");
        fill(&mut self.openai_model, "OPENAI_MODEL");
        fill(&mut self.openai_base_url, "OPENAI_BASE_URL");
        fill(&mut self.azure_endpoint, "AZURE_OPENAI_ENDPOINT");
        fill(&mut self.azure_api_key, "AZURE_OPENAI_API_KEY");
        fill(&mut self.azure_deployment, "AZURE_OPENAI_DEPLOYMENT_NAME");
        fill(&mut self.azure_api_version, "AZURE_OPENAI_API_VERSION");
        fill(&mut self.gemini_api_key, "GEMINI_API_KEY");
        fill(&mut self.gemini_model, "GEMINI_MODEL");
        fill(&mut self.gemini_base_url, "GEMINI_BASE_URL");
        fill(&mut self.claude_api_key, "ANTHROPIC_API_KEY");
        fill(&mut self.claude_model, "CLAUDE_MODEL");
        fill(&mut self.claude_base_url, "ANTHROPIC_BASE_URL");
        fill(&mut self.deepseek_api_key, "DEEPSEEK_API_KEY");
        fill(&mut self.deepseek_model, "DEEPSEEK_MODEL");
        fill(&mut self.deepseek_base_url, "DEEPSEEK_BASE_URL");
        fill(&mut self.groq_api_key, "GROQ_API_KEY");
        fill(&mut self.groq_model, "GROQ_MODEL");
        fill(&mut self.groq_base_url, "GROQ_BASE_URL");
    }

    /// Configured provider name, as written (not yet validated).
    pub fn provider_name(&self) -> &str {
        self.provider.as_deref().unwrap_or(DEFAULT_PROVIDER)
    }

    /// API key for a provider, if set.
    pub fn api_key(&self, kind: ProviderKind) -> Option<&str> {
        let key = match kind {
            ProviderKind::OpenAi => &self.openai_api_key,
            ProviderKind::Azure => &self.azure_api_key,
            ProviderKind::Gemini => &self.gemini_api_key,
            ProviderKind::Claude => &self.claude_api_key,
            ProviderKind::DeepSeek => &self.deepseek_api_key,
            ProviderKind::Groq => &self.groq_api_key,
        };
        key.as_deref().filter(|k| !k.is_empty())
    }

    /// Model name (for Azure, the deployment name).
    pub fn model(&self, kind: ProviderKind) -> &str {
        match kind {
            ProviderKind::OpenAi => self.openai_model.as_deref().unwrap_or(DEFAULT_OPENAI_MODEL),
            ProviderKind::Azure => self.azure_deployment.as_deref().unwrap_or(DEFAULT_AZURE_DEPLOYMENT),
            ProviderKind::Gemini => self.gemini_model.as_deref().unwrap_or(DEFAULT_GEMINI_MODEL),
            ProviderKind::Claude => self.claude_model.as_deref().unwrap_or(DEFAULT_CLAUDE_MODEL),
            ProviderKind::DeepSeek => self.deepseek_model.as_deref().unwrap_or(DEFAULT_DEEPSEEK_MODEL),
            ProviderKind::Groq => self.groq_model.as_deref().unwrap_or(DEFAULT_GROQ_MODEL),
        }
    }

    /// Base URL without a trailing slash. For Azure this is the resource
    /// endpoint, which has no default.
    pub fn base_url(&self, kind: ProviderKind) -> Option<&str> {
        let url = match kind {
            ProviderKind::OpenAi => Some(self.openai_base_url.as_deref().unwrap_or(OPENAI_BASE_URL)),
            ProviderKind::Azure => self.azure_endpoint.as_deref().filter(|e| !e.is_empty()),
            ProviderKind::Gemini => Some(self.gemini_base_url.as_deref().unwrap_or(GEMINI_BASE_URL)),
            ProviderKind::Claude => Some(self.claude_base_url.as_deref().unwrap_or(CLAUDE_BASE_URL)),
            ProviderKind::DeepSeek => {
                Some(self.deepseek_base_url.as_deref().unwrap_or(DEEPSEEK_BASE_URL))
            }
            ProviderKind::Groq => Some(self.groq_base_url.as_deref().unwrap_or(GROQ_BASE_URL)),
        };
        url.map(|u| u.trim_end_matches('/'))
    }

    pub fn azure_api_version(&self) -> &str {
        self.azure_api_version
            .as_deref()
            .unwrap_or(DEFAULT_AZURE_API_VERSION)
    }

    /// Whether a client for `kind` can be built from this config.
    pub fn is_configured(&self, kind: ProviderKind) -> bool {
        self.api_key(kind).is_some()
            && (kind != ProviderKind::Azure || self.base_url(kind).is_some())
    }
}

/// Message reported when the active provider cannot be built.
pub fn missing_credential_message(kind: ProviderKind) -> &'static str {
    match kind {
        ProviderKind::OpenAi => "OpenAI API key not configured",
        ProviderKind::Azure => "Azure OpenAI credentials not configured",
        ProviderKind::Gemini => "Gemini API key not configured",
        ProviderKind::Claude => "Anthropic API key not configured",
        ProviderKind::DeepSeek => "DeepSeek API key not configured",
        ProviderKind::Groq => "Groq API key not configured",
    }
}
