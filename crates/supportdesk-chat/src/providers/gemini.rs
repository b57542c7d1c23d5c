//! Google Gemini `generateContent` client.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};
use tracing::debug;

use super::{json_body, send_checked, sse_values};
use crate::config::{LLMConfig, MAX_TOKENS, TEMPERATURE};
use crate::error::LlmError;
use crate::normalizer::IncrementalTextSource;
use crate::registry::ProviderClient;
use crate::types::{CompletionRequest, ProviderKind};

#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: Client,
    api_base: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    pub fn from_config(http: Client, config: &LLMConfig) -> Option<Self> {
        Some(Self {
            http,
            api_key: config.api_key(ProviderKind::Gemini)?.to_string(),
            api_base: config.base_url(ProviderKind::Gemini)?.to_string(),
            model: config.model(ProviderKind::Gemini).to_string(),
        })
    }

    fn request(&self, method: &str, prompt: &str) -> RequestBuilder {
        let url = format!("{}/v1beta/models/{}:{}", self.api_base, self.model, method);
        let body = json!({
            "contents": [{"role": "user", "parts": [{"text": prompt}]}],
            "generationConfig": {
                "temperature": TEMPERATURE,
                "maxOutputTokens": MAX_TOKENS,
            },
        });
        self.http
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
    }
}

/// Concatenated text parts of the first candidate.
fn candidate_text(value: &Value) -> Option<String> {
    let parts = value["candidates"][0]["content"]["parts"].as_array()?;
    Some(parts.iter().filter_map(|p| p["text"].as_str()).collect())
}

fn stream_error(value: &Value) -> Option<String> {
    value["error"]["message"].as_str().map(str::to_string)
}

#[async_trait]
impl ProviderClient for GeminiClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        debug!("Gemini completion with model {}", self.model);
        let response = send_checked(self.request("generateContent", &request.prompt)).await?;
        let value = json_body(response).await?;
        candidate_text(&value)
            .ok_or_else(|| LlmError::generation("Gemini API error: response contained no candidates"))
    }

    async fn stream(&self, request: &CompletionRequest) -> Result<IncrementalTextSource, LlmError> {
        debug!("Gemini streaming with model {}", self.model);
        let response =
            send_checked(self.request("streamGenerateContent?alt=sse", &request.prompt)).await?;
        Ok(IncrementalTextSource::Pull(sse_values(response, |_| false, stream_error)))
    }
}
