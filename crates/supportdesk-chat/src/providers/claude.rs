//! Anthropic Messages API client.

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

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone)]
pub struct ClaudeClient {
    http: Client,
    url: String,
    model: String,
    api_key: String,
}

impl ClaudeClient {
    pub fn from_config(http: Client, config: &LLMConfig) -> Option<Self> {
        Some(Self {
            http,
            api_key: config.api_key(ProviderKind::Claude)?.to_string(),
            url: format!("{}/v1/messages", config.base_url(ProviderKind::Claude)?),
            model: config.model(ProviderKind::Claude).to_string(),
        })
    }

    fn request(&self, prompt: &str, stream: bool) -> RequestBuilder {
        let body = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": TEMPERATURE,
            "max_tokens": MAX_TOKENS,
            "stream": stream,
        });
        self.http
            .post(&self.url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
    }
}

fn is_message_stop(value: &Value) -> bool {
    value["type"] == "message_stop"
}

fn stream_error(value: &Value) -> Option<String> {
    if value["type"] != "error" {
        return None;
    }
    Some(
        value["error"]["message"]
            .as_str()
            .unwrap_or("Unknown error")
            .to_string(),
    )
}

#[async_trait]
impl ProviderClient for ClaudeClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Claude
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        debug!("Claude completion with model {}", self.model);
        let response = send_checked(self.request(&request.prompt, false)).await?;
        let value = json_body(response).await?;
        value["content"][0]["text"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| LlmError::generation("Response contained no text content"))
    }

    async fn stream(&self, request: &CompletionRequest) -> Result<IncrementalTextSource, LlmError> {
        debug!("Claude streaming with model {}", self.model);
        let response = send_checked(self.request(&request.prompt, true)).await?;
        Ok(IncrementalTextSource::Pull(sse_values(
            response,
            is_message_stop,
            stream_error,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_events() {
        assert!(is_message_stop(&json!({"type": "message_stop"})));
        assert!(!is_message_stop(&json!({"type": "content_block_delta"})));
        assert_eq!(
            stream_error(&json!({"type": "error", "error": {"type": "overloaded_error", "message": "Overloaded"}})).as_deref(),
            Some("Overloaded")
        );
        assert_eq!(stream_error(&json!({"type": "ping"})), None);
    }

    #[test]
    fn test_messages_url() {
        let config = LLMConfig {
            claude_api_key: Some("sk-ant".into()),
            ..Default::default()
        };
        let client = ClaudeClient::from_config(Client::new(), &config).unwrap();
        assert_eq!(client.url, "https://api.anthropic.com/v1/messages");
    }
}
