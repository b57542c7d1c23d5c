//! Chat-completions clients: OpenAI, Azure OpenAI, DeepSeek, Groq.

use async_trait::async_trait;
use futures::StreamExt;
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
enum Auth {
    Bearer(String),
    /// Azure's `api-key` header.
    ApiKey(String),
}

/// Client for any vendor speaking the OpenAI chat-completions format.
#[derive(Debug, Clone)]
pub struct OpenAiCompatClient {
    http: Client,
    kind: ProviderKind,
    url: String,
    auth: Auth,
    /// Omitted for Azure, where the deployment in the URL selects the model.
    model: Option<String>,
}

impl OpenAiCompatClient {
    /// Build a client for `kind` from config. `None` when the credential
    /// (or Azure endpoint) is missing, or `kind` uses another wire format.
    pub fn from_config(http: Client, config: &LLMConfig, kind: ProviderKind) -> Option<Self> {
        let key = config.api_key(kind)?.to_string();
        let base = config.base_url(kind)?;
        let model = config.model(kind).to_string();

        let (url, auth, model) = match kind {
            ProviderKind::OpenAi | ProviderKind::Groq => {
                (format!("{}/chat/completions", base), Auth::Bearer(key), Some(model))
            }
            ProviderKind::DeepSeek => {
                (format!("{}/v1/chat/completions", base), Auth::Bearer(key), Some(model))
            }
            ProviderKind::Azure => (
                format!(
                    "{}/openai/deployments/{}/chat/completions?api-version={}",
                    base,
                    model,
                    config.azure_api_version()
                ),
                Auth::ApiKey(key),
                None,
            ),
            ProviderKind::Gemini | ProviderKind::Claude => return None,
        };

        Some(Self {
            http,
            kind,
            url,
            auth,
            model,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn request(&self, prompt: &str, stream: bool) -> RequestBuilder {
        let mut body = json!({
            "messages": [{"role": "user", "content": prompt}],
            "stream": stream,
            "temperature": TEMPERATURE,
            "max_tokens": MAX_TOKENS,
        });
        if let Some(model) = &self.model {
            body["model"] = json!(model);
        }

        let builder = self.http.post(&self.url).json(&body);
        match &self.auth {
            Auth::Bearer(key) => builder.bearer_auth(key),
            Auth::ApiKey(key) => builder.header("api-key", key),
        }
    }
}

#[async_trait]
impl ProviderClient for OpenAiCompatClient {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        debug!("{} completion via {}", self.kind, self.url);
        let response = send_checked(self.request(&request.prompt, false)).await?;
        let value = json_body(response).await?;
        value["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| LlmError::generation("Response contained no message content"))
    }

    async fn stream(&self, request: &CompletionRequest) -> Result<IncrementalTextSource, LlmError> {
        if !self.supports_streaming() {
            return Err(LlmError::generation(format!(
                "{} does not support streaming",
                self.kind
            )));
        }

        debug!("{} streaming via {}", self.kind, self.url);
        let response = send_checked(self.request(&request.prompt, true)).await?;

        match self.kind {
            // Azure and DeepSeek bodies are handed over as raw frames
            ProviderKind::Azure | ProviderKind::DeepSeek => Ok(IncrementalTextSource::Push(
                response
                    .bytes_stream()
                    .map(|frame| frame.map_err(|e| LlmError::generation(format!("Stream read error: {}", e))))
                    .boxed(),
            )),
            _ => Ok(IncrementalTextSource::Pull(sse_values(
                response,
                |_| false,
                stream_error,
            ))),
        }
    }
}

fn stream_error(value: &Value) -> Option<String> {
    value["error"]["message"].as_str().map(str::to_string)
}
