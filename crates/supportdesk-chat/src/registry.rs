//! Provider client trait and the process-wide client registry.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::config::LLMConfig;
use crate::error::LlmError;
use crate::normalizer::IncrementalTextSource;
use crate::providers::{ClaudeClient, GeminiClient, OpenAiCompatClient};
use crate::types::{CompletionRequest, ProviderKind};

/// One LLM vendor backend.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Whether `stream` yields incremental output.
    fn supports_streaming(&self) -> bool {
        self.kind().streams_natively()
    }

    /// One blocking request for the whole answer.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError>;

    /// Start a streaming request. The returned payloads are raw, untransformed.
    async fn stream(&self, request: &CompletionRequest) -> Result<IncrementalTextSource, LlmError>;
}

/// Lazily built, memoized provider clients.
///
/// A client is built at most once per kind. No expiry or credential refresh.
pub struct ProviderRegistry {
    config: LLMConfig,
    http: reqwest::Client,
    clients: Mutex<HashMap<ProviderKind, Arc<dyn ProviderClient>>>,
}

impl ProviderRegistry {
    pub fn new(config: LLMConfig, http: reqwest::Client) -> Self {
        Self {
            config,
            http,
            clients: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &LLMConfig {
        &self.config
    }

    /// Client for `kind`, or `None` when its credential is absent.
    pub fn get_client(&self, kind: ProviderKind) -> Option<Arc<dyn ProviderClient>> {
        let mut clients = self.clients.lock();
        if let Some(client) = clients.get(&kind) {
            return Some(Arc::clone(client));
        }

        let client = self.build_client(kind)?;
        info!("Initialized {} client", kind);
        clients.insert(kind, Arc::clone(&client));
        Some(client)
    }

    /// Install a prebuilt client, replacing any memoized one.
    pub fn register(&self, client: Arc<dyn ProviderClient>) {
        let kind = client.kind();
        debug!("Registered custom {} client", kind);
        self.clients.lock().insert(kind, client);
    }

    fn build_client(&self, kind: ProviderKind) -> Option<Arc<dyn ProviderClient>> {
        let http = self.http.clone();
        match kind {
            ProviderKind::OpenAi | ProviderKind::Azure | ProviderKind::DeepSeek | ProviderKind::Groq => {
                OpenAiCompatClient::from_config(http, &self.config, kind)
                    .map(|c| Arc::new(c) as Arc<dyn ProviderClient>)
            }
            ProviderKind::Gemini => GeminiClient::from_config(http, &self.config)
                .map(|c| Arc::new(c) as Arc<dyn ProviderClient>),
            ProviderKind::Claude => ClaudeClient::from_config(http, &self.config)
                .map(|c| Arc::new(c) as Arc<dyn ProviderClient>),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_credential_is_absent() {
        let registry = ProviderRegistry::new(LLMConfig::default(), reqwest::Client::new());
        for kind in ProviderKind::ALL {
            assert!(registry.get_client(kind).is_none());
        }
    }

    #[test]
    fn test_clients_are_memoized() {
        let config = LLMConfig {
            groq_api_key: Some("gsk".into()),
            ..Default::default()
        };
        let registry = ProviderRegistry::new(config, reqwest::Client::new());
        let a = registry.get_client(ProviderKind::Groq).unwrap();
        let b = registry.get_client(ProviderKind::Groq).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.kind(), ProviderKind::Groq);
    }
}
