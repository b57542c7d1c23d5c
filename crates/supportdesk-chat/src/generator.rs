//! Response generation against the single active provider.

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::config::missing_credential_message;
use crate::error::LlmError;
use crate::registry::ProviderRegistry;
use crate::types::{Completion, CompletionRequest, ProviderKind};

/// Dispatches completions to the provider chosen at construction.
#[derive(Clone)]
pub struct ResponseGenerator {
    registry: Arc<ProviderRegistry>,
    provider: ProviderKind,
}

impl ResponseGenerator {
    pub fn new(registry: Arc<ProviderRegistry>, provider: ProviderKind) -> Self {
        Self { registry, provider }
    }

    /// Use the provider named in the registry's config.
    pub fn from_config(registry: Arc<ProviderRegistry>) -> Result<Self, LlmError> {
        let provider: ProviderKind = registry.config().provider_name().parse()?;
        info!("LLM provider: {}", provider);
        Ok(Self::new(registry, provider))
    }

    pub fn provider(&self) -> ProviderKind {
        self.provider
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    /// Whether a streaming request can produce incremental output.
    pub fn streams_natively(&self) -> bool {
        self.provider.streams_natively()
    }

    /// Run one completion.
    ///
    /// Streaming requests to a provider without incremental delivery are
    /// answered with `Completion::Text`. A missing credential fails before
    /// any network call.
    pub async fn generate(&self, request: CompletionRequest) -> Result<Completion, LlmError> {
        let client = self.registry.get_client(self.provider).ok_or_else(|| {
            LlmError::Configuration(missing_credential_message(self.provider).to_string())
        })?;

        if !request.media.is_empty() {
            debug!("{} media references attached to request", request.media.len());
        }

        let result = if request.stream && client.supports_streaming() {
            client.stream(&request).await.map(Completion::Stream)
        } else {
            client.complete(&request).await.map(Completion::Text)
        };

        if let Err(e) = &result {
            error!("LLM error ({}): {}", self.provider, e);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LLMConfig;
    use crate::normalizer::{normalize, IncrementalTextSource, StreamEvent};
    use crate::registry::ProviderClient;
    use async_trait::async_trait;
    use futures::StreamExt;
    use parking_lot::Mutex;
    use serde_json::json;

    /// Records which entry point was called.
    struct FakeClient {
        kind: ProviderKind,
        calls: Mutex<Vec<&'static str>>,
    }

    impl FakeClient {
        fn new(kind: ProviderKind) -> Arc<Self> {
            Arc::new(Self {
                kind,
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ProviderClient for FakeClient {
        fn kind(&self) -> ProviderKind {
            self.kind
        }

        async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
            self.calls.lock().push("complete");
            Ok(format!("answer to: {}", request.prompt))
        }

        async fn stream(&self, _request: &CompletionRequest) -> Result<IncrementalTextSource, LlmError> {
            self.calls.lock().push("stream");
            Ok(IncrementalTextSource::from_values(vec![
                json!({"choices": [{"delta": {"content": "str"}}]}),
                json!({"choices": [{"delta": {"content": "eamed"}}]}),
            ]))
        }
    }

    fn generator_with(kind: ProviderKind) -> (ResponseGenerator, Arc<FakeClient>) {
        let registry = Arc::new(ProviderRegistry::new(LLMConfig::default(), reqwest::Client::new()));
        let fake = FakeClient::new(kind);
        registry.register(fake.clone());
        (ResponseGenerator::new(registry, kind), fake)
    }

    #[tokio::test]
    async fn test_groq_stream_downgraded_to_text() {
        let (generator, fake) = generator_with(ProviderKind::Groq);
        let result = generator
            .generate(CompletionRequest::new("hi").streaming(true))
            .await
            .unwrap();
        assert!(matches!(result, Completion::Text(ref t) if t == "answer to: hi"));
        assert_eq!(*fake.calls.lock(), vec!["complete"]);
        assert!(!generator.streams_natively());
    }

    #[tokio::test]
    async fn test_streaming_provider_returns_raw_source() {
        let (generator, fake) = generator_with(ProviderKind::OpenAi);
        let result = generator
            .generate(CompletionRequest::new("hi").streaming(true))
            .await
            .unwrap();
        let Completion::Stream(source) = result else {
            panic!("expected a stream");
        };
        let events: Vec<StreamEvent> = normalize(source).collect().await;
        assert_eq!(events.last(), Some(&StreamEvent::Done));
        assert_eq!(*fake.calls.lock(), vec!["stream"]);
    }

    #[tokio::test]
    async fn test_non_streaming_request() {
        let (generator, fake) = generator_with(ProviderKind::Claude);
        let result = generator.generate(CompletionRequest::new("q")).await.unwrap();
        assert!(matches!(result, Completion::Text(_)));
        assert_eq!(*fake.calls.lock(), vec!["complete"]);
    }

    #[tokio::test]
    async fn test_unconfigured_provider_is_configuration_error() {
        // Base URL points nowhere routable; the error must come first
        let config = LLMConfig {
            provider: Some("deepseek".into()),
            deepseek_base_url: Some("http://127.0.0.1:1".into()),
            ..Default::default()
        };
        let registry = Arc::new(ProviderRegistry::new(config, reqwest::Client::new()));
        let generator = ResponseGenerator::from_config(registry).unwrap();

        let err = generator
            .generate(CompletionRequest::new("hi").streaming(true))
            .await
            .unwrap_err();
        assert_eq!(err, LlmError::Configuration("DeepSeek API key not configured".into()));
    }

    #[test]
    fn test_unknown_provider_name() {
        let config = LLMConfig {
            provider: Some("mistral".into()),
            ..Default::default()
        };
        let registry = Arc::new(ProviderRegistry::new(config, reqwest::Client::new()));
        assert!(matches!(
            ResponseGenerator::from_config(registry),
            Err(LlmError::UnsupportedProvider(name)) if name == "mistral"
        ));
    }
}
