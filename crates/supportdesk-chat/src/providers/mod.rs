//! HTTP clients for the supported LLM vendors.
//!
//! OpenAI, Azure, DeepSeek and Groq share the chat-completions wire format.
//! Gemini and Claude each have their own.

pub mod claude;
pub mod gemini;
pub mod openai_compat;

use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::{RequestBuilder, Response};
use serde_json::Value;
use tracing::error;

use crate::error::LlmError;
use crate::sse::{SseLine, SseLineBuffer};

pub use claude::ClaudeClient;
pub use gemini::GeminiClient;
pub use openai_compat::OpenAiCompatClient;

/// Send a request; non-2xx responses become `Generation` errors with the
/// vendor's message.
pub(crate) async fn send_checked(request: RequestBuilder) -> Result<Response, LlmError> {
    let response = request
        .send()
        .await
        .map_err(|e| LlmError::generation(format!("Request failed: {}", e)))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let msg = vendor_error_message(status.as_u16(), &body);
        error!("LLM API error {}: {}", status, msg);
        return Err(LlmError::Generation(msg));
    }
    Ok(response)
}

/// Parse a JSON response body.
pub(crate) async fn json_body(response: Response) -> Result<Value, LlmError> {
    response
        .json::<Value>()
        .await
        .map_err(|e| LlmError::generation(format!("Invalid response body: {}", e)))
}

/// The vendor's own message (`error.message`), else the status and raw body.
pub fn vendor_error_message(status: u16, body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let message = parsed.as_ref().and_then(|v| {
        v["error"]["message"]
            .as_str()
            .or_else(|| v["error"].as_str())
            .or_else(|| v["message"].as_str())
            .map(str::to_string)
    });
    match message {
        Some(m) => m,
        None if body.trim().is_empty() => format!("API error {}", status),
        None => format!("API error {}: {}", status, body.trim()),
    }
}

/// Decode an SSE response body into one JSON value per `data:` line.
///
/// Ends at `[DONE]` or end of body. `stop` marks a value that terminates
/// the stream; `fail` maps an in-band error event to its message.
pub(crate) fn sse_values(
    response: Response,
    stop: fn(&Value) -> bool,
    fail: fn(&Value) -> Option<String>,
) -> BoxStream<'static, Result<Value, LlmError>> {
    let mut body = response.bytes_stream();
    async_stream::stream! {
        let mut buffer = SseLineBuffer::new();
        loop {
            let (lines, eof) = match body.next().await {
                Some(Ok(frame)) => (buffer.push(&frame), false),
                Some(Err(e)) => {
                    yield Err(LlmError::generation(format!("Stream read error: {}", e)));
                    return;
                }
                None => (buffer.finish(), true),
            };
            for line in lines {
                let data = match line {
                    SseLine::Done => return,
                    SseLine::Data(data) => data,
                };
                let Ok(value) = serde_json::from_str::<Value>(&data) else {
                    continue;
                };
                if let Some(msg) = fail(&value) {
                    yield Err(LlmError::Generation(msg));
                    return;
                }
                let last = stop(&value);
                yield Ok(value);
                if last {
                    return;
                }
            }
            if eof {
                return;
            }
        }
    }
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vendor_error_message() {
        assert_eq!(
            vendor_error_message(401, r#"{"error":{"message":"Invalid API key","type":"auth"}}"#),
            "Invalid API key"
        );
        assert_eq!(vendor_error_message(502, ""), "API error 502");
        assert_eq!(vendor_error_message(500, "upstream down"), "API error 500: upstream down");
    }
}
