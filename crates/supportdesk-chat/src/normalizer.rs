//! Normalization of streamed provider payloads into one event shape.
//!
//! Two delivery models converge here:
//! - pull: the client already yields one JSON value per provider event
//! - push: raw byte frames of an SSE body, parsed line by line
//!
//! Either way every non-empty delta becomes one `Content` event, and the
//! stream ends with exactly one `Done` (or one `Error`).

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::LlmError;
use crate::sse::{SseLine, SseLineBuffer};

/// Raw incremental output of a streaming provider.
pub enum IncrementalTextSource {
    /// Discrete provider events, already decoded.
    Pull(BoxStream<'static, Result<Value, LlmError>>),
    /// Raw SSE body frames.
    Push(BoxStream<'static, Result<Bytes, LlmError>>),
}

impl IncrementalTextSource {
    pub fn from_values(values: Vec<Value>) -> Self {
        Self::Pull(futures::stream::iter(values.into_iter().map(Ok)).boxed())
    }

    pub fn from_frames(frames: Vec<Bytes>) -> Self {
        Self::Push(futures::stream::iter(frames.into_iter().map(Ok)).boxed())
    }
}

impl std::fmt::Debug for IncrementalTextSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pull(_) => f.write_str("IncrementalTextSource::Pull"),
            Self::Push(_) => f.write_str("IncrementalTextSource::Push"),
        }
    }
}

/// Canonical stream event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Content(String),
    Done,
    Error(String),
}

impl StreamEvent {
    /// Wire payload: `{content, done}` for content and completion.
    /// Errors carry their message under `error`.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Content(text) => json!({ "content": text, "done": false }),
            Self::Done => json!({ "content": "", "done": true }),
            Self::Error(msg) => json!({ "error": msg }),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Content(_))
    }
}

/// Accumulated text of every delta a stream emitted.
#[derive(Debug, Clone, Default)]
pub struct Transcript(Arc<Mutex<String>>);

impl Transcript {
    fn push(&self, delta: &str) {
        self.0.lock().push_str(delta);
    }

    pub fn text(&self) -> String {
        self.0.lock().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.0.lock().is_empty()
    }
}

/// Stream of canonical events, with a handle on the accumulated transcript.
pub struct NormalizedStream {
    inner: BoxStream<'static, StreamEvent>,
    transcript: Transcript,
}

impl NormalizedStream {
    pub fn transcript(&self) -> Transcript {
        self.transcript.clone()
    }
}

impl Stream for NormalizedStream {
    type Item = StreamEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

/// Normalize a provider source into canonical events.
pub fn normalize(source: IncrementalTextSource) -> NormalizedStream {
    let transcript = Transcript::default();
    let inner = match source {
        IncrementalTextSource::Pull(items) => normalize_items(items, transcript.clone()).boxed(),
        IncrementalTextSource::Push(frames) => normalize_frames(frames, transcript.clone()).boxed(),
    };
    NormalizedStream { inner, transcript }
}

fn normalize_items(
    mut items: BoxStream<'static, Result<Value, LlmError>>,
    transcript: Transcript,
) -> impl Stream<Item = StreamEvent> + Send + 'static {
    async_stream::stream! {
        while let Some(item) = items.next().await {
            match item {
                Ok(value) => {
                    if let Some(delta) = extract_delta(&value) {
                        transcript.push(&delta);
                        yield StreamEvent::Content(delta);
                    }
                }
                Err(e) => {
                    warn!("Provider stream failed: {}", e);
                    yield StreamEvent::Error(e.to_string());
                    return;
                }
            }
        }
        yield StreamEvent::Done;
    }
}

fn normalize_frames(
    mut frames: BoxStream<'static, Result<Bytes, LlmError>>,
    transcript: Transcript,
) -> impl Stream<Item = StreamEvent> + Send + 'static {
    async_stream::stream! {
        let mut buffer = SseLineBuffer::new();
        loop {
            let (lines, eof) = match frames.next().await {
                Some(Ok(frame)) => (buffer.push(&frame), false),
                Some(Err(e)) => {
                    warn!("Provider stream failed: {}", e);
                    yield StreamEvent::Error(e.to_string());
                    return;
                }
                None => (buffer.finish(), true),
            };

            for line in lines {
                match line {
                    SseLine::Done => {
                        yield StreamEvent::Done;
                        return;
                    }
                    SseLine::Data(data) => {
                        let value = match serde_json::from_str::<Value>(&data) {
                            Ok(value) => value,
                            Err(e) => {
                                debug!("Skipping non-JSON data line: {}", e);
                                continue;
                            }
                        };
                        if let Some(message) = value["error"]["message"].as_str() {
                            warn!("Provider reported stream error: {}", message);
                            yield StreamEvent::Error(LlmError::generation(message).to_string());
                            return;
                        }
                        if let Some(delta) = extract_delta(&value) {
                            transcript.push(&delta);
                            yield StreamEvent::Content(delta);
                        }
                    }
                }
            }

            if eof {
                break;
            }
        }
        yield StreamEvent::Done;
    }
}

/// Text delta of one provider event, first matching shape wins:
/// `choices[0].delta.content` (OpenAI family), then
/// `candidates[0].content.parts[*].text` (Gemini), then `delta.text` (Claude).
pub fn extract_delta(value: &Value) -> Option<String> {
    if let Some(content) = value["choices"][0]["delta"]["content"].as_str() {
        if !content.is_empty() {
            return Some(content.to_string());
        }
    }

    if let Some(parts) = value["candidates"][0]["content"]["parts"].as_array() {
        let text: String = parts.iter().filter_map(|p| p["text"].as_str()).collect();
        if !text.is_empty() {
            return Some(text);
        }
    }

    value["delta"]["text"]
        .as_str()
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn collect(source: IncrementalTextSource) -> (Vec<StreamEvent>, String) {
        let stream = normalize(source);
        let transcript = stream.transcript();
        let events: Vec<StreamEvent> = stream.collect().await;
        (events, transcript.text())
    }

    #[tokio::test]
    async fn test_push_sse_with_done_sentinel() {
        let source = IncrementalTextSource::from_frames(vec![
            Bytes::from_static(b"data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n\n"),
            Bytes::from_static(b"data: [DONE]\n\n"),
        ]);
        let (events, text) = collect(source).await;
        assert_eq!(events, vec![StreamEvent::Content("Hi".into()), StreamEvent::Done]);
        assert_eq!(events[0].to_json(), json!({"content": "Hi", "done": false}));
        assert_eq!(events[1].to_json(), json!({"content": "", "done": true}));
        assert_eq!(text, "Hi");
    }

    #[tokio::test]
    async fn test_push_frames_split_mid_line() {
        let source = IncrementalTextSource::from_frames(vec![
            Bytes::from_static(b"data: {\"choices\":[{\"delta\":{\"cont"),
            Bytes::from_static(b"ent\":\"Hel\"}}]}\n\ndata: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}"),
            Bytes::from_static(b"\n\ndata: [DO"),
            Bytes::from_static(b"NE]\n\n"),
        ]);
        let (events, text) = collect(source).await;
        assert_eq!(
            events,
            vec![
                StreamEvent::Content("Hel".into()),
                StreamEvent::Content("lo".into()),
                StreamEvent::Done
            ]
        );
        assert_eq!(text, "Hello");
    }

    #[tokio::test]
    async fn test_push_trailing_line_flushed_without_sentinel() {
        let source = IncrementalTextSource::from_frames(vec![Bytes::from_static(
            b"data: {\"choices\":[{\"delta\":{\"content\":\"tail\"}}]}",
        )]);
        let (events, _) = collect(source).await;
        assert_eq!(events, vec![StreamEvent::Content("tail".into()), StreamEvent::Done]);
    }

    #[tokio::test]
    async fn test_pull_shapes_and_empty_deltas() {
        let source = IncrementalTextSource::from_values(vec![
            json!({"choices": [{"delta": {"role": "assistant"}}]}),
            json!({"choices": [{"delta": {"content": "A"}}]}),
            json!({"candidates": [{"content": {"parts": [{"text": "B"}, {"text": "C"}]}}]}),
            json!({"type": "content_block_delta", "delta": {"type": "text_delta", "text": "D"}}),
            json!({"type": "message_stop"}),
            json!({"choices": [{"delta": {"content": ""}}]}),
        ]);
        let (events, text) = collect(source).await;
        assert_eq!(
            events,
            vec![
                StreamEvent::Content("A".into()),
                StreamEvent::Content("BC".into()),
                StreamEvent::Content("D".into()),
                StreamEvent::Done
            ]
        );
        assert_eq!(text, "ABCD");
    }

    #[tokio::test]
    async fn test_empty_source_still_done() {
        let (events, text) = collect(IncrementalTextSource::from_values(vec![])).await;
        assert_eq!(events, vec![StreamEvent::Done]);
        assert!(text.is_empty());
    }

    #[tokio::test]
    async fn test_error_ends_stream_and_keeps_partial_transcript() {
        let items = futures::stream::iter(vec![
            Ok(json!({"choices": [{"delta": {"content": "partial"}}]})),
            Err(LlmError::generation("connection reset")),
            Ok(json!({"choices": [{"delta": {"content": "never"}}]})),
        ])
        .boxed();
        let (events, text) = collect(IncrementalTextSource::Pull(items)).await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], StreamEvent::Content("partial".into()));
        assert!(matches!(&events[1], StreamEvent::Error(msg) if msg.contains("connection reset")));
        assert_eq!(text, "partial");
    }

    #[tokio::test]
    async fn test_push_in_band_error_frame() {
        let source = IncrementalTextSource::from_frames(vec![
            Bytes::from_static(b"data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n\n"),
            Bytes::from_static(b"data: {\"error\":{\"message\":\"Rate limit reached\"}}\n\n"),
            Bytes::from_static(b"data: {\"choices\":[{\"delta\":{\"content\":\"never\"}}]}\n\n"),
        ]);
        let (events, text) = collect(source).await;
        assert_eq!(
            events,
            vec![
                StreamEvent::Content("Hi".into()),
                StreamEvent::Error("Failed to generate response: Rate limit reached".into())
            ]
        );
        assert_eq!(text, "Hi");
    }

    #[tokio::test]
    async fn test_push_transport_error_ends_stream() {
        let frames = futures::stream::iter(vec![
            Ok(Bytes::from_static(b"data: {\"choices\":[{\"delta\":{\"content\":\"part\"}}]}\n\n")),
            Err(LlmError::generation("Stream read error: connection reset")),
            Ok(Bytes::from_static(b"data: [DONE]\n\n")),
        ])
        .boxed();
        let (events, text) = collect(IncrementalTextSource::Push(frames)).await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], StreamEvent::Content("part".into()));
        assert!(matches!(&events[1], StreamEvent::Error(msg) if msg.contains("connection reset")));
        assert_eq!(text, "part");
    }

    #[test]
    fn test_extract_delta_precedence() {
        let both = json!({
            "choices": [{"delta": {"content": "openai"}}],
            "delta": {"text": "claude"}
        });
        assert_eq!(extract_delta(&both).as_deref(), Some("openai"));
        assert_eq!(extract_delta(&json!({"usage": {}})), None);
    }
}
