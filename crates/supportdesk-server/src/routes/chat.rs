//! Chat routes: answer a message (JSON or SSE) and list history.

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::{Stream, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, error, info};

use crate::auth::{AuthUser, OptionalUser};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use supportdesk_chat::{normalize, Completion, CompletionRequest, MediaKind, MediaRef, StreamEvent};
use supportdesk_resolve::{build_prompt, ContextRetriever};
use supportdesk_store::{now_millis, ChatSession, ChatTurn, User};

type SseStream = Pin<Box<dyn Stream<Item = Result<Event, Infallible>> + Send>>;

/// Sessions returned by the history endpoint.
const HISTORY_LIMIT: usize = 10;

/// In-band error sent when a stream fails after the response started.
const STREAM_FAILED: &str = "Failed to generate response";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/chat/message", post(send_message))
        .route("/chat/history", get(get_history))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendMessageRequest {
    message: Option<String>,
    session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HistoryQuery {
    session_id: Option<String>,
}

/// POST /api/chat/message
///
/// Providers that stream answer with SSE `data:` frames; the rest with
/// `{"message": ...}`. The turn pair is stored only for signed-in users.
async fn send_message(
    State(state): State<Arc<AppState>>,
    OptionalUser(user): OptionalUser,
    Json(req): Json<SendMessageRequest>,
) -> ApiResult<Response> {
    let message = req
        .message
        .filter(|m| !m.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Message is required"))?;
    let session_id = req
        .session_id
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| format!("guest-{}", now_millis()));

    let media: Vec<MediaRef> = state
        .store
        .list_documents()?
        .iter()
        .map(|doc| MediaRef {
            url: state.config.upload_url(&doc.filename),
            kind: MediaKind::from_file_type(&doc.file_type),
        })
        .collect();

    let context = ContextRetriever::new(&state.store).retrieve(&message);
    debug!(
        "Retrieved {} FAQs, {} chunks for message",
        context.faqs.len(),
        context.chunks.len()
    );

    let history = match &user {
        Some(user) => state
            .store
            .get_chat_session(user.id, &session_id)?
            .map(|s| s.messages)
            .unwrap_or_default(),
        None => Vec::new(),
    };

    let prompt = build_prompt(&message, &context, &history);
    let request = CompletionRequest::new(prompt)
        .streaming(true)
        .with_media(media);

    match state.generator.generate(request).await? {
        Completion::Text(answer) => {
            if let Some(user) = &user {
                persist_turns(&state, user, &session_id, &message, &answer);
            }
            Ok(Json(serde_json::json!({ "message": answer })).into_response())
        }
        Completion::Stream(source) => {
            info!("Streaming answer for session {}", session_id);
            let stream = normalize(source);
            let transcript = stream.transcript();
            let (tx, rx) = mpsc::unbounded_channel::<StreamEvent>();

            tokio::spawn(async move {
                let mut stream = stream;
                while let Some(event) = stream.next().await {
                    let event = match event {
                        StreamEvent::Error(msg) => {
                            error!("Streaming error in session {}: {}", session_id, msg);
                            StreamEvent::Error(STREAM_FAILED.to_string())
                        }
                        other => other,
                    };
                    // The client may have gone away; keep draining the provider
                    let _ = tx.send(event);
                }

                if let Some(user) = &user {
                    persist_turns(&state, user, &session_id, &message, &transcript.text());
                }
                drop(tx);
            });

            let sse_stream: SseStream = Box::pin(UnboundedReceiverStream::new(rx).map(|event| {
                Ok::<_, Infallible>(Event::default().data(event.to_json().to_string()))
            }));
            Ok(Sse::new(sse_stream).into_response())
        }
    }
}

/// Store the user's message and the answer. Failures are logged and dropped.
fn persist_turns(state: &AppState, user: &User, session_id: &str, message: &str, answer: &str) {
    let turns = [ChatTurn::user(message), ChatTurn::assistant(answer)];
    if let Err(e) = state.store.append_turns(user.id, session_id, &turns) {
        error!(
            "Failed to save chat history for user {} session {}: {}",
            user.id, session_id, e
        );
    }
}

/// GET /api/chat/history: latest sessions of the caller.
async fn get_history(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<Vec<ChatSession>>> {
    let session_id = query.session_id.as_deref().filter(|s| !s.is_empty());
    let sessions = state
        .store
        .list_chat_sessions(user.id, session_id, HISTORY_LIMIT)?;
    Ok(Json(sessions))
}
