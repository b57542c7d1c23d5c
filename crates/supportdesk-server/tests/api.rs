//! Router tests against a temporary store and a scripted LLM provider.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use futures::StreamExt;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use supportdesk_chat::{
    CompletionRequest, IncrementalTextSource, LLMConfig, LlmError, ProviderClient, ProviderKind,
    ProviderRegistry, ResponseGenerator,
};
use supportdesk_core::SupportDeskConfig;
use supportdesk_server::auth::hash_password;
use supportdesk_server::{build_router, ingestion, AppState};
use supportdesk_store::{SqliteStore, TurnRole, User, UserRole};

/// Provider that answers from a script and records every prompt.
struct ScriptedClient {
    kind: ProviderKind,
    deltas: Vec<&'static str>,
    fail_after_deltas: bool,
    prompts: Mutex<Vec<CompletionRequest>>,
}

#[async_trait]
impl ProviderClient for ScriptedClient {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        self.prompts.lock().push(request.clone());
        Ok(self.deltas.concat())
    }

    async fn stream(&self, request: &CompletionRequest) -> Result<IncrementalTextSource, LlmError> {
        self.prompts.lock().push(request.clone());
        let mut items: Vec<Result<Value, LlmError>> = self
            .deltas
            .iter()
            .map(|d| Ok(json!({"choices": [{"delta": {"content": d}}]})))
            .collect();
        if self.fail_after_deltas {
            items.push(Err(LlmError::generation("connection reset by vendor")));
        }
        Ok(IncrementalTextSource::Pull(futures::stream::iter(items).boxed()))
    }
}

struct TestApp {
    app: Router,
    state: Arc<AppState>,
    client: Arc<ScriptedClient>,
    _dir: TempDir,
}

impl TestApp {
    fn new(kind: ProviderKind, deltas: Vec<&'static str>, fail_after_deltas: bool) -> Self {
        let dir = TempDir::new().unwrap();
        let config = SupportDeskConfig::new(
            dir.path(),
            5000,
            "http://localhost:5000",
            b"test-secret".to_vec(),
            Duration::from_secs(3600),
        )
        .unwrap();
        let store = SqliteStore::open(&config.data_paths.db).unwrap();

        let client = Arc::new(ScriptedClient {
            kind,
            deltas,
            fail_after_deltas,
            prompts: Mutex::new(Vec::new()),
        });
        let registry = Arc::new(ProviderRegistry::new(LLMConfig::default(), reqwest::Client::new()));
        registry.register(client.clone());
        let generator = ResponseGenerator::new(registry, kind);

        let state = Arc::new(AppState::new(config, store, generator));
        Self {
            app: build_router(state.clone()),
            state,
            client,
            _dir: dir,
        }
    }

    fn streaming() -> Self {
        Self::new(ProviderKind::OpenAi, vec!["Refunds ", "take 5 days."], false)
    }

    fn create_user(&self, username: &str, password: &str, role: UserRole) -> User {
        let hash = hash_password(password).unwrap();
        let email = format!("{}@example.com", username);
        let id = self.state.store.create_user(username, &email, &hash, role).unwrap();
        self.state.store.get_user(id).unwrap().unwrap()
    }

    fn token_for(&self, username: &str, role: UserRole) -> String {
        let user = self.create_user(username, "password123", role);
        self.state.auth.issue_token(&user).unwrap()
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, String) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    async fn json(&self, request: Request<Body>) -> (StatusCode, Value) {
        let (status, body) = self.send(request).await;
        (status, serde_json::from_str(&body).unwrap())
    }
}

fn json_request(method: Method, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

fn sse_payloads(body: &str) -> Vec<Value> {
    body.lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|data| serde_json::from_str(data.trim()).unwrap())
        .collect()
}

#[tokio::test]
async fn login_issues_token_for_valid_credentials() {
    let t = TestApp::streaming();
    t.create_user("alice", "s3cret-pass", UserRole::User);

    let (status, body) = t
        .json(json_request(
            Method::POST,
            "/api/auth/login",
            None,
            json!({"email": "alice@example.com", "password": "s3cret-pass"}),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["username"], "alice");
    assert_eq!(body["user"]["role"], "user");
    let token = body["token"].as_str().unwrap();
    assert!(t.state.auth.validate_token(token).is_ok());

    let (status, body) = t
        .json(json_request(
            Method::POST,
            "/api/auth/login",
            None,
            json!({"email": "alice@example.com", "password": "wrong"}),
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid credentials");

    let (status, body) = t
        .json(json_request(Method::POST, "/api/auth/login", None, json!({"email": "alice@example.com"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Email and password are required");
}

#[tokio::test]
async fn register_is_admin_only_and_rejects_duplicates() {
    let t = TestApp::streaming();
    let admin = t.token_for("root", UserRole::Admin);
    let user = t.token_for("bob", UserRole::User);
    let payload = json!({"username": "carol", "email": "carol@example.com", "password": "pw"});

    let (status, _) = t
        .json(json_request(Method::POST, "/api/auth/register", Some(&user), payload.clone()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = t
        .json(json_request(Method::POST, "/api/auth/register", Some(&admin), payload.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["role"], "user");

    let (status, body) = t
        .json(json_request(Method::POST, "/api/auth/register", Some(&admin), payload))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "User already exists");
}

#[tokio::test]
async fn faq_changes_require_admin() {
    let t = TestApp::streaming();
    let user = t.token_for("bob", UserRole::User);
    let faq = json!({"question": "Q", "answer": "A"});

    let (status, body) = t.json(json_request(Method::POST, "/api/faqs", None, faq.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Authentication required");

    let (status, body) = t
        .json(json_request(Method::POST, "/api/faqs", Some("not-a-jwt"), faq.clone()))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid or expired token");

    let (status, body) = t.json(json_request(Method::POST, "/api/faqs", Some(&user), faq)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Admin access required");
}

#[tokio::test]
async fn faq_crud_round_trip() {
    let t = TestApp::streaming();
    let admin = t.token_for("root", UserRole::Admin);

    let (status, body) = t
        .json(json_request(
            Method::POST,
            "/api/faqs",
            Some(&admin),
            json!({"question": "How long do refunds take?", "answer": "Five business days."}),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "FAQ created successfully");
    assert_eq!(body["faq"]["category"], "general");
    assert_eq!(body["faq"]["createdByUsername"], "root");
    let id = body["faq"]["id"].as_i64().unwrap();

    let (status, body) = t
        .json(json_request(Method::POST, "/api/faqs", Some(&admin), json!({"question": "Q"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Question and answer are required");

    let (_, body) = t.json(get("/api/faqs?search=refunds", None)).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body) = t
        .json(json_request(
            Method::PUT,
            &format!("/api/faqs/{}", id),
            Some(&admin),
            json!({"answer": "Three business days.", "category": ""}),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["faq"]["answer"], "Three business days.");
    assert_eq!(body["faq"]["category"], "general");

    let delete = || {
        Request::builder()
            .method(Method::DELETE)
            .uri(format!("/api/faqs/{}", id))
            .header(header::AUTHORIZATION, format!("Bearer {}", admin))
            .body(Body::empty())
            .unwrap()
    };
    let (status, _) = t.json(delete()).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = t.json(delete()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "FAQ not found");

    let (status, _) = t
        .json(json_request(Method::PUT, "/api/faqs/999", Some(&admin), json!({"answer": "x"})))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn chat_requires_a_message() {
    let t = TestApp::streaming();
    let (status, body) = t
        .json(json_request(Method::POST, "/api/chat/message", None, json!({"message": "  "})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Message is required");
}

#[tokio::test]
async fn non_streaming_provider_answers_with_json() {
    let t = TestApp::new(ProviderKind::Groq, vec!["Use the ", "reset link."], false);
    let token = t.token_for("bob", UserRole::User);

    let (status, body) = t
        .json(json_request(
            Method::POST,
            "/api/chat/message",
            Some(&token),
            json!({"message": "I forgot my password", "sessionId": "s1"}),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "Use the reset link."}));

    let (status, history) = t.json(get("/api/chat/history?sessionId=s1", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    let messages = history[0]["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[0]["content"], "I forgot my password");
    assert_eq!(messages[1]["content"], "Use the reset link.");
}

#[tokio::test]
async fn streaming_provider_answers_with_sse_frames() {
    let t = TestApp::streaming();
    let admin = t.token_for("root", UserRole::Admin);
    t.json(json_request(
        Method::POST,
        "/api/faqs",
        Some(&admin),
        json!({"question": "How long do refunds take?", "answer": "Five business days."}),
    ))
    .await;

    let (status, body) = t
        .send(json_request(Method::POST, "/api/chat/message", None, json!({"message": "refunds"})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        sse_payloads(&body),
        vec![
            json!({"content": "Refunds ", "done": false}),
            json!({"content": "take 5 days.", "done": false}),
            json!({"content": "", "done": true}),
        ]
    );

    let prompt = t.client.prompts.lock()[0].prompt.clone();
    assert!(prompt.contains("Q: How long do refunds take?"));
    assert!(prompt.contains("## Current Question:\nrefunds"));
}

#[tokio::test]
async fn history_is_kept_only_for_signed_in_users() {
    let t = TestApp::streaming();
    let token = t.token_for("bob", UserRole::User);

    t.send(json_request(
        Method::POST,
        "/api/chat/message",
        None,
        json!({"message": "hello", "sessionId": "shared"}),
    ))
    .await;
    let user = t.state.store.find_user_by_email("bob@example.com").unwrap().unwrap();
    assert!(t.state.store.get_chat_session(user.id, "shared").unwrap().is_none());

    t.send(json_request(
        Method::POST,
        "/api/chat/message",
        Some(&token),
        json!({"message": "hello", "sessionId": "shared"}),
    ))
    .await;
    t.send(json_request(
        Method::POST,
        "/api/chat/message",
        Some(&token),
        json!({"message": "and again", "sessionId": "shared"}),
    ))
    .await;

    let session = t.state.store.get_chat_session(user.id, "shared").unwrap().unwrap();
    let roles: Vec<TurnRole> = session.messages.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![TurnRole::User, TurnRole::Assistant, TurnRole::User, TurnRole::Assistant]
    );
    assert_eq!(session.messages[1].content, "Refunds take 5 days.");

    // The second request saw the first exchange
    let second_prompt = t.client.prompts.lock()[2].prompt.clone();
    assert!(second_prompt.contains("## Previous Conversation:\n\nUser: hello\nAssistant: Refunds take 5 days."));

    let (status, _) = t.json(get("/api/chat/history", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn mid_stream_failure_sends_error_frame_and_keeps_partial_answer() {
    let t = TestApp::new(ProviderKind::Claude, vec!["Partial "], true);
    let token = t.token_for("bob", UserRole::User);

    let (status, body) = t
        .send(json_request(
            Method::POST,
            "/api/chat/message",
            Some(&token),
            json!({"message": "status of order 7?", "sessionId": "s9"}),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        sse_payloads(&body),
        vec![
            json!({"content": "Partial ", "done": false}),
            json!({"error": "Failed to generate response"}),
        ]
    );

    let user = t.state.store.find_user_by_email("bob@example.com").unwrap().unwrap();
    let session = t.state.store.get_chat_session(user.id, "s9").unwrap().unwrap();
    assert_eq!(session.messages.len(), 2);
    assert_eq!(session.messages[1].content, "Partial ");
}

#[tokio::test]
async fn document_upload_ingest_and_delete() {
    let t = TestApp::streaming();
    let admin = t.token_for("root", UserRole::Admin);
    let boundary = "supportdesk-test-boundary";
    let multipart = |name: &str, content: &str| {
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{name}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n{content}\r\n--{b}--\r\n",
            b = boundary
        );
        Request::builder()
            .method(Method::POST)
            .uri("/api/documents/upload")
            .header(header::AUTHORIZATION, format!("Bearer {}", admin))
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", boundary))
            .body(Body::from(body))
            .unwrap()
    };

    let (status, body) = t.json(multipart("virus.exe", "MZ")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Only PDF"));

    let (status, body) = t
        .json(multipart("shipping.txt", "Orders ship within two days of payment."))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["document"]["filename"], "shipping.txt");
    assert_eq!(body["document"]["status"], "pending");
    let id = body["document"]["id"].as_i64().unwrap();

    ingestion::process_document(&t.state, id);
    let doc = t.state.store.get_document(id).unwrap().unwrap();
    assert_eq!(doc.chunk_count, 1);
    assert!(std::path::Path::new(&doc.file_path).exists());

    let (status, list) = t.json(get("/api/documents/list", Some(&admin))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list[0]["status"], "completed");
    assert_eq!(list[0]["uploadedByUsername"], "root");

    // Every document is attached to chat requests by URL
    t.send(json_request(Method::POST, "/api/chat/message", None, json!({"message": "shipping"})))
        .await;
    let request = t.client.prompts.lock()[0].clone();
    assert_eq!(request.media.len(), 1);
    assert_eq!(request.media[0].url, format!("http://localhost:5000/uploads/{}", doc.filename));
    assert!(request.prompt.contains("[From shipping.txt]\nOrders ship within two days of payment."));

    let (status, body) = t
        .json(json_request(Method::POST, &format!("/api/documents/{}/ingest", id), Some(&admin), json!({})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["documentId"], id);

    let delete = Request::builder()
        .method(Method::DELETE)
        .uri(format!("/api/documents/{}", id))
        .header(header::AUTHORIZATION, format!("Bearer {}", admin))
        .body(Body::empty())
        .unwrap();
    let (status, _) = t.json(delete).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!std::path::Path::new(&doc.file_path).exists());
    assert!(t.state.store.get_document(id).unwrap().is_none());

    let (status, body) = t
        .json(json_request(Method::POST, &format!("/api/documents/{}/ingest", id), Some(&admin), json!({})))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Document not found");
}

#[tokio::test]
async fn health_reports_provider() {
    let t = TestApp::streaming();
    let (status, body) = t.json(get("/api/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok", "provider": "openai"}));
}
