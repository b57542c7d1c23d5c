//! FAQ routes: public listing, admin-only changes.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::auth::AdminUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use supportdesk_store::{Faq, FaqFilter, FaqUpdate};

const DEFAULT_CATEGORY: &str = "general";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/faqs", get(list_faqs).post(create_faq))
        .route("/faqs/{id}", put(update_faq).delete(delete_faq))
}

#[derive(Debug, Deserialize)]
struct CreateFaqRequest {
    question: Option<String>,
    answer: Option<String>,
    category: Option<String>,
}

fn load_faq(state: &AppState, id: i64) -> ApiResult<Faq> {
    state
        .store
        .get_faq(id)?
        .ok_or_else(|| ApiError::not_found("FAQ not found"))
}

/// GET /api/faqs?category=&search=
async fn list_faqs(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<FaqFilter>,
) -> ApiResult<Json<Vec<Faq>>> {
    Ok(Json(state.store.list_faqs(&filter)?))
}

/// POST /api/faqs
async fn create_faq(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Json(req): Json<CreateFaqRequest>,
) -> ApiResult<impl IntoResponse> {
    let present = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
    let (Some(question), Some(answer)) = (present(req.question), present(req.answer)) else {
        return Err(ApiError::bad_request("Question and answer are required"));
    };
    let category = present(req.category).unwrap_or_else(|| DEFAULT_CATEGORY.to_string());

    let id = state
        .store
        .create_faq(&question, &answer, &category, Some(admin.id))?;
    let faq = load_faq(&state, id)?;
    info!("FAQ {} created by user {}", id, admin.id);

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "FAQ created successfully", "faq": faq })),
    ))
}

/// PUT /api/faqs/{id}: only non-empty fields are applied.
async fn update_faq(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<i64>,
    Json(update): Json<FaqUpdate>,
) -> ApiResult<Json<serde_json::Value>> {
    if !state.store.update_faq(id, &update)? {
        return Err(ApiError::not_found("FAQ not found"));
    }
    let faq = load_faq(&state, id)?;
    Ok(Json(json!({ "message": "FAQ updated successfully", "faq": faq })))
}

/// DELETE /api/faqs/{id}
async fn delete_faq(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<serde_json::Value>> {
    if !state.store.delete_faq(id)? {
        return Err(ApiError::not_found("FAQ not found"));
    }
    info!("FAQ {} deleted", id);
    Ok(Json(json!({ "message": "FAQ deleted successfully" })))
}
