//! HTTP route handlers, mounted under `/api`.

pub mod auth;
pub mod chat;
pub mod documents;
pub mod faqs;
pub mod health;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use supportdesk_core::config::MAX_UPLOAD_BYTES;

/// Multipart framing on top of the file itself.
const BODY_LIMIT_MARGIN: usize = 64 * 1024;

/// Build the main Axum router with all routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    let uploads = ServeDir::new(&state.config.data_paths.uploads);

    Router::new()
        .nest("/api", api_routes())
        .nest_service("/uploads", uploads)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + BODY_LIMIT_MARGIN))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(health::routes())
        .merge(auth::routes())
        .merge(chat::routes())
        .merge(faqs::routes())
        .merge(documents::routes())
}
