//! Login and admin-only account creation.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::auth::{hash_password, verify_password, AdminUser, AuthError};
use crate::error::ApiError;
use crate::state::AppState;
use supportdesk_store::{User, UserRole};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    email: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RegisterRequest {
    username: Option<String>,
    email: Option<String>,
    password: Option<String>,
    role: Option<String>,
}

fn user_json(user: &User) -> serde_json::Value {
    json!({
        "id": user.id,
        "username": user.username,
        "email": user.email,
        "role": user.role,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// POST /api/auth/login
async fn login(State(state): State<Arc<AppState>>, Json(req): Json<LoginRequest>) -> Response {
    let (Some(email), Some(password)) = (non_empty(req.email), req.password.filter(|p| !p.is_empty()))
    else {
        return ApiError::bad_request("Email and password are required").into_response();
    };

    let user = match state.store.find_user_by_email(&email) {
        Ok(Some(user)) => user,
        Ok(None) => return AuthError::InvalidCredentials.into_response(),
        Err(e) => return ApiError::from(e).into_response(),
    };

    if let Err(e) = verify_password(&user.password_hash, &password) {
        return e.into_response();
    }

    match state.auth.issue_token(&user) {
        Ok(token) => {
            info!("User {} logged in", user.id);
            Json(json!({
                "message": "Login successful",
                "token": token,
                "user": user_json(&user),
            }))
            .into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// POST /api/auth/register: admins create accounts.
async fn register(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Json(req): Json<RegisterRequest>,
) -> Response {
    let (Some(username), Some(email), Some(password)) = (
        non_empty(req.username),
        non_empty(req.email),
        req.password.filter(|p| !p.is_empty()),
    ) else {
        return ApiError::bad_request("Username, email and password are required").into_response();
    };

    match state.store.find_user_by_email_or_username(&email, &username) {
        Ok(Some(_)) => return ApiError::bad_request("User already exists").into_response(),
        Ok(None) => {}
        Err(e) => return ApiError::from(e).into_response(),
    }

    let password_hash = match hash_password(&password) {
        Ok(hash) => hash,
        Err(e) => return e.into_response(),
    };
    let role = req.role.as_deref().map(UserRole::parse).unwrap_or(UserRole::User);

    let user = match state
        .store
        .create_user(&username, &email, &password_hash, role)
        .and_then(|id| state.store.get_user(id))
    {
        Ok(Some(user)) => user,
        Ok(None) => return ApiError::Internal("Created user not found".into()).into_response(),
        Err(e) => return ApiError::from(e).into_response(),
    };

    let token = match state.auth.issue_token(&user) {
        Ok(token) => token,
        Err(e) => return e.into_response(),
    };

    info!("Admin {} registered user {} ({})", admin.id, user.id, user.role);
    (
        StatusCode::CREATED,
        Json(json!({
            "message": "User registered successfully",
            "token": token,
            "user": user_json(&user),
        })),
    )
        .into_response()
}
