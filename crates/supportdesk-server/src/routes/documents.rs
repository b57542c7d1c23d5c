//! Document routes: upload, list, delete, re-ingest. Admin only.

use std::sync::Arc;

use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::json;
use tracing::{info, warn};

use crate::auth::AdminUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use supportdesk_core::config::MAX_UPLOAD_BYTES;
use supportdesk_ingest::file::is_allowed_upload;
use supportdesk_store::{now_millis, Document, NewDocument};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/documents/upload", post(upload_document))
        .route("/documents/list", get(list_documents))
        .route("/documents/{id}", delete(delete_document))
        .route("/documents/{id}/ingest", post(ingest_document))
}

fn load_document(state: &AppState, id: i64) -> ApiResult<Document> {
    state
        .store
        .get_document(id)?
        .ok_or_else(|| ApiError::not_found("Document not found"))
}

/// Strip any path components from an uploaded file name.
fn sanitize_filename(name: &str) -> String {
    let name = name.replace(['/', '\\'], "_").replace("..", "_");
    std::path::Path::new(&name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload")
        .to_string()
}

fn extension_of(name: &str) -> String {
    std::path::Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        too_large()
    } else {
        ApiError::bad_request(e.body_text())
    }
}

fn too_large() -> ApiError {
    ApiError::PayloadTooLarge("File exceeds the 10 MB limit".into())
}

/// POST /api/documents/upload: multipart field `file`.
async fn upload_document(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    mut multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(multipart_error)?
    {
        if field.name() != Some("file") {
            continue;
        }
        let Some(original_name) = field.file_name().map(sanitize_filename) else {
            continue;
        };
        if !is_allowed_upload(&original_name) {
            return Err(ApiError::bad_request("Only PDF, DOCX, TXT and MD files are allowed"));
        }
        let bytes = field.bytes().await.map_err(multipart_error)?;
        upload = Some((original_name, bytes));
        break;
    }

    let (original_name, bytes) = upload.ok_or_else(|| ApiError::bad_request("No file uploaded"))?;
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(too_large());
    }

    let file_type = extension_of(&original_name);
    let filename = format!("{}-{}.{}", now_millis(), uuid::Uuid::new_v4().simple(), file_type);
    let file_path = state.config.data_paths.uploads.join(&filename);
    tokio::fs::write(&file_path, &bytes)
        .await
        .map_err(|e| ApiError::from(supportdesk_core::Error::from(e)))?;

    let id = state.store.add_document(&NewDocument {
        filename,
        original_name,
        file_path: file_path.to_string_lossy().to_string(),
        file_type,
        file_size: bytes.len() as i64,
        uploaded_by: Some(admin.id),
    })?;
    let doc = load_document(&state, id)?;
    state.queue_ingestion(id);
    info!("Uploaded document {} ({}, {} bytes)", id, doc.original_name, doc.file_size);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Document uploaded successfully",
            "document": {
                "id": doc.id,
                "filename": doc.original_name,
                "fileType": doc.file_type,
                "fileSize": doc.file_size,
                "status": doc.status,
                "createdAt": doc.created_at,
            },
        })),
    ))
}

/// GET /api/documents/list: newest first.
async fn list_documents(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
) -> ApiResult<Json<Vec<Document>>> {
    Ok(Json(state.store.list_documents()?))
}

/// DELETE /api/documents/{id}: removes the file, its chunks, and the row.
async fn delete_document(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<serde_json::Value>> {
    let doc = load_document(&state, id)?;

    if let Err(e) = tokio::fs::remove_file(&doc.file_path).await {
        warn!("Failed to delete file {}: {}", doc.file_path, e);
    }
    state.store.delete_document(id)?;
    info!("Deleted document {} ({})", id, doc.original_name);

    Ok(Json(json!({ "message": "Document deleted successfully" })))
}

/// POST /api/documents/{id}/ingest: queue the document again.
async fn ingest_document(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<serde_json::Value>> {
    load_document(&state, id)?;
    state.queue_ingestion(id);
    Ok(Json(json!({ "message": "Document processing started", "documentId": id })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("guide.pdf"), "guide.pdf");
        assert_eq!(sanitize_filename("../../etc/passwd.txt"), "____etc_passwd.txt");
        assert_eq!(sanitize_filename("C:\\docs\\faq.docx"), "C:_docs_faq.docx");
    }

    #[test]
    fn test_extension_is_lowercased() {
        assert_eq!(extension_of("Manual.PDF"), "pdf");
        assert_eq!(extension_of("notes"), "");
    }
}
