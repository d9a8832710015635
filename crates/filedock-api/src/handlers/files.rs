use crate::error::{ErrorResponse, HttpAppError};
use crate::responses::{DeleteResponse, FileResponse};
use crate::state::AppState;
use crate::utils::upload::extract_upload_form;
use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use filedock_core::AppError;
use filedock_services::UploadRequest;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::IntoParams;
use uuid::Uuid;

#[utoipa::path(
    post,
    path = "/api/files",
    tag = "files",
    request_body(content_type = "multipart/form-data", description = "Fields: file (binary), userId (optional UUID), category (optional override)"),
    responses(
        (status = 201, description = "File stored", body = FileResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 413, description = "File exceeds the category or request body limit", body = ErrorResponse),
        (status = 415, description = "Type not allowed for the category", body = ErrorResponse),
        (status = 500, description = "Metadata write failed", body = ErrorResponse),
        (status = 503, description = "Storage unavailable", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, multipart), fields(operation = "upload_file"))]
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    let form = extract_upload_form(
        multipart,
        state.ingest.validator().policy(),
        state.body_limit,
    )
    .await?;

    let record = state
        .ingest
        .upload(UploadRequest {
            data: form.data,
            original_name: form.original_name,
            mime_type: form.content_type,
            category: form.category,
            uploaded_by: form.user_id,
        })
        .await?;

    let response = FileResponse::from_record(record, state.storage.as_ref());
    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    get,
    path = "/api/files",
    tag = "files",
    responses(
        (status = 200, description = "All files, newest first", body = Vec<FileResponse>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(operation = "list_files"))]
pub async fn list_files(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    let files = state.ingest.list_files().await?;

    let response: Vec<FileResponse> = files
        .into_iter()
        .map(|record| FileResponse::from_record(record, state.storage.as_ref()))
        .collect();

    Ok(Json(response))
}

#[utoipa::path(
    delete,
    path = "/api/files/{id}",
    tag = "files",
    params(
        ("id" = Uuid, Path, description = "File ID")
    ),
    responses(
        (status = 200, description = "File deleted", body = DeleteResponse),
        (status = 404, description = "File not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(file_id = %id, operation = "delete_file"))]
pub async fn delete_file(
    Path(id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    state.ingest.delete_file(id).await?;
    Ok(Json(DeleteResponse { success: true }))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct DeleteFileQuery {
    /// File ID
    pub id: Option<String>,
}

/// Query-string form of [`delete_file`] kept for form-based clients.
#[utoipa::path(
    delete,
    path = "/api/files",
    tag = "files",
    params(DeleteFileQuery),
    responses(
        (status = 200, description = "File deleted", body = DeleteResponse),
        (status = 400, description = "Missing or malformed id", body = ErrorResponse),
        (status = 404, description = "File not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(operation = "delete_file"))]
pub async fn delete_file_by_query(
    Query(query): Query<DeleteFileQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    let raw = query
        .id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AppError::InvalidInput("File id is required".to_string()))?;
    let id = Uuid::parse_str(raw.trim())
        .map_err(|_| AppError::InvalidInput("File id must be a UUID".to_string()))?;

    state.ingest.delete_file(id).await?;
    Ok(Json(DeleteResponse { success: true }))
}
