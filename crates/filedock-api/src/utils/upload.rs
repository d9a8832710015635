//! Multipart extraction for the upload endpoint

use axum::extract::multipart::MultipartError;
use axum::extract::Multipart;
use axum::http::StatusCode;
use bytes::Bytes;
use filedock_core::{AppError, FileCategory};
use filedock_processing::{classify, normalize_mime_type, UploadPolicy};
use uuid::Uuid;

/// Fields accepted by `POST /api/files`.
#[derive(Debug)]
pub struct UploadForm {
    pub data: Bytes,
    pub original_name: String,
    pub content_type: String,
    pub user_id: Option<Uuid>,
    pub category: Option<FileCategory>,
}

/// Read the `file`, `userId` and `category` fields from a multipart body.
/// Exactly one `file` field is accepted; unknown fields are ignored.
///
/// A body cut off at `body_limit` is an oversized file for whatever category
/// the fields read so far point at.
pub async fn extract_upload_form(
    mut multipart: Multipart,
    policy: &UploadPolicy,
    body_limit: usize,
) -> Result<UploadForm, AppError> {
    let mut file: Option<(Bytes, Option<String>, Option<String>)> = None;
    let mut user_id = None;
    let mut category = None;
    let mut declared_type: Option<String> = None;

    loop {
        let next = multipart.next_field().await.map_err(|e| {
            read_error(e, "Failed to read multipart", || {
                oversized(policy, body_limit, category, declared_type.as_deref())
            })
        })?;
        let Some(field) = next else { break };

        let field_name = field.name().map(|s| s.to_string()).unwrap_or_default();

        match field_name.as_str() {
            "file" => {
                if file.is_some() {
                    return Err(AppError::InvalidInput(
                        "Multiple file fields are not allowed; send exactly one field named 'file'"
                            .to_string(),
                    ));
                }
                let filename = field.file_name().map(|s| s.to_string());
                let content_type = field.content_type().map(|s| s.to_string());
                declared_type = content_type.clone();

                let data = field.bytes().await.map_err(|e| {
                    read_error(e, "Failed to read file data", || {
                        oversized(policy, body_limit, category, declared_type.as_deref())
                    })
                })?;

                file = Some((data, filename, content_type));
            }
            "userId" => {
                let text = read_text(field).await?;
                user_id = parse_user_id(&text)?;
            }
            "category" => {
                let text = read_text(field).await?;
                category = parse_category(&text)?;
            }
            _ => {}
        }
    }

    let (data, filename, content_type) =
        file.ok_or_else(|| AppError::InvalidInput("No file provided".to_string()))?;

    Ok(UploadForm {
        data,
        original_name: filename
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| "unknown".to_string()),
        content_type: content_type.unwrap_or_else(|| "application/octet-stream".to_string()),
        user_id,
        category,
    })
}

fn read_error(
    err: MultipartError,
    context: &str,
    too_large: impl FnOnce() -> AppError,
) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        too_large()
    } else {
        AppError::InvalidInput(format!("{}: {}", context, err))
    }
}

/// The exact size is unknown once the body is cut off; the limit it crossed
/// is the best lower bound.
fn oversized(
    policy: &UploadPolicy,
    body_limit: usize,
    category: Option<FileCategory>,
    declared_type: Option<&str>,
) -> AppError {
    let category = category.unwrap_or_else(|| {
        declared_type
            .map(|t| classify(&normalize_mime_type(t)))
            .unwrap_or(FileCategory::Other)
    });
    AppError::OversizedFile {
        category,
        size: body_limit as u64,
        max: policy.max_file_size(category),
    }
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Failed to read form field: {}", e)))
}

/// An empty value means "not provided".
fn parse_user_id(value: &str) -> Result<Option<Uuid>, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    Uuid::parse_str(value)
        .map(Some)
        .map_err(|_| AppError::InvalidInput("userId must be a UUID".to_string()))
}

fn parse_category(value: &str) -> Result<Option<FileCategory>, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse::<FileCategory>()
        .map(Some)
        .map_err(|_| AppError::InvalidInput(format!("Unknown category '{}'", value)))
}
