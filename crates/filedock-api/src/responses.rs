//! JSON projections returned by the API.

use chrono::{DateTime, Utc};
use filedock_core::{format_file_size, FileCategory, FileRecord, Uploader};
use filedock_storage::BlobStore;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

/// A file record enriched with resolved URLs and a formatted size.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileResponse {
    pub id: Uuid,
    /// Name the file was uploaded with
    pub filename: String,
    pub stored_name: String,
    pub url: String,
    pub thumbnail_url: Option<String>,
    pub size: u64,
    /// e.g. "1.5 KB"
    pub formatted_size: String,
    pub mime_type: String,
    pub category: FileCategory,
    pub category_label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    pub uploaded_by: Option<Uploader>,
    pub created_at: DateTime<Utc>,
}

impl FileResponse {
    pub fn from_record(record: FileRecord, storage: &dyn BlobStore) -> Self {
        FileResponse {
            id: record.id,
            url: storage.public_url(&record.storage_path),
            thumbnail_url: record
                .thumbnail_path
                .as_deref()
                .map(|location| storage.public_url(location)),
            size: record.size_bytes,
            formatted_size: format_file_size(record.size_bytes),
            mime_type: record.mime_type,
            category: record.category,
            category_label: record.category.label().to_string(),
            width: record.width,
            height: record.height,
            duration: record.duration,
            uploaded_by: record.uploader,
            created_at: record.created_at,
            filename: record.original_name,
            stored_name: record.stored_name,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteResponse {
    pub success: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SweepResponse {
    /// Orphaned blobs removed by this sweep
    pub removed: u64,
}
