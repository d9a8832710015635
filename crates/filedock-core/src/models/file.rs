use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

use super::user::Uploader;

/// Coarse file-type classification driving validation policy and storage
/// partitioning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "file_category", rename_all = "UPPERCASE")
)]
#[serde(rename_all = "UPPERCASE")]
pub enum FileCategory {
    Image,
    Video,
    Audio,
    Document,
    Archive,
    Other,
}

impl FileCategory {
    pub const ALL: [FileCategory; 6] = [
        FileCategory::Image,
        FileCategory::Video,
        FileCategory::Audio,
        FileCategory::Document,
        FileCategory::Archive,
        FileCategory::Other,
    ];

    /// Wire name (`IMAGE`, `VIDEO`, ...)
    pub fn as_str(&self) -> &'static str {
        match self {
            FileCategory::Image => "IMAGE",
            FileCategory::Video => "VIDEO",
            FileCategory::Audio => "AUDIO",
            FileCategory::Document => "DOCUMENT",
            FileCategory::Archive => "ARCHIVE",
            FileCategory::Other => "OTHER",
        }
    }

    /// Lowercase segment used in storage paths and object keys.
    pub fn dir_name(&self) -> &'static str {
        match self {
            FileCategory::Image => "image",
            FileCategory::Video => "video",
            FileCategory::Audio => "audio",
            FileCategory::Document => "document",
            FileCategory::Archive => "archive",
            FileCategory::Other => "other",
        }
    }

    /// Human-readable label for listings.
    pub fn label(&self) -> &'static str {
        match self {
            FileCategory::Image => "Images",
            FileCategory::Video => "Videos",
            FileCategory::Audio => "Audio",
            FileCategory::Document => "Documents",
            FileCategory::Archive => "Archives",
            FileCategory::Other => "Other",
        }
    }
}

impl FromStr for FileCategory {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "IMAGE" => Ok(FileCategory::Image),
            "VIDEO" => Ok(FileCategory::Video),
            "AUDIO" => Ok(FileCategory::Audio),
            "DOCUMENT" => Ok(FileCategory::Document),
            "ARCHIVE" => Ok(FileCategory::Archive),
            "OTHER" => Ok(FileCategory::Other),
            _ => Err(anyhow::anyhow!("Invalid file category: {}", s)),
        }
    }
}

impl Display for FileCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Persisted metadata for one ingested file.
///
/// Records are never mutated after creation. `storage_path` and
/// `thumbnail_path` are Blob Store locations, not public URLs (see
/// [`crate::resolve_public_url`]).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FileRecord {
    pub id: Uuid,
    pub original_name: String,
    pub stored_name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub category: FileCategory,
    pub storage_path: String,
    pub thumbnail_path: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub duration: Option<f64>,
    pub uploaded_by: Option<Uuid>,
    /// Summary of the owning user, filled in by repository reads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploader: Option<Uploader>,
    pub created_at: DateTime<Utc>,
}

/// Fields collected by the upload pipeline before the repository assigns an id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewFileRecord {
    pub original_name: String,
    pub stored_name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub category: FileCategory,
    pub storage_path: String,
    pub thumbnail_path: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub duration: Option<f64>,
    pub uploaded_by: Option<Uuid>,
}

impl NewFileRecord {
    /// Every blob location this record would reference.
    pub fn locations(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.storage_path.as_str()).chain(self.thumbnail_path.as_deref())
    }
}

impl FileRecord {
    pub fn locations(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.storage_path.as_str()).chain(self.thumbnail_path.as_deref())
    }
}
