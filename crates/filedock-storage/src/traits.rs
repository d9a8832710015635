//! Blob storage abstraction trait
//!
//! This module defines the `BlobStore` trait that all storage backends implement.

use crate::keys::Scope;
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use filedock_core::AppError;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Blob already exists: {0}")]
    AlreadyExists(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage location: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(_) => AppError::RecordNotFound("File not found".to_string()),
            StorageError::InvalidKey(msg) => AppError::InvalidInput(msg),
            StorageError::ConfigError(msg) => AppError::Internal(msg),
            other => AppError::StorageUnavailable(other.to_string()),
        }
    }
}

/// What a backend knows about one stored blob.
#[derive(Debug, Clone, PartialEq)]
pub struct BlobInfo {
    pub location: String,
    pub size_bytes: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Blob storage abstraction
///
/// Both backends hand out opaque *locations* from [`BlobStore::write`] and
/// accept them back in every other call. A location is what gets persisted
/// in a file record.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `data` as `stored_name` inside `scope` and return its location.
    ///
    /// Missing scope containers are created first; creating one that already
    /// exists is a no-op. Writes never overwrite: an existing blob with the same
    /// name yields [`StorageError::AlreadyExists`].
    async fn write(&self, scope: &Scope, stored_name: &str, data: Bytes) -> StorageResult<String>;

    /// Read a blob back; [`StorageError::NotFound`] if it is absent.
    async fn read(&self, location: &str) -> StorageResult<Bytes>;

    /// Remove a blob. Returns `false` (not an error) when nothing was there.
    async fn delete(&self, location: &str) -> StorageResult<bool>;

    /// Check if a blob exists
    async fn exists(&self, location: &str) -> StorageResult<bool>;

    /// Size and modification time of a blob.
    async fn stat(&self, location: &str) -> StorageResult<BlobInfo>;

    /// Enumerate every blob physically present in the layout.
    async fn list(&self) -> StorageResult<Vec<BlobInfo>>;

    /// Pre-create all scope containers of the layout.
    async fn ensure_layout(&self) -> StorageResult<()>;

    /// Confirm the backend is reachable without changing anything.
    async fn check_reachable(&self) -> StorageResult<()>;

    /// Browser-facing URL for a location.
    fn public_url(&self, location: &str) -> String;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
