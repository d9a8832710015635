//! Upload, delete and orphan sweep over a [`BlobStore`] and a [`FileRepository`].
//!
//! Every blob written during an upload is tracked until the metadata record
//! is persisted; any later failure deletes those blobs again before the
//! error is surfaced.

use bytes::Bytes;
use chrono::Utc;
use filedock_core::{AppError, Config, FileCategory, FileRecord, NewFileRecord};
use filedock_db::FileRepository;
use filedock_processing::{
    classify, normalize_mime_type, FileValidator, ImageDeriver, NameGenerator,
};
use filedock_storage::{
    thumbnail_location_for, thumbnail_name, BlobStore, Scope, StorageError, StorageResult,
};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Attempts at a fresh stored name before a write collision is reported.
const MAX_NAME_ATTEMPTS: usize = 3;

/// Timeouts and sweep thresholds for [`IngestService`].
#[derive(Debug, Clone, Copy)]
pub struct IngestSettings {
    pub storage_timeout: Duration,
    pub database_timeout: Duration,
    /// Blobs younger than this are never treated as orphans.
    pub orphan_min_age: Duration,
}

impl IngestSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            storage_timeout: Duration::from_secs(config.storage_timeout_secs()),
            database_timeout: Duration::from_secs(config.database_timeout_secs()),
            orphan_min_age: Duration::from_secs(config.orphan_sweep_min_age_secs()),
        }
    }
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            storage_timeout: Duration::from_secs(30),
            database_timeout: Duration::from_secs(10),
            orphan_min_age: Duration::from_secs(300),
        }
    }
}

/// One file as received from a client.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub data: Bytes,
    pub original_name: String,
    /// Client-declared content type, not verified against the bytes.
    pub mime_type: String,
    /// Caller-chosen category; still validated against that category's policy.
    pub category: Option<FileCategory>,
    pub uploaded_by: Option<Uuid>,
}

pub struct IngestService {
    storage: Arc<dyn BlobStore>,
    files: Arc<dyn FileRepository>,
    validator: FileValidator,
    names: NameGenerator,
    deriver: Arc<dyn ImageDeriver>,
    settings: IngestSettings,
}

impl IngestService {
    pub fn new(
        storage: Arc<dyn BlobStore>,
        files: Arc<dyn FileRepository>,
        validator: FileValidator,
        names: NameGenerator,
        deriver: Arc<dyn ImageDeriver>,
        settings: IngestSettings,
    ) -> Self {
        Self {
            storage,
            files,
            validator,
            names,
            deriver,
            settings,
        }
    }

    pub fn storage(&self) -> &Arc<dyn BlobStore> {
        &self.storage
    }

    pub fn validator(&self) -> &FileValidator {
        &self.validator
    }

    /// Validate, store, derive and record one file.
    #[tracing::instrument(
        skip(self, request),
        fields(
            original_name = %request.original_name,
            mime_type = %request.mime_type,
            size_bytes = request.data.len()
        )
    )]
    pub async fn upload(&self, request: UploadRequest) -> Result<FileRecord, AppError> {
        let start = Instant::now();

        let mime_type = normalize_mime_type(&request.mime_type);
        let category = request.category.unwrap_or_else(|| classify(&mime_type));
        let size_bytes = request.data.len() as u64;

        self.validator.check(category, &mime_type, size_bytes)?;

        let (stored_name, storage_path) = self
            .write_original(category, &request.original_name, request.data.clone())
            .await?;
        let mut written = vec![storage_path.clone()];

        let mut thumbnail_path = None;
        let mut dimensions = None;

        if category == FileCategory::Image {
            match self.deriver.derive(request.data).await {
                Ok(derived) => {
                    let thumb_name = thumbnail_name(&stored_name);
                    let write = self
                        .bounded(self.storage.write(
                            &Scope::thumbnails(category),
                            &thumb_name,
                            derived.thumbnail,
                        ))
                        .await;

                    match write {
                        Ok(location) => {
                            written.push(location.clone());
                            thumbnail_path = Some(location);
                            dimensions = Some((derived.width, derived.height));
                        }
                        Err(e) => {
                            tracing::error!(
                                error = %e,
                                stored_name = %stored_name,
                                "Failed to store thumbnail, rolling back upload"
                            );
                            self.compensate(&written).await;
                            return Err(e.into());
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        stored_name = %stored_name,
                        "Thumbnail derivation failed, continuing without thumbnail"
                    );
                }
            }
        }

        let new = NewFileRecord {
            original_name: request.original_name,
            stored_name,
            mime_type,
            size_bytes,
            category,
            storage_path,
            thumbnail_path,
            width: dimensions.map(|(w, _)| w),
            height: dimensions.map(|(_, h)| h),
            duration: None,
            uploaded_by: request.uploaded_by,
        };

        let created =
            tokio::time::timeout(self.settings.database_timeout, self.files.create(new)).await;

        let record = match created {
            Ok(Ok(record)) => record,
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Metadata write failed, removing stored blobs");
                self.compensate(&written).await;
                return Err(match e {
                    AppError::InvalidInput(_) | AppError::DuplicateKey(_) => e,
                    other => AppError::MetadataWriteFailed(other.to_string()),
                });
            }
            Err(_) => {
                tracing::error!(
                    timeout_secs = self.settings.database_timeout.as_secs(),
                    "Metadata write timed out, removing stored blobs"
                );
                self.compensate(&written).await;
                return Err(AppError::MetadataWriteFailed(
                    "Metadata write timed out".to_string(),
                ));
            }
        };

        tracing::info!(
            file_id = %record.id,
            category = %record.category,
            storage_path = %record.storage_path,
            has_thumbnail = record.thumbnail_path.is_some(),
            duration_ms = start.elapsed().as_millis() as u64,
            "File ingested"
        );

        Ok(record)
    }

    /// Store the original under a fresh name, regenerating on collision.
    async fn write_original(
        &self,
        category: FileCategory,
        original_name: &str,
        data: Bytes,
    ) -> Result<(String, String), AppError> {
        let scope = Scope::original(category);

        for attempt in 1..=MAX_NAME_ATTEMPTS {
            let stored_name = self.names.generate(original_name);

            match self
                .bounded(self.storage.write(&scope, &stored_name, data.clone()))
                .await
            {
                Ok(location) => return Ok((stored_name, location)),
                Err(StorageError::AlreadyExists(_)) => {
                    tracing::warn!(
                        attempt,
                        stored_name = %stored_name,
                        "Stored name already taken, regenerating"
                    );
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to store original");
                    return Err(e.into());
                }
            }
        }

        Err(AppError::StorageUnavailable(
            "Could not allocate a unique stored name".to_string(),
        ))
    }

    /// Best-effort removal of blobs written by a failed upload. Failures are
    /// left for the orphan sweep.
    async fn compensate(&self, locations: &[String]) {
        for location in locations {
            match self.bounded(self.storage.delete(location)).await {
                Ok(_) => {
                    tracing::debug!(location = %location, "Compensating delete succeeded");
                }
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        location = %location,
                        "Compensating delete failed, blob left for orphan sweep"
                    );
                }
            }
        }
    }

    /// Remove the blobs behind a record. Returns whether the original existed.
    ///
    /// For images the thumbnail location is derived from the original's; its
    /// removal is best-effort and not reported.
    #[tracing::instrument(skip(self, record), fields(file_id = %record.id))]
    pub async fn delete_artifacts(&self, record: &FileRecord) -> Result<bool, AppError> {
        let removed = self.bounded(self.storage.delete(&record.storage_path)).await?;

        if record.category == FileCategory::Image {
            let thumbnail = thumbnail_location_for(&record.storage_path)
                .or_else(|| record.thumbnail_path.clone());

            if let Some(location) = thumbnail {
                match self.bounded(self.storage.delete(&location)).await {
                    Ok(true) => {}
                    Ok(false) => {
                        tracing::debug!(location = %location, "Thumbnail already absent");
                    }
                    Err(e) => {
                        tracing::warn!(
                            error = %e,
                            location = %location,
                            "Failed to delete thumbnail"
                        );
                    }
                }
            }
        }

        Ok(removed)
    }

    /// Delete a file's blobs, then its record.
    #[tracing::instrument(skip(self))]
    pub async fn delete_file(&self, id: Uuid) -> Result<(), AppError> {
        let record = self
            .query(self.files.find_by_id(id))
            .await?
            .ok_or_else(|| AppError::RecordNotFound("File not found".to_string()))?;

        match self.delete_artifacts(&record).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(
                    storage_path = %record.storage_path,
                    "Original blob was already absent"
                );
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    storage_path = %record.storage_path,
                    "Failed to delete blobs, leaving them for orphan sweep"
                );
            }
        }

        if !self.query(self.files.delete(id)).await? {
            return Err(AppError::RecordNotFound("File not found".to_string()));
        }

        tracing::info!(file_id = %id, "File deleted");
        Ok(())
    }

    /// All records, newest first.
    pub async fn list_files(&self) -> Result<Vec<FileRecord>, AppError> {
        self.query(self.files.list()).await
    }

    /// Delete every blob that no live record references and that is older
    /// than the configured minimum age. Returns how many were removed.
    #[tracing::instrument(skip(self))]
    pub async fn sweep_orphans(&self) -> Result<u64, AppError> {
        let start = Instant::now();

        let referenced = self.query(self.files.referenced_locations()).await?;
        let blobs = self.bounded(self.storage.list()).await?;

        let min_age = chrono::Duration::from_std(self.settings.orphan_min_age)
            .unwrap_or_else(|_| chrono::Duration::zero());
        let cutoff = Utc::now() - min_age;

        let mut removed = 0u64;
        let mut skipped_recent = 0u64;

        for blob in blobs {
            if referenced.contains(&blob.location) {
                continue;
            }

            let old_enough = match blob.last_modified {
                Some(modified) => modified <= cutoff,
                None => min_age.is_zero(),
            };
            if !old_enough {
                skipped_recent += 1;
                continue;
            }

            match self.bounded(self.storage.delete(&blob.location)).await {
                Ok(true) => {
                    tracing::info!(location = %blob.location, "Deleted orphaned blob");
                    removed += 1;
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        location = %blob.location,
                        "Failed to delete orphaned blob"
                    );
                }
            }
        }

        tracing::info!(
            removed,
            skipped_recent,
            referenced = referenced.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Orphan sweep completed"
        );

        Ok(removed)
    }

    /// Bound a storage call by the storage timeout.
    async fn bounded<T>(&self, fut: impl Future<Output = StorageResult<T>>) -> StorageResult<T> {
        match tokio::time::timeout(self.settings.storage_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(StorageError::BackendError(format!(
                "Storage operation timed out after {}s",
                self.settings.storage_timeout.as_secs()
            ))),
        }
    }

    /// Bound a repository read by the database timeout.
    async fn query<T>(
        &self,
        fut: impl Future<Output = Result<T, AppError>>,
    ) -> Result<T, AppError> {
        match tokio::time::timeout(self.settings.database_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(AppError::Internal(format!(
                "Metadata query timed out after {}s",
                self.settings.database_timeout.as_secs()
            ))),
        }
    }
}
