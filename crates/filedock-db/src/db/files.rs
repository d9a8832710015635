//! File metadata repository: CRUD for the files table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use filedock_core::models::{FileCategory, FileRecord, NewFileRecord, Uploader};
use filedock_core::AppError;
use sqlx::{PgPool, Postgres};
use std::collections::HashSet;
use uuid::Uuid;

/// Metadata Repository interface consumed by the ingestion pipeline.
#[async_trait]
pub trait FileRepository: Send + Sync {
    /// Persist a new record; the repository assigns `id` and `created_at`.
    async fn create(&self, new: NewFileRecord) -> Result<FileRecord, AppError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<FileRecord>, AppError>;

    /// Returns whether a row was removed.
    async fn delete(&self, id: Uuid) -> Result<bool, AppError>;

    /// All records, newest first.
    async fn list(&self) -> Result<Vec<FileRecord>, AppError>;

    /// Every blob location referenced by a live record (originals and thumbnails).
    async fn referenced_locations(&self) -> Result<HashSet<String>, AppError>;
}

/// Row type for the files table joined with its uploader (for FromRow).
#[derive(Debug, sqlx::FromRow)]
pub struct FileRow {
    pub id: Uuid,
    pub original_name: String,
    pub stored_name: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub category: FileCategory,
    pub storage_path: String,
    pub thumbnail_path: Option<String>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub duration: Option<f64>,
    pub uploaded_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub uploader_name: Option<String>,
    pub uploader_email: Option<String>,
    pub uploader_avatar: Option<String>,
}

impl FileRow {
    pub fn to_domain(self) -> FileRecord {
        let uploader = match (self.uploaded_by, self.uploader_email) {
            (Some(id), Some(email)) => Some(Uploader {
                id,
                name: self.uploader_name,
                email,
                avatar: self.uploader_avatar,
            }),
            _ => None,
        };

        FileRecord {
            id: self.id,
            original_name: self.original_name,
            stored_name: self.stored_name,
            mime_type: self.mime_type,
            size_bytes: u64::try_from(self.size_bytes).unwrap_or_default(),
            category: self.category,
            storage_path: self.storage_path,
            thumbnail_path: self.thumbnail_path,
            width: self.width.and_then(|w| u32::try_from(w).ok()),
            height: self.height.and_then(|h| u32::try_from(h).ok()),
            duration: self.duration,
            uploaded_by: self.uploaded_by,
            uploader,
            created_at: self.created_at,
        }
    }
}

const SELECT_WITH_UPLOADER: &str = r#"
    SELECT f.id, f.original_name, f.stored_name, f.mime_type, f.size_bytes, f.category,
           f.storage_path, f.thumbnail_path, f.width, f.height, f.duration,
           f.uploaded_by, f.created_at,
           u.name AS uploader_name, u.email AS uploader_email, u.avatar AS uploader_avatar
    FROM files f
    LEFT JOIN users u ON u.id = f.uploaded_by
"#;

/// PostgreSQL implementation of [`FileRepository`].
#[derive(Clone)]
pub struct PgFileRepository {
    pool: PgPool,
}

impl PgFileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn to_db_dimension(value: Option<u32>) -> Result<Option<i32>, AppError> {
        value
            .map(|v| {
                i32::try_from(v).map_err(|_| AppError::InvalidInput(format!("Dimension {} out of range", v)))
            })
            .transpose()
    }
}

#[async_trait]
impl FileRepository for PgFileRepository {
    #[tracing::instrument(skip(self, new), fields(db.table = "files", db.operation = "insert", stored_name = %new.stored_name))]
    async fn create(&self, new: NewFileRecord) -> Result<FileRecord, AppError> {
        let size_bytes = i64::try_from(new.size_bytes)
            .map_err(|_| AppError::InvalidInput("File size out of range".to_string()))?;
        let width = Self::to_db_dimension(new.width)?;
        let height = Self::to_db_dimension(new.height)?;

        let result = sqlx::query_as::<Postgres, FileRow>(
            r#"
            WITH f AS (
                INSERT INTO files (
                    original_name, stored_name, mime_type, size_bytes, category,
                    storage_path, thumbnail_path, width, height, duration, uploaded_by
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                RETURNING *
            )
            SELECT f.id, f.original_name, f.stored_name, f.mime_type, f.size_bytes, f.category,
                   f.storage_path, f.thumbnail_path, f.width, f.height, f.duration,
                   f.uploaded_by, f.created_at,
                   u.name AS uploader_name, u.email AS uploader_email, u.avatar AS uploader_avatar
            FROM f
            LEFT JOIN users u ON u.id = f.uploaded_by
            "#,
        )
        .bind(&new.original_name)
        .bind(&new.stored_name)
        .bind(&new.mime_type)
        .bind(size_bytes)
        .bind(new.category)
        .bind(&new.storage_path)
        .bind(&new.thumbnail_path)
        .bind(width)
        .bind(height)
        .bind(new.duration)
        .bind(new.uploaded_by)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => Ok(row.to_domain()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_foreign_key_violation() => Err(
                AppError::InvalidInput("Uploading user does not exist".to_string()),
            ),
            Err(e) => Err(e.into()),
        }
    }

    #[tracing::instrument(skip(self), fields(db.table = "files", db.operation = "select", db.record_id = %id))]
    async fn find_by_id(&self, id: Uuid) -> Result<Option<FileRecord>, AppError> {
        let query = format!("{} WHERE f.id = $1", SELECT_WITH_UPLOADER);
        let row: Option<FileRow> = sqlx::query_as::<Postgres, FileRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(FileRow::to_domain))
    }

    #[tracing::instrument(skip(self), fields(db.table = "files", db.operation = "delete", db.record_id = %id))]
    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let rows_affected = sqlx::query("DELETE FROM files WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(rows_affected > 0)
    }

    #[tracing::instrument(skip(self), fields(db.table = "files", db.operation = "select"))]
    async fn list(&self) -> Result<Vec<FileRecord>, AppError> {
        let query = format!("{} ORDER BY f.created_at DESC, f.id", SELECT_WITH_UPLOADER);
        let rows: Vec<FileRow> = sqlx::query_as::<Postgres, FileRow>(&query)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(FileRow::to_domain).collect())
    }

    #[tracing::instrument(skip(self), fields(db.table = "files", db.operation = "select"))]
    async fn referenced_locations(&self) -> Result<HashSet<String>, AppError> {
        let rows: Vec<(String, Option<String>)> =
            sqlx::query_as("SELECT storage_path, thumbnail_path FROM files")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows
            .into_iter()
            .flat_map(|(original, thumbnail)| std::iter::once(original).chain(thumbnail))
            .collect())
    }
}
