use crate::keys::{object_key, Scope};
use crate::traits::{BlobInfo, BlobStore, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use filedock_core::resolve_public_url;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Directory under the public root that holds every blob.
const UPLOADS_DIR: &str = "uploads";

/// Local filesystem blob store
///
/// Locations are paths relative to `public_root`, so they double as
/// web-root-relative URLs when the root is served statically.
#[derive(Clone)]
pub struct LocalBlobStore {
    public_root: PathBuf,
}

impl LocalBlobStore {
    /// Create a new store rooted at `public_root` (e.g. "public").
    pub async fn new(public_root: impl Into<PathBuf>) -> StorageResult<Self> {
        let public_root = public_root.into();

        fs::create_dir_all(&public_root).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                public_root.display(),
                e
            ))
        })?;

        Ok(LocalBlobStore { public_root })
    }

    pub fn public_root(&self) -> &Path {
        &self.public_root
    }

    /// Convert a location to a filesystem path, rejecting anything that could
    /// escape the uploads directory.
    fn location_to_path(&self, location: &str) -> StorageResult<PathBuf> {
        if location.contains("..") || location.starts_with('/') || location.contains('\\') {
            return Err(StorageError::InvalidKey(
                "Location contains invalid characters".to_string(),
            ));
        }

        let relative = Path::new(location);
        let mut components = relative.components();
        match components.next() {
            Some(Component::Normal(first)) if first == UPLOADS_DIR => {}
            _ => {
                return Err(StorageError::InvalidKey(
                    "Location is outside the uploads directory".to_string(),
                ))
            }
        }
        if !components.all(|c| matches!(c, Component::Normal(_))) {
            return Err(StorageError::InvalidKey(
                "Location contains invalid components".to_string(),
            ));
        }

        Ok(self.public_root.join(relative))
    }

    fn location_for(key: &str) -> String {
        format!("{}/{}", UPLOADS_DIR, key)
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    async fn write_new_file(path: &Path, data: &[u8]) -> std::io::Result<()> {
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await?;
        file.write_all(data).await?;
        file.sync_all().await
    }

    fn info_from_metadata(location: String, meta: &std::fs::Metadata) -> BlobInfo {
        BlobInfo {
            location,
            size_bytes: meta.len(),
            last_modified: meta.modified().ok().map(DateTime::<Utc>::from),
        }
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn write(&self, scope: &Scope, stored_name: &str, data: Bytes) -> StorageResult<String> {
        let location = Self::location_for(&object_key(scope, stored_name)?);
        let path = self.location_to_path(&location)?;
        let size = data.len();

        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();

        if let Err(e) = Self::write_new_file(&path, &data).await {
            if e.kind() == ErrorKind::AlreadyExists {
                return Err(StorageError::AlreadyExists(location));
            }
            // Never leave a partially written blob behind.
            let _ = fs::remove_file(&path).await;
            return Err(StorageError::UploadFailed(format!(
                "Failed to write file {}: {}",
                path.display(),
                e
            )));
        }

        tracing::info!(
            path = %path.display(),
            location = %location,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage write successful"
        );

        Ok(location)
    }

    async fn read(&self, location: &str) -> StorageResult<Bytes> {
        let path = self.location_to_path(location)?;
        let start = std::time::Instant::now();

        let data = match fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::NotFound(location.to_string()))
            }
            Err(e) => {
                return Err(StorageError::DownloadFailed(format!(
                    "Failed to read file {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        tracing::debug!(
            location = %location,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage read successful"
        );

        Ok(Bytes::from(data))
    }

    async fn delete(&self, location: &str) -> StorageResult<bool> {
        let path = self.location_to_path(location)?;
        let start = std::time::Instant::now();

        match fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => {
                return Err(StorageError::DeleteFailed(format!(
                    "Failed to delete file {}: {}",
                    path.display(),
                    e
                )))
            }
        }

        tracing::info!(
            path = %path.display(),
            location = %location,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage delete successful"
        );

        Ok(true)
    }

    async fn exists(&self, location: &str) -> StorageResult<bool> {
        let path = self.location_to_path(location)?;
        Ok(fs::try_exists(&path).await?)
    }

    async fn stat(&self, location: &str) -> StorageResult<BlobInfo> {
        let path = self.location_to_path(location)?;
        match fs::metadata(&path).await {
            Ok(meta) => Ok(Self::info_from_metadata(location.to_string(), &meta)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StorageError::NotFound(location.to_string()))
            }
            Err(e) => Err(StorageError::BackendError(e.to_string())),
        }
    }

    async fn list(&self) -> StorageResult<Vec<BlobInfo>> {
        let uploads = self.public_root.join(UPLOADS_DIR);
        let mut blobs = Vec::new();
        let mut pending = vec![(uploads, UPLOADS_DIR.to_string())];

        while let Some((dir, prefix)) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(StorageError::IoError(e)),
            };

            while let Some(entry) = entries.next_entry().await? {
                let name = entry.file_name().to_string_lossy().into_owned();
                let location = format!("{}/{}", prefix, name);
                let meta = entry.metadata().await?;
                if meta.is_dir() {
                    pending.push((entry.path(), location));
                } else if meta.is_file() {
                    blobs.push(Self::info_from_metadata(location, &meta));
                }
            }
        }

        blobs.sort_by(|a, b| a.location.cmp(&b.location));
        Ok(blobs)
    }

    async fn ensure_layout(&self) -> StorageResult<()> {
        for scope in Scope::all() {
            let dir = self.public_root.join(UPLOADS_DIR).join(scope.prefix());
            fs::create_dir_all(&dir).await.map_err(|e| {
                StorageError::ConfigError(format!(
                    "Failed to create storage directory {}: {}",
                    dir.display(),
                    e
                ))
            })?;
        }
        tracing::debug!(root = %self.public_root.display(), "Local storage layout ready");
        Ok(())
    }

    async fn check_reachable(&self) -> StorageResult<()> {
        let metadata = fs::metadata(&self.public_root).await?;
        if !metadata.is_dir() {
            return Err(StorageError::ConfigError(
                "Storage root is not a directory".to_string(),
            ));
        }
        Ok(())
    }

    fn public_url(&self, location: &str) -> String {
        resolve_public_url(location)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

#[cfg(all(test, feature = "storage-local"))]
mod tests {
    use super::*;
    use filedock_core::FileCategory;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_local_storage_write_read() {
        let dir = tempdir().unwrap();
        let storage = LocalBlobStore::new(dir.path()).await.unwrap();

        let data = Bytes::from_static(b"test data");
        let location = storage
            .write(&Scope::original(FileCategory::Document), "1_abc.txt", data.clone())
            .await
            .unwrap();

        assert_eq!(location, "uploads/document/original/1_abc.txt");
        assert!(dir.path().join(&location).is_file());

        let read = storage.read(&location).await.unwrap();
        assert_eq!(data, read);
    }

    #[tokio::test]
    async fn test_write_creates_scope_lazily_and_refuses_overwrite() {
        let dir = tempdir().unwrap();
        let storage = LocalBlobStore::new(dir.path()).await.unwrap();
        let scope = Scope::thumbnails(FileCategory::Image);

        storage
            .write(&scope, "thumb_a.jpg", Bytes::from_static(b"first"))
            .await
            .unwrap();
        let second = storage
            .write(&scope, "thumb_a.jpg", Bytes::from_static(b"second"))
            .await;
        assert!(matches!(second, Err(StorageError::AlreadyExists(_))));

        let read = storage
            .read("uploads/image/thumbnails/thumb_a.jpg")
            .await
            .unwrap();
        assert_eq!(read, Bytes::from_static(b"first"));
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let dir = tempdir().unwrap();
        let storage = LocalBlobStore::new(dir.path()).await.unwrap();

        let result = storage.read("../../../etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage.delete("uploads/../secret").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage.exists("/etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage.read("index.html").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let dir = tempdir().unwrap();
        let storage = LocalBlobStore::new(dir.path()).await.unwrap();

        assert!(!storage
            .delete("uploads/other/original/missing.bin")
            .await
            .unwrap());

        let location = storage
            .write(&Scope::original(FileCategory::Other), "a.bin", Bytes::from_static(b"x"))
            .await
            .unwrap();
        assert!(storage.delete(&location).await.unwrap());
        assert!(!storage.delete(&location).await.unwrap());
    }

    #[tokio::test]
    async fn test_read_missing_is_not_found() {
        let dir = tempdir().unwrap();
        let storage = LocalBlobStore::new(dir.path()).await.unwrap();

        let result = storage.read("uploads/image/original/nope.png").await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_and_stat() {
        let dir = tempdir().unwrap();
        let storage = LocalBlobStore::new(dir.path()).await.unwrap();
        assert!(storage.list().await.unwrap().is_empty());

        storage
            .write(&Scope::original(FileCategory::Image), "a.png", Bytes::from_static(b"aa"))
            .await
            .unwrap();
        storage
            .write(&Scope::thumbnails(FileCategory::Image), "thumb_a.png", Bytes::from_static(b"a"))
            .await
            .unwrap();
        storage
            .write(&Scope::original(FileCategory::Audio), "b.mp3", Bytes::from_static(b"bbb"))
            .await
            .unwrap();

        let listed: Vec<String> = storage
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.location)
            .collect();
        assert_eq!(
            listed,
            vec![
                "uploads/audio/original/b.mp3",
                "uploads/image/original/a.png",
                "uploads/image/thumbnails/thumb_a.png",
            ]
        );

        let info = storage.stat("uploads/audio/original/b.mp3").await.unwrap();
        assert_eq!(info.size_bytes, 3);
        assert!(info.last_modified.is_some());
    }

    #[tokio::test]
    async fn test_ensure_layout_is_idempotent() {
        let dir = tempdir().unwrap();
        let storage = LocalBlobStore::new(dir.path()).await.unwrap();

        storage.ensure_layout().await.unwrap();
        storage.ensure_layout().await.unwrap();

        assert!(dir.path().join("uploads/archive/thumbnails").is_dir());
        assert!(dir.path().join("uploads/image/original").is_dir());
        assert!(storage.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_check_reachable_creates_nothing() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("public");
        let storage = LocalBlobStore::new(&root).await.unwrap();

        storage.check_reachable().await.unwrap();
        assert!(!root.join("uploads").exists());

        std::fs::remove_dir(&root).unwrap();
        assert!(storage.check_reachable().await.is_err());
    }

    #[tokio::test]
    async fn test_public_url_is_root_relative() {
        let dir = tempdir().unwrap();
        let storage = LocalBlobStore::new(dir.path()).await.unwrap();
        assert_eq!(
            storage.public_url("uploads/image/original/a.png"),
            "/uploads/image/original/a.png"
        );
    }
}
