#[cfg(feature = "storage-hosted")]
use crate::HostedBlobStore;
#[cfg(feature = "storage-local")]
use crate::LocalBlobStore;
use crate::{BlobStore, StorageBackend, StorageError, StorageResult};
use filedock_core::Config;
use std::sync::Arc;

/// Create a blob store based on configuration
pub async fn create_blob_store(config: &Config) -> StorageResult<Arc<dyn BlobStore>> {
    match config.storage_backend() {
        #[cfg(feature = "storage-hosted")]
        StorageBackend::Hosted => {
            let storage = HostedBlobStore::new(config.hosted().clone())?;
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-hosted"))]
        StorageBackend::Hosted => Err(StorageError::ConfigError(
            "Hosted storage backend not available (storage-hosted feature not enabled)"
                .to_string(),
        )),

        #[cfg(feature = "storage-local")]
        StorageBackend::Local => {
            let root = config.local_storage_path();
            if root.trim().is_empty() {
                return Err(StorageError::ConfigError(
                    "LOCAL_STORAGE_PATH not configured".to_string(),
                ));
            }

            let storage = LocalBlobStore::new(root).await?;
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-local"))]
        StorageBackend::Local => Err(StorageError::ConfigError(
            "Local storage backend not available (storage-local feature not enabled)".to_string(),
        )),
    }
}
