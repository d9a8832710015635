use crate::keys::{object_key, Scope};
use crate::traits::{BlobInfo, BlobStore, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use filedock_core::{FileCategory, HostedStorageConfig};
use futures::StreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path;
use object_store::Error as ObjectStoreError;
use object_store::{ObjectMeta, ObjectStore, ObjectStoreExt, PutMode, PutOptions, PutPayload};
use std::collections::HashMap;
use std::sync::Arc;

/// Hosted (S3-compatible) blob store
///
/// Each category maps to a bucket; object keys follow the shared scope layout.
/// Locations are `{bucket}/{key}` and never embed the public base, so records
/// stay valid when `HOSTED_STORAGE_PUBLIC_URL` moves. [`BlobStore::public_url`]
/// joins the current base onto a location.
#[derive(Clone)]
pub struct HostedBlobStore {
    config: HostedStorageConfig,
    public_url: String,
    stores: HashMap<String, Arc<dyn ObjectStore>>,
}

impl HostedBlobStore {
    /// Build one S3 client per distinct bucket from environment credentials
    /// and the explicit settings in `config`.
    pub fn new(config: HostedStorageConfig) -> StorageResult<Self> {
        let public_url = config
            .public_url
            .clone()
            .ok_or_else(|| StorageError::ConfigError("HOSTED_STORAGE_PUBLIC_URL not configured".to_string()))?;

        let mut stores: HashMap<String, Arc<dyn ObjectStore>> = HashMap::new();
        for category in FileCategory::ALL {
            let bucket = config.bucket_for(category).to_string();
            if stores.contains_key(&bucket) {
                continue;
            }

            let mut builder = AmazonS3Builder::from_env()
                .with_region(config.region.clone())
                .with_bucket_name(bucket.clone());

            if let Some(ref endpoint) = config.endpoint {
                let allow_http = endpoint.starts_with("http://");
                builder = builder
                    .with_endpoint(endpoint.clone())
                    .with_allow_http(allow_http);
            }

            let store = builder
                .build()
                .map_err(|e| StorageError::ConfigError(e.to_string()))?;
            stores.insert(bucket, Arc::new(store));
        }

        Ok(Self::with_stores(config, public_url, stores))
    }

    /// Assemble a store from prebuilt object stores keyed by bucket name.
    pub fn with_stores(
        config: HostedStorageConfig,
        public_url: impl Into<String>,
        stores: HashMap<String, Arc<dyn ObjectStore>>,
    ) -> Self {
        HostedBlobStore {
            config,
            public_url: public_url.into().trim_end_matches('/').to_string(),
            stores,
        }
    }

    fn store_for(&self, bucket: &str) -> StorageResult<&Arc<dyn ObjectStore>> {
        self.stores
            .get(bucket)
            .ok_or_else(|| StorageError::ConfigError(format!("No client for bucket {}", bucket)))
    }

    fn location_for(bucket: &str, key: &str) -> String {
        format!("{}/{}", bucket, key)
    }

    /// Split a `{bucket}/{key}` location into its bucket and object path.
    fn parse_location<'a>(&self, location: &'a str) -> StorageResult<(&'a str, Path)> {
        let (bucket, key) = location
            .split_once('/')
            .ok_or_else(|| StorageError::InvalidKey("Location has no object key".to_string()))?;

        if key.is_empty() || key.contains("..") || !self.stores.contains_key(bucket) {
            return Err(StorageError::InvalidKey(
                "Location does not address a known bucket".to_string(),
            ));
        }

        let path = Path::parse(key).map_err(|e| StorageError::InvalidKey(e.to_string()))?;
        Ok((bucket, path))
    }

    fn info_from_meta(&self, bucket: &str, meta: ObjectMeta) -> BlobInfo {
        BlobInfo {
            location: Self::location_for(bucket, meta.location.as_ref()),
            size_bytes: meta.size as u64,
            last_modified: Some(meta.last_modified),
        }
    }
}

#[async_trait]
impl BlobStore for HostedBlobStore {
    async fn write(&self, scope: &Scope, stored_name: &str, data: Bytes) -> StorageResult<String> {
        let key = object_key(scope, stored_name)?;
        let bucket = self.config.bucket_for(scope.category);
        let store = self.store_for(bucket)?;
        let path = Path::from(key.as_str());
        let size = data.len();
        let start = std::time::Instant::now();

        // Buckets are provisioned out of band; key prefixes need no creation.
        let options = PutOptions {
            mode: PutMode::Create,
            ..Default::default()
        };

        match store.put_opts(&path, PutPayload::from(data), options).await {
            Ok(_) => {}
            Err(ObjectStoreError::AlreadyExists { .. }) => {
                return Err(StorageError::AlreadyExists(Self::location_for(bucket, &key)))
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    bucket = %bucket,
                    key = %key,
                    "Hosted storage write failed"
                );
                return Err(StorageError::UploadFailed(e.to_string()));
            }
        }

        tracing::info!(
            bucket = %bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Hosted storage write successful"
        );

        Ok(Self::location_for(bucket, &key))
    }

    async fn read(&self, location: &str) -> StorageResult<Bytes> {
        let (bucket, path) = self.parse_location(location)?;
        let store = self.store_for(bucket)?;

        let result = store.get(&path).await.map_err(|e| match e {
            ObjectStoreError::NotFound { .. } => StorageError::NotFound(location.to_string()),
            other => StorageError::DownloadFailed(other.to_string()),
        })?;

        result
            .bytes()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))
    }

    async fn delete(&self, location: &str) -> StorageResult<bool> {
        let (bucket, path) = self.parse_location(location)?;
        let store = self.store_for(bucket)?;

        // S3 deletes are idempotent and do not report prior existence.
        match store.head(&path).await {
            Ok(_) => {}
            Err(ObjectStoreError::NotFound { .. }) => return Ok(false),
            Err(e) => return Err(StorageError::DeleteFailed(e.to_string())),
        }

        store
            .delete(&path)
            .await
            .map_err(|e| StorageError::DeleteFailed(e.to_string()))?;

        tracing::info!(bucket = %bucket, key = %path, "Hosted storage delete successful");
        Ok(true)
    }

    async fn exists(&self, location: &str) -> StorageResult<bool> {
        let (bucket, path) = self.parse_location(location)?;
        match self.store_for(bucket)?.head(&path).await {
            Ok(_) => Ok(true),
            Err(ObjectStoreError::NotFound { .. }) => Ok(false),
            Err(e) => Err(StorageError::BackendError(e.to_string())),
        }
    }

    async fn stat(&self, location: &str) -> StorageResult<BlobInfo> {
        let (bucket, path) = self.parse_location(location)?;
        match self.store_for(bucket)?.head(&path).await {
            Ok(meta) => Ok(self.info_from_meta(bucket, meta)),
            Err(ObjectStoreError::NotFound { .. }) => {
                Err(StorageError::NotFound(location.to_string()))
            }
            Err(e) => Err(StorageError::BackendError(e.to_string())),
        }
    }

    async fn list(&self) -> StorageResult<Vec<BlobInfo>> {
        let mut blobs = Vec::new();

        for category in FileCategory::ALL {
            let bucket = self.config.bucket_for(category);
            let store = self.store_for(bucket)?;
            let prefix = Path::from(category.dir_name());

            let mut stream = store.list(Some(&prefix));
            while let Some(item) = stream.next().await {
                let meta = item.map_err(|e| StorageError::BackendError(e.to_string()))?;
                blobs.push(self.info_from_meta(bucket, meta));
            }
        }

        blobs.sort_by(|a, b| a.location.cmp(&b.location));
        Ok(blobs)
    }

    async fn ensure_layout(&self) -> StorageResult<()> {
        // Buckets are provisioned out of band and key prefixes need no creation.
        self.check_reachable().await
    }

    async fn check_reachable(&self) -> StorageResult<()> {
        for (bucket, store) in &self.stores {
            let mut stream = store.list(None);
            if let Some(Err(e)) = stream.next().await {
                return Err(StorageError::ConfigError(format!(
                    "Bucket {} is not reachable: {}",
                    bucket, e
                )));
            }
        }
        Ok(())
    }

    fn public_url(&self, location: &str) -> String {
        format!("{}/{}", self.public_url, location.trim_start_matches('/'))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Hosted
    }
}
