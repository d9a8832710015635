use async_trait::async_trait;
use bytes::Bytes;
use filedock_core::{
    format_file_size, AppError, FileCategory, FileRecord, HostedStorageConfig, NewFileRecord,
    StorageBackend,
};
use filedock_db::{FileRepository, InMemoryRepository};
use filedock_processing::{
    DerivationError, DerivedImage, FileValidator, ImageDeriver, NameGenerator, ThumbnailDeriver,
    ThumbnailSpec, UploadPolicy,
};
use filedock_services::{IngestService, IngestSettings, UploadRequest};
use filedock_storage::{
    thumbnail_name, BlobInfo, BlobKind, BlobStore, HostedBlobStore, LocalBlobStore, Scope,
    StorageError, StorageResult,
};
use object_store::memory::InMemory;
use object_store::ObjectStore;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use uuid::Uuid;

const MB: usize = 1024 * 1024;

/// Repository whose writes always fail.
struct FailingRepository;

#[async_trait]
impl FileRepository for FailingRepository {
    async fn create(&self, _new: NewFileRecord) -> Result<FileRecord, AppError> {
        Err(AppError::Internal("connection refused".to_string()))
    }

    async fn find_by_id(&self, _id: Uuid) -> Result<Option<FileRecord>, AppError> {
        Ok(None)
    }

    async fn delete(&self, _id: Uuid) -> Result<bool, AppError> {
        Ok(false)
    }

    async fn list(&self) -> Result<Vec<FileRecord>, AppError> {
        Ok(Vec::new())
    }

    async fn referenced_locations(&self) -> Result<HashSet<String>, AppError> {
        Ok(HashSet::new())
    }
}

/// Repository whose writes never finish in time.
struct StalledRepository;

#[async_trait]
impl FileRepository for StalledRepository {
    async fn create(&self, _new: NewFileRecord) -> Result<FileRecord, AppError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Err(AppError::Internal("unreachable".to_string()))
    }

    async fn find_by_id(&self, _id: Uuid) -> Result<Option<FileRecord>, AppError> {
        Ok(None)
    }

    async fn delete(&self, _id: Uuid) -> Result<bool, AppError> {
        Ok(false)
    }

    async fn list(&self) -> Result<Vec<FileRecord>, AppError> {
        Ok(Vec::new())
    }

    async fn referenced_locations(&self) -> Result<HashSet<String>, AppError> {
        Ok(HashSet::new())
    }
}

struct FailingDeriver;

#[async_trait]
impl ImageDeriver for FailingDeriver {
    async fn derive(&self, _source: Bytes) -> Result<DerivedImage, DerivationError> {
        Err(DerivationError::Decode("unsupported codec".to_string()))
    }
}

/// Local store whose writes can be made to fail: thumbnail-scope writes
/// always, or the first `collisions` writes with `AlreadyExists`.
struct FlakyStore {
    inner: Arc<LocalBlobStore>,
    fail_thumbnails: bool,
    collisions: usize,
    writes: AtomicUsize,
}

impl FlakyStore {
    fn failing_thumbnails(inner: Arc<LocalBlobStore>) -> Self {
        FlakyStore {
            inner,
            fail_thumbnails: true,
            collisions: 0,
            writes: AtomicUsize::new(0),
        }
    }

    fn colliding(inner: Arc<LocalBlobStore>, collisions: usize) -> Self {
        FlakyStore {
            inner,
            fail_thumbnails: false,
            collisions,
            writes: AtomicUsize::new(0),
        }
    }

    fn write_attempts(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlobStore for FlakyStore {
    async fn write(&self, scope: &Scope, stored_name: &str, data: Bytes) -> StorageResult<String> {
        let attempt = self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_thumbnails && scope.kind == BlobKind::Thumbnail {
            return Err(StorageError::UploadFailed("disk full".to_string()));
        }
        if attempt < self.collisions {
            return Err(StorageError::AlreadyExists(stored_name.to_string()));
        }
        self.inner.write(scope, stored_name, data).await
    }

    async fn read(&self, location: &str) -> StorageResult<Bytes> {
        self.inner.read(location).await
    }

    async fn delete(&self, location: &str) -> StorageResult<bool> {
        self.inner.delete(location).await
    }

    async fn exists(&self, location: &str) -> StorageResult<bool> {
        self.inner.exists(location).await
    }

    async fn stat(&self, location: &str) -> StorageResult<BlobInfo> {
        self.inner.stat(location).await
    }

    async fn list(&self) -> StorageResult<Vec<BlobInfo>> {
        self.inner.list().await
    }

    async fn ensure_layout(&self) -> StorageResult<()> {
        self.inner.ensure_layout().await
    }

    async fn check_reachable(&self) -> StorageResult<()> {
        self.inner.check_reachable().await
    }

    fn public_url(&self, location: &str) -> String {
        self.inner.public_url(location)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

fn test_settings() -> IngestSettings {
    IngestSettings {
        storage_timeout: Duration::from_secs(5),
        database_timeout: Duration::from_millis(200),
        orphan_min_age: Duration::ZERO,
    }
}

fn service_over(storage: Arc<dyn BlobStore>, repo: &InMemoryRepository) -> IngestService {
    IngestService::new(
        storage,
        Arc::new(repo.clone()),
        FileValidator::new(UploadPolicy::default()),
        NameGenerator::default(),
        Arc::new(default_deriver()),
        test_settings(),
    )
}

struct Harness {
    _dir: TempDir,
    storage: Arc<LocalBlobStore>,
    repo: InMemoryRepository,
}

impl Harness {
    async fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let storage = Arc::new(LocalBlobStore::new(dir.path()).await.unwrap());
        Harness {
            _dir: dir,
            storage,
            repo: InMemoryRepository::new(),
        }
    }

    fn service(&self) -> IngestService {
        self.service_with(Arc::new(self.repo.clone()), Arc::new(default_deriver()))
    }

    fn service_with(
        &self,
        files: Arc<dyn FileRepository>,
        deriver: Arc<dyn ImageDeriver>,
    ) -> IngestService {
        IngestService::new(
            self.storage.clone(),
            files,
            FileValidator::new(UploadPolicy::default()),
            NameGenerator::default(),
            deriver,
            test_settings(),
        )
    }

    async fn blob_locations(&self) -> Vec<String> {
        self.storage
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.location)
            .collect()
    }
}

fn default_deriver() -> ThumbnailDeriver {
    ThumbnailDeriver::new(ThumbnailSpec::MEDIUM)
}

/// Encode a solid-color JPEG and pad it with a comment segment to exactly
/// `total_len` bytes.
fn jpeg_fixture(width: u32, height: u32, total_len: usize) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 80, 40]));
    let mut encoded = Vec::new();
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut encoded, 90);
    image::DynamicImage::ImageRgb8(img)
        .write_with_encoder(encoder)
        .unwrap();

    assert!(encoded.len() + 4 <= total_len, "fixture too small to pad");
    let padding = total_len - encoded.len() - 4;

    let mut out = Vec::with_capacity(total_len);
    out.extend_from_slice(&encoded[..2]);
    out.extend_from_slice(&[0xFF, 0xFE]);
    out.extend_from_slice(&((padding + 2) as u16).to_be_bytes());
    out.extend(std::iter::repeat(b'x').take(padding));
    out.extend_from_slice(&encoded[2..]);
    assert_eq!(out.len(), total_len);
    out
}

fn image_request(data: Vec<u8>) -> UploadRequest {
    UploadRequest {
        data: Bytes::from(data),
        original_name: "photo.jpg".to_string(),
        mime_type: "image/jpeg".to_string(),
        category: Some(FileCategory::Image),
        uploaded_by: None,
    }
}

fn document_request() -> UploadRequest {
    UploadRequest {
        data: Bytes::from_static(b"%PDF-1.4 minimal"),
        original_name: "report.pdf".to_string(),
        mime_type: "application/pdf".to_string(),
        category: None,
        uploaded_by: None,
    }
}

#[tokio::test]
async fn test_image_upload_records_dimensions_and_thumbnail() {
    let harness = Harness::new().await;
    let service = harness.service();

    let record = service
        .upload(image_request(jpeg_fixture(200, 100, 12288)))
        .await
        .unwrap();

    assert_eq!(record.category, FileCategory::Image);
    assert_eq!(record.width, Some(200));
    assert_eq!(record.height, Some(100));
    assert_eq!(record.size_bytes, 12288);
    assert_eq!(format_file_size(record.size_bytes), "12 KB");
    assert!(record.stored_name.ends_with(".jpg"));

    let thumbnail_path = record.thumbnail_path.clone().unwrap();
    assert!(thumbnail_path.ends_with(&thumbnail_name(&record.stored_name)));

    let thumb = harness.storage.read(&thumbnail_path).await.unwrap();
    let decoded = image::load_from_memory(&thumb).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (300, 300));
}

#[tokio::test]
async fn test_mismatched_override_rejected_before_any_write() {
    let harness = Harness::new().await;
    let service = harness.service();

    let request = UploadRequest {
        data: Bytes::from(vec![0u8; 60 * MB]),
        original_name: "clip.mp4".to_string(),
        mime_type: "video/mp4".to_string(),
        category: Some(FileCategory::Image),
        uploaded_by: None,
    };

    let result = service.upload(request).await;
    assert!(matches!(result, Err(AppError::UnsupportedType { .. })));
    assert!(harness.blob_locations().await.is_empty());
    assert_eq!(harness.repo.file_count().await, 0);
}

#[tokio::test]
async fn test_oversized_file_rejected() {
    let harness = Harness::new().await;
    let service = harness.service();

    let request = UploadRequest {
        data: Bytes::from(vec![0u8; 11 * MB]),
        original_name: "big.png".to_string(),
        mime_type: "image/png".to_string(),
        category: None,
        uploaded_by: None,
    };

    let result = service.upload(request).await;
    assert!(matches!(result, Err(AppError::OversizedFile { .. })));
    assert!(harness.blob_locations().await.is_empty());
}

#[tokio::test]
async fn test_metadata_failure_removes_all_blobs() {
    let harness = Harness::new().await;
    let service = harness.service_with(Arc::new(FailingRepository), Arc::new(default_deriver()));

    let result = service
        .upload(image_request(jpeg_fixture(64, 64, 4096)))
        .await;

    assert!(matches!(result, Err(AppError::MetadataWriteFailed(_))));
    assert!(harness.blob_locations().await.is_empty());
}

#[tokio::test]
async fn test_metadata_timeout_removes_all_blobs() {
    let harness = Harness::new().await;
    let service = harness.service_with(Arc::new(StalledRepository), Arc::new(default_deriver()));

    let result = service.upload(document_request()).await;

    assert!(matches!(result, Err(AppError::MetadataWriteFailed(_))));
    assert!(harness.blob_locations().await.is_empty());
}

#[tokio::test]
async fn test_unknown_uploader_is_compensated_and_passed_through() {
    let harness = Harness::new().await;
    let service = harness.service();

    let mut request = document_request();
    request.uploaded_by = Some(Uuid::new_v4());

    let result = service.upload(request).await;
    assert!(matches!(result, Err(AppError::InvalidInput(_))));
    assert!(harness.blob_locations().await.is_empty());
}

#[tokio::test]
async fn test_derivation_failure_is_not_fatal() {
    let harness = Harness::new().await;
    let service = harness.service_with(Arc::new(harness.repo.clone()), Arc::new(FailingDeriver));

    let record = service
        .upload(image_request(jpeg_fixture(64, 64, 4096)))
        .await
        .unwrap();

    assert!(record.thumbnail_path.is_none());
    assert!(record.width.is_none());
    assert!(record.height.is_none());
    assert_eq!(harness.blob_locations().await, vec![record.storage_path]);
}

#[tokio::test]
async fn test_non_image_upload_is_classified() {
    let harness = Harness::new().await;
    let service = harness.service();

    let record = service.upload(document_request()).await.unwrap();

    assert_eq!(record.category, FileCategory::Document);
    assert!(record.storage_path.starts_with("uploads/document/original/"));
    assert!(record.thumbnail_path.is_none());
    assert!(record.width.is_none());
}

#[tokio::test]
async fn test_delete_image_removes_original_and_thumbnail() {
    let harness = Harness::new().await;
    let service = harness.service();

    let record = service
        .upload(image_request(jpeg_fixture(64, 64, 4096)))
        .await
        .unwrap();
    assert_eq!(harness.blob_locations().await.len(), 2);

    service.delete_file(record.id).await.unwrap();

    assert!(harness.blob_locations().await.is_empty());
    assert_eq!(harness.repo.file_count().await, 0);
}

#[tokio::test]
async fn test_delete_non_image_touches_only_original() {
    let harness = Harness::new().await;
    let service = harness.service();

    let record = service.upload(document_request()).await.unwrap();

    // A blob that happens to sit where a thumbnail would be.
    let lookalike = harness
        .storage
        .write(
            &Scope::thumbnails(FileCategory::Document),
            &thumbnail_name(&record.stored_name),
            Bytes::from_static(b"unrelated"),
        )
        .await
        .unwrap();

    assert!(service.delete_artifacts(&record).await.unwrap());
    assert_eq!(harness.blob_locations().await, vec![lookalike]);
}

#[tokio::test]
async fn test_delete_artifacts_is_idempotent() {
    let harness = Harness::new().await;
    let service = harness.service();

    let record = service.upload(document_request()).await.unwrap();

    assert!(service.delete_artifacts(&record).await.unwrap());
    assert!(!service.delete_artifacts(&record).await.unwrap());
}

#[tokio::test]
async fn test_delete_unknown_file_is_not_found() {
    let harness = Harness::new().await;
    let service = harness.service();

    let result = service.delete_file(Uuid::new_v4()).await;
    assert!(matches!(result, Err(AppError::RecordNotFound(_))));
}

#[tokio::test]
async fn test_sweep_removes_only_unreferenced_blobs() {
    let harness = Harness::new().await;
    let service = harness.service();

    let kept = service
        .upload(image_request(jpeg_fixture(64, 64, 4096)))
        .await
        .unwrap();
    harness
        .storage
        .write(
            &Scope::original(FileCategory::Other),
            "stray.bin",
            Bytes::from_static(b"orphan"),
        )
        .await
        .unwrap();

    let removed = service.sweep_orphans().await.unwrap();
    assert_eq!(removed, 1);

    let mut remaining = harness.blob_locations().await;
    remaining.sort();
    let mut expected: Vec<String> = kept.locations().map(str::to_string).collect();
    expected.sort();
    assert_eq!(remaining, expected);
}

#[tokio::test]
async fn test_sweep_skips_recent_blobs() {
    let harness = Harness::new().await;
    let service = IngestService::new(
        harness.storage.clone(),
        Arc::new(harness.repo.clone()),
        FileValidator::new(UploadPolicy::default()),
        NameGenerator::default(),
        Arc::new(default_deriver()),
        IngestSettings {
            orphan_min_age: Duration::from_secs(3600),
            ..IngestSettings::default()
        },
    );

    harness
        .storage
        .write(
            &Scope::original(FileCategory::Other),
            "fresh.bin",
            Bytes::from_static(b"in flight"),
        )
        .await
        .unwrap();

    assert_eq!(service.sweep_orphans().await.unwrap(), 0);
    assert_eq!(harness.blob_locations().await.len(), 1);
}

#[tokio::test]
async fn test_list_files_newest_first() {
    let harness = Harness::new().await;
    let service = harness.service();

    let first = service.upload(document_request()).await.unwrap();
    let second = service.upload(document_request()).await.unwrap();

    let ids: Vec<Uuid> = service
        .list_files()
        .await
        .unwrap()
        .into_iter()
        .map(|f| f.id)
        .collect();
    assert_eq!(ids, vec![second.id, first.id]);
}

#[tokio::test]
async fn test_thumbnail_write_failure_rolls_back_original() {
    let harness = Harness::new().await;
    let storage = Arc::new(FlakyStore::failing_thumbnails(harness.storage.clone()));
    let service = service_over(storage, &harness.repo);

    let result = service
        .upload(image_request(jpeg_fixture(64, 64, 4096)))
        .await;

    assert!(matches!(result, Err(AppError::StorageUnavailable(_))));
    assert!(harness.blob_locations().await.is_empty());
    assert_eq!(harness.repo.file_count().await, 0);
}

#[tokio::test]
async fn test_name_collision_regenerates_stored_name() {
    let harness = Harness::new().await;
    let storage = Arc::new(FlakyStore::colliding(harness.storage.clone(), 2));
    let service = service_over(storage.clone(), &harness.repo);

    let record = service.upload(document_request()).await.unwrap();

    assert_eq!(storage.write_attempts(), 3);
    assert_eq!(harness.blob_locations().await, vec![record.storage_path]);
}

#[tokio::test]
async fn test_persistent_collision_gives_up_after_three_attempts() {
    let harness = Harness::new().await;
    let storage = Arc::new(FlakyStore::colliding(harness.storage.clone(), usize::MAX));
    let service = service_over(storage.clone(), &harness.repo);

    let result = service.upload(document_request()).await;

    assert!(matches!(result, Err(AppError::StorageUnavailable(_))));
    assert_eq!(storage.write_attempts(), 3);
    assert!(harness.blob_locations().await.is_empty());
    assert_eq!(harness.repo.file_count().await, 0);
}

fn shared_buckets(config: &HostedStorageConfig) -> HashMap<String, Arc<dyn ObjectStore>> {
    let mut stores: HashMap<String, Arc<dyn ObjectStore>> = HashMap::new();
    for category in FileCategory::ALL {
        stores
            .entry(config.bucket_for(category).to_string())
            .or_insert_with(|| Arc::new(InMemory::new()));
    }
    stores
}

#[tokio::test]
async fn test_hosted_sweep_keeps_live_blobs_after_public_url_change() {
    let config = HostedStorageConfig::default();
    let buckets = shared_buckets(&config);
    let repo = InMemoryRepository::new();

    let before = Arc::new(HostedBlobStore::with_stores(
        config.clone(),
        "https://old-cdn.example.com",
        buckets.clone(),
    ));
    let record = service_over(before, &repo)
        .upload(document_request())
        .await
        .unwrap();
    assert!(!record.storage_path.starts_with("https://"));

    let after: Arc<dyn BlobStore> = Arc::new(HostedBlobStore::with_stores(
        config,
        "https://new-cdn.example.com",
        buckets,
    ));
    let removed = service_over(after.clone(), &repo).sweep_orphans().await.unwrap();

    assert_eq!(removed, 0);
    assert!(after.exists(&record.storage_path).await.unwrap());
    assert!(after
        .public_url(&record.storage_path)
        .starts_with("https://new-cdn.example.com/documents/"));
}
