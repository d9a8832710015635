//! Test helpers: build the router over in-memory metadata and a temp-dir
//! blob store.
//!
//! Run from workspace root: `cargo test -p filedock-api`.

#![allow(dead_code)]

pub mod fixtures;

use axum_test::TestServer;
use filedock_api::setup::{routes, services};
use filedock_api::state::AppState;
use filedock_core::{
    Config, FiledockConfig, HostedStorageConfig, NamingStrategy, PolicyConfig, StorageBackend,
};
use filedock_db::InMemoryRepository;
use filedock_storage::{BlobStore, LocalBlobStore};
use std::sync::Arc;
use tempfile::TempDir;

/// Test application: server plus owned resources.
pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub repo: InMemoryRepository,
    pub storage: Arc<LocalBlobStore>,
    pub _temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// Locations of every blob currently stored.
    pub async fn blob_locations(&self) -> Vec<String> {
        self.storage
            .list()
            .await
            .expect("list blobs")
            .into_iter()
            .map(|b| b.location)
            .collect()
    }
}

pub fn create_test_config(storage_root: &str) -> Config {
    create_test_config_with_policy(storage_root, PolicyConfig::default())
}

pub fn create_test_config_with_policy(storage_root: &str, policy: PolicyConfig) -> Config {
    Config(Box::new(FiledockConfig {
        environment: "test".to_string(),
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        database_url: "postgres://unused/filedock".to_string(),
        db_max_connections: 1,
        db_timeout_seconds: 5,
        storage_backend: StorageBackend::Local,
        local_storage_path: storage_root.to_string(),
        hosted: HostedStorageConfig::default(),
        policy,
        naming_strategy: NamingStrategy::Uuid,
        thumbnail_width: 300,
        thumbnail_height: 300,
        thumbnail_quality: 80,
        storage_timeout_secs: 5,
        database_timeout_secs: 5,
        orphan_sweep_interval_secs: 0,
        orphan_sweep_min_age_secs: 0,
        log_format: "pretty".to_string(),
        cors_origins: vec!["*".to_string()],
        http_concurrency_limit: 10_000,
    }))
}

/// Setup test app with in-memory metadata and local storage.
pub async fn setup_test_app() -> TestApp {
    setup_test_app_with_policy(PolicyConfig::default()).await
}

/// Same as [`setup_test_app`] with the upload policy replaced; the request
/// body limit follows the policy's largest ceiling.
pub async fn setup_test_app_with_policy(policy: PolicyConfig) -> TestApp {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let storage_root = temp_dir.path().to_string_lossy().to_string();

    let storage = Arc::new(
        LocalBlobStore::new(temp_dir.path())
            .await
            .expect("Failed to create local storage"),
    );
    let repo = InMemoryRepository::new();
    let config = create_test_config_with_policy(&storage_root, policy);

    let state = services::build_state(
        &config,
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
        storage.clone(),
        None,
    );
    let router = routes::setup_routes(&config, state.clone()).expect("Failed to build routes");
    let server = TestServer::new(router).expect("Failed to start test server");

    TestApp {
        server,
        state,
        repo,
        storage,
        _temp_dir: temp_dir,
    }
}
