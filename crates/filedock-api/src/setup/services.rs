//! Service wiring

use crate::setup::routes::request_body_limit;
use crate::state::AppState;
use anyhow::Result;
use filedock_core::Config;
use filedock_db::{FileRepository, PgFileRepository, PgUserRepository, UserRepository};
use filedock_processing::{
    FileValidator, ImageDeriver, NameGenerator, ThumbnailDeriver, ThumbnailSpec, UploadPolicy,
};
use filedock_services::{IngestService, IngestSettings, OrphanSweepService};
use filedock_storage::BlobStore;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

/// Wire Postgres repositories and the blob store into the application state,
/// starting the periodic orphan sweep when configured.
pub fn initialize_services(
    config: &Config,
    pool: PgPool,
    storage: Arc<dyn BlobStore>,
) -> Result<Arc<AppState>> {
    let files: Arc<dyn FileRepository> = Arc::new(PgFileRepository::new(pool.clone()));
    let users: Arc<dyn UserRepository> = Arc::new(PgUserRepository::new(pool.clone()));

    let state = build_state(config, files, users, storage, Some(pool));

    let interval_secs = config.orphan_sweep_interval_secs();
    if interval_secs > 0 {
        let sweeper = Arc::new(OrphanSweepService::new(
            state.ingest.clone(),
            Duration::from_secs(interval_secs),
        ));
        let _handle = sweeper.start();
        tracing::info!(interval_secs, "Periodic orphan sweep started");
    } else {
        tracing::info!("Periodic orphan sweep disabled; on-demand sweep only");
    }

    Ok(state)
}

/// Assemble the state from already-built collaborators.
pub fn build_state(
    config: &Config,
    files: Arc<dyn FileRepository>,
    users: Arc<dyn UserRepository>,
    storage: Arc<dyn BlobStore>,
    pool: Option<PgPool>,
) -> Arc<AppState> {
    let (width, height) = config.thumbnail_box();
    let deriver: Arc<dyn ImageDeriver> = Arc::new(ThumbnailDeriver::new(
        ThumbnailSpec::cover(width, height).with_quality(config.thumbnail_quality()),
    ));

    let ingest = IngestService::new(
        storage.clone(),
        files,
        FileValidator::new(UploadPolicy::from_config(config.policy())),
        NameGenerator::new(config.naming_strategy()),
        deriver,
        IngestSettings::from_config(config),
    );

    Arc::new(AppState {
        ingest: Arc::new(ingest),
        users,
        storage,
        pool,
        body_limit: request_body_limit(config),
    })
}
