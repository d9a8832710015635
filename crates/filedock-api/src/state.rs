//! Application state shared by every handler.

use filedock_db::UserRepository;
use filedock_services::IngestService;
use filedock_storage::BlobStore;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub ingest: Arc<IngestService>,
    pub users: Arc<dyn UserRepository>,
    pub storage: Arc<dyn BlobStore>,
    /// Absent when the repositories are not Postgres-backed (tests).
    pub pool: Option<PgPool>,
    /// Request body ceiling applied by the router; uploads cut off here are
    /// reported as oversized.
    pub body_limit: usize,
}
