//! Storage setup and initialization

use anyhow::Result;
use filedock_core::Config;
use filedock_storage::{create_blob_store, BlobStore};
use std::sync::Arc;

/// Build the configured blob store and prepare its scope layout.
pub async fn setup_storage(config: &Config) -> Result<Arc<dyn BlobStore>> {
    tracing::info!("Initializing blob store...");
    let storage = create_blob_store(config).await?;

    // Writes create missing scopes on their own; this only surfaces problems early.
    if let Err(e) = storage.ensure_layout().await {
        tracing::warn!(error = %e, "Blob store layout check failed");
    }

    tracing::info!(
        backend = %storage.backend_type(),
        "Blob store initialized successfully"
    );

    Ok(storage)
}
