//! PostgreSQL pool and schema migrations

use anyhow::{Context, Result};
use filedock_core::Config;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

/// Schema for the `users` and `files` tables, embedded at build time.
static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// Open the metadata pool and bring the schema up to date.
pub async fn setup_database(config: &Config) -> Result<PgPool> {
    let pool = connect_pool(config).await?;
    apply_migrations(&pool).await?;
    Ok(pool)
}

async fn connect_pool(config: &Config) -> Result<PgPool> {
    let max_connections = config.db_max_connections();
    let acquire_timeout = Duration::from_secs(config.db_timeout_seconds());

    tracing::info!(max_connections, "Connecting to metadata database");
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(acquire_timeout)
        .idle_timeout(Duration::from_secs(600))
        .test_before_acquire(true)
        .connect(config.database_url())
        .await
        .context("Failed to connect to DATABASE_URL")?;

    Ok(pool)
}

async fn apply_migrations(pool: &PgPool) -> Result<()> {
    let pending = MIGRATOR.iter().count();
    MIGRATOR
        .run(pool)
        .await
        .context("Failed to apply metadata schema migrations")?;
    tracing::info!(migrations = pending, "Metadata schema up to date");
    Ok(())
}
