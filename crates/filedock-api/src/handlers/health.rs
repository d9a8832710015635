//! Health check

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use filedock_storage::BlobStore;
use serde::Serialize;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use utoipa::ToSchema;

const CHECK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthCheckResponse {
    pub status: String,
    pub database: String,
    pub storage: String,
}

/// Run an async check with timeout; "healthy", "timeout", or "unhealthy".
/// Failures are logged, never echoed to the caller.
async fn run_check<F, T, E>(f: F, dependency: &str) -> String
where
    F: Future<Output = Result<T, E>>,
    E: Display,
{
    match tokio::time::timeout(CHECK_TIMEOUT, f).await {
        Ok(Ok(_)) => "healthy".to_string(),
        Ok(Err(e)) => {
            tracing::warn!(dependency = %dependency, error = %e, "Health check failed");
            "unhealthy".to_string()
        }
        Err(_) => {
            tracing::warn!(dependency = %dependency, "Health check timed out");
            "timeout".to_string()
        }
    }
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "All dependencies reachable", body = HealthCheckResponse),
        (status = 503, description = "A dependency is unhealthy", body = HealthCheckResponse)
    )
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let database = match &state.pool {
        Some(pool) => run_check(sqlx::query("SELECT 1").execute(pool), "database").await,
        None => "not_configured".to_string(),
    };
    let storage = run_check(state.storage.check_reachable(), "storage").await;

    let healthy = matches!(database.as_str(), "healthy" | "not_configured") && storage == "healthy";

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(HealthCheckResponse {
            status: if healthy { "healthy" } else { "unhealthy" }.to_string(),
            database,
            storage,
        }),
    )
}
