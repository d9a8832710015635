use crate::error::{ErrorResponse, HttpAppError};
use crate::responses::SweepResponse;
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use std::sync::Arc;

/// Delete blobs no file record references.
#[utoipa::path(
    post,
    path = "/api/admin/orphans/sweep",
    tag = "admin",
    responses(
        (status = 200, description = "Sweep finished", body = SweepResponse),
        (status = 503, description = "Storage unavailable", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(operation = "sweep_orphans"))]
pub async fn sweep_orphans(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    let removed = state.ingest.sweep_orphans().await?;
    Ok(Json(SweepResponse { removed }))
}
