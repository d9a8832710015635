//! Route configuration and setup

use crate::constants::{API_PREFIX, MULTIPART_OVERHEAD_BYTES, UPLOADS_PATH};
use crate::error::expose_error_details;
use crate::handlers;
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    middleware,
    routing::{delete, get, post},
    Json, Router,
};
use filedock_core::{Config, StorageBackend};
use std::path::Path;
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config)?;

    let body_limit = request_body_limit(config);
    let http_concurrency_limit = config.http_concurrency_limit();
    tracing::info!(
        http_concurrency_limit,
        body_limit,
        "HTTP limits configured"
    );

    let mut api = api_routes().with_state(state);
    if !config.is_production() {
        api = api.layer(middleware::map_response(expose_error_details));
    }

    let mut app = api
        .route(
            "/api/openapi.json",
            get(|| async { Json(crate::api_doc::get_openapi_spec()) }),
        )
        .merge(utoipa_rapidoc::RapiDoc::new("/api/openapi.json").path("/docs"));

    if config.storage_backend() == StorageBackend::Local {
        let uploads_dir = Path::new(config.local_storage_path()).join("uploads");
        tracing::info!(dir = %uploads_dir.display(), "Serving local uploads at {}", UPLOADS_PATH);
        app = app.nest_service(UPLOADS_PATH, ServeDir::new(uploads_dir));
    }

    let app = app
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(ConcurrencyLimitLayer::new(http_concurrency_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    Ok(app)
}

/// Bodies up to the largest per-category ceiling reach the validator, which
/// then applies the category's own limit. Extraction stops at this size.
pub fn request_body_limit(config: &Config) -> usize {
    usize::try_from(config.policy().largest_ceiling())
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD_BYTES)
}

/// JSON API routes, before state is applied.
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &format!("{}/files", API_PREFIX),
            get(handlers::files::list_files)
                .post(handlers::files::upload_file)
                .delete(handlers::files::delete_file_by_query),
        )
        .route(
            &format!("{}/files/{{id}}", API_PREFIX),
            delete(handlers::files::delete_file),
        )
        .route(
            &format!("{}/users", API_PREFIX),
            get(handlers::users::list_users).post(handlers::users::create_user),
        )
        .route(
            &format!("{}/users/{{id}}", API_PREFIX),
            get(handlers::users::get_user),
        )
        .route(
            &format!("{}/admin/orphans/sweep", API_PREFIX),
            post(handlers::admin::sweep_orphans),
        )
        .route("/health", get(handlers::health::health_check))
}

/// Setup CORS configuration
fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let methods = [Method::GET, Method::POST, Method::DELETE, Method::OPTIONS];

    let cors = if config.cors_origins().iter().any(|o| o == "*") {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any)
    } else {
        let origins = config
            .cors_origins()
            .iter()
            .map(|o| o.parse::<HeaderValue>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!("Invalid CORS origin: {}", e))?;

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(Any)
    };
    Ok(cors)
}
