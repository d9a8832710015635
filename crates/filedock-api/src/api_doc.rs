//! OpenAPI documentation.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use crate::responses;
use filedock_core::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Filedock API",
        version = "0.1.0",
        description = "File ingestion API: validated uploads with per-category policy, local or hosted blob storage, image thumbnails, and orphan cleanup."
    ),
    paths(
        // Files
        handlers::files::upload_file,
        handlers::files::list_files,
        handlers::files::delete_file,
        handlers::files::delete_file_by_query,
        // Users
        handlers::users::create_user,
        handlers::users::list_users,
        handlers::users::get_user,
        // Admin
        handlers::admin::sweep_orphans,
        // Health
        handlers::health::health_check,
    ),
    components(schemas(
        error::ErrorResponse,
        responses::FileResponse,
        responses::DeleteResponse,
        responses::SweepResponse,
        handlers::users::CreateUserRequest,
        handlers::health::HealthCheckResponse,
        models::FileCategory,
        models::User,
        models::Uploader,
    )),
    tags(
        (name = "files", description = "Upload, list and delete files"),
        (name = "users", description = "Users referenced as uploaders"),
        (name = "admin", description = "Maintenance operations"),
        (name = "health", description = "Service health"),
    )
)]
pub struct ApiDoc;

pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
