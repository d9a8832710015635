//! Error types module
//!
//! Every externally visible failure of the ingestion pipeline resolves to one
//! `AppError` variant. Each variant self-describes its HTTP status, stable
//! error code and logging level through [`ErrorMetadata`].
//!
//! The `Database` variant and `From<sqlx::Error>` are gated behind the `sqlx` feature.

use std::io;

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

use crate::format::format_file_size;
use crate::models::FileCategory;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Expected errors like validation failures
    Debug,
    /// Recoverable issues
    Warn,
    /// Unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "STORAGE_UNAVAILABLE")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (never contains storage paths)
    fn client_message(&self) -> String;

    /// Whether details should be hidden from clients
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("File of {size} bytes exceeds the {max} byte limit for {category}")]
    OversizedFile {
        category: FileCategory,
        size: u64,
        max: u64,
    },

    #[error("Content type {mime_type} is not allowed for {category}")]
    UnsupportedType {
        category: FileCategory,
        mime_type: String,
    },

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Thumbnail derivation failed: {0}")]
    DerivationFailed(String),

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("Metadata write failed: {0}")]
    MetadataWriteFailed(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        if let SqlxError::Database(ref db_err) = err {
            if db_err.is_unique_violation() {
                let constraint = db_err.constraint().unwrap_or("unique constraint");
                return AppError::DuplicateKey(format!("Value violates {}", constraint));
            }
        }
        AppError::Database(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::InvalidInput(format!("UUID parsing error: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::InvalidInput(format!("Validation error: {}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
fn app_error_static_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        AppError::OversizedFile { .. } => (
            413,
            "FILE_TOO_LARGE",
            false,
            Some("Reduce file size below the category limit"),
            false,
            LogLevel::Debug,
        ),
        AppError::UnsupportedType { .. } => (
            415,
            "UNSUPPORTED_TYPE",
            false,
            Some("Upload a file type allowed for this category"),
            false,
            LogLevel::Debug,
        ),
        AppError::StorageUnavailable(_) => (
            503,
            "STORAGE_UNAVAILABLE",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::DerivationFailed(_) => (
            422,
            "DERIVATION_FAILED",
            false,
            Some("Check image format and try a different file"),
            false,
            LogLevel::Warn,
        ),
        AppError::RecordNotFound(_) => (
            404,
            "NOT_FOUND",
            false,
            Some("Verify the resource ID exists"),
            false,
            LogLevel::Debug,
        ),
        AppError::DuplicateKey(_) => (
            409,
            "DUPLICATE_KEY",
            false,
            Some("Use a different value for the unique field"),
            false,
            LogLevel::Debug,
        ),
        AppError::MetadataWriteFailed(_) => (
            500,
            "METADATA_WRITE_FAILED",
            true,
            Some("Retry the upload"),
            true,
            LogLevel::Error,
        ),
        AppError::InvalidInput(_) => (
            400,
            "INVALID_INPUT",
            false,
            Some("Check request parameters and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::Database(_) => (
            500,
            "DATABASE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &str {
        match self {
            AppError::OversizedFile { .. } => "OversizedFile",
            AppError::UnsupportedType { .. } => "UnsupportedType",
            AppError::StorageUnavailable(_) => "StorageUnavailable",
            AppError::DerivationFailed(_) => "DerivationFailed",
            AppError::RecordNotFound(_) => "RecordNotFound",
            AppError::DuplicateKey(_) => "DuplicateKey",
            AppError::MetadataWriteFailed(_) => "MetadataWriteFailed",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::Database(_) => "Database",
            AppError::Internal(_) | AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            AppError::OversizedFile {
                category,
                size,
                max,
            } => format!(
                "File size {} exceeds the {} limit for {}",
                format_file_size(*size),
                format_file_size(*max),
                category
            ),
            AppError::UnsupportedType {
                category,
                mime_type,
            } => format!("File type {} is not allowed for {}", mime_type, category),
            AppError::StorageUnavailable(_) => "Storage is temporarily unavailable".to_string(),
            AppError::DerivationFailed(_) => "Failed to process image".to_string(),
            AppError::RecordNotFound(ref msg) => msg.clone(),
            AppError::DuplicateKey(ref msg) => msg.clone(),
            AppError::MetadataWriteFailed(_) => "Failed to record file metadata".to_string(),
            AppError::InvalidInput(ref msg) => msg.clone(),
            AppError::Database(_) => "Failed to access database".to_string(),
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                "Internal server error".to_string()
            }
        }
    }
}
