//! Filedock Core Library
//!
//! Domain models, the error taxonomy, configuration and small presentation
//! helpers shared by every filedock crate.

pub mod config;
pub mod error;
pub mod format;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::{Config, FiledockConfig, HostedStorageConfig, NamingStrategy, PolicyConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use format::{format_file_size, resolve_public_url};
pub use models::{FileCategory, FileRecord, NewFileRecord, NewUser, Uploader, User};
pub use storage_types::StorageBackend;
