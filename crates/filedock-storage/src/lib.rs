//! Filedock Storage Library
//!
//! Blob storage abstraction with a local-filesystem and a hosted
//! (S3-compatible) implementation.
//!
//! # Layout
//!
//! Every blob lives under a scope made of its category and kind:
//!
//! - **Local**: `{root}/uploads/{category}/{original|thumbnails}/{stored_name}`,
//!   location `uploads/{category}/{kind}/{stored_name}`
//! - **Hosted**: object `{category}/{kind}/{stored_name}` in the category's
//!   bucket, location `{bucket}/{category}/{kind}/{stored_name}`; the public
//!   URL prefixes the configured base at read time
//!
//! Stored names must not contain `/` or `..`. Layout rules are centralized in
//! the `keys` module so both backends stay consistent.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-hosted")]
pub mod hosted;
#[cfg(feature = "storage-local")]
pub mod local;
pub mod traits;

// Re-export commonly used types
pub use factory::create_blob_store;
pub use filedock_core::StorageBackend;
#[cfg(feature = "storage-hosted")]
pub use hosted::HostedBlobStore;
pub use keys::{thumbnail_location_for, thumbnail_name, BlobKind, Scope, THUMBNAIL_PREFIX};
#[cfg(feature = "storage-local")]
pub use local::LocalBlobStore;
pub use traits::{BlobInfo, BlobStore, StorageError, StorageResult};
