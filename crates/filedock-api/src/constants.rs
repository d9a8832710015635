//! Shared route constants.

/// Prefix for every JSON API route.
pub const API_PREFIX: &str = "/api";

/// Path the local backend's blobs are served under; matches the first
/// segment of every local location.
pub const UPLOADS_PATH: &str = "/uploads";

/// Allowance for multipart framing on top of the largest file ceiling.
pub const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;
