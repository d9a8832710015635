//! Database repositories for data access layer
//
// File metadata records
pub mod files;
//
// Users referenced as uploaders
pub mod users;
//
// In-memory implementation for tests
#[cfg(any(test, feature = "test-utils"))]
pub mod memory;
