//! Filedock Database Library
//!
//! The Metadata Repository: the `FileRepository` and `UserRepository` traits,
//! their PostgreSQL implementations and, behind `test-utils`, an in-memory
//! implementation.

pub mod db;

pub use db::files::{FileRepository, PgFileRepository};
#[cfg(any(test, feature = "test-utils"))]
pub use db::memory::InMemoryRepository;
pub use db::users::{PgUserRepository, UserRepository};
