//! Filedock Services Layer
//!
//! The Ingestion Orchestrator: composes validation, classification, naming,
//! blob storage, image derivation and the metadata repository into the
//! upload, delete and orphan-sweep flows, and owns failure compensation.
//! HTTP handling stays in filedock-api.

pub mod cleanup;
pub mod ingest;

pub use cleanup::OrphanSweepService;
pub use ingest::{IngestService, IngestSettings, UploadRequest};
