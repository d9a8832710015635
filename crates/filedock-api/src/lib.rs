//! Filedock API Library
//!
//! HTTP handlers, response projections and application setup. Handlers stay
//! thin; the ingestion flow lives in filedock-services.

mod api_doc;
pub mod constants;
mod handlers;
pub mod responses;
pub mod setup;
mod utils;

pub mod error;
pub mod state;

pub use error::ErrorResponse;
pub use responses::FileResponse;
