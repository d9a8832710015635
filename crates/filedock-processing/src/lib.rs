//! Filedock Processing Library
//!
//! The pure building blocks of the ingestion pipeline: classification,
//! policy validation, stored-name generation and image derivation.

pub mod classifier;
#[cfg(feature = "image")]
pub mod image;
pub mod naming;
pub mod validator;

pub use classifier::{classify, normalize_mime_type};
#[cfg(feature = "image")]
pub use image::{DerivationError, DerivedImage, Fit, ImageDeriver, ThumbnailDeriver, ThumbnailSpec};
pub use naming::{extension_of, NameGenerator};
pub use validator::{FileValidator, UploadPolicy, ValidationError};
