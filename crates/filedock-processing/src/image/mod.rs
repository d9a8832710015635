//! Image derivation: thumbnails plus intrinsic dimensions.

pub mod deriver;

pub use deriver::{DerivationError, DerivedImage, Fit, ImageDeriver, ThumbnailDeriver, ThumbnailSpec};
