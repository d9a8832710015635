use async_trait::async_trait;
use bytes::Bytes;
use filedock_core::AppError;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageReader};
use std::io::Cursor;

#[derive(Debug, thiserror::Error)]
pub enum DerivationError {
    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Failed to encode thumbnail: {0}")]
    Encode(String),

    #[error("Derivation task failed: {0}")]
    Task(String),
}

impl From<DerivationError> for AppError {
    fn from(err: DerivationError) -> Self {
        AppError::DerivationFailed(err.to_string())
    }
}

/// How the source is fitted into the thumbnail box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fit {
    /// Fill the box exactly, scaling as needed and cropping the centered overflow.
    Cover,
    /// Shrink to fit inside the box keeping aspect ratio; never enlarges.
    Inside,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThumbnailSpec {
    pub width: u32,
    pub height: u32,
    pub fit: Fit,
    /// JPEG quality, 1-100
    pub quality: u8,
}

impl ThumbnailSpec {
    pub const SMALL: ThumbnailSpec = ThumbnailSpec::cover(150, 150);
    pub const MEDIUM: ThumbnailSpec = ThumbnailSpec::cover(300, 300);
    pub const LARGE: ThumbnailSpec = ThumbnailSpec::cover(800, 600);

    pub const fn cover(width: u32, height: u32) -> Self {
        ThumbnailSpec {
            width,
            height,
            fit: Fit::Cover,
            quality: 80,
        }
    }

    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality.clamp(1, 100);
        self
    }

    pub fn with_fit(mut self, fit: Fit) -> Self {
        self.fit = fit;
        self
    }
}

impl Default for ThumbnailSpec {
    fn default() -> Self {
        ThumbnailSpec::MEDIUM
    }
}

/// Output of a successful derivation.
#[derive(Debug, Clone)]
pub struct DerivedImage {
    /// JPEG-encoded thumbnail
    pub thumbnail: Bytes,
    /// Intrinsic width of the source image
    pub width: u32,
    /// Intrinsic height of the source image
    pub height: u32,
}

#[async_trait]
pub trait ImageDeriver: Send + Sync {
    /// Produce a thumbnail of `source` and report the source's dimensions.
    async fn derive(&self, source: Bytes) -> Result<DerivedImage, DerivationError>;
}

/// [`ImageDeriver`] backed by the `image` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThumbnailDeriver {
    spec: ThumbnailSpec,
}

impl ThumbnailDeriver {
    pub fn new(spec: ThumbnailSpec) -> Self {
        Self { spec }
    }

    pub fn spec(&self) -> ThumbnailSpec {
        self.spec
    }

    /// Synchronous core of [`ImageDeriver::derive`]; CPU bound.
    pub fn derive_blocking(
        spec: ThumbnailSpec,
        source: &[u8],
    ) -> Result<DerivedImage, DerivationError> {
        let img = ImageReader::new(Cursor::new(source))
            .with_guessed_format()
            .map_err(|e| DerivationError::Decode(e.to_string()))?
            .decode()
            .map_err(|e| DerivationError::Decode(e.to_string()))?;

        let (width, height) = img.dimensions();
        let resized = Self::fit(&img, spec);

        let rgb = DynamicImage::ImageRgb8(resized.to_rgb8());
        let mut buffer = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut buffer, spec.quality);
        rgb.write_with_encoder(encoder)
            .map_err(|e| DerivationError::Encode(e.to_string()))?;

        Ok(DerivedImage {
            thumbnail: Bytes::from(buffer),
            width,
            height,
        })
    }

    fn fit(img: &DynamicImage, spec: ThumbnailSpec) -> DynamicImage {
        let (width, height) = img.dimensions();
        match spec.fit {
            Fit::Cover => {
                if (width, height) == (spec.width, spec.height) {
                    img.clone()
                } else {
                    img.resize_to_fill(spec.width, spec.height, FilterType::Lanczos3)
                }
            }
            Fit::Inside => {
                if width <= spec.width && height <= spec.height {
                    img.clone()
                } else {
                    img.resize(spec.width, spec.height, FilterType::Lanczos3)
                }
            }
        }
    }
}

#[async_trait]
impl ImageDeriver for ThumbnailDeriver {
    async fn derive(&self, source: Bytes) -> Result<DerivedImage, DerivationError> {
        let spec = self.spec;
        let start = std::time::Instant::now();

        let derived = tokio::task::spawn_blocking(move || Self::derive_blocking(spec, &source))
            .await
            .map_err(|e| DerivationError::Task(e.to_string()))??;

        tracing::debug!(
            width = derived.width,
            height = derived.height,
            thumbnail_bytes = derived.thumbnail.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Thumbnail derived"
        );

        Ok(derived)
    }
}
