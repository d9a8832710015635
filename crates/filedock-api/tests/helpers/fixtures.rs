//! Payload fixtures.

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, Rgb, RgbImage};

/// A solid-color JPEG of the given size, padded with a comment segment to
/// exactly `total_len` bytes.
pub fn jpeg_of_len(width: u32, height: u32, total_len: usize) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([40, 120, 200]));
    let mut encoded = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_with_encoder(JpegEncoder::new_with_quality(&mut encoded, 90))
        .expect("encode jpeg");

    assert!(encoded.len() + 4 <= total_len, "fixture too small to pad");
    let padding = total_len - encoded.len() - 4;

    let mut out = Vec::with_capacity(total_len);
    out.extend_from_slice(&encoded[..2]);
    out.extend_from_slice(&[0xFF, 0xFE]);
    out.extend_from_slice(&((padding + 2) as u16).to_be_bytes());
    out.resize(out.len() + padding, b' ');
    out.extend_from_slice(&encoded[2..]);
    out
}

pub fn small_jpeg() -> Vec<u8> {
    jpeg_of_len(64, 48, 4096)
}
