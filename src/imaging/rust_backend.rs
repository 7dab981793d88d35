//! Pure Rust codec backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Detect format | `image::guess_format` (magic bytes, not the file extension) |
//! | Decode (JPEG, PNG) | `image::load_from_memory_with_format` |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` with configured quality |
//! | Encode → PNG | `image::codecs::png::PngEncoder` (lossless, quality ignored) |
//! | Copyright | `kamadak-exif` (`Tag::Copyright` in the primary IFD) |

use super::backend::{BackendError, DecodedImage, ImageBackend};
use super::params::Quality;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;

/// Formats the pipeline reads and writes. Everything else is rejected at decode.
const SUPPORTED_FORMATS: &[ImageFormat] = &[ImageFormat::Jpeg, ImageFormat::Png];

/// Production backend built on the `image` crate.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageBackend for RustBackend {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, BackendError> {
        let format = image::guess_format(bytes).map_err(|e| BackendError::Decode(e.to_string()))?;
        if !SUPPORTED_FORMATS.contains(&format) {
            return Err(BackendError::Decode(format!(
                "unsupported input format {format:?}"
            )));
        }
        let image = image::load_from_memory_with_format(bytes, format)
            .map_err(|e| BackendError::Decode(e.to_string()))?;
        Ok(DecodedImage { image, format })
    }

    fn encode(
        &self,
        image: &DynamicImage,
        format: ImageFormat,
        quality: Quality,
    ) -> Result<Vec<u8>, BackendError> {
        let mut buf = Cursor::new(Vec::new());
        let result = match format {
            ImageFormat::Jpeg => {
                image.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality.value()))
            }
            ImageFormat::Png => image.write_with_encoder(PngEncoder::new(&mut buf)),
            other => return Err(BackendError::UnsupportedFormat(other)),
        };
        result.map_err(|e| BackendError::Encode(e.to_string()))?;
        Ok(buf.into_inner())
    }

    fn read_copyright(&self, bytes: &[u8]) -> Option<String> {
        let exif = exif::Reader::new()
            .read_from_container(&mut Cursor::new(bytes))
            .ok()?;
        let field = exif.get_field(exif::Tag::Copyright, exif::In::PRIMARY)?;
        let exif::Value::Ascii(ref parts) = field.value else {
            return None;
        };
        // Copyright may hold "photographer\0editor"; keep the non-empty parts
        let text = parts
            .iter()
            .map(|p| String::from_utf8_lossy(p).trim().to_string())
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(", ");
        let text = text.trim_matches('"').trim();
        (!text.is_empty()).then(|| text.to_string())
    }
}
