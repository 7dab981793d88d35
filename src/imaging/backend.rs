//! Image codec backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the three capabilities the derivative
//! builder needs from the outside world: decode bytes into pixels, encode
//! pixels back into bytes, and read the copyright string from embedded
//! metadata. Resizing and cropping are plain pixel operations and stay out of
//! the trait.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend): the `image` crate for
//! codecs and `kamadak-exif` for metadata.

use super::params::Quality;
use image::{DynamicImage, ImageFormat};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Encode failed: {0}")]
    Encode(String),
    #[error("Unsupported output format: {0:?}")]
    UnsupportedFormat(ImageFormat),
}

/// Result of a decode: pixels plus the container format they came from.
///
/// Derivatives are always encoded back into `format`.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub image: DynamicImage,
    pub format: ImageFormat,
}

/// Trait for image codec backends.
///
/// `Sync` so a single backend can be shared by every rayon worker.
pub trait ImageBackend: Sync {
    /// Decode raw file bytes, detecting the format from content.
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, BackendError>;

    /// Encode pixels into `format`. Formats outside the supported set are an error.
    fn encode(
        &self,
        image: &DynamicImage,
        format: ImageFormat,
        quality: Quality,
    ) -> Result<Vec<u8>, BackendError>;

    /// Copyright string from embedded EXIF, if present and parseable.
    fn read_copyright(&self, bytes: &[u8]) -> Option<String>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use image::RgbImage;
    use std::sync::Mutex;

    /// Mock backend that fabricates decoded images and records encodes.
    /// Uses Mutex (not RefCell) so it is Sync and works with rayon's par_iter.
    ///
    /// Bytes starting with `b"corrupt"` fail to decode. Anything else decodes
    /// to a gray image of `dimensions` tagged with `format`.
    pub struct MockBackend {
        pub dimensions: (u32, u32),
        pub format: ImageFormat,
        pub copyright: Option<String>,
        pub operations: Mutex<Vec<RecordedOp>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Decode,
        Encode {
            width: u32,
            height: u32,
            format: ImageFormat,
        },
    }

    impl MockBackend {
        pub fn new(dimensions: (u32, u32)) -> Self {
            Self {
                dimensions,
                format: ImageFormat::Jpeg,
                copyright: None,
                operations: Mutex::new(Vec::new()),
            }
        }

        pub fn with_format(mut self, format: ImageFormat) -> Self {
            self.format = format;
            self
        }

        pub fn with_copyright(mut self, copyright: &str) -> Self {
            self.copyright = Some(copyright.to_string());
            self
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }

        pub fn encode_count(&self) -> usize {
            self.get_operations()
                .iter()
                .filter(|op| matches!(op, RecordedOp::Encode { .. }))
                .count()
        }
    }

    impl ImageBackend for MockBackend {
        fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, BackendError> {
            self.operations.lock().unwrap().push(RecordedOp::Decode);
            if bytes.starts_with(b"corrupt") {
                return Err(BackendError::Decode("mock corrupt input".into()));
            }
            let (w, h) = self.dimensions;
            Ok(DecodedImage {
                image: DynamicImage::ImageRgb8(RgbImage::from_pixel(
                    w,
                    h,
                    image::Rgb([128, 128, 128]),
                )),
                format: self.format,
            })
        }

        fn encode(
            &self,
            image: &DynamicImage,
            format: ImageFormat,
            _quality: Quality,
        ) -> Result<Vec<u8>, BackendError> {
            if !matches!(format, ImageFormat::Jpeg | ImageFormat::Png) {
                return Err(BackendError::UnsupportedFormat(format));
            }
            self.operations.lock().unwrap().push(RecordedOp::Encode {
                width: image.width(),
                height: image.height(),
                format,
            });
            Ok(format!("{}x{}", image.width(), image.height()).into_bytes())
        }

        fn read_copyright(&self, _bytes: &[u8]) -> Option<String> {
            self.copyright.clone()
        }
    }

    #[test]
    fn mock_decodes_to_configured_dimensions() {
        let backend = MockBackend::new((640, 480));
        let decoded = backend.decode(b"anything").unwrap();
        assert_eq!(decoded.image.width(), 640);
        assert_eq!(decoded.image.height(), 480);
        assert_eq!(decoded.format, ImageFormat::Jpeg);
        assert_eq!(backend.get_operations(), vec![RecordedOp::Decode]);
    }

    #[test]
    fn mock_rejects_corrupt_bytes() {
        let backend = MockBackend::new((10, 10));
        assert!(matches!(
            backend.decode(b"corrupt data"),
            Err(BackendError::Decode(_))
        ));
    }

    #[test]
    fn mock_records_encodes() {
        let backend = MockBackend::new((10, 10));
        let img = DynamicImage::ImageRgb8(RgbImage::new(4, 3));
        backend
            .encode(&img, ImageFormat::Png, Quality::default())
            .unwrap();
        assert_eq!(
            backend.get_operations(),
            vec![RecordedOp::Encode {
                width: 4,
                height: 3,
                format: ImageFormat::Png
            }]
        );
        assert_eq!(backend.encode_count(), 1);
    }
}
