//! Image processing: pure Rust, no system libraries.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode / encode** | `image` (JPEG, PNG) |
//! | **Copyright** | `kamadak-exif` |
//! | **Small** | `DynamicImage::resize` after [`fit_within`] |
//! | **Thumbnail** | [`select_crop`] + `crop_imm` + `resize_exact` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Encoding quality and resampling filter
//! - **Crop**: Saliency-scored window search for thumbnails
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]

pub mod backend;
mod calculations;
pub mod crop;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, DecodedImage, ImageBackend};
pub use calculations::{fit_within, largest_aspect_window};
pub use crop::{CropError, CropRect, CropSettings, select_crop};
pub use params::{Quality, ResampleFilter};
pub use rust_backend::RustBackend;
