//! Shared test utilities for the hugopix test suite.
//!
//! Synthetic JPEG/PNG fixtures written with the `image` encoders, an EXIF
//! copyright injector, and mtime control for staleness tests.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! write_file(&tmp.path().join("a.jpg"), &jpeg_bytes(1000, 800));
//! set_mtime(&tmp.path().join("a.jpg"), 1_000);
//! ```

use filetime::FileTime;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, Rgb, RgbImage};
use std::io::Cursor;
use std::path::Path;
use std::time::{Duration, SystemTime};

// =========================================================================
// Synthetic images
// =========================================================================

/// Diagonal gradient so encoders have real content to chew on.
pub fn gradient(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            ((x + y) % 256) as u8,
        ])
    }))
}

pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    gradient(width, height)
        .write_with_encoder(JpegEncoder::new_with_quality(&mut buf, 85))
        .unwrap();
    buf.into_inner()
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    gradient(width, height)
        .write_with_encoder(PngEncoder::new(&mut buf))
        .unwrap();
    buf.into_inner()
}

/// JPEG with an APP1 EXIF segment carrying `copyright`.
pub fn jpeg_with_copyright(width: u32, height: u32, copyright: &str) -> Vec<u8> {
    let field = exif::Field {
        tag: exif::Tag::Copyright,
        ifd_num: exif::In::PRIMARY,
        value: exif::Value::Ascii(vec![copyright.as_bytes().to_vec()]),
    };
    let mut writer = exif::experimental::Writer::new();
    writer.push_field(&field);
    let mut tiff = Cursor::new(Vec::new());
    writer.write(&mut tiff, false).unwrap();
    let tiff = tiff.into_inner();

    let jpeg = jpeg_bytes(width, height);
    assert_eq!(&jpeg[..2], &[0xFF, 0xD8], "encoder output must start with SOI");

    let segment_len = (2 + 6 + tiff.len()) as u16;
    let mut out = Vec::with_capacity(jpeg.len() + tiff.len() + 10);
    out.extend_from_slice(&[0xFF, 0xD8, 0xFF, 0xE1]);
    out.extend_from_slice(&segment_len.to_be_bytes());
    out.extend_from_slice(b"Exif\0\0");
    out.extend_from_slice(&tiff);
    out.extend_from_slice(&jpeg[2..]);
    out
}

// =========================================================================
// Filesystem
// =========================================================================

pub fn write_file(path: &Path, bytes: &[u8]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, bytes).unwrap();
}

pub fn epoch_plus(secs: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
}

/// Set a file's mtime to `secs` after the Unix epoch.
pub fn set_mtime(path: &Path, secs: u64) {
    filetime::set_file_mtime(path, FileTime::from_system_time(epoch_plus(secs))).unwrap();
}

pub fn mtime(path: &Path) -> SystemTime {
    std::fs::metadata(path).unwrap().modified().unwrap()
}
