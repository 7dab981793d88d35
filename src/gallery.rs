//! Gallery assembly: per-image entries → ordered manifest.
//!
//! Entries keep the order they are handed in (traversal order). The cover is
//! always the first entry, so the order is visible to the rendered page and
//! must never be re-sorted here.

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

/// Fixed category tag written to every gallery.
pub const GALLERY_CATEGORY: &str = "photos";

#[derive(Error, Debug, PartialEq)]
pub enum GalleryError {
    #[error("did not find any photos")]
    Empty,
}

/// One successfully processed source photo.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManifestEntry {
    /// Full-size copy, e.g. `dawn.jpg`.
    pub filename: String,
    pub width: u32,
    pub height: u32,
    /// Small derivative, e.g. `dawn_small.jpg`.
    pub small: String,
    pub small_width: u32,
    pub small_height: u32,
    /// Thumbnail, e.g. `dawn_thm.jpg`. Always exactly
    /// `thumbnail_width × thumbnail_height`.
    pub thumbnail: String,
    pub thumbnail_width: u32,
    pub thumbnail_height: u32,
    /// Empty when the source carries no copyright.
    pub copyright: String,
}

/// The complete gallery description handed to the render sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Manifest {
    pub title: String,
    pub date: NaiveDate,
    pub categories: Vec<String>,
    /// Filename of the first entry.
    pub cover: String,
    pub entries: Vec<ManifestEntry>,
}

/// Build the manifest from entries in traversal order.
pub fn assemble(
    entries: Vec<ManifestEntry>,
    title: &str,
    date: NaiveDate,
) -> Result<Manifest, GalleryError> {
    let cover = entries.first().ok_or(GalleryError::Empty)?.filename.clone();
    Ok(Manifest {
        title: title.to_string(),
        date,
        categories: vec![GALLERY_CATEGORY.to_string()],
        cover,
        entries,
    })
}
