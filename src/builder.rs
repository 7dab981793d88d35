//! Per-image derivative builder.
//!
//! For one source photo, publishes the full-size copy and produces the two
//! derivatives, returning the manifest entry that describes them.
//!
//! ## Steps
//!
//! ```text
//! read bytes ─► decode
//!                  │
//!                  ├─► copyright (EXIF, optional)
//!                  ├─► small:     fit_within(bounds) → resize → encode → write   (only if stale)
//!                  ├─► thumbnail: select_crop → crop → resize_exact → encode → write (only if stale)
//!                  └─► publish full-size copy (hard link, copy fallback)
//! ```
//!
//! The full-size copy goes out last, and derivatives written by a build that
//! then fails are removed again, so a photo left out of the manifest leaves
//! no new files in the output directory.
//!
//! The small's dimensions are always computed because the manifest needs
//! them; pixels are only resampled and encoded when the file on disk is
//! stale. A fresh thumbnail skips the crop search entirely.
//!
//! Derivatives are encoded in the source's detected format. A crop the
//! selector cannot produce downgrades to "no thumbnail written" and the
//! image still makes it into the manifest with its small.

use crate::config::GalleryConfig;
use crate::freshness::needs_regeneration;
use crate::gallery::ManifestEntry;
use crate::imaging::{
    BackendError, CropSettings, DecodedImage, ImageBackend, Quality, ResampleFilter, fit_within,
    select_crop,
};
use crate::naming::{CandidateName, DerivativeKind};
use image::{DynamicImage, ImageFormat};
use std::borrow::Cow;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("{path}: decode failed: {source}")]
    Decode {
        path: PathBuf,
        source: BackendError,
    },
    #[error("{path}: encode failed: {source}")]
    Encode {
        path: PathBuf,
        source: BackendError,
    },
    #[error("{path}: {source}")]
    Io { path: PathBuf, source: io::Error },
}

impl BuildError {
    fn io(path: &Path) -> impl FnOnce(io::Error) -> BuildError + '_ {
        move |source| BuildError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Size and encoding policy for both derivatives.
#[derive(Debug, Clone)]
pub struct BuildSettings {
    /// Exact thumbnail size (width, height).
    pub thumbnail: (u32, u32),
    /// Bounding box for the small derivative (max width, max height).
    pub small_bounds: (u32, u32),
    pub quality: Quality,
    pub filter: ResampleFilter,
    pub crop: CropSettings,
}

impl BuildSettings {
    pub fn from_config(config: &GalleryConfig) -> Self {
        Self {
            thumbnail: (config.thumbnail.width, config.thumbnail.height),
            small_bounds: (config.small.max_width, config.small.max_height),
            quality: config.encoding.quality(),
            filter: config.encoding.filter,
            crop: config.crop.clone(),
        }
    }
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self::from_config(&GalleryConfig::default())
    }
}

/// How the full-size copy reached the output directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Publish {
    Linked,
    Copied,
    /// Source already lives at the destination.
    InPlace,
}

/// What happened to one derivative during a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantStatus {
    /// Existing file was newer-or-equal to the source; left untouched.
    Fresh,
    /// Resampled, encoded and written.
    Encoded,
    /// No window with the target aspect fits; nothing written.
    CropUnsupported,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariantInfo {
    pub kind: DerivativeKind,
    pub status: VariantStatus,
}

/// Result of a successful [`DerivativeBuilder::build`].
#[derive(Debug, Clone, PartialEq)]
pub struct BuildOutcome {
    pub entry: ManifestEntry,
    pub publish: Publish,
    pub variants: Vec<VariantInfo>,
}

/// Builds derivatives for single source photos into a flat output directory.
pub struct DerivativeBuilder<'a, B: ImageBackend> {
    backend: &'a B,
    output_dir: &'a Path,
    settings: &'a BuildSettings,
}

impl<'a, B: ImageBackend> DerivativeBuilder<'a, B> {
    pub fn new(backend: &'a B, output_dir: &'a Path, settings: &'a BuildSettings) -> Self {
        Self {
            backend,
            output_dir,
            settings,
        }
    }

    /// Process one source photo.
    ///
    /// Fails with [`BuildError`] when the photo must be left out of the
    /// gallery; a missing thumbnail crop is not a failure.
    pub fn build(
        &self,
        source: &Path,
        name: &CandidateName,
        source_modified: SystemTime,
    ) -> Result<BuildOutcome, BuildError> {
        let bytes = fs::read(source).map_err(BuildError::io(source))?;
        let decoded = self
            .backend
            .decode(&bytes)
            .map_err(|e| BuildError::Decode {
                path: source.to_path_buf(),
                source: e,
            })?;
        debug!(
            path = %source.display(),
            width = decoded.image.width(),
            height = decoded.image.height(),
            format = ?decoded.format,
            "decoded"
        );

        let copyright = self.backend.read_copyright(&bytes).unwrap_or_default();
        let mut written = Vec::new();
        let outcome = self.finish(
            source,
            name,
            source_modified,
            &decoded,
            copyright,
            &mut written,
        );
        if outcome.is_err() {
            discard(&written);
        }
        outcome
    }

    /// Derivatives, then the full-size copy. Every derivative file written is
    /// recorded in `written`.
    fn finish(
        &self,
        source: &Path,
        name: &CandidateName,
        source_modified: SystemTime,
        decoded: &DecodedImage,
        copyright: String,
        written: &mut Vec<PathBuf>,
    ) -> Result<BuildOutcome, BuildError> {
        let image = &decoded.image;
        let format = decoded.format;
        let (width, height) = (image.width(), image.height());

        let (small_width, small_height) = fit_within((width, height), self.settings.small_bounds);
        let small_name = name.derivative(DerivativeKind::Small);
        let small_path = self.output_dir.join(&small_name);
        let small_status = if needs_regeneration(&small_path, source_modified) {
            let small = if (small_width, small_height) == (width, height) {
                Cow::Borrowed(image)
            } else {
                Cow::Owned(image.resize_exact(
                    small_width,
                    small_height,
                    self.settings.filter.into(),
                ))
            };
            self.write_derivative(source, &small_path, &small, format, written)?;
            VariantStatus::Encoded
        } else {
            VariantStatus::Fresh
        };

        let (thumb_width, thumb_height) = self.settings.thumbnail;
        let thumb_name = name.derivative(DerivativeKind::Thumbnail);
        let thumb_path = self.output_dir.join(&thumb_name);
        let thumb_status = if needs_regeneration(&thumb_path, source_modified) {
            self.build_thumbnail(source, &thumb_path, image, format, written)?
        } else {
            VariantStatus::Fresh
        };

        let publish = publish_full_size(source, &self.output_dir.join(name.filename()))?;

        info!(
            path = %source.display(),
            small = ?small_status,
            thumbnail = ?thumb_status,
            "built"
        );

        Ok(BuildOutcome {
            entry: ManifestEntry {
                filename: name.filename(),
                width,
                height,
                small: small_name,
                small_width,
                small_height,
                thumbnail: thumb_name,
                thumbnail_width: thumb_width,
                thumbnail_height: thumb_height,
                copyright,
            },
            publish,
            variants: vec![
                VariantInfo {
                    kind: DerivativeKind::Small,
                    status: small_status,
                },
                VariantInfo {
                    kind: DerivativeKind::Thumbnail,
                    status: thumb_status,
                },
            ],
        })
    }

    fn build_thumbnail(
        &self,
        source: &Path,
        dest: &Path,
        image: &DynamicImage,
        format: ImageFormat,
        written: &mut Vec<PathBuf>,
    ) -> Result<VariantStatus, BuildError> {
        let (tw, th) = self.settings.thumbnail;
        let rect = match select_crop(image, tw, th, &self.settings.crop) {
            Ok(rect) => rect,
            Err(e) => {
                warn!(path = %source.display(), "thumbnail skipped: {e}");
                return Ok(VariantStatus::CropUnsupported);
            }
        };
        debug!(path = %source.display(), crop = %rect, "selected thumbnail crop");
        let thumb = image
            .crop_imm(rect.x, rect.y, rect.width, rect.height)
            .resize_exact(tw, th, self.settings.filter.into());
        self.write_derivative(source, dest, &thumb, format, written)?;
        Ok(VariantStatus::Encoded)
    }

    fn write_derivative(
        &self,
        source: &Path,
        dest: &Path,
        image: &DynamicImage,
        format: ImageFormat,
        written: &mut Vec<PathBuf>,
    ) -> Result<(), BuildError> {
        let encoded = self
            .backend
            .encode(image, format, self.settings.quality)
            .map_err(|e| BuildError::Encode {
                path: source.to_path_buf(),
                source: e,
            })?;
        written.push(dest.to_path_buf());
        fs::write(dest, encoded).map_err(BuildError::io(dest))
    }
}

/// Remove derivatives written by a build that failed afterwards.
fn discard(written: &[PathBuf]) {
    for path in written {
        match fs::remove_file(path) {
            Ok(()) => debug!(path = %path.display(), "removed derivative of failed build"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), "cannot remove derivative of failed build: {e}"),
        }
    }
}

/// Place the full-size copy at `dest`: remove what is there, hard link,
/// fall back to a byte copy (e.g. across filesystems).
///
/// A symlinked source is resolved first so the link points at the photo, not
/// at the symlink.
fn publish_full_size(source: &Path, dest: &Path) -> Result<Publish, BuildError> {
    if is_same_file(source, dest) {
        return Ok(Publish::InPlace);
    }
    let target = source.canonicalize().map_err(BuildError::io(source))?;
    match fs::remove_file(dest) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(BuildError::io(dest)(e)),
    }
    match fs::hard_link(&target, dest) {
        Ok(()) => Ok(Publish::Linked),
        Err(e) => {
            debug!(path = %source.display(), "hard link failed ({e}), copying");
            fs::copy(source, dest).map_err(BuildError::io(dest))?;
            Ok(Publish::Copied)
        }
    }
}

/// Whether both paths name the same directory entry.
///
/// Two hard links to one inode are *not* the same entry here; re-linking
/// them is harmless.
fn is_same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
