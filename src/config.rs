//! Gallery configuration.
//!
//! Values come from three layers, later layers winning:
//!
//! 1. Stock defaults ([`GalleryConfig::default`])
//! 2. `hugopix.toml` in the source directory (or the file given with `--config`)
//! 3. Command-line flags ([`ConfigOverrides`])
//!
//! The file is named `hugopix.toml` rather than `config.toml` so it can sit
//! next to a Hugo site's own configuration.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! title = ""
//!
//! [thumbnail]
//! width = 256               # exact thumbnail size
//! height = 256
//!
//! [small]
//! max_width = 800           # bounding box for the small derivative
//! max_height = 800
//!
//! [encoding]
//! jpeg_quality = 90         # 1-100, PNG is always lossless
//! filter = "lanczos3"       # nearest | triangle | catmullrom | gaussian | lanczos3
//!
//! [crop]
//! detail = 1.0              # weight of edge energy
//! skin = 1.0                # weight of skin tones
//! extremity = 0.5           # penalty for near-white / near-black
//! centrality = 0.05         # bonus for centered windows
//! min_scale = 0.9           # smallest window relative to the largest
//! scale_step = 0.05
//! position_step = 0.1       # fraction of the window edge
//! analysis_size = 256       # longest edge of the scoring copy
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{CropSettings, Quality, ResampleFilter};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Name of the optional configuration file in the source directory.
pub const CONFIG_FILENAME: &str = "hugopix.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Complete gallery configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GalleryConfig {
    /// Gallery title written to the manifest header.
    pub title: String,
    pub thumbnail: ThumbnailConfig,
    pub small: SmallConfig,
    pub encoding: EncodingConfig,
    pub crop: CropSettings,
    pub processing: ProcessingConfig,
}

/// Exact output size of thumbnails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThumbnailConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            width: 256,
            height: 256,
        }
    }
}

/// Bounding box of the small derivative. Images inside it are not upscaled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SmallConfig {
    pub max_width: u32,
    pub max_height: u32,
}

impl Default for SmallConfig {
    fn default() -> Self {
        Self {
            max_width: 800,
            max_height: 800,
        }
    }
}

/// Encoder and resampler settings shared by both derivatives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EncodingConfig {
    /// JPEG quality (1 = worst, 100 = best).
    pub jpeg_quality: u32,
    pub filter: ResampleFilter,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: 90,
            filter: ResampleFilter::default(),
        }
    }
}

impl EncodingConfig {
    pub fn quality(&self) -> Quality {
        Quality::new(self.jpeg_quality)
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel image processing workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

/// Command-line values that replace individual config fields when present.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub title: Option<String>,
    pub thumbnail_width: Option<u32>,
    pub thumbnail_height: Option<u32>,
    pub small_width: Option<u32>,
    pub small_height: Option<u32>,
}

impl GalleryConfig {
    /// Apply command-line overrides on top of file/stock values.
    pub fn apply(&mut self, overrides: ConfigOverrides) {
        if let Some(title) = overrides.title {
            self.title = title;
        }
        if let Some(w) = overrides.thumbnail_width {
            self.thumbnail.width = w;
        }
        if let Some(h) = overrides.thumbnail_height {
            self.thumbnail.height = h;
        }
        if let Some(w) = overrides.small_width {
            self.small.max_width = w;
        }
        if let Some(h) = overrides.small_height {
            self.small.max_height = h;
        }
    }

    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.thumbnail.width == 0 || self.thumbnail.height == 0 {
            return Err(ConfigError::Validation(
                "thumbnail width and height must be non-zero".into(),
            ));
        }
        if self.small.max_width == 0 || self.small.max_height == 0 {
            return Err(ConfigError::Validation(
                "small max_width and max_height must be non-zero".into(),
            ));
        }
        if !(1..=100).contains(&self.encoding.jpeg_quality) {
            return Err(ConfigError::Validation(
                "encoding.jpeg_quality must be 1-100".into(),
            ));
        }
        let crop = &self.crop;
        for (name, value) in [
            ("min_scale", crop.min_scale),
            ("scale_step", crop.scale_step),
            ("position_step", crop.position_step),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(ConfigError::Validation(format!(
                    "crop.{name} must be in (0, 1]"
                )));
            }
        }
        for (name, value) in [
            ("detail", crop.detail),
            ("skin", crop.skin),
            ("extremity", crop.extremity),
            ("centrality", crop.centrality),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::Validation(format!(
                    "crop.{name} must be a finite number"
                )));
            }
        }
        if crop.analysis_size == 0 {
            return Err(ConfigError::Validation(
                "crop.analysis_size must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(GalleryConfig::default())
        .map_err(|e| ConfigError::Validation(format!("default config must serialize: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto the stock defaults, then deserialize.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<GalleryConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: GalleryConfig = merged.try_into()?;
    Ok(config)
}

/// Load config from `path`, falling back to stock defaults when it is absent.
///
/// Validation is left to the caller so command-line overrides can be applied
/// first.
pub fn load_config(path: &Path) -> Result<GalleryConfig, ConfigError> {
    resolve_config(load_raw_config(path)?)
}

/// Returns a fully-commented stock `hugopix.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# hugopix configuration
# =====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Command-line flags override them.
# Unknown keys will cause an error.

# Gallery title written to the index.md front matter (-t).
title = ""

# ---------------------------------------------------------------------------
# Thumbnails: exact output size, content-aware crop (--tw, --th)
# ---------------------------------------------------------------------------
[thumbnail]
width = 256
height = 256

# ---------------------------------------------------------------------------
# Small derivative: bounding box, aspect preserved, never upscaled (--sw, --sh)
# ---------------------------------------------------------------------------
[small]
max_width = 800
max_height = 800

# ---------------------------------------------------------------------------
# Encoding
# ---------------------------------------------------------------------------
[encoding]
# JPEG quality (1 = worst, 100 = best). PNG output is lossless.
jpeg_quality = 90

# Resampling filter: nearest, triangle, catmullrom, gaussian, lanczos3.
filter = "lanczos3"

# ---------------------------------------------------------------------------
# Thumbnail crop search
# ---------------------------------------------------------------------------
[crop]
# Score weights. The crop window maximising
#   detail * edges + skin * skin_tones - extremity * blown_out + centrality * centeredness
# wins. Keep centrality small so it only breaks near-ties.
detail = 1.0
skin = 1.0
extremity = 0.5
centrality = 0.05

# Window sizes from 1.0 down to min_scale of the largest fitting window.
min_scale = 0.9
scale_step = 0.05

# Window position step as a fraction of the window edge.
position_step = 0.1

# Longest edge of the downscaled copy that is scored.
analysis_size = 256

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel image-processing workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
