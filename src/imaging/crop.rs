//! Content-aware crop selection for thumbnails.
//!
//! A plain center crop throws away the subject of most off-center photographs.
//! Instead, [`select_crop`] slides a window of the target aspect ratio across
//! the image at a few scales and positions, scores every window for visual
//! importance, and returns the best one.
//!
//! ## Scoring
//!
//! Each pixel of a downscaled analysis copy contributes three features:
//!
//! | Feature | Measure | Effect |
//! |---|---|---|
//! | detail | Laplacian magnitude of luminance | rewards texture and edges |
//! | skin | hue 0–50°, saturation 0.2–0.7, value ≥ 0.35 | biases toward people |
//! | extremity | luminance ≤ 0.06 or ≥ 0.94 | penalises blown-out or empty areas |
//!
//! Feature means over the window are combined as a weighted sum, plus a small
//! centrality bonus (1 at the image center, 0 at a corner). With the stock
//! weights centrality only decides between windows whose content scores are
//! close. Exact ties go to the window nearest the center, then the larger one.
//!
//! Window sums come from summed-area tables, so each candidate costs O(1)
//! regardless of its size.

use super::calculations::largest_aspect_window;
use image::{DynamicImage, GenericImageView, Rgb};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Scores closer than this are considered equal.
const SCORE_EPSILON: f64 = 1e-9;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CropError {
    #[error("cannot crop a {width}x{height} image to a {target_width}:{target_height} window")]
    Unsupported {
        width: u32,
        height: u32,
        target_width: u32,
        target_height: u32,
    },
}

/// Saliency weights and search granularity for [`select_crop`].
///
/// Exposed as the `[crop]` table of `hugopix.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CropSettings {
    /// Weight of mean edge energy.
    pub detail: f64,
    /// Weight of the skin-tone fraction.
    pub skin: f64,
    /// Penalty weight of the near-white/near-black fraction.
    pub extremity: f64,
    /// Weight of the centrality bonus. Keep it small relative to the others.
    pub centrality: f64,
    /// Smallest window, as a fraction of the largest window that fits.
    pub min_scale: f64,
    /// Scale decrement between successive window sizes.
    pub scale_step: f64,
    /// Position step, as a fraction of the window edge.
    pub position_step: f64,
    /// Longest edge of the downscaled copy used for scoring.
    pub analysis_size: u32,
}

impl Default for CropSettings {
    fn default() -> Self {
        Self {
            detail: 1.0,
            skin: 1.0,
            extremity: 0.5,
            centrality: 0.05,
            min_scale: 0.9,
            scale_step: 0.05,
            position_step: 0.1,
            analysis_size: 256,
        }
    }
}

/// A sub-rectangle of the source image, in source pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    fn center(&self) -> (f64, f64) {
        (
            self.x as f64 + self.width as f64 / 2.0,
            self.y as f64 + self.height as f64 / 2.0,
        )
    }

    fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl std::fmt::Display for CropRect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

/// Pick the most salient window with the aspect ratio of `target_width:target_height`.
///
/// The returned rectangle always lies inside the image and matches the
/// target aspect ratio to within one pixel. Fails with
/// [`CropError::Unsupported`] when no such window exists (empty image or a
/// zero target edge); callers should skip the thumbnail rather than the image.
pub fn select_crop(
    img: &DynamicImage,
    target_width: u32,
    target_height: u32,
    settings: &CropSettings,
) -> Result<CropRect, CropError> {
    let (width, height) = img.dimensions();
    let unsupported = CropError::Unsupported {
        width,
        height,
        target_width,
        target_height,
    };
    let base = largest_aspect_window((width, height), (target_width, target_height))
        .ok_or_else(|| unsupported.clone())?;

    let map = SaliencyMap::analyze(img, settings.analysis_size);
    let image_center = (width as f64 / 2.0, height as f64 / 2.0);
    let half_diagonal = image_center.0.hypot(image_center.1);

    let mut best: Option<Scored> = None;
    for scale in scales(settings) {
        let (win_w, win_h) = window_at_scale(
            base,
            (width, height),
            (target_width, target_height),
            scale,
        );
        for y in positions(height, win_h, settings.position_step) {
            for x in positions(width, win_w, settings.position_step) {
                let rect = CropRect {
                    x,
                    y,
                    width: win_w,
                    height: win_h,
                };
                let (cx, cy) = rect.center();
                let distance = (cx - image_center.0).hypot(cy - image_center.1);
                let centrality = 1.0 - distance / half_diagonal;
                let score = map.score(&rect, settings) + settings.centrality * centrality;
                let candidate = Scored {
                    rect,
                    score,
                    distance,
                };
                if best.as_ref().is_none_or(|b| candidate.beats(b)) {
                    best = Some(candidate);
                }
            }
        }
    }

    // `scales` always yields 1.0 and `positions` always yields 0
    best.map(|b| b.rect).ok_or(unsupported)
}

struct Scored {
    rect: CropRect,
    score: f64,
    distance: f64,
}

impl Scored {
    fn beats(&self, other: &Scored) -> bool {
        if (self.score - other.score).abs() > SCORE_EPSILON {
            return self.score > other.score;
        }
        if (self.distance - other.distance).abs() > SCORE_EPSILON {
            return self.distance < other.distance;
        }
        self.rect.area() > other.rect.area()
    }
}

/// Window scales from 1.0 down to `min_scale`, inclusive.
fn scales(settings: &CropSettings) -> Vec<f64> {
    let step = settings.scale_step.max(SCORE_EPSILON);
    let min = settings.min_scale.clamp(SCORE_EPSILON, 1.0);
    let count = ((1.0 - min) / step + SCORE_EPSILON).floor() as usize;
    (0..=count).map(|i| 1.0 - i as f64 * step).collect()
}

/// Window size at `scale`, deriving the short-side edge from the long one so
/// the aspect error stays under one pixel.
fn window_at_scale(
    base: (u32, u32),
    image: (u32, u32),
    target: (u32, u32),
    scale: f64,
) -> (u32, u32) {
    let (tgt_w, tgt_h) = (target.0 as f64, target.1 as f64);
    if target.0 >= target.1 {
        let w = ((base.0 as f64 * scale).round() as u32).clamp(1, image.0);
        let h = ((w as f64 * tgt_h / tgt_w).round() as u32).clamp(1, image.1);
        (w, h)
    } else {
        let h = ((base.1 as f64 * scale).round() as u32).clamp(1, image.1);
        let w = ((h as f64 * tgt_w / tgt_h).round() as u32).clamp(1, image.0);
        (w, h)
    }
}

/// Offsets along one axis: a regular grid plus the far edge and the center.
fn positions(extent: u32, window: u32, step_fraction: f64) -> Vec<u32> {
    let max = extent.saturating_sub(window);
    let step = ((window as f64 * step_fraction).round() as usize).max(1);
    let mut offsets: Vec<u32> = (0..=max).step_by(step).collect();
    offsets.push(max);
    offsets.push(max / 2);
    offsets.sort_unstable();
    offsets.dedup();
    offsets
}

/// Per-pixel feature maps of the analysis copy, stored as summed-area tables.
struct SaliencyMap {
    scale_x: f64,
    scale_y: f64,
    width: usize,
    height: usize,
    detail: SummedArea,
    skin: SummedArea,
    extremity: SummedArea,
}

impl SaliencyMap {
    fn analyze(img: &DynamicImage, analysis_size: u32) -> Self {
        let (src_w, src_h) = img.dimensions();
        let analysis_size = analysis_size.max(1);
        let small = if src_w.max(src_h) > analysis_size {
            img.thumbnail(analysis_size, analysis_size)
        } else {
            img.clone()
        };
        let rgb = small.to_rgb8();
        let (w, h) = (rgb.width() as usize, rgb.height() as usize);

        let luma: Vec<f64> = rgb.pixels().map(luminance).collect();
        let at = |x: isize, y: isize| {
            let x = x.clamp(0, w as isize - 1) as usize;
            let y = y.clamp(0, h as isize - 1) as usize;
            luma[y * w + x]
        };

        let detail = SummedArea::build(w, h, |x, y| {
            let (xi, yi) = (x as isize, y as isize);
            let laplacian = 4.0 * at(xi, yi)
                - at(xi - 1, yi)
                - at(xi + 1, yi)
                - at(xi, yi - 1)
                - at(xi, yi + 1);
            laplacian.abs().min(1.0)
        });
        let skin = SummedArea::build(w, h, |x, y| {
            if is_skin(rgb.get_pixel(x as u32, y as u32)) {
                1.0
            } else {
                0.0
            }
        });
        let extremity = SummedArea::build(w, h, |x, y| {
            let l = luma[y * w + x];
            if !(0.06..=0.94).contains(&l) { 1.0 } else { 0.0 }
        });

        Self {
            scale_x: w as f64 / src_w as f64,
            scale_y: h as f64 / src_h as f64,
            width: w,
            height: h,
            detail,
            skin,
            extremity,
        }
    }

    /// Weighted content score of `rect` (source coordinates), centrality excluded.
    fn score(&self, rect: &CropRect, settings: &CropSettings) -> f64 {
        let x0 = ((rect.x as f64 * self.scale_x).floor() as usize).min(self.width - 1);
        let y0 = ((rect.y as f64 * self.scale_y).floor() as usize).min(self.height - 1);
        let x1 = (((rect.x + rect.width) as f64 * self.scale_x).ceil() as usize)
            .clamp(x0 + 1, self.width);
        let y1 = (((rect.y + rect.height) as f64 * self.scale_y).ceil() as usize)
            .clamp(y0 + 1, self.height);
        let area = ((x1 - x0) * (y1 - y0)) as f64;

        settings.detail * self.detail.sum(x0, y0, x1, y1) / area
            + settings.skin * self.skin.sum(x0, y0, x1, y1) / area
            - settings.extremity * self.extremity.sum(x0, y0, x1, y1) / area
    }
}

/// Summed-area table with a zero row and column prepended.
struct SummedArea {
    stride: usize,
    table: Vec<f64>,
}

impl SummedArea {
    fn build(width: usize, height: usize, value: impl Fn(usize, usize) -> f64) -> Self {
        let stride = width + 1;
        let mut table = vec![0.0; stride * (height + 1)];
        for y in 0..height {
            let mut row = 0.0;
            for x in 0..width {
                row += value(x, y);
                table[(y + 1) * stride + x + 1] = table[y * stride + x + 1] + row;
            }
        }
        Self { stride, table }
    }

    /// Sum over the half-open box `[x0, x1) × [y0, y1)`.
    fn sum(&self, x0: usize, y0: usize, x1: usize, y1: usize) -> f64 {
        let s = self.stride;
        self.table[y1 * s + x1] - self.table[y0 * s + x1] - self.table[y1 * s + x0]
            + self.table[y0 * s + x0]
    }
}

fn luminance(p: &Rgb<u8>) -> f64 {
    let [r, g, b] = p.0;
    (0.2126 * r as f64 + 0.7152 * g as f64 + 0.0722 * b as f64) / 255.0
}

fn is_skin(p: &Rgb<u8>) -> bool {
    let [r, g, b] = p.0.map(|c| c as f64 / 255.0);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;
    if max < 0.35 || delta <= 0.0 {
        return false;
    }
    let saturation = delta / max;
    // Skin hues sit between red and yellow, so red must be the dominant channel
    if max != r {
        return false;
    }
    let hue = 60.0 * ((g - b) / delta);
    (0.0..=50.0).contains(&hue) && (0.2..=0.7).contains(&saturation)
}
