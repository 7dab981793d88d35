//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Fit `source` inside `bounds`, preserving aspect ratio, never upscaling.
///
/// Images already within the box keep their dimensions. Otherwise the longest
/// edge relative to the box is scaled down to touch it. Neither output edge is
/// ever smaller than one pixel.
///
/// # Examples
/// ```
/// # use hugopix::imaging::fit_within;
/// assert_eq!(fit_within((2000, 1500), (800, 800)), (800, 600));
/// assert_eq!(fit_within((500, 500), (800, 800)), (500, 500));
/// ```
pub fn fit_within(source: (u32, u32), bounds: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (max_w, max_h) = bounds;

    if src_w <= max_w && src_h <= max_h {
        return source;
    }

    let ratio = f64::min(max_w as f64 / src_w as f64, max_h as f64 / src_h as f64);
    let w = (src_w as f64 * ratio).round().max(1.0) as u32;
    let h = (src_h as f64 * ratio).round().max(1.0) as u32;
    (w.min(max_w), h.min(max_h))
}

/// Largest rectangle with the `target` aspect ratio that fits inside `source`.
///
/// Returns `None` when either rounded edge would collapse to zero (degenerate
/// images, or a target aspect far more extreme than the source).
pub fn largest_aspect_window(source: (u32, u32), target: (u32, u32)) -> Option<(u32, u32)> {
    let (src_w, src_h) = source;
    let (tgt_w, tgt_h) = target;
    if src_w == 0 || src_h == 0 || tgt_w == 0 || tgt_h == 0 {
        return None;
    }

    // Compare aspect ratios without floating point: src_w/src_h vs tgt_w/tgt_h
    let (w, h) = if src_w as u64 * tgt_h as u64 >= src_h as u64 * tgt_w as u64 {
        // Source is wider: height is the limit
        let w = (src_h as f64 * tgt_w as f64 / tgt_h as f64).round() as u32;
        (w.min(src_w), src_h)
    } else {
        // Source is taller: width is the limit
        let h = (src_w as f64 * tgt_h as f64 / tgt_w as f64).round() as u32;
        (src_w, h.min(src_h))
    };

    (w > 0 && h > 0).then_some((w, h))
}
