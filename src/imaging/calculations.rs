//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

use super::params::Bounds;

/// Calculate the dimensions of an image scaled down to fit inside `bounds`.
///
/// The scale factor is `min(1.0, max_width / width, max_height / height)`, so
/// images are never enlarged. Both axes use the same factor and each output
/// dimension is rounded to the nearest pixel and clamped to at least 1.
///
/// # Arguments
/// * `source` - Original image dimensions (width, height)
/// * `bounds` - Bounding box the result must fit inside
///
/// # Returns
/// * `(width, height)` - Output dimensions; equal to `source` when it already fits
///
/// # Examples
/// ```
/// # use upload_derivatives::imaging::{Bounds, fit_within};
/// // 2000x1000 into a 150px square → 150x75
/// assert_eq!(fit_within((2000, 1000), Bounds::new(150, 150)), (150, 75));
///
/// // Smaller than the box → unchanged
/// assert_eq!(fit_within((100, 80), Bounds::new(400, 400)), (100, 80));
/// ```
pub fn fit_within(source: (u32, u32), bounds: Bounds) -> (u32, u32) {
    let (src_w, src_h) = source;
    if bounds.contains(src_w, src_h) {
        return source;
    }

    let scale = scale_factor(source, bounds);
    let w = ((src_w as f64 * scale).round() as u32).max(1);
    let h = ((src_h as f64 * scale).round() as u32).max(1);
    (w, h)
}

/// Uniform scale factor for fitting `source` into `bounds`, capped at 1.0.
pub fn scale_factor(source: (u32, u32), bounds: Bounds) -> f64 {
    let (src_w, src_h) = source;
    let sx = bounds.max_width as f64 / src_w.max(1) as f64;
    let sy = bounds.max_height as f64 / src_h.max(1) as f64;
    1.0_f64.min(sx).min(sy)
}
