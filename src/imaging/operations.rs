//! High-level image operations.
//!
//! These functions combine calculations with backend execution.

use super::backend::{DecodeError, Dimensions, ImageBackend, SourceImage};
use super::calculations::fit_within;
use super::params::Bounds;
use image::DynamicImage;
use image::imageops::FilterType;
use std::borrow::Cow;

/// Decode an upload and reject images the rest of the pipeline cannot use.
pub fn decode_source(backend: &impl ImageBackend, bytes: &[u8]) -> Result<SourceImage, DecodeError> {
    let source = backend.decode(bytes)?;
    let Dimensions { width, height } = source.dimensions();
    if width == 0 || height == 0 {
        return Err(DecodeError::Empty { width, height });
    }
    Ok(source)
}

/// Scale `pixels` down to fit inside `bounds`, preserving aspect ratio.
///
/// Returns the input borrowed, without resampling, when it already fits.
/// Otherwise resamples with Lanczos3 to exactly the dimensions computed by
/// [`fit_within`].
pub fn resize(pixels: &DynamicImage, bounds: Bounds) -> Cow<'_, DynamicImage> {
    let source = (pixels.width(), pixels.height());
    let (w, h) = fit_within(source, bounds);
    if (w, h) == source {
        return Cow::Borrowed(pixels);
    }
    Cow::Owned(pixels.resize_exact(w, h, FilterType::Lanczos3))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};

    #[test]
    fn decode_source_calls_backend_once() {
        let backend = MockBackend::with_dimensions(1920, 1080);

        let source = decode_source(&backend, b"abc").unwrap();
        assert_eq!(source.dimensions().as_tuple(), (1920, 1080));
        assert_eq!(backend.get_operations(), vec![RecordedOp::Decode { bytes: 3 }]);
    }

    #[test]
    fn decode_source_rejects_zero_dimension() {
        let backend = MockBackend::with_dimensions(0, 10);

        let result = decode_source(&backend, b"abc");
        assert!(matches!(
            result,
            Err(DecodeError::Empty {
                width: 0,
                height: 10
            })
        ));
    }

    #[test]
    fn resize_within_bounds_borrows() {
        let img = DynamicImage::new_rgb8(100, 80);
        let out = resize(&img, Bounds::new(150, 150));
        assert!(matches!(out, Cow::Borrowed(_)));
        assert_eq!((out.width(), out.height()), (100, 80));
    }

    #[test]
    fn resize_scales_to_exact_fit() {
        let img = DynamicImage::new_rgb8(300, 150);
        let out = resize(&img, Bounds::new(150, 150));
        assert!(matches!(out, Cow::Owned(_)));
        assert_eq!((out.width(), out.height()), (150, 75));
    }

    #[test]
    fn resize_portrait() {
        let img = DynamicImage::new_rgba8(90, 300);
        let out = resize(&img, Bounds::new(100, 100));
        assert_eq!((out.width(), out.height()), (30, 100));
        // Color type survives resampling
        assert!(out.color().has_alpha());
    }
}
