//! Image codec backend trait and shared types.
//!
//! The [`ImageBackend`] trait is the seam between the pipeline and the pixel
//! codecs: `decode` turns uploaded bytes into a [`SourceImage`], `encode`
//! turns a pixel buffer into the bytes of one derived codec.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), pure Rust and statically
//! linked. Tests use the [`MockBackend`](tests::MockBackend) below.

use super::params::Quality;
use crate::matrix::Codec;
use image::DynamicImage;
use thiserror::Error;

/// The uploaded bytes could not be turned into pixels. Fatal for the pipeline.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("unrecognized image format")]
    UnknownFormat,
    #[error("unsupported source format: {0}")]
    Unsupported(String),
    #[error("malformed image data: {0}")]
    Malformed(String),
    #[error("image has a zero dimension ({width}x{height})")]
    Empty { width: u32, height: u32 },
}

/// A codec rejected one pixel buffer. Local to a single matrix cell.
#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("cannot encode a {width}x{height} image")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("{codec} encode failed: {message}")]
    Codec { codec: Codec, message: String },
}

/// Pixel dimensions of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn of(image: &DynamicImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
        }
    }

    pub fn as_tuple(self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// A decoded upload.
///
/// Owned by exactly one pipeline invocation; the pixel buffer is shared
/// read-only by every derivative computed from it.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub pixels: DynamicImage,
    /// Lowercase codec name sniffed from the bytes (`"jpeg"`, `"png"`, ...).
    pub format: String,
    /// Length of the uploaded bytes, before decoding.
    pub byte_length: u64,
}

impl SourceImage {
    pub fn dimensions(&self) -> Dimensions {
        Dimensions::of(&self.pixels)
    }
}

/// Trait for image codec backends.
///
/// `Sync` so one backend can be shared across rayon workers.
pub trait ImageBackend: Sync {
    /// Decode uploaded bytes into pixels.
    fn decode(&self, bytes: &[u8]) -> Result<SourceImage, DecodeError>;

    /// Encode a pixel buffer as `codec`.
    fn encode(
        &self,
        pixels: &DynamicImage,
        codec: Codec,
        quality: Quality,
    ) -> Result<Vec<u8>, EncodeError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mock backend that records operations without running real codecs.
    ///
    /// `decode` hands out a blank RGB buffer of the configured size; `encode`
    /// returns a short tagged payload. Uses Mutex (not RefCell) so it is Sync
    /// and works with rayon's par_iter.
    pub struct MockBackend {
        pub source: Option<Dimensions>,
        pub format: String,
        /// (codec, output width) pairs whose encode fails. `None` width fails every size.
        pub failing: Vec<(Codec, Option<u32>)>,
        pub operations: Mutex<Vec<RecordedOp>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Decode { bytes: usize },
        Encode { codec: Codec, width: u32, height: u32, quality: u8 },
    }

    impl MockBackend {
        /// Backend whose decode yields a `width`x`height` JPEG-like source.
        pub fn with_dimensions(width: u32, height: u32) -> Self {
            Self {
                source: Some(Dimensions { width, height }),
                format: "jpeg".to_string(),
                failing: Vec::new(),
                operations: Mutex::new(Vec::new()),
            }
        }

        /// Backend whose decode always fails.
        pub fn undecodable() -> Self {
            Self {
                source: None,
                format: String::new(),
                failing: Vec::new(),
                operations: Mutex::new(Vec::new()),
            }
        }

        /// Fail encodes of `codec` whose output width is `width` (or all widths).
        pub fn failing_encode(mut self, codec: Codec, width: Option<u32>) -> Self {
            self.failing.push((codec, width));
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
        fn decode(&self, bytes: &[u8]) -> Result<SourceImage, DecodeError> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Decode { bytes: bytes.len() });

            let dims = self.source.ok_or(DecodeError::UnknownFormat)?;
            Ok(SourceImage {
                pixels: DynamicImage::new_rgb8(dims.width, dims.height),
                format: self.format.clone(),
                byte_length: bytes.len() as u64,
            })
        }

        fn encode(
            &self,
            pixels: &DynamicImage,
            codec: Codec,
            quality: Quality,
        ) -> Result<Vec<u8>, EncodeError> {
            let (width, height) = (pixels.width(), pixels.height());
            self.operations.lock().unwrap().push(RecordedOp::Encode {
                codec,
                width,
                height,
                quality: quality.value(),
            });

            let fails = self
                .failing
                .iter()
                .any(|(c, w)| *c == codec && w.is_none_or(|w| w == width));
            if fails {
                return Err(EncodeError::Codec {
                    codec,
                    message: "mock failure".to_string(),
                });
            }
            Ok(format!("{codec}:{width}x{height}").into_bytes())
        }
    }

    #[test]
    fn mock_records_decode() {
        let backend = MockBackend::with_dimensions(800, 600);

        let source = backend.decode(b"bytes").unwrap();
        assert_eq!(source.dimensions(), Dimensions { width: 800, height: 600 });
        assert_eq!(source.byte_length, 5);

        let ops = backend.get_operations();
        assert_eq!(ops, vec![RecordedOp::Decode { bytes: 5 }]);
    }

    #[test]
    fn mock_undecodable_errors() {
        let backend = MockBackend::undecodable();
        assert!(matches!(
            backend.decode(b"junk"),
            Err(DecodeError::UnknownFormat)
        ));
    }

    #[test]
    fn mock_failing_encode_is_selective() {
        let backend = MockBackend::with_dimensions(10, 10).failing_encode(Codec::Avif, Some(10));
        let img = DynamicImage::new_rgb8(10, 10);
        let small = DynamicImage::new_rgb8(5, 5);

        assert!(backend.encode(&img, Codec::Avif, Quality::default()).is_err());
        assert!(backend.encode(&small, Codec::Avif, Quality::default()).is_ok());
        assert!(backend.encode(&img, Codec::WebP, Quality::default()).is_ok());
        assert_eq!(backend.encode_count(), 3);
    }
}
