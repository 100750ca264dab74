//! Pure Rust codec backend; everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Sniff format | `image::ImageReader::with_guessed_format` (magic bytes) |
//! | Decode (JPEG, PNG, TIFF, WebP) | `image` crate (pure Rust decoders) |
//! | Encode → AVIF | `image::codecs::avif::AvifEncoder` (rav1e, speed 6) |
//! | Encode → WebP | `image::codecs::webp::WebPEncoder` (lossless) |

use super::backend::{DecodeError, EncodeError, ImageBackend, SourceImage};
use super::params::Quality;
use crate::matrix::Codec;
use image::codecs::avif::AvifEncoder;
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::borrow::Cow;
use std::io::Cursor;

/// rav1e speed preset: 1 (slowest) ..= 10 (fastest).
const AVIF_SPEED: u8 = 6;

/// Source formats whose decoders are compiled in, with the name reported in
/// the manifest.
///
/// AVIF is excluded: the `image` crate's `"avif"` feature only
/// enables the **encoder** (rav1e), even though `ImageFormat::reading_enabled()`
/// reports `true` for it.
const SOURCE_FORMATS: &[(ImageFormat, &str)] = &[
    (ImageFormat::Jpeg, "jpeg"),
    (ImageFormat::Png, "png"),
    (ImageFormat::Tiff, "tiff"),
    (ImageFormat::WebP, "webp"),
];

/// Returns the names of the source formats this backend can decode.
pub fn supported_source_formats() -> Vec<&'static str> {
    SOURCE_FORMATS
        .iter()
        .filter(|(fmt, _)| fmt.reading_enabled())
        .map(|(_, name)| *name)
        .collect()
}

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
#[derive(Debug, Default, Clone, Copy)]
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

fn source_format_name(format: ImageFormat) -> Result<&'static str, DecodeError> {
    SOURCE_FORMATS
        .iter()
        .find(|(fmt, _)| *fmt == format && fmt.reading_enabled())
        .map(|(_, name)| *name)
        .ok_or_else(|| DecodeError::Unsupported(format!("{format:?}").to_lowercase()))
}

/// Convert to a pixel layout both encoders accept (8-bit RGB or RGBA).
fn normalize(pixels: &DynamicImage) -> Cow<'_, DynamicImage> {
    match pixels {
        DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => Cow::Borrowed(pixels),
        other if other.color().has_alpha() => {
            Cow::Owned(DynamicImage::ImageRgba8(other.to_rgba8()))
        }
        other => Cow::Owned(DynamicImage::ImageRgb8(other.to_rgb8())),
    }
}

impl ImageBackend for RustBackend {
    fn decode(&self, bytes: &[u8]) -> Result<SourceImage, DecodeError> {
        let reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| DecodeError::Malformed(e.to_string()))?;
        let format = reader.format().ok_or(DecodeError::UnknownFormat)?;
        let name = source_format_name(format)?;

        let pixels = reader
            .decode()
            .map_err(|e| DecodeError::Malformed(format!("failed to decode {name}: {e}")))?;

        Ok(SourceImage {
            pixels,
            format: name.to_string(),
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
        if width == 0 || height == 0 {
            return Err(EncodeError::InvalidDimensions { width, height });
        }

        let img = normalize(pixels);
        let mut out = Vec::new();
        let written = match codec {
            Codec::Avif => img.write_with_encoder(AvifEncoder::new_with_speed_quality(
                &mut out,
                AVIF_SPEED,
                quality.value(),
            )),
            Codec::WebP => img.write_with_encoder(WebPEncoder::new_lossless(&mut out)),
        };
        written.map_err(|e| EncodeError::Codec {
            codec,
            message: e.to_string(),
        })?;
        Ok(out)
    }
}
