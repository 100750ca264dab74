//! The variant matrix: which (codec, size) derivatives every upload gets.
//!
//! The matrix is non-rectangular. The pass-through `original` produces exactly
//! one artifact, while each derived [`Codec`] produces a `full` artifact at the
//! source dimensions plus one artifact per [`SizeSpec`]:
//!
//! ```text
//!            full  thumbnail  400w  800w  1200w
//! original    ·        -       -     -     -      (verbatim upload bytes)
//! webp        ·        ·       ·     ·     ·
//! avif        ·        ·       ·     ·     ·
//! ```
//!
//! With the built-in tables that is 1 + 2 × (1 + 4) = 11 artifacts.
//! Enumeration order is stable (codecs in table order, `full` first, then the
//! sizes in table order) and is the order artifacts appear in the manifest.

use crate::imaging::Bounds;
use crate::layout::is_safe_segment;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// Size name of the source-dimension rendition of each derived codec.
pub const FULL: &str = "full";

/// Codec (and size) name of the verbatim upload.
pub const ORIGINAL: &str = "original";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum MatrixError {
    #[error("at least one derived codec is required")]
    NoCodecs,
    #[error("codec {0} listed more than once")]
    DuplicateCodec(Codec),
    #[error("size name {0:?} is not a safe path segment")]
    UnsafeSizeName(String),
    #[error("size name {0:?} is reserved")]
    ReservedSizeName(String),
    #[error("size name {0:?} listed more than once")]
    DuplicateSizeName(String),
    #[error("size {name:?} has a zero dimension ({max_width}x{max_height})")]
    ZeroBounds {
        name: String,
        max_width: u32,
        max_height: u32,
    },
}

/// A derived output codec. The name doubles as directory and file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    WebP,
    Avif,
}

impl Codec {
    pub fn name(self) -> &'static str {
        match self {
            Codec::WebP => "webp",
            Codec::Avif => "avif",
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A named bounding box.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SizeSpec {
    pub name: String,
    pub max_width: u32,
    pub max_height: u32,
}

impl SizeSpec {
    pub fn new(name: impl Into<String>, max_width: u32, max_height: u32) -> Self {
        Self {
            name: name.into(),
            max_width,
            max_height,
        }
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.max_width, self.max_height)
    }
}

/// Built-in derived codecs, in output order.
pub fn default_codecs() -> Vec<Codec> {
    vec![Codec::WebP, Codec::Avif]
}

/// Built-in bounding boxes, in output order.
pub fn default_sizes() -> Vec<SizeSpec> {
    vec![
        SizeSpec::new("thumbnail", 150, 150),
        SizeSpec::new("400w", 400, 400),
        SizeSpec::new("800w", 800, 800),
        SizeSpec::new("1200w", 1200, 1200),
    ]
}

/// The size column of one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeTier<'a> {
    /// Source dimensions, re-encoded.
    Full,
    /// Scaled down to fit a bounding box.
    Bounded(&'a SizeSpec),
}

impl SizeTier<'_> {
    pub fn name(&self) -> &str {
        match self {
            SizeTier::Full => FULL,
            SizeTier::Bounded(spec) => &spec.name,
        }
    }

    /// `None` for `full`, which never resizes.
    pub fn bounds(&self) -> Option<Bounds> {
        match self {
            SizeTier::Full => None,
            SizeTier::Bounded(spec) => Some(spec.bounds()),
        }
    }
}

/// One derived artifact to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell<'a> {
    pub codec: Codec,
    pub tier: SizeTier<'a>,
}

/// Declarative table of codecs × sizes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantMatrix {
    pub codecs: Vec<Codec>,
    pub sizes: Vec<SizeSpec>,
}

impl Default for VariantMatrix {
    fn default() -> Self {
        Self::new(default_codecs(), default_sizes())
    }
}

impl VariantMatrix {
    pub fn new(codecs: Vec<Codec>, sizes: Vec<SizeSpec>) -> Self {
        Self { codecs, sizes }
    }

    /// Size tiers of every derived codec: `full`, then each size.
    pub fn tiers(&self) -> impl Iterator<Item = SizeTier<'_>> {
        std::iter::once(SizeTier::Full).chain(self.sizes.iter().map(SizeTier::Bounded))
    }

    /// All derived cells in stable enumeration order.
    pub fn cells(&self) -> Vec<Cell<'_>> {
        self.codecs
            .iter()
            .flat_map(|&codec| self.tiers().map(move |tier| Cell { codec, tier }))
            .collect()
    }

    /// Artifacts a fully successful run produces, `original` included.
    pub fn artifact_count(&self) -> usize {
        1 + self.codecs.len() * (1 + self.sizes.len())
    }

    /// Check the tables can produce a valid, collision-free layout.
    pub fn validate(&self) -> Result<(), MatrixError> {
        if self.codecs.is_empty() {
            return Err(MatrixError::NoCodecs);
        }
        let mut seen_codecs = HashSet::new();
        for &codec in &self.codecs {
            if !seen_codecs.insert(codec) {
                return Err(MatrixError::DuplicateCodec(codec));
            }
        }

        let mut seen_sizes = HashSet::new();
        for size in &self.sizes {
            if !is_safe_segment(&size.name) {
                return Err(MatrixError::UnsafeSizeName(size.name.clone()));
            }
            if size.name == FULL || size.name == ORIGINAL {
                return Err(MatrixError::ReservedSizeName(size.name.clone()));
            }
            if !seen_sizes.insert(size.name.as_str()) {
                return Err(MatrixError::DuplicateSizeName(size.name.clone()));
            }
            if size.max_width == 0 || size.max_height == 0 {
                return Err(MatrixError::ZeroBounds {
                    name: size.name.clone(),
                    max_width: size.max_width,
                    max_height: size.max_height,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell_keys(matrix: &VariantMatrix) -> Vec<String> {
        matrix
            .cells()
            .iter()
            .map(|c| format!("{}/{}", c.codec, c.tier.name()))
            .collect()
    }

    #[test]
    fn default_matrix_has_eleven_artifacts() {
        let matrix = VariantMatrix::default();
        assert_eq!(matrix.artifact_count(), 11);
        assert_eq!(matrix.cells().len(), 10);
    }

    #[test]
    fn cells_are_codec_major_full_first() {
        assert_eq!(
            cell_keys(&VariantMatrix::default()),
            vec![
                "webp/full",
                "webp/thumbnail",
                "webp/400w",
                "webp/800w",
                "webp/1200w",
                "avif/full",
                "avif/thumbnail",
                "avif/400w",
                "avif/800w",
                "avif/1200w",
            ]
        );
    }

    #[test]
    fn cells_follow_configured_order() {
        let matrix = VariantMatrix::new(
            vec![Codec::Avif],
            vec![SizeSpec::new("small", 10, 10), SizeSpec::new("big", 99, 99)],
        );
        assert_eq!(cell_keys(&matrix), vec!["avif/full", "avif/small", "avif/big"]);
        assert_eq!(matrix.artifact_count(), 4);
    }

    #[test]
    fn full_tier_has_no_bounds() {
        assert_eq!(SizeTier::Full.bounds(), None);
        let spec = SizeSpec::new("400w", 400, 300);
        assert_eq!(SizeTier::Bounded(&spec).bounds(), Some(Bounds::new(400, 300)));
    }

    #[test]
    fn codec_names_are_lowercase() {
        assert_eq!(Codec::WebP.to_string(), "webp");
        assert_eq!(Codec::Avif.to_string(), "avif");
        assert_eq!(serde_json::to_string(&Codec::WebP).unwrap(), "\"webp\"");
    }

    #[test]
    fn default_matrix_validates() {
        assert_eq!(VariantMatrix::default().validate(), Ok(()));
    }

    #[test]
    fn validate_rejects_bad_tables() {
        let cases = [
            (VariantMatrix::new(vec![], default_sizes()), MatrixError::NoCodecs),
            (
                VariantMatrix::new(vec![Codec::WebP, Codec::WebP], vec![]),
                MatrixError::DuplicateCodec(Codec::WebP),
            ),
            (
                VariantMatrix::new(default_codecs(), vec![SizeSpec::new("full", 1, 1)]),
                MatrixError::ReservedSizeName("full".into()),
            ),
            (
                VariantMatrix::new(default_codecs(), vec![SizeSpec::new("../x", 1, 1)]),
                MatrixError::UnsafeSizeName("../x".into()),
            ),
            (
                VariantMatrix::new(
                    default_codecs(),
                    vec![SizeSpec::new("a", 1, 1), SizeSpec::new("a", 2, 2)],
                ),
                MatrixError::DuplicateSizeName("a".into()),
            ),
            (
                VariantMatrix::new(default_codecs(), vec![SizeSpec::new("a", 0, 5)]),
                MatrixError::ZeroBounds {
                    name: "a".into(),
                    max_width: 0,
                    max_height: 5,
                },
            ),
        ];
        for (matrix, expected) in cases {
            assert_eq!(matrix.validate(), Err(expected));
        }
    }
}
