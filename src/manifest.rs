//! The manifest returned for one upload.
//!
//! ```json
//! {
//!   "base_id": "photo",
//!   "source": { "format": "jpeg", "width": 2000, "height": 1000, "byte_length": 483122 },
//!   "original": { "codec": "original", "size": "full", "public_url": "/folder/photo/original.jpg", ... },
//!   "versions": {
//!     "webp": { "full": { ... }, "thumbnail": { ... }, "400w": { ... }, ... },
//!     "avif": { ... }
//!   },
//!   "failures": [ { "codec": "avif", "size": "full", "error": "encode failed: ..." } ]
//! }
//! ```
//!
//! `versions` keeps the variant-matrix enumeration order, so two runs over the
//! same upload serialize identically. `failures` is omitted when empty.

use crate::imaging::Dimensions;
use crate::layout::ArtifactLocation;
use crate::matrix::Codec;
use crate::pipeline::CellError;
use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt::Display;
use std::path::PathBuf;

/// One written file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    /// `"original"` or a derived codec name.
    pub codec: String,
    pub size: String,
    pub storage_path: PathBuf,
    pub public_url: String,
    pub byte_length: u64,
    pub width: u32,
    pub height: u32,
    /// Hex SHA-256 of the written bytes, usable as an ETag.
    pub sha256: String,
}

impl Artifact {
    pub fn new(
        codec: &str,
        size: &str,
        location: ArtifactLocation,
        bytes: &[u8],
        dimensions: Dimensions,
    ) -> Self {
        Self {
            codec: codec.to_string(),
            size: size.to_string(),
            storage_path: location.storage_path,
            public_url: location.public_url,
            byte_length: bytes.len() as u64,
            width: dimensions.width,
            height: dimensions.height,
            sha256: format!("{:x}", Sha256::digest(bytes)),
        }
    }
}

/// What was uploaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceInfo {
    pub format: String,
    pub width: u32,
    pub height: u32,
    pub byte_length: u64,
}

/// A derived cell that could not be produced.
#[derive(Debug, Serialize)]
pub struct CellFailure {
    pub codec: Codec,
    pub size: String,
    #[serde(serialize_with = "serialize_display")]
    pub error: CellError,
}

fn serialize_display<T: Display, S: Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

/// Every artifact produced for one upload, plus every cell that failed.
#[derive(Debug, Serialize)]
pub struct Manifest {
    pub base_id: String,
    pub source: SourceInfo,
    pub original: Artifact,
    /// codec → size name → artifact, in matrix order. Failed cells are absent.
    pub versions: IndexMap<Codec, IndexMap<String, Artifact>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<CellFailure>,
}

impl Manifest {
    /// Look up one derived artifact.
    pub fn get(&self, codec: Codec, size: &str) -> Option<&Artifact> {
        self.versions.get(&codec)?.get(size)
    }

    /// All artifacts, `original` first, then derived ones in matrix order.
    pub fn artifacts(&self) -> impl Iterator<Item = &Artifact> {
        std::iter::once(&self.original).chain(self.versions.values().flat_map(|sizes| sizes.values()))
    }

    pub fn artifact_count(&self) -> usize {
        self.artifacts().count()
    }

    /// `true` when no cell failed.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}
