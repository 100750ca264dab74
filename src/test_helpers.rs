//! Shared test utilities for manifest assertions.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let manifest = generate_derivatives_with(&backend, &storage, &config, "photo.jpg", b"x", None)?;
//!
//! assert_eq!(dims(artifact(&manifest, Codec::WebP, "thumbnail")), (150, 75));
//! assert_eq!(artifact_keys(&manifest)[0], "original/full");
//! ```

use crate::manifest::{Artifact, Manifest};
use crate::matrix::Codec;

// =========================================================================
// Manifest lookups: panics with a clear message on miss
// =========================================================================

/// Find a derived artifact. Panics if the cell is missing.
pub fn artifact<'a>(manifest: &'a Manifest, codec: Codec, size: &str) -> &'a Artifact {
    manifest.get(codec, size).unwrap_or_else(|| {
        let keys = artifact_keys(manifest);
        let failed: Vec<String> = manifest
            .failures
            .iter()
            .map(|f| format!("{}/{}: {}", f.codec, f.size, f.error))
            .collect();
        panic!("artifact '{codec}/{size}' not found. Available: {keys:?}. Failed: {failed:?}")
    })
}

// =========================================================================
// Bulk extractors
// =========================================================================

/// `codec/size` of every artifact, in manifest order.
pub fn artifact_keys(manifest: &Manifest) -> Vec<String> {
    manifest
        .artifacts()
        .map(|a| format!("{}/{}", a.codec, a.size))
        .collect()
}

/// `(width, height)` of an artifact.
pub fn dims(artifact: &Artifact) -> (u32, u32) {
    (artifact.width, artifact.height)
}
