//! Storage layout and public URLs for derivatives.
//!
//! Every derivative of one upload lives under a directory named after the
//! upload's base identifier (the filename stem):
//!
//! ```text
//! <upload_root>/<base_id>/original.<ext>
//! <upload_root>/<base_id>/<codec>/full.<codec>
//! <upload_root>/<base_id>/<codec>/<size>.<codec>
//! ```
//!
//! Public URLs mirror the storage path with the configured public prefix in
//! place of `<upload_root>`. This layout is a compatibility contract: the
//! frontend builds `<picture>` sources from it.
//!
//! Two uploads with the same stem share a directory, so the second overwrites
//! the first.

use crate::matrix::{Codec, ORIGINAL};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LayoutError {
    #[error("invalid base identifier {0:?}")]
    InvalidIdentifier(String),
}

/// Whether `segment` can be used as a single path component.
pub fn is_safe_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment
            .chars()
            .any(|c| c == '/' || c == '\\' || c.is_control())
}

/// Storage-key stem shared by every derivative of one upload.
///
/// Guaranteed non-empty and safe to use as a directory name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BaseId(String);

impl BaseId {
    pub fn new(id: impl Into<String>) -> Result<Self, LayoutError> {
        let id = id.into();
        if !is_safe_segment(&id) {
            return Err(LayoutError::InvalidIdentifier(id));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An uploaded filename split into base identifier and original extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadName {
    pub base_id: BaseId,
    /// Lowercased extension including the dot (`".jpg"`), or empty.
    pub extension: String,
}

/// Split an uploaded filename into its base identifier and extension.
///
/// Any client-supplied directory part (`/` or `\` separated) is dropped.
/// The extension is everything from the last dot, unless that dot starts
/// or ends the name:
/// - `"photo.JPG"` → `photo` + `".jpg"`
/// - `"archive.tar.gz"` → `archive.tar` + `".gz"`
/// - `".hidden"` → `.hidden` + `""`
/// - `"C:\fakepath\photo.png"` → `photo` + `".png"`
///
/// Control characters in either part are rejected.
pub fn parse_upload_name(filename: &str) -> Result<UploadName, LayoutError> {
    let name = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let (stem, extension) = match name.rfind('.') {
        Some(dot) if dot > 0 && dot + 1 < name.len() => (&name[..dot], &name[dot..]),
        _ => (name, ""),
    };
    if extension.chars().any(char::is_control) {
        return Err(LayoutError::InvalidIdentifier(name.to_string()));
    }
    Ok(UploadName {
        base_id: BaseId::new(stem)?,
        extension: extension.to_lowercase(),
    })
}

/// Where one artifact is stored and how it is served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLocation {
    pub storage_path: PathBuf,
    pub public_url: String,
}

/// Maps (base identifier, variant) to storage paths and public URLs.
#[derive(Debug, Clone)]
pub struct PathBuilder {
    upload_root: PathBuf,
    public_prefix: String,
}

impl PathBuilder {
    pub fn new(upload_root: impl Into<PathBuf>, public_prefix: &str) -> Self {
        Self {
            upload_root: upload_root.into(),
            public_prefix: public_prefix.trim_end_matches('/').to_string(),
        }
    }

    pub fn upload_root(&self) -> &Path {
        &self.upload_root
    }

    /// Directory holding every derivative of `base`.
    pub fn base_dir(&self, base: &BaseId) -> PathBuf {
        self.upload_root.join(base.as_str())
    }

    /// Location of the verbatim upload.
    pub fn original(&self, base: &BaseId, extension: &str) -> ArtifactLocation {
        self.locate(base, &[format!("{ORIGINAL}{extension}").as_str()])
    }

    /// Location of one derived cell (`size` is `"full"` or a size name).
    pub fn derived(&self, base: &BaseId, codec: Codec, size: &str) -> ArtifactLocation {
        let codec = codec.name();
        self.locate(base, &[codec, format!("{size}.{codec}").as_str()])
    }

    fn locate(&self, base: &BaseId, segments: &[&str]) -> ArtifactLocation {
        let mut storage_path = self.base_dir(base);
        let mut public_url = format!("{}/{}", self.public_prefix, base);
        for segment in segments {
            storage_path.push(segment);
            public_url.push('/');
            public_url.push_str(segment);
        }
        ArtifactLocation {
            storage_path,
            public_url,
        }
    }
}
