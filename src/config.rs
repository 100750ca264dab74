//! Pipeline configuration.
//!
//! Handles loading, validating, and merging a `config.toml`. Stock defaults
//! are the base layer; a user file overrides only the keys it names.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! upload_root = "folder"      # Storage root for derivatives
//! public_prefix = "/folder"   # URL prefix that replaces upload_root in public URLs
//!
//! [images]
//! codecs = ["webp", "avif"]   # Derived codecs, in output order
//! quality = 90                # AVIF quality (1-100); WebP is lossless
//!
//! [[images.sizes]]            # Bounding boxes, in output order
//! name = "thumbnail"
//! max_width = 150
//! max_height = 150
//!
//! [processing]
//! max_workers = 4             # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse. Override just the values you want:
//!
//! ```toml
//! public_prefix = "https://cdn.example.com/media"
//! ```
//!
//! Arrays replace rather than merge: a file that sets `[[images.sizes]]`
//! replaces the whole size table. Unknown keys are rejected to catch typos early.

use crate::imaging::Quality;
use crate::layout::PathBuilder;
use crate::matrix::{Codec, MatrixError, SizeSpec, VariantMatrix, default_codecs, default_sizes};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
    #[error("Config validation error: {0}")]
    Matrix(#[from] MatrixError),
}

/// Configuration passed by reference into every pipeline call.
///
/// All fields have defaults. User config files need only specify the values
/// they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Storage root; every upload gets a directory below it.
    pub upload_root: PathBuf,
    /// Prefix substituted for `upload_root` in public URLs.
    pub public_prefix: String,
    /// Variant matrix and encoder settings.
    pub images: ImagesConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            upload_root: PathBuf::from("folder"),
            public_prefix: "/folder".to_string(),
            images: ImagesConfig::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.upload_root.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "upload_root must not be empty".into(),
            ));
        }
        if !(1..=100).contains(&self.images.quality) {
            return Err(ConfigError::Validation(
                "images.quality must be 1-100".into(),
            ));
        }
        self.matrix().validate()?;
        Ok(())
    }

    pub fn matrix(&self) -> VariantMatrix {
        VariantMatrix::new(self.images.codecs.clone(), self.images.sizes.clone())
    }

    pub fn quality(&self) -> Quality {
        Quality::new(self.images.quality)
    }

    pub fn path_builder(&self) -> PathBuilder {
        PathBuilder::new(self.upload_root.clone(), &self.public_prefix)
    }
}

/// Variant matrix and encoder settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    /// Derived codecs, in output order.
    pub codecs: Vec<Codec>,
    /// AVIF encoding quality (1 = worst, 100 = best).
    pub quality: u8,
    /// Bounding boxes, in output order.
    pub sizes: Vec<SizeSpec>,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            codecs: default_codecs(),
            quality: Quality::default().value(),
            sizes: default_sizes(),
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_workers: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)`, at least 1
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_workers
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// The base layer that user overrides are merged on top of.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(PipelineConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay, arrays included, replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<PipelineConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: PipelineConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from the file at `path`, or the defaults if there is none.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(path: &Path) -> Result<PipelineConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Upload Derivatives Configuration
# ================================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# Storage root. Each upload gets <upload_root>/<name>/.
upload_root = "folder"

# Public URL prefix. Replaces upload_root when building artifact URLs,
# e.g. "/folder/photo/webp/400w.webp". May be an absolute URL for a CDN.
public_prefix = "/folder"

# ---------------------------------------------------------------------------
# Derivatives
# ---------------------------------------------------------------------------
[images]
# Derived codecs, in output order. Each gets a "full" rendition plus one
# rendition per size below. Supported: "webp", "avif".
codecs = ["webp", "avif"]

# AVIF encoding quality (1 = worst, 100 = best). WebP is always lossless.
quality = 90

# Bounding boxes, in output order. Images are scaled down to fit, keeping
# their aspect ratio; they are never scaled up. Setting any [[images.sizes]]
# replaces this whole list.
[[images.sizes]]
name = "thumbnail"
max_width = 150
max_height = 150

[[images.sizes]]
name = "400w"
max_width = 400
max_height = 400

[[images.sizes]]
name = "800w"
max_width = 800
max_height = 800

[[images.sizes]]
name = "1200w"
max_width = 1200
max_height = 1200

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel encode workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_workers = 4
"##
}
