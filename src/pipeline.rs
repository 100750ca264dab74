//! The derivative pipeline: one upload in, one [`Manifest`] out.
//!
//! ```text
//! Decoding ──► Writing(original) ──► Writing(cells, in parallel) ──► Complete
//!    │               │
//!    └──► Failed ◄───┘
//! ```
//!
//! The configuration is validated and decoding happens exactly once before
//! anything is written, so a bad config or a bad upload leaves storage
//! untouched. The verbatim original is written next. If that fails the whole
//! call fails; a base directory this call created is removed best-effort,
//! while one holding an earlier upload is left as it was.
//!
//! Each bounding box is resampled once and the buffer is shared by every codec
//! that needs it. The derived cells then fan out over rayon. A cell that fails
//! to encode or write is recorded in [`Manifest::failures`] and its path is
//! cleared, so a derivative from an earlier upload is never left behind; the
//! other cells carry on. Results fan back in to the manifest in variant-matrix
//! order, regardless of which worker finished first.
//!
//! Progress is reported through an optional channel of [`PipelineEvent`]s, the
//! same way the CLI's printer thread consumes it.

use crate::config::{ConfigError, PipelineConfig};
use crate::imaging::{
    DecodeError, Dimensions, EncodeError, ImageBackend, Quality, RustBackend, decode_source,
    resize,
};
use crate::layout::{BaseId, LayoutError, PathBuilder, parse_upload_name};
use crate::manifest::{Artifact, CellFailure, Manifest, SourceInfo};
use crate::matrix::{Cell, Codec, FULL, ORIGINAL, SizeTier};
use crate::storage::{LocalStorage, Storage};
use image::DynamicImage;
use indexmap::IndexMap;
use rayon::prelude::*;
use std::borrow::Cow;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{debug, info, info_span, warn};

/// A failure that aborts the whole call. No manifest is produced.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    InvalidIdentifier(#[from] LayoutError),
    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),
    #[error("failed to write {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
}

/// A failure local to one derived cell.
#[derive(Error, Debug)]
pub enum CellError {
    #[error("encode failed: {0}")]
    Encode(#[from] EncodeError),
    #[error("write failed: {0}")]
    Write(#[from] io::Error),
}

/// Result of one derived cell, as reported to progress listeners.
#[derive(Debug, Clone, PartialEq)]
pub enum CellOutcome {
    Written {
        width: u32,
        height: u32,
        byte_length: u64,
    },
    Failed {
        error: String,
    },
}

/// Progress events emitted while a call runs.
///
/// `CellFinished` arrives in completion order, which varies between runs.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    Decoded {
        base_id: String,
        format: String,
        width: u32,
        height: u32,
    },
    OriginalWritten {
        path: PathBuf,
        byte_length: u64,
    },
    CellFinished {
        codec: Codec,
        size: String,
        outcome: CellOutcome,
    },
    Completed {
        artifacts: usize,
        failures: usize,
    },
}

/// Run the pipeline with the pure-Rust codecs on local disk.
pub fn generate_derivatives(
    config: &PipelineConfig,
    filename: &str,
    content: &[u8],
) -> Result<Manifest, PipelineError> {
    generate_derivatives_with(
        &RustBackend::new(),
        &LocalStorage::new(),
        config,
        filename,
        content,
        None,
    )
}

/// Run the pipeline against injected collaborators.
pub fn generate_derivatives_with(
    backend: &impl ImageBackend,
    storage: &impl Storage,
    config: &PipelineConfig,
    filename: &str,
    content: &[u8],
    events: Option<Sender<PipelineEvent>>,
) -> Result<Manifest, PipelineError> {
    let _span = info_span!("derive", filename).entered();

    config.validate()?;
    let name = parse_upload_name(filename)?;
    let base = name.base_id;

    let source = decode_source(backend, content)?;
    let source_dims = source.dimensions();
    info!(
        base_id = %base,
        format = %source.format,
        width = source_dims.width,
        height = source_dims.height,
        "decoded upload"
    );
    emit(
        &events,
        PipelineEvent::Decoded {
            base_id: base.to_string(),
            format: source.format.clone(),
            width: source_dims.width,
            height: source_dims.height,
        },
    );

    let paths = config.path_builder();
    let original_location = paths.original(&base, &name.extension);
    let base_dir = paths.base_dir(&base);
    // A failed lookup counts as existing.
    let creates_base_dir = !storage.exists(&base_dir).unwrap_or(true);
    if let Err(source) = storage.write(&original_location.storage_path, content) {
        if creates_base_dir {
            remove_best_effort(storage, &base_dir);
        }
        return Err(PipelineError::Io {
            path: original_location.storage_path,
            source,
        });
    }
    emit(
        &events,
        PipelineEvent::OriginalWritten {
            path: original_location.storage_path.clone(),
            byte_length: content.len() as u64,
        },
    );
    let original = Artifact::new(ORIGINAL, FULL, original_location, content, source_dims);

    let matrix = config.matrix();
    let quality = config.quality();

    let renditions: HashMap<&str, Cow<'_, DynamicImage>> = matrix
        .sizes
        .par_iter()
        .map(|size| (size.name.as_str(), resize(&source.pixels, size.bounds())))
        .collect();
    debug!(count = renditions.len(), "resized renditions");

    let cells = matrix.cells();
    let outcomes: Vec<(Cell<'_>, Result<Artifact, CellError>)> = cells
        .par_iter()
        .map(|&cell| {
            let pixels = match cell.tier {
                SizeTier::Full => &source.pixels,
                SizeTier::Bounded(spec) => renditions
                    .get(spec.name.as_str())
                    .map_or(&source.pixels, |rendition| &**rendition),
            };
            let result = derive_cell(backend, storage, &paths, &base, cell, pixels, quality);
            emit(&events, cell_finished(cell, &result));
            (cell, result)
        })
        .collect();

    let mut versions: IndexMap<Codec, IndexMap<String, Artifact>> = matrix
        .codecs
        .iter()
        .map(|&codec| (codec, IndexMap::new()))
        .collect();
    let mut failures = Vec::new();
    for (cell, result) in outcomes {
        let size = cell.tier.name().to_string();
        match result {
            Ok(artifact) => {
                versions.entry(cell.codec).or_default().insert(size, artifact);
            }
            Err(error) => failures.push(CellFailure {
                codec: cell.codec,
                size,
                error,
            }),
        }
    }

    let manifest = Manifest {
        base_id: base.to_string(),
        source: SourceInfo {
            format: source.format,
            width: source_dims.width,
            height: source_dims.height,
            byte_length: source.byte_length,
        },
        original,
        versions,
        failures,
    };
    info!(
        artifacts = manifest.artifact_count(),
        failures = manifest.failures.len(),
        "derivatives complete"
    );
    emit(
        &events,
        PipelineEvent::Completed {
            artifacts: manifest.artifact_count(),
            failures: manifest.failures.len(),
        },
    );
    Ok(manifest)
}

/// Encode and store one cell. On failure the cell's path is cleared.
fn derive_cell(
    backend: &impl ImageBackend,
    storage: &impl Storage,
    paths: &PathBuilder,
    base: &BaseId,
    cell: Cell<'_>,
    pixels: &DynamicImage,
    quality: Quality,
) -> Result<Artifact, CellError> {
    let size = cell.tier.name();
    let location = paths.derived(base, cell.codec, size);

    let written = backend
        .encode(pixels, cell.codec, quality)
        .map_err(CellError::from)
        .and_then(|bytes| {
            storage.write(&location.storage_path, &bytes)?;
            Ok(bytes)
        });

    match written {
        Ok(bytes) => {
            debug!(codec = %cell.codec, size, bytes = bytes.len(), "wrote derivative");
            Ok(Artifact::new(
                cell.codec.name(),
                size,
                location,
                &bytes,
                Dimensions::of(pixels),
            ))
        }
        Err(error) => {
            warn!(codec = %cell.codec, size, %error, "derivative failed");
            remove_best_effort(storage, &location.storage_path);
            Err(error)
        }
    }
}

fn cell_finished(cell: Cell<'_>, result: &Result<Artifact, CellError>) -> PipelineEvent {
    let outcome = match result {
        Ok(artifact) => CellOutcome::Written {
            width: artifact.width,
            height: artifact.height,
            byte_length: artifact.byte_length,
        },
        Err(error) => CellOutcome::Failed {
            error: error.to_string(),
        },
    };
    PipelineEvent::CellFinished {
        codec: cell.codec,
        size: cell.tier.name().to_string(),
        outcome,
    }
}

fn remove_best_effort(storage: &impl Storage, path: &Path) {
    if let Err(error) = storage.delete(path) {
        warn!(path = %path.display(), %error, "cleanup failed");
    }
}

fn emit(events: &Option<Sender<PipelineEvent>>, event: PipelineEvent) {
    if let Some(tx) = events {
        // A dropped receiver only means nobody is listening.
        tx.send(event).ok();
    }
}
