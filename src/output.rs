//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Derive
//!
//! ```text
//! photo (jpeg 2000x1000)
//!     original → folder/photo/original.jpg
//!     webp/full: 2000x1000, 1843210 bytes
//!     webp/thumbnail: 150x75, 4102 bytes
//!     avif/full: FAILED (encode failed: avif encode failed: ...)
//!     ...
//! Wrote 10 artifacts, 1 failed
//! ```
//!
//! Cell lines appear in completion order, since cells are encoded in parallel.
//!
//! ## Check config
//!
//! ```text
//! Upload root: folder
//! Public prefix: /folder
//! Quality: 90
//! Artifacts: 11
//!     original
//!     webp: full, thumbnail (150x150), 400w (400x400), 800w (800x800), 1200w (1200x1200)
//!     avif: full, thumbnail (150x150), 400w (400x400), 800w (800x800), 1200w (1200x1200)
//! Accepted uploads: jpeg, png, tiff, webp
//! ```
//!
//! # Architecture
//!
//! Each output has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that does the I/O. Format functions are
//! pure and do no I/O.

use crate::config::PipelineConfig;
use crate::imaging::rust_backend::supported_source_formats;
use crate::matrix::{ORIGINAL, SizeTier};
use crate::pipeline::{CellOutcome, PipelineEvent};

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

// ============================================================================
// Derive progress
// ============================================================================

/// Format a single pipeline progress event as display lines.
pub fn format_pipeline_event(event: &PipelineEvent) -> Vec<String> {
    match event {
        PipelineEvent::Decoded {
            base_id,
            format,
            width,
            height,
        } => vec![format!("{base_id} ({format} {width}x{height})")],
        PipelineEvent::OriginalWritten { path, .. } => {
            vec![format!("{}{ORIGINAL} \u{2192} {}", indent(1), path.display())]
        }
        PipelineEvent::CellFinished {
            codec,
            size,
            outcome,
        } => {
            let line = match outcome {
                CellOutcome::Written {
                    width,
                    height,
                    byte_length,
                } => format!("{codec}/{size}: {width}x{height}, {byte_length} bytes"),
                CellOutcome::Failed { error } => format!("{codec}/{size}: FAILED ({error})"),
            };
            vec![format!("{}{line}", indent(1))]
        }
        PipelineEvent::Completed {
            artifacts,
            failures,
        } => {
            let wrote = format!("Wrote {}", plural(*artifacts, "artifact"));
            if *failures == 0 {
                vec![wrote]
            } else {
                vec![format!("{wrote}, {failures} failed")]
            }
        }
    }
}

/// Print a pipeline event to stderr, keeping stdout for the manifest.
pub fn print_pipeline_event(event: &PipelineEvent) {
    for line in format_pipeline_event(event) {
        eprintln!("{}", line);
    }
}

// ============================================================================
// Config check
// ============================================================================

/// Format the effective configuration and the variant matrix it yields.
pub fn format_matrix(config: &PipelineConfig) -> Vec<String> {
    let matrix = config.matrix();
    let mut lines = vec![
        format!("Upload root: {}", config.upload_root.display()),
        format!("Public prefix: {}", config.public_prefix),
        format!("Quality: {}", config.quality().value()),
        format!("Artifacts: {}", matrix.artifact_count()),
        format!("{}{ORIGINAL}", indent(1)),
    ];

    let tiers: Vec<String> = matrix
        .tiers()
        .map(|tier| match tier {
            SizeTier::Full => tier.name().to_string(),
            SizeTier::Bounded(spec) => {
                format!("{} ({}x{})", spec.name, spec.max_width, spec.max_height)
            }
        })
        .collect();
    let tiers = tiers.join(", ");
    for codec in &matrix.codecs {
        lines.push(format!("{}{codec}: {tiers}", indent(1)));
    }
    lines.push(format!(
        "Accepted uploads: {}",
        supported_source_formats().join(", ")
    ));
    lines
}

/// Print the config summary to stdout.
pub fn print_matrix(config: &PipelineConfig) {
    for line in format_matrix(config) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::{Codec, SizeSpec};

    #[test]
    fn indent_levels() {
        assert_eq!(indent(0), "");
        assert_eq!(indent(1), "    ");
        assert_eq!(indent(2), "        ");
    }

    // =========================================================================
    // Pipeline event formatting tests
    // =========================================================================

    #[test]
    fn format_decoded() {
        let event = PipelineEvent::Decoded {
            base_id: "photo".to_string(),
            format: "jpeg".to_string(),
            width: 2000,
            height: 1000,
        };
        assert_eq!(format_pipeline_event(&event), vec!["photo (jpeg 2000x1000)"]);
    }

    #[test]
    fn format_original_written() {
        let event = PipelineEvent::OriginalWritten {
            path: "folder/photo/original.jpg".into(),
            byte_length: 10,
        };
        assert_eq!(
            format_pipeline_event(&event),
            vec!["    original \u{2192} folder/photo/original.jpg"]
        );
    }

    #[test]
    fn format_cell_written() {
        let event = PipelineEvent::CellFinished {
            codec: Codec::WebP,
            size: "thumbnail".to_string(),
            outcome: CellOutcome::Written {
                width: 150,
                height: 75,
                byte_length: 4102,
            },
        };
        assert_eq!(
            format_pipeline_event(&event),
            vec!["    webp/thumbnail: 150x75, 4102 bytes"]
        );
    }

    #[test]
    fn format_cell_failed() {
        let event = PipelineEvent::CellFinished {
            codec: Codec::Avif,
            size: "full".to_string(),
            outcome: CellOutcome::Failed {
                error: "encode failed: boom".to_string(),
            },
        };
        assert_eq!(
            format_pipeline_event(&event),
            vec!["    avif/full: FAILED (encode failed: boom)"]
        );
    }

    #[test]
    fn format_completed() {
        let all = PipelineEvent::Completed {
            artifacts: 11,
            failures: 0,
        };
        assert_eq!(format_pipeline_event(&all), vec!["Wrote 11 artifacts"]);

        let partial = PipelineEvent::Completed {
            artifacts: 1,
            failures: 10,
        };
        assert_eq!(
            format_pipeline_event(&partial),
            vec!["Wrote 1 artifact, 10 failed"]
        );
    }

    // =========================================================================
    // Matrix formatting tests
    // =========================================================================

    #[test]
    fn format_default_matrix() {
        let lines = format_matrix(&PipelineConfig::default());
        assert_eq!(lines[0], "Upload root: folder");
        assert_eq!(lines[1], "Public prefix: /folder");
        assert_eq!(lines[2], "Quality: 90");
        assert_eq!(lines[3], "Artifacts: 11");
        assert_eq!(lines[4], "    original");
        assert_eq!(
            lines[5],
            "    webp: full, thumbnail (150x150), 400w (400x400), 800w (800x800), 1200w (1200x1200)"
        );
        assert!(lines[6].starts_with("    avif: full, thumbnail"));
        assert_eq!(lines[7], "Accepted uploads: jpeg, png, tiff, webp");
        assert_eq!(lines.len(), 8);
    }

    #[test]
    fn format_custom_matrix() {
        let mut config = PipelineConfig::default();
        config.images.codecs = vec![Codec::Avif];
        config.images.sizes = vec![SizeSpec::new("card", 600, 315)];

        let lines = format_matrix(&config);
        assert_eq!(lines[3], "Artifacts: 3");
        assert_eq!(lines[5], "    avif: full, card (600x315)");
    }
}
