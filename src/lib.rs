//! # Upload Derivatives
//!
//! Turns one uploaded image into a fixed set of web-ready derivatives: the
//! upload itself, stored verbatim, plus a re-encoding in every configured
//! codec at full size and at every configured bounding box.
//!
//! ```rust,no_run
//! use upload_derivatives::config::PipelineConfig;
//! use upload_derivatives::pipeline::generate_derivatives;
//!
//! let config = PipelineConfig::default();
//! let bytes = std::fs::read("photo.jpg")?;
//! let manifest = generate_derivatives(&config, "photo.jpg", &bytes)?;
//! println!("{}", manifest.original.public_url); // /folder/photo/original.jpg
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`pipeline`] | Orchestrator: decode once, write the original, fan out the derived cells, collect the manifest |
//! | [`matrix`] | The codec × size table and its stable enumeration order |
//! | [`layout`] | Filename → base identifier, and the storage path / public URL of every artifact |
//! | [`manifest`] | The per-upload result: artifacts in matrix order plus per-cell failures |
//! | [`imaging`] | Pure-Rust decode, bounding-box resize, WebP/AVIF encode |
//! | [`storage`] | `Storage` trait and atomic local-disk implementation |
//! | [`config`] | `config.toml` loading, merging over stock defaults, and validation |
//! | [`output`] | CLI output formatting for progress events and config checks |
//!
//! # Design Decisions
//!
//! ## The Layout Is the Contract
//!
//! Frontends build `<picture>` sources straight from
//! `<prefix>/<name>/<codec>/<size>.<codec>` without reading the manifest, so
//! paths, size names and codec directory names are fixed. Two uploads with the
//! same filename stem share a directory and the later one wins.
//!
//! ## Partial Success Is Success
//!
//! Once the original is stored the upload is usable, so a derived cell that
//! fails (an encoder rejecting one buffer, a full disk for one file) is
//! recorded in [`manifest::Manifest::failures`] instead of failing the call.
//! Callers that want all-or-nothing check [`manifest::Manifest::is_complete`];
//! the CLI does so under `--strict`.
//!
//! ## Nothing Written Before Decode
//!
//! Bytes that do not decode never reach storage. Only after a successful
//! decode is the original written, and only after that are derivatives
//! encoded.
//!
//! ## Pure-Rust Imaging
//!
//! The [`imaging`] module uses the `image` crate for decoding, Lanczos3
//! resampling and encoding (lossless WebP, AVIF through `rav1e`). No system
//! libraries, so the binary is self-contained.

pub mod config;
pub mod imaging;
pub mod layout;
pub mod manifest;
pub mod matrix;
pub mod output;
pub mod pipeline;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_helpers;
