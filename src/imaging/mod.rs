//! Image processing in pure Rust, with no system libraries.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::ImageReader` with format sniffing |
//! | **Resize** | bounding-box fit + Lanczos3 |
//! | **Encode** | rav1e (AVIF), lossless WebP |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Quality and bounding-box types
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining calculations + backend

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{DecodeError, Dimensions, EncodeError, ImageBackend, SourceImage};
pub use calculations::{fit_within, scale_factor};
pub use operations::{decode_source, resize};
pub use params::{Bounds, Quality};
pub use rust_backend::RustBackend;
