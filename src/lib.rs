//! # ewa-splat: EWA surface splatting in Rust
//!
//! Renders oriented, colored point clouds into images. Every point is treated
//! as a small disc on its tangent plane carrying a Gaussian kernel; the kernel
//! is projected to screen space (Elliptical Weighted Average), accumulated per
//! pixel, grouped into surface layers by depth and normalized into a color.
//!
//! ## Architecture
//!
//! - `core`: points, cameras, projection math, color conversion
//! - `config`: user options and the validated `SplatConfig`
//! - `io`: PLY point clouds, coordinate files, PNG output
//! - `render`: projection, rasterization, depth resolution, compositing
//! - `error`: fatal `RenderError` and per-point `GeometryError`
//!
//! ## Example
//!
//! ```no_run
//! use ewa_splat::{render, RenderOptions};
//! use std::path::Path;
//!
//! let report = render(
//!     Path::new("bunny.ply"),
//!     Path::new("views.json"),
//!     Path::new("out"),
//!     &RenderOptions::default(),
//! )?;
//! println!("wrote {} images", report.outputs.len());
//! # Ok::<(), ewa_splat::RenderError>(())
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod io;
pub mod render;

pub use crate::config::{RenderOptions, SplatConfig};
pub use crate::core::{Camera, Point, PointCloud};
pub use crate::error::{GeometryError, RenderError};
pub use crate::render::{render, EwaRenderer, RenderReport, RenderStats};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
