//! EWA surface splatting (CPU implementation).
//!
//! - `project`: point + camera → screen-space footprint
//! - `rasterize`: footprints → per-pixel contributions, tile-parallel
//! - `resolve`: contributions → depth layers
//! - `composite`: visible layer → pixel, frame buffer → RGBA8
//! - `pipeline`: per-view renderer and file-level orchestration

pub mod accum;
pub mod composite;
pub mod pipeline;
pub mod project;
pub mod rasterize;
pub mod resolve;

pub use composite::{FrameBuffer, Pixel};
pub use pipeline::{
    render, render_views, EwaRenderer, RenderReport, RenderStats, RenderedView, SkipCounts,
};
pub use project::{project_point, Footprint, PixelRect};
