//! Per-view rendering and the file-level orchestration around it.
//!
//! One view goes through three stages:
//!
//! 1. project every point (parallel over points, order preserved)
//! 2. per tile, in parallel: accumulate its footprints, then resolve and
//!    composite its pixels once the tile's accumulation is complete
//! 3. stitch the tiles into a [`FrameBuffer`]
//!
//! Only the tiles currently being worked on hold accumulation buffers.

use crate::config::{RenderOptions, SplatConfig};
use crate::core::{Camera, PointCloud};
use crate::error::{GeometryError, RenderError};
use crate::io::{load_point_cloud, load_views, view_file_name, write_png_atomic};
use crate::render::accum::TileBuffer;
use crate::render::composite::{composite_cell, FrameBuffer, Pixel};
use crate::render::project::{project_point, Footprint, PixelRect};
use crate::render::rasterize::{render_tiles, TileGrid};
use image::RgbaImage;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Points skipped during projection, by reason.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SkipCounts {
    pub behind_camera: usize,
    pub outside_frustum: usize,
    pub degenerate_normal: usize,
    pub invalid_scale: usize,
    pub singular_covariance: usize,
    pub non_finite: usize,
    pub footprint_too_large: usize,
}

impl SkipCounts {
    pub fn record(&mut self, err: GeometryError) {
        let slot = match err {
            GeometryError::BehindCamera => &mut self.behind_camera,
            GeometryError::OutsideFrustum => &mut self.outside_frustum,
            GeometryError::DegenerateNormal => &mut self.degenerate_normal,
            GeometryError::InvalidScale => &mut self.invalid_scale,
            GeometryError::SingularCovariance => &mut self.singular_covariance,
            GeometryError::NonFinite => &mut self.non_finite,
            GeometryError::FootprintTooLarge => &mut self.footprint_too_large,
        };
        *slot += 1;
    }

    pub fn total(&self) -> usize {
        self.behind_camera
            + self.outside_frustum
            + self.degenerate_normal
            + self.invalid_scale
            + self.singular_covariance
            + self.non_finite
            + self.footprint_too_large
    }
}

/// Statistics for one rendered view.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub points: usize,
    pub projected: usize,
    pub skipped: SkipCounts,
    pub contributions: usize,
    pub touched_pixels: usize,
}

/// Result of rendering one camera.
#[derive(Clone, Debug)]
pub struct RenderedView {
    pub frame: FrameBuffer,
    pub stats: RenderStats,
}

impl RenderedView {
    pub fn to_image(&self, background: Option<nalgebra::Vector3<f32>>) -> RgbaImage {
        self.frame.to_rgba8(background)
    }
}

/// CPU EWA splatting renderer.
///
/// Holds only the immutable configuration, so one renderer can be shared
/// across views.
#[derive(Clone, Debug)]
pub struct EwaRenderer {
    config: SplatConfig,
}

impl EwaRenderer {
    pub fn new(config: SplatConfig) -> Self {
        Self { config }
    }

    /// Project all points. Footprints keep point order; failures are counted.
    pub fn project_all(&self, cloud: &PointCloud, camera: &Camera) -> (Vec<Footprint>, SkipCounts) {
        let results: Vec<Result<Footprint, GeometryError>> = cloud
            .as_slice()
            .par_iter()
            .map(|p| project_point(p, camera, &self.config))
            .collect();

        let mut skipped = SkipCounts::default();
        let mut footprints = Vec::with_capacity(results.len());
        for result in results {
            match result {
                Ok(fp) => footprints.push(fp),
                Err(err) => skipped.record(err),
            }
        }
        (footprints, skipped)
    }

    /// Render one view into a frame buffer.
    #[tracing::instrument(skip_all, fields(width = camera.width, height = camera.height))]
    pub fn render(&self, cloud: &PointCloud, camera: &Camera) -> RenderedView {
        let (footprints, skipped) = self.project_all(cloud, camera);
        if skipped.total() > 0 {
            debug!(?skipped, "points skipped during projection");
        }
        if skipped.footprint_too_large > 0 {
            warn!(
                count = skipped.footprint_too_large,
                max_radius = self.config.max_footprint_radius,
                "points dropped for oversized footprints; surfaces behind them may show through"
            );
        }

        let grid = TileGrid::new(camera.width, camera.height, self.config.tile_size);
        let resolved: Vec<ResolvedTile> =
            render_tiles(&grid, &footprints, self.config.cutoff, |tile| self.resolve_tile(tile));
        let contributions: usize = resolved.iter().map(|t| t.contributions).sum();
        debug!(
            footprints = footprints.len(),
            tiles = resolved.len(),
            contributions,
            "tiles resolved"
        );

        let mut frame = FrameBuffer::new(camera.width, camera.height);
        for tile in resolved {
            let mut it = tile.pixels.into_iter();
            for y in tile.rect.min_y..=tile.rect.max_y {
                for x in tile.rect.min_x..=tile.rect.max_x {
                    if let Some(pixel) = it.next() {
                        frame.set(x, y, pixel);
                    }
                }
            }
        }

        let stats = RenderStats {
            points: cloud.len(),
            projected: footprints.len(),
            skipped,
            contributions,
            touched_pixels: frame.touched_count(),
        };
        RenderedView { frame, stats }
    }

    fn resolve_tile(&self, mut tile: TileBuffer) -> ResolvedTile {
        let thickness = self.config.surface_thickness;
        let epsilon = self.config.weight_epsilon;
        let contributions = tile.contribution_count();
        let pixels = tile
            .cells_mut()
            .iter_mut()
            .map(|cell| composite_cell(cell, thickness, epsilon))
            .collect();
        ResolvedTile {
            rect: tile.rect,
            pixels,
            contributions,
        }
    }
}

/// Composited pixels of one tile, row-major within `rect`.
struct ResolvedTile {
    rect: PixelRect,
    pixels: Vec<Pixel>,
    contributions: usize,
}

/// Paths and statistics of a finished render.
#[derive(Clone, Debug, Default)]
pub struct RenderReport {
    pub outputs: Vec<PathBuf>,
    pub stats: Vec<RenderStats>,
}

/// Render every camera and write `<stem>_<index>.png` into `output_dir`.
///
/// `output_dir` must exist.
pub fn render_views(
    cloud: &PointCloud,
    cameras: &[Camera],
    output_dir: &Path,
    stem: &str,
    config: &SplatConfig,
) -> Result<RenderReport, RenderError> {
    let renderer = EwaRenderer::new(*config);
    let mut report = RenderReport::default();

    for (index, camera) in cameras.iter().enumerate() {
        let view = renderer.render(cloud, camera);
        let path = output_dir.join(view_file_name(stem, index));

        write_png_atomic(&view.to_image(config.background), &path)
            .map_err(|e| RenderError::io(format!("writing {}", path.display()), e))?;

        info!(
            view = index,
            path = %path.display(),
            projected = view.stats.projected,
            skipped = view.stats.skipped.total(),
            touched = view.stats.touched_pixels,
            "view rendered"
        );
        report.outputs.push(path);
        report.stats.push(view.stats);
    }

    Ok(report)
}

/// Render a point cloud file from every view of a coordinate file.
///
/// All validation and loading happen before the first image is written.
#[tracing::instrument(skip_all, fields(model = %model_path.display(), coords = %coords_path.display()))]
pub fn render(
    model_path: &Path,
    coords_path: &Path,
    output_dir: &Path,
    options: &RenderOptions,
) -> Result<RenderReport, RenderError> {
    let config = options.validate()?;

    require_non_empty_file("model", model_path)?;
    require_non_empty_file("coordinate", coords_path)?;

    let cloud =
        load_point_cloud(model_path).map_err(|e| RenderError::load("model", model_path, e))?;
    if cloud.is_empty() {
        return Err(RenderError::input(format!(
            "model {} contains no points",
            model_path.display()
        )));
    }

    let cameras = load_views(coords_path)
        .map_err(|e| RenderError::load("coordinate file", coords_path, e))?;
    if cameras.is_empty() {
        return Err(RenderError::input(format!(
            "coordinate file {} contains no views",
            coords_path.display()
        )));
    }

    std::fs::create_dir_all(output_dir).map_err(|e| {
        RenderError::io(format!("creating output directory {}", output_dir.display()), e)
    })?;

    let stem = model_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("render");

    if let Some((min, max)) = cloud.bounds() {
        info!(
            points = cloud.len(),
            views = cameras.len(),
            bounds_min = ?min.as_slice(),
            bounds_max = ?max.as_slice(),
            "rendering"
        );
    }
    render_views(&cloud, &cameras, output_dir, stem, &config)
}

fn require_non_empty_file(what: &str, path: &Path) -> Result<(), RenderError> {
    let metadata = std::fs::metadata(path).map_err(|e| {
        RenderError::input(format!("{} file {} is not readable: {}", what, path.display(), e))
    })?;
    if !metadata.is_file() {
        return Err(RenderError::input(format!(
            "{} path {} is not a file",
            what,
            path.display()
        )));
    }
    if metadata.len() == 0 {
        return Err(RenderError::input(format!(
            "{} file {} is empty",
            what,
            path.display()
        )));
    }
    Ok(())
}
