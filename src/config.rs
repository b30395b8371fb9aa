//! Render options and the validated splatting configuration.
//!
//! `RenderOptions` is what callers (and option files) provide. It is checked
//! once by [`RenderOptions::validate`], which yields an immutable
//! [`SplatConfig`] that is passed by reference through projection,
//! rasterization, depth resolution and compositing.

use crate::error::RenderError;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The only supported reconstruction method.
pub const EWA_METHOD: &str = "ewa";

/// Gaussian falloff below which a pixel receives no contribution.
pub const DEFAULT_CUTOFF: f32 = 1e-2;

/// Minimum accumulated layer weight for a pixel to count as covered.
pub const DEFAULT_WEIGHT_EPSILON: f64 = 1e-10;

/// Points closer than this (camera-space z) are culled.
pub const DEFAULT_NEAR_PLANE: f32 = 0.01;

pub const DEFAULT_TILE_SIZE: u32 = 16;

pub const DEFAULT_MAX_FOOTPRINT_RADIUS: f32 = 1024.0;

/// User-facing render options.
///
/// Field names follow snake_case; the camelCase spellings are accepted as
/// aliases in option files.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Reconstruction method, must be `"ewa"`.
    pub method: String,

    /// World-space depth band treated as one surface.
    #[serde(alias = "surfaceThickness")]
    pub surface_thickness: f32,

    /// Variance (pixel²) added to every screen-space covariance.
    pub delta: f32,

    /// World-space standard deviation of the object-space kernel.
    #[serde(alias = "pointSize")]
    pub point_size: f32,

    /// Linear RGB color for untouched pixels. `None` keeps them transparent.
    pub background: Option<[f32; 3]>,

    /// Edge length of the square tiles used during accumulation.
    #[serde(alias = "tileSize")]
    pub tile_size: u32,

    /// Footprints with a larger half extent (pixels) are skipped.
    #[serde(alias = "maxFootprintRadius")]
    pub max_footprint_radius: f32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            method: EWA_METHOD.to_string(),
            surface_thickness: 0.1,
            delta: 1.0,
            point_size: 0.02,
            background: None,
            tile_size: DEFAULT_TILE_SIZE,
            max_footprint_radius: DEFAULT_MAX_FOOTPRINT_RADIUS,
        }
    }
}

impl RenderOptions {
    /// Load options from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, RenderError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            RenderError::config(format!("cannot read options file {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&text).map_err(|e| {
            RenderError::config(format!("invalid options file {}: {}", path.display(), e))
        })
    }

    /// Check every option and produce the configuration used by the pipeline.
    pub fn validate(&self) -> Result<SplatConfig, RenderError> {
        if !self.method.trim().eq_ignore_ascii_case(EWA_METHOD) {
            return Err(RenderError::config(format!(
                "unsupported method '{}' (only '{}' is available)",
                self.method, EWA_METHOD
            )));
        }

        if !(self.surface_thickness.is_finite() && self.surface_thickness > 0.0) {
            return Err(RenderError::config(format!(
                "surface_thickness must be a positive number, got {}",
                self.surface_thickness
            )));
        }
        if !(self.delta.is_finite() && self.delta >= 0.0) {
            return Err(RenderError::config(format!(
                "delta must be a non-negative number, got {}",
                self.delta
            )));
        }
        if !(self.point_size.is_finite() && self.point_size > 0.0) {
            return Err(RenderError::config(format!(
                "point_size must be a positive number, got {}",
                self.point_size
            )));
        }
        if self.tile_size == 0 {
            return Err(RenderError::config("tile_size must be at least 1"));
        }
        if !(self.max_footprint_radius.is_finite() && self.max_footprint_radius > 0.0) {
            return Err(RenderError::config(format!(
                "max_footprint_radius must be a positive number, got {}",
                self.max_footprint_radius
            )));
        }

        let background = match self.background {
            Some(rgb) => {
                if rgb.iter().any(|c| !(0.0..=1.0).contains(c)) {
                    return Err(RenderError::config(format!(
                        "background components must lie in [0, 1], got {:?}",
                        rgb
                    )));
                }
                Some(Vector3::new(rgb[0], rgb[1], rgb[2]))
            }
            None => None,
        };

        Ok(SplatConfig {
            surface_thickness: self.surface_thickness,
            delta: self.delta,
            point_size: self.point_size,
            cutoff: DEFAULT_CUTOFF,
            weight_epsilon: DEFAULT_WEIGHT_EPSILON,
            near_plane: DEFAULT_NEAR_PLANE,
            background,
            tile_size: self.tile_size,
            max_footprint_radius: self.max_footprint_radius,
        })
    }
}

/// Validated, immutable splatting parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SplatConfig {
    pub surface_thickness: f32,
    pub delta: f32,
    pub point_size: f32,
    pub cutoff: f32,
    pub weight_epsilon: f64,
    pub near_plane: f32,
    pub background: Option<Vector3<f32>>,
    pub tile_size: u32,
    pub max_footprint_radius: f32,
}

impl Default for SplatConfig {
    fn default() -> Self {
        let options = RenderOptions::default();
        Self {
            surface_thickness: options.surface_thickness,
            delta: options.delta,
            point_size: options.point_size,
            cutoff: DEFAULT_CUTOFF,
            weight_epsilon: DEFAULT_WEIGHT_EPSILON,
            near_plane: DEFAULT_NEAR_PLANE,
            background: None,
            tile_size: options.tile_size,
            max_footprint_radius: options.max_footprint_radius,
        }
    }
}
