//! Projector: point + camera → screen-space EWA footprint.
//!
//! Each point is a small disc on its tangent plane carrying an isotropic
//! Gaussian of standard deviation `point_size * point.scale`. The disc's 3D
//! covariance is carried to screen space with the local affine approximation
//! of the projection (its Jacobian), then convolved with the low-pass filter
//! `delta * I`:
//!
//! ```text
//! V = r² (u uᵀ + v vᵀ)        tangent-plane kernel, camera space
//! Σ = J V Jᵀ + δ I            screen-space resampling kernel
//! ```
//!
//! The conic Σ⁻¹ and the normalization 1 / (2π √det Σ) are precomputed so the
//! rasterizer only evaluates a quadratic form per pixel.

use crate::config::SplatConfig;
use crate::core::{invert_symmetric_2x2, tangent_frame, Camera, Point};
use crate::error::GeometryError;
use nalgebra::{Matrix2, Vector2, Vector3};
use std::f32::consts::PI;

/// Inclusive pixel rectangle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRect {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl PixelRect {
    pub fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    pub fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }

    pub fn area(&self) -> usize {
        self.width() as usize * self.height() as usize
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    pub fn intersect(&self, other: &PixelRect) -> Option<PixelRect> {
        let rect = PixelRect {
            min_x: self.min_x.max(other.min_x),
            min_y: self.min_y.max(other.min_y),
            max_x: self.max_x.min(other.max_x),
            max_y: self.max_y.min(other.max_y),
        };
        (rect.min_x <= rect.max_x && rect.min_y <= rect.max_y).then_some(rect)
    }
}

/// A point's projected splat for one camera.
#[derive(Clone, Debug, PartialEq)]
pub struct Footprint {
    /// Center in pixel coordinates
    pub center: Vector2<f32>,

    /// Screen-space covariance Σ (pixel²), including the low-pass term
    pub covariance: Matrix2<f32>,

    /// Σ⁻¹
    pub conic: Matrix2<f32>,

    /// 1 / (2π √det Σ)
    pub normalization: f32,

    /// Camera-space depth of the point
    pub depth: f32,

    /// Unclipped half extents of the cutoff ellipse's bounding box (pixels)
    pub extent: Vector2<f32>,

    /// Pixels whose centers may lie inside the cutoff ellipse, clipped to the image
    pub bounds: PixelRect,

    /// Linear RGB color of the source point
    pub color: Vector3<f32>,
}

impl Footprint {
    /// Unnormalized Gaussian falloff exp(-½ dᵀ Σ⁻¹ d) at the center of pixel (x, y).
    pub fn falloff_at(&self, x: u32, y: u32) -> f32 {
        let dx = x as f32 + 0.5 - self.center.x;
        let dy = y as f32 + 0.5 - self.center.y;
        let q = self.conic[(0, 0)] * dx * dx
            + 2.0 * self.conic[(0, 1)] * dx * dy
            + self.conic[(1, 1)] * dy * dy;
        (-0.5 * q).exp()
    }

    /// Normalized kernel weight at the center of pixel (x, y).
    pub fn weight_at(&self, x: u32, y: u32) -> f32 {
        self.normalization * self.falloff_at(x, y)
    }
}

/// Mahalanobis radius at which the falloff drops to `cutoff`.
pub fn cutoff_radius(cutoff: f32) -> f32 {
    (2.0 * (1.0 / cutoff).ln()).sqrt()
}

/// Project one point into a footprint, or report why it cannot be splatted.
pub fn project_point(
    point: &Point,
    camera: &Camera,
    config: &SplatConfig,
) -> Result<Footprint, GeometryError> {
    let p_cam = camera.world_to_camera(&point.position);
    if p_cam.iter().any(|v| !v.is_finite()) {
        return Err(GeometryError::NonFinite);
    }
    if p_cam.z <= config.near_plane {
        return Err(GeometryError::BehindCamera);
    }

    let (u, v) = tangent_frame(&point.normal).ok_or(GeometryError::DegenerateNormal)?;

    let radius = config.point_size * point.scale;
    if !(radius.is_finite() && radius > 0.0) {
        return Err(GeometryError::InvalidScale);
    }

    // Tangent-plane kernel rotated into camera space.
    let u_cam = camera.rotation * u;
    let v_cam = camera.rotation * v;
    let kernel = (u_cam * u_cam.transpose() + v_cam * v_cam.transpose()) * (radius * radius);

    let j = camera.projection_jacobian(&p_cam);
    let projected: Matrix2<f32> = j * kernel * j.transpose();
    let covariance = (projected + projected.transpose()) * 0.5 + Matrix2::identity() * config.delta;

    if covariance.iter().any(|v| !v.is_finite()) {
        return Err(GeometryError::NonFinite);
    }
    let (conic, det) =
        invert_symmetric_2x2(&covariance).ok_or(GeometryError::SingularCovariance)?;

    let center = camera.project(&p_cam).ok_or(GeometryError::BehindCamera)?;

    let k = cutoff_radius(config.cutoff);
    let extent = Vector2::new(
        k * covariance[(0, 0)].sqrt(),
        k * covariance[(1, 1)].sqrt(),
    );
    if !(extent.x.is_finite() && extent.y.is_finite()) {
        return Err(GeometryError::NonFinite);
    }
    if extent.x > config.max_footprint_radius || extent.y > config.max_footprint_radius {
        return Err(GeometryError::FootprintTooLarge);
    }

    let bounds = clip_bounds(center, extent, camera).ok_or(GeometryError::OutsideFrustum)?;

    Ok(Footprint {
        center,
        covariance,
        conic,
        normalization: 1.0 / (2.0 * PI * det.sqrt()),
        depth: p_cam.z,
        extent,
        bounds,
        color: point.color,
    })
}

/// Pixels x with centers x + 0.5 inside [center - extent, center + extent],
/// clipped to the image. None if the range misses the image entirely.
fn clip_bounds(center: Vector2<f32>, extent: Vector2<f32>, camera: &Camera) -> Option<PixelRect> {
    let axis = |c: f32, e: f32, size: u32| -> Option<(u32, u32)> {
        let lo = (c - e - 0.5).ceil().max(0.0);
        let hi = (c + e - 0.5).floor().min(size as f32 - 1.0);
        (lo <= hi).then(|| (lo as u32, hi as u32))
    };

    let (min_x, max_x) = axis(center.x, extent.x, camera.width)?;
    let (min_y, max_y) = axis(center.y, extent.y, camera.height)?;
    Some(PixelRect {
        min_x,
        min_y,
        max_x,
        max_y,
    })
}
