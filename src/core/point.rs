//! Oriented, colored point samples and the cloud that holds them.

use nalgebra::Vector3;

/// One surface sample.
///
/// Colors are linear RGB in `[0, 1]`. Loaders convert from the sRGB values
/// found in files.
#[derive(Clone, Debug, PartialEq)]
pub struct Point {
    /// World-space position
    pub position: Vector3<f32>,

    /// Surface normal (world space). Expected unit length, normalized again on use.
    pub normal: Vector3<f32>,

    /// Linear RGB color
    pub color: Vector3<f32>,

    /// Multiplier applied to the configured point size
    pub scale: f32,
}

impl Point {
    pub fn new(position: Vector3<f32>, normal: Vector3<f32>, color: Vector3<f32>) -> Self {
        Self {
            position,
            normal,
            color,
            scale: 1.0,
        }
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }
}

/// A loaded point cloud. Read-only for the duration of a render.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PointCloud {
    pub points: Vec<Point>,
}

impl PointCloud {
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    pub fn from_points(points: Vec<Point>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn push(&mut self, point: Point) {
        self.points.push(point);
    }

    pub fn as_slice(&self) -> &[Point] {
        &self.points
    }

    /// Axis-aligned bounds of all positions, `None` for an empty cloud.
    pub fn bounds(&self) -> Option<(Vector3<f32>, Vector3<f32>)> {
        let first = self.points.first()?.position;
        Some(self.points.iter().fold((first, first), |(min, max), p| {
            (min.inf(&p.position), max.sup(&p.position))
        }))
    }
}
