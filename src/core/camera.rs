//! Pinhole camera (intrinsics + world→camera extrinsics).
//!
//! Conventions: camera looks down +z, pixel (0, 0) is the top-left pixel and
//! its center sits at (0.5, 0.5).

use crate::core::math::perspective_jacobian;
use nalgebra::{Matrix2x3, Matrix3, Vector2, Vector3};

#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    /// Focal length in X (pixels)
    pub fx: f32,

    /// Focal length in Y (pixels)
    pub fy: f32,

    /// Principal point X (pixels)
    pub cx: f32,

    /// Principal point Y (pixels)
    pub cy: f32,

    pub width: u32,
    pub height: u32,

    /// Rotation from world to camera coordinates
    pub rotation: Matrix3<f32>,

    /// Translation from world to camera coordinates
    pub translation: Vector3<f32>,
}

impl Camera {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        fx: f32,
        fy: f32,
        cx: f32,
        cy: f32,
        width: u32,
        height: u32,
        rotation: Matrix3<f32>,
        translation: Vector3<f32>,
    ) -> Self {
        Self {
            fx,
            fy,
            cx,
            cy,
            width,
            height,
            rotation,
            translation,
        }
    }

    /// p_camera = R * p_world + t
    pub fn world_to_camera(&self, point_world: &Vector3<f32>) -> Vector3<f32> {
        self.rotation * point_world + self.translation
    }

    /// Project a camera-space point to pixel coordinates.
    ///
    /// Returns None for points on or behind the image plane (z <= 0).
    pub fn project(&self, point_camera: &Vector3<f32>) -> Option<Vector2<f32>> {
        if point_camera.z <= 0.0 {
            return None;
        }

        let u = self.fx * point_camera.x / point_camera.z + self.cx;
        let v = self.fy * point_camera.y / point_camera.z + self.cy;
        Some(Vector2::new(u, v))
    }

    /// Jacobian ∂[u,v]/∂[x,y,z] of the projection at a camera-space point.
    ///
    /// This is the local affine approximation EWA splatting uses to carry
    /// object-space covariances into screen space.
    pub fn projection_jacobian(&self, point_camera: &Vector3<f32>) -> Matrix2x3<f32> {
        perspective_jacobian(point_camera, self.fx, self.fy)
    }
}
