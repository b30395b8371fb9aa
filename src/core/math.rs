//! Linear-algebra helpers used by footprint projection.

use nalgebra::{Matrix2, Matrix2x3, Vector3};

/// Determinants at or below this are treated as singular.
pub const MIN_DETERMINANT: f32 = 1e-12;

/// Compute the Jacobian of perspective projection.
///
/// For a point p_cam = [x, y, z] in camera space,
/// the projected point is [u, v] = [fx*x/z + cx, fy*y/z + cy]
///
/// J = | fx/z    0      -fx*x/z² |
///     |  0     fy/z    -fy*y/z² |
pub fn perspective_jacobian(point_camera: &Vector3<f32>, fx: f32, fy: f32) -> Matrix2x3<f32> {
    let z_inv = 1.0 / point_camera.z;
    let z_inv_sq = z_inv * z_inv;

    Matrix2x3::new(
        fx * z_inv,
        0.0,
        -fx * point_camera.x * z_inv_sq,
        0.0,
        fy * z_inv,
        -fy * point_camera.y * z_inv_sq,
    )
}

/// Orthonormal tangent vectors (u, v) spanning the plane perpendicular to `normal`.
///
/// Returns None if the normal has zero or non-finite length.
pub fn tangent_frame(normal: &Vector3<f32>) -> Option<(Vector3<f32>, Vector3<f32>)> {
    let len = normal.norm();
    if !len.is_finite() || len <= f32::EPSILON {
        return None;
    }
    let n = normal / len;

    // Cross with the axis least aligned with n so the product never vanishes.
    let (ax, ay, az) = (n.x.abs(), n.y.abs(), n.z.abs());
    let helper = if ax <= ay && ax <= az {
        Vector3::x()
    } else if ay <= az {
        Vector3::y()
    } else {
        Vector3::z()
    };

    let u = n.cross(&helper).normalize();
    let v = n.cross(&u);
    Some((u, v))
}

/// Invert a symmetric 2×2 matrix.
///
/// Returns the inverse together with the determinant, or None when the
/// determinant is not a finite value above [`MIN_DETERMINANT`].
pub fn invert_symmetric_2x2(m: &Matrix2<f32>) -> Option<(Matrix2<f32>, f32)> {
    let a = m[(0, 0)];
    let b = 0.5 * (m[(0, 1)] + m[(1, 0)]);
    let c = m[(1, 1)];

    let det = a * c - b * b;
    if !det.is_finite() || det <= MIN_DETERMINANT {
        return None;
    }

    let inv_det = 1.0 / det;
    let inverse = Matrix2::new(c * inv_det, -b * inv_det, -b * inv_det, a * inv_det);
    Some((inverse, det))
}
