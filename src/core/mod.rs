//! Core data structures and math.
//!
//! - `Point` / `PointCloud`: oriented colored samples
//! - `Camera`: pinhole intrinsics and extrinsics
//! - Math utilities: projection Jacobian, tangent frames, 2×2 inversion
//! - Color conversion between sRGB and linear
//!
//! Everything here is pure data and math, no I/O and no rendering logic.

mod camera;
pub mod color;
pub mod math;
mod point;

pub use camera::Camera;
pub use math::{invert_symmetric_2x2, perspective_jacobian, tangent_frame};
pub use point::{Point, PointCloud};
