//! File adapters around the renderer.
//!
//! - PLY point clouds (ASCII and binary)
//! - Coordinate files (camera poses, JSON or text)
//! - PNG output

mod coords;
mod error;
mod image_out;
mod ply;

pub use coords::{load_views, parse_views_json, parse_views_text, CameraRecord};
pub use error::LoadError;
pub use image_out::{view_file_name, write_png_atomic};
pub use ply::{load_point_cloud, read_point_cloud, save_point_cloud_ply};
