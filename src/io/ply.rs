//! PLY point cloud I/O.
//!
//! Files are decoded with `serde_ply` (ASCII, binary little-endian and binary
//! big-endian). Each vertex arrives as a name → value map; only the columns
//! listed below are interpreted. A `face` element is accepted and dropped.
//!
//! Vertex properties:
//! - `x y z` and `nx ny nz` are required
//! - colors from `red green blue`, `r g b` or `diffuse_red ...`; integer
//!   channels are 8-bit (0–255, anything else is rejected), float channels
//!   are taken as `[0, 1]`. Both are sRGB-encoded in the file and decoded to
//!   linear.
//! - optional per-point size multiplier `scale` (or `radius`)

use crate::core::color::{linear_f32_to_srgb_u8, srgb_to_linear};
use crate::core::{Point, PointCloud};
use crate::io::LoadError;
use nalgebra::Vector3;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::{debug, info, warn};

type VertexRow = HashMap<String, JsonValue>;

#[derive(Deserialize, Debug)]
#[allow(dead_code)]
struct PlyFace {
    #[serde(alias = "vertex_index")]
    vertex_indices: Vec<i32>,
}

#[derive(Deserialize, Debug)]
struct PlyFile {
    vertex: Vec<VertexRow>,
    #[serde(default)]
    face: Vec<PlyFace>,
}

const COLOR_NAMES: [[&str; 3]; 3] = [
    ["red", "green", "blue"],
    ["r", "g", "b"],
    ["diffuse_red", "diffuse_green", "diffuse_blue"],
];

/// Property names of the vertex columns we interpret.
struct VertexLayout {
    color: Option<[&'static str; 3]>,
    scale: Option<&'static str>,
}

impl VertexLayout {
    /// Resolve columns from one vertex row (every row carries the same keys).
    fn resolve(row: &VertexRow) -> Result<Self, LoadError> {
        for name in ["x", "y", "z", "nx", "ny", "nz"] {
            if !row.contains_key(name) {
                return Err(LoadError::MissingProperty(name.to_string()));
            }
        }

        let color = COLOR_NAMES
            .iter()
            .find(|names| names.iter().all(|n| row.contains_key(*n)))
            .copied();
        let scale = ["scale", "radius"].into_iter().find(|n| row.contains_key(*n));

        Ok(Self { color, scale })
    }

    fn point_from_row(&self, index: usize, row: &VertexRow) -> Result<Point, LoadError> {
        let vec3 = |names: [&str; 3]| -> Result<Vector3<f32>, LoadError> {
            Ok(Vector3::new(
                scalar(index, row, names[0])?,
                scalar(index, row, names[1])?,
                scalar(index, row, names[2])?,
            ))
        };

        let color = match self.color {
            Some(names) => Vector3::new(
                channel(index, row, names[0])?,
                channel(index, row, names[1])?,
                channel(index, row, names[2])?,
            ),
            None => Vector3::repeat(1.0),
        };

        Ok(Point {
            position: vec3(["x", "y", "z"])?,
            normal: vec3(["nx", "ny", "nz"])?,
            color,
            scale: match self.scale {
                Some(name) => scalar(index, row, name)?,
                None => 1.0,
            },
        })
    }
}

/// Numeric column value. Non-finite floats come through as JSON null and
/// map to NaN, so the projector skips the point instead of failing the load.
fn scalar(index: usize, row: &VertexRow, name: &str) -> Result<f32, LoadError> {
    match row.get(name) {
        Some(JsonValue::Number(n)) => n
            .as_f64()
            .map(|v| v as f32)
            .ok_or_else(|| LoadError::format(format!("vertex {}: invalid '{}'", index, name))),
        Some(JsonValue::Null) => Ok(f32::NAN),
        Some(_) => Err(LoadError::format(format!(
            "vertex {}: '{}' is not a scalar",
            index, name
        ))),
        None => Err(LoadError::MissingProperty(name.to_string())),
    }
}

/// Color channel decoded to linear `[0, 1]`.
fn channel(index: usize, row: &VertexRow, name: &str) -> Result<f32, LoadError> {
    let encoded = match row.get(name) {
        Some(JsonValue::Number(n)) if n.is_f64() => n.as_f64().unwrap_or(0.0) as f32,
        Some(JsonValue::Number(n)) => match n.as_u64() {
            Some(v) if v <= 255 => v as f32 / 255.0,
            _ => {
                return Err(LoadError::format(format!(
                    "vertex {}: color '{}' = {} is outside the 8-bit range",
                    index, name, n
                )))
            }
        },
        Some(_) => {
            return Err(LoadError::format(format!(
                "vertex {}: color '{}' is not a number",
                index, name
            )))
        }
        None => return Err(LoadError::MissingProperty(name.to_string())),
    };
    Ok(srgb_to_linear(encoded))
}

/// Read a point cloud from any buffered PLY stream.
pub fn read_point_cloud<R: BufRead>(reader: R) -> Result<PointCloud, LoadError> {
    let ply: PlyFile = serde_ply::from_reader(reader)
        .map_err(|e| LoadError::format(format!("PLY parsing error: {}", e)))?;
    debug!(
        vertices = ply.vertex.len(),
        faces = ply.face.len(),
        "PLY file parsed"
    );

    let Some(first) = ply.vertex.first() else {
        return Ok(PointCloud::new());
    };
    let layout = VertexLayout::resolve(first)?;
    if layout.color.is_none() {
        warn!("vertex element has no color properties, using white");
    }

    let points = ply
        .vertex
        .iter()
        .enumerate()
        .map(|(i, row)| layout.point_from_row(i, row))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(PointCloud::from_points(points))
}

/// Load a point cloud from a PLY file.
#[tracing::instrument(skip_all, fields(path = %path.display()))]
pub fn load_point_cloud(path: &Path) -> Result<PointCloud, LoadError> {
    debug!("loading PLY point cloud");
    let file = File::open(path)?;
    let cloud = read_point_cloud(BufReader::new(file))?;
    info!(points = cloud.len(), "PLY point cloud loaded");
    Ok(cloud)
}

/// Save a point cloud as ASCII PLY with normals, sRGB colors and per-point scale.
pub fn save_point_cloud_ply(cloud: &PointCloud, path: &Path) -> Result<(), LoadError> {
    let mut file = BufWriter::new(File::create(path)?);

    writeln!(file, "ply")?;
    writeln!(file, "format ascii 1.0")?;
    writeln!(file, "element vertex {}", cloud.len())?;
    for name in ["x", "y", "z", "nx", "ny", "nz"] {
        writeln!(file, "property float {}", name)?;
    }
    writeln!(file, "property uchar red")?;
    writeln!(file, "property uchar green")?;
    writeln!(file, "property uchar blue")?;
    writeln!(file, "property float scale")?;
    writeln!(file, "end_header")?;

    for p in cloud.as_slice() {
        writeln!(
            file,
            "{} {} {} {} {} {} {} {} {} {}",
            p.position.x,
            p.position.y,
            p.position.z,
            p.normal.x,
            p.normal.y,
            p.normal.z,
            linear_f32_to_srgb_u8(p.color.x),
            linear_f32_to_srgb_u8(p.color.y),
            linear_f32_to_srgb_u8(p.color.z),
            p.scale
        )?;
    }

    file.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use byteorder::{BigEndian, LittleEndian, WriteBytesExt};
    use std::io::Cursor;

    const ASCII_PLY: &str = "ply
format ascii 1.0
comment written by hand
element vertex 2
property float x
property float y
property float z
property float nx
property float ny
property float nz
property uchar red
property uchar green
property uchar blue
element face 1
property list uchar int vertex_indices
end_header
0 0 1 0 0 -1 255 0 0
1.5 -2 3 0 1 0 0 0 255
3 0 1 2
";

    #[test]
    fn test_read_ascii_vertices() {
        let cloud = read_point_cloud(Cursor::new(ASCII_PLY)).unwrap();
        assert_eq!(cloud.len(), 2);

        let p = &cloud.points[1];
        assert_relative_eq!(p.position, Vector3::new(1.5, -2.0, 3.0));
        assert_relative_eq!(p.normal, Vector3::new(0.0, 1.0, 0.0));
        assert_relative_eq!(p.color, Vector3::new(0.0, 0.0, 1.0));
        assert_eq!(p.scale, 1.0);
    }

    #[test]
    fn test_face_element_before_vertex_is_dropped() {
        let text = "ply
format ascii 1.0
element face 1
property list uchar int vertex_indices
element vertex 1
property float x
property float y
property float z
property float nx
property float ny
property float nz
property float radius
end_header
3 0 0 0
4 5 6 0 0 1 0.3
";
        let cloud = read_point_cloud(Cursor::new(text)).unwrap();
        assert_eq!(cloud.len(), 1);
        assert_relative_eq!(cloud.points[0].position, Vector3::new(4.0, 5.0, 6.0));
        assert_relative_eq!(cloud.points[0].scale, 0.3);
        // No color properties: white.
        assert_relative_eq!(cloud.points[0].color, Vector3::repeat(1.0));
    }

    #[test]
    fn test_read_binary_little_endian() {
        let mut bytes = b"ply\nformat binary_little_endian 1.0\nelement vertex 1\n\
property float x\nproperty float y\nproperty float z\n\
property float nx\nproperty float ny\nproperty float nz\n\
property float red\nproperty float green\nproperty float blue\nend_header\n"
            .to_vec();
        for v in [1.0f32, 2.0, 3.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0] {
            bytes.write_f32::<LittleEndian>(v).unwrap();
        }

        let cloud = read_point_cloud(Cursor::new(bytes)).unwrap();
        assert_eq!(cloud.len(), 1);
        assert_relative_eq!(cloud.points[0].position, Vector3::new(1.0, 2.0, 3.0));
        assert_relative_eq!(cloud.points[0].color, Vector3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_read_binary_big_endian_with_double_positions() {
        let mut bytes = b"ply\nformat binary_big_endian 1.0\nelement vertex 1\n\
property double x\nproperty double y\nproperty double z\n\
property float nx\nproperty float ny\nproperty float nz\n\
property uchar red\nproperty uchar green\nproperty uchar blue\nend_header\n"
            .to_vec();
        for v in [-1.0f64, 0.5, 8.0] {
            bytes.write_f64::<BigEndian>(v).unwrap();
        }
        for v in [1.0f32, 0.0, 0.0] {
            bytes.write_f32::<BigEndian>(v).unwrap();
        }
        bytes.extend_from_slice(&[0, 255, 0]);

        let cloud = read_point_cloud(Cursor::new(bytes)).unwrap();
        assert_relative_eq!(cloud.points[0].position, Vector3::new(-1.0, 0.5, 8.0));
        assert_relative_eq!(cloud.points[0].normal, Vector3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(cloud.points[0].color, Vector3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_missing_normals_is_an_error() {
        let text = "ply
format ascii 1.0
element vertex 1
property float x
property float y
property float z
end_header
0 0 0
";
        let err = read_point_cloud(Cursor::new(text)).unwrap_err();
        assert!(matches!(err, LoadError::MissingProperty(ref name) if name == "nx"));
    }

    #[test]
    fn test_truncated_body_is_an_error() {
        let text = "ply
format ascii 1.0
element vertex 2
property float x
property float y
property float z
property float nx
property float ny
property float nz
end_header
0 0 0 0 0 1
";
        assert!(read_point_cloud(Cursor::new(text)).is_err());
    }

    #[test]
    fn test_rejects_non_ply_input() {
        let err = read_point_cloud(Cursor::new("hello\nworld\n")).unwrap_err();
        assert!(matches!(err, LoadError::InvalidFormat(_)));
    }

    #[test]
    fn test_integer_colors_outside_8_bit_are_rejected() {
        let text = "ply
format ascii 1.0
element vertex 1
property float x
property float y
property float z
property float nx
property float ny
property float nz
property ushort red
property ushort green
property ushort blue
end_header
0 0 1 0 0 -1 65535 0 0
";
        let err = read_point_cloud(Cursor::new(text)).unwrap_err();
        assert!(matches!(err, LoadError::InvalidFormat(ref msg) if msg.contains("8-bit")));
    }

    #[test]
    fn test_negative_char_color_is_rejected() {
        let text = "ply
format ascii 1.0
element vertex 1
property float x
property float y
property float z
property float nx
property float ny
property float nz
property char r
property char g
property char b
end_header
0 0 1 0 0 -1 -1 0 0
";
        assert!(matches!(
            read_point_cloud(Cursor::new(text)),
            Err(LoadError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_empty_vertex_element_gives_empty_cloud() {
        let text = "ply
format ascii 1.0
element vertex 0
property float x
property float y
property float z
property float nx
property float ny
property float nz
end_header
";
        assert!(read_point_cloud(Cursor::new(text)).unwrap().is_empty());
    }
}
