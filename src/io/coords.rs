//! Camera/view descriptions ("coordinate files").
//!
//! A coordinate file lists one camera pose per output image. Two encodings:
//!
//! JSON (`.json`): an array of views, or `{ "views": [...] }`:
//! ```json
//! { "width": 640, "height": 480, "fx": 525.0, "fy": 525.0, "cx": 320.0, "cy": 240.0,
//!   "rotation": [[1,0,0],[0,1,0],[0,0,1]], "translation": [0.0, 0.0, 5.0] }
//! ```
//!
//! Text (any other extension): one view per line, `#` starts a comment,
//! 18 whitespace-separated numbers
//! `width height fx fy cx cy r00 r01 r02 r10 r11 r12 r20 r21 r22 tx ty tz`.
//!
//! Image sizes may be written as integers or integral decimals (`640.0`) in
//! either encoding.
//!
//! Rotation rows and translation map world to camera coordinates.

use crate::core::Camera;
use crate::io::LoadError;
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

const TEXT_FIELDS: usize = 18;

/// Tolerance on ‖R·Rᵀ − I‖ for a rotation to be accepted.
const ORTHONORMAL_TOLERANCE: f32 = 1e-3;

/// Serialized form of one view.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraRecord {
    #[serde(deserialize_with = "deserialize_image_size")]
    pub width: u32,
    #[serde(deserialize_with = "deserialize_image_size")]
    pub height: u32,
    pub fx: f32,
    pub fy: f32,
    pub cx: f32,
    pub cy: f32,
    /// Row-major world→camera rotation
    pub rotation: [[f32; 3]; 3],
    pub translation: [f32; 3],
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CoordsDocument {
    List(Vec<CameraRecord>),
    Wrapped { views: Vec<CameraRecord> },
}

/// Integral, non-negative value that fits a `u32`.
fn image_size(value: f64) -> Option<u32> {
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= u32::MAX as f64 {
        Some(value as u32)
    } else {
        None
    }
}

fn deserialize_image_size<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    image_size(value).ok_or_else(|| {
        serde::de::Error::custom(format!("image size {} is not a non-negative integer", value))
    })
}

impl CameraRecord {
    pub fn from_camera(camera: &Camera) -> Self {
        let r = &camera.rotation;
        Self {
            width: camera.width,
            height: camera.height,
            fx: camera.fx,
            fy: camera.fy,
            cx: camera.cx,
            cy: camera.cy,
            rotation: [
                [r[(0, 0)], r[(0, 1)], r[(0, 2)]],
                [r[(1, 0)], r[(1, 1)], r[(1, 2)]],
                [r[(2, 0)], r[(2, 1)], r[(2, 2)]],
            ],
            translation: [
                camera.translation.x,
                camera.translation.y,
                camera.translation.z,
            ],
        }
    }

    /// Validate and convert into a [`Camera`].
    pub fn into_camera(self) -> Result<Camera, String> {
        if self.width == 0 || self.height == 0 {
            return Err(format!(
                "image size must be positive, got {}x{}",
                self.width, self.height
            ));
        }
        if !(self.fx.is_finite() && self.fx > 0.0 && self.fy.is_finite() && self.fy > 0.0) {
            return Err(format!(
                "focal lengths must be positive, got fx={} fy={}",
                self.fx, self.fy
            ));
        }
        if !(self.cx.is_finite() && self.cy.is_finite()) {
            return Err("principal point is not finite".to_string());
        }

        let r = &self.rotation;
        let rotation = Matrix3::new(
            r[0][0], r[0][1], r[0][2], r[1][0], r[1][1], r[1][2], r[2][0], r[2][1], r[2][2],
        );
        let translation = Vector3::from(self.translation);

        if rotation.iter().chain(translation.iter()).any(|v| !v.is_finite()) {
            return Err("pose contains non-finite values".to_string());
        }
        let error = (rotation * rotation.transpose() - Matrix3::identity()).norm();
        if error > ORTHONORMAL_TOLERANCE {
            return Err(format!(
                "rotation is not orthonormal (|R*R^T - I| = {:.2e})",
                error
            ));
        }

        Ok(Camera::new(
            self.fx,
            self.fy,
            self.cx,
            self.cy,
            self.width,
            self.height,
            rotation,
            translation,
        ))
    }
}

fn records_to_cameras(records: Vec<CameraRecord>) -> Result<Vec<Camera>, LoadError> {
    records
        .into_iter()
        .enumerate()
        .map(|(i, record)| {
            record
                .into_camera()
                .map_err(|msg| LoadError::format(format!("view {}: {}", i, msg)))
        })
        .collect()
}

/// Parse views from a JSON document.
pub fn parse_views_json(text: &str) -> Result<Vec<Camera>, LoadError> {
    let records = match serde_json::from_str::<CoordsDocument>(text)? {
        CoordsDocument::List(records) => records,
        CoordsDocument::Wrapped { views } => views,
    };
    records_to_cameras(records)
}

/// Parse views from the line-oriented text format.
pub fn parse_views_text(text: &str) -> Result<Vec<Camera>, LoadError> {
    let mut cameras = Vec::new();

    for (line_idx, raw) in text.lines().enumerate() {
        let line_no = line_idx + 1;
        let line = raw.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }

        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() != TEXT_FIELDS {
            return Err(LoadError::format(format!(
                "line {}: expected {} values, found {}",
                line_no,
                TEXT_FIELDS,
                tokens.len()
            )));
        }

        let size = |i: usize| {
            tokens[i].parse::<f64>().ok().and_then(image_size).ok_or_else(|| {
                LoadError::format(format!(
                    "line {}: image size '{}' is not a non-negative integer",
                    line_no, tokens[i]
                ))
            })
        };
        let mut values = [0.0f32; TEXT_FIELDS];
        for (i, token) in tokens.iter().enumerate().skip(2) {
            values[i] = token.parse::<f32>().map_err(|_| {
                LoadError::format(format!("line {}: invalid number '{}'", line_no, token))
            })?;
        }

        let record = CameraRecord {
            width: size(0)?,
            height: size(1)?,
            fx: values[2],
            fy: values[3],
            cx: values[4],
            cy: values[5],
            rotation: [
                [values[6], values[7], values[8]],
                [values[9], values[10], values[11]],
                [values[12], values[13], values[14]],
            ],
            translation: [values[15], values[16], values[17]],
        };
        let camera = record
            .into_camera()
            .map_err(|msg| LoadError::format(format!("line {}: {}", line_no, msg)))?;
        cameras.push(camera);
    }

    Ok(cameras)
}

/// Load every view from a coordinate file, choosing the encoding by extension.
#[tracing::instrument(skip_all, fields(path = %path.display()))]
pub fn load_views(path: &Path) -> Result<Vec<Camera>, LoadError> {
    let text = std::fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    let cameras = if is_json {
        parse_views_json(&text)?
    } else {
        parse_views_text(&text)?
    };
    info!(views = cameras.len(), "coordinate file loaded");
    Ok(cameras)
}
