//! Error types for the rendering pipeline.
//!
//! Two levels:
//! - `RenderError`: fatal, pipeline-level. One value is surfaced to the caller.
//! - `GeometryError`: per-point projection failure. The point is skipped and
//!   the render continues.

use std::path::Path;
use thiserror::Error;

/// Fatal error returned by [`crate::render`] and friends.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Missing, empty or malformed model/coordinate file.
    #[error("input error: {0}")]
    Input(String),

    /// Unsupported method or invalid option value.
    #[error("configuration error: {0}")]
    Config(String),

    /// Output directory or image file could not be created or written.
    #[error("I/O error while {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl RenderError {
    pub fn input(msg: impl Into<String>) -> Self {
        RenderError::Input(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        RenderError::Config(msg.into())
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        RenderError::Io {
            context: context.into(),
            source,
        }
    }

    /// Wrap a loader failure for `path` as an input error.
    pub(crate) fn load(what: &str, path: &Path, err: crate::io::LoadError) -> Self {
        RenderError::Input(format!("failed to load {} {}: {}", what, path.display(), err))
    }
}

/// Why a single point produced no footprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum GeometryError {
    #[error("point lies behind the camera near plane")]
    BehindCamera,

    #[error("footprint does not overlap the image")]
    OutsideFrustum,

    #[error("normal has zero or non-finite length")]
    DegenerateNormal,

    #[error("kernel radius is zero, negative or non-finite")]
    InvalidScale,

    #[error("screen-space covariance is singular")]
    SingularCovariance,

    #[error("non-finite value during projection")]
    NonFinite,

    #[error("footprint exceeds the maximum screen radius")]
    FootprintTooLarge,
}
