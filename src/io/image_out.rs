//! Image writing.
//!
//! Images are encoded into a temporary file in the destination directory and
//! renamed into place only once encoding succeeded, so a failed write never
//! leaves a truncated image behind.

use image::{ImageFormat, RgbaImage};
use std::io::{BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// File name of the image for view `index` of a model named `stem`.
pub fn view_file_name(stem: &str, index: usize) -> String {
    format!("{}_{:03}.png", stem, index)
}

/// Encode `image` as PNG and atomically place it at `path`.
pub fn write_png_atomic(image: &RgbaImage, path: &Path) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        image
            .write_to(&mut writer, ImageFormat::Png)
            .map_err(std::io::Error::other)?;
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
