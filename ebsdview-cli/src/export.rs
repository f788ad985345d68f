//! PNG output for rendered images.

use std::path::{Path, PathBuf};

use ebsdview_core::ImageData;
use image::GrayImage;

use crate::{CliError, Result};

/// Writes `image` as an 8-bit grayscale PNG. Returns `false` for an empty
/// image, which is skipped.
pub fn write_png(path: &Path, image: &ImageData) -> Result<bool> {
    if image.image.is_empty() {
        return Ok(false);
    }
    let width = u32::try_from(image.image.width())
        .map_err(|_| CliError::ImageTooLarge(path.to_path_buf()))?;
    let height = u32::try_from(image.image.height())
        .map_err(|_| CliError::ImageTooLarge(path.to_path_buf()))?;
    let buffer = GrayImage::from_raw(width, height, image.image.pixels().to_vec())
        .ok_or_else(|| CliError::ImageTooLarge(path.to_path_buf()))?;
    buffer.save(path)?;
    Ok(true)
}

/// `{dir}/{stem}_{index:04}.png`
pub fn numbered_path(dir: &Path, stem: &str, index: usize) -> PathBuf {
    dir.join(format!("{stem}_{index:04}.png"))
}
