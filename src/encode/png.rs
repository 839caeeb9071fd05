use anyhow::{Context, Result};
use image::RgbImage;
use std::path::Path;

/// Writes the assembled pixel grid as a PNG file.
pub fn write_png(img: &RgbImage, path: &Path) -> Result<()> {
    img.save_with_format(path, image::ImageFormat::Png)
        .with_context(|| format!("Failed to write image to {}", path.display()))?;
    log::info!("Saved image to {}", path.display());
    Ok(())
}
