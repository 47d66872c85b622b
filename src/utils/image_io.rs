//! Diagnostic image output.
//!
//! Texture levels can be dumped as PNG for inspection; float (depth)
//! images are converted to grayscale RGBA first.

use std::path::Path;

use crate::errors::Result;

/// Writes tightly-packed RGBA8 scanlines as a PNG.
pub fn write_rgba_png(path: &Path, width: u32, height: u32, pixels: &[u8]) -> Result<()> {
    image::save_buffer(
        path,
        pixels,
        width,
        height,
        image::ExtendedColorType::Rgba8,
    )?;
    Ok(())
}

/// Expands a single-channel float image into grayscale RGBA8.
///
/// Values are clamped to `[0, 1]` before quantization.
#[must_use]
pub fn float_to_rgba(values: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * 4);
    for &v in values {
        let g = (v.clamp(0.0, 1.0) * 255.0) as u8;
        out.extend_from_slice(&[g, g, g, 255]);
    }
    out
}
