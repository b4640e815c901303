//! PNG writers for the shaded ramp texture and depth exports.
//!
//! Buffers must be tightly packed; sizes are validated before encoding.

use anyhow::{ensure, Context, Result};
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ColorType, ImageEncoder};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Write a tight RGBA8 buffer.
pub fn write_png_rgba8(path: &Path, data: &[u8], width: u32, height: u32) -> Result<()> {
    write_png(path, data, width, height, ColorType::Rgba8)
}

/// Write a tight single-channel 8-bit buffer.
pub fn write_png_gray8(path: &Path, data: &[u8], width: u32, height: u32) -> Result<()> {
    write_png(path, data, width, height, ColorType::L8)
}

fn write_png(path: &Path, data: &[u8], width: u32, height: u32, color: ColorType) -> Result<()> {
    let channels = color.bytes_per_pixel() as usize;
    let expected = expected_buffer_size(width, height, channels)?;
    ensure!(
        data.len() == expected,
        "PNG writer requires tight {:?} buffer: expected {} bytes, got {}",
        color,
        expected,
        data.len()
    );

    let file = File::create(path)
        .with_context(|| format!("failed to create output PNG at {}", path.display()))?;
    let encoder = PngEncoder::new_with_quality(
        BufWriter::new(file),
        CompressionType::Default,
        FilterType::Adaptive,
    );
    encoder
        .write_image(data, width, height, color.into())
        .with_context(|| format!("failed to encode {:?} PNG", color))?;
    log::debug!("wrote {}x{} {:?} PNG to {}", width, height, color, path.display());
    Ok(())
}

fn expected_buffer_size(width: u32, height: u32, channels: usize) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|px| px.checked_mul(channels))
        .ok_or_else(|| anyhow::anyhow!("image dimensions overflow when computing buffer size"))
}
