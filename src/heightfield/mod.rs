//! Heightfield decoding and the immutable `HeightField` model.
//!
//! A height field is a row-major grid of normalized elevations decoded from a
//! chunked 16-bit grayscale raster. Values lie in `[0, 1]`, or in
//! `[SEA_LEVEL_FLOOR, 1]` when the source preserves sea level.

pub mod chunks;
pub mod decode;
pub mod encode;
pub mod filter;
pub mod stats;

use std::io::Write;

use serde::{Deserialize, Serialize};

pub use decode::{decode_heightfield, decode_samples, RasterHeader};
pub use encode::encode_grayscale16;
pub use filter::FilterType;
pub use stats::{compute_stats, HeightStats};

use crate::error::{TerrainError, TerrainResult};

/// Lowest normalized value of a sea-level-preserving source (sea floor).
pub const SEA_LEVEL_FLOOR: f32 = -0.1;

/// How the source raster treats sea level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SeaLevel {
    /// Synthetic terrain: values span `[0, 1]`, no fixed sea level.
    #[default]
    Synthetic,
    /// Real-world terrain: `0.0` is sea level, submerged samples go down to
    /// [`SEA_LEVEL_FLOOR`].
    Preserved,
}

/// Normalized elevation grid with statistics. Immutable once built.
#[derive(Debug, Clone)]
pub struct HeightField {
    width: u32,
    height: u32,
    values: Vec<f32>,
    sea_level: SeaLevel,
    stats: HeightStats,
}

impl HeightField {
    /// Build from row-major values; statistics are computed here.
    pub fn from_values(
        width: u32,
        height: u32,
        values: Vec<f32>,
        sea_level: SeaLevel,
    ) -> TerrainResult<Self> {
        if width == 0 || height == 0 {
            return Err(TerrainError::format(format!(
                "height field dimensions must be positive, got {width}x{height}"
            )));
        }
        if values.len() != width as usize * height as usize {
            return Err(TerrainError::format(format!(
                "height field has {} values, expected {}x{}",
                values.len(),
                width,
                height
            )));
        }
        let stats = compute_stats(&values, width, height);
        Ok(Self {
            width,
            height,
            values,
            sea_level,
            stats,
        })
    }

    /// Decode a raster buffer. See [`decode_heightfield`].
    pub fn decode(bytes: &[u8], sea_level: SeaLevel) -> TerrainResult<Self> {
        decode_heightfield(bytes, sea_level)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn sea_level(&self) -> SeaLevel {
        self.sea_level
    }

    pub fn is_sea_level_preserving(&self) -> bool {
        self.sea_level == SeaLevel::Preserved
    }

    pub fn stats(&self) -> &HeightStats {
        &self.stats
    }

    /// Sample at `(x, y)`; coordinates are clamped to the grid.
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> f32 {
        let x = x.min(self.width - 1) as usize;
        let y = y.min(self.height - 1) as usize;
        self.values[y * self.width as usize + x]
    }

    /// Quantize back to 16-bit samples, undoing the sea-level remap.
    pub fn to_samples(&self) -> Vec<u16> {
        self.values
            .iter()
            .map(|&v| {
                let unit = match self.sea_level {
                    SeaLevel::Synthetic => v,
                    SeaLevel::Preserved => (v - SEA_LEVEL_FLOOR) / (1.0 - SEA_LEVEL_FLOOR),
                };
                (unit.clamp(0.0, 1.0) * decode::MAX_SAMPLE).round() as u16
            })
            .collect()
    }

    /// Encode as a 16-bit grayscale raster.
    pub fn to_raster(&self, filter: FilterType) -> TerrainResult<Vec<u8>> {
        encode_grayscale16(self.width, self.height, &self.to_samples(), filter)
    }

    /// Dump values as little-endian f32, row-major, no header.
    pub fn write_raw<W: Write>(&self, mut writer: W) -> std::io::Result<()> {
        let mut buf = Vec::with_capacity(self.values.len() * 4);
        for v in &self.values {
            buf.extend_from_slice(&v.to_le_bytes());
        }
        writer.write_all(&buf)?;
        writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_must_match_dimensions() {
        let err = HeightField::from_values(3, 2, vec![0.0; 5], SeaLevel::Synthetic).unwrap_err();
        assert!(matches!(err, TerrainError::Format(_)));
    }

    #[test]
    fn round_trip_within_quantization() {
        let (w, h) = (17u32, 11u32);
        let values: Vec<f32> = (0..w * h)
            .map(|i| ((i as f32 * 0.731).sin() * 0.5 + 0.5).clamp(0.0, 1.0))
            .collect();
        let field = HeightField::from_values(w, h, values.clone(), SeaLevel::Synthetic).unwrap();
        let bytes = field.to_raster(FilterType::Paeth).unwrap();
        let back = HeightField::decode(&bytes, SeaLevel::Synthetic).unwrap();
        assert_eq!((back.width(), back.height()), (w, h));
        for (a, b) in values.iter().zip(back.values()) {
            assert!((a - b).abs() <= 1.0 / 65535.0, "{a} vs {b}");
        }
    }

    #[test]
    fn preserved_round_trip_keeps_negative_values() {
        let values = vec![-0.1, -0.05, 0.0, 0.25, 0.5, 1.0];
        let field = HeightField::from_values(3, 2, values.clone(), SeaLevel::Preserved).unwrap();
        let back = HeightField::decode(&field.to_raster(FilterType::Sub).unwrap(), SeaLevel::Preserved)
            .unwrap();
        assert!(back.is_sea_level_preserving());
        for (a, b) in values.iter().zip(back.values()) {
            assert!((a - b).abs() <= 1.1 / 65535.0 + 1e-6, "{a} vs {b}");
        }
        assert!(back.stats().min < 0.0);
    }

    #[test]
    fn raw_dump_is_little_endian_f32() {
        let field = HeightField::from_values(2, 1, vec![0.5, 1.0], SeaLevel::Synthetic).unwrap();
        let mut out = Vec::new();
        field.write_raw(&mut out).unwrap();
        assert_eq!(out.len(), 8);
        assert_eq!(f32::from_le_bytes([out[0], out[1], out[2], out[3]]), 0.5);
        assert_eq!(f32::from_le_bytes([out[4], out[5], out[6], out[7]]), 1.0);
    }

    #[test]
    fn get_clamps_coordinates() {
        let field = HeightField::from_values(2, 2, vec![0.1, 0.2, 0.3, 0.4], SeaLevel::Synthetic).unwrap();
        assert_eq!(field.get(1, 0), 0.2);
        assert_eq!(field.get(9, 9), 0.4);
    }
}
