//! Terrain complexity factor used to scale shadow bias and filter radius.

use crate::heightfield::HeightStats;

pub const COMPLEXITY_MIN: f32 = 0.5;
pub const COMPLEXITY_MAX: f32 = 2.5;

const BASE: f32 = 0.5;
const ROUGHNESS_SCALE: f32 = 100.0;
const ROUGHNESS_WEIGHT: f32 = 0.6;
const RANGE_WEIGHT: f32 = 0.5;
const STD_WEIGHT: f32 = 1.5;

/// Composite of roughness, elevation range and variability, clamped to `[0.5, 2.5]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerrainComplexity(f32);

impl Default for TerrainComplexity {
    /// Neutral factor used before any terrain is loaded.
    fn default() -> Self {
        Self(1.0)
    }
}

impl TerrainComplexity {
    pub fn from_parts(roughness: f32, range: f32, std_dev: f32) -> Self {
        let raw = BASE
            + ROUGHNESS_WEIGHT * roughness * ROUGHNESS_SCALE
            + RANGE_WEIGHT * range
            + STD_WEIGHT * std_dev;
        let raw = if raw.is_finite() { raw } else { COMPLEXITY_MAX };
        Self(raw.clamp(COMPLEXITY_MIN, COMPLEXITY_MAX))
    }

    pub fn from_stats(stats: &HeightStats) -> Self {
        Self::from_parts(stats.roughness, stats.range(), stats.std_dev)
    }

    pub fn factor(self) -> f32 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_terrain_hits_floor() {
        assert_eq!(TerrainComplexity::from_parts(0.0, 0.0, 0.0).factor(), 0.5);
    }

    #[test]
    fn rough_terrain_hits_ceiling() {
        assert_eq!(TerrainComplexity::from_parts(0.05, 1.0, 0.4).factor(), 2.5);
        assert_eq!(TerrainComplexity::from_parts(f32::NAN, 0.0, 0.0).factor(), 2.5);
    }

    #[test]
    fn weights_combine_linearly() {
        let c = TerrainComplexity::from_parts(0.002, 0.6, 0.1);
        // 0.5 + 0.6*0.2 + 0.5*0.6 + 1.5*0.1
        assert!((c.factor() - 1.07).abs() < 1e-5);
    }
}
