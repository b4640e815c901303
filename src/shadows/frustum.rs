// src/shadows/frustum.rs
// Adaptive shadow-camera bounds, bias and filter parameters driven by sun geometry
// RELEVANT FILES: src/shadows/complexity.rs, src/shadows/jitter.rs, src/lighting/sun.rs

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

use super::complexity::TerrainComplexity;
use super::jitter::spiral_offset;
use crate::heightfield::HeightStats;
use crate::settings::{RenderSettings, ShadowQuality};
use crate::terrain::WORLD_HALF_EXTENT;

// Tuned thresholds. Values and branching are kept as found; see DESIGN.md.
pub const HEIGHT_FACTOR_FLOOR: f32 = 0.3;
pub const HEIGHT_FACTOR_REFERENCE: f32 = 120.0;
pub const BASE_EXTENSION: f32 = 60.0;
pub const LOW_SUN_HEIGHT: f32 = 50.0;
pub const LOW_SUN_MARGIN: f32 = 30.0;
pub const HIGH_SUN_MARGIN: f32 = 10.0;
pub const TIGHT_NEAR_HEIGHT: f32 = 40.0;
pub const TIGHT_NEAR: f32 = 0.05;
pub const DEFAULT_NEAR: f32 = 0.1;
pub const SHADOW_FAR: f32 = 1000.0;

pub const EDGE_CASE_HEIGHT: f32 = 12.0;
pub const EDGE_CASE_ANGLE_FACTOR: f32 = 0.9;
pub const CRITICAL_HEIGHT: f32 = 35.0;
pub const EXTREME_HEIGHT: f32 = 50.0;

pub const BASE_BIAS: f32 = -0.0005;
pub const BASE_NORMAL_BIAS: f32 = 0.02;
pub const BASE_RADIUS: f32 = 4.0;

pub const BIAS_RANGE: (f32, f32) = (-0.001, 0.0);
pub const NORMAL_BIAS_RANGE: (f32, f32) = (0.005, 0.05);
pub const RADIUS_RANGE: (f32, f32) = (2.0, 12.0);
pub const SOFT_RADIUS_RANGE: (f32, f32) = (2.0, 25.0);
pub const BLUR_SAMPLE_RANGE: (u32, u32) = (8, 100);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BiasTier {
    Normal,
    Extreme,
    Critical,
    EdgeCase,
}

/// Per-tier gains: each output is `base * (scale + gain * stress) * complexity`.
#[derive(Debug, Clone, Copy)]
struct TierProfile {
    bias: (f32, f32),
    normal_bias: (f32, f32),
    radius: (f32, f32),
    blur_samples: f32,
}

impl BiasTier {
    pub fn select(height: f32, angle_factor: f32) -> Self {
        if height <= EDGE_CASE_HEIGHT && angle_factor > EDGE_CASE_ANGLE_FACTOR {
            BiasTier::EdgeCase
        } else if height < CRITICAL_HEIGHT {
            BiasTier::Critical
        } else if height < EXTREME_HEIGHT {
            BiasTier::Extreme
        } else {
            BiasTier::Normal
        }
    }

    fn profile(self) -> TierProfile {
        match self {
            BiasTier::Normal => TierProfile {
                bias: (1.0, 0.5),
                normal_bias: (1.0, 0.5),
                radius: (1.0, 0.25),
                blur_samples: 16.0,
            },
            BiasTier::Extreme => TierProfile {
                bias: (1.4, 0.8),
                normal_bias: (1.3, 0.7),
                radius: (1.25, 0.5),
                blur_samples: 24.0,
            },
            BiasTier::Critical => TierProfile {
                bias: (1.8, 1.0),
                normal_bias: (1.6, 1.0),
                radius: (1.5, 0.75),
                blur_samples: 32.0,
            },
            BiasTier::EdgeCase => TierProfile {
                bias: (2.2, 1.2),
                normal_bias: (2.0, 1.2),
                radius: (1.75, 1.0),
                blur_samples: 48.0,
            },
        }
    }
}

/// How edge-on the sun is: `1 - height / distance`, 0 overhead, toward 1 at the horizon.
pub fn angle_factor(sun_position: Vec3) -> f32 {
    let dist = sun_position.length();
    if dist <= f32::EPSILON {
        return 0.0;
    }
    (1.0 - sun_position.y / dist).clamp(0.0, 1.0)
}

/// `max(0.3, height / 120)`.
pub fn height_factor(height: f32) -> f32 {
    (height / HEIGHT_FACTOR_REFERENCE).max(HEIGHT_FACTOR_FLOOR)
}

/// Extension of the bounds beyond the terrain along X and Z. Never negative,
/// so a sun far above the arc cannot shrink the bounds inside the terrain.
pub fn directional_extension(sun_position: Vec3) -> (f32, f32) {
    let angle = sun_position.x.atan2(sun_position.z);
    let ext = (BASE_EXTENSION * (1.0 + 2.0 * (1.0 - height_factor(sun_position.y)))).max(0.0);
    (angle.sin().abs() * ext, angle.cos().abs() * ext)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShadowFrustumParams {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
    pub near: f32,
    pub far: f32,
    pub bias: f32,
    pub normal_bias: f32,
    /// Filter radius after softness scaling.
    pub radius: f32,
    pub blur_samples: u32,
    pub map_size: u32,
    pub tier: BiasTier,
    /// Added to the light position; zero outside the edge-case tier.
    pub light_offset: Vec3,
}

impl ShadowFrustumParams {
    /// Orthographic projection for the shadow camera.
    pub fn projection(&self) -> Mat4 {
        Mat4::orthographic_rh(self.left, self.right, self.bottom, self.top, self.near, self.far)
    }

    /// Light view-projection looking from the (jittered) sun at the origin.
    pub fn view_projection(&self, sun_position: Vec3) -> Mat4 {
        let eye = sun_position + self.light_offset;
        self.projection() * Mat4::look_at_rh(eye, Vec3::ZERO, Vec3::Y)
    }

    /// Whether the bounds cover the terrain's `[-100, 100]` square.
    pub fn encloses_terrain(&self) -> bool {
        self.left <= -WORLD_HALF_EXTENT
            && self.right >= WORLD_HALF_EXTENT
            && self.bottom <= -WORLD_HALF_EXTENT
            && self.top >= WORLD_HALF_EXTENT
    }
}

/// Holds the inputs that change rarely (terrain, quality, softness) and derives
/// frustum parameters for a sun position and frame tick.
#[derive(Debug, Clone)]
pub struct ShadowFrustumController {
    complexity: TerrainComplexity,
    quality: ShadowQuality,
    softness: f32,
}

impl Default for ShadowFrustumController {
    fn default() -> Self {
        Self::from_settings(&RenderSettings::default())
    }
}

impl ShadowFrustumController {
    pub fn new(quality: ShadowQuality, softness: f32) -> Self {
        Self { complexity: TerrainComplexity::default(), quality, softness }
    }

    pub fn from_settings(settings: &RenderSettings) -> Self {
        Self::new(settings.shadow_quality, settings.shadow_softness)
    }

    pub fn set_terrain_stats(&mut self, stats: &HeightStats) {
        self.complexity = TerrainComplexity::from_stats(stats);
    }

    pub fn set_complexity(&mut self, complexity: TerrainComplexity) {
        self.complexity = complexity;
    }

    pub fn set_quality(&mut self, quality: ShadowQuality) {
        self.quality = quality;
    }

    pub fn set_softness(&mut self, softness: f32) {
        self.softness = softness.max(0.0);
    }

    pub fn complexity(&self) -> TerrainComplexity {
        self.complexity
    }

    pub fn compute(&self, sun_position: Vec3, tick: u64) -> ShadowFrustumParams {
        let height = sun_position.y;
        let (ext_x, ext_z) = directional_extension(sun_position);
        let margin = if height < LOW_SUN_HEIGHT { LOW_SUN_MARGIN } else { HIGH_SUN_MARGIN };
        let half_x = WORLD_HALF_EXTENT + ext_x + margin;
        let half_z = WORLD_HALF_EXTENT + ext_z + margin;
        let near = if height < TIGHT_NEAR_HEIGHT { TIGHT_NEAR } else { DEFAULT_NEAR };

        let af = angle_factor(sun_position);
        let stress = af.powf(1.5);
        let tier = BiasTier::select(height, af);
        let profile = tier.profile();
        let c = self.complexity.factor();
        let scaled = |base: f32, (scale, gain): (f32, f32)| base * (scale + gain * stress) * c;

        let bias = scaled(BASE_BIAS, profile.bias).clamp(BIAS_RANGE.0, BIAS_RANGE.1);
        let normal_bias =
            scaled(BASE_NORMAL_BIAS, profile.normal_bias).clamp(NORMAL_BIAS_RANGE.0, NORMAL_BIAS_RANGE.1);
        let radius = scaled(BASE_RADIUS, profile.radius).clamp(RADIUS_RANGE.0, RADIUS_RANGE.1);

        let softness = self.softness / RenderSettings::default_shadow_softness();
        let radius = (radius * softness).clamp(SOFT_RADIUS_RANGE.0, SOFT_RADIUS_RANGE.1);
        let blur_samples = ((profile.blur_samples * softness).round() as u32)
            .clamp(BLUR_SAMPLE_RANGE.0, BLUR_SAMPLE_RANGE.1);

        let light_offset = if tier == BiasTier::EdgeCase { spiral_offset(tick) } else { Vec3::ZERO };

        ShadowFrustumParams {
            left: -half_x,
            right: half_x,
            top: half_z,
            bottom: -half_z,
            near,
            far: SHADOW_FAR,
            bias,
            normal_bias,
            radius,
            blur_samples,
            map_size: self.quality.map_size(),
            tier,
            light_offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sun_at(height: f32, angle_deg: f32) -> Vec3 {
        let a = angle_deg.to_radians();
        Vec3::new(a.sin() * 150.0, height, a.cos() * 150.0)
    }

    fn controller() -> ShadowFrustumController {
        ShadowFrustumController::new(ShadowQuality::Medium, 3.0)
    }

    #[test]
    fn overhead_sun_keeps_base_extension() {
        let p = controller().compute(sun_at(140.0, 180.0), 0);
        // height factor 140/120 > 1 shrinks extension below 60
        assert!(p.top < 100.0 + 60.0 + 10.0 + 1e-3);
        assert_eq!(p.near, DEFAULT_NEAR);
        assert_eq!(p.far, 1000.0);
        assert_eq!(p.tier, BiasTier::Normal);
        assert_eq!(p.map_size, 4096);
        assert!(p.encloses_terrain());
    }

    #[test]
    fn low_sun_gets_margin_and_tight_near() {
        let p = controller().compute(sun_at(30.0, 90.0), 0);
        // angle 90: all extension on X; hf floor 0.3 => ext = 60 * 2.4
        assert!((p.right - (100.0 + 144.0 + 30.0)).abs() < 1e-2);
        assert!((p.top - (100.0 + 30.0)).abs() < 1e-2);
        assert_eq!(p.near, TIGHT_NEAR);
        assert_eq!(p.tier, BiasTier::Critical);
    }

    #[test]
    fn extension_grows_as_sun_sinks_below_fifty() {
        let c = controller();
        let total = |h: f32| {
            let p = c.compute(sun_at(h, 135.0), 0);
            p.right + p.top
        };
        let mut prev = total(49.9);
        let mut h = 49.0;
        while h > 36.0 {
            let cur = total(h);
            assert!(cur > prev, "extension at {h} ({cur}) not above {prev}");
            prev = cur;
            h -= 1.0;
        }
        // below 36 the height-factor floor holds extension constant
        assert!((total(20.0) - total(30.0)).abs() < 1e-3);
    }

    #[test]
    fn tier_selection() {
        assert_eq!(BiasTier::select(10.0, 0.95), BiasTier::EdgeCase);
        assert_eq!(BiasTier::select(12.0, 0.91), BiasTier::EdgeCase);
        assert_eq!(BiasTier::select(10.0, 0.9), BiasTier::Critical);
        assert_eq!(BiasTier::select(34.9, 0.5), BiasTier::Critical);
        assert_eq!(BiasTier::select(35.0, 0.5), BiasTier::Extreme);
        assert_eq!(BiasTier::select(50.0, 0.5), BiasTier::Normal);
    }

    #[test]
    fn outputs_stay_in_safe_ranges() {
        let mut c = controller();
        for complexity in [0.5f32, 1.0, 2.5] {
            c.set_complexity(TerrainComplexity::from_parts(0.0, (complexity - 0.5) * 2.0, 0.0));
            for h in [5.0f32, 12.0, 20.0, 40.0, 80.0, 140.0, 200.0, 300.0, 1000.0] {
                let p = c.compute(sun_at(h, 200.0), 3);
                assert!((BIAS_RANGE.0..=BIAS_RANGE.1).contains(&p.bias));
                assert!((NORMAL_BIAS_RANGE.0..=NORMAL_BIAS_RANGE.1).contains(&p.normal_bias));
                assert!((2.0..=12.0).contains(&p.radius));
                assert!(p.encloses_terrain());
            }
        }
    }

    #[test]
    fn sun_far_above_arc_keeps_terrain_inside() {
        let c = controller();
        for h in [190.0f32, 200.0, 300.0, 5000.0] {
            let p = c.compute(Vec3::new(150.0, h, 0.0), 0);
            assert!(p.left <= -WORLD_HALF_EXTENT && p.right >= WORLD_HALF_EXTENT, "height {h}");
            assert!(p.bottom <= -WORLD_HALF_EXTENT && p.top >= WORLD_HALF_EXTENT, "height {h}");
            assert!(p.encloses_terrain());
        }
        assert_eq!(directional_extension(Vec3::new(150.0, 300.0, 0.0)), (0.0, 0.0));
    }

    #[test]
    fn grazing_sun_biases_harder() {
        let c = controller();
        let high = c.compute(sun_at(120.0, 45.0), 0);
        let low = c.compute(sun_at(20.0, 45.0), 0);
        assert!(low.bias < high.bias);
        assert!(low.normal_bias > high.normal_bias);
        assert!(low.blur_samples > high.blur_samples);
    }

    #[test]
    fn softness_scales_radius_and_samples() {
        let mut c = controller();
        let sun = sun_at(80.0, 10.0);
        let base = c.compute(sun, 0);
        c.set_softness(6.0);
        let soft = c.compute(sun, 0);
        assert!((soft.radius - (base.radius * 2.0).min(25.0)).abs() < 1e-4);
        assert_eq!(soft.blur_samples, 32);
        c.set_softness(0.0);
        let hard = c.compute(sun, 0);
        assert_eq!(hard.radius, 2.0);
        assert_eq!(hard.blur_samples, 8);
        c.set_softness(100.0);
        let max = c.compute(sun, 0);
        assert_eq!(max.radius, 25.0);
        assert_eq!(max.blur_samples, 100);
    }

    #[test]
    fn jitter_only_in_edge_case_tier() {
        let c = controller();
        let normal = c.compute(sun_at(60.0, 0.0), 9);
        assert_eq!(normal.light_offset, Vec3::ZERO);
        let edge = c.compute(sun_at(8.0, 0.0), 9);
        assert_eq!(edge.tier, BiasTier::EdgeCase);
        assert!(edge.light_offset.length() > 0.0);
        assert!(edge.light_offset.length() <= 0.15 + 1e-6);
        assert_eq!(edge, c.compute(sun_at(8.0, 0.0), 9));
        assert_ne!(edge.light_offset, c.compute(sun_at(8.0, 0.0), 10).light_offset);
    }

    #[test]
    fn view_projection_is_finite() {
        let sun = sun_at(60.0, 30.0);
        let p = controller().compute(sun, 0);
        let m = p.view_projection(sun);
        assert!(m.to_cols_array().iter().all(|v| v.is_finite()));
    }
}
