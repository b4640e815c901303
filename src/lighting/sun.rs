// src/lighting/sun.rs
// Time-of-day sun: control angle -> position, intensity and color band
// RELEVANT FILES: src/shadows/frustum.rs, src/renderer.rs

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Start of the traversal arc in degrees.
pub const ARC_START_DEG: f32 = 60.0;
/// Width of the traversal arc in degrees.
pub const ARC_SPAN_DEG: f32 = 240.0;
/// Horizontal distance of the sun from the origin.
pub const ORBIT_RADIUS: f32 = 150.0;
pub const HORIZON_HEIGHT: f32 = 15.0;
pub const ZENITH_HEIGHT: f32 = 140.0;
pub const MIN_HEIGHT: f32 = 8.0;
pub const MIN_INTENSITY: f32 = 0.3;
pub const MAX_INTENSITY: f32 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SunColor {
    WarmOrange,
    WarmYellow,
    White,
}

impl SunColor {
    /// Band for elevation factor `e`.
    pub fn for_elevation(e: f32) -> Self {
        if e < 0.3 {
            SunColor::WarmOrange
        } else if e < 0.6 {
            SunColor::WarmYellow
        } else {
            SunColor::White
        }
    }

    pub fn rgb(self) -> [f32; 3] {
        match self {
            SunColor::WarmOrange => [1.0, 0.533, 0.267],
            SunColor::WarmYellow => [1.0, 0.867, 0.6],
            SunColor::White => [1.0, 1.0, 1.0],
        }
    }
}

/// Light state derived from one control angle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SunState {
    pub position: Vec3,
    pub intensity: f32,
    pub color: SunColor,
    pub elevation_factor: f32,
    pub real_angle_deg: f32,
}

impl SunState {
    pub fn height(&self) -> f32 {
        self.position.y
    }

    /// Unit vector from the origin toward the sun.
    pub fn direction(&self) -> Vec3 {
        self.position.normalize_or_zero()
    }

    pub fn rgb(&self) -> [f32; 3] {
        self.color.rgb()
    }
}

/// Visible marker for the sun, kept in lockstep with the light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SunMarker {
    pub position: Vec3,
    pub color: [f32; 3],
}

impl From<&SunState> for SunMarker {
    fn from(sun: &SunState) -> Self {
        Self { position: sun.position, color: sun.rgb() }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SunLightModel;

impl SunLightModel {
    /// Map the exposed `[0, 360]` control onto the traversal arc.
    pub fn real_angle(angle: f32) -> f32 {
        ARC_START_DEG + (angle.clamp(0.0, 360.0) / 360.0) * ARC_SPAN_DEG
    }

    /// 0 at both ends of the arc, 1 at its midpoint.
    pub fn elevation_factor(real_angle_deg: f32) -> f32 {
        let t = (real_angle_deg - ARC_START_DEG) / ARC_SPAN_DEG;
        (t * std::f32::consts::PI).sin().max(0.0)
    }

    pub fn evaluate(&self, angle: f32) -> SunState {
        let real = Self::real_angle(angle);
        let e = Self::elevation_factor(real);
        let height = (HORIZON_HEIGHT + (ZENITH_HEIGHT - HORIZON_HEIGHT) * e).max(MIN_HEIGHT);
        let rad = real.to_radians();
        let position = Vec3::new(rad.sin() * ORBIT_RADIUS, height, rad.cos() * ORBIT_RADIUS);
        SunState {
            position,
            intensity: MIN_INTENSITY + (MAX_INTENSITY - MIN_INTENSITY) * e,
            color: SunColor::for_elevation(e),
            elevation_factor: e,
            real_angle_deg: real,
        }
    }
}
