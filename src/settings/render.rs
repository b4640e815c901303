// src/settings/render.rs
// Live render settings and the individual changes an external caller can apply
// RELEVANT FILES: src/renderer.rs, src/settings/config.rs

use serde::{Deserialize, Serialize};

use super::quality::{MeshQuality, ShadowQuality};
use crate::error::{TerrainError, TerrainResult};

/// Upper end of the exposed sun control range in degrees.
pub const SUN_ANGLE_MAX: f32 = 360.0;

/// Current render settings. One instance is owned by the renderer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RenderSettings {
    #[serde(default = "RenderSettings::default_height_scale")]
    pub height_scale: f32,
    /// Sun control angle in `[0, 360]`.
    #[serde(default = "RenderSettings::default_sun_position")]
    pub sun_position: f32,
    #[serde(default)]
    pub shadow_quality: ShadowQuality,
    #[serde(default = "RenderSettings::default_shadow_softness")]
    pub shadow_softness: f32,
    /// Passed through to display collaborators; not interpreted here.
    #[serde(default = "RenderSettings::default_color_mode")]
    pub color_mode: String,
}

impl RenderSettings {
    const fn default_height_scale() -> f32 {
        30.0
    }

    const fn default_sun_position() -> f32 {
        120.0
    }

    pub const fn default_shadow_softness() -> f32 {
        3.0
    }

    fn default_color_mode() -> String {
        "altitude".to_string()
    }

    pub fn validate(&self) -> TerrainResult<()> {
        validate_height_scale(self.height_scale)?;
        validate_sun_position(self.sun_position)?;
        validate_softness(self.shadow_softness)?;
        Ok(())
    }

    /// Return a copy with `change` applied, validated.
    pub fn with_change(&self, change: &SettingsChange) -> TerrainResult<Self> {
        let mut next = self.clone();
        match change {
            SettingsChange::HeightScale(v) => next.height_scale = *v,
            SettingsChange::SunPosition(v) => next.sun_position = *v,
            SettingsChange::ShadowQuality(q) => next.shadow_quality = *q,
            SettingsChange::ShadowSoftness(v) => next.shadow_softness = *v,
            SettingsChange::ColorMode(m) => next.color_mode = m.clone(),
            SettingsChange::MeshQuality(_) => {}
        }
        next.validate()?;
        Ok(next)
    }
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            height_scale: Self::default_height_scale(),
            sun_position: Self::default_sun_position(),
            shadow_quality: ShadowQuality::default(),
            shadow_softness: Self::default_shadow_softness(),
            color_mode: Self::default_color_mode(),
        }
    }
}

/// One externally requested settings update.
#[derive(Clone, Debug, PartialEq)]
pub enum SettingsChange {
    HeightScale(f32),
    SunPosition(f32),
    ShadowQuality(ShadowQuality),
    ShadowSoftness(f32),
    MeshQuality(MeshQuality),
    ColorMode(String),
}

impl SettingsChange {
    /// Whether the terrain mesh must be rebuilt.
    pub fn rebuilds_mesh(&self) -> bool {
        matches!(self, Self::HeightScale(_) | Self::MeshQuality(_))
    }

    /// Whether the sun light must be recomputed.
    pub fn rebuilds_light(&self) -> bool {
        matches!(self, Self::SunPosition(_))
    }

    /// Whether shadow-frustum parameters must be recomputed.
    pub fn rebuilds_shadow(&self) -> bool {
        !matches!(self, Self::ColorMode(_))
    }
}

pub(crate) fn validate_height_scale(v: f32) -> TerrainResult<()> {
    if !v.is_finite() || v < 0.0 {
        return Err(TerrainError::config(format!(
            "height_scale must be finite and >= 0, got {v}"
        )));
    }
    Ok(())
}

pub(crate) fn validate_sun_position(v: f32) -> TerrainResult<()> {
    if !v.is_finite() || !(0.0..=SUN_ANGLE_MAX).contains(&v) {
        return Err(TerrainError::config(format!(
            "sun_position must be within [0, {SUN_ANGLE_MAX}], got {v}"
        )));
    }
    Ok(())
}

pub(crate) fn validate_softness(v: f32) -> TerrainResult<()> {
    if !v.is_finite() || v < 0.0 {
        return Err(TerrainError::config(format!(
            "shadow_softness must be finite and >= 0, got {v}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let s = RenderSettings::default();
        s.validate().unwrap();
        assert_eq!(s.shadow_softness, 3.0);
    }

    #[test]
    fn change_is_validated_without_mutating_source() {
        let s = RenderSettings::default();
        assert!(s.with_change(&SettingsChange::SunPosition(361.0)).is_err());
        assert!(s.with_change(&SettingsChange::HeightScale(-1.0)).is_err());
        assert!(s.with_change(&SettingsChange::ShadowSoftness(f32::NAN)).is_err());
        let next = s.with_change(&SettingsChange::SunPosition(360.0)).unwrap();
        assert_eq!(next.sun_position, 360.0);
        assert_eq!(s.sun_position, RenderSettings::default().sun_position);
    }

    #[test]
    fn rebuild_routing() {
        assert!(SettingsChange::HeightScale(1.0).rebuilds_mesh());
        assert!(SettingsChange::MeshQuality(MeshQuality::Low).rebuilds_mesh());
        assert!(!SettingsChange::SunPosition(10.0).rebuilds_mesh());
        assert!(SettingsChange::SunPosition(10.0).rebuilds_light());
        assert!(SettingsChange::ShadowSoftness(1.0).rebuilds_shadow());
        assert!(!SettingsChange::ColorMode("slope".into()).rebuilds_shadow());
    }

    #[test]
    fn missing_fields_use_defaults() {
        let s: RenderSettings = serde_json::from_str(r#"{"sun_position": 200.0}"#).unwrap();
        assert_eq!(s.sun_position, 200.0);
        assert_eq!(s.height_scale, 30.0);
        assert_eq!(s.shadow_quality, ShadowQuality::Medium);
    }
}
