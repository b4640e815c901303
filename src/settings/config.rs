use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::quality::MeshQuality;
use super::render::RenderSettings;
use crate::error::{TerrainError, TerrainResult};

/// Default edge length of a depth capture in pixels.
pub const DEFAULT_CAPTURE_SIZE: u32 = 512;

/// Largest accepted capture edge, matching the biggest shadow-map target.
pub const MAX_CAPTURE_SIZE: u32 = 16384;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureConfig {
    #[serde(default = "CaptureConfig::default_size")]
    pub width: u32,
    #[serde(default = "CaptureConfig::default_size")]
    pub height: u32,
}

impl CaptureConfig {
    const fn default_size() -> u32 {
        DEFAULT_CAPTURE_SIZE
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_CAPTURE_SIZE,
            height: DEFAULT_CAPTURE_SIZE,
        }
    }
}

/// Initial perspective camera.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub position: [f32; 3],
    pub target: [f32; 3],
    pub fov_deg: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [0.0, 180.0, 220.0],
            target: [0.0, 0.0, 0.0],
            fov_deg: 45.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

/// Everything the renderer needs at start-up, loadable from JSON.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RendererConfig {
    #[serde(default)]
    pub settings: RenderSettings,
    #[serde(default)]
    pub mesh_quality: MeshQuality,
    #[serde(default)]
    pub capture: CaptureConfig,
    /// Source keys whose heights keep a below-sea-level band.
    #[serde(default)]
    pub sea_level_keys: Vec<String>,
    /// Seed for the color ramp dither.
    #[serde(default)]
    pub dither_seed: u64,
    #[serde(default)]
    pub camera: CameraConfig,
}

impl RendererConfig {
    pub fn from_json_str(text: &str) -> TerrainResult<Self> {
        let config: Self = serde_json::from_str(text)
            .map_err(|e| TerrainError::config(format!("invalid renderer config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_json(path: impl AsRef<Path>) -> TerrainResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        log::debug!("loading renderer config from {}", path.display());
        Self::from_json_str(&text)
    }

    pub fn is_sea_level_key(&self, key: &str) -> bool {
        self.sea_level_keys.iter().any(|k| k == key)
    }

    pub fn validate(&self) -> TerrainResult<()> {
        self.settings.validate()?;
        if self.capture.width == 0 || self.capture.height == 0 {
            return Err(TerrainError::config(format!(
                "capture size must be non-zero, got {}x{}",
                self.capture.width, self.capture.height
            )));
        }
        if self.capture.width > MAX_CAPTURE_SIZE || self.capture.height > MAX_CAPTURE_SIZE {
            return Err(TerrainError::config(format!(
                "capture size {}x{} exceeds {MAX_CAPTURE_SIZE} per edge",
                self.capture.width, self.capture.height
            )));
        }
        let cam = &self.camera;
        if !(cam.fov_deg > 0.0 && cam.fov_deg < 180.0) {
            return Err(TerrainError::config(format!(
                "camera.fov_deg must be within (0, 180), got {}",
                cam.fov_deg
            )));
        }
        if !(cam.near > 0.0 && cam.far > cam.near) {
            return Err(TerrainError::config(format!(
                "camera clip range invalid: near={} far={}",
                cam.near, cam.far
            )));
        }
        if cam.position == cam.target {
            return Err(TerrainError::config("camera.position equals camera.target"));
        }
        Ok(())
    }
}
