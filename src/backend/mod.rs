//! Rasterization backend seam.
//!
//! The renderer hands a [`SceneView`] to a [`RasterBackend`] once per frame and,
//! for depth export, asks for an off-screen frame carrying a depth channel.
//! [`SoftwareBackend`] is a CPU z-buffer rasterizer used headless and in tests;
//! `WgpuBackend` (feature `gpu`) renders on the GPU.

pub mod software;
#[cfg(feature = "gpu")]
pub mod wgpu_backend;

pub use software::SoftwareBackend;
#[cfg(feature = "gpu")]
pub use wgpu_backend::WgpuBackend;

use glam::Vec3;

use crate::camera::Camera;
use crate::colormap::RampTexture;
use crate::error::{TerrainError, TerrainResult};
use crate::lighting::SunState;
use crate::shadows::ShadowFrustumParams;
use crate::terrain::TerrainMesh;

/// Output surface size and pixel density.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputConfig {
    pub width: u32,
    pub height: u32,
    pub pixel_ratio: f32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { width: 800, height: 600, pixel_ratio: 1.0 }
    }
}

impl OutputConfig {
    pub fn new(width: u32, height: u32, pixel_ratio: f32) -> Self {
        Self { width, height, pixel_ratio }
    }

    /// Framebuffer size in device pixels.
    pub fn physical_size(&self) -> (u32, u32) {
        let scale = |v: u32| ((v as f32 * self.pixel_ratio).round() as u32).max(1);
        (scale(self.width), scale(self.height))
    }

    pub fn validate(&self) -> TerrainResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(TerrainError::config(format!(
                "output size must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if !(self.pixel_ratio.is_finite() && self.pixel_ratio > 0.0) {
            return Err(TerrainError::config(format!(
                "pixel ratio must be positive, got {}",
                self.pixel_ratio
            )));
        }
        Ok(())
    }
}

/// Everything a backend needs to draw one frame.
#[derive(Debug, Clone, Copy)]
pub struct SceneView<'a> {
    pub mesh: &'a TerrainMesh,
    pub texture: &'a RampTexture,
    pub camera: &'a Camera,
    pub sun: &'a SunState,
    pub shadow: Option<&'a ShadowFrustumParams>,
}

impl SceneView<'_> {
    /// Direction toward the light actually drawn: the sun position plus the
    /// shadow controller's jitter offset, when one is attached.
    pub fn light_direction(&self) -> Vec3 {
        let offset = self.shadow.map_or(Vec3::ZERO, |s| s.light_offset);
        (self.sun.position + offset).normalize_or_zero()
    }
}

/// Result of an off-screen pass. `depth` holds window-space depth in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct OffscreenFrame {
    pub width: u32,
    pub height: u32,
    pub color: Vec<u8>,
    pub depth: Vec<f32>,
}

impl OffscreenFrame {
    pub fn depth_at(&self, x: u32, y: u32) -> f32 {
        self.depth[y as usize * self.width as usize + x as usize]
    }
}

pub trait RasterBackend {
    fn name(&self) -> &'static str;

    fn output(&self) -> OutputConfig;

    fn set_output(&mut self, output: OutputConfig) -> TerrainResult<()>;

    /// Draw the main frame.
    fn render(&mut self, scene: &SceneView<'_>) -> TerrainResult<()>;

    /// Draw into an off-screen target at the current output size and read it back.
    fn render_offscreen(&mut self, scene: &SceneView<'_>) -> TerrainResult<OffscreenFrame>;
}

/// Lambert term with a floor so unlit slopes stay readable.
pub(crate) const AMBIENT: f32 = 0.35;

pub(crate) const CLEAR_COLOR: [u8; 4] = [178, 204, 230, 255];
