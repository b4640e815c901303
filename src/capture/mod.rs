//! Depth capture: off-screen pass, depth linearization and export.
//!
//! A capture temporarily resizes the backend output to the capture size at
//! pixel ratio 1, renders off-screen, converts window depth into a grayscale
//! image (bright = near) and restores the previous output on every path.

use std::path::Path;
use std::time::SystemTime;

use anyhow::Context;
use image::GrayImage;

use crate::backend::{OffscreenFrame, OutputConfig, RasterBackend, SceneView};
use crate::camera::CameraSnapshot;
use crate::error::{TerrainError, TerrainResult};
use crate::settings::{CaptureConfig, DEFAULT_CAPTURE_SIZE};
use crate::util::image_write::write_png_gray8;

/// Exponent applied to normalized linear depth before inversion.
pub const DEPTH_CONTRAST: f32 = 0.3;

/// `2nf / (f + n - d (f - n))` applied to a depth sample `d`.
#[inline]
pub fn linearize_depth(depth: f32, near: f32, far: f32) -> f32 {
    (2.0 * near * far) / (far + near - depth * (far - near))
}

/// Output intensity in `[0, 1]` for one depth sample; near surfaces are bright.
#[inline]
pub fn depth_intensity(depth: f32, near: f32, far: f32) -> f32 {
    let linear = linearize_depth(depth, near, far);
    let normalized = ((linear - near) / (far - near)).clamp(0.0, 1.0);
    1.0 - normalized.powf(DEPTH_CONTRAST)
}

#[derive(Debug, Clone)]
pub struct DepthCaptureResult {
    pub width: u32,
    pub height: u32,
    /// Window-space depth samples as read back from the backend.
    pub raw_depth: Vec<f32>,
    pub image: GrayImage,
    pub camera: CameraSnapshot,
    pub timestamp: SystemTime,
}

impl DepthCaptureResult {
    pub fn write_png(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        write_png_gray8(path, self.image.as_raw(), self.width, self.height)
            .with_context(|| format!("failed to export depth capture to {}", path.display()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthCaptureService {
    width: u32,
    height: u32,
}

impl Default for DepthCaptureService {
    fn default() -> Self {
        Self::new(DEFAULT_CAPTURE_SIZE, DEFAULT_CAPTURE_SIZE)
    }
}

impl From<CaptureConfig> for DepthCaptureService {
    fn from(cfg: CaptureConfig) -> Self {
        Self::new(cfg.width, cfg.height)
    }
}

impl DepthCaptureService {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Run one capture.
    ///
    /// A missing backend or scene is a [`TerrainError::RenderInit`]. A failure
    /// during the pass is logged and yields `Ok(None)`; the backend output is
    /// restored before returning in either case.
    pub fn capture(
        &self,
        backend: Option<&mut dyn RasterBackend>,
        scene: Option<&SceneView<'_>>,
    ) -> TerrainResult<Option<DepthCaptureResult>> {
        let backend = backend.ok_or_else(|| TerrainError::render_init("no rasterization context"))?;
        let scene = scene.ok_or_else(|| TerrainError::render_init("no active scene to capture"))?;

        let saved = backend.output();
        let outcome = self.run_pass(backend, scene);

        if let Err(e) = backend.set_output(saved) {
            log::error!("failed to restore {} backend output after capture: {}", backend.name(), e);
            return Err(TerrainError::capture(format!("output restore failed: {e}")));
        }

        match outcome {
            Ok(result) => {
                log::info!("captured {}x{} depth from {} backend", result.width, result.height, backend.name());
                Ok(Some(result))
            }
            Err(e) => {
                log::warn!("depth capture failed ({}), restored output {}x{}", e, saved.width, saved.height);
                Ok(None)
            }
        }
    }

    fn run_pass(&self, backend: &mut dyn RasterBackend, scene: &SceneView<'_>) -> TerrainResult<DepthCaptureResult> {
        backend.set_output(OutputConfig::new(self.width, self.height, 1.0))?;
        let frame = backend.render_offscreen(scene)?;
        if frame.depth.len() != frame.width as usize * frame.height as usize {
            return Err(TerrainError::capture(format!(
                "depth buffer has {} samples for a {}x{} target",
                frame.depth.len(),
                frame.width,
                frame.height
            )));
        }

        let mut camera = *scene.camera;
        camera.set_aspect(frame.width, frame.height);
        let image = depth_image(&frame, camera.near, camera.far)?;

        Ok(DepthCaptureResult {
            width: frame.width,
            height: frame.height,
            raw_depth: frame.depth,
            image,
            camera: camera.snapshot(),
            timestamp: SystemTime::now(),
        })
    }
}

fn depth_image(frame: &OffscreenFrame, near: f32, far: f32) -> TerrainResult<GrayImage> {
    let pixels = frame
        .depth
        .iter()
        .map(|&d| (depth_intensity(d, near, far) * 255.0).round() as u8)
        .collect();
    GrayImage::from_raw(frame.width, frame.height, pixels)
        .ok_or_else(|| TerrainError::capture("depth image size mismatch"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SoftwareBackend;
    use crate::camera::Camera;
    use crate::colormap::ColorRamp;
    use crate::heightfield::{HeightField, SeaLevel};
    use crate::lighting::SunLightModel;
    use crate::terrain::TerrainMeshBuilder;

    struct FailingBackend {
        inner: SoftwareBackend,
        seen: Vec<OutputConfig>,
    }

    impl RasterBackend for FailingBackend {
        fn name(&self) -> &'static str {
            "failing"
        }
        fn output(&self) -> OutputConfig {
            self.inner.output()
        }
        fn set_output(&mut self, output: OutputConfig) -> TerrainResult<()> {
            self.seen.push(output);
            self.inner.set_output(output)
        }
        fn render(&mut self, scene: &SceneView<'_>) -> TerrainResult<()> {
            self.inner.render(scene)
        }
        fn render_offscreen(&mut self, _scene: &SceneView<'_>) -> TerrainResult<OffscreenFrame> {
            Err(TerrainError::capture("device lost"))
        }
    }

    #[test]
    fn linearization_endpoints() {
        let (n, f) = (0.1, 1000.0);
        assert!((linearize_depth(1.0, n, f) - f).abs() < 1e-2);
        assert_eq!(depth_intensity(1.0, n, f), 0.0);
        // sample 0 lands at ~2n, just past the near plane
        assert!(depth_intensity(0.0, n, f) > 0.9);
        let mut prev = f32::INFINITY;
        for i in 0..=10 {
            let v = depth_intensity(i as f32 / 10.0, n, f);
            assert!(v <= prev);
            prev = v;
        }
    }

    #[test]
    fn missing_context_is_render_init() {
        let svc = DepthCaptureService::default();
        let err = svc.capture(None, None).unwrap_err();
        assert_eq!(err.category(), "RenderInit");
        let mut backend = SoftwareBackend::default();
        let err = svc.capture(Some(&mut backend), None).unwrap_err();
        assert_eq!(err.category(), "RenderInit");
    }

    fn with_scene<R>(f: impl FnOnce(&SceneView<'_>) -> R) -> R {
        let values: Vec<f32> = (0..100).map(|i| ((i / 10) as f32) / 9.0).collect();
        let field = HeightField::from_values(10, 10, values, SeaLevel::Synthetic).unwrap();
        let mesh = TerrainMeshBuilder::default().build(&field, 30.0).unwrap();
        let texture = ColorRamp::new(3).bake(&field);
        let camera = Camera::default();
        let sun = SunLightModel.evaluate(120.0);
        f(&SceneView { mesh: &mesh, texture: &texture, camera: &camera, sun: &sun, shadow: None })
    }

    #[test]
    fn capture_restores_output_and_brightens_near() {
        let original = OutputConfig::new(300, 200, 2.0);
        let mut backend = SoftwareBackend::new(original);
        let svc = DepthCaptureService::new(64, 64);
        let result = with_scene(|scene| svc.capture(Some(&mut backend), Some(scene)))
            .unwrap()
            .unwrap();
        assert_eq!(backend.output(), original);
        assert_eq!((result.width, result.height), (64, 64));
        assert_eq!(result.raw_depth.len(), 64 * 64);
        assert!((result.camera.aspect - 1.0).abs() < 1e-6);
        // sky stays black, terrain at the center is lit
        assert_eq!(result.image.get_pixel(0, 0).0[0], 0);
        assert!(result.image.get_pixel(32, 32).0[0] > 0);
        // the lower part of the view is closer than the center
        let bottom = result.image.get_pixel(32, 48).0[0];
        let center = result.image.get_pixel(32, 32).0[0];
        assert!(bottom > center, "bottom {bottom} center {center}");
    }

    #[test]
    fn failed_pass_returns_none_and_restores() {
        let original = OutputConfig::new(120, 90, 1.5);
        let mut backend = FailingBackend { inner: SoftwareBackend::new(original), seen: Vec::new() };
        let svc = DepthCaptureService::default();
        let result = with_scene(|scene| svc.capture(Some(&mut backend), Some(scene))).unwrap();
        assert!(result.is_none());
        assert_eq!(backend.output(), original);
        assert_eq!(backend.seen, vec![OutputConfig::new(512, 512, 1.0), original]);
    }

    #[test]
    fn png_export() {
        let mut backend = SoftwareBackend::default();
        let svc = DepthCaptureService::new(16, 8);
        let result = with_scene(|scene| svc.capture(Some(&mut backend), Some(scene)))
            .unwrap()
            .unwrap();
        let path = std::env::temp_dir().join(format!("relief3d-depth-{}.png", std::process::id()));
        result.write_png(&path).unwrap();
        let back = image::open(&path).unwrap().to_luma8();
        assert_eq!(back, result.image);
        let _ = std::fs::remove_file(path);
    }
}
