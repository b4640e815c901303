// src/renderer.rs
// Terrain renderer: owns the scene slots, applies settings by rebuild-then-swap, drives frames and captures
// RELEVANT FILES: src/settings/render.rs, src/backend/mod.rs, src/capture/mod.rs, src/loader.rs

use std::sync::Arc;

use crate::backend::{RasterBackend, SceneView};
use crate::camera::Camera;
use crate::capture::{DepthCaptureResult, DepthCaptureService};
use crate::colormap::{ColorRamp, RampTexture};
use crate::error::{TerrainError, TerrainResult};
use crate::heightfield::HeightField;
use crate::lighting::{SunLightModel, SunMarker, SunState};
use crate::settings::{MeshQuality, RenderSettings, RendererConfig, SettingsChange};
use crate::shadows::{ShadowFrustumController, ShadowFrustumParams};
use crate::terrain::{TerrainMesh, TerrainMeshBuilder, TerrainMeshConfig};

/// The replaceable terrain member of the scene.
#[derive(Debug, Clone)]
pub struct TerrainNode {
    pub key: String,
    pub field: Arc<HeightField>,
    pub mesh: Arc<TerrainMesh>,
    pub texture: Arc<RampTexture>,
}

/// Permanent scene members plus the single terrain slot.
#[derive(Debug, Clone)]
pub struct SceneSlots {
    pub sun_light: SunState,
    pub sun_marker: SunMarker,
    pub shadow: ShadowFrustumParams,
    pub terrain: Option<TerrainNode>,
}

pub struct TerrainRenderer {
    settings: RenderSettings,
    mesh_quality: MeshQuality,
    camera: Camera,
    sun_model: SunLightModel,
    shadows: ShadowFrustumController,
    ramp: ColorRamp,
    capture: DepthCaptureService,
    backend: Option<Box<dyn RasterBackend>>,
    slots: SceneSlots,
    frame_index: u64,
}

impl TerrainRenderer {
    pub fn new(config: &RendererConfig) -> TerrainResult<Self> {
        config.validate()?;
        let sun_model = SunLightModel;
        let sun = sun_model.evaluate(config.settings.sun_position);
        let shadows = ShadowFrustumController::from_settings(&config.settings);
        let shadow = shadows.compute(sun.position, 0);
        let aspect = config.capture.width as f32 / config.capture.height as f32;
        Ok(Self {
            settings: config.settings.clone(),
            mesh_quality: config.mesh_quality,
            camera: Camera::from_config(&config.camera, aspect),
            sun_model,
            shadows,
            ramp: ColorRamp::new(config.dither_seed),
            capture: DepthCaptureService::from(config.capture),
            backend: None,
            slots: SceneSlots { sun_light: sun, sun_marker: SunMarker::from(&sun), shadow, terrain: None },
            frame_index: 0,
        })
    }

    pub fn with_backend(mut self, backend: Box<dyn RasterBackend>) -> Self {
        self.set_backend(backend);
        self
    }

    pub fn set_backend(&mut self, backend: Box<dyn RasterBackend>) {
        log::info!("renderer attached to {} backend", backend.name());
        self.backend = Some(backend);
    }

    pub fn take_backend(&mut self) -> Option<Box<dyn RasterBackend>> {
        self.backend.take()
    }

    pub fn backend(&self) -> Option<&dyn RasterBackend> {
        self.backend.as_deref()
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    pub fn mesh_quality(&self) -> MeshQuality {
        self.mesh_quality
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn slots(&self) -> &SceneSlots {
        &self.slots
    }

    pub fn terrain(&self) -> Option<&TerrainNode> {
        self.slots.terrain.as_ref()
    }

    pub fn sun(&self) -> &SunState {
        &self.slots.sun_light
    }

    pub fn shadow_params(&self) -> &ShadowFrustumParams {
        &self.slots.shadow
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    fn mesh_builder(&self, quality: MeshQuality) -> TerrainMeshBuilder {
        TerrainMeshBuilder::new(TerrainMeshConfig::new(quality))
    }

    /// Build mesh and texture for `field`, then replace the terrain slot.
    pub fn set_terrain(&mut self, key: impl Into<String>, field: Arc<HeightField>) -> TerrainResult<()> {
        let key = key.into();
        let mesh = self.mesh_builder(self.mesh_quality).build(&field, self.settings.height_scale)?;
        let texture = self.ramp.bake(&field);
        let mut shadows = self.shadows.clone();
        shadows.set_terrain_stats(field.stats());
        let shadow = shadows.compute(self.slots.sun_light.position, self.frame_index);

        log::info!(
            "terrain '{}' swapped in: {} vertices, complexity {:.2}",
            key,
            mesh.vertex_count(),
            shadows.complexity().factor()
        );
        self.shadows = shadows;
        self.slots.shadow = shadow;
        self.slots.terrain = Some(TerrainNode {
            key,
            field,
            mesh: Arc::new(mesh),
            texture: Arc::new(texture),
        });
        Ok(())
    }

    /// Drop the terrain slot; lights stay.
    pub fn clear_terrain(&mut self) -> Option<TerrainNode> {
        self.slots.terrain.take()
    }

    /// Apply one settings change. Every affected artifact is rebuilt first; the
    /// live scene is only touched once all rebuilds succeeded.
    pub fn update(&mut self, change: SettingsChange) -> TerrainResult<()> {
        match self.rebuild(&change) {
            Ok(staged) => {
                self.swap(staged);
                log::debug!("applied {:?}", change);
                Ok(())
            }
            Err(e) => {
                log::warn!("rejected {:?} [{}]: {}; keeping previous scene", change, e.category(), e);
                Err(e)
            }
        }
    }

    fn rebuild(&self, change: &SettingsChange) -> TerrainResult<Staged> {
        let settings = self.settings.with_change(change)?;
        let mesh_quality = match change {
            SettingsChange::MeshQuality(q) => *q,
            _ => self.mesh_quality,
        };

        let mesh = match (&self.slots.terrain, change.rebuilds_mesh()) {
            (Some(node), true) => Some(Arc::new(
                self.mesh_builder(mesh_quality).build(&node.field, settings.height_scale)?,
            )),
            _ => None,
        };

        let sun = if change.rebuilds_light() {
            self.sun_model.evaluate(settings.sun_position)
        } else {
            self.slots.sun_light
        };

        let mut shadows = self.shadows.clone();
        shadows.set_quality(settings.shadow_quality);
        shadows.set_softness(settings.shadow_softness);
        let shadow = if change.rebuilds_shadow() {
            shadows.compute(sun.position, self.frame_index)
        } else {
            self.slots.shadow
        };

        Ok(Staged { settings, mesh_quality, mesh, sun, shadows, shadow })
    }

    fn swap(&mut self, staged: Staged) {
        self.settings = staged.settings;
        self.mesh_quality = staged.mesh_quality;
        if let (Some(node), Some(mesh)) = (self.slots.terrain.as_mut(), staged.mesh) {
            node.mesh = mesh;
        }
        self.slots.sun_light = staged.sun;
        self.slots.sun_marker = SunMarker::from(&staged.sun);
        self.shadows = staged.shadows;
        self.slots.shadow = staged.shadow;
    }

    /// Advance to `frame_index`: refresh time-dependent shadow state and draw
    /// one frame when a backend and terrain are present. Returns whether a
    /// frame was drawn.
    pub fn tick(&mut self, frame_index: u64) -> TerrainResult<bool> {
        self.frame_index = frame_index;
        self.slots.shadow = self.shadows.compute(self.slots.sun_light.position, frame_index);

        let (Some(backend), Some(node)) = (self.backend.as_mut(), self.slots.terrain.as_ref()) else {
            log::trace!("tick {} without backend or terrain", frame_index);
            return Ok(false);
        };
        let scene = SceneView {
            mesh: &node.mesh,
            texture: &node.texture,
            camera: &self.camera,
            sun: &self.slots.sun_light,
            shadow: Some(&self.slots.shadow),
        };
        backend.render(&scene)?;
        Ok(true)
    }

    /// Capture the current view's depth. Holds the backend exclusively for
    /// the duration; see [`DepthCaptureService::capture`] for failure modes.
    pub fn capture_depth(&mut self) -> TerrainResult<Option<DepthCaptureResult>> {
        let scene = self.slots.terrain.as_ref().map(|node| SceneView {
            mesh: &node.mesh,
            texture: &node.texture,
            camera: &self.camera,
            sun: &self.slots.sun_light,
            shadow: Some(&self.slots.shadow),
        });
        let backend: Option<&mut dyn RasterBackend> = match self.backend.as_mut() {
            Some(b) => Some(b.as_mut()),
            None => None,
        };
        if scene.is_none() && backend.is_some() {
            return Err(TerrainError::render_init("no terrain in scene"));
        }
        self.capture.capture(backend, scene.as_ref())
    }
}

struct Staged {
    settings: RenderSettings,
    mesh_quality: MeshQuality,
    mesh: Option<Arc<TerrainMesh>>,
    sun: SunState,
    shadows: ShadowFrustumController,
    shadow: ShadowFrustumParams,
}
