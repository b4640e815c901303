// src/backend/software.rs
// CPU z-buffer rasterizer implementing the backend seam without a GPU
// RELEVANT FILES: src/backend/mod.rs, src/capture/mod.rs, src/terrain/mesh.rs

use glam::{Vec3, Vec4};

use super::{OffscreenFrame, OutputConfig, RasterBackend, SceneView, AMBIENT, CLEAR_COLOR};
use crate::error::{TerrainError, TerrainResult};

#[derive(Debug, Clone)]
struct ScreenVertex {
    x: f32,
    y: f32,
    z: f32,
    inv_w: f32,
    u_w: f32,
    v_w: f32,
    shade: f32,
}

#[derive(Debug, Default)]
pub struct SoftwareBackend {
    output: OutputConfig,
    frame: Option<OffscreenFrame>,
    frames_rendered: u64,
}

impl SoftwareBackend {
    pub fn new(output: OutputConfig) -> Self {
        Self { output, frame: None, frames_rendered: 0 }
    }

    /// Last frame drawn by [`RasterBackend::render`].
    pub fn last_frame(&self) -> Option<&OffscreenFrame> {
        self.frame.as_ref()
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    fn rasterize(&self, scene: &SceneView<'_>) -> TerrainResult<OffscreenFrame> {
        let (width, height) = self.output.physical_size();
        let mut camera = *scene.camera;
        camera.set_aspect(width, height);
        let view_proj = camera.view_projection();

        let sun_dir = scene.light_direction();
        let intensity = scene.sun.intensity;
        let sun_rgb = scene.sun.rgb();

        let (w, h) = (width as f32, height as f32);
        let verts: Vec<Option<ScreenVertex>> = scene
            .mesh
            .vertices
            .iter()
            .map(|v| {
                let clip = view_proj * Vec4::new(v.position[0], v.position[1], v.position[2], 1.0);
                if clip.w <= f32::EPSILON {
                    return None;
                }
                let inv_w = 1.0 / clip.w;
                let ndc = clip.truncate() * inv_w;
                let lambert = Vec3::from(v.normal).dot(sun_dir).max(0.0);
                Some(ScreenVertex {
                    x: (ndc.x * 0.5 + 0.5) * w,
                    y: (0.5 - ndc.y * 0.5) * h,
                    z: ndc.z,
                    inv_w,
                    u_w: v.uv[0] * inv_w,
                    v_w: v.uv[1] * inv_w,
                    shade: AMBIENT + intensity * lambert,
                })
            })
            .collect();

        let n = width as usize * height as usize;
        let mut depth = vec![1.0f32; n];
        let mut color: Vec<u8> = CLEAR_COLOR.iter().copied().cycle().take(n * 4).collect();

        for [a, b, c] in scene.mesh.indices.triangles() {
            let fetch = |i: u32| verts.get(i as usize).and_then(|v| v.as_ref());
            let (Some(p0), Some(p1), Some(p2)) = (fetch(a), fetch(b), fetch(c)) else {
                continue;
            };
            let area = edge(p0, p1, p2.x, p2.y);
            if area.abs() <= f32::EPSILON {
                continue;
            }
            let min_x = p0.x.min(p1.x).min(p2.x).floor().max(0.0) as u32;
            let max_x = p0.x.max(p1.x).max(p2.x).ceil().min(w - 1.0).max(0.0) as u32;
            let min_y = p0.y.min(p1.y).min(p2.y).floor().max(0.0) as u32;
            let max_y = p0.y.max(p1.y).max(p2.y).ceil().min(h - 1.0).max(0.0) as u32;
            if p0.x.max(p1.x).max(p2.x) < 0.0 || p0.y.max(p1.y).max(p2.y) < 0.0 {
                continue;
            }

            for py in min_y..=max_y {
                for px in min_x..=max_x {
                    let (sx, sy) = (px as f32 + 0.5, py as f32 + 0.5);
                    let w0 = edge(p1, p2, sx, sy) / area;
                    let w1 = edge(p2, p0, sx, sy) / area;
                    let w2 = edge(p0, p1, sx, sy) / area;
                    if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                        continue;
                    }
                    let z = w0 * p0.z + w1 * p1.z + w2 * p2.z;
                    if !(0.0..=1.0).contains(&z) {
                        continue;
                    }
                    let idx = py as usize * width as usize + px as usize;
                    if z >= depth[idx] {
                        continue;
                    }
                    depth[idx] = z;

                    let inv_w = w0 * p0.inv_w + w1 * p1.inv_w + w2 * p2.inv_w;
                    let u = (w0 * p0.u_w + w1 * p1.u_w + w2 * p2.u_w) / inv_w;
                    let v = (w0 * p0.v_w + w1 * p1.v_w + w2 * p2.v_w) / inv_w;
                    let shade = w0 * p0.shade + w1 * p1.shade + w2 * p2.shade;
                    let texel = scene.texture.sample_nearest(u, v);
                    let out = &mut color[idx * 4..idx * 4 + 4];
                    for ch in 0..3 {
                        out[ch] = (texel[ch] as f32 * shade * sun_rgb[ch]).round().clamp(0.0, 255.0) as u8;
                    }
                    out[3] = 255;
                }
            }
        }

        Ok(OffscreenFrame { width, height, color, depth })
    }
}

#[inline]
fn edge(a: &ScreenVertex, b: &ScreenVertex, x: f32, y: f32) -> f32 {
    (b.x - a.x) * (y - a.y) - (b.y - a.y) * (x - a.x)
}

impl RasterBackend for SoftwareBackend {
    fn name(&self) -> &'static str {
        "software"
    }

    fn output(&self) -> OutputConfig {
        self.output
    }

    fn set_output(&mut self, output: OutputConfig) -> TerrainResult<()> {
        output.validate()?;
        self.output = output;
        Ok(())
    }

    fn render(&mut self, scene: &SceneView<'_>) -> TerrainResult<()> {
        let frame = self.rasterize(scene)?;
        self.frame = Some(frame);
        self.frames_rendered += 1;
        Ok(())
    }

    fn render_offscreen(&mut self, scene: &SceneView<'_>) -> TerrainResult<OffscreenFrame> {
        if scene.mesh.indices.is_empty() {
            return Err(TerrainError::capture("scene has no triangles to draw"));
        }
        self.rasterize(scene)
    }
}
