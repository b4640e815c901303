//! Terrain mesh generation from a decoded height field.
//! Positions span world XZ in [-100, 100]; Y is the scaled height sample.
//! Grid index (ix, iy) reads source pixel (W-1-round(ix/segX*(W-1)), H-1-round(iy/segY*(H-1))),
//! i.e. the source image is mirrored on both axes.
//! UVs are (ix/segX, iy/segY) and address the X-flipped ramp texture so texel and height agree.
//! Indices form two triangles per cell wound so that face normals point to +Y.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use crate::error::{TerrainError, TerrainResult};
use crate::heightfield::HeightField;
use crate::settings::MeshQuality;

/// Half the world-space edge length of the terrain on X and Z.
pub const WORLD_HALF_EXTENT: f32 = 100.0;

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Zeroable, Pod)]
pub struct TerrainVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

#[derive(Debug, Clone, PartialEq)]
pub enum Indices {
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl Indices {
    pub fn len(&self) -> usize {
        match self {
            Indices::U16(v) => v.len(),
            Indices::U32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, i: usize) -> Option<u32> {
        match self {
            Indices::U16(v) => v.get(i).map(|&x| x as u32),
            Indices::U32(v) => v.get(i).copied(),
        }
    }

    /// Iterate triangles as vertex index triples.
    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        (0..self.len() / 3).filter_map(move |t| {
            Some([self.get(t * 3)?, self.get(t * 3 + 1)?, self.get(t * 3 + 2)?])
        })
    }
}

#[inline]
fn choose_u16(count_vertices: usize) -> bool {
    count_vertices <= u16::MAX as usize
}

/// Axis-aligned bounds of a mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    fn from_points<'a>(points: impl Iterator<Item = &'a [f32; 3]>) -> Self {
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);
        for p in points {
            let p = Vec3::from(*p);
            min = min.min(p);
            max = max.max(p);
        }
        Self { min, max }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn contains(&self, p: Vec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

/// Segment caps for a mesh build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TerrainMeshConfig {
    pub quality: MeshQuality,
}

impl TerrainMeshConfig {
    pub fn new(quality: MeshQuality) -> Self {
        Self { quality }
    }

    /// Segment counts per axis: `min(cap, dimension - 1)`, never upsampled.
    pub fn segments(&self, width: u32, height: u32) -> TerrainResult<(u32, u32)> {
        if width < 2 || height < 2 {
            return Err(TerrainError::format(format!(
                "mesh source must be at least 2x2, got {width}x{height}"
            )));
        }
        let cap = self.quality.max_segments();
        Ok((cap.min(width - 1), cap.min(height - 1)))
    }
}

/// A triangulated terrain surface ready for a rasterization backend.
#[derive(Debug, Clone)]
pub struct TerrainMesh {
    pub segments_x: u32,
    pub segments_y: u32,
    pub vertices: Vec<TerrainVertex>,
    pub indices: Indices,
    pub bounds: Aabb,
    pub sphere: BoundingSphere,
}

impl TerrainMesh {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Map grid index `i` of `seg` segments to a mirrored source index in `0..dim`.
#[inline]
pub(crate) fn grid_to_source(i: u32, seg: u32, dim: u32) -> u32 {
    let t = i as f32 / seg as f32;
    let forward = (t * (dim - 1) as f32).round() as u32;
    (dim - 1) - forward.min(dim - 1)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TerrainMeshBuilder {
    config: TerrainMeshConfig,
}

impl TerrainMeshBuilder {
    pub fn new(config: TerrainMeshConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> TerrainMeshConfig {
        self.config
    }

    pub fn build(&self, field: &HeightField, height_scale: f32) -> TerrainResult<TerrainMesh> {
        if !height_scale.is_finite() || height_scale < 0.0 {
            return Err(TerrainError::config(format!(
                "height_scale must be finite and >= 0, got {height_scale}"
            )));
        }
        let (w, h) = (field.width(), field.height());
        let (seg_x, seg_y) = self.config.segments(w, h)?;
        let cols = seg_x as usize + 1;
        let rows = seg_y as usize + 1;
        let n_verts = cols * rows;

        let dx = 2.0 * WORLD_HALF_EXTENT / seg_x as f32;
        let dz = 2.0 * WORLD_HALF_EXTENT / seg_y as f32;

        let mut vertices = Vec::with_capacity(n_verts);
        for iy in 0..=seg_y {
            let z = -WORLD_HALF_EXTENT + iy as f32 * dz;
            let py = grid_to_source(iy, seg_y, h);
            let v = iy as f32 / seg_y as f32;
            for ix in 0..=seg_x {
                let x = -WORLD_HALF_EXTENT + ix as f32 * dx;
                let px = grid_to_source(ix, seg_x, w);
                let u = ix as f32 / seg_x as f32;
                vertices.push(TerrainVertex {
                    position: [x, field.get(px, py) * height_scale, z],
                    normal: [0.0, 1.0, 0.0],
                    uv: [u, v],
                });
            }
        }

        let indices = if choose_u16(n_verts) {
            let mut idx: Vec<u16> = Vec::with_capacity(seg_x as usize * seg_y as usize * 6);
            for_each_cell(cols, rows, |q| idx.extend(q.iter().map(|&i| i as u16)));
            Indices::U16(idx)
        } else {
            let mut idx: Vec<u32> = Vec::with_capacity(seg_x as usize * seg_y as usize * 6);
            for_each_cell(cols, rows, |q| idx.extend(q.iter().map(|&i| i as u32)));
            Indices::U32(idx)
        };

        smooth_normals(&mut vertices, &indices);

        let bounds = Aabb::from_points(vertices.iter().map(|v| &v.position));
        let center = bounds.center();
        let radius = vertices
            .iter()
            .map(|v| Vec3::from(v.position).distance(center))
            .fold(0.0f32, f32::max);

        log::debug!(
            "built terrain mesh {}x{} segments ({} vertices) from {}x{} source at {:?}",
            seg_x,
            seg_y,
            n_verts,
            w,
            h,
            self.config.quality
        );

        Ok(TerrainMesh {
            segments_x: seg_x,
            segments_y: seg_y,
            vertices,
            indices,
            bounds,
            sphere: BoundingSphere { center, radius },
        })
    }
}

/// Emit the six indices of every grid cell: (i0, i2, i1) and (i1, i2, i3).
fn for_each_cell(cols: usize, rows: usize, mut emit: impl FnMut(&[usize; 6])) {
    for y in 0..(rows - 1) {
        let row = y * cols;
        for x in 0..(cols - 1) {
            let i0 = row + x;
            let i1 = i0 + 1;
            let i2 = i0 + cols;
            let i3 = i2 + 1;
            emit(&[i0, i2, i1, i1, i2, i3]);
        }
    }
}

/// Area-weighted average of adjacent face normals.
fn smooth_normals(vertices: &mut [TerrainVertex], indices: &Indices) {
    let mut acc = vec![Vec3::ZERO; vertices.len()];
    for [a, b, c] in indices.triangles() {
        let (a, b, c) = (a as usize, b as usize, c as usize);
        let p0 = Vec3::from(vertices[a].position);
        let p1 = Vec3::from(vertices[b].position);
        let p2 = Vec3::from(vertices[c].position);
        let n = (p1 - p0).cross(p2 - p0);
        acc[a] += n;
        acc[b] += n;
        acc[c] += n;
    }
    for (v, n) in vertices.iter_mut().zip(acc) {
        v.normal = n.try_normalize().unwrap_or(Vec3::Y).to_array();
    }
}
