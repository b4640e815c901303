// src/colormap/ramp.rs
// Altitude-band color ramp baked into a texture addressed by the terrain mesh UVs
// RELEVANT FILES: src/colormap/blur.rs, src/terrain/mesh.rs, src/util/image_write.rs

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::blur::box_blur;
use crate::heightfield::{HeightField, SeaLevel};

pub type Rgb = [u8; 3];

pub const DEEP_WATER: Rgb = [24, 56, 102];
pub const SHALLOW_WATER: Rgb = [66, 130, 172];
pub const SAND: Rgb = [196, 180, 132];
pub const GRASS: Rgb = [88, 128, 68];
pub const HIGHLAND: Rgb = [112, 106, 78];
pub const ROCK: Rgb = [132, 122, 114];
pub const SNOW: Rgb = [244, 246, 250];

/// Water line for synthetic sources, as a fraction of the displayed range.
pub const SYNTHETIC_WATER_LINE: f32 = 0.01;

/// Per-channel dither amplitude in 8-bit levels.
pub const DITHER_LEVELS: i32 = 2;

/// Coarse then fine blur radii.
pub const BLUR_RADII: [usize; 2] = [2, 1];

/// One land transition over normalized land height `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub start: f32,
    pub end: f32,
    pub from: Rgb,
    pub to: Rgb,
}

/// Coastal, grassland, highland and snow transitions, ordered by height.
pub const LAND_BANDS: [Band; 4] = [
    Band { start: 0.0, end: 0.04, from: SAND, to: GRASS },
    Band { start: 0.04, end: 0.35, from: GRASS, to: HIGHLAND },
    Band { start: 0.35, end: 0.65, from: HIGHLAND, to: ROCK },
    Band { start: 0.65, end: 0.85, from: ROCK, to: SNOW },
];

fn lerp_rgb(a: Rgb, b: Rgb, t: f32) -> [f32; 3] {
    let t = t.clamp(0.0, 1.0);
    [0, 1, 2].map(|c| a[c] as f32 + (b[c] as f32 - a[c] as f32) * t)
}

/// Color for normalized land height `t` in `[0, 1]`.
pub fn land_color(t: f32) -> [f32; 3] {
    for band in LAND_BANDS.iter() {
        if t <= band.end {
            let local = (t - band.start) / (band.end - band.start);
            return lerp_rgb(band.from, band.to, local);
        }
    }
    SNOW.map(|c| c as f32)
}

/// Shallow-to-deep water color for depth fraction `d` (0 at the coast).
pub fn water_color(d: f32) -> [f32; 3] {
    lerp_rgb(SHALLOW_WATER, DEEP_WATER, d)
}

/// RGBA8 texture, X-flipped relative to the source raster.
#[derive(Debug, Clone, PartialEq)]
pub struct RampTexture {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl RampTexture {
    pub fn texel(&self, tx: u32, ty: u32) -> [u8; 4] {
        let tx = tx.min(self.width - 1) as usize;
        let ty = ty.min(self.height - 1) as usize;
        let i = (ty * self.width as usize + tx) * 4;
        [self.rgba[i], self.rgba[i + 1], self.rgba[i + 2], self.rgba[i + 3]]
    }

    /// Nearest texel for mesh UV `(u, v)`; `v = 1` addresses row 0.
    pub fn sample_nearest(&self, u: f32, v: f32) -> [u8; 4] {
        let u = u.clamp(0.0, 1.0);
        let v = v.clamp(0.0, 1.0);
        let tx = (u * (self.width - 1) as f32).round() as u32;
        let ty = (self.height - 1) - ((v * (self.height - 1) as f32).round() as u32).min(self.height - 1);
        self.texel(tx, ty)
    }
}

/// Bakes height values into a shaded texture.
#[derive(Debug, Clone)]
pub struct ColorRamp {
    seed: u64,
    dither: bool,
    blur: bool,
}

impl Default for ColorRamp {
    fn default() -> Self {
        Self::new(0)
    }
}

impl ColorRamp {
    pub fn new(seed: u64) -> Self {
        Self { seed, dither: true, blur: true }
    }

    pub fn with_dither(mut self, enabled: bool) -> Self {
        self.dither = enabled;
        self
    }

    pub fn with_blur(mut self, enabled: bool) -> Self {
        self.blur = enabled;
        self
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn bake(&self, field: &HeightField) -> RampTexture {
        self.bake_values(field.width(), field.height(), field.values(), field.sea_level())
    }

    /// Bake `values` (row-major `width x height`) as currently displayed.
    pub fn bake_values(&self, width: u32, height: u32, values: &[f32], sea_level: SeaLevel) -> RampTexture {
        let (w, h) = (width as usize, height as usize);
        let mut rgb = shade(values, sea_level);

        if self.dither {
            let mut rng = StdRng::seed_from_u64(self.seed);
            for c in rgb.iter_mut() {
                *c += rng.gen_range(-DITHER_LEVELS..=DITHER_LEVELS) as f32;
            }
        }
        if self.blur {
            for radius in BLUR_RADII {
                box_blur(&mut rgb, w, h, 3, radius);
            }
        }

        let mut rgba = vec![0u8; w * h * 4];
        for y in 0..h {
            for tx in 0..w {
                let src = (y * w + (w - 1 - tx)) * 3;
                let dst = (y * w + tx) * 4;
                for c in 0..3 {
                    rgba[dst + c] = rgb[src + c].round().clamp(0.0, 255.0) as u8;
                }
                rgba[dst + 3] = 255;
            }
        }
        RampTexture { width, height, rgba }
    }
}

/// Undithered RGB per value, interleaved as floats.
fn shade(values: &[f32], sea_level: SeaLevel) -> Vec<f32> {
    let (lo, hi) = values
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let range = hi - lo;
    let norm = |v: f32| if range > 0.0 { (v - lo) / range } else { 0.5 };

    let water_h = match sea_level {
        SeaLevel::Preserved => norm(0.0).clamp(0.0, 1.0),
        SeaLevel::Synthetic => SYNTHETIC_WATER_LINE,
    };

    let mut out = Vec::with_capacity(values.len() * 3);
    for &v in values {
        let h = norm(v);
        let submerged = match sea_level {
            SeaLevel::Preserved => v <= 0.0,
            SeaLevel::Synthetic => h <= SYNTHETIC_WATER_LINE,
        };
        let color = if submerged {
            let depth = if water_h > f32::EPSILON { 1.0 - h / water_h } else { 0.0 };
            water_color(depth)
        } else {
            let land = if water_h < 1.0 { (h - water_h) / (1.0 - water_h) } else { 1.0 };
            land_color(land.clamp(0.0, 1.0))
        };
        out.extend_from_slice(&color);
    }
    out
}
