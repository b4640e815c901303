//! Golden-angle spiral offsets for the grazing-sun shadow tier.
//!
//! A Vogel spiral over a fixed number of points gives a low-discrepancy cover
//! of a small disc; a slow rotation driven by the frame tick keeps successive
//! cycles from landing on the same points.

use glam::Vec3;

/// Points in one spiral cycle.
pub const SPIRAL_POINTS: u64 = 64;
/// Radius of the jitter disc in world units.
pub const SPIRAL_RADIUS: f32 = 0.15;
/// Rotation per tick in radians.
pub const ROTATION_PER_TICK: f32 = 0.001;

const GOLDEN_ANGLE: f32 = 2.399_963_2;

/// Spiral point `n` in `[0, SPIRAL_POINTS)` on the unit disc.
#[inline]
pub fn vogel_point(n: u64, rotation: f32) -> (f32, f32) {
    let n = n % SPIRAL_POINTS;
    let r = ((n as f32 + 0.5) / SPIRAL_POINTS as f32).sqrt();
    let theta = n as f32 * GOLDEN_ANGLE + rotation;
    (r * theta.cos(), r * theta.sin())
}

/// Horizontal light offset for frame `tick`.
pub fn spiral_offset(tick: u64) -> Vec3 {
    // wrap the slow term so f32 precision holds over long sessions
    let turn = (tick % 6_283_185) as f32 * ROTATION_PER_TICK;
    let (x, z) = vogel_point(tick, turn);
    Vec3::new(x * SPIRAL_RADIUS, 0.0, z * SPIRAL_RADIUS)
}
