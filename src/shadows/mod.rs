// src/shadows/mod.rs
// Shadow frustum control for the directional sun light
// RELEVANT FILES: src/lighting/sun.rs, src/renderer.rs

pub mod complexity;
pub mod frustum;
pub mod jitter;

pub use complexity::TerrainComplexity;
pub use frustum::{BiasTier, ShadowFrustumController, ShadowFrustumParams};
pub use jitter::spiral_offset;
