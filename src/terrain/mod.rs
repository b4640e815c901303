//! Terrain surface synthesis.

pub mod mesh;

pub use mesh::{
    Aabb, BoundingSphere, Indices, TerrainMesh, TerrainMeshBuilder, TerrainMeshConfig,
    TerrainVertex, WORLD_HALF_EXTENT,
};
