// tests/test_terrain_lighting.rs
// Mesh segmentation, sun arc and shadow frustum behaviour driven from decoded fields

use glam::Vec3;
use relief3d::lighting::SunLightModel;
use relief3d::settings::{MeshQuality, ShadowQuality};
use relief3d::shadows::frustum::directional_extension;
use relief3d::shadows::{BiasTier, ShadowFrustumController, TerrainComplexity};
use relief3d::terrain::{TerrainMeshBuilder, TerrainMeshConfig, WORLD_HALF_EXTENT};
use relief3d::{HeightField, SeaLevel};

fn slope(w: u32, h: u32) -> HeightField {
    let values = (0..w * h).map(|i| (i / w) as f32 / (h - 1) as f32).collect();
    HeightField::from_values(w, h, values, SeaLevel::Synthetic).unwrap()
}

#[test]
fn segments_follow_source_below_cap() {
    let field = slope(65, 33);
    let mesh = TerrainMeshBuilder::new(TerrainMeshConfig::new(MeshQuality::Low))
        .build(&field, 30.0)
        .unwrap();
    assert_eq!((mesh.segments_x, mesh.segments_y), (64, 32));
    assert_eq!(mesh.vertex_count(), 65 * 33);
    assert_eq!(mesh.triangle_count(), 64 * 32 * 2);
}

#[test]
fn segments_are_capped_by_quality() {
    let config = TerrainMeshConfig::new(MeshQuality::Low);
    assert_eq!(config.segments(1000, 40).unwrap(), (128, 39));
    assert_eq!(TerrainMeshConfig::new(MeshQuality::Extreme).segments(3000, 3000).unwrap(), (2048, 2048));
    assert!(config.segments(1, 40).is_err());
}

#[test]
fn mesh_spans_world_extent_and_height_scale() {
    let field = slope(9, 9);
    let mesh = TerrainMeshBuilder::new(TerrainMeshConfig::new(MeshQuality::High))
        .build(&field, 30.0)
        .unwrap();
    assert!((mesh.bounds.min.x + WORLD_HALF_EXTENT).abs() < 1e-4);
    assert!((mesh.bounds.max.z - WORLD_HALF_EXTENT).abs() < 1e-4);
    assert!((mesh.bounds.max.y - 30.0).abs() < 1e-4);
    assert!(mesh.bounds.min.y.abs() < 1e-4);
    for v in &mesh.vertices {
        assert!(v.normal[1] > 0.0);
        assert!((0.0..=1.0).contains(&v.uv[0]) && (0.0..=1.0).contains(&v.uv[1]));
    }
}

#[test]
fn sun_midpoint_is_highest_and_brightest() {
    let model = SunLightModel;
    let mid = model.evaluate(180.0);
    assert!((mid.height() - 140.0).abs() < 1e-3);
    assert!((mid.intensity - 0.8).abs() < 1e-5);
    for angle in [0.0, 45.0, 90.0, 270.0, 360.0] {
        let sun = model.evaluate(angle);
        assert!(sun.height() <= mid.height());
        assert!(sun.intensity <= mid.intensity);
        assert!(sun.height() >= 15.0 - 1e-3);
    }
}

#[test]
fn extension_never_grows_as_sun_rises() {
    for angle in [0.0f32, 30.0, 90.0, 135.0] {
        let a = angle.to_radians();
        let mut previous = f32::INFINITY;
        let mut h = 8.0;
        while h <= 140.0 {
            let (ex, ez) = directional_extension(Vec3::new(a.sin() * 150.0, h, a.cos() * 150.0));
            let ext = ex.max(ez);
            assert!(ext <= previous + 1e-4, "angle {angle} height {h}: {ext} > {previous}");
            previous = ext;
            h += 2.0;
        }
    }
}

#[test]
fn shadow_bounds_enclose_terrain_along_the_arc() {
    let model = SunLightModel;
    let controller = ShadowFrustumController::new(ShadowQuality::High, 3.0);
    for step in 0..=36 {
        let sun = model.evaluate(step as f32 * 10.0);
        let p = controller.compute(sun.position, 0);
        assert!(p.encloses_terrain(), "angle {}", step * 10);
        assert!(p.near > 0.0 && p.near < p.far);
        assert_ne!(p.tier, BiasTier::EdgeCase);
    }
}

#[test]
fn rough_terrain_raises_complexity() {
    let flat = HeightField::from_values(8, 8, vec![0.5; 64], SeaLevel::Synthetic).unwrap();
    let spiky_values = (0..64).map(|i| if (i / 8 + i % 8) % 2 == 0 { 0.0 } else { 1.0 }).collect();
    let spiky = HeightField::from_values(8, 8, spiky_values, SeaLevel::Synthetic).unwrap();

    let calm = TerrainComplexity::from_stats(flat.stats()).factor();
    let wild = TerrainComplexity::from_stats(spiky.stats()).factor();
    assert!((calm - 0.5).abs() < 1e-6);
    assert!(wild > calm);
    assert!(wild <= 2.5);
}
