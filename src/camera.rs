// src/camera.rs
// Perspective camera and the snapshot exported with depth captures
// RELEVANT FILES: src/settings/config.rs, src/capture/mod.rs, src/backend/mod.rs

use glam::{EulerRot, Mat3, Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::settings::CameraConfig;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_deg: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self::from_config(&CameraConfig::default(), 1.0)
    }
}

impl Camera {
    pub fn from_config(cfg: &CameraConfig, aspect: f32) -> Self {
        Self {
            position: Vec3::from(cfg.position),
            target: Vec3::from(cfg.target),
            up: Vec3::Y,
            fov_deg: cfg.fov_deg,
            aspect,
            near: cfg.near,
            far: cfg.far,
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    /// Right-handed perspective with clip depth in `[0, 1]`.
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_deg.to_radians(), self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    pub fn set_aspect(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    /// World-space orientation as XYZ Euler angles in radians.
    pub fn rotation(&self) -> Vec3 {
        let world = self.view_matrix().inverse();
        let q = Quat::from_mat3(&Mat3::from_mat4(world));
        let (x, y, z) = q.to_euler(EulerRot::XYZ);
        Vec3::new(x, y, z)
    }

    pub fn snapshot(&self) -> CameraSnapshot {
        CameraSnapshot {
            position: self.position.to_array(),
            rotation: self.rotation().to_array(),
            fov_deg: self.fov_deg,
            aspect: self.aspect,
            near: self.near,
            far: self.far,
        }
    }
}

/// Camera intrinsics and extrinsics at capture time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraSnapshot {
    pub position: [f32; 3],
    pub rotation: [f32; 3],
    pub fov_deg: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}
