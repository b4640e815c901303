//! Render settings, quality presets and renderer configuration.

pub mod common;
pub mod config;
pub mod quality;
pub mod render;

pub use common::normalize_key;
pub use config::{CameraConfig, CaptureConfig, RendererConfig, DEFAULT_CAPTURE_SIZE, MAX_CAPTURE_SIZE};
pub use quality::{MeshQuality, ShadowQuality};
pub use render::{RenderSettings, SettingsChange};
