//! relief3d: terrain from 16-bit elevation rasters.
//!
//! The pipeline decodes a chunked grayscale raster into a normalized
//! [`heightfield::HeightField`], builds a quality-capped mesh, shades it with
//! an altitude color ramp, lights it with a time-of-day sun and adaptive
//! shadow frustum, and can export a linearized depth capture of the view.

pub mod backend;
pub mod camera;
pub mod capture;
pub mod cli;
pub mod colormap;
pub mod error;
pub mod heightfield;
pub mod lighting;
pub mod loader;
pub mod renderer;
pub mod settings;
pub mod shadows;
pub mod terrain;
pub mod util;

pub use error::{TerrainError, TerrainResult};
pub use heightfield::{HeightField, HeightStats, SeaLevel};
pub use loader::TerrainLoader;
pub use renderer::TerrainRenderer;
pub use settings::{RenderSettings, RendererConfig, SettingsChange};
