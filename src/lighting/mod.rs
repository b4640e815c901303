//! Sun light model.

pub mod sun;

pub use sun::{SunColor, SunLightModel, SunMarker, SunState};
