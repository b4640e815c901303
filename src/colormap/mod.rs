//! Altitude color ramp: band blending, anti-banding dither and blur.

pub mod blur;
pub mod ramp;

pub use ramp::{Band, ColorRamp, RampTexture, LAND_BANDS, SYNTHETIC_WATER_LINE};
