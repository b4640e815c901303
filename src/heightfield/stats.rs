//! Elevation statistics gathered once per decoded height field.
//!
//! `min`, `max`, `mean` and `std_dev` come from a single sweep with f64
//! accumulators. Roughness is the mean central-difference gradient magnitude
//! over interior samples; the one-sample border is excluded because the
//! central difference is undefined there.

use serde::{Deserialize, Serialize};

/// Summary statistics of a height field, also consumed by display/telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeightStats {
    pub width: u32,
    pub height: u32,
    pub min: f32,
    pub max: f32,
    pub mean: f32,
    pub std_dev: f32,
    pub roughness: f32,
}

impl HeightStats {
    /// Elevation range `max - min`.
    pub fn range(&self) -> f32 {
        self.max - self.min
    }

    /// "WxH" size label.
    pub fn size_label(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

/// Compute statistics for a row-major `values` grid of `width * height`.
///
/// # Panics
/// Panics if `values` is empty or its length does not match the dimensions.
pub fn compute_stats(values: &[f32], width: u32, height: u32) -> HeightStats {
    let (w, h) = (width as usize, height as usize);
    assert!(!values.is_empty(), "height field empty");
    assert_eq!(values.len(), w * h, "height field length mismatch");

    let (mut lo, mut hi) = (f32::INFINITY, f32::NEG_INFINITY);
    let (mut sum, mut sum_sq) = (0.0f64, 0.0f64);
    for &v in values {
        if v < lo {
            lo = v;
        }
        if v > hi {
            hi = v;
        }
        sum += v as f64;
        sum_sq += (v as f64) * (v as f64);
    }
    let n = values.len() as f64;
    let mean = sum / n;
    let variance = (sum_sq / n - mean * mean).max(0.0);

    HeightStats {
        width,
        height,
        min: lo,
        max: hi,
        mean: mean as f32,
        std_dev: variance.sqrt() as f32,
        roughness: roughness(values, w, h),
    }
}

/// Mean gradient magnitude over interior samples; 0 when there is no interior.
pub fn roughness(values: &[f32], w: usize, h: usize) -> f32 {
    if w < 3 || h < 3 {
        return 0.0;
    }
    let mut total = 0.0f64;
    for y in 1..h - 1 {
        let row = y * w;
        for x in 1..w - 1 {
            let gx = (values[row + x + 1] - values[row + x - 1]) * 0.5;
            let gy = (values[row + w + x] - values[row - w + x]) * 0.5;
            total += ((gx * gx + gy * gy) as f64).sqrt();
        }
    }
    (total / ((w - 2) * (h - 2)) as f64) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_field_has_zero_roughness() {
        let values = vec![0.37f32; 16 * 9];
        let s = compute_stats(&values, 16, 9);
        assert_eq!(s.roughness, 0.0);
        assert!((s.mean - 0.37).abs() < 1e-6);
        assert!(s.std_dev < 1e-6);
    }

    #[test]
    fn all_zero_field_is_all_zero() {
        let s = compute_stats(&vec![0.0f32; 25], 5, 5);
        assert_eq!((s.min, s.max, s.mean, s.std_dev, s.roughness), (0.0, 0.0, 0.0, 0.0, 0.0));
    }

    #[test]
    fn ramp_gradient_matches_central_difference() {
        // v = x * 0.1 along rows: gx = 0.1, gy = 0 everywhere inside
        let (w, h) = (6u32, 4u32);
        let values: Vec<f32> = (0..h)
            .flat_map(|_| (0..w).map(|x| x as f32 * 0.1))
            .collect();
        let s = compute_stats(&values, w, h);
        assert!((s.roughness - 0.1).abs() < 1e-6, "roughness {}", s.roughness);
        assert!((s.min - 0.0).abs() < 1e-6 && (s.max - 0.5).abs() < 1e-6);
    }

    #[test]
    fn border_is_excluded_from_roughness() {
        // spike on the border must not contribute
        let mut values = vec![0.5f32; 5 * 5];
        values[0] = 1.0;
        values[24] = 0.0;
        let s = compute_stats(&values, 5, 5);
        assert_eq!(s.roughness, 0.0);
        assert_eq!((s.min, s.max), (0.0, 1.0));
    }

    #[test]
    fn std_dev_of_two_levels() {
        let values = [0.0f32, 1.0, 0.0, 1.0];
        let s = compute_stats(&values, 2, 2);
        assert!((s.mean - 0.5).abs() < 1e-6);
        assert!((s.std_dev - 0.5).abs() < 1e-6);
        assert_eq!(s.size_label(), "2x2");
    }
}
