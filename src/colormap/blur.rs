//! Separable box blur over interleaved float channels, clamped at the edges.

/// Blur `buf` (row-major, `channels` interleaved) in place with a box of `2*radius+1` taps.
pub fn box_blur(buf: &mut [f32], width: usize, height: usize, channels: usize, radius: usize) {
    if radius == 0 || width == 0 || height == 0 {
        return;
    }
    debug_assert_eq!(buf.len(), width * height * channels);
    let mut tmp = vec![0.0f32; buf.len()];
    blur_axis(buf, &mut tmp, width, height, channels, radius, true);
    blur_axis(&tmp, buf, width, height, channels, radius, false);
}

fn blur_axis(
    src: &[f32],
    dst: &mut [f32],
    width: usize,
    height: usize,
    channels: usize,
    radius: usize,
    horizontal: bool,
) {
    let taps = (2 * radius + 1) as f32;
    let (lines, len) = if horizontal { (height, width) } else { (width, height) };
    let at = |line: usize, i: usize| -> usize {
        if horizontal {
            (line * width + i) * channels
        } else {
            (i * width + line) * channels
        }
    };
    for line in 0..lines {
        for i in 0..len {
            let lo = i as isize - radius as isize;
            let hi = i as isize + radius as isize;
            let out = at(line, i);
            for c in 0..channels {
                let mut sum = 0.0;
                for j in lo..=hi {
                    let j = j.clamp(0, len as isize - 1) as usize;
                    sum += src[at(line, j) + c];
                }
                dst[out + c] = sum / taps;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_input_is_unchanged() {
        let mut buf = vec![7.0; 5 * 4 * 3];
        box_blur(&mut buf, 5, 4, 3, 2);
        assert!(buf.iter().all(|v| (v - 7.0).abs() < 1e-5));
    }

    #[test]
    fn spreads_an_impulse() {
        let mut buf = vec![0.0; 5 * 5];
        buf[12] = 9.0;
        box_blur(&mut buf, 5, 5, 1, 1);
        assert!((buf[12] - 1.0).abs() < 1e-5);
        assert!((buf[6] - 1.0).abs() < 1e-5);
        assert!(buf[0].abs() < 1e-5);
        let total: f32 = buf.iter().sum();
        assert!((total - 9.0).abs() < 1e-4);
    }
}
