//! Per-scanline delta filters used by the chunked raster payload.
//!
//! Every row of the inflated payload starts with one selector byte followed
//! by the filtered sample bytes. Reconstruction runs left to right and reads
//! the already-reconstructed previous row, so rows must be processed in order.

/// Scanline filter selector (first byte of each payload row).
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    None = 0,
    Sub = 1,
    Up = 2,
    Average = 3,
    Paeth = 4,
}

impl FilterType {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(FilterType::None),
            1 => Some(FilterType::Sub),
            2 => Some(FilterType::Up),
            3 => Some(FilterType::Average),
            4 => Some(FilterType::Paeth),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FilterType::None => "none",
            FilterType::Sub => "sub",
            FilterType::Up => "up",
            FilterType::Average => "average",
            FilterType::Paeth => "paeth",
        }
    }
}

/// Paeth predictor: whichever of left, above, above-left is closest to
/// `left + above - above_left`, ties resolved in that order.
#[inline]
pub fn paeth_predictor(left: u8, above: u8, above_left: u8) -> u8 {
    let (a, b, c) = (left as i16, above as i16, above_left as i16);
    let p = a + b - c;
    let pa = (p - a).abs();
    let pb = (p - b).abs();
    let pc = (p - c).abs();
    if pa <= pb && pa <= pc {
        left
    } else if pb <= pc {
        above
    } else {
        above_left
    }
}

/// Reverse `filter` in place on `current` using the reconstructed `previous`
/// row. `bpp` is the byte stride of one sample (2 for 16-bit grayscale).
/// For the first row pass an all-zero `previous`.
pub fn unfilter_scanline(filter: FilterType, bpp: usize, previous: &[u8], current: &mut [u8]) {
    debug_assert_eq!(previous.len(), current.len());
    match filter {
        FilterType::None => {}
        FilterType::Sub => {
            for i in bpp..current.len() {
                current[i] = current[i].wrapping_add(current[i - bpp]);
            }
        }
        FilterType::Up => {
            for (cur, &up) in current.iter_mut().zip(previous) {
                *cur = cur.wrapping_add(up);
            }
        }
        FilterType::Average => {
            for i in 0..current.len() {
                let left = if i >= bpp { current[i - bpp] as u16 } else { 0 };
                let avg = ((left + previous[i] as u16) / 2) as u8;
                current[i] = current[i].wrapping_add(avg);
            }
        }
        FilterType::Paeth => {
            for i in 0..current.len() {
                let (left, above_left) = if i >= bpp {
                    (current[i - bpp], previous[i - bpp])
                } else {
                    (0, 0)
                };
                current[i] = current[i].wrapping_add(paeth_predictor(left, previous[i], above_left));
            }
        }
    }
}

/// Apply `filter` to the raw `current` row, appending the filtered bytes to `out`.
pub fn filter_scanline(
    filter: FilterType,
    bpp: usize,
    previous: &[u8],
    current: &[u8],
    out: &mut Vec<u8>,
) {
    debug_assert_eq!(previous.len(), current.len());
    for i in 0..current.len() {
        let left = if i >= bpp { current[i - bpp] } else { 0 };
        let above = previous[i];
        let above_left = if i >= bpp { previous[i - bpp] } else { 0 };
        let predicted = match filter {
            FilterType::None => 0,
            FilterType::Sub => left,
            FilterType::Up => above,
            FilterType::Average => ((left as u16 + above as u16) / 2) as u8,
            FilterType::Paeth => paeth_predictor(left, above, above_left),
        };
        out.push(current[i].wrapping_sub(predicted));
    }
}
