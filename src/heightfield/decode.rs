// src/heightfield/decode.rs
// Chunked 16-bit grayscale raster -> normalized HeightField
// Validates the header, inflates concatenated data chunks, reverses scanline filters
// RELEVANT FILES: src/heightfield/chunks.rs, src/heightfield/filter.rs, src/heightfield/stats.rs

use std::io::Read;

use flate2::read::ZlibDecoder;

use super::chunks::{Chunk, ChunkReader, DATA, END, HEADER, PALETTE};
use super::filter::{unfilter_scanline, FilterType};
use super::{HeightField, SeaLevel, SEA_LEVEL_FLOOR};
use crate::error::{TerrainError, TerrainResult};

/// Only single-channel grayscale rasters are accepted.
pub const COLOR_TYPE_GRAYSCALE: u8 = 0;
/// Only 16 bits per sample are accepted.
pub const BIT_DEPTH_16: u8 = 16;
/// Bytes per sample at 16-bit grayscale, also the filter stride.
pub const BYTES_PER_SAMPLE: usize = 2;
/// Normalization divisor: maximum representable 16-bit sample.
pub const MAX_SAMPLE: f32 = 65535.0;

const HEADER_LEN: usize = 13;

/// Parsed header chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterHeader {
    pub width: u32,
    pub height: u32,
    pub bit_depth: u8,
    pub color_type: u8,
    pub interlace: u8,
}

impl RasterHeader {
    fn parse(chunk: &Chunk<'_>) -> TerrainResult<Self> {
        let d = chunk.data;
        if d.len() != HEADER_LEN {
            return Err(TerrainError::decode(format!(
                "header chunk has length {}, expected {}",
                d.len(),
                HEADER_LEN
            )));
        }
        let width = u32::from_be_bytes([d[0], d[1], d[2], d[3]]);
        let height = u32::from_be_bytes([d[4], d[5], d[6], d[7]]);
        let header = Self {
            width,
            height,
            bit_depth: d[8],
            color_type: d[9],
            interlace: d[12],
        };
        if width == 0 || height == 0 {
            return Err(TerrainError::format(format!(
                "raster dimensions must be positive, got {}x{}",
                width, height
            )));
        }
        if header.bit_depth != BIT_DEPTH_16 {
            return Err(TerrainError::format(format!(
                "unsupported bit depth {}; expected {}",
                header.bit_depth, BIT_DEPTH_16
            )));
        }
        if header.color_type != COLOR_TYPE_GRAYSCALE {
            return Err(TerrainError::format(format!(
                "unsupported channel layout (color type {}); expected single-channel grayscale",
                header.color_type
            )));
        }
        if d[10] != 0 || d[11] != 0 {
            return Err(TerrainError::format(format!(
                "unsupported compression/filter method {}/{}",
                d[10], d[11]
            )));
        }
        if header.interlace != 0 {
            return Err(TerrainError::format("interlaced rasters are not supported"));
        }
        Ok(header)
    }

    /// Filtered payload row length: selector byte + samples.
    pub fn stride(&self) -> usize {
        1 + self.width as usize * BYTES_PER_SAMPLE
    }

    /// Exact inflated payload size, or a format error if it overflows.
    pub fn payload_len(&self) -> TerrainResult<usize> {
        (self.width as usize)
            .checked_mul(BYTES_PER_SAMPLE)
            .and_then(|row| row.checked_add(1))
            .and_then(|row| row.checked_mul(self.height as usize))
            .ok_or_else(|| {
                TerrainError::format(format!(
                    "raster dimensions {}x{} too large",
                    self.width, self.height
                ))
            })
    }
}

/// Decode a raster buffer into 16-bit samples, row-major.
pub fn decode_samples(bytes: &[u8]) -> TerrainResult<(RasterHeader, Vec<u16>)> {
    let mut chunks = ChunkReader::new(bytes)?;

    let first = chunks
        .next()
        .transpose()?
        .ok_or_else(|| TerrainError::format("header chunk missing"))?;
    if first.kind != HEADER {
        return Err(TerrainError::format(format!(
            "header chunk missing: first chunk is {}",
            first.kind_str()
        )));
    }
    let header = RasterHeader::parse(&first)?;

    let mut compressed = Vec::new();
    let mut data_chunks = 0usize;
    let mut ended = false;
    for chunk in chunks {
        let chunk = chunk?;
        match chunk.kind {
            DATA => {
                compressed.extend_from_slice(chunk.data);
                data_chunks += 1;
            }
            END => {
                ended = true;
                break;
            }
            HEADER => return Err(TerrainError::format("duplicate header chunk")),
            PALETTE => {
                return Err(TerrainError::format("palette chunk in grayscale raster"))
            }
            _ if chunk.is_critical() => {
                return Err(TerrainError::format(format!(
                    "unknown critical chunk {}",
                    chunk.kind_str()
                )))
            }
            _ => log::trace!("skipping ancillary chunk {}", chunk.kind_str()),
        }
    }
    if data_chunks == 0 {
        return Err(TerrainError::decode("raster has no data chunks"));
    }
    if !ended {
        return Err(TerrainError::decode("raster truncated: end chunk missing"));
    }

    // the header is untrusted: size the buffer from the compressed input and
    // let inflation grow it up to the declared length
    let expected = header.payload_len()?;
    let mut payload = Vec::with_capacity(expected.min(compressed.len().saturating_mul(4)));
    ZlibDecoder::new(compressed.as_slice())
        .take(expected as u64 + 1)
        .read_to_end(&mut payload)
        .map_err(|e| TerrainError::decode(format!("corrupt compressed payload: {e}")))?;
    if payload.len() < expected {
        return Err(TerrainError::decode(format!(
            "compressed payload truncated: inflated {} of {} bytes",
            payload.len(),
            expected
        )));
    }
    payload.truncate(expected);

    let samples = reconstruct(&header, &mut payload)?;
    log::debug!(
        "decoded {}x{} raster from {} data chunk(s), {} compressed bytes",
        header.width,
        header.height,
        data_chunks,
        compressed.len()
    );
    Ok((header, samples))
}

/// Reverse the per-row filters in place and assemble big-endian samples.
fn reconstruct(header: &RasterHeader, payload: &mut [u8]) -> TerrainResult<Vec<u16>> {
    let stride = header.stride();
    let row_bytes = stride - 1;
    let mut samples = Vec::with_capacity(header.width as usize * header.height as usize);
    let mut previous = vec![0u8; row_bytes];

    for (y, row) in payload.chunks_exact_mut(stride).enumerate() {
        let (selector, current) = row.split_at_mut(1);
        let filter = FilterType::from_u8(selector[0]).ok_or_else(|| {
            TerrainError::decode(format!("invalid filter selector {} on row {}", selector[0], y))
        })?;
        unfilter_scanline(filter, BYTES_PER_SAMPLE, &previous, current);
        samples.extend(
            current
                .chunks_exact(BYTES_PER_SAMPLE)
                .map(|b| u16::from_be_bytes([b[0], b[1]])),
        );
        previous.copy_from_slice(current);
    }
    Ok(samples)
}

/// Decode a raster buffer into a normalized [`HeightField`].
///
/// Samples are divided by 65535. Sea-level-preserving sources are then
/// remapped onto `[SEA_LEVEL_FLOOR, 1.0]`.
pub fn decode_heightfield(bytes: &[u8], sea_level: SeaLevel) -> TerrainResult<HeightField> {
    let (header, samples) = decode_samples(bytes)?;
    let values = samples
        .into_iter()
        .map(|s| normalize_sample(s, sea_level))
        .collect();
    HeightField::from_values(header.width, header.height, values, sea_level)
}

#[inline]
pub fn normalize_sample(sample: u16, sea_level: SeaLevel) -> f32 {
    let v = sample as f32 / MAX_SAMPLE;
    match sea_level {
        SeaLevel::Synthetic => v,
        SeaLevel::Preserved => v * (1.0 - SEA_LEVEL_FLOOR) + SEA_LEVEL_FLOOR,
    }
}
