//! 16-bit grayscale raster writer.
//!
//! Produces the same chunked container the decoder reads: signature, header,
//! one or more zlib data chunks, end chunk. Used to export height fields and
//! to synthesise fixtures.

use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;

use super::chunks::{write_chunk, DATA, END, HEADER, SIGNATURE};
use super::decode::{BIT_DEPTH_16, BYTES_PER_SAMPLE, COLOR_TYPE_GRAYSCALE};
use super::filter::{filter_scanline, FilterType};
use crate::error::{TerrainError, TerrainResult};

/// Compressed payload is split into data chunks of at most this many bytes.
pub const DATA_CHUNK_SIZE: usize = 32 * 1024;

/// Encode row-major 16-bit samples, applying `filter` to every scanline.
pub fn encode_grayscale16(
    width: u32,
    height: u32,
    samples: &[u16],
    filter: FilterType,
) -> TerrainResult<Vec<u8>> {
    if width == 0 || height == 0 {
        return Err(TerrainError::format(format!(
            "raster dimensions must be positive, got {width}x{height}"
        )));
    }
    let expected = width as usize * height as usize;
    if samples.len() != expected {
        return Err(TerrainError::format(format!(
            "sample count {} does not match {}x{}",
            samples.len(),
            width,
            height
        )));
    }

    let row_bytes = width as usize * BYTES_PER_SAMPLE;
    let mut filtered = Vec::with_capacity((row_bytes + 1) * height as usize);
    let mut previous = vec![0u8; row_bytes];
    let mut current = vec![0u8; row_bytes];
    for row in samples.chunks_exact(width as usize) {
        for (dst, s) in current.chunks_exact_mut(BYTES_PER_SAMPLE).zip(row) {
            dst.copy_from_slice(&s.to_be_bytes());
        }
        filtered.push(filter.as_u8());
        filter_scanline(filter, BYTES_PER_SAMPLE, &previous, &current, &mut filtered);
        std::mem::swap(&mut previous, &mut current);
    }

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&filtered)?;
    let compressed = encoder.finish()?;

    let mut ihdr = Vec::with_capacity(13);
    ihdr.extend_from_slice(&width.to_be_bytes());
    ihdr.extend_from_slice(&height.to_be_bytes());
    ihdr.extend_from_slice(&[BIT_DEPTH_16, COLOR_TYPE_GRAYSCALE, 0, 0, 0]);

    let mut out = Vec::with_capacity(compressed.len() + 64);
    out.extend_from_slice(&SIGNATURE);
    write_chunk(&mut out, &HEADER, &ihdr);
    for part in compressed.chunks(DATA_CHUNK_SIZE) {
        write_chunk(&mut out, &DATA, part);
    }
    write_chunk(&mut out, &END, &[]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::super::chunks::ChunkReader;
    use super::*;

    #[test]
    fn rejects_mismatched_sample_count() {
        assert!(encode_grayscale16(3, 3, &[0; 8], FilterType::None).is_err());
        assert!(encode_grayscale16(0, 3, &[], FilterType::None).is_err());
    }

    #[test]
    fn large_payload_spans_several_data_chunks() {
        // pseudo-random samples compress poorly enough to exceed one chunk
        let mut state = 0x1234_5678u32;
        let samples: Vec<u16> = (0..256 * 256)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                state as u16
            })
            .collect();
        let bytes = encode_grayscale16(256, 256, &samples, FilterType::None).unwrap();
        let data_chunks = ChunkReader::new(&bytes)
            .unwrap()
            .filter(|c| c.as_ref().map(|c| c.kind == DATA).unwrap_or(false))
            .count();
        assert!(data_chunks > 1, "expected split payload, got {data_chunks} chunk(s)");
    }
}
