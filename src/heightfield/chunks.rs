// src/heightfield/chunks.rs
// Chunk framing for the heightfield raster container: signature, length-prefixed
// typed chunks, CRC-32 trailers. Payload interpretation lives in decode.rs.

use crate::error::{TerrainError, TerrainResult};

/// Fixed 8-byte container signature.
pub const SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

pub const HEADER: [u8; 4] = *b"IHDR";
pub const PALETTE: [u8; 4] = *b"PLTE";
pub const DATA: [u8; 4] = *b"IDAT";
pub const END: [u8; 4] = *b"IEND";

/// Chunk lengths are limited to 2^31 - 1 by the container format.
const MAX_CHUNK_LEN: u32 = 0x7FFF_FFFF;

/// Length (4) + type (4) + CRC (4) framing around each chunk body.
const FRAME_OVERHEAD: usize = 12;

/// One framed chunk borrowed from the input buffer.
#[derive(Debug, Clone, Copy)]
pub struct Chunk<'a> {
    pub kind: [u8; 4],
    pub data: &'a [u8],
}

impl<'a> Chunk<'a> {
    /// Critical chunks have an uppercase first type letter.
    pub fn is_critical(&self) -> bool {
        self.kind[0].is_ascii_uppercase()
    }

    pub fn kind_str(&self) -> String {
        String::from_utf8_lossy(&self.kind).into_owned()
    }
}

/// Iterator over the chunks following the signature. Yields an error and
/// stops at the first framing or integrity failure.
pub struct ChunkReader<'a> {
    bytes: &'a [u8],
    pos: usize,
    failed: bool,
}

impl<'a> ChunkReader<'a> {
    /// Validate the signature and position the reader on the first chunk.
    pub fn new(bytes: &'a [u8]) -> TerrainResult<Self> {
        if bytes.len() < SIGNATURE.len() || bytes[..SIGNATURE.len()] != SIGNATURE {
            return Err(TerrainError::format("missing raster signature"));
        }
        Ok(Self {
            bytes,
            pos: SIGNATURE.len(),
            failed: false,
        })
    }

    fn read_chunk(&mut self) -> TerrainResult<Chunk<'a>> {
        let remaining = &self.bytes[self.pos..];
        if remaining.len() < FRAME_OVERHEAD {
            return Err(TerrainError::decode(format!(
                "truncated chunk header at offset {}",
                self.pos
            )));
        }
        let len = u32::from_be_bytes([remaining[0], remaining[1], remaining[2], remaining[3]]);
        if len > MAX_CHUNK_LEN {
            return Err(TerrainError::decode(format!(
                "chunk length {len} exceeds container limit"
            )));
        }
        let len = len as usize;
        if remaining.len() < FRAME_OVERHEAD + len {
            return Err(TerrainError::decode(format!(
                "inconsistent chunk length {} at offset {} ({} bytes remain)",
                len,
                self.pos,
                remaining.len() - 8
            )));
        }

        let kind = [remaining[4], remaining[5], remaining[6], remaining[7]];
        let data = &remaining[8..8 + len];
        let crc_bytes = &remaining[8 + len..12 + len];
        let stored = u32::from_be_bytes([crc_bytes[0], crc_bytes[1], crc_bytes[2], crc_bytes[3]]);
        let actual = chunk_crc(&kind, data);
        if stored != actual {
            return Err(TerrainError::decode(format!(
                "CRC mismatch in {} chunk: stored {:#010x}, computed {:#010x}",
                String::from_utf8_lossy(&kind),
                stored,
                actual
            )));
        }

        self.pos += FRAME_OVERHEAD + len;
        Ok(Chunk { kind, data })
    }
}

impl<'a> Iterator for ChunkReader<'a> {
    type Item = TerrainResult<Chunk<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pos >= self.bytes.len() {
            return None;
        }
        let chunk = self.read_chunk();
        if chunk.is_err() {
            self.failed = true;
        }
        Some(chunk)
    }
}

/// CRC-32 over chunk type and body, as stored in the trailer.
pub fn chunk_crc(kind: &[u8; 4], data: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(kind);
    hasher.update(data);
    hasher.finalize()
}

/// Append one framed chunk to `out`.
pub fn write_chunk(out: &mut Vec<u8>, kind: &[u8; 4], data: &[u8]) {
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(kind);
    out.extend_from_slice(data);
    out.extend_from_slice(&chunk_crc(kind, data).to_be_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container(chunks: &[(&[u8; 4], &[u8])]) -> Vec<u8> {
        let mut out = SIGNATURE.to_vec();
        for (kind, data) in chunks {
            write_chunk(&mut out, kind, data);
        }
        out
    }

    #[test]
    fn reads_framed_chunks_in_order() {
        let bytes = container(&[(&HEADER, &[1, 2, 3]), (b"tEXt", b"note"), (&END, &[])]);
        let kinds: Vec<String> = ChunkReader::new(&bytes)
            .unwrap()
            .map(|c| c.unwrap().kind_str())
            .collect();
        assert_eq!(kinds, vec!["IHDR", "tEXt", "IEND"]);
    }

    #[test]
    fn bad_signature_is_format_error() {
        let err = ChunkReader::new(b"GIF89a..").err().unwrap();
        assert!(matches!(err, TerrainError::Format(_)));
    }

    #[test]
    fn corrupted_body_fails_crc() {
        let mut bytes = container(&[(&HEADER, &[1, 2, 3, 4])]);
        let body = SIGNATURE.len() + 8;
        bytes[body] ^= 0xFF;
        let first = ChunkReader::new(&bytes).unwrap().next().unwrap();
        assert!(matches!(first, Err(TerrainError::Decode(_))));
    }

    #[test]
    fn overlong_length_is_decode_error() {
        let mut bytes = container(&[(&HEADER, &[0; 13])]);
        bytes.truncate(bytes.len() - 6);
        let mut reader = ChunkReader::new(&bytes).unwrap();
        let err = reader.next().unwrap().err().unwrap();
        assert!(err.to_string().contains("inconsistent chunk length"));
        assert!(reader.next().is_none(), "reader stops after a failure");
    }

    #[test]
    fn ancillary_detection() {
        let text = Chunk { kind: *b"tEXt", data: &[] };
        let data = Chunk { kind: DATA, data: &[] };
        assert!(!text.is_critical());
        assert!(data.is_critical());
    }
}
