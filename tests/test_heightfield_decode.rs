// tests/test_heightfield_decode.rs
// Raster decode through the public API: every scanline filter, sea-level remap, statistics
// and the error categories surfaced for malformed input.

use relief3d::heightfield::{
    chunks::{write_chunk, DATA, END, HEADER, SIGNATURE},
    decode_samples, encode_grayscale16, FilterType, SEA_LEVEL_FLOOR,
};
use relief3d::{HeightField, SeaLevel, TerrainError};

const FILTERS: [FilterType; 5] = [
    FilterType::None,
    FilterType::Sub,
    FilterType::Up,
    FilterType::Average,
    FilterType::Paeth,
];

fn ridge(w: u32, h: u32) -> Vec<u16> {
    (0..h)
        .flat_map(|y| {
            (0..w).map(move |x| {
                let t = (x as f32 / (w - 1) as f32 - 0.5).abs() + (y as f32 / (h - 1) as f32) * 0.25;
                ((1.0 - t).clamp(0.0, 1.0) * 65535.0) as u16
            })
        })
        .collect()
}

#[test]
fn decode_matches_source_for_every_filter() {
    let (w, h) = (37, 23);
    let samples = ridge(w, h);
    for filter in FILTERS {
        let bytes = encode_grayscale16(w, h, &samples, filter).unwrap();
        let field = HeightField::decode(&bytes, SeaLevel::Synthetic).unwrap();
        assert_eq!((field.width(), field.height()), (w, h), "filter {}", filter.name());
        for (v, s) in field.values().iter().zip(&samples) {
            let expected = *s as f32 / 65535.0;
            assert!(
                (v - expected).abs() <= 1.0 / 65535.0,
                "filter {} decoded {} expected {}",
                filter.name(),
                v,
                expected
            );
        }
    }
}

#[test]
fn export_then_decode_keeps_values() {
    let values: Vec<f32> = (0..64).map(|i| i as f32 / 63.0).collect();
    let field = HeightField::from_values(8, 8, values, SeaLevel::Synthetic).unwrap();
    let bytes = field.to_raster(FilterType::Paeth).unwrap();
    let again = HeightField::decode(&bytes, SeaLevel::Synthetic).unwrap();
    for (a, b) in field.values().iter().zip(again.values()) {
        assert!((a - b).abs() <= 1.0 / 65535.0);
    }
}

#[test]
fn preserved_sources_reach_below_sea_level() {
    let samples = vec![0u16, 65535, 5958, 32768];
    let bytes = encode_grayscale16(2, 2, &samples, FilterType::Sub).unwrap();

    let synthetic = HeightField::decode(&bytes, SeaLevel::Synthetic).unwrap();
    assert!(synthetic.values().iter().all(|v| (0.0..=1.0).contains(v)));

    let preserved = HeightField::decode(&bytes, SeaLevel::Preserved).unwrap();
    assert!(preserved.is_sea_level_preserving());
    assert!((preserved.get(0, 0) - SEA_LEVEL_FLOOR).abs() < 1e-6);
    assert!((preserved.get(1, 0) - 1.0).abs() < 1e-6);
    // 5958/65535 sits right at the waterline after the remap
    assert!(preserved.get(0, 1).abs() < 1e-3);
}

#[test]
fn constant_field_has_zero_roughness() {
    let bytes = encode_grayscale16(16, 16, &vec![20_000u16; 256], FilterType::Up).unwrap();
    let field = HeightField::decode(&bytes, SeaLevel::Synthetic).unwrap();
    let stats = field.stats();
    assert_eq!(stats.roughness, 0.0);
    assert_eq!(stats.std_dev, 0.0);
    assert_eq!(stats.range(), 0.0);
    assert_eq!(stats.size_label(), "16x16");
}

#[test]
fn large_rasters_span_multiple_data_chunks() {
    let (w, h) = (300, 200);
    // pseudo-random samples compress badly, forcing several chunks
    let samples: Vec<u16> = (0..w * h).map(|i: u32| (i.wrapping_mul(2_654_435_761) >> 7) as u16).collect();
    let bytes = encode_grayscale16(w, h, &samples, FilterType::None).unwrap();
    let (header, decoded) = decode_samples(&bytes).unwrap();
    assert_eq!((header.width, header.height), (w, h));
    assert_eq!(decoded, samples);
}

fn header(width: u32, height: u32, bit_depth: u8, color_type: u8) -> Vec<u8> {
    let mut ihdr = Vec::new();
    ihdr.extend_from_slice(&width.to_be_bytes());
    ihdr.extend_from_slice(&height.to_be_bytes());
    ihdr.extend_from_slice(&[bit_depth, color_type, 0, 0, 0]);
    let mut out = SIGNATURE.to_vec();
    write_chunk(&mut out, &HEADER, &ihdr);
    out
}

#[test]
fn unsupported_layouts_are_format_errors() {
    let mut eight_bit = header(4, 4, 8, 0);
    write_chunk(&mut eight_bit, &END, &[]);
    assert!(matches!(
        HeightField::decode(&eight_bit, SeaLevel::Synthetic),
        Err(TerrainError::Format(_))
    ));

    let mut rgb = header(4, 4, 16, 2);
    write_chunk(&mut rgb, &END, &[]);
    assert!(matches!(HeightField::decode(&rgb, SeaLevel::Synthetic), Err(TerrainError::Format(_))));

    let garbage = b"definitely not a raster".to_vec();
    let err = HeightField::decode(&garbage, SeaLevel::Synthetic).unwrap_err();
    assert_eq!(err.category(), "Format");
}

#[test]
fn corrupt_payloads_are_decode_errors() {
    let mut junk = header(4, 4, 16, 0);
    write_chunk(&mut junk, &DATA, &[0xde, 0xad, 0xbe, 0xef, 0x00]);
    write_chunk(&mut junk, &END, &[]);
    assert!(matches!(HeightField::decode(&junk, SeaLevel::Synthetic), Err(TerrainError::Decode(_))));

    let good = encode_grayscale16(8, 8, &[1000u16; 64], FilterType::Sub).unwrap();
    let truncated = &good[..good.len() - 20];
    let err = HeightField::decode(truncated, SeaLevel::Synthetic).unwrap_err();
    assert!(matches!(err, TerrainError::Decode(_)), "{err}");
}
