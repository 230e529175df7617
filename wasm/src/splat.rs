//! Packed `.splat` decoding: 32-byte little-endian records, no header.
//!
//! | bytes   | field                                       |
//! |---------|---------------------------------------------|
//! | 0..12   | position, 3 x f32                           |
//! | 12..24  | scale, 3 x f32                              |
//! | 24..28  | color, u32 with r/g/b/a in bytes 0/1/2/3    |
//! | 28..32  | rotation, u32 with x/y/z/w as `byte/128 - 1`|

use std::ops::ControlFlow;

use tracing::{debug, warn};

use crate::cursor::{ByteCursor, Endian, Windows};
use crate::dataset::{assemble, Dataset, PointRecord, SceneFormat, SourceInfo};
use crate::error::{FormatError, ParseError};
use crate::options::{keep_going, yield_to, Checkpoint, ParseOptions, Stage};

pub const SPLAT_RECORD_SIZE: usize = 32;

pub fn parse_splat_core(bytes: &[u8], file_name: &str, file_size: usize) -> Result<Dataset, ParseError> {
    parse_splat_core_with_opts(bytes, file_name, file_size, &ParseOptions::default(), &mut keep_going)
}

#[tracing::instrument(skip_all, fields(file = %file_name))]
pub fn parse_splat_core_with_opts<F>(
    bytes: &[u8],
    file_name: &str,
    file_size: usize,
    opts: &ParseOptions,
    on_checkpoint: &mut F,
) -> Result<Dataset, ParseError>
where
    F: FnMut(&Checkpoint) -> ControlFlow<()>,
{
    if bytes.len() < SPLAT_RECORD_SIZE {
        return Err(FormatError::Empty.into());
    }

    let count = bytes.len() / SPLAT_RECORD_SIZE;
    let trailing = bytes.len() % SPLAT_RECORD_SIZE;
    if trailing != 0 {
        warn!(trailing, "ignoring bytes after the last whole splat");
    }

    let mut points = Vec::with_capacity(count);
    let mut skipped = 0usize;
    for (offset, window) in Windows::new(bytes, opts.chunk_size, SPLAT_RECORD_SIZE) {
        let mut cursor = ByteCursor::new(window, Endian::Little);
        while cursor.remaining() >= SPLAT_RECORD_SIZE {
            let base = cursor.position();
            let point = read_splat(&mut cursor);
            cursor.seek(base + SPLAT_RECORD_SIZE);
            match point {
                Some(p) => points.push(p),
                None => {
                    skipped += 1;
                    debug!(index = (offset + base) / SPLAT_RECORD_SIZE, "skipping corrupted splat");
                }
            }
        }
        yield_to(
            on_checkpoint,
            Checkpoint {
                stage: Stage::Decode,
                processed: offset + window.len(),
                total: count * SPLAT_RECORD_SIZE,
            },
        )?;
    }

    if skipped > 0 {
        warn!(skipped, total = count, "skipped corrupted splats");
    }

    let source = SourceInfo {
        format: SceneFormat::Splat,
        has_normals: false,
        has_colors: true,
        file_size,
        file_name: file_name.to_string(),
    };
    assemble(points, source, opts, on_checkpoint)
}

/// Splits a packed u32 into its four bytes, least significant first.
fn unpack_bytes(packed: u32) -> [u8; 4] {
    [0, 8, 16, 24].map(|shift| ((packed >> shift) & 0xff) as u8)
}

fn read_vec3(cursor: &mut ByteCursor<'_>) -> Option<[f32; 3]> {
    Some([cursor.read_f32()?, cursor.read_f32()?, cursor.read_f32()?])
}

/// Reads one record starting at the cursor position.
fn read_splat(cursor: &mut ByteCursor<'_>) -> Option<PointRecord> {
    let position = read_vec3(cursor)?;
    let scale = read_vec3(cursor)?;
    let [r, g, b, a] = unpack_bytes(cursor.read_u32()?);
    let rotation = unpack_bytes(cursor.read_u32()?).map(|q| q as f32 / 128.0 - 1.0);

    if !position.iter().all(|c| c.is_finite()) {
        return None;
    }
    if !scale.iter().all(|s| s.is_finite() && *s > 0.0) {
        return None;
    }
    if !rotation.iter().all(|q| q.is_finite()) {
        return None;
    }

    Some(PointRecord {
        position,
        color: [r, g, b],
        normal: None,
        scale: Some(scale),
        rotation: Some(rotation),
        opacity: Some(a as f32 / 255.0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pack_rgba(r: u8, g: u8, b: u8, a: u8) -> u32 {
        u32::from_le_bytes([r, g, b, a])
    }

    fn pack_quat(q: [f32; 4]) -> u32 {
        u32::from_le_bytes(q.map(|c| ((c + 1.0) * 128.0).round().clamp(0.0, 255.0) as u8))
    }

    fn record(position: [f32; 3], scale: [f32; 3], rgba: u32, quat: u32) -> Vec<u8> {
        let mut out = Vec::with_capacity(SPLAT_RECORD_SIZE);
        for v in position.iter().chain(&scale) {
            out.extend_from_slice(&v.to_le_bytes());
        }
        out.extend_from_slice(&rgba.to_le_bytes());
        out.extend_from_slice(&quat.to_le_bytes());
        out
    }

    fn valid(i: usize) -> Vec<u8> {
        let f = i as f32;
        record(
            [f, -f * 2.0, f * 0.1 + 5.0],
            [0.01, 0.02, 0.03],
            pack_rgba(i as u8, 2, 3, 200),
            pack_quat([0.0, 0.0, 0.0, 0.99]),
        )
    }

    #[test]
    fn test_packed_color_round_trip() {
        let bytes = record([1.0, 2.0, 3.0], [1.0, 1.0, 1.0], pack_rgba(10, 20, 30, 255), 0);
        let ds = parse_splat_core(&bytes, "one.splat", bytes.len()).unwrap();
        let p = &ds.points()[0];
        assert_eq!(p.color, [10, 20, 30]);
        assert!((p.opacity.unwrap() - 1.0).abs() < 1e-6);
        assert_eq!(p.position, [1.0, 2.0, 3.0]);
        assert_eq!(p.scale, Some([1.0, 1.0, 1.0]));
        assert!(p.normal.is_none());
    }

    #[test]
    fn test_quaternion_byte_mapping() {
        let packed = u32::from_le_bytes([0, 128, 255, 192]);
        let bytes = record([0.0; 3], [1.0; 3], 0, packed);
        let ds = parse_splat_core(&bytes, "q.splat", bytes.len()).unwrap();
        let q = ds.points()[0].rotation.unwrap();
        assert_eq!(q[0], -1.0);
        assert_eq!(q[1], 0.0);
        assert!((q[2] - 0.9921875).abs() < 1e-7);
        assert_eq!(q[3], 0.5);
    }

    #[test]
    fn test_zero_scale_is_skipped() {
        let mut good = valid(1);
        good.extend(valid(2));
        let mut with_bad = good.clone();
        with_bad.extend(record([1.0; 3], [0.0, 1.0, 1.0], 0, 0));

        let a = parse_splat_core(&good, "a.splat", good.len()).unwrap();
        let b = parse_splat_core(&with_bad, "b.splat", with_bad.len()).unwrap();
        assert_eq!(a.points().len(), 2);
        assert_eq!(b.points().len(), 2);
        assert_eq!(b.metadata().vertex_count, 2);
    }

    #[test]
    fn test_non_finite_values_are_skipped() {
        let mut bytes = valid(0);
        bytes.extend(record([f32::NAN, 0.0, 0.0], [1.0; 3], 0, 0));
        bytes.extend(record([0.0; 3], [1.0, f32::INFINITY, 1.0], 0, 0));
        bytes.extend(record([0.0; 3], [-1.0, 1.0, 1.0], 0, 0));
        bytes.extend(valid(4));
        let ds = parse_splat_core(&bytes, "n.splat", bytes.len()).unwrap();
        assert_eq!(ds.points().len(), 2);
        assert_eq!(ds.points()[1].position[..2], [4.0, -8.0]);
    }

    #[test]
    fn test_too_short_is_format_error() {
        let err = parse_splat_core(&[0u8; 31], "s.splat", 31).unwrap_err();
        assert_eq!(err, ParseError::Format(FormatError::Empty));
        assert_eq!(err.to_string(), "empty");
    }

    #[test]
    fn test_all_skipped_is_empty_result() {
        let bytes = record([f32::NAN; 3], [1.0; 3], 0, 0);
        let err = parse_splat_core(&bytes, "x.splat", bytes.len()).unwrap_err();
        assert_eq!(err.to_string(), "no valid splats found");
    }

    #[test]
    fn test_trailing_bytes_ignored() {
        let mut bytes = valid(3);
        bytes.extend_from_slice(&[9; 17]);
        let ds = parse_splat_core(&bytes, "t.splat", bytes.len()).unwrap();
        assert_eq!(ds.points().len(), 1);
        assert_eq!(ds.metadata().file_size, 49);
    }

    #[test]
    fn test_chunking_and_bounds() {
        let bytes: Vec<u8> = (0..150).flat_map(valid).collect();
        let whole = parse_splat_core(&bytes, "c.splat", bytes.len()).unwrap();
        for chunk in [1, 32, 100, 1000] {
            let opts = ParseOptions::default().with_chunk_size(chunk).with_bounds_batch(7);
            let ds = parse_splat_core_with_opts(&bytes, "c.splat", bytes.len(), &opts, &mut keep_going).unwrap();
            assert_eq!(ds.points(), whole.points());
            assert_eq!(ds.bounds(), whole.bounds());
        }
        assert!(whole.points().iter().all(|p| whole.bounds().contains(p.position)));
        assert_eq!(whole.bounds().min[0], 0.0);
        assert_eq!(whole.bounds().max[0], 149.0);
        assert!(whole.metadata().has_colors);
        assert!(!whole.metadata().has_normals);
        assert_eq!(whole.metadata().format, SceneFormat::Splat);
    }
}
