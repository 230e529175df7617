//! PLY vertex decoding for the text and both binary encodings.

use std::ops::ControlFlow;

use tracing::{debug, warn};

use crate::cursor::{ByteCursor, Endian, Windows};
use crate::dataset::{assemble, Dataset, PointRecord, SceneFormat, SourceInfo, DEFAULT_COLOR};
use crate::error::ParseError;
use crate::header::{parse_header, PlyHeader, PropertyType};
use crate::layout::{FieldSlots, Slot, SlotKind};
use crate::options::{keep_going, yield_to, Checkpoint, ParseOptions, Stage};

pub fn parse_ply_core(bytes: &[u8], file_name: &str, file_size: usize) -> Result<Dataset, ParseError> {
    parse_ply_core_with_opts(bytes, file_name, file_size, &ParseOptions::default(), &mut keep_going)
}

#[tracing::instrument(skip_all, fields(file = %file_name))]
pub fn parse_ply_core_with_opts<F>(
    bytes: &[u8],
    file_name: &str,
    file_size: usize,
    opts: &ParseOptions,
    on_checkpoint: &mut F,
) -> Result<Dataset, ParseError>
where
    F: FnMut(&Checkpoint) -> ControlFlow<()>,
{
    let header = parse_header(bytes, opts.header_scan_limit)?;
    let payload = &bytes[header.header_len..];

    let points = match header.encoding.endian() {
        None => decode_text(payload, &header, opts, on_checkpoint)?,
        Some(endian) => decode_binary(payload, &header, endian, opts, on_checkpoint)?,
    };

    let slots = FieldSlots::resolve(&header.properties, SlotKind::Column);
    let source = SourceInfo {
        format: SceneFormat::Ply,
        has_normals: slots.has_normals(),
        has_colors: slots.has_colors(),
        file_size,
        file_name: file_name.to_string(),
    };
    assemble(points, source, opts, on_checkpoint)
}

fn clamp255(x: f64) -> u8 {
    if x <= 0.0 {
        0
    } else if x >= 255.0 {
        255
    } else {
        x.floor() as u8
    }
}

fn finite3(v: [f32; 3]) -> bool {
    v.iter().all(|c| c.is_finite())
}

/// Partial line left at the end of a chunk, waiting for the rest of it.
#[derive(Debug, Default)]
pub struct LineCarry {
    pending: Vec<u8>,
}

impl LineCarry {
    /// Emits every line completed by `chunk` and returns the new carry.
    pub fn feed(mut self, chunk: &[u8], mut on_line: impl FnMut(&[u8])) -> Self {
        for piece in chunk.split_inclusive(|&b| b == b'\n') {
            let Some((&b'\n', line)) = piece.split_last() else {
                self.pending.extend_from_slice(piece);
                continue;
            };
            if self.pending.is_empty() {
                on_line(line);
            } else {
                self.pending.extend_from_slice(line);
                on_line(&self.pending);
                self.pending.clear();
            }
        }
        self
    }

    /// Flushes a final line that had no terminator.
    pub fn finish(self, mut on_line: impl FnMut(&[u8])) {
        if !self.pending.is_empty() {
            on_line(&self.pending);
        }
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

struct TextRecords {
    slots: FieldSlots,
    expected: usize,
    consumed: usize,
    values: Vec<f32>,
    points: Vec<PointRecord>,
}

impl TextRecords {
    fn is_full(&self) -> bool {
        self.consumed >= self.expected
    }

    fn push_line(&mut self, line: &[u8]) {
        if self.is_full() {
            return;
        }
        let line = line.trim_ascii();
        if line.is_empty() {
            return;
        }
        self.consumed += 1;

        let Ok(text) = std::str::from_utf8(line) else {
            return;
        };
        self.values.clear();
        self.values.extend(
            text.split_ascii_whitespace()
                .map(|t| t.parse::<f32>().unwrap_or(f32::NAN)),
        );
        if self.values.len() < 3 {
            return;
        }

        let values = &self.values;
        let column = |slot: Slot| values.get(slot.at).copied().unwrap_or(f32::NAN);

        let position = self.slots.position.map(|s| s.map_or(0.0, column));
        if !finite3(position) {
            return;
        }

        let mut color = DEFAULT_COLOR;
        for (c, slot) in color.iter_mut().zip(self.slots.color) {
            // Unparseable tokens keep the default like a missing column.
            if let Some(v) = slot.and_then(|s| values.get(s.at)).filter(|v| !v.is_nan()) {
                *c = clamp255(*v as f64);
            }
        }

        let mut point = PointRecord::new(position, color);
        point.normal = self.slots.normal.map(|n| n.map(column)).filter(|n| finite3(*n));
        self.points.push(point);
    }
}

fn decode_text<F>(
    payload: &[u8],
    header: &PlyHeader,
    opts: &ParseOptions,
    on_checkpoint: &mut F,
) -> Result<Vec<PointRecord>, ParseError>
where
    F: FnMut(&Checkpoint) -> ControlFlow<()>,
{
    let mut records = TextRecords {
        slots: FieldSlots::resolve(&header.properties, SlotKind::Column),
        expected: header.vertex_count,
        consumed: 0,
        values: Vec::with_capacity(header.properties.len()),
        points: Vec::with_capacity(header.vertex_count.min(payload.len() / 2)),
    };

    let mut carry = LineCarry::default();
    let mut processed = 0;
    for chunk in payload.chunks(opts.chunk_size.max(1)) {
        carry = carry.feed(chunk, |line| records.push_line(line));
        processed += chunk.len();
        debug!(processed, pending = carry.pending_len(), "text chunk decoded");
        yield_to(
            on_checkpoint,
            Checkpoint {
                stage: Stage::Decode,
                processed,
                total: payload.len(),
            },
        )?;
        if records.is_full() {
            break;
        }
    }
    carry.finish(|line| records.push_line(line));

    if records.consumed < records.expected {
        warn!(
            declared = records.expected,
            found = records.consumed,
            "fewer vertex lines than declared"
        );
    }
    Ok(records.points)
}

fn read_scalar(cursor: &ByteCursor<'_>, offset: usize, ty: PropertyType) -> Option<f64> {
    let v = match ty {
        PropertyType::Int8 => cursor.i8_at(offset)? as f64,
        PropertyType::UInt8 => cursor.u8_at(offset)? as f64,
        PropertyType::Int16 => cursor.i16_at(offset)? as f64,
        PropertyType::UInt16 => cursor.u16_at(offset)? as f64,
        PropertyType::Int32 => cursor.i32_at(offset)? as f64,
        PropertyType::UInt32 => cursor.u32_at(offset)? as f64,
        PropertyType::Float32 => cursor.f32_at(offset)? as f64,
        PropertyType::Float64 => cursor.f64_at(offset)?,
    };
    Some(v)
}

fn read_binary_record(cursor: &ByteCursor<'_>, base: usize, slots: &FieldSlots) -> Option<PointRecord> {
    let read = |slot: Slot| read_scalar(cursor, base + slot.at, slot.ty).map(|v| v as f32);

    let mut position = [0.0f32; 3];
    for (p, slot) in position.iter_mut().zip(slots.position) {
        if let Some(slot) = slot {
            *p = read(slot)?;
        }
    }
    if !finite3(position) {
        return None;
    }

    // Color is always read as a single unsigned byte at the declared offset,
    // even when the schema declares a wider type.
    let mut color = DEFAULT_COLOR;
    for (c, slot) in color.iter_mut().zip(slots.color) {
        if let Some(slot) = slot {
            *c = cursor.u8_at(base + slot.at)?;
        }
    }

    let mut point = PointRecord::new(position, color);
    if let Some([a, b, c]) = slots.normal {
        point.normal = Some([read(a)?, read(b)?, read(c)?]).filter(|n| finite3(*n));
    }
    Some(point)
}

fn decode_binary<F>(
    payload: &[u8],
    header: &PlyHeader,
    endian: Endian,
    opts: &ParseOptions,
    on_checkpoint: &mut F,
) -> Result<Vec<PointRecord>, ParseError>
where
    F: FnMut(&Checkpoint) -> ControlFlow<()>,
{
    let slots = FieldSlots::resolve(&header.properties, SlotKind::ByteOffset);
    let stride = slots.stride;
    if stride == 0 {
        warn!("vertex element declares no properties");
        return Ok(Vec::new());
    }

    let available = payload.len() / stride;
    let count = header.vertex_count.min(available);
    if count < header.vertex_count {
        warn!(
            declared = header.vertex_count,
            available,
            "binary payload shorter than declared vertex count"
        );
    }

    let data = &payload[..count * stride];
    let mut points = Vec::with_capacity(count);
    let mut dropped = 0usize;
    for (offset, window) in Windows::new(data, opts.chunk_size, stride) {
        let cursor = ByteCursor::new(window, endian);
        for base in (0..window.len()).step_by(stride) {
            match read_binary_record(&cursor, base, &slots) {
                Some(p) => points.push(p),
                None => dropped += 1,
            }
        }
        yield_to(
            on_checkpoint,
            Checkpoint {
                stage: Stage::Decode,
                processed: offset + window.len(),
                total: data.len(),
            },
        )?;
    }

    if dropped > 0 {
        debug!(dropped, "binary records with non-finite positions dropped");
    }
    Ok(points)
}
