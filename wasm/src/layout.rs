//! Locates named vertex fields inside one record from the property schema.

use crate::header::{Property, PropertyType};

/// Byte offset of `name` inside one binary record, summing the widths of
/// every property declared before it.
pub fn offset_of(schema: &[Property], name: &str) -> Option<usize> {
    let mut offset = 0;
    for p in schema {
        if p.name == name {
            return Some(offset);
        }
        offset += p.ty.size_bytes();
    }
    None
}

/// Column of `name` in a whitespace-delimited text record.
pub fn index_of(schema: &[Property], name: &str) -> Option<usize> {
    schema.iter().position(|p| p.name == name)
}

pub fn stride(schema: &[Property]) -> usize {
    schema.iter().map(|p| p.ty.size_bytes()).sum()
}

/// Where a field lives: its offset (or column) and declared type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Slot {
    pub at: usize,
    pub ty: PropertyType,
}

/// Resolved slots for the fields the decoders care about.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldSlots {
    pub position: [Option<Slot>; 3],
    pub color: [Option<Slot>; 3],
    /// Only set when all of `nx`, `ny`, `nz` are declared.
    pub normal: Option<[Slot; 3]>,
    pub stride: usize,
}

const POSITION: [&str; 3] = ["x", "y", "z"];
const COLOR: [&str; 3] = ["red", "green", "blue"];
const NORMAL: [&str; 3] = ["nx", "ny", "nz"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotKind {
    ByteOffset,
    Column,
}

impl FieldSlots {
    pub fn resolve(schema: &[Property], kind: SlotKind) -> Self {
        let locate = |name: &str| -> Option<Slot> {
            let at = match kind {
                SlotKind::ByteOffset => offset_of(schema, name)?,
                SlotKind::Column => index_of(schema, name)?,
            };
            let ty = schema.iter().find(|p| p.name == name)?.ty;
            Some(Slot { at, ty })
        };

        let position = POSITION.map(locate);
        let color = COLOR.map(locate);
        let normal = match NORMAL.map(locate) {
            [Some(a), Some(b), Some(c)] => Some([a, b, c]),
            _ => None,
        };

        Self {
            position,
            color,
            normal,
            stride: stride(schema),
        }
    }

    pub fn has_colors(&self) -> bool {
        self.color.iter().any(Option::is_some)
    }

    pub fn has_normals(&self) -> bool {
        self.normal.is_some()
    }
}
