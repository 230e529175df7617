use tracing::{debug, warn};

use crate::cursor::Endian;
use crate::error::FormatError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlyEncoding {
    Ascii,
    BinaryLittleEndian,
    BinaryBigEndian,
}

impl PlyEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlyEncoding::Ascii => "ascii",
            PlyEncoding::BinaryLittleEndian => "binary_little_endian",
            PlyEncoding::BinaryBigEndian => "binary_big_endian",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "ascii" => Some(Self::Ascii),
            "binary_little_endian" => Some(Self::BinaryLittleEndian),
            "binary_big_endian" => Some(Self::BinaryBigEndian),
            _ => None,
        }
    }

    /// Byte order of the payload, `None` for text.
    pub fn endian(&self) -> Option<Endian> {
        match self {
            PlyEncoding::Ascii => None,
            PlyEncoding::BinaryLittleEndian => Some(Endian::Little),
            PlyEncoding::BinaryBigEndian => Some(Endian::Big),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PropertyType {
    Float32,
    Float64,
    UInt8,
    Int8,
    UInt16,
    Int16,
    UInt32,
    Int32,
}

impl PropertyType {
    /// Accepts both the classic PLY names and the sized aliases.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "float" | "float32" => Some(Self::Float32),
            "double" | "float64" => Some(Self::Float64),
            "uchar" | "uint8" => Some(Self::UInt8),
            "char" | "int8" => Some(Self::Int8),
            "ushort" | "uint16" => Some(Self::UInt16),
            "short" | "int16" => Some(Self::Int16),
            "uint" | "uint32" => Some(Self::UInt32),
            "int" | "int32" => Some(Self::Int32),
            _ => None,
        }
    }

    pub fn size_bytes(&self) -> usize {
        match self {
            PropertyType::UInt8 | PropertyType::Int8 => 1,
            PropertyType::UInt16 | PropertyType::Int16 => 2,
            PropertyType::Float32 | PropertyType::UInt32 | PropertyType::Int32 => 4,
            PropertyType::Float64 => 8,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Property {
    pub name: String,
    pub ty: PropertyType,
}

impl Property {
    pub fn new(name: impl Into<String>, ty: PropertyType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

#[derive(Clone, Debug)]
pub struct PlyHeader {
    pub encoding: PlyEncoding,
    pub vertex_count: usize,
    /// Scalar properties of the `vertex` element, in declaration order.
    pub properties: Vec<Property>,
    /// Offset of the first byte after the `end_header` line.
    pub header_len: usize,
}

const MAGIC: &[u8] = b"ply";
const END_MARKER: &[u8] = b"end_header";

/// Scans line by line for `end_header`, looking no further than `scan_limit`
/// bytes. Returns the offset just past the marker's line terminator.
fn find_header_end(bytes: &[u8], scan_limit: usize) -> Result<usize, FormatError> {
    let limit = bytes.len().min(scan_limit);
    let mut start = 0;
    while start < limit {
        let (end, terminated) = match bytes[start..limit].iter().position(|&b| b == b'\n') {
            Some(i) => (start + i, true),
            None => (limit, false),
        };
        // An unterminated line only counts when it really is the end of the buffer.
        if bytes[start..end].trim_ascii() == END_MARKER && (terminated || end == bytes.len()) {
            return Ok(if terminated { end + 1 } else { end });
        }
        start = end + 1;
    }
    Err(FormatError::malformed(format!(
        "no end_header within the first {limit} bytes"
    )))
}

pub fn parse_header(bytes: &[u8], scan_limit: usize) -> Result<PlyHeader, FormatError> {
    if !bytes.starts_with(MAGIC) {
        return Err(FormatError::MissingSignature);
    }

    let header_len = find_header_end(bytes, scan_limit)?;
    let header_text = core::str::from_utf8(&bytes[..header_len])
        .map_err(|_| FormatError::malformed("header is not valid utf-8"))?;

    let mut lines = header_text.lines().map(str::trim).filter(|l| !l.is_empty());
    if lines.next() != Some("ply") {
        return Err(FormatError::malformed("first line must be \"ply\""));
    }

    let mut encoding: Option<PlyEncoding> = None;
    let mut vertex_count: Option<usize> = None;
    let mut properties: Vec<Property> = Vec::new();
    let mut in_vertex = false;

    for line in lines {
        if line == "end_header" {
            break;
        }
        let mut it = line.split_whitespace();
        let tag = it.next().unwrap_or("");

        match tag {
            "comment" | "obj_info" => {}
            "format" => {
                let fmt = it.next().unwrap_or("");
                let e = PlyEncoding::parse(fmt)
                    .ok_or_else(|| FormatError::malformed(format!("unsupported format \"{fmt}\"")))?;
                encoding = Some(e);
            }
            "element" => {
                let name = it
                    .next()
                    .ok_or_else(|| FormatError::malformed("element without a name"))?;
                // Any other element block ends the vertex property list.
                in_vertex = name == "vertex" && vertex_count.is_none();
                if in_vertex {
                    let count = it
                        .next()
                        .and_then(|c| c.parse::<usize>().ok())
                        .ok_or_else(|| FormatError::malformed("bad vertex count"))?;
                    vertex_count = Some(count);
                }
            }
            "property" if in_vertex => {
                let tokens: Vec<&str> = it.collect();
                let (ty_name, name) = match tokens.as_slice() {
                    [ty, name] => (*ty, *name),
                    ["list", .., name] => ("list", *name),
                    _ => return Err(FormatError::malformed(format!("bad property line \"{line}\""))),
                };
                let ty = PropertyType::parse(ty_name).unwrap_or_else(|| {
                    warn!(property = name, ty = ty_name, "unknown property type, assuming 4 bytes");
                    PropertyType::Float32
                });
                properties.push(Property::new(name, ty));
            }
            "property" => {}
            other => debug!(directive = other, "ignoring header directive"),
        }
    }

    let encoding = encoding.ok_or_else(|| FormatError::malformed("missing format directive"))?;
    let vertex_count = vertex_count.unwrap_or(0);

    debug!(
        format = encoding.as_str(),
        vertex_count,
        properties = properties.len(),
        header_len,
        "parsed PLY header"
    );

    Ok(PlyHeader {
        encoding,
        vertex_count,
        properties,
        header_len,
    })
}
