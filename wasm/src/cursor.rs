//! Typed reads over a borrowed byte buffer, plus bounded windowing.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

/// Sequential and random-access reader. Reads past the end return `None`
/// instead of panicking, so a truncated payload is a recoverable condition.
#[derive(Clone, Debug)]
pub struct ByteCursor<'a> {
    bytes: &'a [u8],
    pos: usize,
    endian: Endian,
}

impl<'a> ByteCursor<'a> {
    pub fn new(bytes: &'a [u8], endian: Endian) -> Self {
        Self {
            bytes,
            pos: 0,
            endian,
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn seek(&mut self, pos: usize) {
        self.pos = pos.min(self.bytes.len());
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn array_at<const N: usize>(&self, offset: usize) -> Option<[u8; N]> {
        let end = offset.checked_add(N)?;
        self.bytes.get(offset..end)?.try_into().ok()
    }

    pub fn u8_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(offset).copied()
    }

    pub fn i8_at(&self, offset: usize) -> Option<i8> {
        self.u8_at(offset).map(|b| b as i8)
    }

    pub fn u16_at(&self, offset: usize) -> Option<u16> {
        let arr = self.array_at::<2>(offset)?;
        Some(match self.endian {
            Endian::Little => u16::from_le_bytes(arr),
            Endian::Big => u16::from_be_bytes(arr),
        })
    }

    pub fn i16_at(&self, offset: usize) -> Option<i16> {
        self.u16_at(offset).map(|v| v as i16)
    }

    pub fn u32_at(&self, offset: usize) -> Option<u32> {
        let arr = self.array_at::<4>(offset)?;
        Some(match self.endian {
            Endian::Little => u32::from_le_bytes(arr),
            Endian::Big => u32::from_be_bytes(arr),
        })
    }

    pub fn i32_at(&self, offset: usize) -> Option<i32> {
        self.u32_at(offset).map(|v| v as i32)
    }

    pub fn f32_at(&self, offset: usize) -> Option<f32> {
        self.u32_at(offset).map(f32::from_bits)
    }

    pub fn f64_at(&self, offset: usize) -> Option<f64> {
        let arr = self.array_at::<8>(offset)?;
        Some(match self.endian {
            Endian::Little => f64::from_le_bytes(arr),
            Endian::Big => f64::from_be_bytes(arr),
        })
    }

    pub fn read_u32(&mut self) -> Option<u32> {
        let v = self.u32_at(self.pos)?;
        self.pos += 4;
        Some(v)
    }

    pub fn read_f32(&mut self) -> Option<f32> {
        let v = self.f32_at(self.pos)?;
        self.pos += 4;
        Some(v)
    }
}

/// Splits a buffer into consecutive windows of whole records.
///
/// Each window is at most `max_bytes` long rounded down to a multiple of
/// `record_size`, but always holds at least one record so oversized records
/// still make progress. A trailing partial record is never yielded.
#[derive(Clone, Debug)]
pub struct Windows<'a> {
    bytes: &'a [u8],
    offset: usize,
    step: usize,
}

impl<'a> Windows<'a> {
    pub fn new(bytes: &'a [u8], max_bytes: usize, record_size: usize) -> Self {
        let record_size = record_size.max(1);
        let records = (max_bytes / record_size).max(1);
        let usable = bytes.len() - bytes.len() % record_size;
        Self {
            bytes: &bytes[..usable],
            offset: 0,
            step: records * record_size,
        }
    }
}

impl<'a> Iterator for Windows<'a> {
    type Item = (usize, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.bytes.len() {
            return None;
        }
        let start = self.offset;
        let end = start.saturating_add(self.step).min(self.bytes.len());
        self.offset = end;
        Some((start, &self.bytes[start..end]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_respect_endianness() {
        let bytes: [u8; 4] = [0x00, 0x00, 0x80, 0x3f];
        let le = ByteCursor::new(&bytes, Endian::Little);
        assert_eq!(le.f32_at(0), Some(1.0));

        let be_bytes: [u8; 4] = [0x3f, 0x80, 0x00, 0x00];
        let be = ByteCursor::new(&be_bytes, Endian::Big);
        assert_eq!(be.f32_at(0), Some(1.0));
        assert_eq!(be.u16_at(0), Some(0x3f80));
    }

    #[test]
    fn test_out_of_range_reads_are_none() {
        let bytes = [1u8, 2, 3];
        let cursor = ByteCursor::new(&bytes, Endian::Little);
        assert_eq!(cursor.u32_at(0), None);
        assert_eq!(cursor.u8_at(3), None);
        assert_eq!(cursor.f64_at(usize::MAX - 2), None);
    }

    #[test]
    fn test_sequential_reads_advance() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&2.5f32.to_le_bytes());
        bytes.extend_from_slice(&0xdead_beefu32.to_le_bytes());
        bytes.push(7);
        let mut cursor = ByteCursor::new(&bytes, Endian::Little);
        assert_eq!(cursor.read_f32(), Some(2.5));
        assert_eq!(cursor.read_u32(), Some(0xdead_beef));
        assert_eq!(cursor.position(), 8);
        assert_eq!(cursor.remaining(), 1);
        assert_eq!(cursor.read_u32(), None);
        cursor.seek(4);
        assert_eq!(cursor.read_u32(), Some(0xdead_beef));
    }

    #[test]
    fn test_windows_keep_records_whole() {
        let bytes: Vec<u8> = (0..100).collect();
        let windows: Vec<_> = Windows::new(&bytes, 25, 8).collect();
        // 24-byte windows, the last 4 bytes are a partial record
        assert_eq!(windows.len(), 4);
        assert!(windows.iter().all(|(_, w)| w.len() == 24));
        assert_eq!(windows[3].0, 72);
    }

    #[test]
    fn test_windows_with_oversized_record() {
        let bytes = [0u8; 64];
        let windows: Vec<_> = Windows::new(&bytes, 4, 32).collect();
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[1].0, 32);
    }
}
