//! BIFF record iteration and string decoding.
//!
//! Each BIFF record is a 4-byte header (type, length) followed by its
//! payload. Records longer than 8224 bytes spill into CONTINUE records; only
//! the shared string table needs that reassembly here.

use super::error::{XlsError, XlsResult};
use super::record_type;

/// A single BIFF record borrowed from the workbook stream.
#[derive(Debug, Clone, Copy)]
pub(super) struct Record<'a> {
    pub record_type: u16,
    pub data: &'a [u8],
    /// Offset of the record header within the stream
    pub offset: usize,
}

/// Iterator over the records of a workbook stream.
pub(super) struct RecordIter<'a> {
    stream: &'a [u8],
    pos: usize,
}

impl<'a> RecordIter<'a> {
    pub fn new(stream: &'a [u8], pos: usize) -> Self {
        Self { stream, pos }
    }

    /// Peek at the type of the next record without consuming it.
    pub fn peek_type(&self) -> Option<u16> {
        self.stream
            .get(self.pos..self.pos + 2)
            .map(|b| u16::from_le_bytes([b[0], b[1]]))
    }
}

impl<'a> Iterator for RecordIter<'a> {
    type Item = XlsResult<Record<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos + 4 > self.stream.len() {
            return None;
        }
        let offset = self.pos;
        let header = &self.stream[offset..offset + 4];
        let record_type = u16::from_le_bytes([header[0], header[1]]);
        let len = u16::from_le_bytes([header[2], header[3]]) as usize;
        let start = offset + 4;
        let end = start + len;
        if end > self.stream.len() {
            self.pos = self.stream.len();
            return Some(Err(XlsError::InvalidRecord {
                record_type,
                message: format!("length {} runs past end of stream", len),
            }));
        }
        self.pos = end;
        Some(Ok(Record {
            record_type,
            data: &self.stream[start..end],
            offset,
        }))
    }
}

#[inline]
pub(super) fn u16_at(data: &[u8], offset: usize) -> XlsResult<u16> {
    data.get(offset..offset + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .ok_or_else(|| XlsError::InvalidData(format!("u16 at offset {} out of bounds", offset)))
}

#[inline]
pub(super) fn u32_at(data: &[u8], offset: usize) -> XlsResult<u32> {
    data.get(offset..offset + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| XlsError::InvalidData(format!("u32 at offset {} out of bounds", offset)))
}

#[inline]
pub(super) fn f64_at(data: &[u8], offset: usize) -> XlsResult<f64> {
    data.get(offset..offset + 8)
        .map(|b| {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(b);
            f64::from_le_bytes(raw)
        })
        .ok_or_else(|| XlsError::InvalidData(format!("f64 at offset {} out of bounds", offset)))
}

/// Decode character data that is either compressed (Latin-1 low bytes) or UTF-16LE.
fn decode_chars(bytes: &[u8], wide: bool) -> String {
    if wide {
        let units: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        bytes.iter().map(|&b| b as char).collect()
    }
}

/// Read an XLUnicodeString (16-bit length) starting at `offset`.
///
/// Returns the string and the number of bytes consumed.
pub(super) fn read_unicode_string(data: &[u8], offset: usize) -> XlsResult<(String, usize)> {
    let cch = u16_at(data, offset)? as usize;
    read_string_body(data, offset + 2, cch).map(|(s, used)| (s, used + 2))
}

/// Read a ShortXLUnicodeString (8-bit length) starting at `offset`.
pub(super) fn read_short_unicode_string(data: &[u8], offset: usize) -> XlsResult<(String, usize)> {
    let cch = *data
        .get(offset)
        .ok_or_else(|| XlsError::InvalidData("missing string length".to_string()))?
        as usize;
    read_string_body(data, offset + 1, cch).map(|(s, used)| (s, used + 1))
}

fn read_string_body(data: &[u8], offset: usize, cch: usize) -> XlsResult<(String, usize)> {
    let flags = *data
        .get(offset)
        .ok_or_else(|| XlsError::InvalidData("missing string flags".to_string()))?;
    let wide = flags & 0x01 != 0;
    let byte_len = if wide { cch * 2 } else { cch };
    let start = offset + 1;
    let chars = data
        .get(start..start + byte_len)
        .ok_or_else(|| XlsError::InvalidData("string runs past end of record".to_string()))?;
    Ok((decode_chars(chars, wide), 1 + byte_len))
}

/// Cursor over an SST record and its CONTINUE fragments.
///
/// Character data that crosses a fragment boundary restarts with a fresh
/// option byte saying whether the remainder is compressed or UTF-16.
struct SstCursor<'a> {
    fragments: Vec<&'a [u8]>,
    index: usize,
    pos: usize,
}

impl<'a> SstCursor<'a> {
    fn remaining_in_fragment(&self) -> usize {
        self.fragments
            .get(self.index)
            .map(|f| f.len() - self.pos)
            .unwrap_or(0)
    }

    fn advance_fragment(&mut self) -> XlsResult<()> {
        self.index += 1;
        self.pos = 0;
        if self.index >= self.fragments.len() {
            return Err(XlsError::InvalidRecord {
                record_type: record_type::SST,
                message: "shared string table truncated".to_string(),
            });
        }
        Ok(())
    }

    fn read_bytes(&mut self, mut n: usize) -> XlsResult<Vec<u8>> {
        let mut out = Vec::with_capacity(n);
        while n > 0 {
            if self.remaining_in_fragment() == 0 {
                self.advance_fragment()?;
            }
            let take = n.min(self.remaining_in_fragment());
            let fragment = self.fragments[self.index];
            out.extend_from_slice(&fragment[self.pos..self.pos + take]);
            self.pos += take;
            n -= take;
        }
        Ok(out)
    }

    fn read_u8(&mut self) -> XlsResult<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    fn read_u16(&mut self) -> XlsResult<u16> {
        let b = self.read_bytes(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn read_u32(&mut self) -> XlsResult<u32> {
        let b = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_chars(&mut self, mut cch: usize, mut wide: bool) -> XlsResult<String> {
        let mut units: Vec<u16> = Vec::with_capacity(cch);
        while cch > 0 {
            if self.remaining_in_fragment() == 0 {
                self.advance_fragment()?;
                wide = self.read_u8()? & 0x01 != 0;
            }
            let width = if wide { 2 } else { 1 };
            let n = cch.min(self.remaining_in_fragment() / width);
            if n == 0 {
                return Err(XlsError::InvalidRecord {
                    record_type: record_type::CONTINUE,
                    message: "character split across fragments".to_string(),
                });
            }
            let fragment = self.fragments[self.index];
            let bytes = &fragment[self.pos..self.pos + n * width];
            if wide {
                units.extend(
                    bytes
                        .chunks_exact(2)
                        .map(|c| u16::from_le_bytes([c[0], c[1]])),
                );
            } else {
                units.extend(bytes.iter().map(|&b| b as u16));
            }
            self.pos += n * width;
            cch -= n;
        }
        Ok(String::from_utf16_lossy(&units))
    }
}

/// Parse a shared string table from the SST payload and its CONTINUE payloads.
pub(super) fn parse_sst(fragments: Vec<&[u8]>) -> XlsResult<Vec<String>> {
    let mut cursor = SstCursor {
        fragments,
        index: 0,
        pos: 0,
    };
    let _total = cursor.read_u32()?;
    let unique = cursor.read_u32()? as usize;

    let mut strings = Vec::with_capacity(unique.min(65536));
    for _ in 0..unique {
        let cch = cursor.read_u16()? as usize;
        let flags = cursor.read_u8()?;
        let rich_runs = if flags & 0x08 != 0 {
            cursor.read_u16()? as usize
        } else {
            0
        };
        let ext_len = if flags & 0x04 != 0 {
            cursor.read_u32()? as usize
        } else {
            0
        };
        strings.push(cursor.read_chars(cch, flags & 0x01 != 0)?);
        // Formatting runs and phonetic data are not needed for values
        cursor.read_bytes(rich_runs * 4 + ext_len)?;
    }
    Ok(strings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(rt: u16, data: &[u8]) -> Vec<u8> {
        let mut out = rt.to_le_bytes().to_vec();
        out.extend_from_slice(&(data.len() as u16).to_le_bytes());
        out.extend_from_slice(data);
        out
    }

    #[test]
    fn test_record_iter() {
        let mut stream = record(0x0809, &[1, 2, 3]);
        stream.extend(record(0x000A, &[]));
        let records: Vec<_> = RecordIter::new(&stream, 0)
            .collect::<XlsResult<Vec<_>>>()
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].record_type, 0x0809);
        assert_eq!(records[0].data, &[1, 2, 3]);
        assert_eq!(records[1].offset, 7);
    }

    #[test]
    fn test_record_iter_truncated() {
        let mut stream = record(0x0203, &[0; 14]);
        stream.truncate(10);
        let mut iter = RecordIter::new(&stream, 0);
        assert!(matches!(iter.next(), Some(Err(_))));
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_read_strings() {
        let data = [3, 0, 0, b'a', b'b', b'c'];
        assert_eq!(read_unicode_string(&data, 0).unwrap(), ("abc".to_string(), 6));

        let data = [2, 1, 0x3B, 0x04, 0x38, 0x04];
        assert_eq!(
            read_short_unicode_string(&data, 0).unwrap(),
            ("ли".to_string(), 6)
        );
    }

    #[test]
    fn test_parse_sst_with_continue_switching_width() {
        // "hello" split after "he"; the continuation switches to UTF-16
        let mut first = Vec::new();
        first.extend_from_slice(&1u32.to_le_bytes());
        first.extend_from_slice(&1u32.to_le_bytes());
        first.extend_from_slice(&5u16.to_le_bytes());
        first.push(0x00);
        first.extend_from_slice(b"he");
        let second = [0x01, b'l', 0, b'l', 0, b'o', 0];

        let strings = parse_sst(vec![&first, &second]).unwrap();
        assert_eq!(strings, vec!["hello".to_string()]);
    }

    #[test]
    fn test_parse_sst_skips_rich_text_runs() {
        let mut data = Vec::new();
        data.extend_from_slice(&2u32.to_le_bytes());
        data.extend_from_slice(&2u32.to_le_bytes());
        data.extend_from_slice(&2u16.to_le_bytes());
        data.push(0x08);
        data.extend_from_slice(&1u16.to_le_bytes());
        data.extend_from_slice(b"ab");
        data.extend_from_slice(&[0, 0, 1, 0]);
        data.extend_from_slice(&1u16.to_le_bytes());
        data.push(0x00);
        data.push(b'z');

        let strings = parse_sst(vec![&data]).unwrap();
        assert_eq!(strings, vec!["ab".to_string(), "z".to_string()]);
    }
}
