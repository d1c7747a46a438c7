//! Shared String Table writer.

use std::collections::HashMap;
use std::io::Write;

use super::{MAX_RECORD_DATA, encode_chars, write_record_header};
use crate::ole::xls::XlsResult;
use crate::ole::xls::record_type;

/// Deduplicating string table collected while worksheets are serialized.
#[derive(Debug, Default)]
pub(crate) struct SharedStrings {
    index: HashMap<String, u32>,
    strings: Vec<String>,
    total: u32,
}

impl SharedStrings {
    /// Return the SST index for `value`, adding it on first use.
    pub fn intern(&mut self, value: &str) -> u32 {
        self.total += 1;
        if let Some(&idx) = self.index.get(value) {
            return idx;
        }
        let idx = self.strings.len() as u32;
        self.index.insert(value.to_string(), idx);
        self.strings.push(value.to_string());
        idx
    }

    pub fn unique_count(&self) -> usize {
        self.strings.len()
    }

    /// Write the SST record followed by as many CONTINUE records as needed.
    ///
    /// String headers are never split; character data may be, in which case
    /// the CONTINUE record opens with the string's option byte again.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> XlsResult<()> {
        let mut first_record = true;
        let mut buffer: Vec<u8> = Vec::with_capacity(MAX_RECORD_DATA);

        let flush = |writer: &mut W, buf: &mut Vec<u8>, first: bool| -> XlsResult<()> {
            let rt = if first { record_type::SST } else { record_type::CONTINUE };
            write_record_header(writer, rt, buf.len() as u16)?;
            writer.write_all(buf)?;
            buf.clear();
            Ok(())
        };

        buffer.extend_from_slice(&self.total.to_le_bytes());
        buffer.extend_from_slice(&(self.strings.len() as u32).to_le_bytes());

        for s in &self.strings {
            let (flags, chars) = encode_chars(s);
            let unit = if flags == 0x01 { 2 } else { 1 };
            let cch = (chars.len() / unit).min(0xFFFF);
            let chars = &chars[..cch * unit];

            if MAX_RECORD_DATA - buffer.len() < 3 {
                flush(writer, &mut buffer, first_record)?;
                first_record = false;
            }
            buffer.extend_from_slice(&(cch as u16).to_le_bytes());
            buffer.push(flags);

            let mut written = 0;
            while written < chars.len() {
                let mut can_write = (MAX_RECORD_DATA - buffer.len()).min(chars.len() - written);
                // never split a UTF-16 code unit
                can_write -= can_write % unit;
                if can_write == 0 {
                    flush(writer, &mut buffer, first_record)?;
                    first_record = false;
                    buffer.push(flags);
                    continue;
                }
                buffer.extend_from_slice(&chars[written..written + can_write]);
                written += can_write;
            }
        }

        flush(writer, &mut buffer, first_record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ole::xls::records::{RecordIter, parse_sst};

    #[test]
    fn test_intern_deduplicates() {
        let mut sst = SharedStrings::default();
        assert_eq!(sst.intern("a"), 0);
        assert_eq!(sst.intern("b"), 1);
        assert_eq!(sst.intern("a"), 0);
        assert_eq!(sst.unique_count(), 2);
        assert_eq!(sst.total, 3);
    }

    #[test]
    fn test_long_strings_span_continue_records() {
        let mut sst = SharedStrings::default();
        let long_ascii = "x".repeat(10_000);
        let long_wide = "ж".repeat(6_000);
        sst.intern(&long_ascii);
        sst.intern(&long_wide);
        sst.intern("tail");

        let mut out = Vec::new();
        sst.write_to(&mut out).unwrap();

        let records: Vec<_> = RecordIter::new(&out, 0).map(|r| r.unwrap()).collect();
        assert!(records.len() > 2);
        assert_eq!(records[0].record_type, record_type::SST);
        assert!(records[1..].iter().all(|r| r.record_type == record_type::CONTINUE));

        let strings = parse_sst(records.iter().map(|r| r.data).collect()).unwrap();
        assert_eq!(strings, vec![long_ascii, long_wide, "tail".to_string()]);
    }
}
