//! Worksheet part serialization and incremental row scanning.
//!
//! Rows are written as self-contained `<row>` fragments so the streaming
//! writer can spill them to a temporary file and splice them into the
//! package later. The scanner reads them back one row at a time from any
//! `Read`, holding at most one row plus a read chunk in memory.

use std::io::{Read, Write};

use memchr::memmem;

use super::xml::{attr, collect_text, find_tag_open, unescape};
use crate::common::{Error, Result};
use crate::sheet::CellValue;

/// Style index of the date cell format in generated style sheets
pub(crate) const STYLE_DATE: u32 = 1;

/// SpreadsheetML grid limits
pub(crate) const MAX_ROWS: u32 = 1_048_576;
pub(crate) const MAX_COLUMNS: u16 = 16_384;

const READ_CHUNK: usize = 64 * 1024;

const SHEET_START: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    "\n",
    r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" "#,
    r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#,
    "<sheetData>"
);
const SHEET_END: &str = "</sheetData></worksheet>";

/// Lookup tables a cell needs to decode its value.
#[derive(Debug, Default, Clone)]
pub(crate) struct CellContext {
    pub shared_strings: Vec<String>,
    /// One flag per `cellXfs` entry
    pub date_styles: Vec<bool>,
}

impl CellContext {
    fn is_date_style(&self, index: usize) -> bool {
        self.date_styles.get(index).copied().unwrap_or(false)
    }
}

pub(crate) fn write_sheet_start(out: &mut dyn Write) -> Result<()> {
    out.write_all(SHEET_START.as_bytes())?;
    Ok(())
}

pub(crate) fn write_sheet_end(out: &mut dyn Write) -> Result<()> {
    out.write_all(SHEET_END.as_bytes())?;
    Ok(())
}

/// Append the column letters for a zero-based column index.
pub(crate) fn push_column_name(out: &mut String, column: u16) {
    let mut n = column as u32 + 1;
    let mut buf = [0u8; 4];
    let mut i = buf.len();
    while n > 0 {
        i -= 1;
        buf[i] = b'A' + ((n - 1) % 26) as u8;
        n = (n - 1) / 26;
    }
    for &b in &buf[i..] {
        out.push(b as char);
    }
}

/// Parse an `A1` style reference into zero-based (column, row).
pub(crate) fn parse_cell_ref(reference: &[u8]) -> Option<(u16, u32)> {
    let split = reference.iter().position(|b| b.is_ascii_digit())?;
    if split == 0 || split > 3 {
        return None;
    }
    let mut column = 0u32;
    for &b in &reference[..split] {
        if !b.is_ascii_alphabetic() {
            return None;
        }
        column = column * 26 + (b.to_ascii_uppercase() - b'A' + 1) as u32;
    }
    let row = atoi_simd::parse::<u32>(&reference[split..]).ok()?;
    Some((u16::try_from(column - 1).ok()?, row.checked_sub(1)?))
}

/// Serialize one row. Empty cells are omitted.
pub(crate) fn write_row(out: &mut dyn Write, row: u32, cells: &[CellValue]) -> Result<()> {
    if row >= MAX_ROWS {
        return Err(Error::InvalidFormat(format!(
            "Row index {} exceeds the worksheet limit of {} rows",
            row, MAX_ROWS
        )));
    }
    if cells.len() > MAX_COLUMNS as usize {
        return Err(Error::InvalidFormat(format!(
            "Row {} has {} cells; worksheets hold at most {} columns",
            row,
            cells.len(),
            MAX_COLUMNS
        )));
    }

    let mut ints = itoa::Buffer::new();
    let mut floats = ryu::Buffer::new();
    let row_number = ints.format(row + 1).to_string();

    let mut xml = String::with_capacity(32 + cells.len() * 24);
    xml.push_str(r#"<row r=""#);
    xml.push_str(&row_number);
    xml.push_str(r#"">"#);

    for (col, value) in cells.iter().enumerate() {
        if value.is_empty() {
            continue;
        }
        xml.push_str(r#"<c r=""#);
        push_column_name(&mut xml, col as u16);
        xml.push_str(&row_number);
        xml.push('"');

        match value {
            CellValue::Empty => {},
            CellValue::Int(v) => {
                xml.push_str("><v>");
                xml.push_str(ints.format(*v));
                xml.push_str("</v>");
            },
            CellValue::Float(v) if v.is_finite() => {
                xml.push_str("><v>");
                xml.push_str(floats.format_finite(*v));
                xml.push_str("</v>");
            },
            CellValue::DateTime(v) if v.is_finite() => {
                xml.push_str(r#" s=""#);
                xml.push_str(ints.format(STYLE_DATE));
                xml.push_str(r#""><v>"#);
                xml.push_str(floats.format_finite(*v));
                xml.push_str("</v>");
            },
            CellValue::Float(_) | CellValue::DateTime(_) => {
                xml.push_str(r#" t="e"><v>#NUM!</v>"#);
            },
            CellValue::Bool(b) => {
                xml.push_str(r#" t="b"><v>"#);
                xml.push(if *b { '1' } else { '0' });
                xml.push_str("</v>");
            },
            CellValue::Error(code) => {
                xml.push_str(r#" t="e"><v>"#);
                xml.push_str(&quick_xml::escape::escape(code.as_str()));
                xml.push_str("</v>");
            },
            CellValue::String(s) => {
                xml.push_str(r#" t="inlineStr"><is><t xml:space="preserve">"#);
                xml.push_str(&quick_xml::escape::escape(s.as_str()));
                xml.push_str("</t></is>");
            },
        }
        xml.push_str("</c>");
    }
    xml.push_str("</row>");

    out.write_all(xml.as_bytes())?;
    Ok(())
}

/// Pull parser that yields the rows of a worksheet part in document order.
pub(crate) struct RowScanner<'c, R> {
    reader: R,
    context: &'c CellContext,
    buf: Vec<u8>,
    pos: usize,
    eof: bool,
    next_row: u32,
}

impl<'c, R: Read> RowScanner<'c, R> {
    pub fn new(reader: R, context: &'c CellContext) -> Self {
        Self {
            reader,
            context,
            buf: Vec::with_capacity(READ_CHUNK),
            pos: 0,
            eof: false,
            next_row: 0,
        }
    }

    /// Next row as (zero-based index, cells), or `None` at the end of the part.
    pub fn next_row(&mut self) -> Result<Option<(u32, Vec<CellValue>)>> {
        loop {
            if let Some((start, end, self_closing)) = self.locate_row() {
                let row = parse_row(&self.buf[start..end], self_closing, self.next_row, self.context)?;
                self.pos = end;
                self.next_row = row.0.saturating_add(1);
                return Ok(Some(row));
            }
            if self.eof {
                return Ok(None);
            }
            self.fill()?;
        }
    }

    /// Byte range of the next complete `<row>` element in the buffer.
    fn locate_row(&self) -> Option<(usize, usize, bool)> {
        let hay = &self.buf[self.pos..];
        let open = find_tag_open(hay, b"row")?;
        let gt = open + memchr::memchr(b'>', &hay[open..])?;
        if hay[gt - 1] == b'/' {
            return Some((self.pos + open, self.pos + gt + 1, true));
        }
        let close = gt + memmem::find(&hay[gt..], b"</row>")?;
        Some((self.pos + open, self.pos + close + 6, false))
    }

    fn fill(&mut self) -> Result<()> {
        // Markup before the first row is never needed again; keep a tail in
        // case it holds a partial `<row` tag
        if find_tag_open(&self.buf[self.pos..], b"row").is_none() {
            self.pos = self.pos.max(self.buf.len().saturating_sub(8));
        }
        self.buf.drain(..self.pos);
        self.pos = 0;

        let old_len = self.buf.len();
        self.buf.resize(old_len + READ_CHUNK, 0);
        let read = loop {
            match self.reader.read(&mut self.buf[old_len..]) {
                Ok(n) => break n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.buf.truncate(old_len);
                    return Err(e.into());
                },
            }
        };
        self.buf.truncate(old_len + read);
        if read == 0 {
            self.eof = true;
        }
        Ok(())
    }
}

fn parse_row(
    bytes: &[u8],
    self_closing: bool,
    default_row: u32,
    context: &CellContext,
) -> Result<(u32, Vec<CellValue>)> {
    let tag_end = memchr::memchr(b'>', bytes)
        .ok_or_else(|| Error::XmlError("unterminated <row> tag".to_string()))?;
    let tag = &bytes[4..tag_end];
    let row = match attr(tag, b"r") {
        Some(r) => atoi_simd::parse::<u32>(r)
            .ok()
            .and_then(|n| n.checked_sub(1))
            .ok_or_else(|| Error::XmlError(format!("invalid row number {:?}", String::from_utf8_lossy(r))))?,
        None => default_row,
    };

    let mut cells = Vec::new();
    if self_closing {
        return Ok((row, cells));
    }

    let body = &bytes[tag_end + 1..];
    let mut pos = 0;
    let mut next_col: u16 = 0;
    while let Some(found) = find_tag_open(&body[pos..], b"c") {
        let open = pos + found;
        let gt = open
            + memchr::memchr(b'>', &body[open..])
                .ok_or_else(|| Error::XmlError("unterminated <c> tag".to_string()))?;
        let tag = &body[open + 2..gt];
        let (content, end) = if body[gt - 1] == b'/' {
            (&body[gt..gt], gt + 1)
        } else {
            let close = gt
                + 1
                + memmem::find(&body[gt + 1..], b"</c>")
                    .ok_or_else(|| Error::XmlError("unterminated <c> element".to_string()))?;
            (&body[gt + 1..close], close + 4)
        };
        pos = end;

        let col = match attr(tag, b"r") {
            Some(r) => {
                parse_cell_ref(r)
                    .ok_or_else(|| {
                        Error::XmlError(format!("invalid cell reference {:?}", String::from_utf8_lossy(r)))
                    })?
                    .0
            },
            None => next_col,
        };
        next_col = col.saturating_add(1);

        let value = decode_cell(tag, content, context)?;
        if value.is_empty() {
            continue;
        }
        let idx = col as usize;
        if cells.len() <= idx {
            cells.resize(idx + 1, CellValue::Empty);
        }
        cells[idx] = value;
    }

    Ok((row, cells))
}

fn element_text<'a>(xml: &'a [u8], name: &[u8]) -> Option<&'a [u8]> {
    let open = find_tag_open(xml, name)?;
    let gt = open + memchr::memchr(b'>', &xml[open..])?;
    if xml[gt - 1] == b'/' {
        return Some(&xml[gt..gt]);
    }
    let mut close_tag = Vec::with_capacity(name.len() + 3);
    close_tag.extend_from_slice(b"</");
    close_tag.extend_from_slice(name);
    close_tag.push(b'>');
    let close = memmem::find(&xml[gt + 1..], &close_tag)?;
    Some(&xml[gt + 1..gt + 1 + close])
}

fn decode_cell(tag: &[u8], content: &[u8], context: &CellContext) -> Result<CellValue> {
    let cell_type = attr(tag, b"t").unwrap_or(b"n");
    if cell_type == b"inlineStr" {
        return Ok(CellValue::String(collect_text(content)?));
    }
    let Some(raw) = element_text(content, b"v") else {
        return Ok(CellValue::Empty);
    };

    match cell_type {
        b"s" => {
            let index = atoi_simd::parse::<usize>(raw)
                .map_err(|_| Error::XmlError("invalid shared string index".to_string()))?;
            context
                .shared_strings
                .get(index)
                .map(|s| CellValue::String(s.clone()))
                .ok_or_else(|| Error::CorruptedFile(format!("shared string {} out of range", index)))
        },
        b"str" | b"d" => Ok(CellValue::String(unescape(raw)?.into_owned())),
        b"b" => Ok(CellValue::Bool(raw == b"1" || raw == b"true")),
        b"e" => Ok(CellValue::Error(unescape(raw)?.into_owned())),
        _ => {
            if raw.is_empty() {
                return Ok(CellValue::Empty);
            }
            let style = attr(tag, b"s")
                .and_then(|s| atoi_simd::parse::<usize>(s).ok())
                .unwrap_or(0);
            if context.is_date_style(style) {
                let serial = fast_float2::parse::<f64, _>(raw)
                    .map_err(|_| Error::XmlError("invalid date serial".to_string()))?;
                return Ok(CellValue::DateTime(serial));
            }
            if let Ok(int_val) = atoi_simd::parse::<i64>(raw) {
                Ok(CellValue::Int(int_val))
            } else if let Ok(float_val) = fast_float2::parse::<f64, _>(raw) {
                Ok(CellValue::Float(float_val))
            } else {
                Err(Error::XmlError(format!(
                    "invalid numeric cell value {:?}",
                    String::from_utf8_lossy(raw)
                )))
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Reader that hands out one byte per call, to exercise buffer refills.
    struct Trickle<R>(R);

    impl<R: Read> Read for Trickle<R> {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let len = buf.len().min(1);
            self.0.read(&mut buf[..len])
        }
    }

    fn render(rows: &[(u32, Vec<CellValue>)]) -> Vec<u8> {
        let mut out = Vec::new();
        write_sheet_start(&mut out).unwrap();
        for (index, cells) in rows {
            write_row(&mut out, *index, cells).unwrap();
        }
        write_sheet_end(&mut out).unwrap();
        out
    }

    #[test]
    fn test_column_names() {
        let name = |col| {
            let mut s = String::new();
            push_column_name(&mut s, col);
            s
        };
        assert_eq!(name(0), "A");
        assert_eq!(name(25), "Z");
        assert_eq!(name(26), "AA");
        assert_eq!(name(701), "ZZ");
        assert_eq!(name(702), "AAA");
        assert_eq!(name(16_383), "XFD");
    }

    #[test]
    fn test_parse_cell_ref() {
        assert_eq!(parse_cell_ref(b"A1"), Some((0, 0)));
        assert_eq!(parse_cell_ref(b"xfd1048576"), Some((16_383, 1_048_575)));
        assert_eq!(parse_cell_ref(b"1A"), None);
        assert_eq!(parse_cell_ref(b"A0"), None);
    }

    #[test]
    fn test_rows_survive_byte_at_a_time_reads() {
        let rows = vec![
            (0, vec!["a < b".into(), CellValue::Int(-3), CellValue::Float(0.5)]),
            (4, vec![CellValue::Empty, CellValue::Bool(false), CellValue::Error("#REF!".into())]),
            (5, vec![CellValue::DateTime(44000.5)]),
        ];
        let xml = render(&rows);
        let context = CellContext {
            shared_strings: Vec::new(),
            date_styles: vec![false, true],
        };

        let mut scanner = RowScanner::new(Trickle(Cursor::new(xml)), &context);
        let mut seen = Vec::new();
        while let Some(row) = scanner.next_row().unwrap() {
            seen.push(row);
        }
        assert_eq!(seen, rows);
    }

    #[test]
    fn test_shared_strings_and_implicit_positions() {
        let xml = br#"<worksheet><sheetData><row><c t="s"><v>1</v></c><c><v>7</v></c></row><row r="3"/><row><c r="C4" t="str"><v>x&amp;y</v></c></row></sheetData></worksheet>"#;
        let context = CellContext {
            shared_strings: vec!["zero".into(), "one".into()],
            date_styles: Vec::new(),
        };
        let mut scanner = RowScanner::new(Cursor::new(xml.to_vec()), &context);

        assert_eq!(
            scanner.next_row().unwrap(),
            Some((0, vec![CellValue::String("one".into()), CellValue::Int(7)]))
        );
        assert_eq!(scanner.next_row().unwrap(), Some((2, vec![])));
        assert_eq!(
            scanner.next_row().unwrap(),
            Some((3, vec![CellValue::Empty, CellValue::Empty, CellValue::String("x&y".into())]))
        );
        assert_eq!(scanner.next_row().unwrap(), None);
    }

    #[test]
    fn test_write_row_rejects_out_of_grid() {
        let mut out = Vec::new();
        assert!(write_row(&mut out, MAX_ROWS, &[CellValue::Int(1)]).is_err());
    }
}
