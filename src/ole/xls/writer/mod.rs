//! BIFF8 workbook writer.
//!
//! Emits the minimal globals substream Excel accepts (fonts, the sixteen
//! mandatory XF records, the Normal style, sheet directory and SST) followed
//! by one worksheet substream per sheet, then wraps the result in an OLE2
//! compound file as the `Workbook` stream.

mod cells;
mod sst;

use std::io::Write;

use super::error::{XlsError, XlsResult};
use super::record_type;
use crate::ole::OleWriter;
use crate::ole::consts::MINI_STREAM_CUTOFF;
use crate::sheet::{Workbook, Worksheet};

pub(crate) use sst::SharedStrings;

/// Maximum payload of a single BIFF8 record
pub(crate) const MAX_RECORD_DATA: usize = 8224;

/// BIFF8 rows are 16-bit
pub(crate) const MAX_ROWS: u32 = 65_536;
/// BIFF8 columns are 8-bit
pub(crate) const MAX_COLUMNS: u16 = 256;

/// XF index used for ordinary cells
pub(crate) const XF_DEFAULT: u16 = 15;
/// XF index used for date cells (built-in number format 22, `m/d/yy h:mm`)
pub(crate) const XF_DATE: u16 = 16;
const DATE_NUMBER_FORMAT: u16 = 22;

const SUBSTREAM_GLOBALS: u16 = 0x0005;
const SUBSTREAM_WORKSHEET: u16 = 0x0010;

/// ANSI Windows code page marker used by BIFF8 for Unicode workbooks
const CODEPAGE_UNICODE: u16 = 0x04B0;

pub(crate) fn write_record_header<W: Write>(writer: &mut W, record_type: u16, len: u16) -> XlsResult<()> {
    writer.write_all(&record_type.to_le_bytes())?;
    writer.write_all(&len.to_le_bytes())?;
    Ok(())
}

fn write_record<W: Write>(writer: &mut W, record_type: u16, data: &[u8]) -> XlsResult<()> {
    if data.len() > MAX_RECORD_DATA {
        return Err(XlsError::InvalidRecord {
            record_type,
            message: format!("payload of {} bytes exceeds record limit", data.len()),
        });
    }
    write_record_header(writer, record_type, data.len() as u16)?;
    writer.write_all(data)?;
    Ok(())
}

/// Serialize `workbook` as a complete `.xls` file.
pub fn write_workbook<W: Write>(workbook: &Workbook, writer: &mut W) -> XlsResult<()> {
    let mut strings = SharedStrings::default();
    let mut sheet_streams = Vec::with_capacity(workbook.worksheet_count());
    for worksheet in workbook.worksheets() {
        let mut buf = Vec::new();
        write_worksheet(&mut buf, worksheet, &mut strings)?;
        sheet_streams.push(buf);
    }

    let mut stream = Vec::new();
    let position_slots = write_globals(&mut stream, workbook, &strings)?;

    for (slot, sheet) in position_slots.iter().zip(&sheet_streams) {
        let position = u32::try_from(stream.len())
            .map_err(|_| XlsError::InvalidData("workbook stream exceeds 4 GiB".to_string()))?;
        stream[*slot..*slot + 4].copy_from_slice(&position.to_le_bytes());
        stream.extend_from_slice(sheet);
    }

    // Regular-sector streams only; trailing zeros are ignored after the last EOF
    if stream.len() < MINI_STREAM_CUTOFF as usize {
        stream.resize(MINI_STREAM_CUTOFF as usize, 0);
    }

    let mut ole = OleWriter::new();
    ole.create_stream("Workbook", stream)?;
    ole.write_to(writer)?;
    Ok(())
}

fn write_bof<W: Write>(writer: &mut W, substream_type: u16) -> XlsResult<()> {
    let mut data = Vec::with_capacity(16);
    // BIFF version (0x0600 = BIFF8)
    data.extend_from_slice(&0x0600u16.to_le_bytes());
    data.extend_from_slice(&substream_type.to_le_bytes());
    // Build identifier and year
    data.extend_from_slice(&0x0DBBu16.to_le_bytes());
    data.extend_from_slice(&0x07CCu16.to_le_bytes());
    // File history flags
    data.extend_from_slice(&0u32.to_le_bytes());
    // Lowest BIFF version
    data.extend_from_slice(&0x0006u32.to_le_bytes());
    write_record(writer, record_type::BOF, &data)
}

fn write_eof<W: Write>(writer: &mut W) -> XlsResult<()> {
    write_record(writer, record_type::EOF, &[])
}

fn write_window1<W: Write>(writer: &mut W) -> XlsResult<()> {
    let mut data = Vec::with_capacity(18);
    for value in [0u16, 0, 0x3000, 0x1E00, 0x0038, 0, 0, 1, 0x0258] {
        data.extend_from_slice(&value.to_le_bytes());
    }
    write_record(writer, record_type::WINDOW1, &data)
}

fn write_font<W: Write>(writer: &mut W, name: &str) -> XlsResult<()> {
    let mut data = Vec::with_capacity(16 + name.len());
    // Height in twips (10pt)
    data.extend_from_slice(&200u16.to_le_bytes());
    // Attributes
    data.extend_from_slice(&0u16.to_le_bytes());
    // Automatic color
    data.extend_from_slice(&0x7FFFu16.to_le_bytes());
    // Normal weight
    data.extend_from_slice(&400u16.to_le_bytes());
    // Escapement, underline, family, charset, reserved
    data.extend_from_slice(&[0, 0, 0, 0, 0, 0]);
    data.push(name.len() as u8);
    data.push(0x00);
    data.extend_from_slice(name.as_bytes());
    write_record(writer, record_type::FONT, &data)
}

fn write_xf<W: Write>(writer: &mut W, format_index: u16, is_style: bool) -> XlsResult<()> {
    let mut data = Vec::with_capacity(20);
    // Font index
    data.extend_from_slice(&0u16.to_le_bytes());
    data.extend_from_slice(&format_index.to_le_bytes());
    // Style XFs have no parent; cell XFs are locked and inherit from style 0
    let type_prot: u16 = if is_style { 0xFFF5 } else { 0x0001 };
    data.extend_from_slice(&type_prot.to_le_bytes());
    // Bottom aligned, no rotation, no indent
    data.extend_from_slice(&[0x20, 0x00, 0x00]);
    // Attributes used: none for style XFs, number format for cell XFs
    data.push(if is_style { 0x00 } else { 0x04 });
    // Borders, palette, fill
    data.extend_from_slice(&0u16.to_le_bytes());
    data.extend_from_slice(&0u16.to_le_bytes());
    data.extend_from_slice(&0u32.to_le_bytes());
    data.extend_from_slice(&0x20C0u16.to_le_bytes());
    write_record(writer, record_type::XF, &data)
}

fn write_boundsheet<W: Write>(writer: &mut W, name: &str) -> XlsResult<()> {
    let (flags, chars) = encode_chars(name);
    let cch = name.encode_utf16().count();
    let mut data = Vec::with_capacity(8 + chars.len());
    // Stream position, patched once sheet offsets are known
    data.extend_from_slice(&0u32.to_le_bytes());
    // Visible worksheet
    data.extend_from_slice(&0u16.to_le_bytes());
    data.push(cch as u8);
    data.push(flags);
    data.extend_from_slice(&chars);
    write_record(writer, record_type::BOUNDSHEET, &data)
}

/// Encode characters as compressed 8-bit when possible, UTF-16LE otherwise.
pub(crate) fn encode_chars(value: &str) -> (u8, Vec<u8>) {
    if value.chars().all(|c| (c as u32) < 0x100) {
        (0x00, value.chars().map(|c| c as u8).collect())
    } else {
        let mut buf = Vec::with_capacity(value.len() * 2);
        for unit in value.encode_utf16() {
            buf.extend_from_slice(&unit.to_le_bytes());
        }
        (0x01, buf)
    }
}

/// Write the globals substream; returns the offsets of each BOUNDSHEET position field.
fn write_globals(stream: &mut Vec<u8>, workbook: &Workbook, strings: &SharedStrings) -> XlsResult<Vec<usize>> {
    write_bof(stream, SUBSTREAM_GLOBALS)?;
    write_record(stream, record_type::CODEPAGE, &CODEPAGE_UNICODE.to_le_bytes())?;
    write_window1(stream)?;
    write_record(stream, record_type::DATE1904, &0u16.to_le_bytes())?;

    // Font index 4 does not exist in BIFF, so four fonts cover 0..=5
    for _ in 0..4 {
        write_font(stream, "Arial")?;
    }

    for _ in 0..XF_DEFAULT {
        write_xf(stream, 0, true)?;
    }
    write_xf(stream, 0, false)?;
    write_xf(stream, DATE_NUMBER_FORMAT, false)?;

    // Built-in Normal style bound to XF 0
    write_record(stream, record_type::STYLE, &[0x00, 0x80, 0x00, 0xFF])?;

    let mut slots = Vec::with_capacity(workbook.worksheet_count());
    for worksheet in workbook.worksheets() {
        // Position field follows the 4-byte record header
        slots.push(stream.len() + 4);
        write_boundsheet(stream, worksheet.name())?;
    }

    strings.write_to(stream)?;
    write_eof(stream)?;
    Ok(slots)
}

fn write_worksheet<W: Write>(writer: &mut W, worksheet: &Worksheet, strings: &mut SharedStrings) -> XlsResult<()> {
    write_bof(writer, SUBSTREAM_WORKSHEET)?;

    let mut dimensions = Vec::with_capacity(14);
    match worksheet.dimensions() {
        Some((first_row, first_col, last_row, last_col)) => {
            if last_row >= MAX_ROWS {
                return Err(XlsError::InvalidData(format!(
                    "Row index {} exceeds BIFF8 limit 65535 in sheet '{}'",
                    last_row,
                    worksheet.name()
                )));
            }
            if last_col >= MAX_COLUMNS {
                return Err(XlsError::InvalidData(format!(
                    "Column index {} exceeds BIFF8 limit 255 in sheet '{}'",
                    last_col,
                    worksheet.name()
                )));
            }
            dimensions.extend_from_slice(&first_row.to_le_bytes());
            dimensions.extend_from_slice(&(last_row + 1).to_le_bytes());
            dimensions.extend_from_slice(&first_col.to_le_bytes());
            dimensions.extend_from_slice(&(last_col + 1).to_le_bytes());
        },
        None => dimensions.extend_from_slice(&[0u8; 12]),
    }
    dimensions.extend_from_slice(&0u16.to_le_bytes());
    write_record(writer, record_type::DIMENSIONS, &dimensions)?;

    // Gridlines, headers, zeros shown, first sheet selected
    let mut window2 = Vec::with_capacity(18);
    window2.extend_from_slice(&0x06B6u16.to_le_bytes());
    window2.extend_from_slice(&[0u8; 4]);
    window2.extend_from_slice(&0x0040u32.to_le_bytes());
    window2.extend_from_slice(&[0u8; 8]);
    write_record(writer, record_type::WINDOW2, &window2)?;

    for (row, cells) in worksheet.rows() {
        for (col, value) in cells.iter().enumerate() {
            cells::write_cell(writer, row, col as u16, value, strings)?;
        }
    }

    write_eof(writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::WorkbookFormat;
    use crate::sheet::CellValue;
    use std::io::Cursor;

    fn round_trip(workbook: &Workbook) -> Workbook {
        let mut bytes = Vec::new();
        write_workbook(workbook, &mut bytes).unwrap();
        crate::ole::xls::read_workbook(Cursor::new(bytes)).unwrap()
    }

    #[test]
    fn test_empty_workbook_round_trip() {
        let workbook = Workbook::new(WorkbookFormat::Xls);
        let reopened = round_trip(&workbook);
        assert_eq!(reopened.worksheet_count(), 0);
    }

    #[test]
    fn test_cell_values_round_trip() {
        let mut workbook = Workbook::new(WorkbookFormat::Xls);
        let sheet = workbook.add_worksheet("Data").unwrap();
        sheet.append_row(vec!["id".into(), "name".into(), "score".into(), "ok".into()]);
        sheet.append_row(vec![
            CellValue::Int(1),
            "Zoë".into(),
            CellValue::Float(12.5),
            CellValue::Bool(true),
        ]);
        sheet.append_row(vec![
            CellValue::Int(3_000_000_000),
            CellValue::DateTime(45000.25),
            CellValue::Error("#DIV/0!".to_string()),
            "id".into(),
        ]);
        workbook.add_worksheet("Пусто").unwrap();

        let reopened = round_trip(&workbook);
        assert_eq!(reopened.worksheet_names(), vec!["Data", "Пусто"]);

        let data = reopened.worksheet("Data").unwrap();
        assert_eq!(data.cell(0, 2), &CellValue::String("score".to_string()));
        assert_eq!(data.cell(1, 0), &CellValue::Int(1));
        assert_eq!(data.cell(1, 1), &CellValue::String("Zoë".to_string()));
        assert_eq!(data.cell(1, 2), &CellValue::Float(12.5));
        assert_eq!(data.cell(1, 3), &CellValue::Bool(true));
        assert_eq!(data.cell(2, 0), &CellValue::Float(3_000_000_000.0));
        assert_eq!(data.cell(2, 1), &CellValue::DateTime(45000.25));
        assert_eq!(data.cell(2, 2), &CellValue::Error("#DIV/0!".to_string()));
        assert_eq!(data.cell(2, 3), &CellValue::String("id".to_string()));
    }

    #[test]
    fn test_rejects_rows_beyond_biff8_limit() {
        let mut workbook = Workbook::new(WorkbookFormat::Xls);
        let sheet = workbook.add_worksheet("Tall").unwrap();
        sheet.set_cell(MAX_ROWS, 0, CellValue::Int(1));

        let mut bytes = Vec::new();
        let err = write_workbook(&workbook, &mut bytes).unwrap_err();
        assert!(matches!(err, XlsError::InvalidData(_)));
    }
}
