//! BIFF8 workbook reader.
//!
//! The globals substream is scanned once for the sheet directory, the shared
//! string table and the XF table; each worksheet substream is then decoded
//! starting from the offset recorded in its BOUNDSHEET8 record.

use std::collections::HashMap;
use std::io::{Read, Seek};

use super::error::{XlsError, XlsResult};
use super::record_type;
use super::records::{
    Record, RecordIter, f64_at, parse_sst, read_short_unicode_string, read_unicode_string, u16_at,
    u32_at,
};
use super::WORKBOOK_STREAM_NAMES;
use crate::common::WorkbookFormat;
use crate::ole::{OleError, OleFile};
use crate::sheet::number_format::{is_builtin_date_format, is_date_format_string};
use crate::sheet::types::ERROR_CODES;
use crate::sheet::{CellValue, Workbook, Worksheet};

/// BIFF8 version number in the BOF record
const BIFF8_VERSION: u16 = 0x0600;

/// Sheet type byte of a BOUNDSHEET8 record for plain worksheets
const SHEET_TYPE_WORKSHEET: u8 = 0x00;

#[derive(Debug)]
struct BoundSheet {
    name: String,
    offset: usize,
    sheet_type: u8,
}

#[derive(Debug, Default)]
struct Globals {
    sheets: Vec<BoundSheet>,
    strings: Vec<String>,
    /// One flag per XF record: does the XF render its value as a date
    date_xfs: Vec<bool>,
}

impl Globals {
    fn is_date_xf(&self, xf: u16) -> bool {
        self.date_xfs.get(xf as usize).copied().unwrap_or(false)
    }
}

/// Read a legacy `.xls` workbook into memory.
pub fn read_workbook<R: Read + Seek>(reader: R) -> XlsResult<Workbook> {
    let mut ole = OleFile::open(reader)?;
    let stream_name = WORKBOOK_STREAM_NAMES
        .iter()
        .find(|name| ole.exists(name))
        .ok_or_else(|| XlsError::Ole(OleError::StreamNotFound("Workbook".to_string())))?;
    let stream = ole.open_stream(stream_name)?;

    let globals = parse_globals(&stream)?;
    let mut worksheets = Vec::with_capacity(globals.sheets.len());
    for sheet in &globals.sheets {
        // Chart sheets, macro sheets and VB modules carry no cell table
        if sheet.sheet_type != SHEET_TYPE_WORKSHEET {
            continue;
        }
        worksheets.push(parse_worksheet(&stream, sheet, &globals)?);
    }

    Ok(Workbook::from_parts(WorkbookFormat::Xls, worksheets))
}

fn check_bof(record: &Record<'_>) -> XlsResult<()> {
    if record.record_type != record_type::BOF {
        return Err(XlsError::InvalidRecord {
            record_type: record.record_type,
            message: "expected BOF".to_string(),
        });
    }
    let version = u16_at(record.data, 0)?;
    if version != BIFF8_VERSION {
        return Err(XlsError::UnsupportedBiffVersion(version));
    }
    Ok(())
}

fn parse_globals(stream: &[u8]) -> XlsResult<Globals> {
    let mut globals = Globals::default();
    let mut formats: HashMap<u16, String> = HashMap::new();
    let mut xf_formats: Vec<u16> = Vec::new();

    let mut records = RecordIter::new(stream, 0);
    let first = records
        .next()
        .ok_or_else(|| XlsError::InvalidData("empty workbook stream".to_string()))??;
    check_bof(&first)?;

    while let Some(record) = records.next() {
        let record = record?;
        match record.record_type {
            record_type::EOF => break,
            record_type::FILEPASS => {
                return Err(XlsError::InvalidData(
                    "encrypted workbooks are not supported".to_string(),
                ));
            },
            record_type::FORMAT => {
                let id = u16_at(record.data, 0)?;
                let (pattern, _) = read_unicode_string(record.data, 2)?;
                formats.insert(id, pattern);
            },
            record_type::XF => {
                xf_formats.push(u16_at(record.data, 2)?);
            },
            record_type::BOUNDSHEET => {
                let offset = u32_at(record.data, 0)? as usize;
                let sheet_type = *record.data.get(5).unwrap_or(&SHEET_TYPE_WORKSHEET);
                let (name, _) = read_short_unicode_string(record.data, 6)?;
                globals.sheets.push(BoundSheet {
                    name,
                    offset,
                    sheet_type,
                });
            },
            record_type::SST => {
                let mut fragments = vec![record.data];
                while records.peek_type() == Some(record_type::CONTINUE) {
                    if let Some(next) = records.next() {
                        fragments.push(next?.data);
                    }
                }
                globals.strings = parse_sst(fragments)?;
            },
            _ => {},
        }
    }

    globals.date_xfs = xf_formats
        .iter()
        .map(|id| {
            is_builtin_date_format(*id)
                || formats
                    .get(id)
                    .map(|pattern| is_date_format_string(pattern))
                    .unwrap_or(false)
        })
        .collect();

    Ok(globals)
}

/// Decode an RK number into its value and whether it is an exact integer.
fn decode_rk(rk: u32) -> (f64, bool) {
    let div100 = rk & 0x01 != 0;
    let is_int = rk & 0x02 != 0;
    let value = if is_int {
        ((rk as i32) >> 2) as f64
    } else {
        f64::from_bits(((rk & 0xFFFF_FFFC) as u64) << 32)
    };
    if div100 {
        (value / 100.0, false)
    } else {
        (value, is_int)
    }
}

fn numeric_cell(value: f64, is_int: bool, is_date: bool) -> CellValue {
    if is_date {
        CellValue::DateTime(value)
    } else if is_int {
        CellValue::Int(value as i64)
    } else {
        CellValue::Float(value)
    }
}

fn error_cell(code: u8) -> CellValue {
    let literal = ERROR_CODES
        .iter()
        .find(|(_, c)| *c == code)
        .map(|(s, _)| *s)
        .unwrap_or("#N/A");
    CellValue::Error(literal.to_string())
}

fn parse_worksheet(stream: &[u8], sheet: &BoundSheet, globals: &Globals) -> XlsResult<Worksheet> {
    if sheet.offset >= stream.len() {
        return Err(XlsError::InvalidData(format!(
            "worksheet '{}' starts past end of stream",
            sheet.name
        )));
    }

    let mut worksheet = Worksheet::new(sheet.name.clone());
    let mut records = RecordIter::new(stream, sheet.offset);
    let first = records
        .next()
        .ok_or_else(|| XlsError::InvalidData(format!("worksheet '{}' is empty", sheet.name)))??;
    check_bof(&first)?;

    // Embedded substreams (charts) open their own BOF/EOF pair
    let mut depth = 0usize;
    let mut pending_string: Option<(u32, u16)> = None;

    for record in records {
        let record = record?;
        let data = record.data;
        match record.record_type {
            record_type::BOF => depth += 1,
            record_type::EOF if depth == 0 => break,
            record_type::EOF => depth -= 1,
            _ if depth > 0 => {},
            record_type::NUMBER => {
                let (row, col, xf) = cell_header(data)?;
                let value = f64_at(data, 6)?;
                worksheet.set_cell(row, col, numeric_cell(value, false, globals.is_date_xf(xf)));
            },
            record_type::RK => {
                let (row, col, xf) = cell_header(data)?;
                let (value, is_int) = decode_rk(u32_at(data, 6)?);
                worksheet.set_cell(row, col, numeric_cell(value, is_int, globals.is_date_xf(xf)));
            },
            record_type::MULRK => {
                let row = u16_at(data, 0)? as u32;
                let first_col = u16_at(data, 2)?;
                let count = data.len().saturating_sub(6) / 6;
                for i in 0..count {
                    let base = 4 + i * 6;
                    let xf = u16_at(data, base)?;
                    let (value, is_int) = decode_rk(u32_at(data, base + 2)?);
                    worksheet.set_cell(
                        row,
                        first_col + i as u16,
                        numeric_cell(value, is_int, globals.is_date_xf(xf)),
                    );
                }
            },
            record_type::LABELSST => {
                let (row, col, _) = cell_header(data)?;
                let index = u32_at(data, 6)? as usize;
                let value = globals.strings.get(index).ok_or_else(|| XlsError::InvalidRecord {
                    record_type: record_type::LABELSST,
                    message: format!("string index {} out of range", index),
                })?;
                worksheet.set_cell(row, col, CellValue::String(value.clone()));
            },
            record_type::LABEL => {
                let (row, col, _) = cell_header(data)?;
                let (value, _) = read_unicode_string(data, 6)?;
                worksheet.set_cell(row, col, CellValue::String(value));
            },
            record_type::BOOLERR => {
                let (row, col, _) = cell_header(data)?;
                let value = *data.get(6).unwrap_or(&0);
                let is_error = *data.get(7).unwrap_or(&0) != 0;
                let cell = if is_error {
                    error_cell(value)
                } else {
                    CellValue::Bool(value != 0)
                };
                worksheet.set_cell(row, col, cell);
            },
            record_type::FORMULA => {
                let (row, col, xf) = cell_header(data)?;
                let result = data.get(6..14).ok_or_else(|| XlsError::InvalidRecord {
                    record_type: record_type::FORMULA,
                    message: "missing cached result".to_string(),
                })?;
                if result[6] == 0xFF && result[7] == 0xFF {
                    match result[0] {
                        0x00 => pending_string = Some((row, col)),
                        0x01 => worksheet.set_cell(row, col, CellValue::Bool(result[2] != 0)),
                        0x02 => worksheet.set_cell(row, col, error_cell(result[2])),
                        _ => worksheet.set_cell(row, col, CellValue::String(String::new())),
                    }
                } else {
                    let value = f64_at(data, 6)?;
                    worksheet.set_cell(row, col, numeric_cell(value, false, globals.is_date_xf(xf)));
                }
            },
            record_type::STRING => {
                if let Some((row, col)) = pending_string.take() {
                    let (value, _) = read_unicode_string(data, 0)?;
                    worksheet.set_cell(row, col, CellValue::String(value));
                }
            },
            _ => {},
        }
    }

    Ok(worksheet)
}

#[inline]
fn cell_header(data: &[u8]) -> XlsResult<(u32, u16, u16)> {
    Ok((u16_at(data, 0)? as u32, u16_at(data, 2)?, u16_at(data, 4)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_rk_integer() {
        let rk = (1234i32 << 2) as u32 | 0x02;
        assert_eq!(decode_rk(rk), (1234.0, true));

        let negative = ((-5i32) << 2) as u32 | 0x02;
        assert_eq!(decode_rk(negative), (-5.0, true));
    }

    #[test]
    fn test_decode_rk_scaled_and_float() {
        let rk = (1234i32 << 2) as u32 | 0x03;
        assert_eq!(decode_rk(rk), (12.34, false));

        let bits = 2.5f64.to_bits();
        let rk = ((bits >> 32) as u32) & 0xFFFF_FFFC;
        assert_eq!(decode_rk(rk), (2.5, false));
    }

    #[test]
    fn test_error_cell_lookup() {
        assert_eq!(error_cell(0x07), CellValue::Error("#DIV/0!".to_string()));
        assert_eq!(error_cell(0x2A), CellValue::Error("#N/A".to_string()));
    }
}
