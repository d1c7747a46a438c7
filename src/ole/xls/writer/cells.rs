//! Cell record writers.

use std::io::Write;

use super::{SharedStrings, XF_DATE, XF_DEFAULT, write_record};
use crate::ole::xls::record_type;
use crate::ole::xls::{XlsError, XlsResult};
use crate::sheet::CellValue;
use crate::sheet::types::ERROR_CODES;

/// Integers in this range fit the 30-bit RK encoding
const RK_MIN: i64 = -(1 << 29);
const RK_MAX: i64 = (1 << 29) - 1;

/// Write the record for a single cell. Empty cells produce nothing.
pub(super) fn write_cell<W: Write>(
    writer: &mut W,
    row: u32,
    col: u16,
    value: &CellValue,
    strings: &mut SharedStrings,
) -> XlsResult<()> {
    // BIFF8 stores row as a 16-bit index (0..65535)
    let row = u16::try_from(row).map_err(|_| {
        XlsError::InvalidData(format!("Row index {} exceeds BIFF8 limit 65535", row))
    })?;

    let mut data = Vec::with_capacity(14);
    data.extend_from_slice(&row.to_le_bytes());
    data.extend_from_slice(&col.to_le_bytes());

    match value {
        CellValue::Empty => return Ok(()),
        CellValue::Int(v) if (RK_MIN..=RK_MAX).contains(v) => {
            data.extend_from_slice(&XF_DEFAULT.to_le_bytes());
            let rk = ((*v as i32) << 2) as u32 | 0x02;
            data.extend_from_slice(&rk.to_le_bytes());
            write_record(writer, record_type::RK, &data)
        },
        CellValue::Int(v) => {
            data.extend_from_slice(&XF_DEFAULT.to_le_bytes());
            data.extend_from_slice(&(*v as f64).to_le_bytes());
            write_record(writer, record_type::NUMBER, &data)
        },
        CellValue::Float(v) => {
            data.extend_from_slice(&XF_DEFAULT.to_le_bytes());
            data.extend_from_slice(&v.to_le_bytes());
            write_record(writer, record_type::NUMBER, &data)
        },
        CellValue::DateTime(v) => {
            data.extend_from_slice(&XF_DATE.to_le_bytes());
            data.extend_from_slice(&v.to_le_bytes());
            write_record(writer, record_type::NUMBER, &data)
        },
        CellValue::String(s) => {
            data.extend_from_slice(&XF_DEFAULT.to_le_bytes());
            data.extend_from_slice(&strings.intern(s).to_le_bytes());
            write_record(writer, record_type::LABELSST, &data)
        },
        CellValue::Bool(b) => {
            data.extend_from_slice(&XF_DEFAULT.to_le_bytes());
            data.extend_from_slice(&[*b as u8, 0x00]);
            write_record(writer, record_type::BOOLERR, &data)
        },
        CellValue::Error(literal) => {
            let code = ERROR_CODES
                .iter()
                .find(|(s, _)| s == literal)
                .map(|(_, c)| *c)
                .unwrap_or(0x2A);
            data.extend_from_slice(&XF_DEFAULT.to_le_bytes());
            data.extend_from_slice(&[code, 0x01]);
            write_record(writer, record_type::BOOLERR, &data)
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_int_uses_rk() {
        let mut out = Vec::new();
        let mut sst = SharedStrings::default();
        write_cell(&mut out, 2, 1, &CellValue::Int(-7), &mut sst).unwrap();
        assert_eq!(u16::from_le_bytes([out[0], out[1]]), record_type::RK);
        let rk = u32::from_le_bytes([out[10], out[11], out[12], out[13]]);
        assert_eq!((rk as i32) >> 2, -7);
    }

    #[test]
    fn test_empty_cell_writes_nothing() {
        let mut out = Vec::new();
        let mut sst = SharedStrings::default();
        write_cell(&mut out, 0, 0, &CellValue::Empty, &mut sst).unwrap();
        assert!(out.is_empty());
    }
}
