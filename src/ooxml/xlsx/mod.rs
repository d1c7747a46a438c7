//! Excel 2007+ (.xlsx) workbooks.
//!
//! A package is written in one pass: the fixed parts first, then one
//! worksheet part per sheet. Cell strings are stored inline so sheets can be
//! produced row by row without a shared string table; the reader accepts
//! both inline and shared strings.

/// Package assembly
mod package;

/// Package reader
mod reader;

/// Worksheet part rows
pub(crate) mod sheet_xml;

/// Byte-level XML scanning helpers
mod xml;

use std::io::{Seek, Write};

use crate::common::Result;
use crate::sheet::Workbook;

pub(crate) use package::write_package;
pub use reader::read_workbook;
pub(crate) use reader::{PackageIndex, read_package_index};

/// Serialize an in-memory workbook as an `.xlsx` package.
pub fn write_workbook<W: Write + Seek>(workbook: &Workbook, writer: W) -> Result<()> {
    let names = workbook.worksheet_names();
    let sheets = workbook.worksheets();
    write_package(writer, &names, |index, out| {
        sheet_xml::write_sheet_start(out)?;
        for (row, cells) in sheets[index].rows() {
            sheet_xml::write_row(out, row, cells)?;
        }
        sheet_xml::write_sheet_end(out)
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::WorkbookFormat;
    use crate::sheet::CellValue;
    use std::io::Cursor;

    #[test]
    fn test_workbook_round_trip() {
        let mut workbook = Workbook::new(WorkbookFormat::Xlsx);
        let sheet = workbook.add_worksheet("Orders & Items").unwrap();
        sheet.append_row(vec!["id".into(), "when".into(), "total".into()]);
        sheet.set_cell(3, 0, CellValue::Int(42));
        sheet.set_cell(3, 1, CellValue::DateTime(45292.0));
        sheet.set_cell(3, 2, CellValue::Float(19.99));
        workbook.add_worksheet("Empty").unwrap();

        let mut bytes = Cursor::new(Vec::new());
        write_workbook(&workbook, &mut bytes).unwrap();
        let reopened = read_workbook(Cursor::new(bytes.into_inner())).unwrap();

        assert_eq!(reopened.format(), WorkbookFormat::Xlsx);
        assert_eq!(reopened.worksheet_names(), vec!["Orders & Items", "Empty"]);
        let sheet = reopened.worksheet("orders & items").unwrap();
        assert_eq!(sheet.cell(0, 1), &CellValue::String("when".into()));
        assert_eq!(sheet.row(1), None);
        assert_eq!(sheet.cell(3, 0), &CellValue::Int(42));
        assert_eq!(sheet.cell(3, 1), &CellValue::DateTime(45292.0));
        assert_eq!(sheet.cell(3, 2), &CellValue::Float(19.99));
        assert_eq!(reopened.worksheet("Empty").unwrap().row_count(), 0);
    }

    #[test]
    fn test_workbook_without_sheets() {
        let workbook = Workbook::new(WorkbookFormat::Xlsx);
        let mut bytes = Cursor::new(Vec::new());
        write_workbook(&workbook, &mut bytes).unwrap();
        let reopened = read_workbook(Cursor::new(bytes.into_inner())).unwrap();
        assert_eq!(reopened.worksheet_count(), 0);
    }
}
