//! Incremental row reader for `.xlsx` packages.

use std::io::Read;

use zip::ZipArchive;

use crate::common::{Error, Result, WorkbookFormat, detect_workbook_format};
use crate::ooxml::xlsx::sheet_xml::RowScanner;
use crate::ooxml::xlsx::{PackageIndex, read_package_index};
use crate::sheet::{ByteSource, CellValue};

/// Reads worksheet rows one at a time straight from the compressed entry.
///
/// Only the package index (sheet list, shared strings, date styles) is kept
/// in memory; cell data is decoded as the caller iterates.
pub struct StreamingReader {
    archive: ZipArchive<ByteSource>,
    index: PackageIndex,
}

impl std::fmt::Debug for StreamingReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingReader")
            .field("sheets", &self.index.sheets)
            .finish_non_exhaustive()
    }
}

impl StreamingReader {
    /// Open a byte source. Legacy `.xls` content cannot be streamed.
    pub fn open(mut source: ByteSource) -> Result<Self> {
        match detect_workbook_format(&mut source)? {
            WorkbookFormat::Xls => Err(Error::Unsupported(
                "streaming reads of legacy .xls workbooks".to_string(),
            )),
            WorkbookFormat::Xlsx => {
                let mut archive = ZipArchive::new(source)?;
                let index = read_package_index(&mut archive)?;
                Ok(Self { archive, index })
            },
        }
    }

    pub fn worksheet_names(&self) -> Vec<&str> {
        self.index.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    /// Iterate the rows of a sheet (name compared case-insensitively).
    pub fn rows(&mut self, sheet: &str) -> Result<RowStream<'_>> {
        let entry = self
            .index
            .sheets
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(sheet))
            .ok_or_else(|| Error::ComponentNotFound(format!("worksheet '{}'", sheet)))?;
        let part = self.archive.by_name(&entry.part)?;
        let reader: Box<dyn Read + '_> = Box::new(part);
        Ok(RowStream {
            scanner: RowScanner::new(reader, &self.index.context),
        })
    }
}

/// Rows of one worksheet as `(zero-based row index, cells)`.
pub struct RowStream<'a> {
    scanner: RowScanner<'a, Box<dyn Read + 'a>>,
}

impl Iterator for RowStream<'_> {
    type Item = Result<(u32, Vec<CellValue>)>;

    fn next(&mut self) -> Option<Self::Item> {
        self.scanner.next_row().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::Workbook;
    use std::io::Cursor;

    fn xlsx_bytes() -> Vec<u8> {
        let mut workbook = Workbook::new(WorkbookFormat::Xlsx);
        let sheet = workbook.add_worksheet("Items").unwrap();
        for i in 0..50i64 {
            sheet.append_row(vec![CellValue::Int(i), CellValue::Bool(i % 2 == 0)]);
        }
        workbook.add_worksheet("Other").unwrap();
        let mut bytes = Cursor::new(Vec::new());
        workbook.write_to(&mut bytes).unwrap();
        bytes.into_inner()
    }

    #[test]
    fn test_iterates_rows_in_order() {
        let mut reader = StreamingReader::open(ByteSource::from_bytes(xlsx_bytes())).unwrap();
        assert_eq!(reader.worksheet_names(), vec!["Items", "Other"]);

        let rows: Vec<_> = reader.rows("items").unwrap().collect::<Result<_>>().unwrap();
        assert_eq!(rows.len(), 50);
        assert_eq!(rows[49], (49, vec![CellValue::Int(49), CellValue::Bool(false)]));

        assert_eq!(reader.rows("Other").unwrap().count(), 0);
        assert!(matches!(reader.rows("nope"), Err(Error::ComponentNotFound(_))));
    }

    #[test]
    fn test_rejects_legacy_content() {
        let mut workbook = Workbook::new(WorkbookFormat::Xls);
        workbook.add_worksheet("S").unwrap();
        let mut bytes = Cursor::new(Vec::new());
        workbook.write_to(&mut bytes).unwrap();

        let err = StreamingReader::open(ByteSource::from_bytes(bytes.into_inner())).unwrap_err();
        assert!(matches!(err, Error::Unsupported(_)));
    }
}
