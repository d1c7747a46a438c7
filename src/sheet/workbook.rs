//! Unified in-memory workbook.

use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Read, Seek, Write};
use std::path::Path;

use super::types::{Error, Result};
use super::worksheet::{Worksheet, validate_sheet_name};
use crate::common::{WorkbookFormat, detect_workbook_format};

/// A workbook loaded (or created) entirely in memory.
///
/// The workbook remembers the container format it came from so that writing
/// it back produces the same kind of file.
///
/// # Examples
///
/// ```rust
/// use sqlsheet::common::WorkbookFormat;
/// use sqlsheet::sheet::{CellValue, Workbook};
///
/// let mut workbook = Workbook::new(WorkbookFormat::Xlsx);
/// let sheet = workbook.add_worksheet("People")?;
/// sheet.append_row(vec!["name".into(), "age".into()]);
/// sheet.append_row(vec!["Ada".into(), CellValue::Int(36)]);
///
/// let mut bytes = std::io::Cursor::new(Vec::new());
/// workbook.write_to(&mut bytes)?;
///
/// let reopened = sqlsheet::sheet::Workbook::from_bytes(bytes.into_inner())?;
/// assert_eq!(reopened.worksheet_names(), vec!["People"]);
/// # Ok::<(), sqlsheet::common::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Workbook {
    format: WorkbookFormat,
    worksheets: Vec<Worksheet>,
    modified: bool,
}

impl Workbook {
    /// Create an empty workbook (no worksheets) of the given format.
    pub fn new(format: WorkbookFormat) -> Self {
        Self {
            format,
            worksheets: Vec::new(),
            modified: false,
        }
    }

    pub(crate) fn from_parts(format: WorkbookFormat, mut worksheets: Vec<Worksheet>) -> Self {
        for ws in &mut worksheets {
            ws.mark_saved();
        }
        Self {
            format,
            worksheets,
            modified: false,
        }
    }

    /// Open a workbook from a file path. The format is detected from the file signature.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(BufReader::new(file))
    }

    /// Create a workbook from bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        Self::from_reader(Cursor::new(bytes))
    }

    /// Load a workbook from any seekable byte source.
    pub fn from_reader<R: Read + Seek>(mut reader: R) -> Result<Self> {
        match detect_workbook_format(&mut reader)? {
            WorkbookFormat::Xls => Ok(crate::ole::xls::read_workbook(reader)?),
            WorkbookFormat::Xlsx => crate::ooxml::xlsx::read_workbook(reader),
        }
    }

    /// Container format of this workbook.
    pub fn format(&self) -> WorkbookFormat {
        self.format
    }

    /// Get all worksheet names in workbook order.
    pub fn worksheet_names(&self) -> Vec<&str> {
        self.worksheets.iter().map(|ws| ws.name()).collect()
    }

    /// Get the number of worksheets.
    pub fn worksheet_count(&self) -> usize {
        self.worksheets.len()
    }

    /// All worksheets in workbook order.
    pub fn worksheets(&self) -> &[Worksheet] {
        &self.worksheets
    }

    /// Get a worksheet by name (case-insensitive, as Excel compares names).
    pub fn worksheet(&self, name: &str) -> Option<&Worksheet> {
        self.worksheets
            .iter()
            .find(|ws| ws.name().eq_ignore_ascii_case(name))
    }

    /// Get a mutable worksheet by name (case-insensitive).
    pub fn worksheet_mut(&mut self, name: &str) -> Option<&mut Worksheet> {
        self.worksheets
            .iter_mut()
            .find(|ws| ws.name().eq_ignore_ascii_case(name))
    }

    /// Get a worksheet by index.
    pub fn worksheet_by_index(&self, index: usize) -> Option<&Worksheet> {
        self.worksheets.get(index)
    }

    /// Add a new, empty worksheet.
    pub fn add_worksheet(&mut self, name: &str) -> Result<&mut Worksheet> {
        validate_sheet_name(name).map_err(Error::InvalidFormat)?;
        if self.worksheet(name).is_some() {
            return Err(Error::InvalidFormat(format!(
                "Worksheet '{}' already exists",
                name
            )));
        }

        self.worksheets.push(Worksheet::new(name.to_string()));
        self.modified = true;
        let index = self.worksheets.len() - 1;
        Ok(&mut self.worksheets[index])
    }

    /// Remove a worksheet by name, returning it.
    pub fn remove_worksheet(&mut self, name: &str) -> Option<Worksheet> {
        let index = self.worksheet_index(name)?;
        self.modified = true;
        Some(self.worksheets.remove(index))
    }

    /// Check if the workbook changed since it was loaded or last written.
    pub fn is_modified(&self) -> bool {
        self.modified || self.worksheets.iter().any(Worksheet::is_modified)
    }

    /// Serialize the workbook in its own container format.
    pub fn write_to<W: Write + Seek>(&self, writer: &mut W) -> Result<()> {
        match self.format {
            WorkbookFormat::Xls => crate::ole::xls::write_workbook(self, writer)?,
            WorkbookFormat::Xlsx => crate::ooxml::xlsx::write_workbook(self, writer)?,
        }
        Ok(())
    }

    /// Clear the modification flags after a successful write.
    pub fn mark_saved(&mut self) {
        self.modified = false;
        for ws in &mut self.worksheets {
            ws.mark_saved();
        }
    }

    /// Serialize the workbook to a file, replacing any existing content.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        self.write_to(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    pub(crate) fn worksheet_index(&self, name: &str) -> Option<usize> {
        self.worksheets
            .iter()
            .position(|ws| ws.name().eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::CellValue;

    #[test]
    fn test_new_workbook_is_empty() {
        let wb = Workbook::new(WorkbookFormat::Xls);
        assert_eq!(wb.worksheet_count(), 0);
        assert!(!wb.is_modified());
    }

    #[test]
    fn test_add_worksheet_rejects_duplicates() {
        let mut wb = Workbook::new(WorkbookFormat::Xlsx);
        wb.add_worksheet("Data").unwrap();
        assert!(wb.add_worksheet("DATA").is_err());
        assert!(wb.add_worksheet("bad:name").is_err());
        assert!(wb.is_modified());
        assert!(wb.worksheet("data").is_some());
    }

    #[test]
    fn test_mark_saved_clears_sheet_flags() {
        let mut wb = Workbook::new(WorkbookFormat::Xlsx);
        wb.add_worksheet("Data")
            .unwrap()
            .set_cell(0, 0, CellValue::Bool(true));
        wb.mark_saved();
        assert!(!wb.is_modified());
        wb.worksheet_mut("Data")
            .unwrap()
            .set_cell(1, 0, CellValue::Int(1));
        assert!(wb.is_modified());
    }

    #[test]
    fn test_save_and_open_xls() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("numbers.xls");

        let mut wb = Workbook::new(WorkbookFormat::Xls);
        wb.add_worksheet("N").unwrap().append_row(vec![CellValue::Int(7)]);
        wb.save(&path).unwrap();

        let reopened = Workbook::open(&path).unwrap();
        assert_eq!(reopened.format(), WorkbookFormat::Xls);
        assert_eq!(reopened.worksheet("n").unwrap().cell(0, 0), &CellValue::Int(7));
    }

    #[test]
    fn test_from_bytes_rejects_unknown_content() {
        assert!(matches!(
            Workbook::from_bytes(b"not a workbook".to_vec()),
            Err(Error::NotOfficeFile)
        ));
    }
}
