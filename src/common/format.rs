//! Workbook container formats and their detection.
//!
//! Detection is signature based and reads only the first eight bytes of the
//! source, rewinding afterwards so the caller can hand the reader straight to
//! the matching backend.

use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use super::error::{Error, Result};

/// OLE2 compound file signature
const OLE_SIGNATURE: &[u8; 8] = b"\xD0\xCF\x11\xE0\xA1\xB1\x1A\xE1";

/// ZIP local file header signature
const ZIP_SIGNATURE: &[u8; 4] = b"PK\x03\x04";

/// On-disk container format of a workbook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum WorkbookFormat {
    /// Legacy Excel Binary Format (.xls), BIFF8 records in an OLE2 container
    Xls,
    /// Office Open XML Workbook (.xlsx), XML parts in a ZIP container
    Xlsx,
}

impl WorkbookFormat {
    /// Pick the format a new file should be created in from its name.
    ///
    /// Any path whose lower-cased form ends in `x` (`.xlsx`, `.xlsmx`, ...)
    /// selects the zip-based format; everything else falls back to the
    /// legacy binary format.
    pub fn from_path(path: &Path) -> Self {
        let lower = path.to_string_lossy().to_lowercase();
        if lower.ends_with('x') {
            WorkbookFormat::Xlsx
        } else {
            WorkbookFormat::Xls
        }
    }

    /// Canonical file extension without the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            WorkbookFormat::Xls => "xls",
            WorkbookFormat::Xlsx => "xlsx",
        }
    }
}

/// Detect workbook format from the leading signature bytes.
pub fn detect_workbook_format_from_bytes(header: &[u8]) -> Result<WorkbookFormat> {
    if header.len() >= 8 && &header[0..8] == OLE_SIGNATURE {
        return Ok(WorkbookFormat::Xls);
    }
    if header.len() >= 4 && &header[0..4] == ZIP_SIGNATURE {
        return Ok(WorkbookFormat::Xlsx);
    }
    Err(Error::NotOfficeFile)
}

/// Detect workbook format from a seekable reader.
///
/// The reader is positioned back at the start on success.
pub fn detect_workbook_format<R: Read + Seek>(reader: &mut R) -> Result<WorkbookFormat> {
    let mut header = [0u8; 8];
    reader.seek(SeekFrom::Start(0))?;
    let mut filled = 0;
    while filled < header.len() {
        let n = reader.read(&mut header[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    reader.seek(SeekFrom::Start(0))?;
    detect_workbook_format_from_bytes(&header[..filled])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_format_from_path_suffix() {
        assert_eq!(WorkbookFormat::from_path(Path::new("book.xlsx")), WorkbookFormat::Xlsx);
        assert_eq!(WorkbookFormat::from_path(Path::new("BOOK.XLSX")), WorkbookFormat::Xlsx);
        assert_eq!(WorkbookFormat::from_path(Path::new("book.xls")), WorkbookFormat::Xls);
        assert_eq!(WorkbookFormat::from_path(Path::new("book")), WorkbookFormat::Xls);
    }

    #[test]
    fn test_detect_signatures() {
        let mut ole = Cursor::new(OLE_SIGNATURE.to_vec());
        assert_eq!(detect_workbook_format(&mut ole).unwrap(), WorkbookFormat::Xls);

        let mut zip = Cursor::new(b"PK\x03\x04rest".to_vec());
        assert_eq!(detect_workbook_format(&mut zip).unwrap(), WorkbookFormat::Xlsx);
        assert_eq!(zip.position(), 0);
    }

    #[test]
    fn test_detect_rejects_short_or_unknown() {
        assert!(matches!(
            detect_workbook_format_from_bytes(b""),
            Err(Error::NotOfficeFile)
        ));
        assert!(matches!(
            detect_workbook_format_from_bytes(b"plain text"),
            Err(Error::NotOfficeFile)
        ));
    }
}
