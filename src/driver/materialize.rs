//! Create-if-absent handling for local documents.

use std::fs;
use std::io;
use std::path::Path;

use log::{debug, warn};

use super::error::ConnectError;
use super::output::write_scoped;
use crate::common::WorkbookFormat;
use crate::sheet::Workbook;

/// What is on disk at a document path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Absent,
    Empty,
    Present,
}

impl FileStatus {
    pub fn probe(path: &Path) -> io::Result<Self> {
        match fs::metadata(path) {
            Ok(meta) if meta.len() == 0 => Ok(Self::Empty),
            Ok(_) => Ok(Self::Present),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::Absent),
            Err(e) => Err(e),
        }
    }

    /// Absent and empty files both get a fresh document.
    pub fn needs_creation(self) -> bool {
        !matches!(self, Self::Present)
    }
}

fn create_empty(path: &Path, format: WorkbookFormat) -> Result<(), ConnectError> {
    debug!("creating empty {:?} document at {}", format, path.display());
    let workbook = Workbook::new(format);
    write_scoped(path, |out| workbook.write_to(out))?;
    Ok(())
}

/// Prepare a file for in-memory open: create an empty document of the
/// suffix-selected format when the file is absent or empty.
pub fn prepare_open_or_create(path: &Path) -> Result<FileStatus, ConnectError> {
    let status = FileStatus::probe(path)?;
    if status.needs_creation() {
        create_empty(path, WorkbookFormat::from_path(path))?;
    }
    Ok(status)
}

/// Prepare a file for streaming writes: create an empty `.xlsx` document
/// when absent or empty, warn when existing content will be loaded first.
pub fn prepare_stream_write(path: &Path) -> Result<FileStatus, ConnectError> {
    let status = FileStatus::probe(path)?;
    if status.needs_creation() {
        create_empty(path, WorkbookFormat::Xlsx)?;
    } else {
        warn!(
            "File {} is not empty, and will be parsed to memory before streaming writes",
            path.display()
        );
    }
    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::detect_workbook_format_from_bytes;

    #[test]
    fn test_probe_tri_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f");
        assert_eq!(FileStatus::probe(&path).unwrap(), FileStatus::Absent);
        fs::write(&path, b"").unwrap();
        assert_eq!(FileStatus::probe(&path).unwrap(), FileStatus::Empty);
        fs::write(&path, b"x").unwrap();
        assert_eq!(FileStatus::probe(&path).unwrap(), FileStatus::Present);
    }

    #[test]
    fn test_open_or_create_uses_suffix() {
        let dir = tempfile::tempdir().unwrap();
        for (name, expected) in [("a.xlsx", WorkbookFormat::Xlsx), ("a.xls", WorkbookFormat::Xls)] {
            let path = dir.path().join(name);
            fs::write(&path, b"").unwrap();
            assert_eq!(prepare_open_or_create(&path).unwrap(), FileStatus::Empty);
            let bytes = fs::read(&path).unwrap();
            assert_eq!(detect_workbook_format_from_bytes(&bytes).unwrap(), expected);
        }
    }

    #[test]
    fn test_existing_content_is_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keep.xls");
        fs::write(&path, b"opaque").unwrap();
        assert_eq!(prepare_open_or_create(&path).unwrap(), FileStatus::Present);
        assert_eq!(prepare_stream_write(&path).unwrap(), FileStatus::Present);
        assert_eq!(fs::read(&path).unwrap(), b"opaque");
    }

    #[test]
    fn test_stream_write_always_creates_xlsx() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("legacy.xls");
        assert_eq!(prepare_stream_write(&path).unwrap(), FileStatus::Absent);
        let bytes = fs::read(&path).unwrap();
        assert_eq!(detect_workbook_format_from_bytes(&bytes).unwrap(), WorkbookFormat::Xlsx);
    }
}
