//! Bounded-memory workbook writer.
//!
//! Rows appended to a sheet are kept in a window of at most `batch_size`
//! rows. Older rows are rendered to worksheet XML and spilled to an
//! anonymous temporary file, optionally gzip-compressed. Each spill writes a
//! complete gzip member, so the file reads back as one stream with a
//! multi-member decoder. When the package is written the rows loaded from
//! the original document, the spilled rows and the window are concatenated.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Seek, SeekFrom, Write};

use flate2::Compression;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use log::trace;

use crate::common::{Error, Result, WorkbookFormat};
use crate::ooxml::xlsx::{sheet_xml, write_package};
use crate::sheet::{CellValue, Workbook};

/// Default number of rows kept in memory per sheet
pub const DEFAULT_BATCH_SIZE: usize = 1000;

#[derive(Debug)]
struct SpillFile {
    file: File,
    compressed: bool,
}

impl SpillFile {
    fn new(compressed: bool) -> Result<Self> {
        Ok(Self {
            file: tempfile::tempfile()?,
            compressed,
        })
    }

    fn append(&mut self, rows: &[(u32, Vec<CellValue>)]) -> Result<()> {
        self.file.seek(SeekFrom::End(0))?;
        let mut out = BufWriter::new(&mut self.file);
        if self.compressed {
            let mut encoder = GzEncoder::new(&mut out, Compression::fast());
            for (row, cells) in rows {
                sheet_xml::write_row(&mut encoder, *row, cells)?;
            }
            encoder.finish()?;
        } else {
            for (row, cells) in rows {
                sheet_xml::write_row(&mut out, *row, cells)?;
            }
        }
        out.flush()?;
        Ok(())
    }

    fn copy_to(&self, out: &mut dyn Write) -> Result<()> {
        let mut file = &self.file;
        file.seek(SeekFrom::Start(0))?;
        let mut reader = BufReader::new(file);
        if self.compressed {
            io::copy(&mut MultiGzDecoder::new(reader), out)?;
        } else {
            io::copy(&mut reader, out)?;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct SheetStream {
    window: BTreeMap<u32, Vec<CellValue>>,
    spill: Option<SpillFile>,
    flushed_rows: usize,
    last_flushed: Option<u32>,
}

impl SheetStream {
    fn last_row(&self) -> Option<u32> {
        self.window.keys().next_back().copied().or(self.last_flushed)
    }
}

/// Streaming wrapper around an `.xlsx` workbook.
///
/// Rows already present in the wrapped workbook stay where they are; new
/// rows can only be added below them.
#[derive(Debug)]
pub struct StreamingWorkbook {
    base: Workbook,
    sheets: Vec<SheetStream>,
    batch_size: usize,
    compress_temp_files: bool,
    modified: bool,
}

impl StreamingWorkbook {
    /// Wrap a fully loaded workbook.
    pub fn new(base: Workbook, batch_size: usize, compress_temp_files: bool) -> Result<Self> {
        if base.format() != WorkbookFormat::Xlsx {
            return Err(Error::Unsupported(
                "streaming writes require an .xlsx workbook".to_string(),
            ));
        }
        if batch_size == 0 {
            return Err(Error::InvalidFormat("stream batch size must be positive".to_string()));
        }
        let sheets = (0..base.worksheet_count()).map(|_| SheetStream::default()).collect();
        Ok(Self {
            base,
            sheets,
            batch_size,
            compress_temp_files,
            modified: false,
        })
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn compress_temp_files(&self) -> bool {
        self.compress_temp_files
    }

    /// The wrapped workbook, holding the rows loaded from the original document.
    pub fn base(&self) -> &Workbook {
        &self.base
    }

    pub fn worksheet_names(&self) -> Vec<&str> {
        self.base.worksheet_names()
    }

    /// Add an empty sheet and return its index.
    pub fn create_sheet(&mut self, name: &str) -> Result<usize> {
        self.base.add_worksheet(name)?;
        self.sheets.push(SheetStream::default());
        self.modified = true;
        Ok(self.sheets.len() - 1)
    }

    fn sheet_index(&self, name: &str) -> Result<usize> {
        self.base
            .worksheet_index(name)
            .ok_or_else(|| Error::ComponentNotFound(format!("worksheet '{}'", name)))
    }

    /// Lowest row index that may still be written in a sheet.
    fn next_writable_row(&self, index: usize) -> u32 {
        let base_last = self.base.worksheets()[index].last_row_index();
        let flushed_last = self.sheets[index].last_flushed;
        match base_last.max(flushed_last) {
            Some(last) => last + 1,
            None => 0,
        }
    }

    /// Append a row after the last row of the sheet; returns its index.
    pub fn append_row(&mut self, sheet: &str, cells: Vec<CellValue>) -> Result<u32> {
        let index = self.sheet_index(sheet)?;
        let next = match self.sheets[index].last_row() {
            Some(last) => (last + 1).max(self.next_writable_row(index)),
            None => self.next_writable_row(index),
        };
        self.insert_row(index, next, cells)?;
        Ok(next)
    }

    /// Write a row at an explicit index. Rows at or above the last loaded or
    /// flushed row can no longer be written.
    pub fn write_row(&mut self, sheet: &str, row: u32, cells: Vec<CellValue>) -> Result<()> {
        let index = self.sheet_index(sheet)?;
        let min = self.next_writable_row(index);
        if row < min {
            return Err(Error::InvalidFormat(format!(
                "row {} of '{}' is already written; rows below {} are read-only",
                row, sheet, min
            )));
        }
        self.insert_row(index, row, cells)
    }

    fn insert_row(&mut self, index: usize, row: u32, cells: Vec<CellValue>) -> Result<()> {
        if row >= sheet_xml::MAX_ROWS {
            return Err(Error::InvalidFormat(format!(
                "Row index {} exceeds the worksheet limit of {} rows",
                row,
                sheet_xml::MAX_ROWS
            )));
        }
        self.sheets[index].window.insert(row, cells);
        self.modified = true;

        let excess = self.sheets[index].window.len().saturating_sub(self.batch_size);
        if excess > 0 {
            self.flush_oldest(index, excess)?;
        }
        Ok(())
    }

    /// Row content if it is still addressable: loaded rows and rows in the window.
    pub fn row(&self, sheet: &str, row: u32) -> Option<&[CellValue]> {
        let index = self.base.worksheet_index(sheet)?;
        self.sheets[index]
            .window
            .get(&row)
            .map(Vec::as_slice)
            .or_else(|| self.base.worksheets()[index].row(row))
    }

    /// Spill all but the `keep` most recent window rows of a sheet.
    pub fn flush_rows(&mut self, sheet: &str, keep: usize) -> Result<()> {
        let index = self.sheet_index(sheet)?;
        let count = self.sheets[index].window.len().saturating_sub(keep);
        if count > 0 {
            self.flush_oldest(index, count)?;
        }
        Ok(())
    }

    /// Number of rows of a sheet that live only in its temporary file.
    pub fn flushed_row_count(&self, sheet: &str) -> Option<usize> {
        let index = self.base.worksheet_index(sheet)?;
        Some(self.sheets[index].flushed_rows)
    }

    fn flush_oldest(&mut self, index: usize, count: usize) -> Result<()> {
        let compressed = self.compress_temp_files;
        let stream = &mut self.sheets[index];

        let mut rows = Vec::with_capacity(count);
        for _ in 0..count {
            match stream.window.pop_first() {
                Some(entry) => rows.push(entry),
                None => break,
            }
        }
        let Some((last, _)) = rows.last() else {
            return Ok(());
        };
        let last = *last;

        if stream.spill.is_none() {
            stream.spill = Some(SpillFile::new(compressed)?);
        }
        if let Some(spill) = stream.spill.as_mut() {
            spill.append(&rows)?;
        }
        stream.flushed_rows += rows.len();
        stream.last_flushed = Some(last);
        trace!("spilled {} rows of sheet {} up to row {}", rows.len(), index, last);
        Ok(())
    }

    pub fn is_modified(&self) -> bool {
        self.modified || self.base.is_modified()
    }

    pub fn mark_saved(&mut self) {
        self.modified = false;
        self.base.mark_saved();
    }

    /// Write the merged package.
    pub fn write_to<W: Write + Seek>(&self, writer: W) -> Result<()> {
        let names = self.base.worksheet_names();
        write_package(writer, &names, |index, out| {
            sheet_xml::write_sheet_start(out)?;
            for (row, cells) in self.base.worksheets()[index].rows() {
                sheet_xml::write_row(out, row, cells)?;
            }
            let stream = &self.sheets[index];
            if let Some(spill) = &stream.spill {
                spill.copy_to(out)?;
            }
            for (row, cells) in &stream.window {
                sheet_xml::write_row(out, *row, cells)?;
            }
            sheet_xml::write_sheet_end(out)
        })?;
        Ok(())
    }
}
