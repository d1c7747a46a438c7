//! Document handles with capability queries.

use std::io::{Seek, Write};

use super::streaming::{StreamingReader, StreamingWorkbook};
use super::workbook::Workbook;
use crate::common::{Error, Result, WorkbookFormat};

/// An opened document in one of its access modes.
#[derive(Debug)]
pub enum DocumentHandle {
    /// Entire document in memory, read and write
    Full(Workbook),
    /// Append-only writer with a bounded row window
    StreamingWrite(StreamingWorkbook),
    /// Forward-only row reader
    StreamingRead(StreamingReader),
}

impl DocumentHandle {
    /// Whether cell data can be read through this handle.
    pub fn readable(&self) -> bool {
        matches!(self, Self::Full(_) | Self::StreamingRead(_))
    }

    /// Whether cell data can be written through this handle.
    pub fn writable(&self) -> bool {
        matches!(self, Self::Full(_) | Self::StreamingWrite(_))
    }

    /// Whether the handle can serialize itself back to a file.
    pub fn can_flush(&self) -> bool {
        self.writable()
    }

    pub fn is_streaming(&self) -> bool {
        !matches!(self, Self::Full(_))
    }

    /// Container format written by [`DocumentHandle::write_to`]. Streaming
    /// handles only ever deal with `.xlsx`.
    pub fn format(&self) -> WorkbookFormat {
        match self {
            Self::Full(workbook) => workbook.format(),
            Self::StreamingWrite(_) | Self::StreamingRead(_) => WorkbookFormat::Xlsx,
        }
    }

    pub fn is_modified(&self) -> bool {
        match self {
            Self::Full(workbook) => workbook.is_modified(),
            Self::StreamingWrite(streaming) => streaming.is_modified(),
            Self::StreamingRead(_) => false,
        }
    }

    /// Serialize a writable handle.
    pub fn write_to<W: Write + Seek>(&self, writer: &mut W) -> Result<()> {
        match self {
            Self::Full(workbook) => workbook.write_to(writer),
            Self::StreamingWrite(streaming) => streaming.write_to(writer),
            Self::StreamingRead(_) => Err(Error::Unsupported(
                "writing through a streaming-read handle".to_string(),
            )),
        }
    }

    pub fn mark_saved(&mut self) {
        match self {
            Self::Full(workbook) => workbook.mark_saved(),
            Self::StreamingWrite(streaming) => streaming.mark_saved(),
            Self::StreamingRead(_) => {},
        }
    }

    pub fn as_workbook(&self) -> Option<&Workbook> {
        match self {
            Self::Full(workbook) => Some(workbook),
            _ => None,
        }
    }

    pub fn as_workbook_mut(&mut self) -> Option<&mut Workbook> {
        match self {
            Self::Full(workbook) => Some(workbook),
            _ => None,
        }
    }

    pub fn as_streaming_writer(&self) -> Option<&StreamingWorkbook> {
        match self {
            Self::StreamingWrite(streaming) => Some(streaming),
            _ => None,
        }
    }

    pub fn as_streaming_writer_mut(&mut self) -> Option<&mut StreamingWorkbook> {
        match self {
            Self::StreamingWrite(streaming) => Some(streaming),
            _ => None,
        }
    }

    pub fn as_streaming_reader_mut(&mut self) -> Option<&mut StreamingReader> {
        match self {
            Self::StreamingRead(reader) => Some(reader),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::streaming::DEFAULT_BATCH_SIZE;

    #[test]
    fn test_capabilities() {
        let full = DocumentHandle::Full(Workbook::new(WorkbookFormat::Xls));
        assert!(full.readable() && full.writable() && full.can_flush());
        assert!(!full.is_streaming());
        assert_eq!(full.format(), WorkbookFormat::Xls);

        let streaming = StreamingWorkbook::new(Workbook::new(WorkbookFormat::Xlsx), DEFAULT_BATCH_SIZE, false).unwrap();
        let write = DocumentHandle::StreamingWrite(streaming);
        assert!(!write.readable() && write.writable());
        assert!(write.is_streaming());
        assert_eq!(write.as_streaming_writer().map(|s| s.batch_size()), Some(1000));
    }
}
