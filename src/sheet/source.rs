//! Seekable byte sources for workbook readers.

use std::fs::File;
use std::io::{self, BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::Path;

use bytes::Bytes;

/// Bytes of a workbook, either on disk or already in memory.
///
/// Remote documents arrive as a downloaded body; local documents are read
/// through a buffered file handle so large files are not loaded eagerly.
#[derive(Debug)]
pub enum ByteSource {
    File(BufReader<File>),
    Memory(Cursor<Bytes>),
}

impl ByteSource {
    /// Open a file for reading.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        Ok(Self::File(BufReader::new(File::open(path)?)))
    }

    /// Wrap an in-memory buffer.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self::Memory(Cursor::new(bytes.into()))
    }

    /// Total length in bytes.
    pub fn len(&self) -> io::Result<u64> {
        match self {
            Self::File(reader) => Ok(reader.get_ref().metadata()?.len()),
            Self::Memory(cursor) => Ok(cursor.get_ref().len() as u64),
        }
    }

    pub fn is_empty(&self) -> io::Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl Read for ByteSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::File(reader) => reader.read(buf),
            Self::Memory(cursor) => cursor.read(buf),
        }
    }
}

impl Seek for ByteSource {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match self {
            Self::File(reader) => reader.seek(pos),
            Self::Memory(cursor) => cursor.seek(pos),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_memory_source_reads_and_seeks() {
        let mut source = ByteSource::from_bytes(b"abcdef".to_vec());
        assert_eq!(source.len().unwrap(), 6);
        source.seek(SeekFrom::Start(4)).unwrap();
        let mut rest = String::new();
        source.read_to_string(&mut rest).unwrap();
        assert_eq!(rest, "ef");
    }

    #[test]
    fn test_file_source_length() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"12345").unwrap();
        let source = ByteSource::open(file.path()).unwrap();
        assert_eq!(source.len().unwrap(), 5);
        assert!(!source.is_empty().unwrap());
    }
}
