//! Scoped file output.

use std::fs::{self, File};
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use log::warn;
use tempfile::NamedTempFile;

use crate::common::Result;

/// Buffered output file released on every exit path.
///
/// [`ScopedOutput::finish`] flushes and syncs, reporting failures. If the
/// guard is dropped without finishing (the write failed part way), the
/// buffer is still flushed and the file closed; a failure at that point is
/// logged and the caller's original error stands.
pub(crate) struct ScopedOutput {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl ScopedOutput {
    pub fn create(path: &Path) -> io::Result<Self> {
        Ok(Self {
            path: path.to_path_buf(),
            writer: Some(BufWriter::new(File::create(path)?)),
        })
    }

    pub fn finish(mut self) -> io::Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        Ok(())
    }

    fn inner(&mut self) -> io::Result<&mut BufWriter<File>> {
        self.writer
            .as_mut()
            .ok_or_else(|| io::Error::other("output already released"))
    }
}

impl Write for ScopedOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner()?.flush()
    }
}

impl Seek for ScopedOutput {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner()?.seek(pos)
    }
}

impl Drop for ScopedOutput {
    fn drop(&mut self) {
        if let Some(mut writer) = self.writer.take()
            && let Err(e) = writer.flush()
        {
            warn!("failed to release output {}: {}", self.path.display(), e);
        }
    }
}

/// Create `path` and fill it with `write`, releasing the file whatever happens.
pub(crate) fn write_scoped<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut ScopedOutput) -> Result<()>,
{
    let mut output = ScopedOutput::create(path)?;
    write(&mut output)?;
    output.finish()?;
    Ok(())
}

/// Rewrite `path` with the output of `write`, leaving the existing file
/// untouched unless every byte was written.
///
/// Output is staged in a temporary file next to `path` and renamed over it
/// once flushed and synced. The staged file is removed on failure.
pub(crate) fn write_replacing<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<NamedTempFile>) -> Result<()>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut staged = BufWriter::new(NamedTempFile::new_in(dir)?);
    write(&mut staged)?;
    let staged = staged.into_inner().map_err(io::IntoInnerError::into_error)?;
    staged.as_file().sync_all()?;

    if let Ok(meta) = fs::metadata(path) {
        fs::set_permissions(staged.path(), meta.permissions())?;
    }
    staged.persist(path).map_err(|e| e.error)?;
    Ok(())
}
