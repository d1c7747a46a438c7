//! Open connections to spreadsheet documents.

use std::path::{Path, PathBuf};

use log::debug;

use crate::driver::error::SqlError;
use crate::driver::options::{FIRST_COLUMN, HEAD_LINE, OptionMap};
use crate::driver::output::write_replacing;
use crate::sheet::DocumentHandle;

/// A document opened by the driver.
///
/// Owns the handle for its whole lifetime. `source_file` is set for local
/// documents opened in full or for streaming writes, which are the cases
/// [`Connection::commit`] can write back.
#[derive(Debug)]
pub struct Connection {
    handle: DocumentHandle,
    source_file: Option<PathBuf>,
    options: OptionMap,
}

impl Connection {
    pub(crate) fn new(handle: DocumentHandle, source_file: Option<PathBuf>, options: OptionMap) -> Self {
        Self {
            handle,
            source_file,
            options,
        }
    }

    pub fn handle(&self) -> &DocumentHandle {
        &self.handle
    }

    pub fn handle_mut(&mut self) -> &mut DocumentHandle {
        &mut self.handle
    }

    pub fn source_file(&self) -> Option<&Path> {
        self.source_file.as_deref()
    }

    pub fn options(&self) -> &OptionMap {
        &self.options
    }

    /// 1-based row holding column headers (`headLine`).
    ///
    /// Falls back to 1 when the option is absent or not a positive integer;
    /// the raw value is left in [`Connection::options`].
    pub fn head_line(&self) -> u32 {
        self.options.positive_int(HEAD_LINE).unwrap_or(1)
    }

    /// 1-based first data column (`firstColumn`), 1 unless set to a positive integer.
    pub fn first_column(&self) -> u32 {
        self.options.positive_int(FIRST_COLUMN).unwrap_or(1)
    }

    pub fn is_streaming(&self) -> bool {
        self.handle.is_streaming()
    }

    /// Write the document back to its source file.
    ///
    /// The file is replaced only after the whole document was serialized,
    /// so a failed commit leaves the previous content in place. Does nothing
    /// for remote documents and streaming readers.
    pub fn commit(&mut self) -> Result<(), SqlError> {
        let Some(path) = self.source_file.as_deref() else {
            return Ok(());
        };
        if !self.handle.can_flush() {
            return Ok(());
        }
        debug!("committing {}", path.display());
        let handle = &self.handle;
        write_replacing(path, |out| handle.write_to(out))?;
        self.handle.mark_saved();
        Ok(())
    }

    /// Close the connection, committing unsaved changes first.
    pub fn close(mut self) -> Result<(), SqlError> {
        if self.handle.is_modified() {
            self.commit()?;
        }
        Ok(())
    }
}
