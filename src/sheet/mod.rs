//! Spreadsheet documents.
//!
//! A [`Workbook`] holds a whole document in memory and round-trips through
//! both container formats. For documents too large for that, the
//! [`streaming`] module provides an append-only writer with a bounded row
//! window and a forward-only row reader. [`DocumentHandle`] wraps whichever
//! of the three a caller opened.
//!
//! # Example
//!
//! ```rust
//! use sqlsheet::common::WorkbookFormat;
//! use sqlsheet::sheet::{CellValue, DocumentHandle, Workbook};
//!
//! let mut workbook = Workbook::new(WorkbookFormat::Xls);
//! workbook.add_worksheet("Totals")?.set_cell(0, 0, CellValue::Float(1.5));
//!
//! let handle = DocumentHandle::Full(workbook);
//! assert!(handle.readable() && handle.writable());
//! # Ok::<(), sqlsheet::common::Error>(())
//! ```

mod handle;
pub mod number_format;
mod source;
pub mod streaming;
pub mod types;
mod workbook;
mod worksheet;

pub use handle::DocumentHandle;
pub use source::ByteSource;
pub use streaming::{RowStream, StreamingReader, StreamingWorkbook};
pub use types::{CellValue, Error, Result};
pub use workbook::Workbook;
pub use worksheet::{MAX_SHEET_NAME_LEN, Worksheet};
