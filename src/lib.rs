//! Sqlsheet - spreadsheet documents as a relational data source
//!
//! This library opens spreadsheet files named by `jdbc:xls:` connection
//! strings and hands the downstream statement layer a ready document
//! handle. It carries its own document library for both Excel formats.
//!
//! # Features
//!
//! - **Connection strings**: `jdbc:xls:<absolute url>[?option(&option)*]`
//!   with `readStreaming`, `writeStreaming`, `headLine` and `firstColumn`
//! - **Create on open**: missing or empty local files become an empty
//!   `.xlsx` or `.xls` document picked by file name
//! - **Streaming**: bounded-memory row writer and forward-only row reader
//!   for `.xlsx`
//! - **Legacy format**: BIFF8 workbooks in OLE2 compound files
//! - **Remote documents**: `http`/`https` locators with the `remote` feature
//!
//! # Example - Opening a local workbook
//!
//! ```no_run
//! use sqlsheet::{Driver, OptionMap};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let driver = Driver::new();
//! let mut conn = driver
//!     .connect("jdbc:xls:file:///data/sales.xls", &OptionMap::new())?
//!     .ok_or("not an xls url")?;
//!
//! if let Some(workbook) = conn.handle_mut().as_workbook_mut() {
//!     for name in workbook.worksheet_names() {
//!         println!("Sheet: {}", name);
//!     }
//! }
//! conn.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Example - Registry lookup
//!
//! ```no_run
//! use sqlsheet::{OptionMap, driver::registry};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! registry::register()?;
//! let conn = registry::connect(
//!     "jdbc:xls:file:///data/export.xlsx?writeStreaming",
//!     &OptionMap::new(),
//! )?;
//! assert!(conn.is_streaming());
//! # Ok(())
//! # }
//! ```

/// Shared error type and container format detection
pub mod common;

/// Open documents handed to the statement layer
pub mod connection;

/// Connection-string parsing, strategy selection and document acquisition
pub mod driver;

/// OLE2 compound files and the legacy `.xls` format
pub mod ole;

/// Office Open XML packages (`.xlsx`)
pub mod ooxml;

/// Workbook model, streaming access and document handles
pub mod sheet;

// Re-export commonly used types for convenience
pub use common::{Error, Result, WorkbookFormat};
pub use connection::Connection;
pub use driver::{ConnectError, Driver, DriverConfig, OptionMap, SqlError};
pub use sheet::{CellValue, DocumentHandle, Workbook};
