/// Constants for OLE file format
pub mod consts;

/// Compound file reader
mod file;

/// Compound file writer
pub mod writer;

/// Legacy Excel workbook (.xls) reader and writer
///
/// BIFF8 records stored in the `Workbook` stream of an OLE2 compound file.
pub mod xls;

// Re-export public types for convenient access
pub use file::{DirectoryEntry, OleError, OleFile, is_ole_file};
pub use writer::OleWriter;
