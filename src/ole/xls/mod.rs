//! Legacy Excel (.xls) workbooks
//!
//! BIFF8 (Binary Interchange File Format) records stored in the `Workbook`
//! stream of an OLE2 compound file. The reader understands the cell records
//! Excel and other producers emit for plain data; the writer produces the
//! minimal record set Excel requires for a valid file.

/// Error types for XLS handling
mod error;

/// BIFF record iteration and string decoding
mod records;

/// Workbook reader
mod workbook;

/// Workbook writer
mod writer;

pub use error::{XlsError, XlsResult};
pub use workbook::read_workbook;
pub use writer::write_workbook;

/// BIFF8 record type identifiers used by this module
pub(crate) mod record_type {
    pub const FORMULA: u16 = 0x0006;
    pub const EOF: u16 = 0x000A;
    pub const DATE1904: u16 = 0x0022;
    pub const FILEPASS: u16 = 0x002F;
    pub const FONT: u16 = 0x0031;
    pub const WINDOW1: u16 = 0x003D;
    pub const CODEPAGE: u16 = 0x0042;
    pub const CONTINUE: u16 = 0x003C;
    pub const BOUNDSHEET: u16 = 0x0085;
    pub const MULRK: u16 = 0x00BD;
    pub const XF: u16 = 0x00E0;
    pub const SST: u16 = 0x00FC;
    pub const LABELSST: u16 = 0x00FD;
    pub const DIMENSIONS: u16 = 0x0200;
    pub const NUMBER: u16 = 0x0203;
    pub const LABEL: u16 = 0x0204;
    pub const BOOLERR: u16 = 0x0205;
    pub const STRING: u16 = 0x0207;
    pub const WINDOW2: u16 = 0x023E;
    pub const RK: u16 = 0x027E;
    pub const STYLE: u16 = 0x0293;
    pub const FORMAT: u16 = 0x041E;
    pub const BOF: u16 = 0x0809;
}

/// Stream names Excel uses for the BIFF payload, newest first
pub(crate) const WORKBOOK_STREAM_NAMES: &[&str] = &["Workbook", "Book"];
