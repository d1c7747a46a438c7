//! Office Open XML spreadsheet packages.
//!
//! Only the SpreadsheetML subset needed to carry plain cell data is
//! implemented: workbook, worksheets, shared strings and the number-format
//! part of the style sheet.

pub mod xlsx;
