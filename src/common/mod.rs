//! Common types shared across formats.
//!
//! This module provides the unified error type and the container-format
//! detection used by both the OLE2 (legacy) and OOXML (modern) backends.

// Submodule declarations
pub mod error;
pub mod format;

// Re-exports for convenience
pub use error::{Error, Result};
pub use format::{WorkbookFormat, detect_workbook_format, detect_workbook_format_from_bytes};
