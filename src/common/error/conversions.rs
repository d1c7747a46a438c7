//! Error conversion implementations.
//!
//! This module contains From trait implementations to convert from internal
//! error types to the unified Error type.

use super::types::Error;

impl From<crate::ole::OleError> for Error {
    fn from(err: crate::ole::OleError) -> Self {
        match err {
            crate::ole::OleError::Io(e) => Error::Io(e),
            crate::ole::OleError::InvalidFormat(s) => Error::InvalidFormat(s),
            crate::ole::OleError::NotOleFile => Error::NotOfficeFile,
            crate::ole::OleError::CorruptedFile(s) => Error::CorruptedFile(s),
            crate::ole::OleError::StreamNotFound(s) => Error::ComponentNotFound(s),
            crate::ole::OleError::TooLarge(size) => {
                Error::Unsupported(format!("compound file stream of {} bytes", size))
            },
        }
    }
}

impl From<crate::ole::xls::XlsError> for Error {
    fn from(err: crate::ole::xls::XlsError) -> Self {
        match err {
            crate::ole::xls::XlsError::Io(e) => Error::Io(e),
            crate::ole::xls::XlsError::Ole(ole_err) => Error::from(ole_err),
            crate::ole::xls::XlsError::InvalidRecord {
                record_type,
                message,
            } => Error::CorruptedFile(format!("record 0x{:04X}: {}", record_type, message)),
            crate::ole::xls::XlsError::UnsupportedBiffVersion(v) => {
                Error::Unsupported(format!("BIFF version 0x{:04X}", v))
            },
            crate::ole::xls::XlsError::InvalidData(s) => Error::InvalidFormat(s),
        }
    }
}

impl From<quick_xml::escape::EscapeError> for Error {
    fn from(err: quick_xml::escape::EscapeError) -> Self {
        Error::XmlError(err.to_string())
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(e) => Error::Io(e),
            zip::result::ZipError::FileNotFound => {
                Error::ComponentNotFound("ZIP entry not found".to_string())
            },
            other => Error::ZipError(other.to_string()),
        }
    }
}
