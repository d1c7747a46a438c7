//! Driver error types.
//!
//! Each connection stage fails with a [`ConnectError`]; the driver surface
//! wraps it into [`SqlError::ConnectionEstablishment`], keeping the stage
//! error reachable through [`std::error::Error::source`].

use thiserror::Error;

/// Failure of a single connection-establishment stage.
#[derive(Error, Debug)]
pub enum ConnectError {
    /// Scheme mismatch, or the resource part is not an absolute URL
    #[error("invalid url: {message}")]
    InvalidUrl { message: String },

    /// Malformed option token
    #[error("invalid option '{token}': {message}")]
    InvalidOption { token: String, message: String },

    /// I/O or format failure while checking, creating, flushing or opening the document
    #[error("{message}")]
    AcquisitionFailure {
        message: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ConnectError {
    pub fn invalid_url(message: impl Into<String>) -> Self {
        Self::InvalidUrl {
            message: message.into(),
        }
    }

    pub fn invalid_option(token: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidOption {
            token: token.into(),
            message: message.into(),
        }
    }

    /// Wrap a lower-level failure, keeping its message.
    pub fn acquisition(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::AcquisitionFailure {
            message: source.to_string(),
            source: Box::new(source),
        }
    }
}

impl From<crate::common::Error> for ConnectError {
    fn from(err: crate::common::Error) -> Self {
        Self::acquisition(err)
    }
}

impl From<std::io::Error> for ConnectError {
    fn from(err: std::io::Error) -> Self {
        Self::acquisition(err)
    }
}

/// Errors surfaced by the driver and connections.
#[derive(Error, Debug)]
pub enum SqlError {
    /// A connection could not be established
    #[error("{message}")]
    ConnectionEstablishment {
        message: String,
        #[source]
        source: ConnectError,
    },

    /// The operation is not available in this driver
    #[error("feature not supported: {0}")]
    FeatureNotSupported(String),

    /// A driver could not be added to the registry
    #[error("driver registration failed: {message}")]
    Registration { message: String },

    /// No registered driver accepts the url
    #[error("no suitable driver for {url}")]
    NoSuitableDriver { url: String },

    /// Reading or writing the document of an open connection failed
    #[error("document error: {0}")]
    Document(#[from] crate::common::Error),
}

impl SqlError {
    /// Stage error behind a connection failure.
    pub fn connect_error(&self) -> Option<&ConnectError> {
        match self {
            Self::ConnectionEstablishment { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ConnectError> for SqlError {
    fn from(err: ConnectError) -> Self {
        Self::ConnectionEstablishment {
            message: err.to_string(),
            source: err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_establishment_failure_keeps_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "book.xlsx missing");
        let err = SqlError::from(ConnectError::acquisition(io));

        assert_eq!(err.to_string(), "book.xlsx missing");
        let stage = err.connect_error().unwrap();
        assert!(matches!(stage, ConnectError::AcquisitionFailure { .. }));
        let root = err.source().and_then(|s| s.source()).unwrap();
        assert_eq!(root.to_string(), "book.xlsx missing");
    }
}
