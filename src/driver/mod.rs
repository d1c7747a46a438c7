//! Connection-string driver for spreadsheet documents.
//!
//! A connection request moves through a fixed pipeline:
//!
//! 1. [`locator::parse`] splits `jdbc:xls:<url>[?options]` into a
//!    [`ResourceLocator`] and an [`OptionMap`]
//! 2. [`Strategy::select`] picks how to acquire the document
//! 3. local files are created when missing ([`materialize`])
//! 4. the [`ResourceOpener`] supplies the bytes and the document library
//!    builds a [`DocumentHandle`]
//! 5. the handle, source file and options become a [`Connection`]
//!
//! The first failing stage aborts the request with a [`ConnectError`],
//! surfaced as [`SqlError::ConnectionEstablishment`].
//!
//! # Example
//!
//! ```no_run
//! use sqlsheet::driver::{Driver, OptionMap};
//!
//! let driver = Driver::new();
//! let conn = driver
//!     .connect("jdbc:xls:file:///data/report.xlsx?headLine=2", &OptionMap::new())?
//!     .expect("url is accepted");
//! assert_eq!(conn.head_line(), 2);
//! # Ok::<(), sqlsheet::driver::SqlError>(())
//! ```

pub mod config;
pub mod error;
pub mod locator;
pub mod materialize;
pub mod opener;
pub mod options;
pub(crate) mod output;
pub mod registry;
pub mod strategy;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, trace};

pub use config::DriverConfig;
pub use error::{ConnectError, SqlError};
pub use locator::{ResourceLocator, Transport};
pub use opener::{DefaultOpener, ResourceOpener};
pub use options::OptionMap;
use options::WRITE_STREAMING;
pub use registry::{register, register_driver};
pub use strategy::Strategy;

use crate::connection::Connection;
use crate::sheet::{DocumentHandle, StreamingReader, StreamingWorkbook, Workbook};

/// Description of a connection property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyInfo {
    pub name: String,
    pub value: Option<String>,
    pub description: Option<String>,
    pub required: bool,
    pub choices: Vec<String>,
}

/// Opens spreadsheet documents named by `jdbc:xls:` connection strings.
#[derive(Clone)]
pub struct Driver {
    config: DriverConfig,
    opener: Arc<dyn ResourceOpener>,
}

impl fmt::Debug for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Driver")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for Driver {
    fn default() -> Self {
        Self::new()
    }
}

impl Driver {
    /// Driver with the default configuration and opener.
    pub fn new() -> Self {
        Self {
            config: DriverConfig::default(),
            opener: Arc::new(DefaultOpener),
        }
    }

    pub fn with_config(mut self, config: DriverConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace how resource bytes are fetched.
    pub fn with_opener(mut self, opener: Arc<dyn ResourceOpener>) -> Self {
        self.opener = opener;
        self
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Whether `url` is addressed to this driver. Never fails.
    pub fn accepts_url(&self, url: &str) -> bool {
        locator::accepts(&self.config.scheme, url)
    }

    /// The driver takes no declared properties.
    pub fn property_info(&self, _url: &str, _info: &OptionMap) -> Vec<PropertyInfo> {
        Vec::new()
    }

    pub fn major_version(&self) -> u32 {
        1
    }

    pub fn minor_version(&self) -> u32 {
        0
    }

    pub fn jdbc_compliant(&self) -> bool {
        false
    }

    /// Name of the logging target the driver reports under.
    ///
    /// Not supported: records go through the `log` facade instead.
    pub fn parent_logger(&self) -> Result<&'static str, SqlError> {
        Err(SqlError::FeatureNotSupported("parent logger".to_string()))
    }

    /// Open the document named by `url`.
    ///
    /// Returns `Ok(None)` when the string is not addressed to this driver.
    /// `info` supplies default options; options in the string override it.
    pub fn connect(&self, url: &str, info: &OptionMap) -> Result<Option<Connection>, SqlError> {
        if !self.accepts_url(url) {
            return Ok(None);
        }
        trace!("received connection request for {url}");
        match self.establish(url, info) {
            Ok(connection) => Ok(Some(connection)),
            Err(e) => {
                debug!("connection to {url} failed: {e}");
                Err(e.into())
            },
        }
    }

    fn establish(&self, url: &str, info: &OptionMap) -> Result<Connection, ConnectError> {
        let (locator, options) = locator::parse(&self.config.scheme, url, info)?;
        trace!("parsed {locator} with {} option(s)", options.len());

        let strategy = Strategy::select(locator.transport(), &options);
        debug!("acquiring {locator} with {strategy:?}");
        if strategy == Strategy::RemoteDirectOpen && options.is_set(WRITE_STREAMING) {
            debug!("{WRITE_STREAMING} ignored for remote resource {locator}");
        }

        let source_file = self.materialize(strategy, &locator)?;

        let source = self.opener.open(locator.url())?;
        let handle = match strategy {
            Strategy::StreamRead => DocumentHandle::StreamingRead(StreamingReader::open(source)?),
            Strategy::StreamWrite => DocumentHandle::StreamingWrite(StreamingWorkbook::new(
                Workbook::from_reader(source)?,
                self.config.stream_batch_size,
                self.config.compress_temp_files,
            )?),
            Strategy::InMemoryOpenOrCreate | Strategy::RemoteDirectOpen => {
                DocumentHandle::Full(Workbook::from_reader(source)?)
            },
        };
        trace!("opened {locator} as {:?}", handle.format());

        let connection = Connection::new(handle, source_file, options);
        debug!("connected to {locator}");
        Ok(connection)
    }

    /// Create the local file when the strategy calls for it.
    fn materialize(&self, strategy: Strategy, locator: &ResourceLocator) -> Result<Option<PathBuf>, ConnectError> {
        if !strategy.materializes() {
            return Ok(None);
        }
        let path = locator.source_file()?;
        let status = match strategy {
            Strategy::StreamWrite => materialize::prepare_stream_write(&path)?,
            _ => materialize::prepare_open_or_create(&path)?,
        };
        trace!("materialized {} ({status:?})", path.display());
        Ok(Some(path))
    }
}
