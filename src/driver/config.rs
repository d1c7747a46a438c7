//! Driver configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::common::{Error, Result};
use crate::sheet::streaming::DEFAULT_BATCH_SIZE;

/// Connection string prefix the driver answers to.
pub const DEFAULT_SCHEME: &str = "jdbc:xls:";

/// Tunables for a [`Driver`](super::Driver).
///
/// Every field has a default, so a YAML document only needs to name the
/// values it changes:
///
/// ```yaml
/// stream_batch_size: 500
/// compress_temp_files: true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Connection string prefix, matched case-insensitively
    pub scheme: String,
    /// Rows kept in memory per sheet by streaming writers
    pub stream_batch_size: usize,
    /// Deflate rows spilled to temporary files by streaming writers
    pub compress_temp_files: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            scheme: DEFAULT_SCHEME.to_string(),
            stream_batch_size: DEFAULT_BATCH_SIZE,
            compress_temp_files: false,
        }
    }
}

impl DriverConfig {
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    pub fn with_stream_batch_size(mut self, size: usize) -> Self {
        self.stream_batch_size = size;
        self
    }

    pub fn with_compress_temp_files(mut self, compress: bool) -> Self {
        self.compress_temp_files = compress;
        self
    }

    /// Parse a configuration from YAML text.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_saphyr::from_str(yaml)
            .map_err(|e| Error::ParseError(format!("invalid driver configuration: {e}")))
    }

    /// Load a configuration from a YAML file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }
}
