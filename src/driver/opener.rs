//! Byte sources for resource locators.

use url::Url;

use crate::common::{Error, Result};
use crate::sheet::ByteSource;

/// Turns a resource locator into readable document bytes.
///
/// The driver calls this once per connection, after any local
/// materialization. Hosts plug in their own implementation to serve
/// transports the default opener does not handle.
pub trait ResourceOpener: Send + Sync {
    fn open(&self, url: &Url) -> Result<ByteSource>;
}

/// Reads `file` URLs from disk; `http`/`https` with the `remote` feature.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultOpener;

impl ResourceOpener for DefaultOpener {
    fn open(&self, url: &Url) -> Result<ByteSource> {
        match url.scheme() {
            "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|_| Error::InvalidFormat(format!("not a local file url: {url}")))?;
                Ok(ByteSource::open(path)?)
            },
            #[cfg(feature = "remote")]
            "http" | "https" => fetch(url),
            other => Err(Error::Unsupported(format!("cannot open '{other}' resources"))),
        }
    }
}

#[cfg(feature = "remote")]
fn fetch(url: &Url) -> Result<ByteSource> {
    log::debug!("fetching {url}");
    let response = reqwest::blocking::get(url.as_str())
        .and_then(|response| response.error_for_status())
        .map_err(|e| Error::Other(format!("failed to fetch {url}: {e}")))?;
    let bytes = response
        .bytes()
        .map_err(|e| Error::Other(format!("failed to read {url}: {e}")))?;
    Ok(ByteSource::from_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn test_open_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        std::fs::write(&path, b"PK\x03\x04").unwrap();

        let url = Url::from_file_path(&path).unwrap();
        let mut source = DefaultOpener.open(&url).unwrap();
        let mut buf = Vec::new();
        source.read_to_end(&mut buf).unwrap();
        assert_eq!(buf, b"PK\x03\x04");
    }

    #[test]
    fn test_missing_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let url = Url::from_file_path(dir.path().join("absent.xlsx")).unwrap();
        assert!(matches!(DefaultOpener.open(&url), Err(Error::Io(_))));
    }

    #[test]
    fn test_unknown_scheme() {
        let url = Url::parse("ftp://example.com/book.xls").unwrap();
        assert!(matches!(DefaultOpener.open(&url), Err(Error::Unsupported(_))));
    }
}
