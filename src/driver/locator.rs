//! Connection string parsing.
//!
//! Grammar: `<scheme><absolute url>[?option(&option)*]`, where the scheme
//! token is matched case-insensitively.

use std::fmt;
use std::path::PathBuf;

use url::Url;

use super::error::ConnectError;
use super::options::{OptionMap, parse_query};

/// How a document is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    LocalFile,
    Remote,
}

/// Absolute URL of the document named by a connection string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceLocator {
    url: Url,
}

impl ResourceLocator {
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn transport(&self) -> Transport {
        if self.url.scheme() == "file" {
            Transport::LocalFile
        } else {
            Transport::Remote
        }
    }

    /// Filesystem path of a `file` URL.
    pub fn source_file(&self) -> Result<PathBuf, ConnectError> {
        self.url
            .to_file_path()
            .map_err(|_| ConnectError::invalid_url(format!("{} does not name a local file", self.url)))
    }
}

impl fmt::Display for ResourceLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}

fn starts_with_ignore_case(raw: &str, scheme: &str) -> bool {
    raw.as_bytes()
        .get(..scheme.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme.as_bytes()))
}

/// Acceptance predicate: the trimmed string starts with `scheme`.
pub fn accepts(scheme: &str, raw: &str) -> bool {
    starts_with_ignore_case(raw.trim(), scheme)
}

/// Split a connection string into its locator and options.
///
/// Options from the string are laid over `overlay`; on duplicate keys the
/// string wins, and within the string the last occurrence wins.
pub fn parse(scheme: &str, raw: &str, overlay: &OptionMap) -> Result<(ResourceLocator, OptionMap), ConnectError> {
    if !starts_with_ignore_case(raw, scheme) {
        return Err(ConnectError::invalid_url(format!("url is not {} ({})", scheme, raw)));
    }

    let (head, query) = match raw.split_once('?') {
        Some((head, query)) => (head, Some(query)),
        None => (raw, None),
    };

    let mut options = overlay.clone();
    if let Some(query) = query {
        options.extend(parse_query(query)?);
    }

    let candidate = &head[scheme.len()..];
    let url = Url::parse(candidate).map_err(|e| ConnectError::invalid_url(format!("{}: {}", candidate, e)))?;

    Ok((ResourceLocator { url }, options))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::options::{FIRST_COLUMN, HEAD_LINE, TRUE};

    const SCHEME: &str = "jdbc:xls:";

    #[test]
    fn test_accepts_ignores_case_and_whitespace() {
        assert!(accepts(SCHEME, "jdbc:xls:file:///tmp/a.xls"));
        assert!(accepts(SCHEME, "  JDBC:XLS:file:///tmp/a.xls"));
        assert!(!accepts(SCHEME, "jdbc:csv:file:///tmp/a.csv"));
        assert!(!accepts(SCHEME, "jdbc:xl"));
        assert!(!accepts(SCHEME, ""));
    }

    #[test]
    fn test_untrimmed_string_fails_parse() {
        let err = parse(SCHEME, " jdbc:xls:file:///tmp/a.xls", &OptionMap::new()).unwrap_err();
        assert!(matches!(err, ConnectError::InvalidUrl { .. }));
    }

    #[test]
    fn test_parse_local_file_with_options() {
        let (locator, options) =
            parse(SCHEME, "Jdbc:Xls:file:///tmp/data/book.xlsx?headLine=2&firstColumn", &OptionMap::new()).unwrap();
        assert_eq!(locator.transport(), Transport::LocalFile);
        assert_eq!(locator.url().path(), "/tmp/data/book.xlsx");
        assert_eq!(options.get(HEAD_LINE), Some("2"));
        assert_eq!(options.get(FIRST_COLUMN), Some(TRUE));
    }

    #[test]
    fn test_string_options_override_overlay() {
        let overlay = OptionMap::new().with("a", "0").with("b", "kept");
        let (_, options) = parse(SCHEME, "jdbc:xls:http://example.com/x.xls?a=1&a=2", &overlay).unwrap();
        assert_eq!(options.get("a"), Some("2"));
        assert_eq!(options.get("b"), Some("kept"));
        assert_eq!(options.len(), 2);
    }

    #[test]
    fn test_remote_transport() {
        let (locator, _) = parse(SCHEME, "jdbc:xls:https://example.com/q.xlsx", &OptionMap::new()).unwrap();
        assert_eq!(locator.transport(), Transport::Remote);
        assert!(locator.source_file().is_err());
    }

    #[test]
    fn test_relative_locator_is_invalid() {
        let err = parse(SCHEME, "jdbc:xls:book.xls", &OptionMap::new()).unwrap_err();
        assert!(matches!(err, ConnectError::InvalidUrl { .. }));
    }

    #[test]
    fn test_option_errors_take_precedence() {
        let err = parse(SCHEME, "jdbc:xls:not a url?x=1=2", &OptionMap::new()).unwrap_err();
        assert!(matches!(err, ConnectError::InvalidOption { .. }));
    }
}
