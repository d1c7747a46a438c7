//! Connection options.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::error::ConnectError;

/// Value recorded for an option given without `=`.
pub const TRUE: &str = "true";

/// Force streaming-read acquisition
pub const READ_STREAMING: &str = "readStreaming";
/// Force streaming-write acquisition (local files only)
pub const WRITE_STREAMING: &str = "writeStreaming";
/// 1-based row holding column headers, passed to the statement layer
pub const HEAD_LINE: &str = "headLine";
/// 1-based first data column, passed to the statement layer
pub const FIRST_COLUMN: &str = "firstColumn";

/// Option key/value pairs of a connection request.
///
/// Keys are case-sensitive. Inserting an existing key replaces its value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptionMap(BTreeMap<String, String>);

impl OptionMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// A flag is set only when its value is exactly [`TRUE`].
    pub fn is_set(&self, key: &str) -> bool {
        self.get(key) == Some(TRUE)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Read an option as a 1-based positive integer.
    ///
    /// `None` when the key is absent or its value is not a positive integer;
    /// the raw value stays available through [`OptionMap::get`].
    pub fn positive_int(&self, key: &str) -> Option<u32> {
        self.get(key)
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .filter(|value| *value >= 1)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for OptionMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for OptionMap {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

/// Check that every `%` starts a two-digit hex escape.
fn validate_escapes(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    let mut i = 0;
    while let Some(offset) = memchr::memchr(b'%', &bytes[i..]) {
        let pos = i + offset;
        match bytes.get(pos + 1..pos + 3) {
            Some([hi, lo]) if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit() => i = pos + 3,
            _ => return false,
        }
    }
    true
}

/// Form-style percent decoding: `+` is a space, `%XX` a UTF-8 byte.
fn decode_component(raw: &str, token: &str) -> Result<String, ConnectError> {
    if !validate_escapes(raw) {
        return Err(ConnectError::invalid_option(token, "malformed percent escape"));
    }
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .map_err(|_| ConnectError::invalid_option(token, "percent escapes do not decode to UTF-8"))
}

/// Parse the text after `?` into ordered key/value pairs.
///
/// Empty tokens are skipped. A token without `=` becomes a flag with value
/// [`TRUE`]; a token with more than one `=` is rejected. Trailing `=` is
/// never dropped: `key=` keeps an empty value instead of becoming a flag,
/// and `a=1=` is rejected rather than read as `a=1`.
pub fn parse_query(query: &str) -> Result<Vec<(String, String)>, ConnectError> {
    let mut pairs = Vec::new();
    for token in query.split('&') {
        if token.is_empty() {
            continue;
        }
        let mut parts = token.split('=');
        let key = parts.next().unwrap_or_default();
        match (parts.next(), parts.next()) {
            (None, _) => pairs.push((decode_component(key, token)?, TRUE.to_string())),
            (Some(value), None) => pairs.push((decode_component(key, token)?, decode_component(value, token)?)),
            (Some(_), Some(_)) => {
                return Err(ConnectError::invalid_option(token, "more than one '='"));
            },
        }
    }
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query_flags_and_values() {
        let pairs = parse_query("headLine=2&firstColumn").unwrap();
        assert_eq!(
            pairs,
            vec![
                ("headLine".to_string(), "2".to_string()),
                ("firstColumn".to_string(), TRUE.to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_query_decodes_and_skips_empty_tokens() {
        let pairs = parse_query("a%20b=c+d&&e=%E2%9C%93&").unwrap();
        assert_eq!(
            pairs,
            vec![
                ("a b".to_string(), "c d".to_string()),
                ("e".to_string(), "✓".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_query_rejects_malformed_tokens() {
        assert!(matches!(
            parse_query("a=1=2"),
            Err(ConnectError::InvalidOption { token, .. }) if token == "a=1=2"
        ));
        assert!(matches!(parse_query("a=%zz"), Err(ConnectError::InvalidOption { .. })));
        assert!(matches!(parse_query("a=%4"), Err(ConnectError::InvalidOption { .. })));
        assert!(matches!(parse_query("a=%FF"), Err(ConnectError::InvalidOption { .. })));
    }

    #[test]
    fn test_empty_value_is_not_a_flag() {
        let map: OptionMap = parse_query("readStreaming=").unwrap().into_iter().collect();
        assert_eq!(map.get(READ_STREAMING), Some(""));
        assert!(!map.is_set(READ_STREAMING));
    }

    #[test]
    fn test_is_set_requires_exact_sentinel() {
        let map = OptionMap::new()
            .with(READ_STREAMING, "TRUE")
            .with(WRITE_STREAMING, TRUE);
        assert!(!map.is_set(READ_STREAMING));
        assert!(map.is_set(WRITE_STREAMING));
        assert!(!map.is_set(HEAD_LINE));
    }

    #[test]
    fn test_positive_int() {
        let map = OptionMap::new()
            .with(HEAD_LINE, "3")
            .with(FIRST_COLUMN, "0")
            .with("flag", TRUE);
        assert_eq!(map.positive_int(HEAD_LINE), Some(3));
        assert_eq!(map.positive_int(FIRST_COLUMN), None);
        assert_eq!(map.positive_int("flag"), None);
        assert_eq!(map.positive_int("missing"), None);
        assert_eq!(map.get(FIRST_COLUMN), Some("0"));
    }
}
