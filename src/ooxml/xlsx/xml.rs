//! Byte-level helpers for scanning SpreadsheetML.
//!
//! The parts we read are machine generated and flat, so a memchr-driven
//! scan over raw bytes is enough and avoids building an event stream.

use std::borrow::Cow;

use memchr::memmem;

use crate::common::{Error, Result};

/// Iterate over the start tags named `name`, yielding the bytes between
/// `<name` and the closing `>` (including a trailing `/` for empty tags).
pub(crate) fn start_tags<'a>(xml: &'a [u8], name: &'a [u8]) -> impl Iterator<Item = &'a [u8]> + 'a {
    let mut pos = 0;
    std::iter::from_fn(move || {
        let found = find_tag_open(&xml[pos..], name)?;
        let body_start = pos + found + 1 + name.len();
        let body_len = memchr::memchr(b'>', &xml[body_start..])?;
        pos = body_start + body_len + 1;
        Some(&xml[body_start..body_start + body_len])
    })
}

/// Position of the next `<name` whose name is not merely a prefix of a longer tag.
pub(crate) fn find_tag_open(xml: &[u8], name: &[u8]) -> Option<usize> {
    let mut pos = 0;
    while let Some(lt) = memchr::memchr(b'<', &xml[pos..]) {
        let start = pos + lt;
        let after = start + 1 + name.len();
        if xml.len() >= after && &xml[start + 1..after] == name {
            match xml.get(after) {
                Some(b' ' | b'\t' | b'\r' | b'\n' | b'>' | b'/') => return Some(start),
                None => return None,
                _ => {},
            }
        }
        pos = start + 1;
    }
    None
}

/// Value of attribute `name` inside a start-tag body.
pub(crate) fn attr<'a>(tag: &'a [u8], name: &[u8]) -> Option<&'a [u8]> {
    let mut pos = 0;
    while let Some(found) = memmem::find(&tag[pos..], name) {
        let start = pos + found;
        let eq = start + name.len();
        let preceded_by_space = start > 0 && tag[start - 1].is_ascii_whitespace();
        if preceded_by_space && tag.get(eq) == Some(&b'=') {
            let quote = *tag.get(eq + 1)?;
            if quote == b'"' || quote == b'\'' {
                let value_start = eq + 2;
                let len = memchr::memchr(quote, &tag[value_start..])?;
                return Some(&tag[value_start..value_start + len]);
            }
        }
        pos = start + 1;
    }
    None
}

/// Decode XML entities in a text or attribute value.
pub(crate) fn unescape(raw: &[u8]) -> Result<Cow<'_, str>> {
    let text = std::str::from_utf8(raw).map_err(|e| Error::XmlError(e.to_string()))?;
    Ok(quick_xml::escape::unescape(text)?)
}

/// Concatenate the text of every `<t>` element in `xml`, skipping phonetic runs.
pub(crate) fn collect_text(xml: &[u8]) -> Result<String> {
    let mut out = String::new();
    let mut pos = 0;
    while let Some(found) = find_tag_open(&xml[pos..], b"t") {
        let open = pos + found;
        let Some(close_offset) = memchr::memchr(b'>', &xml[open..]) else {
            break;
        };
        let body_start = open + close_offset + 1;
        if xml[body_start - 2] == b'/' {
            pos = body_start;
            continue;
        }
        let Some(end) = memmem::find(&xml[body_start..], b"</t>") else {
            break;
        };
        if !inside_phonetic_run(&xml[..open]) {
            out.push_str(&unescape(&xml[body_start..body_start + end])?);
        }
        pos = body_start + end + 4;
    }
    Ok(out)
}

fn inside_phonetic_run(prefix: &[u8]) -> bool {
    match (memmem::rfind(prefix, b"<rPh"), memmem::rfind(prefix, b"</rPh>")) {
        (Some(open), Some(close)) => open > close,
        (Some(_), None) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_tags_skip_longer_names() {
        let xml = br#"<sheets><sheet name="A" r:id="rId1"/><sheetPr/><sheet name="B" r:id="rId2"/></sheets>"#;
        let names: Vec<_> = start_tags(xml, b"sheet")
            .filter_map(|tag| attr(tag, b"name"))
            .collect();
        assert_eq!(names, vec![b"A".as_slice(), b"B".as_slice()]);
    }

    #[test]
    fn test_attr_requires_whole_name() {
        let tag = br#" sheetId="3" r:id="rId7" id="x""#;
        assert_eq!(attr(tag, b"id"), Some(b"x".as_slice()));
        assert_eq!(attr(tag, b"r:id"), Some(b"rId7".as_slice()));
        assert_eq!(attr(tag, b"name"), None);
    }

    #[test]
    fn test_collect_text_joins_runs() {
        let xml = br#"<si><r><t>Hello</t></r><r><t xml:space="preserve"> &amp; bye</t></r><rPh sb="0" eb="1"><t>ignored</t></rPh></si>"#;
        assert_eq!(collect_text(xml).unwrap(), "Hello & bye");
    }
}
