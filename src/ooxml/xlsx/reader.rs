//! SpreadsheetML package reader.

use std::collections::HashMap;
use std::io::{Read, Seek};

use zip::ZipArchive;
use zip::result::ZipError;

use super::sheet_xml::{CellContext, RowScanner};
use super::xml::{attr, collect_text, start_tags, unescape};
use crate::common::{Error, Result, WorkbookFormat};
use crate::sheet::number_format::{is_builtin_date_format, is_date_format_string};
use crate::sheet::{Workbook, Worksheet};

const DEFAULT_WORKBOOK_PART: &str = "xl/workbook.xml";

/// A worksheet listed in the workbook part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SheetEntry {
    pub name: String,
    /// Zip entry name of the worksheet part
    pub part: String,
}

/// Everything needed to decode worksheet parts without touching the rest of the package.
#[derive(Debug, Default)]
pub(crate) struct PackageIndex {
    pub sheets: Vec<SheetEntry>,
    pub context: CellContext,
}

/// Read a part into memory; `None` when the package does not contain it.
fn read_part<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Option<Vec<u8>>> {
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut data = Vec::with_capacity(entry.size().min(1 << 24) as usize);
    entry.read_to_end(&mut data)?;
    Ok(Some(data))
}

/// Resolve a relationship target against the directory of its source part.
fn resolve_target(source_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut segments: Vec<&str> = match source_part.rfind('/') {
        Some(slash) => source_part[..slash].split('/').collect(),
        None => Vec::new(),
    };
    for segment in target.split('/') {
        match segment {
            "." | "" => {},
            ".." => {
                segments.pop();
            },
            other => segments.push(other),
        }
    }
    segments.join("/")
}

fn rels_part_for(part: &str) -> String {
    match part.rfind('/') {
        Some(slash) => format!("{}/_rels/{}.rels", &part[..slash], &part[slash + 1..]),
        None => format!("_rels/{}.rels", part),
    }
}

/// Relationship id -> (type, resolved target).
fn read_relationships<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    source_part: &str,
) -> Result<HashMap<String, (String, String)>> {
    let mut rels = HashMap::new();
    let Some(xml) = read_part(archive, &rels_part_for(source_part))? else {
        return Ok(rels);
    };
    for tag in start_tags(&xml, b"Relationship") {
        let (Some(id), Some(rel_type), Some(target)) = (attr(tag, b"Id"), attr(tag, b"Type"), attr(tag, b"Target"))
        else {
            continue;
        };
        if attr(tag, b"TargetMode") == Some(b"External".as_slice()) {
            continue;
        }
        let target = unescape(target)?;
        rels.insert(
            String::from_utf8_lossy(id).into_owned(),
            (
                String::from_utf8_lossy(rel_type).into_owned(),
                resolve_target(source_part, &target),
            ),
        );
    }
    Ok(rels)
}

fn find_by_type<'a>(rels: &'a HashMap<String, (String, String)>, suffix: &str) -> Option<&'a str> {
    rels.values()
        .find(|(rel_type, _)| rel_type.ends_with(suffix))
        .map(|(_, target)| target.as_str())
}

fn parse_shared_strings(xml: &[u8]) -> Result<Vec<String>> {
    let mut strings = Vec::new();
    let mut pos = 0;
    while let Some(found) = super::xml::find_tag_open(&xml[pos..], b"si") {
        let open = pos + found;
        let Some(gt) = memchr::memchr(b'>', &xml[open..]) else {
            break;
        };
        let body_start = open + gt + 1;
        if xml[body_start - 2] == b'/' {
            strings.push(String::new());
            pos = body_start;
            continue;
        }
        let Some(end) = memchr::memmem::find(&xml[body_start..], b"</si>") else {
            return Err(Error::XmlError("unterminated <si> element".to_string()));
        };
        strings.push(collect_text(&xml[body_start..body_start + end])?);
        pos = body_start + end + 5;
    }
    Ok(strings)
}

fn parse_date_styles(xml: &[u8]) -> Result<Vec<bool>> {
    let mut custom_formats: HashMap<u32, String> = HashMap::new();
    for tag in start_tags(xml, b"numFmt") {
        if let (Some(id), Some(code)) = (attr(tag, b"numFmtId"), attr(tag, b"formatCode"))
            && let Ok(id) = atoi_simd::parse::<u32>(id)
        {
            custom_formats.insert(id, unescape(code)?.into_owned());
        }
    }

    let Some(start) = memchr::memmem::find(xml, b"<cellXfs") else {
        return Ok(Vec::new());
    };
    let end = memchr::memmem::find(&xml[start..], b"</cellXfs>")
        .map(|e| start + e)
        .unwrap_or(xml.len());

    Ok(start_tags(&xml[start..end], b"xf")
        .map(|tag| {
            let id = attr(tag, b"numFmtId")
                .and_then(|id| atoi_simd::parse::<u32>(id).ok())
                .unwrap_or(0);
            match custom_formats.get(&id) {
                Some(code) => is_date_format_string(code),
                None => u16::try_from(id).map(is_builtin_date_format).unwrap_or(false),
            }
        })
        .collect())
}

/// Locate the workbook part and read sheet list, shared strings and styles.
pub(crate) fn read_package_index<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<PackageIndex> {
    let root_rels = read_relationships(archive, "")?;
    let workbook_part = find_by_type(&root_rels, "/officeDocument")
        .unwrap_or(DEFAULT_WORKBOOK_PART)
        .to_string();

    let workbook_xml = read_part(archive, &workbook_part)?
        .ok_or_else(|| Error::ComponentNotFound(workbook_part.clone()))?;
    let rels = read_relationships(archive, &workbook_part)?;

    let mut sheets = Vec::new();
    for tag in start_tags(&workbook_xml, b"sheet") {
        let (Some(name), Some(rel_id)) = (attr(tag, b"name"), attr(tag, b"r:id")) else {
            continue;
        };
        let rel_id = String::from_utf8_lossy(rel_id);
        match rels.get(rel_id.as_ref()) {
            Some((rel_type, target)) if rel_type.ends_with("/worksheet") => sheets.push(SheetEntry {
                name: unescape(name)?.into_owned(),
                part: target.clone(),
            }),
            // Chart sheets and dialog sheets hold no cell table
            Some(_) => {},
            None => {
                return Err(Error::CorruptedFile(format!(
                    "sheet relationship {} missing from {}",
                    rel_id, workbook_part
                )));
            },
        }
    }

    let mut context = CellContext::default();
    if let Some(part) = find_by_type(&rels, "/sharedStrings").map(str::to_string)
        && let Some(xml) = read_part(archive, &part)?
    {
        context.shared_strings = parse_shared_strings(&xml)?;
    }
    if let Some(part) = find_by_type(&rels, "/styles").map(str::to_string)
        && let Some(xml) = read_part(archive, &part)?
    {
        context.date_styles = parse_date_styles(&xml)?;
    }

    Ok(PackageIndex { sheets, context })
}

/// Read a whole `.xlsx` package into memory.
pub fn read_workbook<R: Read + Seek>(reader: R) -> Result<Workbook> {
    let mut archive = ZipArchive::new(reader)?;
    let index = read_package_index(&mut archive)?;

    let mut worksheets = Vec::with_capacity(index.sheets.len());
    for sheet in &index.sheets {
        let mut worksheet = Worksheet::new(sheet.name.clone());
        let entry = archive.by_name(&sheet.part)?;
        let mut scanner = RowScanner::new(entry, &index.context);
        while let Some((row, cells)) = scanner.next_row()? {
            if !cells.is_empty() {
                worksheet.set_row(row, cells);
            }
        }
        worksheets.push(worksheet);
    }

    Ok(Workbook::from_parts(WorkbookFormat::Xlsx, worksheets))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_target() {
        assert_eq!(resolve_target("xl/workbook.xml", "worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
        assert_eq!(resolve_target("xl/workbook.xml", "/xl/styles.xml"), "xl/styles.xml");
        assert_eq!(resolve_target("xl/workbook.xml", "../docProps/app.xml"), "docProps/app.xml");
        assert_eq!(resolve_target("", "xl/workbook.xml"), "xl/workbook.xml");
    }

    #[test]
    fn test_rels_part_for() {
        assert_eq!(rels_part_for(""), "_rels/.rels");
        assert_eq!(rels_part_for("xl/workbook.xml"), "xl/_rels/workbook.xml.rels");
    }

    #[test]
    fn test_parse_shared_strings() {
        let xml = br#"<sst count="3" uniqueCount="3"><si><t>plain</t></si><si/><si><r><t>ri</t></r><r><t>ch</t></r></si></sst>"#;
        assert_eq!(parse_shared_strings(xml).unwrap(), vec!["plain", "", "rich"]);
    }

    #[test]
    fn test_parse_date_styles() {
        let xml = br#"<styleSheet><numFmts count="2"><numFmt numFmtId="164" formatCode="yyyy\-mm\-dd"/><numFmt numFmtId="165" formatCode="0.00%"/></numFmts>
<cellStyleXfs count="1"><xf numFmtId="14"/></cellStyleXfs>
<cellXfs count="4"><xf numFmtId="0"/><xf numFmtId="164"/><xf numFmtId="165"/><xf numFmtId="22"/></cellXfs></styleSheet>"#;
        assert_eq!(parse_date_styles(xml).unwrap(), vec![false, true, false, true]);
    }
}
