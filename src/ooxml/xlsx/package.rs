//! SpreadsheetML package assembly.

use std::io::{Seek, Write};

use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::common::Result;

const CONTENT_TYPES_HEAD: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    "\n",
    r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
    r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
    r#"<Default Extension="xml" ContentType="application/xml"/>"#,
    r#"<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#,
    r#"<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>"#,
);

const ROOT_RELS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    "\n",
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>"#,
    "</Relationships>"
);

/// Style sheet with two cell formats: General (0) and a date-time format (1).
const STYLES: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    "\n",
    r#"<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
    r#"<fonts count="1"><font><sz val="11"/><name val="Calibri"/><family val="2"/></font></fonts>"#,
    r#"<fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills>"#,
    r#"<borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders>"#,
    r#"<cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>"#,
    r#"<cellXfs count="2"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/>"#,
    r#"<xf numFmtId="22" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/></cellXfs>"#,
    r#"<cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles>"#,
    "</styleSheet>"
);

const REL_TYPE_WORKSHEET: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet";
const REL_TYPE_STYLES: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";

fn generate_content_types(sheet_count: usize) -> String {
    let mut xml = String::with_capacity(CONTENT_TYPES_HEAD.len() + sheet_count * 160 + 16);
    xml.push_str(CONTENT_TYPES_HEAD);
    for n in 1..=sheet_count {
        xml.push_str(r#"<Override PartName="/xl/worksheets/sheet"#);
        xml.push_str(itoa::Buffer::new().format(n));
        xml.push_str(
            r#".xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
        );
    }
    xml.push_str("</Types>");
    xml
}

fn generate_workbook_xml(sheet_names: &[&str]) -> String {
    let mut xml = String::with_capacity(512 + sheet_names.len() * 64);
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push('\n');
    xml.push_str(r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" "#);
    xml.push_str(r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#);
    xml.push_str("<sheets>");
    let mut ids = itoa::Buffer::new();
    for (index, name) in sheet_names.iter().enumerate() {
        let id = ids.format(index + 1);
        xml.push_str(r#"<sheet name=""#);
        xml.push_str(&quick_xml::escape::escape(*name));
        xml.push_str(r#"" sheetId=""#);
        xml.push_str(id);
        xml.push_str(r#"" r:id="rId"#);
        xml.push_str(id);
        xml.push_str(r#""/>"#);
    }
    xml.push_str("</sheets></workbook>");
    xml
}

fn generate_workbook_rels(sheet_count: usize) -> String {
    let mut xml = String::with_capacity(256 + sheet_count * 160);
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push('\n');
    xml.push_str(r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#);
    let mut ids = itoa::Buffer::new();
    for n in 1..=sheet_count {
        let id = ids.format(n);
        xml.push_str(r#"<Relationship Id="rId"#);
        xml.push_str(id);
        xml.push_str(r#"" Type=""#);
        xml.push_str(REL_TYPE_WORKSHEET);
        xml.push_str(r#"" Target="worksheets/sheet"#);
        xml.push_str(id);
        xml.push_str(r#".xml"/>"#);
    }
    xml.push_str(r#"<Relationship Id="rId"#);
    xml.push_str(ids.format(sheet_count + 1));
    xml.push_str(r#"" Type=""#);
    xml.push_str(REL_TYPE_STYLES);
    xml.push_str(r#"" Target="styles.xml"/>"#);
    xml.push_str("</Relationships>");
    xml
}

/// Write a complete package. `write_sheet` is called once per sheet, in
/// order, with the zip entry for that sheet's part as its output.
pub(crate) fn write_package<W, F>(writer: W, sheet_names: &[&str], mut write_sheet: F) -> Result<W>
where
    W: Write + Seek,
    F: FnMut(usize, &mut dyn Write) -> Result<()>,
{
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(writer);

    zip.start_file("[Content_Types].xml", options)?;
    zip.write_all(generate_content_types(sheet_names.len()).as_bytes())?;

    zip.start_file("_rels/.rels", options)?;
    zip.write_all(ROOT_RELS.as_bytes())?;

    zip.start_file("xl/workbook.xml", options)?;
    zip.write_all(generate_workbook_xml(sheet_names).as_bytes())?;

    zip.start_file("xl/_rels/workbook.xml.rels", options)?;
    zip.write_all(generate_workbook_rels(sheet_names.len()).as_bytes())?;

    zip.start_file("xl/styles.xml", options)?;
    zip.write_all(STYLES.as_bytes())?;

    for index in 0..sheet_names.len() {
        zip.start_file(format!("xl/worksheets/sheet{}.xml", index + 1), options)?;
        write_sheet(index, &mut zip)?;
    }

    Ok(zip.finish()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workbook_xml_escapes_names() {
        let xml = generate_workbook_xml(&["R&D", "Plan"]);
        assert!(xml.contains(r#"<sheet name="R&amp;D" sheetId="1" r:id="rId1"/>"#));
        assert!(xml.contains(r#"<sheet name="Plan" sheetId="2" r:id="rId2"/>"#));
    }

    #[test]
    fn test_rels_reference_styles_after_sheets() {
        let xml = generate_workbook_rels(2);
        assert!(xml.contains(r#"Id="rId2""#));
        assert!(xml.contains(r#"Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml""#));
    }
}
