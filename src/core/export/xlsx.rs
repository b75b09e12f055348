//! Minimal xlsx reader/writer.
//!
//! An .xlsx file is a ZIP archive of XML parts. We write one worksheet of
//! inline strings and can read back both inline and shared strings, so a
//! log that was opened and re-saved in a spreadsheet program still loads.

use std::io::{Cursor, Read, Seek, Write};
use zip::write::SimpleFileOptions;

const SHEET_PATH: &str = "xl/worksheets/sheet1.xml";
const SHARED_STRINGS_PATH: &str = "xl/sharedStrings.xml";

/// Serialize a header row plus data rows into xlsx bytes
pub fn workbook_bytes(header: &[&str], rows: &[Vec<String>]) -> zip::result::ZipResult<Vec<u8>> {
    let mut buf = Vec::new();
    write_workbook(header, rows, Cursor::new(&mut buf))?;
    Ok(buf)
}

/// Write a single-sheet workbook
pub fn write_workbook<W: Write + Seek>(
    header: &[&str],
    rows: &[Vec<String>],
    writer: W,
) -> zip::result::ZipResult<()> {
    let mut zip = zip::ZipWriter::new(writer);
    let options = SimpleFileOptions::default();

    zip.start_file("[Content_Types].xml", options)?;
    zip.write_all(CONTENT_TYPES_XML.as_bytes())?;

    zip.start_file("_rels/.rels", options)?;
    zip.write_all(RELS_XML.as_bytes())?;

    zip.start_file("xl/workbook.xml", options)?;
    zip.write_all(WORKBOOK_XML.as_bytes())?;

    zip.start_file("xl/_rels/workbook.xml.rels", options)?;
    zip.write_all(WORKBOOK_RELS_XML.as_bytes())?;

    zip.start_file(SHEET_PATH, options)?;
    zip.write_all(sheet_xml(header, rows).as_bytes())?;

    zip.finish()?;
    Ok(())
}

/// Read every row of the first worksheet as strings
pub fn read_rows<R: Read + Seek>(reader: R) -> zip::result::ZipResult<Vec<Vec<String>>> {
    let mut archive = zip::ZipArchive::new(reader)?;

    let shared_strings = match archive.by_name(SHARED_STRINGS_PATH) {
        Ok(mut entry) => {
            let mut xml = String::new();
            entry.read_to_string(&mut xml)?;
            parse_shared_strings(&xml)
        }
        Err(_) => Vec::new(),
    };

    let mut xml = String::new();
    archive.by_name(SHEET_PATH)?.read_to_string(&mut xml)?;

    Ok(parse_sheet(&xml, &shared_strings))
}

fn sheet_xml(header: &[&str], rows: &[Vec<String>]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    );

    let header_row: Vec<String> = header.iter().map(|h| h.to_string()).collect();
    for (r, row) in std::iter::once(&header_row).chain(rows.iter()).enumerate() {
        let row_number = r + 1;
        xml.push_str(&format!(r#"<row r="{}">"#, row_number));
        for (c, value) in row.iter().enumerate() {
            xml.push_str(&format!(
                r#"<c r="{}{}" t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
                column_name(c),
                row_number,
                escape_xml(value)
            ));
        }
        xml.push_str("</row>");
    }

    xml.push_str("</sheetData></worksheet>");
    xml
}

/// 0 -> A, 25 -> Z, 26 -> AA
fn column_name(mut index: usize) -> String {
    let mut name = Vec::new();
    loop {
        name.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    name.reverse();
    String::from_utf8(name).unwrap_or_default()
}

/// Column index from a cell reference like `C12`
fn column_index(cell_ref: &str) -> Option<usize> {
    let letters: String = cell_ref
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();
    if letters.is_empty() {
        return None;
    }
    Some(
        letters
            .to_ascii_uppercase()
            .bytes()
            .fold(0usize, |acc, b| acc * 26 + (b - b'A' + 1) as usize)
            - 1,
    )
}

fn attribute<'a>(tag: &'a str, name: &str) -> Option<&'a str> {
    let needle = format!("{}=\"", name);
    let start = tag.find(&needle)? + needle.len();
    let len = tag[start..].find('"')?;
    Some(&tag[start..start + len])
}

/// Tags of an XML document with the text that follows each one
fn tags(xml: &str) -> impl Iterator<Item = (&str, &str)> {
    xml.split('<').skip(1).filter_map(|chunk| {
        let end = chunk.find('>')?;
        Some((chunk[..end].trim(), &chunk[end + 1..]))
    })
}

fn parse_shared_strings(xml: &str) -> Vec<String> {
    let mut strings: Vec<String> = Vec::new();
    for (tag, text) in tags(xml) {
        if tag == "si" || tag.starts_with("si ") {
            strings.push(String::new());
        } else if tag == "t" || tag.starts_with("t ") {
            if let Some(current) = strings.last_mut() {
                current.push_str(&unescape_xml(text));
            }
        }
    }
    strings
}

fn parse_sheet(xml: &str, shared_strings: &[String]) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut shared = false;

    for (tag, text) in tags(xml) {
        if tag == "row" || tag.starts_with("row ") {
            row = Vec::new();
            if tag.ends_with('/') {
                rows.push(Vec::new());
            }
        } else if tag == "/row" {
            rows.push(std::mem::take(&mut row));
        } else if tag == "c" || tag.starts_with("c ") {
            shared = attribute(tag, "t") == Some("s");
            let column = attribute(tag, "r")
                .and_then(column_index)
                .unwrap_or(row.len());
            while row.len() <= column {
                row.push(String::new());
            }
        } else if tag == "v" || tag == "t" || tag.starts_with("t ") {
            let value = if tag == "v" && shared {
                text.trim()
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| shared_strings.get(i).cloned())
                    .unwrap_or_default()
            } else {
                unescape_xml(text)
            };
            if let Some(cell) = row.last_mut() {
                cell.push_str(&value);
            }
        }
    }

    rows
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn unescape_xml(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="xml" ContentType="application/xml"/>
  <Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
  <Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
</Types>"#;

const RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#;

const WORKBOOK_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <sheets><sheet name="Photos" sheetId="1" r:id="rId1"/></sheets>
</workbook>"#;

const WORKBOOK_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
</Relationships>"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_names() {
        assert_eq!(column_name(0), "A");
        assert_eq!(column_name(4), "E");
        assert_eq!(column_name(25), "Z");
        assert_eq!(column_name(26), "AA");
        assert_eq!(column_index("E7"), Some(4));
        assert_eq!(column_index("AA1"), Some(26));
    }

    #[test]
    fn written_rows_read_back_with_escaping() {
        let rows = vec![vec![
            "2024-01-15 14:30:00".to_string(),
            "R&D".to_string(),
            "O'Brien <Jr>".to_string(),
            "".to_string(),
            "/p/R&D/O'Brien.jpg".to_string(),
        ]];
        let bytes = workbook_bytes(&["A", "B", "C", "D", "E"], &rows).unwrap();

        let read = read_rows(Cursor::new(bytes)).unwrap();
        assert_eq!(read.len(), 2);
        assert_eq!(read[0], ["A", "B", "C", "D", "E"]);
        assert_eq!(read[1], rows[0]);
    }

    #[test]
    fn reads_shared_strings_and_sparse_cells() {
        let shared = r#"<sst><si><t>Timestamp</t></si><si><r><t>Jo</t></r><r><t>hn</t></r></si></sst>"#;
        let sheet = r#"<worksheet><sheetData>
            <row r="1"><c r="A1" t="s"><v>0</v></c></row>
            <row r="2"><c r="C2" t="s"><v>1</v></c></row>
        </sheetData></worksheet>"#;

        let rows = parse_sheet(sheet, &parse_shared_strings(shared));
        assert_eq!(rows[0], ["Timestamp"]);
        assert_eq!(rows[1], ["", "", "John"]);
    }

    #[test]
    fn rejects_non_zip_input() {
        assert!(read_rows(Cursor::new(b"not a workbook".to_vec())).is_err());
    }
}
