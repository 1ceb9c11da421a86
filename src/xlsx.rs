//! Minimal XLSX workbook writer: a zip archive of the handful of XML parts
//! a spreadsheet reader requires, with every cell stored as an inline
//! string. Only what the attendance report needs.

use std::io::{Cursor, Write};

use anyhow::Context;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Hard limit imposed by the xlsx format.
pub const MAX_SHEET_NAME_LEN: usize = 31;

pub struct Sheet {
    name: String,
    rows: Vec<Vec<String>>,
}

#[derive(Default)]
pub struct Workbook {
    sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new() -> Workbook {
        Workbook::default()
    }

    pub fn add_sheet(&mut self, name: impl Into<String>, rows: Vec<Vec<String>>) {
        self.sheets.push(Sheet {
            name: sanitize_sheet_name(&name.into()),
            rows,
        });
    }

    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    /// Serialize the workbook into xlsx bytes.
    pub fn finish(self) -> anyhow::Result<Vec<u8>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

        let mut entry = |name: &str, body: String| -> anyhow::Result<()> {
            zip.start_file(name, opts)
                .with_context(|| format!("failed to start workbook entry {}", name))?;
            zip.write_all(body.as_bytes())
                .with_context(|| format!("failed to write workbook entry {}", name))?;
            Ok(())
        };

        entry("[Content_Types].xml", content_types(self.sheets.len()))?;
        entry("_rels/.rels", ROOT_RELS.to_string())?;
        entry("xl/workbook.xml", workbook_xml(&self.sheets))?;
        entry("xl/_rels/workbook.xml.rels", workbook_rels(self.sheets.len()))?;
        entry("xl/styles.xml", STYLES_XML.to_string())?;
        for (i, sheet) in self.sheets.iter().enumerate() {
            entry(&format!("xl/worksheets/sheet{}.xml", i + 1), sheet_xml(sheet))?;
        }

        let cursor = zip.finish().context("failed to finalize workbook")?;
        Ok(cursor.into_inner())
    }
}

/// Replace characters the format forbids and clamp to the 31-char limit.
pub fn sanitize_sheet_name(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| match c {
            '\\' | '/' | '?' | '*' | '[' | ']' | ':' => '_',
            other => other,
        })
        .collect();
    cleaned.chars().take(MAX_SHEET_NAME_LEN).collect()
}

fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}

fn content_types(sheet_count: usize) -> String {
    let mut out = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
         <Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\
         <Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>\
         <Default Extension=\"xml\" ContentType=\"application/xml\"/>\
         <Override PartName=\"/xl/workbook.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml\"/>\
         <Override PartName=\"/xl/styles.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml\"/>",
    );
    for i in 1..=sheet_count {
        out.push_str(&format!(
            "<Override PartName=\"/xl/worksheets/sheet{}.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml\"/>",
            i
        ));
    }
    out.push_str("</Types>");
    out
}

const ROOT_RELS: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
    <Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
    <Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument\" Target=\"xl/workbook.xml\"/>\
    </Relationships>";

const STYLES_XML: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
    <styleSheet xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\">\
    <fonts count=\"1\"><font><sz val=\"11\"/><name val=\"Calibri\"/></font></fonts>\
    <fills count=\"1\"><fill><patternFill patternType=\"none\"/></fill></fills>\
    <borders count=\"1\"><border/></borders>\
    <cellStyleXfs count=\"1\"><xf/></cellStyleXfs>\
    <cellXfs count=\"1\"><xf/></cellXfs>\
    </styleSheet>";

fn workbook_xml(sheets: &[Sheet]) -> String {
    let mut out = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
         <workbook xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\" \
         xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\"><sheets>",
    );
    for (i, sheet) in sheets.iter().enumerate() {
        out.push_str(&format!(
            "<sheet name=\"{}\" sheetId=\"{}\" r:id=\"rId{}\"/>",
            xml_escape(&sheet.name),
            i + 1,
            i + 1
        ));
    }
    out.push_str("</sheets></workbook>");
    out
}

fn workbook_rels(sheet_count: usize) -> String {
    let mut out = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
         <Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">",
    );
    for i in 1..=sheet_count {
        out.push_str(&format!(
            "<Relationship Id=\"rId{}\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet\" Target=\"worksheets/sheet{}.xml\"/>",
            i, i
        ));
    }
    out.push_str(&format!(
        "<Relationship Id=\"rId{}\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles\" Target=\"styles.xml\"/>",
        sheet_count + 1
    ));
    out.push_str("</Relationships>");
    out
}

fn sheet_xml(sheet: &Sheet) -> String {
    let mut out = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
         <worksheet xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\"><sheetData>",
    );
    for row in &sheet.rows {
        out.push_str("<row>");
        for cell in row {
            out.push_str("<c t=\"inlineStr\"><is><t>");
            out.push_str(&xml_escape(cell));
            out.push_str("</t></is></c>");
        }
        out.push_str("</row>");
    }
    out.push_str("</sheetData></worksheet>");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use zip::ZipArchive;

    #[test]
    fn sheet_names_are_sanitized_and_clamped() {
        assert_eq!(sanitize_sheet_name("Date_2025_01_10"), "Date_2025_01_10");
        assert_eq!(sanitize_sheet_name("a/b:c"), "a_b_c");
        let long = "x".repeat(40);
        assert_eq!(sanitize_sheet_name(&long).len(), MAX_SHEET_NAME_LEN);
    }

    #[test]
    fn workbook_contains_one_part_per_sheet() {
        let mut wb = Workbook::new();
        wb.add_sheet("Master", vec![vec!["Date".to_string(), "ID".to_string()]]);
        wb.add_sheet(
            "Date_2025_01_10",
            vec![vec!["2025-01-10".to_string(), "S1".to_string()]],
        );
        let bytes = wb.finish().expect("finish workbook");

        let mut archive =
            ZipArchive::new(std::io::Cursor::new(bytes)).expect("workbook is a zip");
        let names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).expect("entry").name().to_string())
            .collect();
        assert!(names.contains(&"xl/workbook.xml".to_string()));
        assert!(names.contains(&"xl/worksheets/sheet1.xml".to_string()));
        assert!(names.contains(&"xl/worksheets/sheet2.xml".to_string()));
        assert!(!names.contains(&"xl/worksheets/sheet3.xml".to_string()));

        let mut workbook_xml = String::new();
        archive
            .by_name("xl/workbook.xml")
            .expect("workbook part")
            .read_to_string(&mut workbook_xml)
            .expect("read workbook part");
        assert!(workbook_xml.contains("name=\"Date_2025_01_10\""));
    }

    #[test]
    fn cell_text_is_escaped() {
        let mut wb = Workbook::new();
        wb.add_sheet("Master", vec![vec!["a<b&c".to_string()]]);
        let bytes = wb.finish().expect("finish workbook");
        let mut archive =
            ZipArchive::new(std::io::Cursor::new(bytes)).expect("workbook is a zip");
        let mut sheet = String::new();
        archive
            .by_name("xl/worksheets/sheet1.xml")
            .expect("sheet part")
            .read_to_string(&mut sheet)
            .expect("read sheet part");
        assert!(sheet.contains("a&lt;b&amp;c"));
    }
}
