//! Office document conversion for the preview panel
//!
//! Word documents (DOCX) are turned into a small HTML fragment and Excel
//! workbooks (XLSX) into a grid of display strings taken from the first sheet.

use std::io::{Cursor, Read};

use calamine::{Data, Reader, Xlsx, open_workbook_from_rs};
use quick_xml::Reader as XmlReader;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use thiserror::Error;

use crate::ui::escape_html;

/// Errors raised while converting a document
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("invalid archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("invalid document XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid workbook: {0}")]
    Workbook(#[from] calamine::XlsxError),

    #[error("workbook has no sheets")]
    NoSheets,
}

const DOCUMENT_PART: &str = "word/document.xml";

/// Convert a DOCX file to an HTML fragment
///
/// Paragraphs become `<p>`, `Heading1`..`Heading6` and `Title` styles become
/// `<h1>`..`<h6>`, bold and italic runs become `<strong>` and `<em>`, and
/// tables keep their row/cell structure. Everything else is dropped. All text
/// is HTML escaped.
///
/// # Arguments
/// * `bytes` - Raw DOCX file content
///
/// # Returns
/// * `Result<String, ConvertError>` - The HTML fragment or an error
///
/// # Errors
/// * Returns an error if the bytes are not a zip archive, the archive has no
///   `word/document.xml`, or that part is not well-formed XML
pub fn docx_to_html(bytes: &[u8]) -> Result<String, ConvertError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let mut xml = String::new();
    archive.by_name(DOCUMENT_PART)?.read_to_string(&mut xml)?;

    render_document_xml(&xml)
}

#[derive(Default)]
struct Run {
    text: String,
    bold: bool,
    italic: bool,
}

impl Run {
    fn flush_into(self, out: &mut String) {
        if self.text.is_empty() {
            return;
        }
        let mut html = self.text;
        if self.italic {
            html = format!("<em>{}</em>", html);
        }
        if self.bold {
            html = format!("<strong>{}</strong>", html);
        }
        out.push_str(&html);
    }
}

// A paragraph being built, with the run currently open inside it.
#[derive(Default)]
struct Paragraph {
    html: String,
    heading: Option<u8>,
    run: Option<Run>,
}

impl Paragraph {
    fn close_run(&mut self) {
        if let Some(run) = self.run.take() {
            run.flush_into(&mut self.html);
        }
    }

    fn flush_into(mut self, out: &mut String) {
        self.close_run();
        if self.html.trim().is_empty() {
            return;
        }
        match self.heading {
            Some(level) => out.push_str(&format!("<h{0}>{1}</h{0}>", level, self.html)),
            None => out.push_str(&format!("<p>{}</p>", self.html)),
        }
    }
}

// Paragraphs nest when a run holds a text box (`w:txbxContent`). Open
// paragraphs form a stack; an inner one is written out when it ends and the
// outer one keeps collecting its own runs.
fn render_document_xml(xml: &str) -> Result<String, ConvertError> {
    let mut reader = XmlReader::from_str(xml);
    let mut buf = Vec::new();

    let mut out = String::new();
    let mut paragraphs: Vec<Paragraph> = Vec::new();
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => match e.local_name().as_ref() {
                b"p" => paragraphs.push(Paragraph::default()),
                b"r" => {
                    if let Some(paragraph) = paragraphs.last_mut() {
                        paragraph.close_run();
                        paragraph.run = Some(Run::default());
                    }
                }
                b"t" => in_text = true,
                b"tbl" => out.push_str("<table>"),
                b"tr" => out.push_str("<tr>"),
                b"tc" => out.push_str("<td>"),
                _ => apply_property(e, paragraphs.last_mut()),
            },
            Event::Empty(ref e) => match e.local_name().as_ref() {
                b"br" => push_to_run(&mut paragraphs, "<br>"),
                b"tab" => push_to_run(&mut paragraphs, "&emsp;"),
                _ => apply_property(e, paragraphs.last_mut()),
            },
            Event::Text(e) => {
                if in_text {
                    push_to_run(&mut paragraphs, &escape_html(&e.unescape()?));
                }
            }
            Event::End(ref e) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"r" => {
                    if let Some(paragraph) = paragraphs.last_mut() {
                        paragraph.close_run();
                    }
                }
                b"p" => {
                    if let Some(finished) = paragraphs.pop() {
                        finished.flush_into(&mut out);
                    }
                }
                b"tc" => out.push_str("</td>"),
                b"tr" => out.push_str("</tr>"),
                b"tbl" => out.push_str("</table>"),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(out)
}

fn push_to_run(paragraphs: &mut [Paragraph], html: &str) {
    if let Some(run) = paragraphs.last_mut().and_then(|p| p.run.as_mut()) {
        run.text.push_str(html);
    }
}

// Run and paragraph properties: w:b, w:i and w:pStyle.
fn apply_property(e: &BytesStart, paragraph: Option<&mut Paragraph>) {
    let Some(paragraph) = paragraph else {
        return;
    };
    match e.local_name().as_ref() {
        b"b" => {
            if let Some(run) = paragraph.run.as_mut() {
                run.bold = toggle_enabled(e);
            }
        }
        b"i" => {
            if let Some(run) = paragraph.run.as_mut() {
                run.italic = toggle_enabled(e);
            }
        }
        b"pStyle" => {
            paragraph.heading = attribute_value(e, b"val").and_then(|v| heading_level(&v));
        }
        _ => {}
    }
}

// <w:b/> means on; <w:b w:val="0"/> or "false" means off.
fn toggle_enabled(e: &BytesStart) -> bool {
    !matches!(attribute_value(e, b"val").as_deref(), Some("0") | Some("false"))
}

fn attribute_value(e: &BytesStart, local: &[u8]) -> Option<String> {
    let attr = e
        .attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == local)?;
    let raw = std::str::from_utf8(&attr.value).ok()?;
    unescape(raw).ok().map(|value| value.into_owned())
}

fn heading_level(style: &str) -> Option<u8> {
    if style.eq_ignore_ascii_case("title") {
        return Some(1);
    }
    let digits = style
        .strip_prefix("Heading")
        .or_else(|| style.strip_prefix("heading"))?;
    match digits.trim().parse::<u8>() {
        Ok(level @ 1..=6) => Some(level),
        _ => None,
    }
}

/// Parse the first worksheet of an XLSX file into display strings
///
/// The grid is anchored at cell A1, so leading empty rows and columns are
/// kept as empty strings. Every row has the same width.
///
/// # Arguments
/// * `bytes` - Raw XLSX file content
///
/// # Returns
/// * `Result<Vec<Vec<String>>, ConvertError>` - Rows of cell text
///
/// # Errors
/// * Returns an error if the workbook cannot be read or has no sheets
pub fn xlsx_to_grid(bytes: &[u8]) -> Result<Vec<Vec<String>>, ConvertError> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(ConvertError::NoSheets)?;
    let range = workbook.worksheet_range(&sheet_name)?;

    let (row_offset, col_offset) = match range.start() {
        Some((row, col)) => (row as usize, col as usize),
        None => return Ok(Vec::new()),
    };
    let width = col_offset + range.width();

    let mut grid = vec![vec![String::new(); width]; row_offset];
    for row in range.rows() {
        let mut line = vec![String::new(); col_offset];
        line.extend(row.iter().map(cell_text));
        grid.push(line);
    }

    Ok(grid)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Int(i) => i.to_string(),
        Data::Float(f) => f.to_string(),
        Data::String(s) => s.clone(),
        Data::Bool(b) => b.to_string().to_uppercase(),
        Data::DateTime(dt) => dt.as_f64().to_string(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(e) => e.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn docx_with_body(body: &str) -> Vec<u8> {
        let xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
            body
        );
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file(DOCUMENT_PART, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(xml.as_bytes()).unwrap();
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn converts_paragraphs_and_headings() {
        let docx = docx_with_body(concat!(
            r#"<w:p><w:pPr><w:pStyle w:val="Heading2"/></w:pPr><w:r><w:t>Plan</w:t></w:r></w:p>"#,
            r#"<w:p><w:r><w:t xml:space="preserve">Hello </w:t></w:r><w:r><w:t>world</w:t></w:r></w:p>"#,
        ));

        let html = docx_to_html(&docx).unwrap();
        assert_eq!(html, "<h2>Plan</h2><p>Hello world</p>");
    }

    #[test]
    fn converts_bold_italic_and_breaks() {
        let docx = docx_with_body(concat!(
            r#"<w:p><w:r><w:rPr><w:b/></w:rPr><w:t>bold</w:t></w:r>"#,
            r#"<w:r><w:rPr><w:i/><w:b w:val="0"/></w:rPr><w:t>slanted</w:t><w:br/></w:r></w:p>"#,
        ));

        let html = docx_to_html(&docx).unwrap();
        assert_eq!(html, "<p><strong>bold</strong><em>slanted<br></em></p>");
    }

    #[test]
    fn text_box_paragraphs_keep_the_enclosing_text() {
        let docx = docx_with_body(concat!(
            r#"<w:p><w:r><w:t>before</w:t></w:r>"#,
            r#"<w:r><w:pict><w:txbxContent><w:p><w:r><w:t>inner</w:t></w:r></w:p></w:txbxContent></w:pict></w:r>"#,
            r#"<w:r><w:t>after</w:t></w:r></w:p>"#,
        ));

        let html = docx_to_html(&docx).unwrap();
        assert_eq!(html, "<p>inner</p><p>beforeafter</p>");
    }

    #[test]
    fn nested_paragraph_styles_do_not_leak_outwards() {
        let docx = docx_with_body(concat!(
            r#"<w:p><w:r><w:rPr><w:b/></w:rPr><w:t>outer</w:t></w:r>"#,
            r#"<w:r><w:txbxContent><w:p><w:pPr><w:pStyle w:val="Heading3"/></w:pPr>"#,
            r#"<w:r><w:t>boxed</w:t></w:r></w:p></w:txbxContent></w:r></w:p>"#,
        ));

        let html = docx_to_html(&docx).unwrap();
        assert_eq!(html, "<h3>boxed</h3><p><strong>outer</strong></p>");
    }

    #[test]
    fn style_attributes_are_unescaped() {
        let docx = docx_with_body(
            r#"<w:p><w:pPr><w:pStyle w:val="Heading&#52;"/></w:pPr><w:r><w:t>Four</w:t></w:r></w:p>"#,
        );

        let html = docx_to_html(&docx).unwrap();
        assert_eq!(html, "<h4>Four</h4>");
    }

    #[test]
    fn escapes_text_and_skips_empty_paragraphs() {
        let docx = docx_with_body(concat!(
            r#"<w:p></w:p>"#,
            r#"<w:p><w:r><w:t>a &lt;b&gt; &amp; c</w:t></w:r></w:p>"#,
        ));

        let html = docx_to_html(&docx).unwrap();
        assert_eq!(html, "<p>a &lt;b&gt; &amp; c</p>");
    }

    #[test]
    fn keeps_table_structure() {
        let docx = docx_with_body(concat!(
            r#"<w:tbl><w:tr><w:tc><w:p><w:r><w:t>A1</w:t></w:r></w:p></w:tc>"#,
            r#"<w:tc><w:p><w:r><w:t>B1</w:t></w:r></w:p></w:tc></w:tr></w:tbl>"#,
        ));

        let html = docx_to_html(&docx).unwrap();
        assert_eq!(
            html,
            "<table><tr><td><p>A1</p></td><td><p>B1</p></td></tr></table>"
        );
    }

    #[test]
    fn rejects_non_zip_input() {
        let err = docx_to_html(b"definitely not a zip").unwrap_err();
        assert!(matches!(err, ConvertError::Archive(_)));
    }

    #[test]
    fn rejects_archive_without_document_part() {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("other.txt", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"x").unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        assert!(docx_to_html(&bytes).is_err());
    }

    #[test]
    fn heading_level_accepts_known_styles() {
        assert_eq!(heading_level("Heading1"), Some(1));
        assert_eq!(heading_level("heading6"), Some(6));
        assert_eq!(heading_level("Title"), Some(1));
        assert_eq!(heading_level("Heading9"), None);
        assert_eq!(heading_level("Normal"), None);
    }

    #[test]
    fn reads_first_sheet_into_grid() {
        let mut workbook = rust_xlsxwriter::Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "Item").unwrap();
        sheet.write_string(0, 1, "Qty").unwrap();
        sheet.write_string(1, 0, "milk").unwrap();
        sheet.write_number(1, 1, 2.0).unwrap();
        sheet.write_string(2, 0, "eggs").unwrap();
        sheet.write_number(2, 1, 1.5).unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let grid = xlsx_to_grid(&bytes).unwrap();
        assert_eq!(
            grid,
            vec![
                vec!["Item".to_string(), "Qty".to_string()],
                vec!["milk".to_string(), "2".to_string()],
                vec!["eggs".to_string(), "1.5".to_string()],
            ]
        );
    }

    #[test]
    fn anchors_grid_at_a1() {
        let mut workbook = rust_xlsxwriter::Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(1, 1, "B2").unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let grid = xlsx_to_grid(&bytes).unwrap();
        assert_eq!(
            grid,
            vec![
                vec![String::new(), String::new()],
                vec![String::new(), "B2".to_string()],
            ]
        );
    }

    #[test]
    fn rejects_corrupt_workbook() {
        assert!(xlsx_to_grid(b"PK\x03\x04 broken").is_err());
    }
}
