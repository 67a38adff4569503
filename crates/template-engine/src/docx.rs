//! WordprocessingML (.docx) templates
//!
//! A `.docx` file is a ZIP archive; the body lives in `word/document.xml`.
//! [`DocxTemplate::document`] maps it onto the shared [`Document`] tree:
//!
//! - `w:p` outside tables becomes a body [`Paragraph`]
//! - `w:tbl` / `w:tr` / `w:tc` become [`Table`] / [`Row`] / [`Cell`]; nested
//!   tables are flattened into the enclosing cell
//! - `w:r` becomes a [`Run`] whose text is the concatenation of its `w:t`
//! - `w:pPr/w:jc` becomes the paragraph [`Alignment`]
//!
//! [`DocxTemplate::render`] writes a filled tree back by rewriting the XML
//! events in place: the first `w:t` of each run receives the run text, later
//! ones are emptied, and `w:jc` is set from the paragraph alignment. Every
//! other part of the archive is copied unchanged. Drawings, text boxes and
//! alternate content are passed through untouched.

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::io::{Cursor, Read, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::errors::TemplateError;
use shared_types::{Alignment, Cell, Document, Paragraph, Row, Run, RunFormat, Table};

/// Archive entry holding the document body
pub const DOCUMENT_PART: &str = "word/document.xml";

/// Elements whose content is kept opaque
const OPAQUE_ELEMENTS: &[&[u8]] = &[
    b"w:drawing",
    b"w:pict",
    b"w:object",
    b"mc:AlternateContent",
];

/// `w:pPr` children that must follow `w:jc`
const AFTER_JC: &[&[u8]] = &[
    b"w:textDirection",
    b"w:textAlignment",
    b"w:textboxTightWrap",
    b"w:outlineLvl",
    b"w:divId",
    b"w:cnfStyle",
    b"w:rPr",
    b"w:sectPr",
    b"w:pPrChange",
];

/// A `.docx` template held in memory
#[derive(Debug, Clone, PartialEq)]
pub struct DocxTemplate {
    parts: Vec<(String, Vec<u8>)>,
    body_xml: String,
}

fn invalid(reason: impl std::fmt::Display) -> TemplateError {
    TemplateError::InvalidDocx(reason.to_string())
}

impl DocxTemplate {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TemplateError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut parts = Vec::with_capacity(archive.len());
        let mut body_xml = None;

        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            let name = file.name().to_string();
            let mut content = Vec::new();
            file.read_to_end(&mut content)?;
            if name == DOCUMENT_PART {
                body_xml = Some(String::from_utf8(content.clone()).map_err(invalid)?);
            }
            parts.push((name, content));
        }

        let body_xml = body_xml.ok_or_else(|| invalid(format!("missing {}", DOCUMENT_PART)))?;
        Ok(Self { parts, body_xml })
    }

    pub fn open(path: &Path) -> Result<Self, TemplateError> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes).map_err(|e| match e {
            TemplateError::InvalidDocx(reason) | TemplateError::InvalidTemplate { reason, .. } => {
                TemplateError::InvalidTemplate {
                    path: path.to_path_buf(),
                    reason,
                }
            }
            TemplateError::Archive(source) => TemplateError::InvalidTemplate {
                path: path.to_path_buf(),
                reason: source.to_string(),
            },
            other => other,
        })
    }

    /// The body as a document tree
    pub fn document(&self) -> Result<Document, TemplateError> {
        let mut reader = Reader::from_str(&self.body_xml);
        let mut builder = TreeBuilder::default();

        loop {
            match reader.read_event().map_err(invalid)? {
                Event::Eof => break,
                Event::Start(e) => builder.start(&e, false),
                Event::Empty(e) => {
                    let name = e.name();
                    if !OPAQUE_ELEMENTS.contains(&name.as_ref()) {
                        builder.start(&e, true);
                        builder.end(name.as_ref());
                    }
                }
                Event::End(e) => builder.end(e.name().as_ref()),
                Event::Text(t) => {
                    if builder.in_text() {
                        builder.text(&t.unescape().map_err(invalid)?);
                    }
                }
                _ => {}
            }
        }

        Ok(builder.document)
    }

    /// The archive with its body rewritten from `filled`
    ///
    /// `filled` must come from [`DocxTemplate::document`] on this template;
    /// runs and paragraphs are matched by position.
    pub fn render(&self, filled: &Document) -> Result<Vec<u8>, TemplateError> {
        let body = rewrite_body(&self.body_xml, filled)?;

        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in &self.parts {
            if name.ends_with('/') {
                writer.add_directory(name.as_str(), options)?;
                continue;
            }
            writer.start_file(name.as_str(), options)?;
            if name == DOCUMENT_PART {
                writer.write_all(&body)?;
            } else {
                writer.write_all(content)?;
            }
        }
        Ok(writer.finish()?.into_inner())
    }
}

/// Attribute value by qualified name
fn attr(e: &BytesStart<'_>, name: &str) -> Option<String> {
    e.try_get_attribute(name)
        .ok()
        .flatten()
        .and_then(|a| a.unescape_value().ok())
        .map(|v| v.into_owned())
}

/// Toggle properties are on unless `w:val` turns them off
fn toggle(e: &BytesStart<'_>) -> bool {
    !matches!(
        attr(e, "w:val").as_deref(),
        Some("0") | Some("false") | Some("off") | Some("none")
    )
}

fn parse_alignment(value: &str) -> Option<Alignment> {
    match value {
        "left" | "start" => Some(Alignment::Left),
        "center" => Some(Alignment::Center),
        "right" | "end" => Some(Alignment::Right),
        "both" | "distribute" | "justify" => Some(Alignment::Justify),
        _ => None,
    }
}

fn alignment_value(alignment: Alignment) -> &'static str {
    match alignment {
        Alignment::Left => "left",
        Alignment::Center => "center",
        Alignment::Right => "right",
        Alignment::Justify => "both",
    }
}

/// Builds the document tree from body events
#[derive(Default)]
struct TreeBuilder {
    document: Document,
    table_depth: usize,
    opaque_depth: usize,
    paragraph: Option<Paragraph>,
    run: Option<Run>,
    in_ppr: bool,
    in_rpr: bool,
    in_t: bool,
}

impl TreeBuilder {
    fn in_text(&self) -> bool {
        self.in_t && self.opaque_depth == 0
    }

    fn start(&mut self, e: &BytesStart<'_>, empty: bool) {
        let name = e.name();
        let name = name.as_ref();

        if OPAQUE_ELEMENTS.contains(&name) {
            self.opaque_depth += 1;
            return;
        }
        if self.opaque_depth > 0 {
            return;
        }

        match name {
            b"w:tbl" => {
                if self.table_depth == 0 {
                    self.document.tables.push(Table::default());
                }
                self.table_depth += 1;
            }
            b"w:tr" if self.table_depth == 1 => {
                last_or_default(&mut self.document.tables)
                    .rows
                    .push(Row::default());
            }
            b"w:tc" if self.table_depth == 1 => self.current_row().cells.push(Cell::default()),
            b"w:p" => self.paragraph = Some(Paragraph::default()),
            b"w:pPr" => self.in_ppr = true,
            b"w:jc" if self.in_ppr && self.run.is_none() => {
                if let Some(paragraph) = self.paragraph.as_mut() {
                    paragraph.alignment = attr(e, "w:val").as_deref().and_then(parse_alignment);
                }
            }
            b"w:r" if self.paragraph.is_some() => self.run = Some(Run::default()),
            b"w:rPr" if self.run.is_some() => self.in_rpr = true,
            b"w:t" if self.run.is_some() => self.in_t = !empty,
            _ if self.in_rpr => {
                if let Some(run) = self.run.as_mut() {
                    apply_run_property(&mut run.format, name, e);
                }
            }
            _ => {}
        }
    }

    fn end(&mut self, name: &[u8]) {
        if OPAQUE_ELEMENTS.contains(&name) {
            self.opaque_depth = self.opaque_depth.saturating_sub(1);
            return;
        }
        if self.opaque_depth > 0 {
            return;
        }

        match name {
            b"w:tbl" => self.table_depth = self.table_depth.saturating_sub(1),
            b"w:p" => {
                if let Some(paragraph) = self.paragraph.take() {
                    if self.table_depth > 0 {
                        self.current_cell().paragraphs.push(paragraph);
                    } else {
                        self.document.paragraphs.push(paragraph);
                    }
                }
            }
            b"w:pPr" => self.in_ppr = false,
            b"w:r" => {
                if let (Some(run), Some(paragraph)) = (self.run.take(), self.paragraph.as_mut()) {
                    paragraph.runs.push(run);
                }
                self.in_rpr = false;
            }
            b"w:rPr" => self.in_rpr = false,
            b"w:t" => self.in_t = false,
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        if let Some(run) = self.run.as_mut() {
            run.text.push_str(text);
        }
    }

    fn current_row(&mut self) -> &mut Row {
        last_or_default(&mut last_or_default(&mut self.document.tables).rows)
    }

    /// Innermost top-level cell, created when the markup omits it
    fn current_cell(&mut self) -> &mut Cell {
        last_or_default(&mut self.current_row().cells)
    }
}

fn last_or_default<T: Default>(items: &mut Vec<T>) -> &mut T {
    if items.is_empty() {
        items.push(T::default());
    }
    let last = items.len() - 1;
    &mut items[last]
}

fn apply_run_property(format: &mut RunFormat, name: &[u8], e: &BytesStart<'_>) {
    match name {
        b"w:b" => format.bold = toggle(e),
        b"w:i" => format.italic = toggle(e),
        b"w:u" => format.underline = toggle(e),
        b"w:rFonts" => {
            format.font = attr(e, "w:eastAsia")
                .or_else(|| attr(e, "w:ascii"))
                .or_else(|| attr(e, "w:hAnsi"));
        }
        b"w:sz" => {
            format.size_pt = attr(e, "w:val")
                .and_then(|v| v.parse::<f32>().ok())
                .map(|half_points| half_points / 2.0);
        }
        b"w:color" => {
            format.color = attr(e, "w:val").filter(|v| v != "auto");
        }
        _ => {}
    }
}

/// Paragraph slots in the order [`Document::all_paragraphs`] yields them
struct Slots<'a> {
    paragraphs: Vec<&'a Paragraph>,
    body_len: usize,
    next_body: usize,
    next_table: usize,
}

impl<'a> Slots<'a> {
    fn new(filled: &'a Document) -> Self {
        Self {
            paragraphs: filled.all_paragraphs().collect(),
            body_len: filled.paragraphs.len(),
            next_body: 0,
            next_table: 0,
        }
    }

    fn next(&mut self, in_table: bool) -> Option<&'a Paragraph> {
        let slot = if in_table {
            self.next_table += 1;
            self.body_len + self.next_table - 1
        } else {
            self.next_body += 1;
            self.next_body - 1
        };
        self.paragraphs.get(slot).copied()
    }
}

type XmlWriter = Writer<Vec<u8>>;

fn write(writer: &mut XmlWriter, event: Event<'_>) -> Result<(), TemplateError> {
    writer.write_event(event).map_err(invalid)
}

fn write_jc(writer: &mut XmlWriter, alignment: Alignment) -> Result<(), TemplateError> {
    let mut jc = BytesStart::new("w:jc");
    jc.push_attribute(("w:val", alignment_value(alignment)));
    write(writer, Event::Empty(jc))
}

fn write_ppr_with_jc(writer: &mut XmlWriter, alignment: Alignment) -> Result<(), TemplateError> {
    write(writer, Event::Start(BytesStart::new("w:pPr")))?;
    write_jc(writer, alignment)?;
    write(writer, Event::End(BytesEnd::new("w:pPr")))
}

fn write_text_element(writer: &mut XmlWriter, text: &str) -> Result<(), TemplateError> {
    let mut t = BytesStart::new("w:t");
    t.push_attribute(("xml:space", "preserve"));
    write(writer, Event::Start(t))?;
    write(writer, Event::Text(BytesText::new(text)))?;
    write(writer, Event::End(BytesEnd::new("w:t")))
}

/// Rewrites run text and paragraph alignment of `document.xml`
fn rewrite_body(xml: &str, filled: &Document) -> Result<Vec<u8>, TemplateError> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len()));
    let mut slots = Slots::new(filled);

    let mut table_depth = 0usize;
    let mut opaque_depth = 0usize;
    let mut paragraph: Option<&Paragraph> = None;
    let mut run: Option<&Run> = None;
    let mut run_index = 0usize;
    let mut run_text_written = false;
    let mut pending_ppr = false;
    let mut ppr_depth = 0usize;
    let mut jc_written = false;
    // inside a w:t whose text is replaced or emptied
    let mut skip_text = false;
    // the original end tag of a replaced w:t is dropped
    let mut drop_t_end = false;

    loop {
        let event = reader.read_event().map_err(invalid)?;
        if matches!(event, Event::Eof) {
            break;
        }

        if opaque_depth > 0 {
            match &event {
                Event::Start(e) if OPAQUE_ELEMENTS.contains(&e.name().as_ref()) => {
                    opaque_depth += 1
                }
                Event::End(e) if OPAQUE_ELEMENTS.contains(&e.name().as_ref()) => {
                    opaque_depth -= 1
                }
                _ => {}
            }
            write(&mut writer, event)?;
            continue;
        }

        let alignment = paragraph.and_then(|p| p.alignment);

        // w:pPr must be the first child of w:p
        if pending_ppr && matches!(event, Event::Start(_) | Event::Empty(_) | Event::End(_)) {
            pending_ppr = false;
            let existing_ppr = match &event {
                Event::Start(e) if e.name().as_ref() == b"w:pPr" => Some(true),
                Event::Empty(e) if e.name().as_ref() == b"w:pPr" => Some(false),
                _ => None,
            };
            match (existing_ppr, alignment) {
                (Some(true), _) => {
                    ppr_depth = 1;
                    jc_written = false;
                    write(&mut writer, event)?;
                    continue;
                }
                (Some(false), Some(alignment)) => {
                    write_ppr_with_jc(&mut writer, alignment)?;
                    continue;
                }
                (Some(false), None) => {
                    write(&mut writer, event)?;
                    continue;
                }
                (None, Some(alignment)) => write_ppr_with_jc(&mut writer, alignment)?,
                (None, None) => {}
            }
        }

        if ppr_depth > 0 {
            let mut replacement = None;
            match &event {
                Event::Start(e) | Event::Empty(e) if ppr_depth == 1 => {
                    let is_start = matches!(event, Event::Start(_));
                    let name = e.name();
                    match alignment {
                        Some(alignment) if name.as_ref() == b"w:jc" => {
                            jc_written = true;
                            let mut jc = BytesStart::new("w:jc");
                            jc.push_attribute(("w:val", alignment_value(alignment)));
                            replacement = Some(if is_start {
                                Event::Start(jc)
                            } else {
                                Event::Empty(jc)
                            });
                        }
                        Some(alignment) if !jc_written && AFTER_JC.contains(&name.as_ref()) => {
                            write_jc(&mut writer, alignment)?;
                            jc_written = true;
                        }
                        _ => {}
                    }
                    if is_start {
                        ppr_depth += 1;
                    }
                }
                Event::Start(_) => ppr_depth += 1,
                Event::End(e) => {
                    if ppr_depth == 1 && e.name().as_ref() == b"w:pPr" && !jc_written {
                        if let Some(alignment) = alignment {
                            write_jc(&mut writer, alignment)?;
                        }
                    }
                    ppr_depth -= 1;
                }
                _ => {}
            }
            write(&mut writer, replacement.unwrap_or(event))?;
            continue;
        }

        match &event {
            Event::Start(e) => match e.name().as_ref() {
                name if OPAQUE_ELEMENTS.contains(&name) => opaque_depth = 1,
                b"w:tbl" => table_depth += 1,
                b"w:p" => {
                    paragraph = slots.next(table_depth > 0);
                    run_index = 0;
                    pending_ppr = true;
                }
                b"w:r" if paragraph.is_some() => {
                    run = paragraph.and_then(|p| p.runs.get(run_index));
                    run_index += 1;
                    run_text_written = false;
                }
                b"w:t" => {
                    if let Some(target) = run {
                        skip_text = true;
                        if !run_text_written {
                            run_text_written = true;
                            drop_t_end = true;
                            write_text_element(&mut writer, &target.text)?;
                            continue;
                        }
                    }
                }
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                // keep slots and run positions aligned with the parsed tree
                b"w:p" => {
                    slots.next(table_depth > 0);
                }
                b"w:r" if paragraph.is_some() => run_index += 1,
                b"w:t" => {
                    if let Some(target) = run {
                        if !run_text_written {
                            run_text_written = true;
                            write_text_element(&mut writer, &target.text)?;
                            continue;
                        }
                    }
                }
                _ => {}
            },
            Event::End(e) => match e.name().as_ref() {
                b"w:tbl" => table_depth = table_depth.saturating_sub(1),
                b"w:p" => paragraph = None,
                b"w:r" => run = None,
                b"w:t" if skip_text => {
                    skip_text = false;
                    if drop_t_end {
                        drop_t_end = false;
                        continue;
                    }
                }
                _ => {}
            },
            Event::Text(_) | Event::CData(_) if skip_text => continue,
            _ => {}
        }

        write(&mut writer, event)?;
    }

    Ok(writer.into_inner())
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/></Types>"#;

    /// A minimal archive with the given `w:body` content
    pub(crate) fn docx_bytes(body: &str) -> Vec<u8> {
        let options = SimpleFileOptions::default();
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer.start_file("[Content_Types].xml", options).unwrap();
        writer.write_all(CONTENT_TYPES.as_bytes()).unwrap();
        writer.add_directory("word/", options).unwrap();
        writer.start_file(DOCUMENT_PART, options).unwrap();
        let xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
            body
        );
        writer.write_all(xml.as_bytes()).unwrap();
        writer.finish().unwrap().into_inner()
    }

    pub(crate) fn content_types() -> &'static [u8] {
        CONTENT_TYPES.as_bytes()
    }
}
