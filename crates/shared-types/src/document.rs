//! Owned document tree used by the template filler
//!
//! A [`Document`] owns body paragraphs and tables. Tables own rows, rows own
//! cells, and cells own paragraphs again. Every paragraph is an ordered list of
//! [`Run`]s, the smallest unit of formatted text. The tree has no back
//! references, so mutation only ever touches run text in place.

use serde::{Deserialize, Serialize};

/// A paragraph/table document, e.g. a contract template
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub paragraphs: Vec<Paragraph>,
    #[serde(default)]
    pub tables: Vec<Table>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    #[serde(default)]
    pub rows: Vec<Row>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    #[serde(default)]
    pub cells: Vec<Cell>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    #[serde(default)]
    pub paragraphs: Vec<Paragraph>,
}

/// Horizontal paragraph alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    Left,
    Center,
    Right,
    Justify,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Paragraph {
    #[serde(default)]
    pub runs: Vec<Run>,
    /// `None` means the author never set an alignment explicitly
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment: Option<Alignment>,
}

/// Character formatting carried by a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunFormat {
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub underline: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_pt: Option<f32>,
    /// Hex RGB, e.g. "FF0000"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub text: String,
    #[serde(default)]
    pub format: RunFormat,
}

impl Run {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            format: RunFormat::default(),
        }
    }

    pub fn with_format(text: impl Into<String>, format: RunFormat) -> Self {
        Self {
            text: text.into(),
            format,
        }
    }
}

impl Paragraph {
    pub fn new(runs: Vec<Run>) -> Self {
        Self {
            runs,
            alignment: None,
        }
    }

    /// Single-run paragraph
    pub fn from_text(text: impl Into<String>) -> Self {
        Self::new(vec![Run::new(text)])
    }

    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = Some(alignment);
        self
    }

    /// Concatenated text of all runs
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

impl Cell {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            paragraphs: vec![Paragraph::from_text(text)],
        }
    }
}

impl Document {
    pub fn new(paragraphs: Vec<Paragraph>, tables: Vec<Table>) -> Self {
        Self { paragraphs, tables }
    }

    /// Every paragraph in document order: body paragraphs first, then the
    /// paragraphs of each table cell, row by row.
    pub fn paragraphs_mut(&mut self) -> impl Iterator<Item = &mut Paragraph> + '_ {
        let cells = self
            .tables
            .iter_mut()
            .flat_map(|table| table.rows.iter_mut())
            .flat_map(|row| row.cells.iter_mut())
            .flat_map(|cell| cell.paragraphs.iter_mut());
        self.paragraphs.iter_mut().chain(cells)
    }

    /// Read-only counterpart of [`Document::paragraphs_mut`]
    pub fn all_paragraphs(&self) -> impl Iterator<Item = &Paragraph> + '_ {
        let cells = self
            .tables
            .iter()
            .flat_map(|table| table.rows.iter())
            .flat_map(|row| row.cells.iter())
            .flat_map(|cell| cell.paragraphs.iter());
        self.paragraphs.iter().chain(cells)
    }

    /// Plain text of every paragraph, one per line
    pub fn text(&self) -> String {
        self.all_paragraphs()
            .map(Paragraph::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn run_count(&self) -> usize {
        self.all_paragraphs().map(|p| p.runs.len()).sum()
    }
}
