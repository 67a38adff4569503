//! Format-preserving placeholder substitution
//!
//! Three passes over every paragraph the document tree reaches (body
//! paragraphs and every paragraph of every table cell), touching only run
//! text:
//!
//! 1. **Substitution**: each `{key}` token whose key is in the map is replaced
//!    by its value. The value `没有内容` becomes four spaces.
//! 2. **Residual sweep**: any remaining `{...}` token becomes four spaces.
//! 3. **Cleanup**: empty `{}` pairs are removed and paragraphs without an
//!    explicit alignment are set to left.
//!
//! # Known limitation
//!
//! Matching works run by run. A token split across runs, e.g. `{甲方` in one
//! run and `代表}` in the next, is neither filled nor swept and survives as
//! literal text.

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use shared_types::{Alignment, Document, Paragraph, PlaceholderMap};

/// Value that asks for a visibly blank field
pub const NO_CONTENT_SENTINEL: &str = "没有内容";

/// Fixed-width blank used for sentinel values and swept residuals
pub const BLANK: &str = "    ";

lazy_static! {
    /// Brace, one or more non-brace characters, brace
    pub static ref PLACEHOLDER: Regex = Regex::new(r"\{[^{}]+\}").unwrap();
    static ref EMPTY_BRACES: Regex = Regex::new(r"\{\s*\}").unwrap();
}

/// What a fill changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FillReport {
    /// Tokens replaced with mapped values
    pub substitutions: usize,
    /// Tokens blanked by the residual sweep, in document order
    pub residual_tokens: Vec<String>,
    /// Empty bracket pairs removed
    pub emptied_brackets: usize,
    /// Paragraphs given the default left alignment
    pub aligned_paragraphs: usize,
}

/// Fills `{key}` placeholders in a document
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateFiller;

impl TemplateFiller {
    pub fn new() -> Self {
        Self
    }

    /// Fill in place and hand the document back for chaining
    pub fn fill<'a>(&self, document: &'a mut Document, values: &PlaceholderMap) -> &'a mut Document {
        self.fill_with_report(document, values);
        document
    }

    pub fn fill_with_report(&self, document: &mut Document, values: &PlaceholderMap) -> FillReport {
        let mut report = FillReport::default();

        for paragraph in document.paragraphs_mut() {
            substitute(paragraph, values, &mut report);
        }
        for paragraph in document.paragraphs_mut() {
            sweep_residuals(paragraph, &mut report);
        }
        for paragraph in document.paragraphs_mut() {
            cleanup(paragraph, &mut report);
        }

        if !report.residual_tokens.is_empty() {
            tracing::warn!(
                "Blanked {} unfilled placeholders: {:?}",
                report.residual_tokens.len(),
                report.residual_tokens
            );
        }
        tracing::debug!(
            "Filled {} placeholders, removed {} empty brackets, aligned {} paragraphs",
            report.substitutions,
            report.emptied_brackets,
            report.aligned_paragraphs
        );
        report
    }
}

fn replacement(value: &str) -> &str {
    if value == NO_CONTENT_SENTINEL {
        BLANK
    } else {
        value
    }
}

fn substitute(paragraph: &mut Paragraph, values: &PlaceholderMap, report: &mut FillReport) {
    if values.is_empty() {
        return;
    }
    for run in &mut paragraph.runs {
        let mut count = 0;
        let replaced = PLACEHOLDER.replace_all(&run.text, |caps: &Captures| {
            let token = &caps[0];
            let key = &token[1..token.len() - 1];
            match values.get(key) {
                Some(value) => {
                    count += 1;
                    replacement(value).to_string()
                }
                None => token.to_string(),
            }
        });
        if count > 0 {
            run.text = replaced.into_owned();
            report.substitutions += count;
        }
    }
}

/// Blank every residual token of a run's text, recording what was blanked
///
/// Repeats until no token is left, since blanking `{x}` inside `{a{x}b}`
/// leaves the outer pair enclosing non-brace text.
fn sweep_text(text: &str, report: &mut FillReport) -> Option<String> {
    if !PLACEHOLDER.is_match(text) {
        return None;
    }
    let mut swept = text.to_string();
    while PLACEHOLDER.is_match(&swept) {
        report
            .residual_tokens
            .extend(PLACEHOLDER.find_iter(&swept).map(|m| m.as_str().to_string()));
        swept = PLACEHOLDER.replace_all(&swept, BLANK).into_owned();
    }
    Some(swept)
}

fn sweep_residuals(paragraph: &mut Paragraph, report: &mut FillReport) {
    for run in &mut paragraph.runs {
        if let Some(swept) = sweep_text(&run.text, report) {
            run.text = swept;
        }
    }
}

fn cleanup(paragraph: &mut Paragraph, report: &mut FillReport) {
    for run in &mut paragraph.runs {
        // removing a pair can expose a new token, e.g. "{a{}b}"
        loop {
            let empties = EMPTY_BRACES.find_iter(&run.text).count();
            if empties == 0 {
                break;
            }
            report.emptied_brackets += empties;
            run.text = EMPTY_BRACES.replace_all(&run.text, "").into_owned();
            if let Some(swept) = sweep_text(&run.text, report) {
                run.text = swept;
            }
        }
    }

    if paragraph.alignment.is_none() {
        paragraph.alignment = Some(Alignment::Left);
        report.aligned_paragraphs += 1;
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use shared_types::{Cell, Row, Run, Table};

    fn run_text() -> impl Strategy<Value = String> {
        prop::collection::vec(
            prop_oneof![
                Just("合同"),
                Just("a "),
                Just("{"),
                Just("}"),
                Just("{甲方}"),
                Just("{乙方}"),
                Just("{未知}"),
                Just("{ }"),
            ],
            0..8,
        )
        .prop_map(|parts| parts.concat())
    }

    fn paragraph() -> impl Strategy<Value = Paragraph> {
        prop::collection::vec(run_text(), 0..4)
            .prop_map(|texts| Paragraph::new(texts.into_iter().map(Run::new).collect()))
    }

    fn document() -> impl Strategy<Value = Document> {
        (
            prop::collection::vec(paragraph(), 0..4),
            prop::collection::vec(paragraph(), 0..3),
        )
            .prop_map(|(body, cells)| {
                let table = Table {
                    rows: vec![Row {
                        cells: cells
                            .into_iter()
                            .map(|p| Cell { paragraphs: vec![p] })
                            .collect(),
                    }],
                };
                Document::new(body, vec![table])
            })
    }

    fn values() -> impl Strategy<Value = PlaceholderMap> {
        prop_oneof![
            Just(PlaceholderMap::new()),
            Just([("甲方", "张三")].into_iter().collect::<PlaceholderMap>()),
            Just(
                [("甲方", "没有内容"), ("乙方", "{甲方}")]
                    .into_iter()
                    .collect::<PlaceholderMap>()
            ),
        ]
    }

    proptest! {
        #[test]
        fn fill_is_idempotent(doc in document(), values in values()) {
            let filler = TemplateFiller::new();
            let mut once = doc.clone();
            filler.fill(&mut once, &values);
            let mut twice = once.clone();
            filler.fill(&mut twice, &values);

            prop_assert_eq!(&twice, &once);
            for p in once.all_paragraphs() {
                for run in &p.runs {
                    prop_assert!(!PLACEHOLDER.is_match(&run.text));
                }
                prop_assert!(p.alignment.is_some());
            }
        }

        #[test]
        fn structure_is_untouched(doc in document(), values in values()) {
            let mut filled = doc.clone();
            TemplateFiller::new().fill(&mut filled, &values);
            prop_assert_eq!(filled.run_count(), doc.run_count());
            prop_assert_eq!(filled.tables.len(), doc.tables.len());
        }
    }
}
