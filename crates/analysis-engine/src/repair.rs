//! Staged repair of JSON objects returned by the language model
//!
//! Model replies are often almost-JSON: wrapped in prose or a fenced block,
//! single-quoted, spelled with Python literals, or left with trailing commas.
//! [`parse_json_object`] tries a fixed chain of pure stages in order and
//! returns the first object any of them produces:
//!
//! 1. [`RepairStage::StrictParse`] - the outermost `{...}` span as JSON
//! 2. [`RepairStage::FencedBlock`] - the content of a fenced code block
//! 3. [`RepairStage::NormalizeLiterals`] - quotes, literals and trailing commas rewritten
//! 4. [`RepairStage::PermissiveLiteral`] - a forgiving literal parser
//!
//! When every stage fails the raw text is kept in [`ParseOutcome::Unparsable`].

use serde_json::{Map, Number, Value};

use crate::patterns::{FENCED_BLOCK, PYTHON_FALSE, PYTHON_NONE, PYTHON_TRUE, TRAILING_COMMA};

pub type JsonObject = Map<String, Value>;

/// Result of parsing a model reply expected to hold a JSON object
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    Parsed(JsonObject),
    Unparsable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairStage {
    StrictParse,
    FencedBlock,
    NormalizeLiterals,
    PermissiveLiteral,
}

impl RepairStage {
    /// Stages in the order they are tried
    pub const CHAIN: [RepairStage; 4] = [
        RepairStage::StrictParse,
        RepairStage::FencedBlock,
        RepairStage::NormalizeLiterals,
        RepairStage::PermissiveLiteral,
    ];

    pub fn apply(self, raw: &str) -> Option<JsonObject> {
        match self {
            RepairStage::StrictParse => strict_parse(raw),
            RepairStage::FencedBlock => fenced_block(raw),
            RepairStage::NormalizeLiterals => normalize_literals(raw),
            RepairStage::PermissiveLiteral => permissive_literal(raw),
        }
    }
}

/// Run the repair chain over a model reply
pub fn parse_json_object(raw: &str) -> ParseOutcome {
    for stage in RepairStage::CHAIN {
        if let Some(object) = stage.apply(raw) {
            if stage != RepairStage::StrictParse {
                tracing::debug!("Recovered JSON object with {:?}", stage);
            }
            return ParseOutcome::Parsed(object);
        }
        tracing::debug!("JSON repair stage {:?} failed", stage);
    }

    tracing::warn!(
        "Could not parse a JSON object from model reply ({} chars)",
        raw.chars().count()
    );
    ParseOutcome::Unparsable(raw.to_string())
}

/// From the first `{` to the last `}`, inclusive
fn outer_span(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (start < end).then(|| &raw[start..=end])
}

fn parse_object(text: &str) -> Option<JsonObject> {
    match serde_json::from_str::<Value>(text.trim()) {
        Ok(Value::Object(object)) => Some(object),
        _ => None,
    }
}

pub fn strict_parse(raw: &str) -> Option<JsonObject> {
    parse_object(outer_span(raw)?)
}

pub fn fenced_block(raw: &str) -> Option<JsonObject> {
    let caps = FENCED_BLOCK.captures(raw)?;
    let content = caps.get(1)?.as_str();
    parse_object(content).or_else(|| strict_parse(content))
}

pub fn normalize_literals(raw: &str) -> Option<JsonObject> {
    let span = outer_span(raw)?;
    let quoted = span.replace('\'', "\"");
    let literals = PYTHON_NONE.replace_all(&quoted, "null");
    let literals = PYTHON_TRUE.replace_all(&literals, "true");
    let literals = PYTHON_FALSE.replace_all(&literals, "false");
    let cleaned = TRAILING_COMMA.replace_all(&literals, "$1");
    parse_object(&cleaned)
}

pub fn permissive_literal(raw: &str) -> Option<JsonObject> {
    let span = outer_span(raw)?;
    let mut parser = LiteralParser::new(span);
    let value = parser.parse_value()?;
    parser.skip_whitespace();
    if !parser.at_end() {
        return None;
    }
    match value {
        Value::Object(object) => Some(object),
        _ => None,
    }
}

/// Deepest object/array nesting the literal parser accepts
const MAX_NESTING_DEPTH: usize = 128;

/// Recursive-descent parser for JSON-like literals
///
/// Accepts single- or double-quoted strings, bare object keys, Python and
/// JSON spellings of null/true/false, and trailing commas. Input nested deeper
/// than [`MAX_NESTING_DEPTH`] is rejected.
struct LiteralParser {
    chars: Vec<char>,
    pos: usize,
    depth: usize,
}

impl LiteralParser {
    fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
            depth: 0,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        self.skip_whitespace();
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn parse_value(&mut self) -> Option<Value> {
        self.skip_whitespace();
        match self.peek()? {
            '{' => self.nested(Self::parse_object),
            '[' | '(' => self.nested(Self::parse_array),
            '"' | '\'' => self.parse_string().map(Value::String),
            c if c == '-' || c == '+' || c.is_ascii_digit() => self.parse_number(),
            _ => self.parse_word(),
        }
    }

    fn nested(&mut self, parse: fn(&mut Self) -> Option<Value>) -> Option<Value> {
        if self.depth >= MAX_NESTING_DEPTH {
            return None;
        }
        self.depth += 1;
        let value = parse(self);
        self.depth -= 1;
        value
    }

    fn parse_object(&mut self) -> Option<Value> {
        self.next()?;
        let mut object = JsonObject::new();
        loop {
            if self.eat('}') {
                return Some(Value::Object(object));
            }
            let key = self.parse_key()?;
            if !self.eat(':') {
                return None;
            }
            let value = self.parse_value()?;
            object.insert(key, value);
            if !self.eat(',') {
                return self.eat('}').then_some(Value::Object(object));
            }
        }
    }

    fn parse_array(&mut self) -> Option<Value> {
        let close = if self.next()? == '(' { ')' } else { ']' };
        let mut items = Vec::new();
        loop {
            if self.eat(close) {
                return Some(Value::Array(items));
            }
            items.push(self.parse_value()?);
            if !self.eat(',') {
                return self.eat(close).then_some(Value::Array(items));
            }
        }
    }

    fn parse_key(&mut self) -> Option<String> {
        self.skip_whitespace();
        match self.peek()? {
            '"' | '\'' => self.parse_string(),
            _ => {
                let start = self.pos;
                while self
                    .peek()
                    .is_some_and(|c| c != ':' && c != ',' && c != '}' && !c.is_whitespace())
                {
                    self.pos += 1;
                }
                (self.pos > start).then(|| self.chars[start..self.pos].iter().collect())
            }
        }
    }

    fn parse_string(&mut self) -> Option<String> {
        let quote = self.next()?;
        let mut out = String::new();
        loop {
            match self.next()? {
                c if c == quote => return Some(out),
                '\\' => match self.next()? {
                    'n' => out.push('\n'),
                    't' => out.push('\t'),
                    'r' => out.push('\r'),
                    'u' => {
                        let hex: String = (0..4).filter_map(|_| self.next()).collect();
                        let code = u32::from_str_radix(&hex, 16).ok()?;
                        out.push(char::from_u32(code)?);
                    }
                    other => out.push(other),
                },
                c => out.push(c),
            }
        }
    }

    fn parse_number(&mut self) -> Option<Value> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E'))
        {
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        let text = text.trim_start_matches('+');
        if let Ok(int) = text.parse::<i64>() {
            return Some(Value::Number(int.into()));
        }
        let float = text.parse::<f64>().ok()?;
        Number::from_f64(float).map(Value::Number)
    }

    fn parse_word(&mut self) -> Option<Value> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_') {
            self.pos += 1;
        }
        let word: String = self.chars[start..self.pos].iter().collect();
        match word.as_str() {
            "None" | "null" => Some(Value::Null),
            "True" | "true" => Some(Value::Bool(true)),
            "False" | "false" => Some(Value::Bool(false)),
            _ => None,
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn never_panics(raw in ".{0,200}") {
            let _ = parse_json_object(&raw);
        }

        #[test]
        fn valid_objects_parse_strictly(
            entries in prop::collection::btree_map("[a-z\u{4e00}-\u{4e20}]{1,6}", "[^\"\\\\]{0,12}", 0..6)
        ) {
            let value = Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect(),
            );
            let text = value.to_string();
            prop_assert_eq!(strict_parse(&text), Some(value.as_object().cloned().unwrap_or_default()));
        }
    }
}
