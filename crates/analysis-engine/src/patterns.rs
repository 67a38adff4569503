//! Regex patterns and word lists used when interpreting user input and model replies

use lazy_static::lazy_static;
use regex::Regex;

/// Inputs shorter than this (trimmed, in characters) are not analysed
pub const MIN_ANALYSIS_LENGTH: usize = 8;

/// Bare greetings that never describe a contract need
pub const GREETINGS: &[&str] = &["你好", "您好", "早上好", "下午好", "晚上好", "嗨", "hi", "hello"];

/// Category answers meaning "nothing contract related"
pub const CATEGORY_NONE_SYNONYMS: &[&str] = &["无", "无关", "无关合同", "不相关", "不适用"];

/// Specific-type answers meaning "not applicable"
pub const TYPE_NONE_SYNONYMS: &[&str] = &["无", "无关", "不相关", "不适用", "n/a", "na"];

lazy_static! {
    /// A greeting followed only by punctuation or whitespace
    pub static ref GREETING: Regex = Regex::new(&format!(
        r"(?i)^(?:{})[！!.,，。\s]*$",
        GREETINGS.join("|")
    ))
    .unwrap();

    /// Content of a ``` or ```json fenced block
    pub static ref FENCED_BLOCK: Regex =
        Regex::new(r"```(?:json)?[ \t]*\r?\n([\s\S]*?)\r?\n\s*```").unwrap();

    /// Comma directly before a closing brace or bracket
    pub static ref TRAILING_COMMA: Regex = Regex::new(r",(\s*[}\]])").unwrap();

    /// Python literal spellings, matched as whole words
    pub static ref PYTHON_NONE: Regex = Regex::new(r"\bNone\b").unwrap();
    pub static ref PYTHON_TRUE: Regex = Regex::new(r"\bTrue\b").unwrap();
    pub static ref PYTHON_FALSE: Regex = Regex::new(r"\bFalse\b").unwrap();
}

/// Whether a trimmed input is a bare greeting
pub fn is_greeting(text: &str) -> bool {
    GREETING.is_match(text.trim())
}

/// Case-insensitive membership in a synonym list, ignoring surrounding whitespace
pub fn is_none_synonym(value: &str, synonyms: &[&str]) -> bool {
    let value = value.trim().to_lowercase();
    synonyms.iter().any(|s| *s == value)
}
