//! Text normalisation applied before embedding

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
    static ref LIST_SEPARATORS: Regex = Regex::new(r"[、，,]").unwrap();
    static ref NON_WORD: Regex = Regex::new(r"[^\w\s]").unwrap();
}

/// Query cleaner: collapse whitespace and turn list separators into spaces,
/// keeping all other punctuation
pub fn clean_text_for_legal(text: &str) -> String {
    let collapsed = WHITESPACE.replace_all(text, " ");
    LIST_SEPARATORS
        .replace_all(&collapsed, " ")
        .trim()
        .to_string()
}

/// Corpus cleaner: [`clean_text_for_legal`] plus removal of every character
/// that is neither a word character nor whitespace
pub fn clean_text(text: &str) -> String {
    let legal = clean_text_for_legal(text);
    NON_WORD.replace_all(&legal, "").trim().to_string()
}

/// Length used by scoring: characters of the trimmed input
pub fn input_length(text: &str) -> usize {
    text.trim().chars().count()
}
