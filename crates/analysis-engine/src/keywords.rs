//! Contract keyword extraction

use crate::llm::LlmClient;
use crate::prompts;

/// Comma-separated legal keywords for the text; empty on any failure
pub fn extract_keywords(llm: &dyn LlmClient, text: &str) -> String {
    if text.trim().is_empty() {
        return String::new();
    }

    match llm.complete(&prompts::keyword_extraction(text)) {
        Ok(reply) => {
            let keywords = reply.trim().to_string();
            tracing::debug!("Extracted keywords: {}", keywords);
            keywords
        }
        Err(e) => {
            tracing::warn!("Keyword extraction failed: {}", e);
            String::new()
        }
    }
}
