//! Placeholder value extraction from the user's free text

use shared_types::PlaceholderMap;

use crate::llm::LlmClient;
use crate::prompts;
use crate::repair::{parse_json_object, ParseOutcome};

/// Ask the model for a value per placeholder key
///
/// An empty key list or blank text returns an empty map without calling the
/// model. Model and parse failures also return an empty map. Non-string
/// values are coerced to text.
pub fn extract_placeholder_values(
    llm: &dyn LlmClient,
    text: &str,
    keys: &[String],
) -> PlaceholderMap {
    if keys.is_empty() {
        tracing::warn!("Placeholder list is empty, nothing to extract");
        return PlaceholderMap::new();
    }
    if text.trim().is_empty() {
        tracing::warn!("Input text is empty, nothing to extract");
        return PlaceholderMap::new();
    }

    let reply = match llm.complete(&prompts::placeholder_extraction(text, keys)) {
        Ok(reply) => reply,
        Err(e) => {
            tracing::warn!("Placeholder extraction call failed: {}", e);
            return PlaceholderMap::new();
        }
    };

    match parse_json_object(&reply) {
        ParseOutcome::Parsed(object) => {
            let values = PlaceholderMap::from_json_object(&object);
            tracing::info!(
                "Extracted {} values for {} placeholders",
                values.len(),
                keys.len()
            );
            values
        }
        ParseOutcome::Unparsable(_) => {
            tracing::warn!("Placeholder extraction reply could not be parsed");
            PlaceholderMap::new()
        }
    }
}
