//! Needs analysis: what kind of contract, if any, the user is asking for

use serde_json::Value;
use shared_types::{NeedsAnalysis, NOT_APPLICABLE, NO_RELEVANT_CONTRACT};

use crate::llm::LlmClient;
use crate::patterns::{
    is_greeting, is_none_synonym, CATEGORY_NONE_SYNONYMS, MIN_ANALYSIS_LENGTH, TYPE_NONE_SYNONYMS,
};
use crate::prompts;
use crate::repair::{parse_json_object, ParseOutcome};

/// Too short to analyse, or a bare greeting
pub fn is_trivial_input(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.chars().count() < MIN_ANALYSIS_LENGTH || is_greeting(trimmed)
}

/// Classify the user's need
///
/// Trivial input never reaches the model. Any model or parse failure yields
/// the neutral "no relevant contract" analysis.
pub fn analyze_needs(llm: &dyn LlmClient, text: &str) -> NeedsAnalysis {
    if is_trivial_input(text) {
        tracing::debug!("Input is trivial, skipping needs analysis");
        return NeedsAnalysis::no_relevant_contract();
    }

    let reply = match llm.complete(&prompts::needs_analysis(text)) {
        Ok(reply) => reply,
        Err(e) => {
            tracing::warn!("Needs analysis call failed: {}", e);
            return NeedsAnalysis::no_relevant_contract();
        }
    };

    match parse_needs_reply(&reply) {
        Some(analysis) => {
            tracing::info!(
                "Needs analysis: category={}, type={}, concerns={:?}",
                analysis.contract_category,
                analysis.specific_type,
                analysis.special_concerns
            );
            analysis
        }
        None => {
            tracing::warn!("Needs analysis reply was not a JSON object");
            NeedsAnalysis::no_relevant_contract()
        }
    }
}

/// Parse and normalise a needs-analysis reply
pub fn parse_needs_reply(reply: &str) -> Option<NeedsAnalysis> {
    let object = match parse_json_object(reply) {
        ParseOutcome::Parsed(object) => object,
        ParseOutcome::Unparsable(_) => return None,
    };

    let field = |name: &str| -> String {
        match object.get(name) {
            Some(Value::String(s)) => s.trim().to_string(),
            _ => String::new(),
        }
    };

    let special_concerns = match object.get("special_concerns") {
        Some(Value::Array(items)) => items
            .iter()
            .map(shared_types::placeholder::coerce_value)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    };

    Some(normalize(NeedsAnalysis {
        contract_category: field("contract_category"),
        specific_type: field("specific_type"),
        special_concerns,
    }))
}

/// Map the many ways of saying "none" onto the canonical labels
pub fn normalize(mut analysis: NeedsAnalysis) -> NeedsAnalysis {
    if analysis.contract_category.trim().is_empty()
        || is_none_synonym(&analysis.contract_category, CATEGORY_NONE_SYNONYMS)
    {
        analysis.contract_category = NO_RELEVANT_CONTRACT.to_string();
    }
    if analysis.specific_type.trim().is_empty()
        || is_none_synonym(&analysis.specific_type, TYPE_NONE_SYNONYMS)
    {
        analysis.specific_type = NOT_APPLICABLE.to_string();
    }
    analysis
}
