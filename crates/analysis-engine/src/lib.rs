//! Analysis Engine - Language-model backed interpretation of user input
//!
//! Every entry point degrades to a neutral value (empty map, empty string,
//! "no relevant contract") instead of failing.

pub mod extraction;
pub mod keywords;
pub mod llm;
pub mod needs;
pub mod patterns;
pub mod prompts;
pub mod repair;

#[cfg(feature = "dashscope")]
pub mod dashscope;

use std::sync::Arc;

use shared_types::{NeedsAnalysis, PlaceholderMap};

pub use llm::{ChatMessage, LlmClient, LlmError, Role, UnconfiguredClient};
pub use repair::{parse_json_object, ParseOutcome, RepairStage};

/// AnalysisEngine entry point
#[derive(Clone)]
pub struct AnalysisEngine {
    llm: Arc<dyn LlmClient>,
}

impl AnalysisEngine {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    pub fn analyze_needs(&self, text: &str) -> NeedsAnalysis {
        needs::analyze_needs(self.llm.as_ref(), text)
    }

    pub fn extract_keywords(&self, text: &str) -> String {
        keywords::extract_keywords(self.llm.as_ref(), text)
    }

    pub fn extract_placeholder_values(&self, text: &str, keys: &[String]) -> PlaceholderMap {
        extraction::extract_placeholder_values(self.llm.as_ref(), text, keys)
    }
}

impl Default for AnalysisEngine {
    fn default() -> Self {
        Self::new(Arc::new(UnconfiguredClient))
    }
}
