//! Search module - Vector retrieval, category reranking and score adjustment
//!
//! This module provides:
//! - Dictionary-based contract-type detection for queries
//! - Exact vector retrieval with category-aware reranking
//! - Distance-to-score conversion with confidence tiers

pub mod contract_types;
pub mod retriever;
pub mod scoring;

pub use contract_types::ContractTypeExtractor;
pub use retriever::{Retriever, CATEGORY_BOOST};
pub use scoring::ScoreAdjuster;

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

use crate::embeddings::EmbedError;
use crate::index::IndexError;
use crate::text::input_length;

// Confidence thresholds on the final 0-100 score
pub const HIGH_CONFIDENCE_THRESHOLD: f32 = 80.0;
pub const MID_CONFIDENCE_THRESHOLD: f32 = 60.0;

/// Inputs shorter than this many characters are "extremely short"
pub const EXTREMELY_SHORT_LENGTH: usize = 10;

/// A recommendation query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    /// The user's text as typed
    pub raw_text: String,
    /// Keywords that are embedded and searched
    pub cleaned_keywords: String,
    /// Coarse labels detected in raw text and keywords together
    pub derived_contract_types: BTreeSet<String>,
    /// Character count of the trimmed raw text
    pub input_length: usize,
    pub is_extremely_short: bool,
}

impl Query {
    pub fn new(raw_text: impl Into<String>, cleaned_keywords: impl Into<String>) -> Self {
        let raw_text = raw_text.into();
        let cleaned_keywords = cleaned_keywords.into();
        let derived_contract_types = ContractTypeExtractor::new()
            .extract_types(&format!("{} {}", raw_text, cleaned_keywords));
        let input_length = input_length(&raw_text);

        Self {
            raw_text,
            cleaned_keywords,
            derived_contract_types,
            input_length,
            is_extremely_short: input_length < EXTREMELY_SHORT_LENGTH,
        }
    }
}

/// A retrieved template before scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchCandidate {
    pub template_id: String,
    /// Squared L2 distance reported by the index
    pub raw_distance: f32,
    /// Distance used for ranking (boosted when the category matched)
    pub distance: f32,
    pub category_matched: bool,
}

impl SearchCandidate {
    pub fn new(template_id: impl Into<String>, raw_distance: f32) -> Self {
        Self {
            template_id: template_id.into(),
            raw_distance,
            distance: raw_distance,
            category_matched: false,
        }
    }
}

/// Three-level confidence label, ordered `Low < Mid < High`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceTier {
    Low,
    Mid,
    High,
}

impl From<f32> for ConfidenceTier {
    fn from(score: f32) -> Self {
        if score >= HIGH_CONFIDENCE_THRESHOLD {
            ConfidenceTier::High
        } else if score >= MID_CONFIDENCE_THRESHOLD {
            ConfidenceTier::Mid
        } else {
            ConfidenceTier::Low
        }
    }
}

impl ConfidenceTier {
    /// Label shown to end users
    pub fn label(&self) -> &'static str {
        match self {
            ConfidenceTier::High => "高",
            ConfidenceTier::Mid => "中",
            ConfidenceTier::Low => "低",
        }
    }
}

/// A scored recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    pub template_id: String,
    /// Final score in `[0, 100]`
    pub score: f32,
    pub confidence: ConfidenceTier,
}

impl RankedResult {
    /// Score rounded to one decimal place
    pub fn display_score(&self) -> f32 {
        (self.score * 10.0).round() / 10.0
    }
}

/// How category-matched candidates are merged with the rest
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RerankMode {
    /// Every matched candidate ahead of every unmatched candidate, each group
    /// ascending by effective distance
    #[default]
    MatchedFirst,
    /// One ordering on effective distance; a boosted candidate outranks an
    /// unmatched one only when its boosted distance is smaller
    Interleaved,
}

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("Embedding failed: {0}")]
    Embed(#[from] EmbedError),

    #[error("Index search failed: {0}")]
    Index(#[from] IndexError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_derivation() {
        let query = Query::new("我要买一辆二手车", "二手车 买卖合同");
        assert_eq!(query.input_length, 8);
        assert!(query.is_extremely_short);
        assert!(query.derived_contract_types.contains("汽车"));
        assert!(query.derived_contract_types.contains("买卖"));
    }

    #[test]
    fn test_query_length_uses_trimmed_chars() {
        let query = Query::new("  我需要一份房屋租赁合同，租期两年  ", "");
        assert_eq!(query.input_length, 16);
        assert!(!query.is_extremely_short);
    }

    #[test]
    fn test_confidence_thresholds() {
        assert_eq!(ConfidenceTier::from(80.0), ConfidenceTier::High);
        assert_eq!(ConfidenceTier::from(79.99), ConfidenceTier::Mid);
        assert_eq!(ConfidenceTier::from(60.0), ConfidenceTier::Mid);
        assert_eq!(ConfidenceTier::from(59.9), ConfidenceTier::Low);
        assert!(ConfidenceTier::High > ConfidenceTier::Mid);
        assert!(ConfidenceTier::Mid > ConfidenceTier::Low);
    }

    #[test]
    fn test_display_score_rounds() {
        let result = RankedResult {
            template_id: "x".to_string(),
            score: 72.349,
            confidence: ConfidenceTier::Mid,
        };
        assert_eq!(result.display_score(), 72.3);
    }

    #[test]
    fn test_confidence_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ConfidenceTier::High).unwrap(),
            "\"high\""
        );
    }
}
