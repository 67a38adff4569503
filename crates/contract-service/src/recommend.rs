//! Recommend pipeline: free text in, ranked templates out

use serde::Serialize;

use corpus_core::text::input_length;
use corpus_core::{clean_text_for_legal, Query, RankedResult};
use shared_types::{NeedsAnalysis, Relevance, NOT_APPLICABLE};

use crate::context::ContractService;
use crate::error::ServiceError;
use crate::progress::{Progress, ProgressFn};
use corpus_core::search::EXTREMELY_SHORT_LENGTH;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RecommendationOutcome {
    Completed {
        recommendations: Vec<RankedResult>,
        analysis: NeedsAnalysis,
    },
    /// Blank input; nothing was analyzed
    EmptyInput,
    /// Not about a contract and too short to search on anyway
    NoRelevantContract,
}

impl RecommendationOutcome {
    pub fn recommendations(&self) -> &[RankedResult] {
        match self {
            RecommendationOutcome::Completed {
                recommendations, ..
            } => recommendations,
            _ => &[],
        }
    }
}

/// Keywords plus the analyzed category and specific type, when meaningful
fn enhance_keywords(keywords: &str, analysis: &NeedsAnalysis) -> String {
    let mut enhanced = keywords.to_string();
    if analysis.relevance().is_relevant() {
        enhanced.push(' ');
        enhanced.push_str(&analysis.contract_category);
    }
    let specific = analysis.specific_type.trim();
    if !specific.is_empty() && specific != NOT_APPLICABLE {
        enhanced.push(' ');
        enhanced.push_str(specific);
    }
    enhanced
}

impl ContractService {
    /// Recommend templates of one contract type for the user's description
    ///
    /// Fails only for an unknown contract type; analysis and retrieval
    /// failures lower the quality of the result instead.
    pub fn recommend(
        &self,
        input: &str,
        contract_type: &str,
        progress: ProgressFn<'_>,
    ) -> Result<RecommendationOutcome, ServiceError> {
        progress(Progress::new("started", 5));

        if input.trim().is_empty() {
            tracing::info!("Empty input, nothing to recommend");
            return Ok(RecommendationOutcome::EmptyInput);
        }
        let corpus = self.catalog.get(contract_type)?;

        let length = input_length(input);
        let is_extremely_short = length < EXTREMELY_SHORT_LENGTH;
        if is_extremely_short {
            tracing::info!("Extremely short input ({} chars), recommendations will be weak", length);
        }

        let analysis = self.analysis.analyze_needs(input);
        let relevance = analysis.relevance();
        if relevance == Relevance::NoRelevant && is_extremely_short {
            tracing::info!("No relevant contract and extremely short input");
            return Ok(RecommendationOutcome::NoRelevantContract);
        }
        progress(Progress::new("needs analyzed", 15));

        let keywords = self.analysis.extract_keywords(input);
        let cleaned = clean_text_for_legal(&enhance_keywords(&keywords, &analysis));
        tracing::debug!("Enhanced query keywords: {}", cleaned);
        let query = Query::new(input, cleaned);
        progress(Progress::new("keywords extracted", 35));

        let candidates = self
            .retriever
            .advanced_search(&query, corpus, self.config.top_k);
        progress(Progress::new("searched", 85));

        let recommendations = self.scorer.rank(&candidates, &query, relevance);
        tracing::info!(
            "Found {} recommendations in {}",
            recommendations.len(),
            contract_type
        );
        progress(Progress::new("completed", 100));

        Ok(RecommendationOutcome::Completed {
            recommendations,
            analysis,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn analysis(category: &str, specific: &str) -> NeedsAnalysis {
        NeedsAnalysis {
            contract_category: category.to_string(),
            specific_type: specific.to_string(),
            special_concerns: vec![],
        }
    }

    #[test]
    fn test_enhance_keywords() {
        assert_eq!(
            enhance_keywords("二手车;过户", &analysis("买卖合同", "二手车买卖")),
            "二手车;过户 买卖合同 二手车买卖"
        );
        assert_eq!(
            enhance_keywords("二手车", &analysis("买卖合同", "N/A")),
            "二手车 买卖合同"
        );
        assert_eq!(
            enhance_keywords("二手车", &NeedsAnalysis::no_relevant_contract()),
            "二手车"
        );
    }

    #[test]
    fn test_outcome_recommendations() {
        assert!(RecommendationOutcome::EmptyInput.recommendations().is_empty());
        assert!(RecommendationOutcome::NoRelevantContract
            .recommendations()
            .is_empty());
    }
}
