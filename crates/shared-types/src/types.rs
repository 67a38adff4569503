/// Category label the needs analysis reports when the input is not about a contract
pub const NO_RELEVANT_CONTRACT: &str = "无相关合同";

/// Specific-type label used when no specific contract type was identified
pub const NOT_APPLICABLE: &str = "N/A";

/// Whether the needs analysis found a contract need in the input
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relevance {
    Relevant,
    NoRelevant,
}

impl Relevance {
    /// Empty category or the "no relevant contract" label means no relevance
    pub fn from_category(category: &str) -> Self {
        let category = category.trim();
        if category.is_empty() || category == NO_RELEVANT_CONTRACT {
            Relevance::NoRelevant
        } else {
            Relevance::Relevant
        }
    }

    pub fn is_relevant(self) -> bool {
        self == Relevance::Relevant
    }
}

/// Result of the needs analysis over the user's free text
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct NeedsAnalysis {
    #[serde(default)]
    pub contract_category: String,
    #[serde(default)]
    pub specific_type: String,
    #[serde(default)]
    pub special_concerns: Vec<String>,
}

impl NeedsAnalysis {
    /// The neutral answer used for short input, greetings and failures
    pub fn no_relevant_contract() -> Self {
        Self {
            contract_category: NO_RELEVANT_CONTRACT.to_string(),
            specific_type: NOT_APPLICABLE.to_string(),
            special_concerns: Vec::new(),
        }
    }

    pub fn relevance(&self) -> Relevance {
        Relevance::from_category(&self.contract_category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relevance_from_category() {
        assert_eq!(Relevance::from_category(""), Relevance::NoRelevant);
        assert_eq!(Relevance::from_category("无相关合同"), Relevance::NoRelevant);
        assert_eq!(Relevance::from_category("租赁类"), Relevance::Relevant);
    }

    #[test]
    fn test_neutral_analysis_is_not_relevant() {
        let analysis = NeedsAnalysis::no_relevant_contract();
        assert!(!analysis.relevance().is_relevant());
        assert_eq!(analysis.specific_type, "N/A");
    }
}
