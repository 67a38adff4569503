//! Vector retrieval with category-aware reranking
//!
//! # Algorithm
//!
//! 1. Embed the query keywords and fetch `min(2k, corpus size)` nearest
//!    templates, leaving headroom for the rerank.
//! 2. Drop any hit whose position has no template identifier.
//! 3. If the query mentions no coarse contract type, return the top `k` as is.
//! 4. Otherwise multiply the distance of every candidate whose category tag
//!    contains one of the query's types by [`CATEGORY_BOOST`], reorder
//!    according to the [`RerankMode`] and keep the top `k`.
//!
//! The default [`RerankMode::MatchedFirst`] moves matched candidates ahead
//! before truncating, so a matched template survives the cut to `k` even when
//! `k` unmatched ones are closer. The final order is still decided by score:
//! a matched candidate at raw distance 1.0 (boosted 0.7) scores below an
//! unmatched one at 0.5.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::catalog::ContractCorpus;
use crate::category::CategoryMap;
use crate::embeddings::Embedder;
use crate::search::{Query, RerankMode, RetrievalError, SearchCandidate};

/// Distance multiplier for candidates whose category matches the query
pub const CATEGORY_BOOST: f32 = 0.7;

/// Searches one contract type's corpus for a query
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    mode: RerankMode,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            mode: RerankMode::default(),
        }
    }

    pub fn with_mode(mut self, mode: RerankMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> RerankMode {
        self.mode
    }

    /// Best `k` candidates, best first
    ///
    /// Never fails: any embedding or index error is logged and yields an
    /// empty list, which callers treat as "no recommendation".
    pub fn advanced_search(
        &self,
        query: &Query,
        corpus: &ContractCorpus,
        k: usize,
    ) -> Vec<SearchCandidate> {
        match self.try_advanced_search(query, corpus, k) {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::error!("Search in {} failed: {}", corpus.contract_type, e);
                Vec::new()
            }
        }
    }

    pub fn try_advanced_search(
        &self,
        query: &Query,
        corpus: &ContractCorpus,
        k: usize,
    ) -> Result<Vec<SearchCandidate>, RetrievalError> {
        corpus.check_consistency();

        let corpus_size = corpus.templates.len();
        let fetch = k.saturating_mul(2).min(corpus_size);
        if fetch == 0 {
            return Ok(Vec::new());
        }

        let vector = self.embedder.embed(&query.cleaned_keywords)?;
        let neighbors = corpus.index.search(&vector, fetch)?;

        let mut candidates = Vec::with_capacity(neighbors.len());
        for neighbor in neighbors {
            match corpus.templates.get(neighbor.index) {
                Some(template_id) => {
                    candidates.push(SearchCandidate::new(template_id.clone(), neighbor.distance))
                }
                None => tracing::warn!(
                    "Skipping index {} outside corpus range [0, {})",
                    neighbor.index,
                    corpus_size
                ),
            }
        }

        tracing::debug!(
            "Retrieved {} candidates, query types {:?}",
            candidates.len(),
            query.derived_contract_types
        );

        Ok(rerank(
            candidates,
            &query.derived_contract_types,
            &corpus.categories,
            k,
            self.mode,
        ))
    }
}

/// Boost category-matched candidates and keep the best `k`
///
/// `candidates` must be ascending by raw distance. With no contract types the
/// order is left untouched.
pub fn rerank(
    mut candidates: Vec<SearchCandidate>,
    contract_types: &BTreeSet<String>,
    categories: &CategoryMap,
    k: usize,
    mode: RerankMode,
) -> Vec<SearchCandidate> {
    if contract_types.is_empty() {
        candidates.truncate(k);
        return candidates;
    }

    for candidate in &mut candidates {
        if categories.matches_any(&candidate.template_id, contract_types) {
            candidate.category_matched = true;
            candidate.distance = candidate.raw_distance * CATEGORY_BOOST;
        }
    }

    match mode {
        RerankMode::Interleaved => candidates.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then_with(|| b.category_matched.cmp(&a.category_matched))
        }),
        RerankMode::MatchedFirst => candidates.sort_by(|a, b| {
            b.category_matched
                .cmp(&a.category_matched)
                .then_with(|| a.distance.total_cmp(&b.distance))
        }),
    }

    candidates.truncate(k);
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::EmbedError;
    use crate::index::EmbeddingIndex;
    use crate::search::ScoreAdjuster;
    use pretty_assertions::assert_eq;
    use shared_types::Relevance;

    /// Embeds every text to the same vector
    struct FixedEmbedder(Vec<f32>);

    impl Embedder for FixedEmbedder {
        fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbedError> {
            Ok(self.0.clone())
        }

        fn dimension(&self) -> usize {
            self.0.len()
        }
    }

    struct FailingEmbedder;

    impl Embedder for FailingEmbedder {
        fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbedError> {
            Err(EmbedError::Backend("model unavailable".to_string()))
        }

        fn dimension(&self) -> usize {
            2
        }
    }

    fn types(labels: &[&str]) -> BTreeSet<String> {
        labels.iter().map(|s| s.to_string()).collect()
    }

    fn ids(candidates: &[SearchCandidate]) -> Vec<&str> {
        candidates.iter().map(|c| c.template_id.as_str()).collect()
    }

    /// Templates placed on the x axis so distance from the origin is x^2
    fn corpus(entries: &[(&str, f32, &str)]) -> ContractCorpus {
        let vectors: Vec<Vec<f32>> = entries.iter().map(|(_, x, _)| vec![*x, 0.0]).collect();
        ContractCorpus {
            contract_type: "测试".to_string(),
            templates: entries.iter().map(|(id, _, _)| id.to_string()).collect(),
            index: EmbeddingIndex::build(&vectors).unwrap(),
            categories: entries.iter().map(|(id, _, cat)| (*id, *cat)).collect(),
        }
    }

    fn retriever(mode: RerankMode) -> Retriever {
        Retriever::new(Arc::new(FixedEmbedder(vec![0.0, 0.0]))).with_mode(mode)
    }

    #[test]
    fn test_boost_is_a_nudge_not_an_override() {
        let categories: CategoryMap = [("A", "买卖合同"), ("B", "租赁合同")].into_iter().collect();
        let candidates = vec![SearchCandidate::new("B", 0.5), SearchCandidate::new("A", 1.0)];

        let ranked = rerank(
            candidates,
            &types(&["买卖"]),
            &categories,
            5,
            RerankMode::Interleaved,
        );

        assert_eq!(ids(&ranked), vec!["B", "A"]);
        assert_eq!(ranked[0].distance, 0.5);
        assert!(!ranked[0].category_matched);
        assert!((ranked[1].distance - 0.7).abs() < 1e-6);
        assert_eq!(ranked[1].raw_distance, 1.0);
        assert!(ranked[1].category_matched);
    }

    #[test]
    fn test_boost_flips_close_candidates() {
        let categories: CategoryMap = [("A", "买卖合同"), ("B", "租赁合同")].into_iter().collect();
        let candidates = vec![SearchCandidate::new("B", 0.6), SearchCandidate::new("A", 0.8)];

        let ranked = rerank(
            candidates,
            &types(&["买卖"]),
            &categories,
            5,
            RerankMode::Interleaved,
        );
        // 0.8 * 0.7 = 0.56 < 0.6
        assert_eq!(ids(&ranked), vec!["A", "B"]);
    }

    #[test]
    fn test_matched_first_mode_puts_matches_ahead() {
        let categories: CategoryMap = [("A", "买卖合同"), ("B", "租赁合同"), ("C", "买卖;汽车")]
            .into_iter()
            .collect();
        let candidates = vec![
            SearchCandidate::new("B", 0.5),
            SearchCandidate::new("A", 1.0),
            SearchCandidate::new("C", 2.0),
        ];

        let ranked = rerank(
            candidates,
            &types(&["买卖"]),
            &categories,
            5,
            RerankMode::MatchedFirst,
        );
        assert_eq!(ids(&ranked), vec!["A", "C", "B"]);
    }

    #[test]
    fn test_no_types_keeps_raw_order() {
        let categories: CategoryMap = [("A", "买卖合同")].into_iter().collect();
        let candidates = vec![
            SearchCandidate::new("B", 0.5),
            SearchCandidate::new("A", 1.0),
            SearchCandidate::new("C", 2.0),
        ];

        let ranked = rerank(
            candidates,
            &BTreeSet::new(),
            &categories,
            2,
            RerankMode::Interleaved,
        );
        assert_eq!(ids(&ranked), vec!["B", "A"]);
        assert!(ranked.iter().all(|c| c.distance == c.raw_distance));
    }

    #[test]
    fn test_advanced_search_end_to_end() {
        let corpus = corpus(&[
            ("房屋租赁合同", 0.5, "租赁合同"),
            ("二手车买卖合同", 0.9, "买卖合同"),
            ("运输合同", 3.0, "运输合同"),
        ]);
        let query = Query::new("我想卖掉我的二手车，需要一份合同", "二手车 出售");

        let results = retriever(RerankMode::Interleaved).advanced_search(&query, &corpus, 2);
        // 0.81 * 0.7 = 0.567 > 0.25, so the lease stays first
        assert_eq!(ids(&results), vec!["房屋租赁合同", "二手车买卖合同"]);
        assert!(results[1].category_matched);
    }

    #[test]
    fn test_default_mode_keeps_matched_beyond_k() {
        // six unmatched templates closer than the single matched one
        let mut entries: Vec<(String, f32, &str)> = (1..=6)
            .map(|i| (format!("u{}", i - 1), (i as f32 / 10.0).sqrt(), "租赁合同"))
            .collect();
        entries.push(("m".to_string(), 2.0f32.sqrt(), "买卖合同"));
        let entries: Vec<(&str, f32, &str)> = entries
            .iter()
            .map(|(id, x, cat)| (id.as_str(), *x, *cat))
            .collect();
        let corpus = corpus(&entries);
        let query = Query::new("我想卖掉我的二手车，需要一份合同", "二手车 出售");
        assert!(query.derived_contract_types.contains("买卖"));

        let default = Retriever::new(Arc::new(FixedEmbedder(vec![0.0, 0.0])));
        assert_eq!(default.mode(), RerankMode::MatchedFirst);
        let results = default.advanced_search(&query, &corpus, 5);
        assert_eq!(ids(&results), vec!["m", "u0", "u1", "u2", "u3"]);
        assert!(results[0].category_matched);
        assert!((results[0].distance - 1.4).abs() < 1e-4);

        let interleaved = retriever(RerankMode::Interleaved).advanced_search(&query, &corpus, 5);
        assert_eq!(ids(&interleaved), vec!["u0", "u1", "u2", "u3", "u4"]);
    }

    #[test]
    fn test_scoring_decides_final_order() {
        let categories: CategoryMap = [("A", "买卖合同"), ("B", "租赁合同")].into_iter().collect();
        let candidates = vec![SearchCandidate::new("B", 0.5), SearchCandidate::new("A", 1.0)];
        let query = Query::new("字".repeat(50), "");

        let reranked = rerank(
            candidates,
            &types(&["买卖"]),
            &categories,
            5,
            RerankMode::default(),
        );
        assert_eq!(ids(&reranked), vec!["A", "B"]);

        let ranked = ScoreAdjuster::new().rank(&reranked, &query, Relevance::Relevant);
        let ranked_ids: Vec<&str> = ranked.iter().map(|r| r.template_id.as_str()).collect();
        assert_eq!(ranked_ids, vec!["B", "A"]);
        // base 50 and 30, both below the cliff
        assert!((ranked[0].score - 50.0 * 0.7).abs() < 1e-3);
        assert!((ranked[1].score - 30.0 * 0.7).abs() < 1e-3);
    }

    #[test]
    fn test_out_of_range_hits_are_discarded() {
        let mut corpus = corpus(&[("a", 1.0, ""), ("b", 2.0, ""), ("c", 0.0, "")]);
        corpus.templates.truncate(2);
        assert!(!corpus.check_consistency());

        let query = Query::new("没有类型信息的输入文本内容", "内容");
        let results = retriever(RerankMode::Interleaved).advanced_search(&query, &corpus, 5);
        assert_eq!(ids(&results), vec!["a"]);
    }

    #[test]
    fn test_fetches_at_most_twice_k() {
        let corpus = corpus(&[
            ("a", 1.0, ""),
            ("b", 2.0, ""),
            ("c", 3.0, ""),
            ("d", 4.0, ""),
            ("e", 5.0, ""),
        ]);
        let query = Query::new("一段不含任何类型触发词的文字", "文字");
        let results = retriever(RerankMode::Interleaved).advanced_search(&query, &corpus, 1);
        assert_eq!(ids(&results), vec!["a"]);
        assert!(retriever(RerankMode::Interleaved)
            .advanced_search(&query, &corpus, 0)
            .is_empty());
    }

    #[test]
    fn test_failures_degrade_to_empty() {
        let corpus = corpus(&[("a", 1.0, "")]);
        let query = Query::new("任意输入", "任意");

        let failing = Retriever::new(Arc::new(FailingEmbedder));
        assert!(failing.advanced_search(&query, &corpus, 5).is_empty());
        assert!(matches!(
            failing.try_advanced_search(&query, &corpus, 5),
            Err(RetrievalError::Embed(_))
        ));

        let wrong_dim = Retriever::new(Arc::new(FixedEmbedder(vec![0.0; 3])));
        assert!(wrong_dim.advanced_search(&query, &corpus, 5).is_empty());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_candidates() -> impl Strategy<Value = Vec<(f32, bool)>> {
        prop::collection::vec((0.0f32..10.0, any::<bool>()), 0..20)
    }

    fn build(raw: &[(f32, bool)]) -> (Vec<SearchCandidate>, CategoryMap) {
        let mut sorted = raw.to_vec();
        sorted.sort_by(|a, b| a.0.total_cmp(&b.0));
        let candidates = sorted
            .iter()
            .enumerate()
            .map(|(i, (d, _))| SearchCandidate::new(format!("t{}", i), *d))
            .collect();
        let categories = sorted
            .iter()
            .enumerate()
            .map(|(i, (_, matched))| {
                (
                    format!("t{}", i),
                    if *matched { "买卖合同" } else { "租赁合同" },
                )
            })
            .collect();
        (candidates, categories)
    }

    proptest! {
        #[test]
        fn boosted_distance_never_exceeds_raw(raw in arb_candidates(), k in 0usize..25) {
            let (candidates, categories) = build(&raw);
            let labels: BTreeSet<String> = ["买卖".to_string()].into_iter().collect();
            for mode in [RerankMode::Interleaved, RerankMode::MatchedFirst] {
                let ranked = rerank(candidates.clone(), &labels, &categories, k, mode);
                prop_assert!(ranked.len() <= k);
                for c in &ranked {
                    prop_assert!(c.distance <= c.raw_distance);
                    if !c.category_matched {
                        prop_assert_eq!(c.distance, c.raw_distance);
                    }
                }
            }
        }

        #[test]
        fn interleaved_is_ascending_by_effective_distance(raw in arb_candidates()) {
            let (candidates, categories) = build(&raw);
            let labels: BTreeSet<String> = ["买卖".to_string()].into_iter().collect();
            let ranked = rerank(candidates, &labels, &categories, usize::MAX, RerankMode::Interleaved);
            prop_assert!(ranked.windows(2).all(|w| w[0].distance <= w[1].distance));
        }
    }
}
