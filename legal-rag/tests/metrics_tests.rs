//! Ranking metric properties.

use std::collections::HashSet;

use legal_rag::metrics::{
    DEFAULT_CUTOFFS, average_precision, evaluate_ranking, ndcg_at_k, precision_at_k, recall_at_k,
    reciprocal_rank,
};
use legal_rag::{LegalRagError, RetrievalEvaluation};
use proptest::prelude::*;

fn set(ids: &[&str]) -> HashSet<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

#[test]
fn perfect_ranking_has_unit_ndcg() {
    let ndcg = ndcg_at_k(&["A", "B", "C"], &set(&["A", "B"]), 2).unwrap();
    assert!((ndcg - 1.0).abs() < 1e-12);
}

#[test]
fn reciprocal_rank_of_second_hit() {
    assert_eq!(reciprocal_rank(&["X", "Y", "Z"], &set(&["Y"])), 0.5);
    assert_eq!(reciprocal_rank(&["X", "Z"], &set(&["Y"])), 0.0);
}

#[test]
fn zero_cutoff_is_rejected() {
    let err = recall_at_k(&["A"], &set(&["A"]), 0).unwrap_err();
    assert!(matches!(err, LegalRagError::InvalidArgument(_)));
    assert!(precision_at_k(&["A"], &set(&["A"]), 0).is_err());
    assert!(ndcg_at_k(&["A"], &set(&["A"]), 0).is_err());
}

#[test]
fn empty_relevant_set_scores_zero() {
    let relevant = HashSet::new();
    assert_eq!(recall_at_k(&["A"], &relevant, 1).unwrap(), 0.0);
    assert_eq!(ndcg_at_k(&["A"], &relevant, 1).unwrap(), 0.0);
    assert_eq!(average_precision(&["A"], &relevant), 0.0);
}

#[test]
fn aggregate_averages_queries() {
    let first = evaluate_ranking(&["A", "B"], &set(&["A"]), &DEFAULT_CUTOFFS).unwrap();
    let second = evaluate_ranking(&["B", "A"], &set(&["A"]), &DEFAULT_CUTOFFS).unwrap();
    let summary = RetrievalEvaluation::aggregate(&[first, second]).unwrap();

    assert_eq!(summary.query_count, 2);
    assert!((summary.mrr - 0.75).abs() < 1e-12);
    assert_eq!(summary.cutoffs[0].k, 1);
    assert!((summary.cutoffs[0].recall - 0.5).abs() < 1e-12);
}

fn arb_ranking() -> impl Strategy<Value = (Vec<String>, HashSet<String>)> {
    (
        proptest::sample::subsequence((0..15).map(|i| format!("d{i}")).collect::<Vec<_>>(), 0..15)
            .prop_shuffle(),
        proptest::collection::hash_set((0..15).prop_map(|i| format!("d{i}")), 0..8),
    )
}

proptest! {
    #[test]
    fn recall_is_monotone_in_k((ranked, relevant) in arb_ranking(), k in 1usize..15) {
        let at_k = recall_at_k(&ranked, &relevant, k).unwrap();
        let at_next = recall_at_k(&ranked, &relevant, k + 1).unwrap();
        prop_assert!(at_k <= at_next);
    }

    #[test]
    fn metrics_stay_in_unit_interval((ranked, relevant) in arb_ranking(), k in 1usize..20) {
        for value in [
            recall_at_k(&ranked, &relevant, k).unwrap(),
            precision_at_k(&ranked, &relevant, k).unwrap(),
            ndcg_at_k(&ranked, &relevant, k).unwrap(),
            reciprocal_rank(&ranked, &relevant),
            average_precision(&ranked, &relevant),
        ] {
            prop_assert!((0.0..=1.0 + 1e-9).contains(&value), "{value}");
        }
    }
}
