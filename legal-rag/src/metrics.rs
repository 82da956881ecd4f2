//! Retrieval quality metrics and query analytics.
//!
//! All ranking metrics take a ranked list of document ids (most relevant
//! first) and the set of ids judged relevant for the query. Relevance is
//! binary.
//!
//! | Metric | Description |
//! |--------|-------------|
//! | R@k | Fraction of relevant ids found in the top k |
//! | P@k | Fraction of the top k that is relevant |
//! | RR | Inverse rank of the first relevant id (averaged over queries: MRR) |
//! | NDCG@k | Discounted gain over the top k, normalized by the ideal ordering |
//! | AP | Mean precision at each rank holding a relevant id (averaged: MAP) |
//!
//! A cutoff larger than the ranked list is clamped to its length. A cutoff
//! of zero is rejected.

use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::document::RetrievalResult;
use crate::error::{LegalRagError, Result};

/// Cutoffs reported when the caller does not choose any.
pub const DEFAULT_CUTOFFS: [usize; 4] = [1, 3, 5, 10];

fn check_k(k: usize) -> Result<()> {
    if k == 0 {
        return Err(LegalRagError::InvalidArgument("metric cutoff k must be at least 1".into()));
    }
    Ok(())
}

fn hits_at<S: AsRef<str>>(ranked: &[S], relevant: &HashSet<String>, k: usize) -> usize {
    ranked.iter().take(k).filter(|id| relevant.contains(id.as_ref())).count()
}

/// `|relevant ∩ top-k| / |relevant|`, or 0 when nothing is relevant.
pub fn recall_at_k<S: AsRef<str>>(ranked: &[S], relevant: &HashSet<String>, k: usize) -> Result<f64> {
    check_k(k)?;
    if relevant.is_empty() {
        return Ok(0.0);
    }
    Ok(hits_at(ranked, relevant, k) as f64 / relevant.len() as f64)
}

/// `|relevant ∩ top-k| / k`, with `k` clamped to the ranked list length.
pub fn precision_at_k<S: AsRef<str>>(
    ranked: &[S],
    relevant: &HashSet<String>,
    k: usize,
) -> Result<f64> {
    check_k(k)?;
    let k = k.min(ranked.len());
    if k == 0 {
        return Ok(0.0);
    }
    Ok(hits_at(ranked, relevant, k) as f64 / k as f64)
}

/// `1 / rank` of the first relevant id, or 0 when none is present.
pub fn reciprocal_rank<S: AsRef<str>>(ranked: &[S], relevant: &HashSet<String>) -> f64 {
    ranked
        .iter()
        .position(|id| relevant.contains(id.as_ref()))
        .map_or(0.0, |idx| 1.0 / (idx + 1) as f64)
}

/// Normalized discounted cumulative gain over binary relevance.
///
/// The ideal ordering places every relevant id first, so the ideal DCG sums
/// over `min(k, |relevant|)` ranks. Returns 0 when nothing is relevant.
pub fn ndcg_at_k<S: AsRef<str>>(ranked: &[S], relevant: &HashSet<String>, k: usize) -> Result<f64> {
    check_k(k)?;
    let discount = |rank: usize| 1.0 / ((rank + 2) as f64).log2();

    let dcg: f64 = ranked
        .iter()
        .take(k)
        .enumerate()
        .filter(|(_, id)| relevant.contains(id.as_ref()))
        .map(|(rank, _)| discount(rank))
        .sum();
    let ideal: f64 = (0..k.min(relevant.len())).map(discount).sum();

    if ideal == 0.0 {
        return Ok(0.0);
    }
    Ok(dcg / ideal)
}

/// Mean of the precision values at each rank where a relevant id occurs.
///
/// Returns 0 when no relevant id is retrieved.
pub fn average_precision<S: AsRef<str>>(ranked: &[S], relevant: &HashSet<String>) -> f64 {
    let mut hits = 0usize;
    let mut precision_sum = 0.0;
    for (rank, id) in ranked.iter().enumerate() {
        if relevant.contains(id.as_ref()) {
            hits += 1;
            precision_sum += hits as f64 / (rank + 1) as f64;
        }
    }
    if hits == 0 { 0.0 } else { precision_sum / hits as f64 }
}

/// Metrics at one cutoff.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CutoffMetrics {
    /// The cutoff.
    pub k: usize,
    /// Recall@k.
    pub recall: f64,
    /// Precision@k.
    pub precision: f64,
    /// NDCG@k.
    pub ndcg: f64,
}

/// Every metric for one query's ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingReport {
    /// Reciprocal rank of the first relevant id.
    pub reciprocal_rank: f64,
    /// Average precision.
    pub average_precision: f64,
    /// Per-cutoff metrics, in the order the cutoffs were requested.
    pub cutoffs: Vec<CutoffMetrics>,
}

/// Compute every metric for one ranking at each of `ks`.
pub fn evaluate_ranking<S: AsRef<str>>(
    ranked: &[S],
    relevant: &HashSet<String>,
    ks: &[usize],
) -> Result<RankingReport> {
    let cutoffs = ks
        .iter()
        .map(|&k| {
            Ok(CutoffMetrics {
                k,
                recall: recall_at_k(ranked, relevant, k)?,
                precision: precision_at_k(ranked, relevant, k)?,
                ndcg: ndcg_at_k(ranked, relevant, k)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(RankingReport {
        reciprocal_rank: reciprocal_rank(ranked, relevant),
        average_precision: average_precision(ranked, relevant),
        cutoffs,
    })
}

/// Metrics averaged over a set of queries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalEvaluation {
    /// Number of queries evaluated.
    pub query_count: usize,
    /// Mean reciprocal rank.
    pub mrr: f64,
    /// Mean average precision.
    pub map: f64,
    /// Per-cutoff means.
    pub cutoffs: Vec<CutoffMetrics>,
}

impl RetrievalEvaluation {
    /// Average reports that were computed with the same cutoffs.
    ///
    /// Reports whose cutoff lists differ are rejected with
    /// [`LegalRagError::InvalidArgument`].
    pub fn aggregate(reports: &[RankingReport]) -> Result<Self> {
        let Some(first) = reports.first() else {
            return Ok(Self { query_count: 0, mrr: 0.0, map: 0.0, cutoffs: Vec::new() });
        };
        let ks: Vec<usize> = first.cutoffs.iter().map(|c| c.k).collect();
        if let Some(idx) = reports.iter().position(|r| !r.cutoffs.iter().map(|c| c.k).eq(ks.iter().copied())) {
            return Err(LegalRagError::InvalidArgument(format!(
                "report {idx} was computed with different cutoffs than report 0 ({ks:?})"
            )));
        }

        let n = reports.len();
        let mean = |f: &dyn Fn(&RankingReport) -> f64| reports.iter().map(f).sum::<f64>() / n as f64;
        let cutoffs = ks
            .iter()
            .enumerate()
            .map(|(idx, &k)| CutoffMetrics {
                k,
                recall: mean(&|r| r.cutoffs[idx].recall),
                precision: mean(&|r| r.cutoffs[idx].precision),
                ndcg: mean(&|r| r.cutoffs[idx].ndcg),
            })
            .collect();

        Ok(Self {
            query_count: n,
            mrr: mean(&|r| r.reciprocal_rank),
            map: mean(&|r| r.average_precision),
            cutoffs,
        })
    }
}

/// Distance statistics for one retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DistanceSummary {
    /// Number of retrieved documents.
    pub total_retrieved: usize,
    /// Mean of `1 - distance`.
    pub mean_relevance: f64,
    /// Smallest distance (1.0 when empty).
    pub min_distance: f64,
    /// Largest distance (1.0 when empty).
    pub max_distance: f64,
}

/// Summarize the distances of a retrieval.
pub fn distance_summary(result: &RetrievalResult) -> DistanceSummary {
    if result.is_empty() {
        return DistanceSummary {
            total_retrieved: 0,
            mean_relevance: 0.0,
            min_distance: 1.0,
            max_distance: 1.0,
        };
    }
    let distances: Vec<f64> = result.iter().map(|r| f64::from(r.distance)).collect();
    DistanceSummary {
        total_retrieved: distances.len(),
        mean_relevance: distances.iter().map(|d| 1.0 - d).sum::<f64>() / distances.len() as f64,
        min_distance: distances.iter().copied().fold(f64::INFINITY, f64::min),
        max_distance: distances.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    }
}

/// One logged query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryLogEntry {
    /// The question asked.
    pub query: String,
    /// Number of documents retrieved.
    pub num_results: usize,
    /// Jurisdiction label used for the query (`federal`, `state` or `all`).
    pub jurisdiction: String,
    /// End-to-end latency.
    pub latency: Duration,
    /// When the query was logged.
    pub timestamp: DateTime<Utc>,
}

/// Aggregate latency and usage figures over logged queries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuerySummary {
    /// Number of logged queries.
    pub total_queries: usize,
    /// Mean latency.
    pub mean_latency: Duration,
    /// Median latency.
    pub median_latency: Duration,
    /// 95th percentile latency (linear interpolation).
    pub p95_latency: Duration,
    /// Mean documents retrieved per query.
    pub mean_results: f64,
    /// Queries per jurisdiction label.
    pub jurisdictions: BTreeMap<String, usize>,
}

/// In-process log of queries for a session.
#[derive(Debug, Clone, Default)]
pub struct QueryAnalytics {
    entries: Vec<QueryLogEntry>,
}

impl QueryAnalytics {
    /// An empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one query.
    pub fn log_query(
        &mut self,
        query: impl Into<String>,
        num_results: usize,
        jurisdiction: impl Into<String>,
        latency: Duration,
    ) {
        self.entries.push(QueryLogEntry {
            query: query.into(),
            num_results,
            jurisdiction: jurisdiction.into(),
            latency,
            timestamp: Utc::now(),
        });
    }

    /// Logged queries in order.
    pub fn entries(&self) -> &[QueryLogEntry] {
        &self.entries
    }

    /// Summary over every logged query, or `None` before the first one.
    pub fn summary(&self) -> Option<QuerySummary> {
        if self.entries.is_empty() {
            return None;
        }
        let n = self.entries.len();
        let mut latencies: Vec<f64> = self.entries.iter().map(|e| e.latency.as_secs_f64()).collect();
        latencies.sort_by(f64::total_cmp);

        let mut jurisdictions = BTreeMap::new();
        for entry in &self.entries {
            *jurisdictions.entry(entry.jurisdiction.clone()).or_insert(0) += 1;
        }

        Some(QuerySummary {
            total_queries: n,
            mean_latency: Duration::from_secs_f64(latencies.iter().sum::<f64>() / n as f64),
            median_latency: Duration::from_secs_f64(percentile(&latencies, 50.0)),
            p95_latency: Duration::from_secs_f64(percentile(&latencies, 95.0)),
            mean_results: self.entries.iter().map(|e| e.num_results as f64).sum::<f64>() / n as f64,
            jurisdictions,
        })
    }
}

/// Percentile of sorted, non-empty values with linear interpolation between ranks.
fn percentile(sorted: &[f64], pct: f64) -> f64 {
    let pos = (sorted.len() - 1) as f64 * pct / 100.0;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let weight = pos - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}
