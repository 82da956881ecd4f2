//! User feedback: an append-only JSONL log of ratings, plus analytics over it.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::corpus::{read_lines, write_records};
use crate::document::truncate_chars;
use crate::error::{LegalRagError, Result};
use crate::pipeline::RagAnswer;

/// Characters of the answer kept in a feedback record.
const STORED_ANSWER_CHARS: usize = 500;

/// Ratings at or below this are treated as low.
pub const LOW_RATING_THRESHOLD: u8 = 2;

/// One stored rating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    /// When the feedback was submitted.
    pub timestamp: DateTime<Utc>,
    /// The question asked.
    pub question: String,
    /// Leading part of the answer.
    pub answer: String,
    /// Rating from 1 to 5.
    pub rating: u8,
    /// Free-text comment, possibly empty.
    #[serde(default)]
    pub comments: String,
    /// Jurisdiction label used for the question: `federal`, `state` or `all`.
    pub jurisdiction: String,
    /// Number of sources shown with the answer.
    pub num_sources: usize,
    /// Citations of the sources shown with the answer.
    #[serde(default)]
    pub source_citations: Vec<String>,
}

/// A rating as entered by a user, before validation.
#[derive(Debug, Clone, Default)]
pub struct FeedbackSubmission {
    /// The question asked.
    pub question: String,
    /// The answer being rated.
    pub answer: String,
    /// Rating from 1 to 5.
    pub rating: u8,
    /// Optional comment.
    pub comments: String,
    /// Jurisdiction label used for the question.
    pub jurisdiction: String,
    /// Citations of the sources shown with the answer.
    pub source_citations: Vec<String>,
}

impl FeedbackSubmission {
    /// A submission rating a pipeline answer.
    pub fn for_answer(answer: &RagAnswer, rating: u8, comments: impl Into<String>) -> Self {
        Self {
            question: answer.question.clone(),
            answer: answer.answer.clone(),
            rating,
            comments: comments.into(),
            jurisdiction: answer.filter.map_or("all", |j| j.as_str()).to_string(),
            source_citations: answer.citations.iter().map(|c| c.citation.clone()).collect(),
        }
    }
}

/// Aggregate rating figures.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackStats {
    /// Number of records.
    pub total: usize,
    /// Mean rating, 0 when empty.
    pub average: f64,
    /// Upper median rating, 0 when empty.
    pub median: u8,
    /// Count per rating 1 to 5.
    pub distribution: BTreeMap<u8, usize>,
    /// Records with a non-blank comment.
    pub comments: usize,
    /// Ratings of 4 or 5.
    pub positive: usize,
    /// Ratings of 1 or 2.
    pub negative: usize,
    /// Ratings of 3.
    pub neutral: usize,
}

impl FeedbackStats {
    /// Compute statistics over `records`.
    pub fn from_records(records: &[FeedbackRecord]) -> Self {
        let mut distribution: BTreeMap<u8, usize> = (1..=5).map(|r| (r, 0)).collect();
        for record in records {
            *distribution.entry(record.rating).or_insert(0) += 1;
        }

        let mut ratings: Vec<u8> = records.iter().map(|r| r.rating).collect();
        ratings.sort_unstable();
        let total = ratings.len();
        let average = if total == 0 {
            0.0
        } else {
            ratings.iter().map(|&r| f64::from(r)).sum::<f64>() / total as f64
        };

        Self {
            total,
            average,
            median: ratings.get(total / 2).copied().unwrap_or(0),
            distribution,
            comments: records.iter().filter(|r| !r.comments.trim().is_empty()).count(),
            positive: ratings.iter().filter(|&&r| r >= 4).count(),
            negative: ratings.iter().filter(|&&r| r <= 2).count(),
            neutral: ratings.iter().filter(|&&r| r == 3).count(),
        }
    }
}

#[derive(Serialize)]
struct FeedbackExport<'a> {
    export_date: DateTime<Utc>,
    statistics: FeedbackStats,
    feedback_records: &'a [FeedbackRecord],
    by_jurisdiction: BTreeMap<String, f64>,
    low_rated_questions: Vec<FeedbackRecord>,
}

/// Append-only feedback log backed by a JSONL file.
#[derive(Debug, Clone)]
pub struct FeedbackStore {
    path: PathBuf,
}

impl FeedbackStore {
    /// Open the log at `path`, creating it and its parent directories if absent.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { path })
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Validate and append a submission.
    ///
    /// # Errors
    ///
    /// Returns [`LegalRagError::InvalidArgument`] when the rating is outside 1–5.
    pub fn submit(&self, submission: FeedbackSubmission) -> Result<FeedbackRecord> {
        if !(1..=5).contains(&submission.rating) {
            return Err(LegalRagError::InvalidArgument(format!(
                "rating must be between 1 and 5, got {}",
                submission.rating
            )));
        }

        let record = FeedbackRecord {
            timestamp: Utc::now(),
            question: submission.question,
            answer: truncate_chars(&submission.answer, STORED_ANSWER_CHARS),
            rating: submission.rating,
            comments: submission.comments,
            jurisdiction: submission.jurisdiction,
            num_sources: submission.source_citations.len(),
            source_citations: submission.source_citations,
        };

        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        write_records(file, std::slice::from_ref(&record))?;
        info!(rating = record.rating, jurisdiction = %record.jurisdiction, "recorded feedback");
        Ok(record)
    }

    /// Every stored record in submission order.
    pub fn load_all(&self) -> Result<Vec<FeedbackRecord>> {
        read_lines(&self.path)
    }

    /// Statistics over every stored record.
    pub fn statistics(&self) -> Result<FeedbackStats> {
        Ok(FeedbackStats::from_records(&self.load_all()?))
    }

    /// Records rated at or below `threshold`, lowest first.
    pub fn low_rated(&self, threshold: u8) -> Result<Vec<FeedbackRecord>> {
        Ok(low_rated(self.load_all()?, threshold))
    }

    /// Non-empty comments from records rated at or below `threshold`.
    pub fn top_issues(&self, threshold: u8) -> Result<Vec<String>> {
        Ok(self
            .low_rated(threshold)?
            .into_iter()
            .map(|r| r.comments)
            .filter(|c| !c.trim().is_empty())
            .collect())
    }

    /// Records grouped by jurisdiction label.
    pub fn by_jurisdiction(&self) -> Result<BTreeMap<String, Vec<FeedbackRecord>>> {
        Ok(group_by_jurisdiction(self.load_all()?))
    }

    /// Mean rating per jurisdiction label.
    pub fn average_by_jurisdiction(&self) -> Result<BTreeMap<String, f64>> {
        Ok(average_by_jurisdiction(&self.load_all()?))
    }

    /// Write records, statistics and breakdowns to `output` as pretty JSON.
    pub fn export(&self, output: impl AsRef<Path>) -> Result<()> {
        let records = self.load_all()?;
        let export = FeedbackExport {
            export_date: Utc::now(),
            statistics: FeedbackStats::from_records(&records),
            feedback_records: &records,
            by_jurisdiction: average_by_jurisdiction(&records),
            low_rated_questions: low_rated(records.clone(), LOW_RATING_THRESHOLD),
        };
        serde_json::to_writer_pretty(File::create(output.as_ref())?, &export)?;
        info!(path = %output.as_ref().display(), count = records.len(), "exported feedback");
        Ok(())
    }
}

fn low_rated(records: Vec<FeedbackRecord>, threshold: u8) -> Vec<FeedbackRecord> {
    let mut low: Vec<FeedbackRecord> = records.into_iter().filter(|r| r.rating <= threshold).collect();
    low.sort_by_key(|r| r.rating);
    low
}

fn group_by_jurisdiction(records: Vec<FeedbackRecord>) -> BTreeMap<String, Vec<FeedbackRecord>> {
    let mut groups: BTreeMap<String, Vec<FeedbackRecord>> = BTreeMap::new();
    for record in records {
        groups.entry(record.jurisdiction.clone()).or_default().push(record);
    }
    groups
}

fn average_by_jurisdiction(records: &[FeedbackRecord]) -> BTreeMap<String, f64> {
    let mut sums: BTreeMap<String, (u32, usize)> = BTreeMap::new();
    for record in records {
        let entry = sums.entry(record.jurisdiction.clone()).or_default();
        entry.0 += u32::from(record.rating);
        entry.1 += 1;
    }
    sums.into_iter().map(|(j, (sum, n))| (j, f64::from(sum) / n as f64)).collect()
}

/// Where feedback points at problems.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImprovementAreas {
    /// Records analyzed.
    pub total_analyzed: usize,
    /// Records rated 1 or 2.
    pub low_rated: usize,
    /// Records rated 4 or 5.
    pub high_rated: usize,
    /// More than 20% of records are low rated.
    pub needs_improvement: bool,
    /// Share of high-rated records.
    pub satisfaction_rate: f64,
    /// Up to three jurisdictions with the most low ratings.
    pub problematic_jurisdictions: Vec<(String, usize)>,
}

/// Pattern analysis over feedback.
pub struct FeedbackAnalyzer;

impl FeedbackAnalyzer {
    /// Identify improvement areas, or `None` when there is no feedback.
    pub fn improvement_areas(records: &[FeedbackRecord]) -> Option<ImprovementAreas> {
        if records.is_empty() {
            return None;
        }
        let total = records.len();
        let low: Vec<&FeedbackRecord> =
            records.iter().filter(|r| r.rating <= LOW_RATING_THRESHOLD).collect();
        let high = records.iter().filter(|r| r.rating >= 4).count();

        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for record in &low {
            *counts.entry(record.jurisdiction.as_str()).or_insert(0) += 1;
        }
        let mut problematic: Vec<(String, usize)> =
            counts.into_iter().map(|(j, n)| (j.to_string(), n)).collect();
        problematic.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        problematic.truncate(3);

        Some(ImprovementAreas {
            total_analyzed: total,
            low_rated: low.len(),
            high_rated: high,
            needs_improvement: low.len() as f64 > total as f64 * 0.2,
            satisfaction_rate: high as f64 / total as f64,
            problematic_jurisdictions: problematic,
        })
    }

    /// Actionable recommendations derived from statistics.
    pub fn recommendations(stats: &FeedbackStats) -> Vec<String> {
        let mut recommendations = Vec::new();
        if stats.total == 0 {
            recommendations.push("Encourage users to provide feedback on answers".to_string());
            return recommendations;
        }

        if stats.average < 3.0 {
            recommendations.push(
                "CRITICAL: average rating below 3 stars; review answer quality and citation accuracy"
                    .to_string(),
            );
        } else if stats.average < 3.5 {
            recommendations
                .push("Average rating could be improved; consider tuning retrieval parameters".to_string());
        } else if stats.average >= 4.5 {
            recommendations.push("Excellent performance; answers are consistently well rated".to_string());
        }

        if stats.negative as f64 / stats.total as f64 > 0.3 {
            recommendations
                .push("High negative feedback ratio; analyze low-rated questions for patterns".to_string());
        }
        if (stats.comments as f64) < stats.total as f64 * 0.2 {
            recommendations
                .push("Low comment rate; encourage detailed feedback for improvement".to_string());
        }
        recommendations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission(rating: u8, jurisdiction: &str, comments: &str) -> FeedbackSubmission {
        FeedbackSubmission {
            question: "Is an at-will handbook binding?".into(),
            answer: "a".repeat(800),
            rating,
            comments: comments.into(),
            jurisdiction: jurisdiction.into(),
            source_citations: vec!["123 F.3d 456 (9th Cir. 2020)".into()],
        }
    }

    #[test]
    fn rejects_out_of_range_rating() {
        let dir = tempfile::tempdir().unwrap();
        let store = FeedbackStore::open(dir.path().join("feedback.jsonl")).unwrap();
        for rating in [0, 6] {
            let err = store.submit(submission(rating, "all", "")).unwrap_err();
            assert!(matches!(err, LegalRagError::InvalidArgument(_)));
        }
        assert!(store.load_all().unwrap().is_empty());
    }

    #[test]
    fn submit_truncates_answer_and_counts_sources() {
        let dir = tempfile::tempdir().unwrap();
        let store = FeedbackStore::open(dir.path().join("feedback.jsonl")).unwrap();
        let record = store.submit(submission(4, "federal", "")).unwrap();
        assert_eq!(record.answer.chars().count(), STORED_ANSWER_CHARS + 3);
        assert_eq!(record.num_sources, 1);
        assert_eq!(store.load_all().unwrap(), vec![record]);
    }

    #[test]
    fn statistics_and_breakdowns() {
        let dir = tempfile::tempdir().unwrap();
        let store = FeedbackStore::open(dir.path().join("feedback.jsonl")).unwrap();
        store.submit(submission(5, "federal", "great")).unwrap();
        store.submit(submission(1, "state", "wrong court")).unwrap();
        store.submit(submission(3, "state", "")).unwrap();
        store.submit(submission(2, "state", "")).unwrap();

        let stats = store.statistics().unwrap();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.average, 2.75);
        assert_eq!(stats.median, 3);
        assert_eq!(stats.distribution[&4], 0);
        assert_eq!((stats.positive, stats.negative, stats.neutral), (1, 2, 1));
        assert_eq!(stats.comments, 2);

        let low = store.low_rated(LOW_RATING_THRESHOLD).unwrap();
        assert_eq!(low.iter().map(|r| r.rating).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(store.top_issues(LOW_RATING_THRESHOLD).unwrap(), vec!["wrong court"]);
        assert_eq!(store.average_by_jurisdiction().unwrap()["state"], 2.0);
        assert_eq!(store.by_jurisdiction().unwrap()["federal"].len(), 1);

        let areas = FeedbackAnalyzer::improvement_areas(&store.load_all().unwrap()).unwrap();
        assert!(areas.needs_improvement);
        assert_eq!(areas.problematic_jurisdictions, vec![("state".to_string(), 2)]);

        let recs = FeedbackAnalyzer::recommendations(&stats);
        assert!(recs[0].starts_with("CRITICAL"));
        assert!(recs.iter().any(|r| r.contains("negative feedback ratio")));
    }

    #[test]
    fn export_writes_pretty_json() {
        let dir = tempfile::tempdir().unwrap();
        let store = FeedbackStore::open(dir.path().join("feedback.jsonl")).unwrap();
        store.submit(submission(2, "all", "missing sources")).unwrap();
        let out = dir.path().join("export.json");
        store.export(&out).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(value["statistics"]["total"], 1);
        assert_eq!(value["low_rated_questions"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn empty_log_recommends_collecting_feedback() {
        let stats = FeedbackStats::from_records(&[]);
        assert_eq!(stats.median, 0);
        assert_eq!(FeedbackAnalyzer::recommendations(&stats).len(), 1);
        assert!(FeedbackAnalyzer::improvement_areas(&[]).is_none());
    }
}
