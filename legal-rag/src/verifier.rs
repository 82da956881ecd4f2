//! Agentic verifier: a fixed five-stage research pipeline.
//!
//! 1. Jurisdiction analysis (model classification of the question)
//! 2. Retrieval with the inferred filter
//! 3. Citation verification of the retrieved sources
//! 4. Jurisdictional consistency check
//! 5. Answer generation, followed by a check of the citations in the answer
//!
//! Stage 2 short-circuits the rest when nothing is retrieved. A generation
//! failure in stage 1 or 5 aborts the run.

use std::collections::BTreeMap;
use std::ops::ControlFlow;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::document::{Jurisdiction, JurisdictionScope, RetrievalResult};
use crate::error::{LegalRagError, Result};
use crate::generation::{ChatMessage, GenerationRequest, ModelTier, strip_code_fence};
use crate::pipeline::{NO_SOURCES_ANSWER, RagPipeline, SourceCitation};

const ANALYSIS_TEMPERATURE: f32 = 0.1;

static FEDERAL_CASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b\d+\s+(?:U\.\s?S\.|S\.\s?Ct\.|L\.\s?Ed\.(?:\s?2d)?|F\.\s?(?:2d|3d|4th)|F\.\s?Supp\.(?:\s?(?:2d|3d))?|F\.\s?App'x|F\.)\s+\d+",
    )
    .expect("federal reporter pattern is valid")
});

static STATE_CASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b\d+\s+(?:Cal\.\s?Rptr\.(?:\s?(?:2d|3d))?|N\.Y\.S\.(?:\s?(?:2d|3d))?|(?:P|N\.E|S\.E|A|So|S\.W|N\.W)\.(?:\s?(?:2d|3d|4th))?)\s+\d+",
    )
    .expect("state reporter pattern is valid")
});

static CFR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b\d+\s+C\.?F\.?R\.?\s+(?:Part\s+|§+\s*)?\d+(?:\.[\w-]+)?")
        .expect("CFR pattern is valid")
});

static USC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b\d+\s+U\.S\.C\.?\s+(?:§+\s*)?\d+[\w-]*").expect("U.S.C. pattern is valid")
});

static CITATION_PARTS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)\s+(.+?)\s*(\d[\w.-]*)$").expect("citation parts pattern is valid")
});

static SOURCE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(\d+)\]").expect("source marker pattern is valid"));

/// Citation family recognized by the reporter patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CitationFormat {
    /// U.S. Reports, Supreme Court and federal reporters.
    FederalCase,
    /// Regional and state reporters.
    StateCase,
    /// Code of Federal Regulations.
    Cfr,
    /// United States Code.
    Usc,
}

impl CitationFormat {
    fn patterns() -> [(Self, &'static Regex); 4] {
        [
            (Self::FederalCase, &*FEDERAL_CASE),
            (Self::StateCase, &*STATE_CASE),
            (Self::Cfr, &*CFR),
            (Self::Usc, &*USC),
        ]
    }

    /// Detect the format of a citation string, if any pattern matches.
    pub fn detect(citation: &str) -> Option<Self> {
        Self::patterns().into_iter().find(|(_, re)| re.is_match(citation)).map(|(f, _)| f)
    }
}

/// Every reporter citation found in `text`, in order of first appearance.
pub fn extract_citations(text: &str) -> Vec<String> {
    let mut found: Vec<(usize, &str)> = CitationFormat::patterns()
        .into_iter()
        .flat_map(|(_, re)| re.find_iter(text).map(|m| (m.start(), m.as_str())))
        .collect();
    found.sort_by_key(|(start, _)| *start);

    let mut citations: Vec<String> = Vec::new();
    for (_, citation) in found {
        if !citations.iter().any(|c| c == citation) {
            citations.push(citation.to_string());
        }
    }
    citations
}

/// Distinct `[n]` source markers in `text`, ascending.
pub fn extract_source_markers(text: &str) -> Vec<usize> {
    let mut markers: Vec<usize> = SOURCE_MARKER
        .captures_iter(text)
        .filter_map(|caps| caps[1].parse().ok())
        .collect();
    markers.sort_unstable();
    markers.dedup();
    markers
}

/// Volume, reporter and first page of a reporter citation.
///
/// The reporter keeps only its letters and digits, so `C.F.R. §` and `CFR`
/// compare equal.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CitationKey {
    volume: String,
    reporter: String,
    page: String,
}

impl CitationKey {
    fn parse(citation: &str) -> Option<Self> {
        let caps = CITATION_PARTS.captures(citation.trim())?;
        Some(Self {
            volume: caps[1].to_string(),
            reporter: caps[2].chars().filter(char::is_ascii_alphanumeric).collect::<String>().to_ascii_lowercase(),
            page: caps[3].to_ascii_lowercase(),
        })
    }
}

/// Reporter citations from the answer that no retrieved source carries.
fn unsupported_citations<'a>(answer_citations: &'a [String], retrieval: &RetrievalResult) -> Vec<&'a str> {
    let known: Vec<CitationKey> = retrieval
        .iter()
        .flat_map(|hit| extract_citations(&hit.document.citation))
        .filter_map(|citation| CitationKey::parse(&citation))
        .collect();
    answer_citations
        .iter()
        .filter(|citation| CitationKey::parse(citation).is_none_or(|key| !known.contains(&key)))
        .map(String::as_str)
        .collect()
}

/// Compare the jurisdictions of retrieved sources against the inferred scope.
///
/// Only a federal or state scope can be violated; `both` and `unspecified`
/// accept any mix.
fn jurisdiction_consistency(scope: JurisdictionScope, retrieval: &RetrievalResult) -> ConsistencyReport {
    let mut distribution = BTreeMap::new();
    for hit in retrieval.iter() {
        *distribution.entry(hit.document.jurisdiction).or_insert(0) += 1;
    }

    let mut warnings = Vec::new();
    if let Some(expected) = scope.filter() {
        let outside: Vec<_> = distribution.iter().filter(|(j, _)| **j != expected).collect();
        if !outside.is_empty() {
            let count: usize = outside.iter().map(|(_, n)| **n).sum();
            let labels: Vec<&str> = outside.iter().map(|(j, _)| j.as_str()).collect();
            warnings.push(format!(
                "Found {count} documents outside the {expected} scope: {}",
                labels.join(", ")
            ));
        }
    }
    ConsistencyReport { consistent: warnings.is_empty(), distribution, warnings }
}

/// Stage 1 output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JurisdictionAnalysis {
    /// Inferred scope; drives the retrieval filter.
    pub scope: JurisdictionScope,
    /// Legal domain named by the model, e.g. `employment`.
    pub legal_domain: String,
    /// The model's short explanation.
    pub reasoning: String,
    /// Jurisdiction-relevant keywords picked out of the question.
    pub keywords: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawAnalysis {
    #[serde(default)]
    jurisdiction: Option<String>,
    #[serde(default)]
    legal_domain: String,
    #[serde(default)]
    reasoning: String,
    #[serde(default)]
    keywords: Vec<String>,
}

/// A source citation that matched a known format.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerifiedCitation {
    /// Source number.
    pub number: usize,
    /// Case or regulation name.
    pub case_name: String,
    /// The citation string.
    pub citation: String,
    /// Detected format.
    pub format: CitationFormat,
    /// Jurisdiction of the source.
    pub jurisdiction: Jurisdiction,
}

/// Stage 3 output, extended after generation with the answer's own citations.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CitationReport {
    /// Sources whose citation is well formed.
    pub verified: Vec<VerifiedCitation>,
    /// Missing, malformed or unsupported citations.
    pub issues: Vec<String>,
    /// Reporter citations found in the answer text.
    pub answer_citations: Vec<String>,
    /// `[n]` markers found in the answer text.
    pub answer_markers: Vec<usize>,
}

/// Stage 4 output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsistencyReport {
    /// Whether every source matches the inferred scope.
    pub consistent: bool,
    /// Retrieved sources per jurisdiction.
    pub distribution: BTreeMap<Jurisdiction, usize>,
    /// Mismatch warnings. Mismatched sources are kept.
    pub warnings: Vec<String>,
}

/// One completed stage, for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepRecord {
    /// Stage number, 1 to 5.
    pub step: u8,
    /// Stage name.
    pub action: &'static str,
    /// One-line outcome.
    pub result: String,
}

/// The outcome of a verified research run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerifiedAnswer {
    /// The question asked.
    pub question: String,
    /// Generated answer, or [`NO_SOURCES_ANSWER`] when the run short-circuited.
    pub answer: String,
    /// Stage 1 output.
    pub analysis: JurisdictionAnalysis,
    /// Completed stages in order.
    pub steps: Vec<StepRecord>,
    /// Numbered sources.
    pub sources: Vec<SourceCitation>,
    /// Raw retrieval.
    pub retrieval: RetrievalResult,
    /// Citation findings; empty when the run short-circuited.
    pub citation_report: CitationReport,
    /// Consistency findings; `None` when the run short-circuited.
    pub consistency: Option<ConsistencyReport>,
    /// Every warning raised along the way.
    pub warnings: Vec<String>,
}

impl VerifiedAnswer {
    /// Whether stage 2 found nothing and generation was skipped.
    pub fn short_circuited(&self) -> bool {
        self.consistency.is_none()
    }
}

struct Research<'q> {
    question: &'q str,
    model: ModelTier,
    steps: Vec<StepRecord>,
    warnings: Vec<String>,
}

impl Research<'_> {
    fn record(&mut self, step: u8, action: &'static str, result: String) {
        debug!(step, action, %result, "verifier stage completed");
        self.steps.push(StepRecord { step, action, result });
    }
}

/// Runs the five-stage research pipeline on top of a [`RagPipeline`].
pub struct AgenticVerifier {
    pipeline: Arc<RagPipeline>,
}

impl AgenticVerifier {
    /// Create a verifier that retrieves and generates through `pipeline`.
    pub fn new(pipeline: Arc<RagPipeline>) -> Self {
        Self { pipeline }
    }

    /// Run all five stages for `question`.
    ///
    /// # Errors
    ///
    /// Returns [`LegalRagError::Generation`] when jurisdiction analysis or
    /// answer generation fails, and propagates retrieval errors.
    pub async fn research(&self, question: &str, model: ModelTier) -> Result<VerifiedAnswer> {
        let mut research = Research { question, model, steps: Vec::new(), warnings: Vec::new() };

        let analysis = self.analyze_jurisdiction(&mut research).await?;

        let retrieval = match self.retrieve(&mut research, &analysis).await? {
            ControlFlow::Continue(retrieval) => retrieval,
            ControlFlow::Break(()) => {
                info!(scope = %analysis.scope, "no sources retrieved, skipping remaining stages");
                research
                    .warnings
                    .push("No sources were retrieved; answer generation was skipped.".into());
                return Ok(VerifiedAnswer {
                    question: question.to_string(),
                    answer: NO_SOURCES_ANSWER.to_string(),
                    analysis,
                    steps: research.steps,
                    sources: Vec::new(),
                    retrieval: RetrievalResult::default(),
                    citation_report: CitationReport::default(),
                    consistency: None,
                    warnings: research.warnings,
                });
            }
        };

        let mut citation_report = self.verify_citations(&mut research, &retrieval);
        let consistency = self.check_consistency(&mut research, &analysis, &retrieval);
        let answer = self.generate(&mut research, &retrieval, &mut citation_report).await?;

        research.warnings.extend(citation_report.issues.iter().cloned());
        info!(
            scope = %analysis.scope,
            source_count = retrieval.len(),
            issue_count = citation_report.issues.len(),
            consistent = consistency.consistent,
            "verified research completed"
        );

        Ok(VerifiedAnswer {
            question: question.to_string(),
            answer,
            analysis,
            steps: research.steps,
            sources: SourceCitation::from_retrieval(&retrieval),
            retrieval,
            citation_report,
            consistency: Some(consistency),
            warnings: research.warnings,
        })
    }

    async fn analyze_jurisdiction(&self, research: &mut Research<'_>) -> Result<JurisdictionAnalysis> {
        let prompt = format!(
            "Analyze this legal question and determine which jurisdiction's law applies.\n\n\
             Question: {}\n\n\
             Determine:\n\
             1. Is this primarily a FEDERAL or STATE law question, BOTH, or impossible to tell?\n\
             2. What legal domain is involved (employment, contracts, criminal, privacy, ...)?\n\
             3. Which words in the question signal the jurisdiction?\n\n\
             Respond with a JSON object:\n\
             {{\"jurisdiction\": \"federal\" | \"state\" | \"both\" | \"unspecified\", \
             \"legal_domain\": \"...\", \"reasoning\": \"...\", \"keywords\": [\"...\"]}}",
            research.question
        );
        let request =
            GenerationRequest::new(vec![ChatMessage::user(prompt)], research.model, ANALYSIS_TEMPERATURE)
                .json();

        let generator = self.pipeline.generator();
        let raw = generator.generate(request).await?;
        let parsed: RawAnalysis = serde_json::from_str(strip_code_fence(&raw)).map_err(|e| {
            warn!(error = %e, "jurisdiction analysis was not valid JSON");
            LegalRagError::generation(generator.name(), format!("malformed jurisdiction analysis: {e}"))
        })?;

        let label = parsed.jurisdiction.unwrap_or_else(|| "unspecified".to_string());
        let scope = match JurisdictionScope::from_label(&label) {
            Some(JurisdictionScope::Unspecified) => {
                research.warnings.push(
                    "Jurisdiction could not be determined from the question; searched all jurisdictions."
                        .into(),
                );
                JurisdictionScope::Unspecified
            }
            Some(scope) => scope,
            None => {
                warn!(label = %label, "unrecognized jurisdiction label, searching all jurisdictions");
                research.warnings.push(format!(
                    "Unrecognized jurisdiction '{label}' from analysis; searched all jurisdictions."
                ));
                JurisdictionScope::Unspecified
            }
        };

        let analysis = JurisdictionAnalysis {
            scope,
            legal_domain: parsed.legal_domain,
            reasoning: parsed.reasoning,
            keywords: parsed.keywords,
        };
        research.record(1, "Analyze jurisdiction", format!("Detected jurisdiction: {scope}"));
        Ok(analysis)
    }

    async fn retrieve(
        &self,
        research: &mut Research<'_>,
        analysis: &JurisdictionAnalysis,
    ) -> Result<ControlFlow<(), RetrievalResult>> {
        let top_k = self.pipeline.config().top_k;
        let filter = analysis.scope.filter();
        let retrieval = self.pipeline.index().query(research.question, top_k, filter).await?;

        research.record(
            2,
            "Retrieve documents",
            format!("Found {} relevant documents", retrieval.len()),
        );
        if retrieval.is_empty() {
            return Ok(ControlFlow::Break(()));
        }
        Ok(ControlFlow::Continue(retrieval))
    }

    fn verify_citations(&self, research: &mut Research<'_>, retrieval: &RetrievalResult) -> CitationReport {
        let mut report = CitationReport::default();
        for (idx, hit) in retrieval.iter().enumerate() {
            let doc = &hit.document;
            let number = idx + 1;
            if doc.citation.trim().is_empty() || doc.citation.trim() == "N/A" {
                report.issues.push(format!("Missing citation for source [{number}]: {}", doc.display_name()));
                continue;
            }
            match CitationFormat::detect(&doc.citation) {
                Some(format) => report.verified.push(VerifiedCitation {
                    number,
                    case_name: doc.display_name().to_string(),
                    citation: doc.citation.clone(),
                    format,
                    jurisdiction: doc.jurisdiction,
                }),
                None => report
                    .issues
                    .push(format!("Unrecognized citation format for source [{number}]: {}", doc.citation)),
            }
        }

        research.record(
            3,
            "Verify citations",
            format!("Verified {} of {} source citations", report.verified.len(), retrieval.len()),
        );
        report
    }

    fn check_consistency(
        &self,
        research: &mut Research<'_>,
        analysis: &JurisdictionAnalysis,
        retrieval: &RetrievalResult,
    ) -> ConsistencyReport {
        let report = jurisdiction_consistency(analysis.scope, retrieval);
        research.warnings.extend(report.warnings.iter().cloned());
        research.record(
            4,
            "Check jurisdictional consistency",
            format!("Found documents across {} jurisdiction(s)", report.distribution.len()),
        );
        report
    }

    async fn generate(
        &self,
        research: &mut Research<'_>,
        retrieval: &RetrievalResult,
        report: &mut CitationReport,
    ) -> Result<String> {
        let answer = self.pipeline.generate_from(research.question, retrieval, research.model).await?;

        report.answer_markers = extract_source_markers(&answer);
        for marker in &report.answer_markers {
            if *marker == 0 || *marker > retrieval.len() {
                report.issues.push(format!(
                    "Answer cites source [{marker}] but only {} sources were retrieved",
                    retrieval.len()
                ));
            }
        }

        report.answer_citations = extract_citations(&answer);
        let unsupported: Vec<String> = unsupported_citations(&report.answer_citations, retrieval)
            .into_iter()
            .map(|citation| format!("Answer cites '{citation}', which is not among the retrieved sources"))
            .collect();
        report.issues.extend(unsupported);

        research.record(
            5,
            "Generate answer",
            format!(
                "Answer generated with {} source markers and {} reporter citations",
                report.answer_markers.len(),
                report.answer_citations.len()
            ),
        );
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{LegalDocument, RetrievedDocument};
    use crate::sample::sample_corpus;

    #[test]
    fn every_sample_citation_has_a_known_format() {
        for doc in sample_corpus() {
            assert!(CitationFormat::detect(&doc.citation).is_some(), "{}", doc.citation);
        }
    }

    #[test]
    fn detects_formats() {
        assert_eq!(CitationFormat::detect("384 U.S. 436 (1966)"), Some(CitationFormat::FederalCase));
        assert_eq!(CitationFormat::detect("567 F. Supp. 3d 890"), Some(CitationFormat::FederalCase));
        assert_eq!(CitationFormat::detect("345 Cal. Rptr. 3d 678"), Some(CitationFormat::StateCase));
        assert_eq!(CitationFormat::detect("29 CFR § 1630.2"), Some(CitationFormat::Cfr));
        assert_eq!(CitationFormat::detect("42 U.S.C. § 1983"), Some(CitationFormat::Usc));
        assert_eq!(CitationFormat::detect("Docket EPA-HQ-2023-0001"), None);
    }

    #[test]
    fn extracts_citations_in_order() {
        let text = "Under 42 U.S.C. § 1983 and Miranda, 384 U.S. 436, and again 384 U.S. 436 [1][3].";
        assert_eq!(extract_citations(text), vec!["42 U.S.C. § 1983", "384 U.S. 436"]);
        assert_eq!(extract_source_markers(text), vec![1, 3]);
    }

    fn retrieved(docs: Vec<LegalDocument>) -> RetrievalResult {
        RetrievalResult::new(
            docs.into_iter()
                .enumerate()
                .map(|(i, document)| RetrievedDocument { document, distance: 0.1 * i as f32 })
                .collect(),
        )
    }

    fn mixed_retrieval() -> RetrievalResult {
        let corpus = sample_corpus();
        let federal = corpus.iter().filter(|d| d.jurisdiction == Jurisdiction::Federal).take(2);
        let state = corpus.iter().filter(|d| d.jurisdiction == Jurisdiction::State).take(1);
        retrieved(federal.chain(state).cloned().collect())
    }

    #[test]
    fn mixed_sources_break_a_single_jurisdiction_scope() {
        let retrieval = mixed_retrieval();

        let report = jurisdiction_consistency(JurisdictionScope::Federal, &retrieval);
        assert!(!report.consistent);
        assert_eq!(report.distribution[&Jurisdiction::Federal], 2);
        assert_eq!(report.distribution[&Jurisdiction::State], 1);
        assert_eq!(report.warnings, vec!["Found 1 documents outside the federal scope: state".to_string()]);

        let report = jurisdiction_consistency(JurisdictionScope::State, &retrieval);
        assert!(!report.consistent);
        assert!(report.warnings[0].starts_with("Found 2 documents outside the state scope"));
    }

    #[test]
    fn both_and_unspecified_scopes_accept_any_mix() {
        let retrieval = mixed_retrieval();
        for scope in [JurisdictionScope::Both, JurisdictionScope::Unspecified] {
            let report = jurisdiction_consistency(scope, &retrieval);
            assert!(report.consistent, "{scope}");
            assert!(report.warnings.is_empty());
            assert_eq!(report.distribution.len(), 2);
        }
    }

    #[test]
    fn answer_citations_must_match_volume_reporter_and_page() {
        let mut miranda = sample_corpus().into_iter().find(|d| d.citation.contains("384 U.S. 436")).unwrap();
        miranda.citation = "384 U.S. 436 (1966)".into();
        let mut rule = miranda.clone();
        rule.citation = "29 CFR § 1630.2".into();
        let retrieval = retrieved(vec![miranda, rule]);

        let answer = extract_citations(
            "See 384 U.S. 436, not 384 U.S. 43 or 384 U.S. 4360, and 29 C.F.R. 1630.2 but not 29 CFR 1630.",
        );
        assert_eq!(
            unsupported_citations(&answer, &retrieval),
            vec!["384 U.S. 43", "384 U.S. 4360", "29 CFR 1630"]
        );
    }
}
