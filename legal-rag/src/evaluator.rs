//! AI-as-judge evaluation of generated answers.
//!
//! The judge model scores an answer against a fixed rubric and must reply
//! with a JSON object. The reply is checked against a JSON Schema before it
//! is deserialized, so every score in an [`EvaluationRecord`] is known to be
//! within the rubric's 1–5 range.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use jsonschema::Validator;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::document::RetrievalResult;
use crate::error::{LegalRagError, Result};
use crate::generation::{ChatMessage, GenerationProvider, GenerationRequest, ModelTier, strip_code_fence};

/// Lowest score on the rubric.
pub const MIN_SCORE: f64 = 1.0;
/// Highest score on the rubric.
pub const MAX_SCORE: f64 = 5.0;

const JUDGE_TEMPERATURE: f32 = 0.2;
const SOURCE_EXCERPT_CHARS: usize = 300;

const SCORE_FIELDS: [&str; 6] = [
    "factual_accuracy",
    "citation_validity",
    "jurisdictional_alignment",
    "completeness",
    "clarity",
    "overall_score",
];

fn rubric_schema() -> Value {
    let score = json!({ "type": "number", "minimum": MIN_SCORE, "maximum": MAX_SCORE });
    let mut properties = serde_json::Map::new();
    for field in SCORE_FIELDS {
        properties.insert(field.to_string(), score.clone());
    }
    properties.insert("strengths".into(), json!({ "type": "array", "items": { "type": "string" } }));
    properties.insert("weaknesses".into(), json!({ "type": "array", "items": { "type": "string" } }));
    properties.insert("hallucination_detected".into(), json!({ "type": "boolean" }));
    properties.insert("feedback".into(), json!({ "type": "string" }));

    let required: Vec<&str> = SCORE_FIELDS
        .iter()
        .copied()
        .chain(["strengths", "weaknesses", "hallucination_detected", "feedback"])
        .collect();
    json!({ "type": "object", "properties": properties, "required": required })
}

/// Structured judgment of one answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    /// Are the claims supported by the sources?
    pub factual_accuracy: f64,
    /// Are citations correctly attributed and formatted?
    pub citation_validity: f64,
    /// Does the answer keep federal and state law apart where it matters?
    pub jurisdictional_alignment: f64,
    /// Does the answer address the whole question?
    pub completeness: f64,
    /// Is the answer clear and organized?
    pub clarity: f64,
    /// The judge's overall score.
    pub overall_score: f64,
    /// What the answer does well.
    pub strengths: Vec<String>,
    /// What the answer does poorly.
    pub weaknesses: Vec<String>,
    /// Whether the judge found claims unsupported by any source.
    pub hallucination_detected: bool,
    /// Short constructive feedback.
    pub feedback: String,
    /// Judge model identifier.
    #[serde(default)]
    pub evaluator_model: String,
    /// When the judgment was made.
    #[serde(default = "Utc::now")]
    pub evaluated_at: DateTime<Utc>,
}

impl EvaluationRecord {
    /// The five rubric sub-scores in rubric order.
    pub fn sub_scores(&self) -> [f64; 5] {
        [
            self.factual_accuracy,
            self.citation_validity,
            self.jurisdictional_alignment,
            self.completeness,
            self.clarity,
        ]
    }
}

/// One question/answer pair to judge.
#[derive(Debug, Clone)]
pub struct EvaluationItem {
    /// The question asked.
    pub question: String,
    /// The answer to judge.
    pub answer: String,
    /// The sources the answer was generated from.
    pub sources: RetrievalResult,
}

/// Averages over a set of successful evaluations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationSummary {
    /// Number of records summarized.
    pub total_evaluations: usize,
    /// Mean factual accuracy.
    pub avg_factual_accuracy: f64,
    /// Mean citation validity.
    pub avg_citation_validity: f64,
    /// Mean jurisdictional alignment.
    pub avg_jurisdictional_alignment: f64,
    /// Mean completeness.
    pub avg_completeness: f64,
    /// Mean clarity.
    pub avg_clarity: f64,
    /// Mean overall score.
    pub avg_overall_score: f64,
    /// Fraction of records with a detected hallucination.
    pub hallucination_rate: f64,
}

impl EvaluationSummary {
    /// Summarize records; all figures are 0 for an empty slice.
    pub fn from_records(records: &[EvaluationRecord]) -> Self {
        let n = records.len();
        let avg = |f: fn(&EvaluationRecord) -> f64| {
            if n == 0 { 0.0 } else { records.iter().map(f).sum::<f64>() / n as f64 }
        };
        let hallucinations = records.iter().filter(|r| r.hallucination_detected).count();
        Self {
            total_evaluations: n,
            avg_factual_accuracy: avg(|r| r.factual_accuracy),
            avg_citation_validity: avg(|r| r.citation_validity),
            avg_jurisdictional_alignment: avg(|r| r.jurisdictional_alignment),
            avg_completeness: avg(|r| r.completeness),
            avg_clarity: avg(|r| r.clarity),
            avg_overall_score: avg(|r| r.overall_score),
            hallucination_rate: if n == 0 { 0.0 } else { hallucinations as f64 / n as f64 },
        }
    }
}

/// Scores answers with a generation model acting as judge.
pub struct JudgeEvaluator {
    generator: Arc<dyn GenerationProvider>,
    validator: Validator,
}

impl JudgeEvaluator {
    /// Create an evaluator that judges through `generator`.
    pub fn new(generator: Arc<dyn GenerationProvider>) -> Result<Self> {
        let validator = Validator::new(&rubric_schema())
            .map_err(|e| LegalRagError::Configuration(format!("invalid rubric schema: {e}")))?;
        Ok(Self { generator, validator })
    }

    /// Judge one answer.
    ///
    /// # Errors
    ///
    /// Returns [`LegalRagError::Generation`] when the judge call fails and
    /// [`LegalRagError::EvaluationParse`] when its reply is not JSON or does
    /// not satisfy the rubric schema. Nothing is retried.
    pub async fn evaluate(
        &self,
        question: &str,
        answer: &str,
        sources: &RetrievalResult,
        model: ModelTier,
    ) -> Result<EvaluationRecord> {
        let prompt = rubric_prompt(question, answer, sources);
        let request = GenerationRequest::new(vec![ChatMessage::user(prompt)], model, JUDGE_TEMPERATURE).json();
        let raw = self.generator.generate(request).await?;

        let mut record = self.parse(&raw)?;
        record.evaluator_model = model.model_id().to_string();
        record.evaluated_at = Utc::now();

        info!(
            model = record.evaluator_model.as_str(),
            overall = record.overall_score,
            hallucination = record.hallucination_detected,
            "evaluated answer"
        );
        Ok(record)
    }

    /// Judge several answers in order, keeping each item's outcome.
    pub async fn batch_evaluate(
        &self,
        items: &[EvaluationItem],
        model: ModelTier,
    ) -> Vec<Result<EvaluationRecord>> {
        let mut results = Vec::with_capacity(items.len());
        for (idx, item) in items.iter().enumerate() {
            let result = self.evaluate(&item.question, &item.answer, &item.sources, model).await;
            if let Err(e) = &result {
                warn!(item = idx, error = %e, "evaluation failed");
            }
            results.push(result);
        }
        results
    }

    /// Validate and deserialize a raw judge reply.
    pub fn parse(&self, raw: &str) -> Result<EvaluationRecord> {
        let value: Value = serde_json::from_str(strip_code_fence(raw)).map_err(|e| {
            debug!(error = %e, "judge reply is not JSON");
            LegalRagError::EvaluationParse(format!("judge reply is not JSON: {e}"))
        })?;

        if let Err(error) = self.validator.validate(&value) {
            debug!(error = %error, "judge reply failed rubric schema");
            return Err(LegalRagError::EvaluationParse(format!(
                "judge reply does not match rubric: {error}"
            )));
        }

        serde_json::from_value(value)
            .map_err(|e| LegalRagError::EvaluationParse(format!("judge reply is malformed: {e}")))
    }
}

fn rubric_prompt(question: &str, answer: &str, sources: &RetrievalResult) -> String {
    let sources_text = if sources.is_empty() {
        "No sources provided.".to_string()
    } else {
        sources
            .iter()
            .enumerate()
            .map(|(idx, hit)| {
                format!(
                    "[{}] {}, {}\n{}\n",
                    idx + 1,
                    hit.document.display_name(),
                    hit.document.display_citation(),
                    hit.document.excerpt(SOURCE_EXCERPT_CHARS)
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "You are an expert legal research evaluator. Assess the quality of this legal answer.

QUESTION: {question}

GENERATED ANSWER:
{answer}

AVAILABLE SOURCES:
{sources_text}

Score the answer from 1 (poor) to 5 (excellent) on each criterion:
1. FACTUAL ACCURACY: Are all claims supported by the provided sources?
2. CITATION VALIDITY: Are citations correctly attributed and formatted?
3. JURISDICTIONAL ALIGNMENT: Does the answer distinguish federal from state law where relevant?
4. COMPLETENESS: Does the answer fully address the question?
5. CLARITY: Is the answer clear and well organized?

Respond with exactly this JSON object:
{{
    \"factual_accuracy\": <1-5>,
    \"citation_validity\": <1-5>,
    \"jurisdictional_alignment\": <1-5>,
    \"completeness\": <1-5>,
    \"clarity\": <1-5>,
    \"overall_score\": <1-5>,
    \"strengths\": [\"...\"],
    \"weaknesses\": [\"...\"],
    \"hallucination_detected\": <true|false>,
    \"feedback\": \"Two or three sentences of constructive feedback\"
}}"
    )
}
