//! Judge evaluation against scripted model replies.

mod common;

use std::sync::Arc;

use common::ScriptedGenerator;
use legal_rag::error::LegalRagError;
use legal_rag::evaluator::{EvaluationItem, EvaluationSummary, MAX_SCORE, MIN_SCORE};
use legal_rag::generation::{ModelTier, ResponseFormat};
use legal_rag::{JudgeEvaluator, RetrievalResult};

const GOOD: &str = r#"{
    "factual_accuracy": 4,
    "citation_validity": 5,
    "jurisdictional_alignment": 4.5,
    "completeness": 3,
    "clarity": 4,
    "overall_score": 4,
    "strengths": ["cites sources"],
    "weaknesses": ["brief"],
    "hallucination_detected": false,
    "feedback": "Solid answer."
}"#;

fn evaluator(replies: Vec<&str>) -> (JudgeEvaluator, Arc<ScriptedGenerator>) {
    let generator = Arc::new(ScriptedGenerator::new(replies));
    (JudgeEvaluator::new(generator.clone()).unwrap(), generator)
}

#[tokio::test]
async fn well_formed_reply_is_accepted() {
    let (evaluator, generator) = evaluator(vec![GOOD]);
    let record = evaluator
        .evaluate("q", "a [1]", &RetrievalResult::default(), ModelTier::Large)
        .await
        .unwrap();

    assert_eq!(record.citation_validity, 5.0);
    assert_eq!(record.evaluator_model, "mistral-large-latest");
    assert!(record.sub_scores().iter().all(|s| (MIN_SCORE..=MAX_SCORE).contains(s)));

    let requests = generator.requests.lock().unwrap();
    assert_eq!(requests[0].response_format, Some(ResponseFormat::Json));
}

#[tokio::test]
async fn fenced_reply_is_accepted() {
    let fenced = format!("```json\n{GOOD}\n```");
    let (evaluator, _) = evaluator(vec![fenced.as_str()]);
    let record = evaluator.evaluate("q", "a", &RetrievalResult::default(), ModelTier::Small).await.unwrap();
    assert_eq!(record.overall_score, 4.0);
}

#[test]
fn out_of_range_score_is_a_parse_error() {
    let (evaluator, _) = evaluator(vec![]);
    let bad = GOOD.replace("\"completeness\": 3", "\"completeness\": 7");
    assert!(matches!(evaluator.parse(&bad), Err(LegalRagError::EvaluationParse(_))));
}

#[test]
fn missing_field_is_a_parse_error() {
    let (evaluator, _) = evaluator(vec![]);
    let bad = GOOD.replace("\"feedback\": \"Solid answer.\"", "\"note\": \"\"");
    assert!(matches!(evaluator.parse(&bad), Err(LegalRagError::EvaluationParse(_))));
}

#[test]
fn prose_is_a_parse_error() {
    let (evaluator, _) = evaluator(vec![]);
    assert!(matches!(evaluator.parse("The answer looks good."), Err(LegalRagError::EvaluationParse(_))));
}

#[tokio::test]
async fn batch_keeps_each_outcome() {
    let (evaluator, _) = evaluator(vec![GOOD, "nonsense"]);
    let item = |q: &str| EvaluationItem {
        question: q.into(),
        answer: "a".into(),
        sources: RetrievalResult::default(),
    };

    let results = evaluator.batch_evaluate(&[item("one"), item("two"), item("three")], ModelTier::Small).await;
    assert_eq!(results.len(), 3);
    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(LegalRagError::EvaluationParse(_))));
    assert!(matches!(results[2], Err(LegalRagError::Generation { .. })));

    let records: Vec<_> = results.into_iter().filter_map(Result::ok).collect();
    let summary = EvaluationSummary::from_records(&records);
    assert_eq!(summary.total_evaluations, 1);
    assert_eq!(summary.avg_citation_validity, 5.0);
}
