//! Plain-text rendering of results for the terminal.

use legal_rag::evaluator::EvaluationRecord;
use legal_rag::feedback::{FeedbackStats, ImprovementAreas};
use legal_rag::metrics::QuerySummary;
use legal_rag::{IndexStats, RagAnswer, RetrievalEvaluation, SourceCitation, VerifiedAnswer};

pub fn print_answer(answer: &RagAnswer) {
    println!("\n{}\n", answer.answer);
    print_sources(&answer.citations);
}

pub fn print_sources(citations: &[SourceCitation]) {
    if citations.is_empty() {
        return;
    }
    println!("Sources:");
    for c in citations {
        println!(
            "  [{}] {}, {} ({}, {}, {}) relevance {:.1}%",
            c.number, c.case_name, c.citation, c.court, c.jurisdiction, c.date, c.relevance_pct
        );
        if !c.url.is_empty() {
            println!("      {}", c.url);
        }
    }
}

pub fn print_verified(result: &VerifiedAnswer) {
    println!("\nResearch steps:");
    for step in &result.steps {
        println!("  {}. {}: {}", step.step, step.action, step.result);
    }
    println!(
        "\nJurisdiction: {} (domain: {})",
        result.analysis.scope,
        if result.analysis.legal_domain.is_empty() { "unknown" } else { result.analysis.legal_domain.as_str() }
    );
    println!("\n{}\n", result.answer);
    print_sources(&result.sources);

    let report = &result.citation_report;
    if !report.verified.is_empty() {
        println!("\nVerified citations: {}", report.verified.len());
    }
    if !result.warnings.is_empty() {
        println!("\nWarnings:");
        for warning in &result.warnings {
            println!("  ! {warning}");
        }
    }
}

pub fn print_evaluation(record: &EvaluationRecord) {
    println!("\nEvaluation ({}):", record.evaluator_model);
    println!("  factual accuracy          {:.1}", record.factual_accuracy);
    println!("  citation validity         {:.1}", record.citation_validity);
    println!("  jurisdictional alignment  {:.1}", record.jurisdictional_alignment);
    println!("  completeness              {:.1}", record.completeness);
    println!("  clarity                   {:.1}", record.clarity);
    println!("  overall                   {:.1}", record.overall_score);
    if record.hallucination_detected {
        println!("  ! possible hallucination detected");
    }
    for strength in &record.strengths {
        println!("  + {strength}");
    }
    for weakness in &record.weaknesses {
        println!("  - {weakness}");
    }
    if !record.feedback.is_empty() {
        println!("  {}", record.feedback);
    }
}

pub fn print_retrieval_evaluation(summary: &RetrievalEvaluation) {
    println!("\nRetrieval over {} queries", summary.query_count);
    println!("  MRR {:.3}  MAP {:.3}", summary.mrr, summary.map);
    for cutoff in &summary.cutoffs {
        println!(
            "  @{:<3} recall {:.3}  precision {:.3}  ndcg {:.3}",
            cutoff.k, cutoff.recall, cutoff.precision, cutoff.ndcg
        );
    }
}

pub fn print_query_summary(summary: &QuerySummary) {
    println!(
        "\n{} queries, latency mean {:?} median {:?} p95 {:?}, {:.1} results per query",
        summary.total_queries,
        summary.mean_latency,
        summary.median_latency,
        summary.p95_latency,
        summary.mean_results
    );
    for (jurisdiction, count) in &summary.jurisdictions {
        println!("  {jurisdiction}: {count}");
    }
}

pub fn print_index_stats(stats: &IndexStats) {
    println!("Collection '{}': {} documents", stats.collection, stats.document_count);
    for (jurisdiction, count) in &stats.by_jurisdiction {
        println!("  {jurisdiction}: {count}");
    }
}

pub fn print_feedback_stats(stats: &FeedbackStats) {
    if stats.total == 0 {
        println!("No feedback recorded yet.");
        return;
    }
    println!("{} ratings, average {:.2}, median {}", stats.total, stats.average, stats.median);
    for (rating, count) in &stats.distribution {
        println!("  {rating} star: {count}");
    }
    println!(
        "  positive {}  neutral {}  negative {}  with comments {}",
        stats.positive, stats.neutral, stats.negative, stats.comments
    );
}

pub fn print_improvement_areas(areas: &ImprovementAreas) {
    println!(
        "\nSatisfaction {:.0}% ({} of {} rated 4+), {} low-rated{}",
        areas.satisfaction_rate * 100.0,
        areas.high_rated,
        areas.total_analyzed,
        areas.low_rated,
        if areas.needs_improvement { ", needs improvement" } else { "" }
    );
    for (jurisdiction, count) in &areas.problematic_jurisdictions {
        println!("  low ratings for {jurisdiction}: {count}");
    }
}
