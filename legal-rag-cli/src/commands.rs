//! One-shot subcommands.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::{Args, Subcommand};
use legal_rag::feedback::LOW_RATING_THRESHOLD;
use legal_rag::metrics::{DEFAULT_CUTOFFS, distance_summary, evaluate_ranking};
use legal_rag::{
    AppConfig, FeedbackAnalyzer, FeedbackStore, FeedbackSubmission, LegalRagError, QueryAnalytics,
    RetrievalEvaluation, SourceCredentials, SourceKind, SourceSelection, SourceSet, append_jsonl,
    read_judgments, sample_corpus, write_jsonl,
};
use serde_json::json;
use tracing::warn;

use crate::context::AppContext;
use crate::output;
use crate::{CorpusArgs, FeedbackFileArg, QueryArgs};

/// `all` or one source name.
#[derive(Debug, Clone, Copy)]
pub struct SourceArg(pub SourceSelection);

impl FromStr for SourceArg {
    type Err = LegalRagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            return Ok(Self(SourceSelection::All));
        }
        s.parse::<SourceKind>().map(|kind| Self(SourceSelection::Only(kind)))
    }
}

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// courtlistener, govinfo, ecfr, regulations-gov or all
    #[arg(long, default_value = "all")]
    source: SourceArg,

    /// Search query sent to each source
    #[arg(long)]
    query: String,

    /// Maximum documents per source
    #[arg(long, default_value_t = 20)]
    max_results: usize,

    /// Output JSONL file
    #[arg(long)]
    out: PathBuf,

    /// Append instead of overwriting
    #[arg(long)]
    append: bool,
}

pub async fn fetch(args: FetchArgs) -> Result<()> {
    let credentials = SourceCredentials::from_env();
    let client = reqwest::Client::builder()
        .user_agent(concat!("legal-rag/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("failed to build HTTP client")?;
    let sources = SourceSet::from_config(&credentials, args.source.0, client)?;
    if sources.is_empty() {
        bail!("no legal-data source is enabled; set an API key or pick --source ecfr");
    }

    println!("Fetching '{}' from {}", args.query, sources.names().join(", "));
    let report = sources.fetch_all(&args.query, args.max_results).await;
    for (source, error) in &report.failures {
        eprintln!("  {source}: {error}");
    }

    let written = if args.append {
        append_jsonl(&args.out, &report.documents)
    } else {
        write_jsonl(&args.out, &report.documents)
    };
    written.with_context(|| format!("failed to write {}", args.out.display()))?;

    println!("Wrote {} documents to {}", report.documents.len(), args.out.display());
    if report.documents.is_empty() && !report.failures.is_empty() {
        bail!("every source failed");
    }
    Ok(())
}

pub fn sample(out: &Path) -> Result<()> {
    let corpus = sample_corpus();
    write_jsonl(out, &corpus).with_context(|| format!("failed to write {}", out.display()))?;
    println!("Wrote {} sample documents to {}", corpus.len(), out.display());
    Ok(())
}

#[derive(Args, Debug)]
pub struct AskArgs {
    /// The legal question
    question: String,

    #[command(flatten)]
    corpus: CorpusArgs,

    #[command(flatten)]
    query: QueryArgs,

    /// Run the multi-step verified research flow
    #[arg(long)]
    agentic: bool,

    /// Score the answer with the judge model
    #[arg(long)]
    evaluate: bool,

    /// Print machine-readable JSON
    #[arg(long)]
    json: bool,
}

pub async fn ask(args: AskArgs) -> Result<()> {
    let mut context = AppContext::build(AppConfig::from_env()?, args.corpus.source()).await?;
    context.reconfigure(args.query.top_k, args.query.model)?;
    let model = context.config.rag.model;

    if args.agentic {
        if args.query.jurisdiction.is_some() {
            warn!("--jurisdiction is ignored with --agentic; the verifier infers it");
        }
        let verified = context.verifier.research(&args.question, model).await?;
        let evaluation = if args.evaluate {
            Some(context.evaluator.evaluate(&args.question, &verified.answer, &verified.retrieval, model).await?)
        } else {
            None
        };
        if args.json {
            println!("{}", serde_json::to_string_pretty(&json!({ "result": verified, "evaluation": evaluation }))?);
        } else {
            output::print_verified(&verified);
            if let Some(record) = &evaluation {
                output::print_evaluation(record);
            }
        }
        return Ok(());
    }

    let answer = context.pipeline.ask(&args.question, args.query.jurisdiction).await?;
    let evaluation = if args.evaluate {
        Some(context.evaluator.evaluate(&args.question, &answer.answer, &answer.retrieval, model).await?)
    } else {
        None
    };
    if args.json {
        println!("{}", serde_json::to_string_pretty(&json!({ "result": answer, "evaluation": evaluation }))?);
    } else {
        output::print_answer(&answer);
        if let Some(record) = &evaluation {
            output::print_evaluation(record);
        }
    }
    Ok(())
}

#[derive(Args, Debug)]
pub struct EvalRetrievalArgs {
    /// JSONL file of {"query": .., "relevant_ids": [..]} lines
    #[arg(long)]
    judgments: PathBuf,

    #[command(flatten)]
    corpus: CorpusArgs,

    /// Cutoffs to report
    #[arg(long, value_delimiter = ',', default_values_t = DEFAULT_CUTOFFS)]
    k: Vec<usize>,

    /// Restrict retrieval to one jurisdiction
    #[arg(long)]
    jurisdiction: Option<legal_rag::Jurisdiction>,

    /// Print machine-readable JSON
    #[arg(long)]
    json: bool,
}

pub async fn eval_retrieval(args: EvalRetrievalArgs) -> Result<()> {
    let judgments = read_judgments(&args.judgments)
        .with_context(|| format!("failed to read judgments {}", args.judgments.display()))?;
    if judgments.is_empty() {
        bail!("{} contains no judged queries", args.judgments.display());
    }
    let depth = args.k.iter().copied().max().unwrap_or(1).max(1);
    let context = AppContext::build(AppConfig::from_env()?, args.corpus.source()).await?;

    let mut queries: Vec<(&String, &HashSet<String>)> = judgments.iter().collect();
    queries.sort_by(|a, b| a.0.cmp(b.0));

    let label = args.jurisdiction.map_or("all", |j| j.as_str());
    let mut analytics = QueryAnalytics::new();
    let mut reports = Vec::with_capacity(queries.len());
    for (query, relevant) in queries {
        let started = Instant::now();
        let retrieval = context.index.query(query, depth, args.jurisdiction).await?;
        analytics.log_query(query.as_str(), retrieval.len(), label, started.elapsed());

        let report = evaluate_ranking(&retrieval.ids(), relevant, &args.k)?;
        if !args.json {
            let distances = distance_summary(&retrieval);
            println!(
                "{query}\n  RR {:.3}  AP {:.3}  retrieved {}  mean relevance {:.3}",
                report.reciprocal_rank, report.average_precision, distances.total_retrieved, distances.mean_relevance
            );
        }
        reports.push(report);
    }

    let summary = RetrievalEvaluation::aggregate(&reports)?;
    if args.json {
        let body = json!({ "summary": summary, "queries": analytics.summary() });
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        output::print_retrieval_evaluation(&summary);
        if let Some(latency) = analytics.summary() {
            output::print_query_summary(&latency);
        }
    }
    Ok(())
}

#[derive(Subcommand, Debug)]
pub enum FeedbackAction {
    /// Record a rating for a question and answer
    Submit {
        #[command(flatten)]
        file: FeedbackFileArg,
        /// The question asked
        #[arg(long)]
        question: String,
        /// The answer being rated
        #[arg(long)]
        answer: String,
        /// Rating from 1 to 5
        #[arg(long)]
        rating: u8,
        /// Optional comment
        #[arg(long, default_value = "")]
        comments: String,
        /// Jurisdiction label used for the question
        #[arg(long, default_value = "all")]
        jurisdiction: String,
    },
    /// Show rating statistics and recommendations
    Stats {
        #[command(flatten)]
        file: FeedbackFileArg,
    },
    /// Export records, statistics and breakdowns as a pretty-printed JSON object
    Export {
        #[command(flatten)]
        file: FeedbackFileArg,
        /// Output file
        #[arg(long)]
        out: PathBuf,
    },
}

pub fn feedback(action: FeedbackAction) -> Result<()> {
    match action {
        FeedbackAction::Submit { file, question, answer, rating, comments, jurisdiction } => {
            let store = open_store(&file.feedback_file)?;
            let record = store.submit(FeedbackSubmission {
                question,
                answer,
                rating,
                comments,
                jurisdiction,
                source_citations: Vec::new(),
            })?;
            println!("Recorded {}-star rating at {}", record.rating, record.timestamp);
        }
        FeedbackAction::Stats { file } => {
            let store = open_store(&file.feedback_file)?;
            let stats = store.statistics()?;
            output::print_feedback_stats(&stats);

            let records = store.load_all()?;
            if let Some(areas) = FeedbackAnalyzer::improvement_areas(&records) {
                output::print_improvement_areas(&areas);
            }
            let averages = store.average_by_jurisdiction()?;
            if !averages.is_empty() {
                println!("\nAverage rating by jurisdiction:");
            }
            for (jurisdiction, average) in averages {
                println!("  {jurisdiction}: {average:.2}");
            }
            let issues = store.top_issues(LOW_RATING_THRESHOLD)?;
            if !issues.is_empty() {
                println!("\nRecent complaints:");
                for issue in issues.iter().take(5) {
                    println!("  - {issue}");
                }
            }
            println!("\nRecommendations:");
            for recommendation in FeedbackAnalyzer::recommendations(&stats) {
                println!("  - {recommendation}");
            }
        }
        FeedbackAction::Export { file, out } => {
            let store = open_store(&file.feedback_file)?;
            store.export(&out).with_context(|| format!("failed to export to {}", out.display()))?;
            println!("Exported feedback to {}", out.display());
        }
    }
    Ok(())
}

pub fn open_store(path: &Path) -> Result<FeedbackStore> {
    FeedbackStore::open(path).with_context(|| format!("failed to open feedback file {}", path.display()))
}
