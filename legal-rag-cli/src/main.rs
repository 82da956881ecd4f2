//! `legal-rag` command-line front end.

mod commands;
mod context;
mod output;
mod repl;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use legal_rag::{Jurisdiction, ModelTier};
use tracing_subscriber::EnvFilter;

use crate::context::CorpusSource;

#[derive(Parser, Debug)]
#[command(
    name = "legal-rag",
    version,
    about = "Jurisdiction-aware question answering over case law and federal regulations"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch documents from legal-data APIs into a JSONL corpus
    Fetch(commands::FetchArgs),
    /// Write the built-in sample corpus to a JSONL file
    Sample {
        /// Output file
        #[arg(long, default_value = "sample_corpus.jsonl")]
        out: PathBuf,
    },
    /// Answer one legal question
    Ask(commands::AskArgs),
    /// Score retrieval against relevance judgments
    EvalRetrieval(commands::EvalRetrievalArgs),
    /// Record and analyze user ratings
    Feedback {
        #[command(subcommand)]
        action: commands::FeedbackAction,
    },
    /// Start an interactive session
    Repl {
        #[command(flatten)]
        corpus: CorpusArgs,
        #[command(flatten)]
        feedback: FeedbackFileArg,
    },
}

/// Which corpus to load into the index.
#[derive(Args, Debug, Clone)]
pub struct CorpusArgs {
    /// JSONL corpus to ingest
    #[arg(long, conflicts_with = "sample")]
    pub corpus: Option<PathBuf>,

    /// Ingest the built-in sample corpus
    #[arg(long)]
    pub sample: bool,
}

impl CorpusArgs {
    pub fn source(&self) -> CorpusSource<'_> {
        match (&self.corpus, self.sample) {
            (Some(path), _) => CorpusSource::File(path),
            (None, true) => CorpusSource::Sample,
            (None, false) => CorpusSource::Existing,
        }
    }
}

/// Per-invocation overrides of the configured retrieval parameters.
#[derive(Args, Debug, Clone)]
pub struct QueryArgs {
    /// Restrict retrieval to one jurisdiction
    #[arg(long)]
    pub jurisdiction: Option<Jurisdiction>,

    /// Number of documents to retrieve (1-10)
    #[arg(long)]
    pub top_k: Option<usize>,

    /// Model tier: small, medium or large
    #[arg(long)]
    pub model: Option<ModelTier>,
}

#[derive(Args, Debug, Clone)]
pub struct FeedbackFileArg {
    /// Feedback JSONL file
    #[arg(long, env = "LEGAL_RAG_FEEDBACK_FILE", default_value = "feedback/user_feedback.jsonl")]
    pub feedback_file: PathBuf,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("legal_rag=info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Command::Fetch(args) => commands::fetch(args).await,
        Command::Sample { out } => commands::sample(&out),
        Command::Ask(args) => commands::ask(args).await,
        Command::EvalRetrieval(args) => commands::eval_retrieval(args).await,
        Command::Feedback { action } => commands::feedback(action),
        Command::Repl { corpus, feedback } => repl::run(&corpus, &feedback.feedback_file).await,
    }
}
