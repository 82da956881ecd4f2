//! Interactive session over one [`AppContext`].

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use legal_rag::{
    FeedbackStore, FeedbackSubmission, Jurisdiction, ModelTier, QueryAnalytics, RagAnswer,
    RetrievalResult, VerifiedAnswer,
};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::CorpusArgs;
use crate::commands::open_store;
use crate::context::{AppContext, CorpusSource};
use crate::output;

const HELP: &str = "Text without a leading '/' is asked as a question.

Commands:
  /ask <question>        answer a question
  /agent <question>      verified multi-step research
  /evaluate              score the last answer with the judge model
  /filter <federal|state|all>
  /top-k <1-10>
  /model <small|medium|large>
  /stats                 index and session statistics
  /reset                 delete every indexed document
  /ingest <file|sample>  add a JSONL corpus or the sample corpus
  /rate <1-5> [comment]  rate the last answer
  /help, /quit";

/// One line of input: a question, or a `/`-prefixed command with its arguments.
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Question(&'a str),
    Command { name: String, args: &'a str },
}

impl<'a> Input<'a> {
    fn parse(line: &'a str) -> Self {
        let line = line.trim();
        let Some(command) = line.strip_prefix('/') else {
            return Self::Question(line);
        };
        let (name, args) = command.split_once(char::is_whitespace).unwrap_or((command, ""));
        Self::Command { name: name.to_ascii_lowercase(), args: args.trim() }
    }
}

enum LastAnswer {
    Rag(RagAnswer),
    Verified(VerifiedAnswer),
}

impl LastAnswer {
    fn parts(&self) -> (&str, &str, &RetrievalResult) {
        match self {
            Self::Rag(a) => (a.question.as_str(), a.answer.as_str(), &a.retrieval),
            Self::Verified(v) => (v.question.as_str(), v.answer.as_str(), &v.retrieval),
        }
    }

    fn submission(&self, rating: u8, comments: String) -> FeedbackSubmission {
        match self {
            Self::Rag(answer) => FeedbackSubmission::for_answer(answer, rating, comments),
            Self::Verified(v) => FeedbackSubmission {
                question: v.question.clone(),
                answer: v.answer.clone(),
                rating,
                comments,
                jurisdiction: v.analysis.scope.to_string(),
                source_citations: v.sources.iter().map(|s| s.citation.clone()).collect(),
            },
        }
    }
}

struct Session {
    context: AppContext,
    feedback: FeedbackStore,
    filter: Option<Jurisdiction>,
    analytics: QueryAnalytics,
    last: Option<LastAnswer>,
}

enum Flow {
    Continue,
    Quit,
}

pub async fn run(corpus: &CorpusArgs, feedback_file: &Path) -> Result<()> {
    let config = legal_rag::AppConfig::from_env()?;
    let context = AppContext::build(config, corpus.source()).await?;
    let mut session = Session {
        context,
        feedback: open_store(feedback_file)?,
        filter: None,
        analytics: QueryAnalytics::new(),
        last: None,
    };

    let mut editor = DefaultEditor::new().context("failed to start line editor")?;
    println!("legal-rag interactive session. Type /help for commands.");
    loop {
        match editor.readline("legal> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(line);
                match session.handle(line).await {
                    Ok(Flow::Quit) => break,
                    Ok(Flow::Continue) => {}
                    Err(e) => eprintln!("Error: {e:#}"),
                }
            }
            Err(ReadlineError::Interrupted) => println!("^C"),
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e).context("failed to read input"),
        }
    }
    println!("Bye!");
    Ok(())
}

impl Session {
    fn filter_label(&self) -> &'static str {
        self.filter.map_or("all", |j| j.as_str())
    }

    async fn handle(&mut self, line: &str) -> Result<Flow> {
        let (command, rest) = match Input::parse(line) {
            Input::Question(question) => {
                self.ask(question).await?;
                return Ok(Flow::Continue);
            }
            Input::Command { name, args } => (name, args),
        };
        match command.as_str() {
            "quit" | "exit" => return Ok(Flow::Quit),
            "help" => println!("{HELP}"),
            "ask" => self.ask(rest).await?,
            "agent" => self.agent(rest).await?,
            "evaluate" => self.evaluate().await?,
            "filter" => {
                self.filter = match rest.to_ascii_lowercase().as_str() {
                    "all" | "" => None,
                    other => Some(other.parse()?),
                };
                println!("Jurisdiction filter: {}", self.filter_label());
            }
            "top-k" => {
                let top_k = rest.parse().with_context(|| format!("not a number: {rest}"))?;
                self.context.reconfigure(Some(top_k), None)?;
                println!("top_k = {top_k}");
            }
            "model" => {
                let model: ModelTier = rest.parse()?;
                self.context.reconfigure(None, Some(model))?;
                println!("model = {model}");
            }
            "stats" => {
                output::print_index_stats(&self.context.index.stats().await?);
                println!(
                    "Filter {}, top_k {}, model {}",
                    self.filter_label(),
                    self.context.config.rag.top_k,
                    self.context.config.rag.model
                );
                if let Some(summary) = self.analytics.summary() {
                    output::print_query_summary(&summary);
                }
            }
            "reset" => {
                self.context.index.reset().await?;
                self.last = None;
                println!("Index cleared.");
            }
            "ingest" => {
                let source = match rest {
                    "" => bail!("usage: /ingest <file|sample>"),
                    "sample" => CorpusSource::Sample,
                    path => CorpusSource::File(Path::new(path)),
                };
                let stored = self.context.load(source).await?;
                println!("Ingested {stored} documents.");
            }
            "rate" => self.rate(rest)?,
            other => bail!("unknown command '/{other}'; type /help for commands"),
        }
        Ok(Flow::Continue)
    }

    async fn ask(&mut self, question: &str) -> Result<()> {
        if question.is_empty() {
            bail!("usage: /ask <question>");
        }
        let started = Instant::now();
        let answer = self.context.pipeline.ask(question, self.filter).await?;
        self.analytics.log_query(question, answer.retrieval.len(), self.filter_label(), started.elapsed());
        output::print_answer(&answer);
        self.last = Some(LastAnswer::Rag(answer));
        Ok(())
    }

    async fn agent(&mut self, question: &str) -> Result<()> {
        if question.is_empty() {
            bail!("usage: /agent <question>");
        }
        let started = Instant::now();
        let result = self.context.verifier.research(question, self.context.config.rag.model).await?;
        let label = result.analysis.scope.to_string();
        self.analytics.log_query(question, result.retrieval.len(), label, started.elapsed());
        output::print_verified(&result);
        self.last = Some(LastAnswer::Verified(result));
        Ok(())
    }

    async fn evaluate(&self) -> Result<()> {
        let Some(last) = &self.last else {
            bail!("nothing to evaluate yet; ask a question first");
        };
        let (question, answer, retrieval) = last.parts();
        let record = self
            .context
            .evaluator
            .evaluate(question, answer, retrieval, self.context.config.rag.model)
            .await?;
        output::print_evaluation(&record);
        Ok(())
    }

    fn rate(&self, args: &str) -> Result<()> {
        let Some(last) = &self.last else {
            bail!("nothing to rate yet; ask a question first");
        };
        let (rating, comments) = args.split_once(char::is_whitespace).unwrap_or((args, ""));
        let rating: u8 = rating.parse().with_context(|| format!("rating must be 1-5, got '{rating}'"))?;
        self.feedback.submit(last.submission(rating, comments.trim().to_string()))?;
        println!("Thanks for the feedback.");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_starting_with_a_command_word_is_a_question() {
        assert_eq!(
            Input::parse("reset my expectations: is a verbal lease binding?"),
            Input::Question("reset my expectations: is a verbal lease binding?")
        );
        assert_eq!(Input::parse("  quit claim deeds  "), Input::Question("quit claim deeds"));
    }

    #[test]
    fn slash_prefix_selects_a_command() {
        assert_eq!(Input::parse("/reset"), Input::Command { name: "reset".into(), args: "" });
        assert_eq!(
            Input::parse("/Rate 4  clear and cited "),
            Input::Command { name: "rate".into(), args: "4  clear and cited" }
        );
    }
}
