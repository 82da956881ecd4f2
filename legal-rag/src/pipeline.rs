//! RAG orchestrator: retrieve, format a numbered context, generate a cited answer.
//!
//! The [`RagPipeline`] composes a [`LegalIndex`] with a [`GenerationProvider`].
//!
//! # Example
//!
//! ```rust,ignore
//! use legal_rag::{Jurisdiction, RagConfig, RagPipeline};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .index(Arc::new(index))
//!     .generator(Arc::new(mistral))
//!     .build()?;
//!
//! let answer = pipeline.ask("When are Miranda warnings required?", None).await?;
//! ```

use std::fmt::Write as _;
use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info};

use crate::config::RagConfig;
use crate::document::{Jurisdiction, RetrievalResult, RetrievedDocument};
use crate::error::{LegalRagError, Result};
use crate::generation::{ChatMessage, GenerationProvider, GenerationRequest, ModelTier};
use crate::index::LegalIndex;

/// Answer returned when retrieval finds nothing; generation is skipped.
pub const NO_SOURCES_ANSWER: &str = "No relevant legal sources were found for this question. \
     Try rephrasing it, widening the jurisdiction filter, or ingesting more documents.";

/// Characters of each document placed in the generation context.
const CONTEXT_EXCERPT_CHARS: usize = 1500;

/// Characters of each document shown with a citation.
const DISPLAY_EXCERPT_CHARS: usize = 500;

const SYSTEM_PROMPT: &str = "You are a legal research assistant specializing in case law and \
regulatory analysis. Provide accurate, citation-grounded answers to legal questions.

Rules:
1. Base every statement ONLY on the numbered legal sources provided.
2. Support each claim with the source number in brackets, e.g. [1] or [2].
3. Cite cases and regulations by their full citation as given in the sources.
4. Clearly distinguish federal from state law when relevant.
5. If the sources do not contain enough information to answer, say so plainly instead of guessing.
6. Never invent cases, citations or holdings that are not in the sources.

Structure the answer as a direct answer, then supporting analysis with citations, then any \
limitations or caveats.";

/// One numbered source as shown alongside an answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceCitation {
    /// The `[n]` marker the answer uses for this source.
    pub number: usize,
    /// Document identifier.
    pub id: String,
    /// Case or regulation name.
    pub case_name: String,
    /// Citation string.
    pub citation: String,
    /// Court or source identifier.
    pub court: String,
    /// Jurisdiction of the source.
    pub jurisdiction: Jurisdiction,
    /// Filing or effective date.
    pub date: String,
    /// Link to the original.
    pub url: String,
    /// Leading text of the document.
    pub excerpt: String,
    /// `1 - distance`, as a percentage.
    pub relevance_pct: f32,
}

impl SourceCitation {
    /// Number the retrieved documents from 1 in rank order.
    pub fn from_retrieval(result: &RetrievalResult) -> Vec<Self> {
        result.iter().enumerate().map(|(idx, hit)| Self::from_hit(idx + 1, hit)).collect()
    }

    fn from_hit(number: usize, hit: &RetrievedDocument) -> Self {
        let doc = &hit.document;
        Self {
            number,
            id: doc.id.clone(),
            case_name: doc.display_name().to_string(),
            citation: doc.display_citation().to_string(),
            court: doc.court.clone(),
            jurisdiction: doc.jurisdiction,
            date: doc.date_filed.clone(),
            url: doc.url.clone(),
            excerpt: doc.excerpt(DISPLAY_EXCERPT_CHARS),
            relevance_pct: hit.relevance() * 100.0,
        }
    }
}

/// A generated answer with the sources it was grounded on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RagAnswer {
    /// The question asked.
    pub question: String,
    /// The generated answer, or [`NO_SOURCES_ANSWER`].
    pub answer: String,
    /// Numbered sources, matching the `[n]` markers in the answer.
    pub citations: Vec<SourceCitation>,
    /// The raw retrieval.
    pub retrieval: RetrievalResult,
    /// Jurisdiction filter applied, if any.
    pub filter: Option<Jurisdiction>,
}

impl RagAnswer {
    /// Whether generation was skipped because nothing was retrieved.
    pub fn has_sources(&self) -> bool {
        !self.retrieval.is_empty()
    }
}

/// Render retrieved documents as the numbered context block sent to the model.
///
/// Each entry reads `[n] Case Name, Citation (court, JURISDICTION, date)`
/// followed by an excerpt of the document text.
pub fn format_context(result: &RetrievalResult) -> String {
    let mut context = String::new();
    for (idx, hit) in result.iter().enumerate() {
        let doc = &hit.document;
        if idx > 0 {
            context.push('\n');
        }
        let _ = writeln!(
            context,
            "[{}] {}, {} ({}, {}, {})",
            idx + 1,
            doc.display_name(),
            doc.display_citation(),
            doc.court,
            doc.jurisdiction.as_str().to_uppercase(),
            doc.date_filed,
        );
        let _ = writeln!(context, "{}", doc.excerpt(CONTEXT_EXCERPT_CHARS));
    }
    context
}

/// The retrieval-then-generation orchestrator.
///
/// Construct one via [`RagPipeline::builder()`].
pub struct RagPipeline {
    config: RagConfig,
    index: Arc<LegalIndex>,
    generator: Arc<dyn GenerationProvider>,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return the index queried by this pipeline.
    pub fn index(&self) -> &Arc<LegalIndex> {
        &self.index
    }

    /// Return the generation provider.
    pub fn generator(&self) -> &Arc<dyn GenerationProvider> {
        &self.generator
    }

    /// Answer with the configured `top_k` and model.
    pub async fn ask(&self, question: &str, filter: Option<Jurisdiction>) -> Result<RagAnswer> {
        self.answer(question, filter, self.config.top_k, self.config.model).await
    }

    /// Retrieve up to `top_k` sources and generate a grounded answer.
    ///
    /// When nothing is retrieved the answer is [`NO_SOURCES_ANSWER`] and the
    /// generation provider is not called.
    ///
    /// # Errors
    ///
    /// Returns [`LegalRagError::EmbeddingService`] or
    /// [`LegalRagError::VectorStore`] when retrieval fails, and
    /// [`LegalRagError::Generation`] when the model call fails.
    pub async fn answer(
        &self,
        question: &str,
        filter: Option<Jurisdiction>,
        top_k: usize,
        model: ModelTier,
    ) -> Result<RagAnswer> {
        let retrieval = self.index.query(question, top_k, filter).await?;
        let answer = self.generate_from(question, &retrieval, model).await?;

        info!(?filter, top_k, %model, source_count = retrieval.len(), "answered question");
        Ok(RagAnswer {
            question: question.to_string(),
            answer,
            citations: SourceCitation::from_retrieval(&retrieval),
            retrieval,
            filter,
        })
    }

    /// Generate an answer over documents that were already retrieved.
    ///
    /// Returns [`NO_SOURCES_ANSWER`] without calling the model when
    /// `retrieval` is empty.
    pub async fn generate_from(
        &self,
        question: &str,
        retrieval: &RetrievalResult,
        model: ModelTier,
    ) -> Result<String> {
        if retrieval.is_empty() {
            info!("no sources retrieved, skipping generation");
            return Ok(NO_SOURCES_ANSWER.to_string());
        }

        let user = format!(
            "Legal Question: {question}\n\nRelevant Legal Sources:\n{}\n\
             Answer the legal question using only the sources above, citing them by number.",
            format_context(retrieval)
        );
        let request = GenerationRequest::new(
            vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(user)],
            model,
            self.config.temperature,
        )
        .with_max_tokens(self.config.max_answer_tokens);

        let answer = self.generator.generate(request).await.map_err(|e| {
            error!(provider = self.generator.name(), error = %e, "answer generation failed");
            e
        })?;
        if answer.trim().is_empty() {
            return Err(LegalRagError::generation(self.generator.name(), "model returned an empty answer"));
        }
        Ok(answer)
    }
}

/// Builder for constructing a [`RagPipeline`].
///
/// The index and generator are required; the config defaults to
/// [`RagConfig::default()`].
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    index: Option<Arc<LegalIndex>>,
    generator: Option<Arc<dyn GenerationProvider>>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the index to retrieve from.
    pub fn index(mut self, index: Arc<LegalIndex>) -> Self {
        self.index = Some(index);
        self
    }

    /// Set the generation provider.
    pub fn generator(mut self, generator: Arc<dyn GenerationProvider>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Build the [`RagPipeline`], validating that required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`LegalRagError::Configuration`] if the index or generator is
    /// missing, or if the config is out of range.
    pub fn build(self) -> Result<RagPipeline> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let index = self
            .index
            .ok_or_else(|| LegalRagError::Configuration("index is required".to_string()))?;
        let generator = self
            .generator
            .ok_or_else(|| LegalRagError::Configuration("generator is required".to_string()))?;
        Ok(RagPipeline { config, index, generator })
    }
}
