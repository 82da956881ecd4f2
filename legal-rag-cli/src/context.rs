//! Session state shared by every command.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use legal_rag::generation::GenerationProvider;
use legal_rag::{
    AgenticVerifier, AppConfig, InMemoryVectorStore, JudgeEvaluator, LegalIndex, MistralClient,
    ModelTier, RagConfig, RagPipeline, VectorStore, read_jsonl, sample_corpus,
};
use tracing::info;

/// Where the index is initially populated from.
#[derive(Debug, Clone, Copy)]
pub enum CorpusSource<'a> {
    /// Leave the store as is; useful with a persistent backend.
    Existing,
    /// Ingest the built-in sample corpus.
    Sample,
    /// Ingest a JSONL corpus file.
    File(&'a Path),
}

/// Index, pipeline, verifier and evaluator built once per process.
pub struct AppContext {
    pub config: AppConfig,
    pub index: Arc<LegalIndex>,
    pub pipeline: Arc<RagPipeline>,
    pub verifier: AgenticVerifier,
    pub evaluator: JudgeEvaluator,
    generator: Arc<dyn GenerationProvider>,
}

impl AppContext {
    /// Connect to the model provider and vector store, then load `corpus`.
    pub async fn build(config: AppConfig, corpus: CorpusSource<'_>) -> Result<Self> {
        let mistral = Arc::new(
            MistralClient::new(config.mistral_api_key.clone()).context("failed to create Mistral client")?,
        );
        let store = vector_store(&config)?;
        let index = Arc::new(
            LegalIndex::open(mistral.clone(), store, &config.rag)
                .await
                .context("failed to open the vector index")?,
        );
        let generator: Arc<dyn GenerationProvider> = mistral;
        let pipeline = Arc::new(build_pipeline(config.rag.clone(), &index, &generator)?);

        let context = Self {
            verifier: AgenticVerifier::new(pipeline.clone()),
            evaluator: JudgeEvaluator::new(generator.clone()).context("failed to build the judge evaluator")?,
            config,
            index,
            pipeline,
            generator,
        };
        context.load(corpus).await?;
        Ok(context)
    }

    /// Ingest `corpus` into the index. Returns the number of documents stored.
    pub async fn load(&self, corpus: CorpusSource<'_>) -> Result<usize> {
        let documents = match corpus {
            CorpusSource::Existing => return Ok(0),
            CorpusSource::Sample => sample_corpus(),
            CorpusSource::File(path) => {
                read_jsonl(path).with_context(|| format!("failed to read corpus {}", path.display()))?
            }
        };
        let stored = self.index.upsert(&documents).await.context("failed to ingest corpus")?;
        info!(stored, "corpus loaded");
        Ok(stored)
    }

    /// Change the retrieval depth or default model, rebuilding the pipeline.
    pub fn reconfigure(&mut self, top_k: Option<usize>, model: Option<ModelTier>) -> Result<()> {
        let mut rag = self.config.rag.clone();
        if let Some(top_k) = top_k {
            rag.top_k = top_k;
        }
        if let Some(model) = model {
            rag.model = model;
        }
        rag.validate()?;

        self.pipeline = Arc::new(build_pipeline(rag.clone(), &self.index, &self.generator)?);
        self.verifier = AgenticVerifier::new(self.pipeline.clone());
        self.config.rag = rag;
        Ok(())
    }
}

fn build_pipeline(
    config: RagConfig,
    index: &Arc<LegalIndex>,
    generator: &Arc<dyn GenerationProvider>,
) -> Result<RagPipeline> {
    RagPipeline::builder()
        .config(config)
        .index(index.clone())
        .generator(generator.clone())
        .build()
        .context("failed to build the RAG pipeline")
}

#[cfg(feature = "qdrant")]
fn vector_store(config: &AppConfig) -> Result<Arc<dyn VectorStore>> {
    if let Some(url) = &config.qdrant_url {
        info!(url = url.as_str(), "using Qdrant vector store");
        let store = legal_rag::QdrantVectorStore::new(url)
            .with_context(|| format!("failed to connect to Qdrant at {url}"))?;
        return Ok(Arc::new(store));
    }
    Ok(Arc::new(InMemoryVectorStore::new()))
}

#[cfg(not(feature = "qdrant"))]
fn vector_store(config: &AppConfig) -> Result<Arc<dyn VectorStore>> {
    if config.qdrant_url.is_some() {
        tracing::warn!("LEGAL_RAG_QDRANT_URL is set but the qdrant feature is disabled; using memory");
    }
    Ok(Arc::new(InMemoryVectorStore::new()))
}
