//! # legal-rag
//!
//! Jurisdiction-aware retrieval-augmented question answering over case law
//! and federal regulations.
//!
//! ## Overview
//!
//! Documents are fetched from public legal-data APIs ([`sources`]),
//! normalized into [`LegalDocument`]s, embedded, and stored in a
//! [`VectorStore`] behind a [`LegalIndex`]. Questions are answered by the
//! [`RagPipeline`], which retrieves the closest documents (optionally
//! restricted to one [`Jurisdiction`]) and asks a hosted model for an answer
//! that cites them by number. The [`AgenticVerifier`] adds a multi-step
//! research flow with jurisdiction analysis and citation checks.
//!
//! Quality is measured two ways: ranking metrics over judged queries
//! ([`metrics`]) and an AI judge scoring answers against a rubric
//! ([`JudgeEvaluator`]). User ratings are kept by the [`FeedbackStore`].
//!
//! ## Features
//!
//! - `qdrant` - Qdrant vector store backend
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use legal_rag::*;
//!
//! let config = AppConfig::from_env()?;
//! let mistral = Arc::new(MistralClient::new(&config.mistral_api_key)?);
//! let index = LegalIndex::open(mistral.clone(), Arc::new(InMemoryVectorStore::new()), &config.rag).await?;
//! index.upsert(&sample_corpus()).await?;
//!
//! let pipeline = RagPipeline::builder()
//!     .config(config.rag.clone())
//!     .index(Arc::new(index))
//!     .generator(mistral)
//!     .build()?;
//! let answer = pipeline.ask("When must police give Miranda warnings?", Some(Jurisdiction::Federal)).await?;
//! ```

pub mod config;
pub mod corpus;
pub mod document;
pub mod embedding;
pub mod error;
pub mod evaluator;
pub mod feedback;
pub mod generation;
pub mod index;
pub mod inmemory;
pub mod metrics;
pub mod mistral;
pub mod normalizer;
pub mod pipeline;
pub mod sample;
pub mod sources;
pub mod vectorstore;
pub mod verifier;

#[cfg(feature = "qdrant")]
pub mod qdrant;

pub use config::{AppConfig, MAX_TOP_K, RagConfig, RagConfigBuilder, SourceCredentials};
pub use corpus::{RelevanceJudgments, append_jsonl, read_judgments, read_jsonl, write_jsonl};
pub use document::{
    DocumentType, EmbeddingRecord, Jurisdiction, JurisdictionScope, LegalDocument, RetrievalResult,
    RetrievedDocument,
};
pub use embedding::EmbeddingProvider;
pub use error::{LegalRagError, Result};
pub use evaluator::{EvaluationItem, EvaluationRecord, EvaluationSummary, JudgeEvaluator};
pub use feedback::{FeedbackAnalyzer, FeedbackRecord, FeedbackStats, FeedbackStore, FeedbackSubmission};
pub use generation::{ChatMessage, GenerationProvider, GenerationRequest, ModelTier};
pub use index::{IndexStats, LegalIndex};
pub use inmemory::InMemoryVectorStore;
pub use metrics::{QueryAnalytics, RankingReport, RetrievalEvaluation};
pub use mistral::MistralClient;
pub use normalizer::{SourceKind, normalize};
pub use pipeline::{NO_SOURCES_ANSWER, RagAnswer, RagPipeline, RagPipelineBuilder, SourceCitation};
pub use sample::sample_corpus;
pub use sources::{FetchReport, LegalSource, SourceSelection, SourceSet};
pub use vectorstore::VectorStore;
pub use verifier::{AgenticVerifier, VerifiedAnswer};

#[cfg(feature = "qdrant")]
pub use qdrant::QdrantVectorStore;
