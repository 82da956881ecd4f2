//! Error types for the `legal-rag` crate.

use thiserror::Error;

/// Errors that can occur while ingesting, retrieving, generating or evaluating.
///
/// None of these are retried by the crate; they propagate to the nearest
/// interactive boundary. Dropping a malformed source record during
/// normalization is not an error and never shows up here.
#[derive(Debug, Error)]
pub enum LegalRagError {
    /// A required credential is missing or a configuration value is invalid.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The embedding service failed or returned an unusable response.
    #[error("Embedding service error ({provider}): {message}")]
    EmbeddingService {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The generation service failed or returned an unusable response.
    #[error("Generation error ({provider}): {message}")]
    Generation {
        /// The generation provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The judge model returned output that does not match the rubric schema.
    #[error("Evaluation parse error: {0}")]
    EvaluationParse(String),

    /// A legal-data source request failed.
    #[error("Source fetch error ({source_name}): {message}")]
    SourceFetch {
        /// The legal-data source that failed.
        source_name: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred in the vector store backend.
    #[error("Vector store error ({backend}): {message}")]
    VectorStore {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// A closed-set field received a value outside its recognized set.
    #[error("Invalid value '{value}' for field '{field}'")]
    InvalidField {
        /// The field name.
        field: &'static str,
        /// The rejected value.
        value: String,
    },

    /// An argument was outside its valid range.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// An I/O error while reading or writing JSONL files.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A JSON (de)serialization error.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl LegalRagError {
    pub(crate) fn generation(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Generation { provider: provider.into(), message: message.into() }
    }

    pub(crate) fn embedding(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::EmbeddingService { provider: provider.into(), message: message.into() }
    }

    pub(crate) fn source_fetch(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SourceFetch { source_name: source.into(), message: message.into() }
    }
}

/// A convenience result type for legal-rag operations.
pub type Result<T> = std::result::Result<T, LegalRagError>;
