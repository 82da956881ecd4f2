//! Configuration for retrieval, generation and the external services.

use serde::{Deserialize, Serialize};

use crate::error::{LegalRagError, Result};
use crate::generation::ModelTier;

/// Largest `top_k` accepted by the pipeline.
pub const MAX_TOP_K: usize = 10;

/// Tunable parameters for indexing, retrieval and answer generation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Number of documents retrieved per question (1–10).
    pub top_k: usize,
    /// Model tier used for answers.
    pub model: ModelTier,
    /// Answer sampling temperature (0.0–1.0).
    pub temperature: f32,
    /// Completion token cap for answers.
    pub max_answer_tokens: u32,
    /// Documents embedded per request during ingestion.
    pub embed_batch_size: usize,
    /// Estimated token budget per embedded text.
    pub max_embedding_tokens: usize,
    /// Vector store collection name.
    pub collection: String,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            model: ModelTier::Small,
            temperature: 0.3,
            max_answer_tokens: 1500,
            embed_batch_size: 10,
            max_embedding_tokens: 8192,
            collection: "legal_documents".to_string(),
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Check that every parameter is within range.
    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 || self.top_k > MAX_TOP_K {
            return Err(LegalRagError::Configuration(format!(
                "top_k ({}) must be between 1 and {MAX_TOP_K}",
                self.top_k
            )));
        }
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(LegalRagError::Configuration(format!(
                "temperature ({}) must be between 0.0 and 1.0",
                self.temperature
            )));
        }
        if self.embed_batch_size == 0 {
            return Err(LegalRagError::Configuration(
                "embed_batch_size must be greater than zero".to_string(),
            ));
        }
        if self.max_embedding_tokens == 0 || self.max_answer_tokens == 0 {
            return Err(LegalRagError::Configuration(
                "token limits must be greater than zero".to_string(),
            ));
        }
        if self.collection.trim().is_empty() {
            return Err(LegalRagError::Configuration("collection name must not be empty".into()));
        }
        Ok(())
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the number of documents retrieved per question.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the answer model tier.
    pub fn model(mut self, model: ModelTier) -> Self {
        self.config.model = model;
        self
    }

    /// Set the answer sampling temperature.
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = temperature;
        self
    }

    /// Set the answer completion token cap.
    pub fn max_answer_tokens(mut self, tokens: u32) -> Self {
        self.config.max_answer_tokens = tokens;
        self
    }

    /// Set how many documents are embedded per request.
    pub fn embed_batch_size(mut self, size: usize) -> Self {
        self.config.embed_batch_size = size;
        self
    }

    /// Set the per-text embedding token budget.
    pub fn max_embedding_tokens(mut self, tokens: usize) -> Self {
        self.config.max_embedding_tokens = tokens;
        self
    }

    /// Set the vector store collection name.
    pub fn collection(mut self, name: impl Into<String>) -> Self {
        self.config.collection = name.into();
        self
    }

    /// Build the [`RagConfig`], validating every parameter.
    ///
    /// # Errors
    ///
    /// Returns [`LegalRagError::Configuration`] if:
    /// - `top_k` is outside 1–10
    /// - `temperature` is outside 0.0–1.0
    /// - a batch size or token limit is zero
    /// - the collection name is blank
    pub fn build(self) -> Result<RagConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Optional legal-data API credentials. Blank values count as unset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceCredentials {
    /// CourtListener token (`COURTLISTENER_API_TOKEN`).
    pub courtlistener_token: Option<String>,
    /// GovInfo key (`GOVINFO_API_KEY`).
    pub govinfo_api_key: Option<String>,
    /// Regulations.gov key (`REGULATIONS_GOV_API_KEY`).
    pub regulations_gov_api_key: Option<String>,
}

impl SourceCredentials {
    /// Read credentials from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read credentials from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Self {
            courtlistener_token: get("COURTLISTENER_API_TOKEN"),
            govinfo_api_key: get("GOVINFO_API_KEY"),
            regulations_gov_api_key: get("REGULATIONS_GOV_API_KEY"),
        }
    }
}

/// Credentials and overrides read from the process environment.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Mistral API key (`MISTRAL_API_KEY`, required).
    pub mistral_api_key: String,
    /// Legal-data API credentials.
    pub sources: SourceCredentials,
    /// Qdrant endpoint (`LEGAL_RAG_QDRANT_URL`); the in-memory store is used when unset.
    pub qdrant_url: Option<String>,
    /// Retrieval and generation parameters, with `LEGAL_RAG_*` overrides applied.
    pub rag: RagConfig,
}

impl AppConfig {
    /// Read configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`LegalRagError::Configuration`] when `MISTRAL_API_KEY` is
    /// missing or an override fails to parse or validate.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let mistral_api_key = get("MISTRAL_API_KEY").ok_or_else(|| {
            LegalRagError::Configuration("MISTRAL_API_KEY environment variable not set".into())
        })?;

        let mut builder = RagConfig::builder();
        if let Some(raw) = get("LEGAL_RAG_TOP_K") {
            let top_k = raw.trim().parse().map_err(|_| {
                LegalRagError::Configuration(format!("LEGAL_RAG_TOP_K is not an integer: {raw}"))
            })?;
            builder = builder.top_k(top_k);
        }
        if let Some(raw) = get("LEGAL_RAG_MODEL") {
            let model = raw
                .parse()
                .map_err(|e| LegalRagError::Configuration(format!("LEGAL_RAG_MODEL: {e}")))?;
            builder = builder.model(model);
        }
        if let Some(raw) = get("LEGAL_RAG_TEMPERATURE") {
            let temperature = raw.trim().parse().map_err(|_| {
                LegalRagError::Configuration(format!("LEGAL_RAG_TEMPERATURE is not a number: {raw}"))
            })?;
            builder = builder.temperature(temperature);
        }

        Ok(Self {
            mistral_api_key,
            sources: SourceCredentials::from_lookup(&lookup),
            qdrant_url: get("LEGAL_RAG_QDRANT_URL"),
            rag: builder.build()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_are_valid() {
        let config = RagConfig::builder().build().unwrap();
        assert_eq!(config.top_k, 5);
        assert_eq!(config.model, ModelTier::Small);
        assert_eq!(config.max_answer_tokens, 1500);
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(RagConfig::builder().top_k(0).build().is_err());
        assert!(RagConfig::builder().top_k(11).build().is_err());
        assert!(RagConfig::builder().temperature(1.5).build().is_err());
        assert!(RagConfig::builder().collection(" ").build().is_err());
    }

    #[test]
    fn missing_api_key_is_fatal() {
        let err = AppConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, LegalRagError::Configuration(_)));
    }

    #[test]
    fn env_overrides_apply() {
        let config = AppConfig::from_lookup(lookup(&[
            ("MISTRAL_API_KEY", "k"),
            ("LEGAL_RAG_TOP_K", "3"),
            ("LEGAL_RAG_MODEL", "large"),
            ("GOVINFO_API_KEY", ""),
        ]))
        .unwrap();
        assert_eq!(config.rag.top_k, 3);
        assert_eq!(config.rag.model, ModelTier::Large);
        assert_eq!(config.sources.govinfo_api_key, None);
    }

    #[test]
    fn invalid_override_is_rejected() {
        let result =
            AppConfig::from_lookup(lookup(&[("MISTRAL_API_KEY", "k"), ("LEGAL_RAG_TOP_K", "20")]));
        assert!(result.is_err());
    }
}
