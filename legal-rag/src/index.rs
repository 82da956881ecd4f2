//! Vector index adapter over an embedding provider and a vector store.
//!
//! [`LegalIndex`] owns one collection and is the only place documents are
//! embedded. Ingestion and queries go through the same provider, so stored
//! and query vectors share one embedding space.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info};

use crate::config::RagConfig;
use crate::document::{EmbeddingRecord, Jurisdiction, LegalDocument, RetrievalResult};
use crate::embedding::{EmbeddingProvider, truncate_for_embedding};
use crate::error::{LegalRagError, Result};
use crate::vectorstore::VectorStore;

/// Document counts for an index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    /// Collection name.
    pub collection: String,
    /// Total stored documents.
    pub document_count: usize,
    /// Stored documents per jurisdiction.
    pub by_jurisdiction: BTreeMap<Jurisdiction, usize>,
}

/// A named collection of embedded legal documents.
pub struct LegalIndex {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    collection: String,
    batch_size: usize,
    max_embedding_tokens: usize,
}

impl LegalIndex {
    /// Open (creating if needed) the collection named in `config`.
    pub async fn open(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        config: &RagConfig,
    ) -> Result<Self> {
        let index = Self {
            embedder,
            store,
            collection: config.collection.clone(),
            batch_size: config.embed_batch_size.max(1),
            max_embedding_tokens: config.max_embedding_tokens,
        };
        index.store.create_collection(&index.collection, index.embedder.dimensions()).await?;
        debug!(collection = %index.collection, model = index.embedder.model_name(), "opened index");
        Ok(index)
    }

    /// The collection this index reads and writes.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Embed and store documents in batches. Returns the number stored.
    ///
    /// Re-ingesting a document id overwrites the previous record.
    ///
    /// # Errors
    ///
    /// Returns [`LegalRagError::EmbeddingService`] when embedding fails. Batches
    /// stored before the failure remain stored.
    pub async fn upsert(&self, documents: &[LegalDocument]) -> Result<usize> {
        let mut stored = 0;
        for (batch_idx, batch) in documents.chunks(self.batch_size).enumerate() {
            let texts: Vec<&str> = batch
                .iter()
                .map(|d| truncate_for_embedding(&d.text, self.max_embedding_tokens))
                .collect();

            let embeddings = self.embedder.embed_batch(&texts).await.map_err(|e| {
                error!(collection = %self.collection, batch = batch_idx, error = %e, "embedding failed during ingestion");
                e
            })?;
            if embeddings.len() != batch.len() {
                return Err(LegalRagError::embedding(
                    self.embedder.model_name(),
                    format!("expected {} embeddings, got {}", batch.len(), embeddings.len()),
                ));
            }

            let records: Vec<EmbeddingRecord> = batch
                .iter()
                .zip(embeddings)
                .map(|(document, embedding)| EmbeddingRecord {
                    id: document.id.clone(),
                    embedding,
                    document: document.clone(),
                })
                .collect();
            self.store.upsert(&self.collection, &records).await?;

            stored += records.len();
            debug!(collection = %self.collection, batch = batch_idx, size = records.len(), "stored batch");
        }

        info!(collection = %self.collection, document_count = stored, "ingested documents");
        Ok(stored)
    }

    /// Retrieve the `top_k` documents nearest to `question`.
    ///
    /// When `filter` is set only documents of that jurisdiction are ranked.
    ///
    /// # Errors
    ///
    /// Returns [`LegalRagError::InvalidArgument`] when `top_k` is zero.
    pub async fn query(
        &self,
        question: &str,
        top_k: usize,
        filter: Option<Jurisdiction>,
    ) -> Result<RetrievalResult> {
        if top_k == 0 {
            return Err(LegalRagError::InvalidArgument("top_k must be greater than zero".into()));
        }

        if self.store.count(&self.collection, filter).await? == 0 {
            info!(collection = %self.collection, ?filter, result_count = 0, "query completed (empty index)");
            return Ok(RetrievalResult::default());
        }

        let embedding = self.embedder.embed(question).await.map_err(|e| {
            error!(error = %e, "embedding failed during query");
            e
        })?;
        let hits = self.store.search(&self.collection, &embedding, top_k, filter).await?;
        let result = RetrievalResult::new(hits);

        info!(collection = %self.collection, ?filter, top_k, result_count = result.len(), "query completed");
        Ok(result)
    }

    /// Document counts overall and per jurisdiction.
    pub async fn stats(&self) -> Result<IndexStats> {
        let mut by_jurisdiction = BTreeMap::new();
        for jurisdiction in Jurisdiction::ALL {
            by_jurisdiction.insert(jurisdiction, self.store.count(&self.collection, Some(jurisdiction)).await?);
        }
        Ok(IndexStats {
            collection: self.collection.clone(),
            document_count: self.store.count(&self.collection, None).await?,
            by_jurisdiction,
        })
    }

    /// Drop every stored document and recreate the empty collection.
    pub async fn reset(&self) -> Result<()> {
        self.store.delete_collection(&self.collection).await?;
        self.store.create_collection(&self.collection, self.embedder.dimensions()).await?;
        info!(collection = %self.collection, "reset index");
        Ok(())
    }
}
