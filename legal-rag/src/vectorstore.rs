//! Vector store trait for storing and searching document embeddings.

use async_trait::async_trait;

use crate::document::{EmbeddingRecord, Jurisdiction, RetrievedDocument};
use crate::error::Result;

/// A storage backend for document embeddings with similarity search.
///
/// Implementations manage named collections of [`EmbeddingRecord`]s keyed by
/// document id. Searches may be restricted to one [`Jurisdiction`]; the filter
/// is applied before ranking, so `top_k` counts only matching records.
///
/// # Example
///
/// ```rust,ignore
/// use legal_rag::{InMemoryVectorStore, Jurisdiction, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.create_collection("legal_documents", 1024).await?;
/// store.upsert("legal_documents", &records).await?;
/// let hits = store.search("legal_documents", &query, 5, Some(Jurisdiction::State)).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create a named collection. No-op if it already exists.
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()>;

    /// Delete a named collection and all its data. No-op if it is absent.
    async fn delete_collection(&self, name: &str) -> Result<()>;

    /// Insert or overwrite records by id.
    async fn upsert(&self, collection: &str, records: &[EmbeddingRecord]) -> Result<()>;

    /// Search for the `top_k` records nearest to `embedding`.
    ///
    /// Returns results ordered by ascending cosine distance.
    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
        filter: Option<Jurisdiction>,
    ) -> Result<Vec<RetrievedDocument>>;

    /// Number of records in the collection, optionally restricted to one jurisdiction.
    async fn count(&self, collection: &str, filter: Option<Jurisdiction>) -> Result<usize>;
}
