//! In-memory vector store using cosine distance.
//!
//! This module provides [`InMemoryVectorStore`], a vector store backed by a
//! `HashMap` protected by a `tokio::sync::RwLock`. It is the default backend
//! for the CLI and for tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::document::{EmbeddingRecord, Jurisdiction, RetrievedDocument};
use crate::error::{LegalRagError, Result};
use crate::vectorstore::VectorStore;

const BACKEND: &str = "InMemory";

/// An in-memory vector store using cosine distance for search.
///
/// Collections are stored as nested `HashMap`s: collection name → document ID → record.
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, HashMap<String, EmbeddingRecord>>>,
}

impl InMemoryVectorStore {
    /// Create a new empty in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn missing(collection: &str) -> LegalRagError {
    LegalRagError::VectorStore {
        backend: BACKEND.to_string(),
        message: format!("collection '{collection}' does not exist"),
    }
}

/// Cosine distance, `1 - cosine similarity`.
///
/// A zero-magnitude vector has similarity 0, so its distance is 1.
pub(crate) fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a * norm_b)
}

fn matches(record: &EmbeddingRecord, filter: Option<Jurisdiction>) -> bool {
    filter.is_none_or(|j| record.document.jurisdiction == j)
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn create_collection(&self, name: &str, _dimensions: usize) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections.entry(name.to_string()).or_default();
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections.remove(name);
        Ok(())
    }

    async fn upsert(&self, collection: &str, records: &[EmbeddingRecord]) -> Result<()> {
        let mut collections = self.collections.write().await;
        let store = collections.get_mut(collection).ok_or_else(|| missing(collection))?;
        for record in records {
            store.insert(record.id.clone(), record.clone());
        }
        debug!(collection, count = records.len(), total = store.len(), "upserted records");
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
        filter: Option<Jurisdiction>,
    ) -> Result<Vec<RetrievedDocument>> {
        let collections = self.collections.read().await;
        let store = collections.get(collection).ok_or_else(|| missing(collection))?;

        let mut scored: Vec<RetrievedDocument> = store
            .values()
            .filter(|record| matches(record, filter))
            .map(|record| RetrievedDocument {
                document: record.document.clone(),
                distance: cosine_distance(&record.embedding, embedding),
            })
            .collect();

        scored.sort_by(|a, b| {
            a.distance.total_cmp(&b.distance).then_with(|| a.document.id.cmp(&b.document.id))
        });
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn count(&self, collection: &str, filter: Option<Jurisdiction>) -> Result<usize> {
        let collections = self.collections.read().await;
        let store = collections.get(collection).ok_or_else(|| missing(collection))?;
        Ok(store.values().filter(|record| matches(record, filter)).count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::sample_case_law;

    fn record(index: usize, embedding: Vec<f32>) -> EmbeddingRecord {
        let document = sample_case_law().swap_remove(index);
        EmbeddingRecord { id: document.id.clone(), embedding, document }
    }

    #[test]
    fn distance_of_identical_vectors_is_zero() {
        assert!(cosine_distance(&[1.0, 2.0], &[2.0, 4.0]).abs() < 1e-6);
        assert!((cosine_distance(&[1.0, 0.0], &[0.0, 1.0]) - 1.0).abs() < 1e-6);
        assert_eq!(cosine_distance(&[0.0, 0.0], &[1.0, 0.0]), 1.0);
    }

    #[tokio::test]
    async fn filter_applies_before_top_k() {
        let store = InMemoryVectorStore::new();
        store.create_collection("c", 2).await.unwrap();
        // sample_1 is federal and closest; sample_4 is state and further away.
        store
            .upsert("c", &[record(0, vec![1.0, 0.0]), record(3, vec![0.0, 1.0])])
            .await
            .unwrap();

        let hits = store.search("c", &[1.0, 0.0], 1, Some(Jurisdiction::State)).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document.id, "sample_4");
        assert_eq!(store.count("c", Some(Jurisdiction::Federal)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn upsert_overwrites_by_id() {
        let store = InMemoryVectorStore::new();
        store.create_collection("c", 2).await.unwrap();
        store.upsert("c", &[record(0, vec![1.0, 0.0])]).await.unwrap();
        store.upsert("c", &[record(0, vec![0.0, 1.0])]).await.unwrap();
        assert_eq!(store.count("c", None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn missing_collection_is_an_error() {
        let store = InMemoryVectorStore::new();
        let err = store.search("nope", &[1.0], 3, None).await.unwrap_err();
        assert!(matches!(err, LegalRagError::VectorStore { .. }));
    }
}
