//! Qdrant vector store backend.
//!
//! Provides [`QdrantVectorStore`] which implements [`VectorStore`] using
//! the [qdrant-client](https://docs.rs/qdrant-client) crate over gRPC.
//! Jurisdiction filters run server-side against a keyword payload index.
//!
//! # Example
//!
//! ```rust,ignore
//! use legal_rag::qdrant::QdrantVectorStore;
//!
//! let store = QdrantVectorStore::new("http://localhost:6334")?;
//! store.create_collection("legal_documents", 1024).await?;
//! ```

use std::collections::HashMap;

use async_trait::async_trait;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{
    Condition, CountPointsBuilder, CreateCollectionBuilder, CreateFieldIndexCollectionBuilder,
    Distance, FieldType, Filter, PointStruct, SearchPointsBuilder, UpsertPointsBuilder,
    Value as QdrantValue, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::document::{EmbeddingRecord, Jurisdiction, LegalDocument, RetrievedDocument};
use crate::error::{LegalRagError, Result};
use crate::vectorstore::VectorStore;

const BACKEND: &str = "qdrant";

/// A [`VectorStore`] backed by [Qdrant](https://qdrant.tech/).
///
/// Point ids are UUID v5 values derived from document ids, so upserting the
/// same document twice overwrites it. Every document field is stored as a
/// string payload entry.
pub struct QdrantVectorStore {
    client: Qdrant,
}

impl QdrantVectorStore {
    /// Create a new Qdrant vector store connecting to the given URL.
    pub fn new(url: &str) -> Result<Self> {
        let client = Qdrant::from_url(url).build().map_err(Self::map_err)?;
        Ok(Self { client })
    }

    /// Create a new Qdrant vector store from an existing client.
    pub fn from_client(client: Qdrant) -> Self {
        Self { client }
    }

    fn map_err(e: qdrant_client::QdrantError) -> LegalRagError {
        LegalRagError::VectorStore { backend: BACKEND.to_string(), message: e.to_string() }
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        let collections = self.client.list_collections().await.map_err(Self::map_err)?;
        Ok(collections.collections.iter().any(|c| c.name == name))
    }

    fn filter(jurisdiction: Jurisdiction) -> Filter {
        Filter::must([Condition::matches("jurisdiction", jurisdiction.as_str().to_string())])
    }
}

/// Stable point id for a document id.
pub fn point_id(document_id: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, document_id.as_bytes()).to_string()
}

fn to_payload(document: &LegalDocument) -> Result<Payload> {
    let value = serde_json::to_value(document)?;
    Payload::try_from(value).map_err(QdrantVectorStore::map_err)
}

fn extract_string(value: &QdrantValue) -> Option<String> {
    match &value.kind {
        Some(Kind::StringValue(s)) => Some(s.clone()),
        _ => None,
    }
}

fn from_payload(payload: &HashMap<String, QdrantValue>) -> Option<LegalDocument> {
    let field = |name: &str| payload.get(name).and_then(extract_string).unwrap_or_default();
    Some(LegalDocument {
        id: payload.get("id").and_then(extract_string)?,
        case_name: field("case_name"),
        citation: field("citation"),
        court: field("court"),
        jurisdiction: field("jurisdiction").parse().ok()?,
        date_filed: field("date_filed"),
        text: field("text"),
        snippet: field("snippet"),
        url: field("url"),
        document_type: field("document_type").parse().ok()?,
    })
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        if self.exists(name).await? {
            debug!(collection = name, "qdrant collection already exists, skipping creation");
            return Ok(());
        }

        self.client
            .create_collection(
                CreateCollectionBuilder::new(name)
                    .vectors_config(VectorParamsBuilder::new(dimensions as u64, Distance::Cosine)),
            )
            .await
            .map_err(Self::map_err)?;
        self.client
            .create_field_index(CreateFieldIndexCollectionBuilder::new(
                name,
                "jurisdiction",
                FieldType::Keyword,
            ))
            .await
            .map_err(Self::map_err)?;

        debug!(collection = name, dimensions, "created qdrant collection");
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        if !self.exists(name).await? {
            return Ok(());
        }
        self.client.delete_collection(name).await.map_err(Self::map_err)?;
        debug!(collection = name, "deleted qdrant collection");
        Ok(())
    }

    async fn upsert(&self, collection: &str, records: &[EmbeddingRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let points = records
            .iter()
            .map(|record| {
                Ok(PointStruct::new(
                    point_id(&record.id),
                    record.embedding.clone(),
                    to_payload(&record.document)?,
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        self.client
            .upsert_points(UpsertPointsBuilder::new(collection, points).wait(true))
            .await
            .map_err(Self::map_err)?;

        debug!(collection, count = records.len(), "upserted records to qdrant");
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
        filter: Option<Jurisdiction>,
    ) -> Result<Vec<RetrievedDocument>> {
        let mut request = SearchPointsBuilder::new(collection, embedding.to_vec(), top_k as u64)
            .with_payload(true);
        if let Some(jurisdiction) = filter {
            request = request.filter(Self::filter(jurisdiction));
        }
        let response = self.client.search_points(request).await.map_err(Self::map_err)?;

        let results = response
            .result
            .into_iter()
            .filter_map(|scored| match from_payload(&scored.payload) {
                Some(document) => Some(RetrievedDocument { document, distance: 1.0 - scored.score }),
                None => {
                    warn!(collection, "skipping qdrant point with incomplete payload");
                    None
                }
            })
            .collect();

        Ok(results)
    }

    async fn count(&self, collection: &str, filter: Option<Jurisdiction>) -> Result<usize> {
        let mut request = CountPointsBuilder::new(collection).exact(true);
        if let Some(jurisdiction) = filter {
            request = request.filter(Self::filter(jurisdiction));
        }
        let response = self.client.count(request).await.map_err(Self::map_err)?;
        Ok(response.result.map(|r| r.count as usize).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::sample_corpus;

    #[test]
    fn point_ids_are_stable_uuids() {
        assert_eq!(point_id("sample_1"), point_id("sample_1"));
        assert_ne!(point_id("sample_1"), point_id("sample_2"));
        assert!(Uuid::parse_str(&point_id("sample_1")).is_ok());
    }

    #[test]
    fn payload_round_trips_documents() {
        for document in sample_corpus() {
            let payload: HashMap<String, QdrantValue> = to_payload(&document).unwrap().into();
            assert_eq!(from_payload(&payload), Some(document));
        }
    }
}
