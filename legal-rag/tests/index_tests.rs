//! Ingestion and retrieval through `LegalIndex` with a deterministic embedder.

mod common;

use std::sync::atomic::Ordering;

use common::{DIM, HashEmbedder, empty_index, outage_index};
use legal_rag::document::{DocumentType, Jurisdiction, LegalDocument};
use legal_rag::error::LegalRagError;
use legal_rag::inmemory::InMemoryVectorStore;
use legal_rag::vectorstore::VectorStore;
use legal_rag::{EmbeddingRecord, RagConfig, sample_corpus};
use proptest::prelude::*;

fn config() -> RagConfig {
    RagConfig::builder().collection("test_index").embed_batch_size(3).build().unwrap()
}

#[tokio::test]
async fn upsert_is_idempotent_per_id() {
    let (index, _) = empty_index(&config()).await;
    let corpus = sample_corpus();

    assert_eq!(index.upsert(&corpus).await.unwrap(), 12);
    assert_eq!(index.upsert(&corpus[..4]).await.unwrap(), 4);

    let stats = index.stats().await.unwrap();
    assert_eq!(stats.document_count, 12);
    assert_eq!(stats.by_jurisdiction[&Jurisdiction::Federal], 9);
    assert_eq!(stats.by_jurisdiction[&Jurisdiction::State], 3);
}

#[tokio::test]
async fn embedding_outage_fails_ingestion_and_query() {
    let (index, embedder) = outage_index(&config()).await;
    let corpus = sample_corpus();
    index.upsert(&corpus[..3]).await.unwrap();

    embedder.go_down();
    let err = index.upsert(&corpus[3..]).await.unwrap_err();
    assert!(matches!(err, LegalRagError::EmbeddingService { .. }));
    let err = index.query("miranda warnings", 5, None).await.unwrap_err();
    assert!(matches!(err, LegalRagError::EmbeddingService { .. }));

    assert_eq!(index.stats().await.unwrap().document_count, 3);
    assert_eq!(embedder.successful_calls(), 3);
}

#[tokio::test]
async fn empty_index_returns_nothing_without_embedding() {
    let (index, embedder) = empty_index(&config()).await;
    let result = index.query("miranda warnings", 5, None).await.unwrap();
    assert!(result.is_empty());
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn zero_top_k_is_rejected() {
    let (index, _) = empty_index(&config()).await;
    let err = index.query("anything", 0, None).await.unwrap_err();
    assert!(matches!(err, LegalRagError::InvalidArgument(_)));
}

#[tokio::test]
async fn closest_document_ranks_first() {
    let (index, _) = empty_index(&config()).await;
    index.upsert(&sample_corpus()).await.unwrap();

    let miranda = sample_corpus().into_iter().find(|d| d.id == "sample_3").unwrap();
    let result = index.query(&miranda.text, 3, None).await.unwrap();
    assert_eq!(result.ids()[0], "sample_3");
    assert!(result.documents[0].distance < 1e-4);
}

#[tokio::test]
async fn filter_excludes_other_jurisdictions() {
    let (index, _) = empty_index(&config()).await;
    index.upsert(&sample_corpus()).await.unwrap();

    let result = index.query("school discrimination education", 10, Some(Jurisdiction::State)).await.unwrap();
    assert_eq!(result.len(), 3);
    assert!(result.iter().all(|hit| hit.document.jurisdiction == Jurisdiction::State));
}

#[tokio::test]
async fn reset_empties_the_collection() {
    let (index, _) = empty_index(&config()).await;
    index.upsert(&sample_corpus()).await.unwrap();
    index.reset().await.unwrap();

    let stats = index.stats().await.unwrap();
    assert_eq!(stats.document_count, 0);
    assert!(index.query("privacy", 5, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn missing_collection_is_a_store_error() {
    let store = InMemoryVectorStore::new();
    let err = store.search("nope", &[0.0; DIM], 3, None).await.unwrap_err();
    assert!(matches!(err, LegalRagError::VectorStore { .. }));
}

fn arb_document() -> impl Strategy<Value = LegalDocument> {
    ("[a-z]{4,8}", "[a-z]{3,9}( [a-z]{3,9}){2,10}", any::<bool>()).prop_map(|(id, text, federal)| {
        LegalDocument {
            id,
            case_name: "Case".into(),
            citation: String::new(),
            court: String::new(),
            jurisdiction: if federal { Jurisdiction::Federal } else { Jurisdiction::State },
            date_filed: String::new(),
            text,
            snippet: String::new(),
            url: String::new(),
            document_type: DocumentType::CaseLaw,
        }
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Results never exceed `top_k`, are ordered by ascending distance and
    /// honor the jurisdiction filter.
    #[test]
    fn query_is_bounded_sorted_and_filtered(
        docs in proptest::collection::vec(arb_document(), 1..25),
        question in "[a-z]{3,9}( [a-z]{3,9}){0,5}",
        top_k in 1usize..12,
        filter in proptest::option::of(prop_oneof![Just(Jurisdiction::Federal), Just(Jurisdiction::State)]),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let result = rt.block_on(async {
            let store = InMemoryVectorStore::new();
            store.create_collection("prop", DIM).await.unwrap();
            let records: Vec<EmbeddingRecord> = docs
                .iter()
                .map(|d| EmbeddingRecord {
                    id: d.id.clone(),
                    embedding: HashEmbedder::vector(&d.text),
                    document: d.clone(),
                })
                .collect();
            store.upsert("prop", &records).await.unwrap();
            store.search("prop", &HashEmbedder::vector(&question), top_k, filter).await.unwrap()
        });

        prop_assert!(result.len() <= top_k);
        for pair in result.windows(2) {
            prop_assert!(pair[0].distance <= pair[1].distance);
        }
        if let Some(expected) = filter {
            prop_assert!(result.iter().all(|hit| hit.document.jurisdiction == expected));
        }
    }
}
