//! Deterministic test doubles for the embedding and generation providers.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use legal_rag::error::{LegalRagError, Result};
use legal_rag::generation::{GenerationProvider, GenerationRequest};
use legal_rag::{EmbeddingProvider, InMemoryVectorStore, LegalIndex, RagConfig};

pub const DIM: usize = 64;

/// Bag-of-words embedder: each lowercase word hashes (FNV-1a) into a bucket.
///
/// Texts sharing words get nearby vectors, which is enough to rank a small
/// corpus without a network call.
pub struct HashEmbedder {
    pub calls: AtomicUsize,
}

impl HashEmbedder {
    pub fn new() -> Self {
        Self { calls: AtomicUsize::new(0) }
    }

    pub fn vector(text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; DIM];
        for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| w.len() > 2) {
            let mut hash: u64 = 0xcbf29ce484222325;
            for byte in word.to_lowercase().bytes() {
                hash ^= u64::from(byte);
                hash = hash.wrapping_mul(0x100000001b3);
            }
            v[(hash % DIM as u64) as usize] += 1.0;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            v.iter_mut().for_each(|x| *x /= norm);
        }
        v
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Self::vector(text))
    }

    fn dimensions(&self) -> usize {
        DIM
    }

    fn model_name(&self) -> &str {
        "hash-embedder"
    }
}

/// Hash embedder that can be switched into an outage.
///
/// While down, every call fails with `EmbeddingService` and is not counted.
pub struct OutageEmbedder {
    inner: HashEmbedder,
    down: AtomicBool,
}

impl OutageEmbedder {
    pub fn new() -> Self {
        Self { inner: HashEmbedder::new(), down: AtomicBool::new(false) }
    }

    pub fn go_down(&self) {
        self.down.store(true, Ordering::SeqCst);
    }

    pub fn successful_calls(&self) -> usize {
        self.inner.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for OutageEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if self.down.load(Ordering::SeqCst) {
            return Err(LegalRagError::EmbeddingService {
                provider: "outage".into(),
                message: "503 Service Unavailable".into(),
            });
        }
        self.inner.embed(text).await
    }

    fn dimensions(&self) -> usize {
        DIM
    }

    fn model_name(&self) -> &str {
        "outage-embedder"
    }
}

/// Replays canned replies in order and records every request.
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<Result<String>>>,
    pub requests: Mutex<Vec<GenerationRequest>>,
    pub calls: AtomicUsize,
}

impl ScriptedGenerator {
    pub fn new(replies: Vec<&str>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| Ok(r.to_string())).collect()),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        let generator = Self::new(Vec::new());
        generator
            .replies
            .lock()
            .unwrap()
            .push_back(Err(LegalRagError::Generation { provider: "scripted".into(), message: "quota exceeded".into() }));
        generator
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationProvider for ScriptedGenerator {
    async fn generate(&self, request: GenerationRequest) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);
        self.replies.lock().unwrap().pop_front().unwrap_or_else(|| {
            Err(LegalRagError::Generation { provider: "scripted".into(), message: "no reply scripted".into() })
        })
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// An empty in-memory index over the hash embedder.
pub async fn empty_index(config: &RagConfig) -> (LegalIndex, Arc<HashEmbedder>) {
    let embedder = Arc::new(HashEmbedder::new());
    let index = LegalIndex::open(embedder.clone(), Arc::new(InMemoryVectorStore::new()), config)
        .await
        .unwrap();
    (index, embedder)
}

/// An empty in-memory index over an embedder that can be taken down.
pub async fn outage_index(config: &RagConfig) -> (LegalIndex, Arc<OutageEmbedder>) {
    let embedder = Arc::new(OutageEmbedder::new());
    let index = LegalIndex::open(embedder.clone(), Arc::new(InMemoryVectorStore::new()), config)
        .await
        .unwrap();
    (index, embedder)
}
