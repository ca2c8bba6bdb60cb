//! Semantic retrieval over embedded document chunks.
//!
//! Chunked document text is embedded and held in a [`ChunkStore`]; a
//! query embeds the question text and ranks stored chunks by cosine
//! similarity. The in-memory store is the only backend; the traits keep
//! the embedding service and the store swappable in tests.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use indexmap::IndexMap;
use thiserror::Error;
use tracing::debug;

/// Errors from embedding text or touching the chunk store.
#[derive(Debug, Error)]
pub enum SemanticError {
    /// The embedding service rejected or failed the request.
    #[error("embedding failed: {0}")]
    Embed(String),

    /// The store could not complete the operation.
    #[error("chunk store operation failed: {0}")]
    Store(String),
}

/// Turns text into fixed-length vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embeds each input text, preserving order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, SemanticError>;
}

/// A chunk returned from a store query, highest score first.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub id: String,
    pub content: String,
    pub metadata: IndexMap<String, String>,
    pub score: f32,
}

/// Holds embedded chunks and answers similarity queries.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Stores `content` under `id`, replacing any chunk already there.
    async fn upsert(
        &self,
        id: &str,
        content: &str,
        metadata: IndexMap<String, String>,
    ) -> Result<(), SemanticError>;

    /// Returns the `top_k` stored chunks most similar to `text`.
    async fn query(&self, text: &str, top_k: usize) -> Result<Vec<ScoredChunk>, SemanticError>;
}

struct StoredChunk {
    id: String,
    content: String,
    metadata: IndexMap<String, String>,
    embedding: Vec<f32>,
}

/// In-memory [`ChunkStore`] ranking by cosine similarity.
pub struct MemoryChunkStore {
    embedder: Arc<dyn Embedder>,
    chunks: Mutex<Vec<StoredChunk>>,
}

impl MemoryChunkStore {
    #[must_use]
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            chunks: Mutex::new(Vec::new()),
        }
    }

    /// Number of chunks currently stored.
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.chunks_mut().len()
    }

    fn chunks_mut(&self) -> MutexGuard<'_, Vec<StoredChunk>> {
        self.chunks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, SemanticError> {
        let inputs = [text.to_string()];
        let mut vectors = self.embedder.embed(&inputs).await?;
        vectors
            .pop()
            .ok_or_else(|| SemanticError::Embed("embedding service returned no vector".to_string()))
    }
}

impl std::fmt::Debug for MemoryChunkStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryChunkStore")
            .field("chunks", &self.chunk_count())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ChunkStore for MemoryChunkStore {
    async fn upsert(
        &self,
        id: &str,
        content: &str,
        metadata: IndexMap<String, String>,
    ) -> Result<(), SemanticError> {
        let embedding = self.embed_one(content).await?;
        let stored = StoredChunk {
            id: id.to_string(),
            content: content.to_string(),
            metadata,
            embedding,
        };

        let mut chunks = self.chunks_mut();
        if let Some(existing) = chunks.iter_mut().find(|chunk| chunk.id == id) {
            *existing = stored;
        } else {
            chunks.push(stored);
        }
        Ok(())
    }

    async fn query(&self, text: &str, top_k: usize) -> Result<Vec<ScoredChunk>, SemanticError> {
        let query_embedding = self.embed_one(text).await?;

        let mut scored: Vec<ScoredChunk> = self
            .chunks_mut()
            .iter()
            .map(|chunk| ScoredChunk {
                id: chunk.id.clone(),
                content: chunk.content.clone(),
                metadata: chunk.metadata.clone(),
                score: cosine_similarity(&query_embedding, &chunk.embedding),
            })
            .collect();

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(top_k);
        debug!(returned = scored.len(), top_k, "chunk store query");
        Ok(scored)
    }
}

/// Cosine similarity of two vectors; zero for mismatched or zero-length
/// inputs.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
