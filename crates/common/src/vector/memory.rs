//! Process-local similarity oracle

use super::{DocumentChunk, SearchHit, SimilarityOracle};
use crate::embeddings::{cosine_similarity, Embedder};
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

struct Entry {
    vector_id: String,
    embedding: Vec<f32>,
    chunk: DocumentChunk,
}

/// Brute-force cosine index held in memory
pub struct MemoryOracle {
    embedder: Arc<dyn Embedder>,
    entries: RwLock<Vec<Entry>>,
    connected: AtomicBool,
}

impl MemoryOracle {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            entries: RwLock::new(Vec::new()),
            connected: AtomicBool::new(true),
        }
    }

    /// Flip the health flag, e.g. to exercise degraded retrieval
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl SimilarityOracle for MemoryOracle {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        if !self.is_connected() {
            return Err(AppError::Oracle {
                message: "memory oracle is disconnected".to_string(),
            });
        }

        let query_embedding = self.embedder.embed(query).await?;
        let entries = self.entries.read().await;

        let mut hits: Vec<SearchHit> = entries
            .iter()
            .map(|entry| SearchHit {
                chunk: entry.chunk.clone(),
                score: cosine_similarity(&query_embedding, &entry.embedding),
                vector_id: entry.vector_id.clone(),
            })
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(limit);

        Ok(hits)
    }

    async fn upsert(&self, chunks: &[DocumentChunk]) -> Result<Vec<String>> {
        if !self.is_connected() {
            return Err(AppError::Oracle {
                message: "memory oracle is disconnected".to_string(),
            });
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        let mut entries = self.entries.write().await;
        let mut ids = Vec::with_capacity(chunks.len());

        for (chunk, embedding) in chunks.iter().zip(embeddings) {
            let vector_id = Uuid::new_v4().to_string();
            ids.push(vector_id.clone());
            entries.push(Entry {
                vector_id,
                embedding,
                chunk: chunk.clone(),
            });
        }

        Ok(ids)
    }

    fn name(&self) -> &str {
        "memory"
    }
}
