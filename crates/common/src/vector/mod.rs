//! Similarity oracle capability
//!
//! The pipeline never searches vectors itself. It asks an oracle for the
//! passages most similar to a query and treats the ranking as opaque.
//! Two oracles ship with Folio:
//! - `QdrantOracle`, backed by a Qdrant collection over REST
//! - `MemoryOracle`, a process-local cosine index for development and tests

mod memory;
mod qdrant;

pub use memory::MemoryOracle;
pub use qdrant::QdrantOracle;

use crate::config::{VectorBackend, VectorConfig};
use crate::embeddings::Embedder;
use crate::errors::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A window of book text ready for embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub text: String,
    pub source_doc_id: String,
    pub section: String,
    pub title: String,
}

/// A chunk returned by the oracle for a query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(flatten)]
    pub chunk: DocumentChunk,

    /// Similarity, higher is more relevant
    pub score: f32,

    pub vector_id: String,
}

impl SearchHit {
    pub fn text(&self) -> &str {
        &self.chunk.text
    }
}

/// Ranked-similarity oracle over the stored chunks
#[async_trait]
pub trait SimilarityOracle: Send + Sync {
    /// Health flag checked before every search
    fn is_connected(&self) -> bool;

    /// Up to `limit` chunks most similar to `query`
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>>;

    /// Embed and store chunks, returning one vector id per chunk in input order
    async fn upsert(&self, chunks: &[DocumentChunk]) -> Result<Vec<String>>;

    fn name(&self) -> &str;
}

/// Create the configured oracle.
///
/// A Qdrant instance that cannot be reached yields a disconnected oracle
/// rather than an error, so the service still starts and answers in
/// degraded mode.
pub async fn create_oracle(
    config: &VectorConfig,
    embedder: Arc<dyn Embedder>,
) -> Result<Arc<dyn SimilarityOracle>> {
    match config.backend {
        VectorBackend::Memory => Ok(Arc::new(MemoryOracle::new(embedder))),
        VectorBackend::Qdrant => {
            let oracle = QdrantOracle::new(config, embedder)?;
            if let Err(e) = oracle.connect().await {
                tracing::warn!(
                    error = %e,
                    url = %config.url,
                    "Qdrant not reachable, retrieval will run degraded"
                );
            }
            Ok(Arc::new(oracle))
        }
    }
}
