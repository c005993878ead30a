//! Folio Common Library
//!
//! Shared code for the Folio services including:
//! - The question answering pipeline (retrieval, budgeting, generation, translation)
//! - Document chunking
//! - Generation providers and the fallback chain
//! - Similarity oracles and embedders
//! - Metadata store models and repository
//! - Error types, configuration and metrics

pub mod chunking;
pub mod config;
pub mod context;
pub mod db;
pub mod embeddings;
pub mod errors;
pub mod metrics;
pub mod providers;
pub mod vector;

// Re-export commonly used types
pub use config::AppConfig;
pub use context::{GenerationResult, IndexRequest, IndexSummary, RagService, TranslationResult};
pub use db::{DbPool, DocumentStore, Repository};
pub use embeddings::Embedder;
pub use errors::{AppError, Result};
pub use vector::{SearchHit, SimilarityOracle};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
