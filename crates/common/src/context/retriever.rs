//! Context Retriever - fetches ranked passages for a question

use super::budgeter::{ContextBudgeter, ContextBundle};
use crate::metrics;
use crate::vector::{SearchHit, SimilarityOracle};
use std::sync::Arc;
use tracing::{debug, error, warn};

pub struct ContextRetriever {
    oracle: Arc<dyn SimilarityOracle>,
    budgeter: ContextBudgeter,
    max_sources: usize,
    short_selection_threshold: usize,
}

impl ContextRetriever {
    pub fn new(
        oracle: Arc<dyn SimilarityOracle>,
        budgeter: ContextBudgeter,
        max_sources: usize,
        short_selection_threshold: usize,
    ) -> Self {
        Self {
            oracle,
            budgeter,
            max_sources,
            short_selection_threshold,
        }
    }

    pub fn oracle_connected(&self) -> bool {
        self.oracle.is_connected()
    }

    /// Up to `limit` hits, best first. Never fails: an unavailable or
    /// failing oracle yields an empty result.
    pub async fn retrieve(&self, query: &str, limit: usize) -> Vec<SearchHit> {
        if !self.oracle.is_connected() {
            warn!(oracle = self.oracle.name(), "Similarity oracle disconnected, skipping retrieval");
            metrics::record_retrieval(0, true);
            return Vec::new();
        }

        match self.oracle.search(query, limit).await {
            Ok(mut hits) => {
                // Stable, so equal scores keep the oracle's order
                hits.sort_by(|a, b| b.score.total_cmp(&a.score));
                debug!(hits = hits.len(), limit, "Retrieved context");
                metrics::record_retrieval(hits.len(), false);
                hits
            }
            Err(e) => {
                error!(error = %e, oracle = self.oracle.name(), "Similarity search failed");
                metrics::record_retrieval(0, true);
                Vec::new()
            }
        }
    }

    /// Retrieve (unless the selection is long enough on its own) and budget
    pub async fn build_context(&self, query: &str, explicit_text: Option<&str>) -> ContextBundle {
        let explicit_text = explicit_text.filter(|t| !t.trim().is_empty());

        let hits = match explicit_text {
            Some(text) if text.chars().count() >= self.short_selection_threshold => {
                debug!(
                    selected_chars = text.chars().count(),
                    "Selected text is sufficient, skipping retrieval"
                );
                Vec::new()
            }
            _ => self.retrieve(query, self.max_sources).await,
        };

        self.budgeter.budget(explicit_text, &hits)
    }
}
