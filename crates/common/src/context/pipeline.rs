//! RAG pipeline entry points
//!
//! `RagService` wires the retriever, budgeter, generator and translator
//! together with the metadata store. All collaborators are injected, so
//! tests can substitute the oracle, the store and both providers.

use super::budgeter::ContextBudgeter;
use super::generator::{AnswerGenerator, GenerationResult};
use super::retriever::ContextRetriever;
use super::translator::{TranslationResult, Translator};
use crate::chunking;
use crate::config::AppConfig;
use crate::db::{DbPool, DocumentStore, NewDocument, Repository};
use crate::embeddings::create_embedder;
use crate::errors::Result;
use crate::metrics;
use crate::providers::{create_provider, ChatProvider, FallbackChain};
use crate::vector::{create_oracle, SimilarityOracle};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};

/// Section recorded when a document does not name one
pub const DEFAULT_SECTION: &str = "unknown";

/// A page to (re)index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexRequest {
    pub content: String,
    pub doc_id: String,
    pub title: String,
    pub section: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSummary {
    pub chunks_processed: usize,
}

pub struct RagService {
    retriever: ContextRetriever,
    generator: AnswerGenerator,
    translator: Translator,
    oracle: Arc<dyn SimilarityOracle>,
    store: Arc<dyn DocumentStore>,
    default_language: String,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RagService {
    /// Build the service with explicit providers
    pub fn new(
        config: &AppConfig,
        oracle: Arc<dyn SimilarityOracle>,
        store: Arc<dyn DocumentStore>,
        primary: Arc<dyn ChatProvider>,
        secondary: Arc<dyn ChatProvider>,
    ) -> Self {
        let providers = vec![primary, secondary];
        let call_timeout = config.call_timeout();
        let rag = &config.rag;

        let retriever = ContextRetriever::new(
            oracle.clone(),
            ContextBudgeter::new(rag.max_context_length),
            rag.max_sources,
            rag.short_selection_threshold,
        );
        let generator = AnswerGenerator::new(
            FallbackChain::new("generation", providers.clone(), call_timeout),
            rag.temperature,
            rag.max_tokens,
        );
        let translator = Translator::new(
            FallbackChain::new("translation", providers, call_timeout),
            config.translation.languages.clone(),
            config.translation.temperature,
            config.translation.max_tokens,
        );

        Self {
            retriever,
            generator,
            translator,
            oracle,
            store,
            default_language: config.translation.default_language.clone(),
            chunk_size: rag.chunk_size,
            chunk_overlap: rag.chunk_overlap,
        }
    }

    /// Build the service with the providers named in `config.llm`
    pub fn from_config(
        config: &AppConfig,
        oracle: Arc<dyn SimilarityOracle>,
        store: Arc<dyn DocumentStore>,
    ) -> Result<Self> {
        let primary = create_provider(&config.llm.primary)?;
        let secondary = create_provider(&config.llm.secondary)?;

        for provider in [&primary, &secondary] {
            if !provider.is_available() {
                warn!(provider = provider.name(), "Provider has no API key and will be skipped");
            }
        }

        Ok(Self::new(config, oracle, store, primary, secondary))
    }

    /// Connect the metadata store and similarity oracle named in `config`
    /// and assemble the service. An unreachable oracle is not an error.
    pub async fn connect(config: &AppConfig) -> Result<Self> {
        let db = DbPool::new(&config.database).await?;
        db.ensure_schema().await?;
        let store = Arc::new(Repository::new(db));

        let embedder = create_embedder(&config.embedding)?;
        let oracle = create_oracle(&config.vector, embedder).await?;
        if oracle.is_connected() {
            info!(oracle = oracle.name(), "Similarity oracle connected");
        } else {
            warn!(
                oracle = oracle.name(),
                "Similarity oracle not connected, answers will lack book context"
            );
        }

        Self::from_config(config, oracle, store)
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn oracle_connected(&self) -> bool {
        self.retriever.oracle_connected()
    }

    pub fn default_language(&self) -> &str {
        &self.default_language
    }

    /// Answer a question from the book, optionally translated.
    ///
    /// Only an unsupported `target_language` is an error, and it is
    /// reported before any retrieval or provider call.
    #[instrument(skip_all, fields(query_chars = query.chars().count()))]
    pub async fn answer_query(
        &self,
        query: &str,
        explicit_text: Option<&str>,
        target_language: Option<&str>,
    ) -> Result<GenerationResult> {
        let start = Instant::now();

        let target_language = target_language.map(str::trim).filter(|l| !l.is_empty());
        if let Some(target) = target_language {
            self.translator.language_name(target)?;
        }

        let bundle = self.retriever.build_context(query, explicit_text).await;
        let mut result = self.generator.generate(query, &bundle).await;

        let mut translated = false;
        if let Some(target) = target_language.filter(|t| *t != self.default_language) {
            let translation = self
                .translator
                .translate(&result.response, &self.default_language, target)
                .await?;
            result.response = translation.translated_text;
            result.tokens_used = result.tokens_used.saturating_add(translation.tokens_used);
            translated = true;
        }

        metrics::record_query(start.elapsed().as_secs_f64(), translated);
        info!(
            sources = result.sources.len(),
            tokens_used = result.tokens_used,
            translated,
            latency_ms = start.elapsed().as_millis() as u64,
            "Query answered"
        );

        Ok(result)
    }

    /// Translate arbitrary text between two supported languages. The source
    /// defaults to the default language and the target to the first other
    /// supported language.
    pub async fn translate(
        &self,
        text: &str,
        source_lang: Option<&str>,
        target_lang: Option<&str>,
    ) -> Result<TranslationResult> {
        let source = source_lang.unwrap_or(self.default_language.as_str());
        let target = match target_lang {
            Some(target) => target,
            None => self.translator.default_target(source),
        };
        self.translator.translate(text, source, target).await
    }

    /// Chunk a page, record it in the metadata store and, when the oracle
    /// is up, store its chunk vectors
    #[instrument(skip_all, fields(doc_id = %request.doc_id))]
    pub async fn index_document(&self, request: IndexRequest) -> Result<IndexSummary> {
        let start = Instant::now();
        let section = request
            .section
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SECTION.to_string());

        let chunks = chunking::chunk_document(
            &request.content,
            &request.doc_id,
            &section,
            &request.title,
            self.chunk_size,
            self.chunk_overlap,
        );

        self.store
            .upsert_document(NewDocument {
                doc_id: request.doc_id.clone(),
                title: request.title,
                content: request.content,
                section: section.clone(),
            })
            .await?;

        if chunks.is_empty() {
            warn!("Document produced no chunks, skipping vector indexing");
        } else if !self.oracle.is_connected() {
            warn!(
                chunks = chunks.len(),
                "Similarity oracle disconnected, document stored without vectors"
            );
        } else {
            let vector_ids = self.oracle.upsert(&chunks).await?;
            self.store
                .record_embeddings(&request.doc_id, &vector_ids, chunks.len())
                .await?;
        }

        metrics::record_indexing(start.elapsed().as_secs_f64(), chunks.len(), &section);
        info!(
            chunks = chunks.len(),
            section = %section,
            latency_ms = start.elapsed().as_millis() as u64,
            "Document indexed"
        );

        Ok(IndexSummary {
            chunks_processed: chunks.len(),
        })
    }
}
