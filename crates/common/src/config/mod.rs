//! Configuration management for Folio services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default.toml, config/{APP_ENV}.toml, config/local.toml)
//! - Default values

use crate::context::MIN_CONTEXT_LENGTH;
use crate::errors::{AppError, Result};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Metadata store configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Similarity oracle configuration
    #[serde(default)]
    pub vector: VectorConfig,

    /// Embedding service configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Generation providers
    #[serde(default)]
    pub llm: LlmConfig,

    /// Retrieval and budgeting limits
    #[serde(default)]
    pub rag: RagConfig,

    /// Translation settings
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Shutdown timeout in seconds
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Database URL (SQLite or Postgres)
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Idle timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

/// Which similarity oracle backs retrieval
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VectorBackend {
    /// Qdrant over its REST API
    Qdrant,
    /// Process-local index, lost on restart
    Memory,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VectorConfig {
    #[serde(default = "default_vector_backend")]
    pub backend: VectorBackend,

    /// Qdrant base URL
    #[serde(default = "default_qdrant_url")]
    pub url: String,

    /// Qdrant API key (cloud deployments)
    pub api_key: Option<String>,

    /// Collection holding the book chunks
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Request timeout in seconds
    #[serde(default = "default_vector_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    /// Embedding provider: openai, hash
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    /// API key for embedding service
    pub api_key: Option<String>,

    /// API base URL (for custom endpoints)
    pub api_base: Option<String>,

    /// Model to use
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Embedding dimension
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    /// Request timeout in seconds
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
}

/// Wire format spoken by a generation provider
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Google Gemini `generateContent`
    Gemini,
    /// OpenAI-style `/chat/completions` (OpenRouter, OpenAI, local gateways)
    OpenaiCompatible,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderConfig {
    /// Display name used in logs and metrics
    pub name: String,

    pub kind: ProviderKind,

    /// Missing key means the provider is unavailable
    pub api_key: Option<String>,

    pub base_url: String,

    pub model: String,

    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    #[serde(default = "default_primary_provider")]
    pub primary: ProviderConfig,

    #[serde(default = "default_secondary_provider")]
    pub secondary: ProviderConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RagConfig {
    /// Number of passages requested from the oracle
    #[serde(default = "default_max_sources")]
    pub max_sources: usize,

    /// Character budget for the assembled prompt context
    #[serde(default = "default_max_context_length")]
    pub max_context_length: usize,

    /// Selected text shorter than this still triggers retrieval
    #[serde(default = "default_short_selection_threshold")]
    pub short_selection_threshold: usize,

    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    #[serde(default = "default_rag_temperature")]
    pub temperature: f32,

    #[serde(default = "default_rag_max_tokens")]
    pub max_tokens: u32,

    /// Upper bound on any single provider call
    #[serde(default = "default_call_timeout")]
    pub call_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TranslationConfig {
    /// Language answers are generated in
    #[serde(default = "default_language")]
    pub default_language: String,

    /// Supported language codes mapped to display names
    #[serde(default = "default_languages")]
    pub languages: BTreeMap<String, String>,

    #[serde(default = "default_translation_temperature")]
    pub temperature: f32,

    #[serde(default = "default_translation_max_tokens")]
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8000 }
fn default_request_timeout() -> u64 { 90 }
fn default_shutdown_timeout() -> u64 { 30 }
fn default_database_url() -> String { "sqlite://folio.db?mode=rwc".to_string() }
fn default_max_connections() -> u32 { 10 }
fn default_min_connections() -> u32 { 1 }
fn default_connect_timeout() -> u64 { 10 }
fn default_idle_timeout() -> u64 { 300 }
fn default_vector_backend() -> VectorBackend { VectorBackend::Qdrant }
fn default_qdrant_url() -> String { "http://localhost:6333".to_string() }
fn default_collection() -> String { "book_embeddings".to_string() }
fn default_vector_timeout() -> u64 { 30 }
fn default_embedding_provider() -> String { "hash".to_string() }
fn default_embedding_model() -> String { "text-embedding-3-small".to_string() }
fn default_embedding_dimension() -> usize { 768 }
fn default_embedding_timeout() -> u64 { 30 }
fn default_provider_timeout() -> u64 { 30 }
fn default_max_sources() -> usize { 5 }
fn default_max_context_length() -> usize { 4096 }
fn default_short_selection_threshold() -> usize { 100 }
fn default_chunk_size() -> usize { 1000 }
fn default_chunk_overlap() -> usize { 100 }
fn default_rag_temperature() -> f32 { 0.3 }
fn default_rag_max_tokens() -> u32 { 1024 }
fn default_call_timeout() -> u64 { 30 }
fn default_language() -> String { "en".to_string() }
fn default_translation_temperature() -> f32 { 0.1 }
fn default_translation_max_tokens() -> u32 { 2048 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { false }
fn default_metrics_port() -> u16 { 9090 }
fn default_service_name() -> String { "folio".to_string() }

fn default_languages() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("en".to_string(), "English".to_string()),
        ("ur".to_string(), "Urdu".to_string()),
    ])
}

fn default_primary_provider() -> ProviderConfig {
    ProviderConfig {
        name: "gemini".to_string(),
        kind: ProviderKind::Gemini,
        api_key: None,
        base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
        model: "gemini-2.0-flash".to_string(),
        timeout_secs: default_provider_timeout(),
    }
}

fn default_secondary_provider() -> ProviderConfig {
    ProviderConfig {
        name: "openrouter".to_string(),
        kind: ProviderKind::OpenaiCompatible,
        api_key: None,
        base_url: "https://openrouter.ai/api/v1".to_string(),
        model: "openai/gpt-3.5-turbo".to_string(),
        timeout_secs: default_provider_timeout(),
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            idle_timeout_secs: default_idle_timeout(),
        }
    }
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            backend: default_vector_backend(),
            url: default_qdrant_url(),
            api_key: None,
            collection: default_collection(),
            timeout_secs: default_vector_timeout(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            api_key: None,
            api_base: None,
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            timeout_secs: default_embedding_timeout(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            primary: default_primary_provider(),
            secondary: default_secondary_provider(),
        }
    }
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            max_sources: default_max_sources(),
            max_context_length: default_max_context_length(),
            short_selection_threshold: default_short_selection_threshold(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            temperature: default_rag_temperature(),
            max_tokens: default_rag_max_tokens(),
            call_timeout_secs: default_call_timeout(),
        }
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            default_language: default_language(),
            languages: default_languages(),
            temperature: default_translation_temperature(),
            max_tokens: default_translation_max_tokens(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_port: default_metrics_port(),
            service_name: default_service_name(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            vector: VectorConfig::default(),
            embedding: EmbeddingConfig::default(),
            llm: LlmConfig::default(),
            rag: RagConfig::default(),
            translation: TranslationConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> std::result::Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Start with defaults
            .add_source(Config::try_from(&AppConfig::default())?)
            // Load base config file
            .add_source(File::with_name("config/default").required(false))
            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Load local overrides
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables with APP__ prefix
            // e.g., APP__RAG__MAX_CONTEXT_LENGTH=8192
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> std::result::Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(Config::try_from(&AppConfig::default())?)
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Reject combinations the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.rag.chunk_size == 0 {
            return Err(AppError::Configuration {
                message: "rag.chunk_size must be greater than zero".to_string(),
            });
        }
        if self.rag.chunk_overlap >= self.rag.chunk_size {
            return Err(AppError::Configuration {
                message: format!(
                    "rag.chunk_overlap ({}) must be smaller than rag.chunk_size ({})",
                    self.rag.chunk_overlap, self.rag.chunk_size
                ),
            });
        }
        if self.rag.max_context_length < MIN_CONTEXT_LENGTH {
            return Err(AppError::Configuration {
                message: format!(
                    "rag.max_context_length must be at least {} characters",
                    MIN_CONTEXT_LENGTH
                ),
            });
        }
        if self.translation.languages.is_empty() {
            return Err(AppError::Configuration {
                message: "translation.languages must list at least one language".to_string(),
            });
        }
        if !self
            .translation
            .languages
            .contains_key(&self.translation.default_language)
        {
            return Err(AppError::Configuration {
                message: format!(
                    "translation.default_language '{}' is not in translation.languages",
                    self.translation.default_language
                ),
            });
        }
        Ok(())
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.server.shutdown_timeout_secs)
    }

    /// Get the per-provider call timeout as Duration
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.rag.call_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.rag.max_context_length, 4096);
        assert_eq!(config.rag.short_selection_threshold, 100);
        assert_eq!(config.llm.primary.kind, ProviderKind::Gemini);
        assert_eq!(config.llm.secondary.kind, ProviderKind::OpenaiCompatible);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_languages() {
        let config = AppConfig::default();
        let codes: Vec<&str> = config
            .translation
            .languages
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(codes, vec!["en", "ur"]);
    }

    #[test]
    fn test_overlap_must_be_smaller_than_chunk() {
        let mut config = AppConfig::default();
        config.rag.chunk_overlap = config.rag.chunk_size;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, AppError::Configuration { .. }));
    }

    #[test]
    fn test_context_length_must_hold_a_header() {
        let mut config = AppConfig::default();
        config.rag.max_context_length = MIN_CONTEXT_LENGTH - 1;
        assert!(matches!(
            config.validate(),
            Err(AppError::Configuration { .. })
        ));

        config.rag.max_context_length = MIN_CONTEXT_LENGTH;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_language_must_be_supported() {
        let mut config = AppConfig::default();
        config.translation.default_language = "de".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_call_timeout() {
        let config = AppConfig::default();
        assert_eq!(config.call_timeout(), Duration::from_secs(30));
    }
}
