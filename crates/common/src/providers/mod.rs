//! Text-generation providers
//!
//! Every provider speaks one trait, `ChatProvider`, whatever its wire
//! format. `FallbackChain` tries them in order and reports a typed
//! outcome instead of an error, so callers can decide what a degraded
//! answer looks like.

mod fallback;
mod gemini;
mod openai;

pub use fallback::{ChainOutcome, FallbackChain, ProviderFailure};
#[cfg(test)]
pub(crate) use fallback::test_support;
pub use gemini::GeminiProvider;
pub use openai::OpenAiCompatibleProvider;

use crate::config::{ProviderConfig, ProviderKind};
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Speaker of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Provider-neutral generation request
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Generated text plus the provider's usage report
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub tokens_used: u32,
}

/// A text-generation backend
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Stable name used in logs, metrics and failure reports
    fn name(&self) -> &str;

    /// Whether the provider is configured well enough to be called
    fn is_available(&self) -> bool;

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion>;
}

/// Whitespace word count, used when a provider reports no usage
pub fn approximate_tokens(text: &str) -> u32 {
    u32::try_from(text.split_whitespace().count()).unwrap_or(u32::MAX)
}

/// Build the HTTP client shared by the HTTP providers
pub(crate) fn http_client(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| AppError::Internal {
            message: format!("Failed to create HTTP client: {}", e),
        })
}

/// Map a non-success HTTP response to a provider error
pub(crate) async fn provider_status_error(provider: &str, response: reqwest::Response) -> AppError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    AppError::Provider {
        provider: provider.to_string(),
        message: format!("API error {}: {}", status, body),
    }
}

/// Create a provider from configuration
pub fn create_provider(config: &ProviderConfig) -> Result<Arc<dyn ChatProvider>> {
    match config.kind {
        ProviderKind::Gemini => Ok(Arc::new(GeminiProvider::new(config)?)),
        ProviderKind::OpenaiCompatible => Ok(Arc::new(OpenAiCompatibleProvider::new(config)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_approximate_tokens_counts_words() {
        assert_eq!(approximate_tokens(""), 0);
        assert_eq!(approximate_tokens("  one two\nthree  "), 3);
    }

    #[test]
    fn test_create_provider_respects_kind() {
        let config = ProviderConfig {
            name: "openrouter".to_string(),
            kind: ProviderKind::OpenaiCompatible,
            api_key: None,
            base_url: "http://localhost:1".to_string(),
            model: "m".to_string(),
            timeout_secs: 5,
        };
        let provider = create_provider(&config).unwrap();
        assert_eq!(provider.name(), "openrouter");
        assert!(!provider.is_available());
    }
}
