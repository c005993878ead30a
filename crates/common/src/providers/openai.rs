//! OpenAI-compatible `/chat/completions` provider (OpenRouter, OpenAI, local gateways)

use super::{
    approximate_tokens, http_client, provider_status_error, ChatProvider, Completion,
    CompletionRequest,
};
use crate::config::ProviderConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub struct OpenAiCompatibleProvider {
    name: String,
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    total_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<Usage>,
}

impl OpenAiCompatibleProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        Ok(Self {
            name: config.name.clone(),
            client: http_client(config.timeout_secs)?,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl ChatProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::ProviderUnavailable {
                provider: self.name.clone(),
            })?;

        let body = ChatRequest {
            model: &self.model,
            messages: request
                .messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Provider {
                provider: self.name.clone(),
                message: format!("Request failed: {}", e),
            })?;

        if !response.status().is_success() {
            return Err(provider_status_error(&self.name, response).await);
        }

        let chat_response: ChatResponse =
            response.json().await.map_err(|e| AppError::Provider {
                provider: self.name.clone(),
                message: format!("Failed to parse response: {}", e),
            })?;

        let text = chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| AppError::EmptyResponse {
                provider: self.name.clone(),
            })?;

        let tokens_used = chat_response
            .usage
            .and_then(|u| u.total_tokens)
            .unwrap_or_else(|| approximate_tokens(&text));

        Ok(Completion { text, tokens_used })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderKind;
    use crate::providers::ChatMessage;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider_for(server: &MockServer, api_key: Option<&str>) -> OpenAiCompatibleProvider {
        OpenAiCompatibleProvider::new(&ProviderConfig {
            name: "openrouter".to_string(),
            kind: ProviderKind::OpenaiCompatible,
            api_key: api_key.map(str::to_string),
            base_url: server.uri(),
            model: "openai/gpt-3.5-turbo".to_string(),
            timeout_secs: 5,
        })
        .unwrap()
    }

    fn request() -> CompletionRequest {
        CompletionRequest {
            messages: vec![
                ChatMessage::system("Answer from the book."),
                ChatMessage::user("What is ROS2?"),
            ],
            temperature: 0.3,
            max_tokens: 1024,
        }
    }

    #[tokio::test]
    async fn test_complete_reads_text_and_usage() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer or-key"))
            .and(body_partial_json(serde_json::json!({
                "model": "openai/gpt-3.5-turbo",
                "max_tokens": 1024,
                "messages": [{ "role": "system" }, { "role": "user", "content": "What is ROS2?" }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{ "message": { "role": "assistant", "content": "A robotics middleware." } }],
                "usage": { "prompt_tokens": 30, "completion_tokens": 12, "total_tokens": 42 }
            })))
            .mount(&server)
            .await;

        let provider = provider_for(&server, Some("or-key"));
        let completion = provider.complete(&request()).await.unwrap();

        assert_eq!(completion.text, "A robotics middleware.");
        assert_eq!(completion.tokens_used, 42);
    }

    #[tokio::test]
    async fn test_missing_usage_falls_back_to_word_count() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{ "message": { "content": "three word answer" } }]
            })))
            .mount(&server)
            .await;

        let completion = provider_for(&server, Some("k"))
            .complete(&request())
            .await
            .unwrap();
        assert_eq!(completion.tokens_used, 3);
    }

    #[tokio::test]
    async fn test_empty_choices_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "choices": [] })),
            )
            .mount(&server)
            .await;

        let err = provider_for(&server, Some("k"))
            .complete(&request())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::EmptyResponse { .. }));
    }

    #[tokio::test]
    async fn test_http_error_is_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let err = provider_for(&server, Some("k"))
            .complete(&request())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Provider { .. }));
        assert!(err.to_string().contains("429"));
    }

    #[tokio::test]
    async fn test_without_key_is_unavailable() {
        let server = MockServer::start().await;
        let provider = provider_for(&server, Some("   "));
        assert!(!provider.is_available());
        assert!(matches!(
            provider.complete(&request()).await,
            Err(AppError::ProviderUnavailable { .. })
        ));
    }
}
