//! Answer Generator - grounded answers with provider failover
//!
//! Provides:
//! - Book-grounded prompt construction
//! - Primary → secondary provider failover through `FallbackChain`
//! - A direct-extract answer when every provider fails

use super::budgeter::ContextBundle;
use crate::providers::{ChainOutcome, ChatMessage, Completion, CompletionRequest, FallbackChain};
use crate::vector::SearchHit;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

const SYSTEM_PROMPT: &str = "You are an expert assistant for the book. \
    ANSWER ONLY BASED ON THE PROVIDED BOOK CONTENT. \
    If the provided context doesn't contain relevant information, explicitly state that the information is not available in the book. \
    NEVER provide information that is not contained in the provided context. \
    Cite specific sections and content from the book when answering.";

/// Answer returned when neither a provider nor the book can help
pub const NO_INFORMATION_MESSAGE: &str =
    "I could not find information about this in the book, so I am unable to answer this question.";

/// Opening of an answer that quotes the book because generation failed
pub const DIRECT_EXTRACT_NOTICE: &str =
    "The AI model could not process this request, so here is a direct extract from the book:";

/// Answer plus the passages it was grounded on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub response: String,
    pub sources: Vec<SearchHit>,
    pub tokens_used: u32,
}

pub struct AnswerGenerator {
    chain: FallbackChain,
    temperature: f32,
    max_tokens: u32,
}

impl AnswerGenerator {
    pub fn new(chain: FallbackChain, temperature: f32, max_tokens: u32) -> Self {
        Self {
            chain,
            temperature,
            max_tokens,
        }
    }

    fn build_request(&self, query: &str, context: &str) -> CompletionRequest {
        let user_prompt = format!(
            "BOOK CONTENT CONTEXT:\n{}\n\nUSER QUESTION: {}\n\n\
            Please provide a detailed answer based EXCLUSIVELY on the book content provided above. \
            If the book content does not contain the information needed to answer this question, \
            clearly state that the information is not available in the book.",
            context, query
        );

        CompletionRequest {
            messages: vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(user_prompt)],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    /// Answer `query` from `bundle`. Always yields a non-empty response.
    pub async fn generate(&self, query: &str, bundle: &ContextBundle) -> GenerationResult {
        if bundle.is_empty() {
            info!("No book content for this question, answering without a provider");
            return GenerationResult {
                response: NO_INFORMATION_MESSAGE.to_string(),
                sources: Vec::new(),
                tokens_used: 0,
            };
        }

        let request = self.build_request(query, &bundle.render());
        let top_hit = bundle.top_hit();

        let outcome = self
            .chain
            .run(&request, || {
                top_hit.map(|hit| Completion {
                    text: format!("{}\n\n{}", DIRECT_EXTRACT_NOTICE, hit.text()),
                    tokens_used: 0,
                })
            })
            .await;

        match outcome {
            ChainOutcome::Success {
                provider,
                completion,
            } => {
                info!(
                    provider = %provider,
                    tokens_used = completion.tokens_used,
                    sources = bundle.sources.len(),
                    "Generated answer"
                );
                GenerationResult {
                    response: completion.text,
                    sources: bundle.sources.clone(),
                    tokens_used: completion.tokens_used,
                }
            }
            ChainOutcome::Degraded { completion, .. } => GenerationResult {
                response: completion.text,
                sources: bundle.sources.clone(),
                tokens_used: 0,
            },
            ChainOutcome::Failed { failures } => {
                warn!(
                    failed_providers = failures.len(),
                    "Generation failed with no retrieved passage to fall back on"
                );
                GenerationResult {
                    response: NO_INFORMATION_MESSAGE.to_string(),
                    sources: bundle.sources.clone(),
                    tokens_used: 0,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::budgeter::ContextBudgeter;
    use crate::providers::test_support::{chain, Script, ScriptedProvider};
    use crate::providers::Role;
    use crate::vector::DocumentChunk;

    fn hit(text: &str, score: f32) -> SearchHit {
        SearchHit {
            chunk: DocumentChunk {
                text: text.to_string(),
                source_doc_id: "ros2_basics".to_string(),
                section: "ros2".to_string(),
                title: "ROS2 Basics".to_string(),
            },
            score,
            vector_id: "v1".to_string(),
        }
    }

    fn bundle(explicit: Option<&str>, hits: &[SearchHit]) -> ContextBundle {
        ContextBudgeter::new(4096).budget(explicit, hits)
    }

    #[tokio::test]
    async fn test_sentinel_context_skips_providers() {
        let primary = ScriptedProvider::new("primary", Script::Reply("should not run", 5));
        let generator = AnswerGenerator::new(chain("generation", vec![primary.clone()]), 0.3, 1024);

        let result = generator.generate("What is a humanoid?", &bundle(None, &[])).await;

        assert_eq!(result.response, NO_INFORMATION_MESSAGE);
        assert_eq!(result.tokens_used, 0);
        assert!(result.sources.is_empty());
        assert_eq!(primary.calls(), 0);
    }

    #[tokio::test]
    async fn test_success_uses_grounded_prompt() {
        let primary = ScriptedProvider::new("primary", Script::Reply("Nodes talk over topics.", 12));
        let generator = AnswerGenerator::new(chain("generation", vec![primary.clone()]), 0.3, 1024);
        let hits = vec![hit("In ROS2, nodes communicate over topics.", 0.9)];

        let result = generator.generate("How do nodes talk?", &bundle(None, &hits)).await;

        assert_eq!(result.response, "Nodes talk over topics.");
        assert_eq!(result.tokens_used, 12);
        assert_eq!(result.sources, hits);

        let request = primary.last_request().unwrap();
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, Role::System);
        assert!(request.messages[1].content.contains("In ROS2, nodes communicate over topics."));
        assert!(request.messages[1].content.contains("How do nodes talk?"));
        assert_eq!(request.max_tokens, 1024);
    }

    #[tokio::test]
    async fn test_secondary_answers_when_primary_fails() {
        let primary = ScriptedProvider::new("primary", Script::Fail);
        let secondary = ScriptedProvider::new("secondary", Script::Reply("From secondary.", 4));
        let generator = AnswerGenerator::new(chain("generation", vec![primary, secondary]), 0.3, 1024);

        let result = generator
            .generate("q", &bundle(None, &[hit("passage", 0.4)]))
            .await;
        assert_eq!(result.response, "From secondary.");
        assert_eq!(result.tokens_used, 4);
    }

    #[tokio::test]
    async fn test_all_providers_failing_returns_direct_extract() {
        let generator = AnswerGenerator::new(
            chain(
                "generation",
                vec![
                    ScriptedProvider::new("primary", Script::Fail),
                    ScriptedProvider::new("secondary", Script::Unavailable),
                ],
            ),
            0.3,
            1024,
        );
        let hits = vec![
            hit("Zero moment point keeps the robot balanced.", 0.9),
            hit("Less relevant passage.", 0.2),
        ];

        let result = generator.generate("balance?", &bundle(None, &hits)).await;

        assert!(result.response.starts_with(DIRECT_EXTRACT_NOTICE));
        assert!(result.response.contains("Zero moment point keeps the robot balanced."));
        assert!(!result.response.contains("Less relevant passage."));
        assert_eq!(result.tokens_used, 0);
        assert_eq!(result.sources.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_provider_text_is_treated_as_failure() {
        let generator = AnswerGenerator::new(
            chain("generation", vec![ScriptedProvider::new("primary", Script::Empty)]),
            0.3,
            1024,
        );

        let result = generator
            .generate("q", &bundle(None, &[hit("Grounding passage.", 0.7)]))
            .await;
        assert!(result.response.starts_with(DIRECT_EXTRACT_NOTICE));
    }

    #[tokio::test]
    async fn test_blank_completion_falls_back_to_direct_extract() {
        let generator = AnswerGenerator::new(
            chain("generation", vec![ScriptedProvider::new("primary", Script::Blank)]),
            0.3,
            1024,
        );

        let result = generator
            .generate("q", &bundle(None, &[hit("Actuators convert energy to motion.", 0.8)]))
            .await;
        assert!(result.response.starts_with(DIRECT_EXTRACT_NOTICE));
        assert!(result.response.contains("Actuators convert energy to motion."));
        assert_eq!(result.tokens_used, 0);
    }

    #[tokio::test]
    async fn test_selected_text_only_and_providers_down() {
        let generator = AnswerGenerator::new(
            chain("generation", vec![ScriptedProvider::new("primary", Script::Fail)]),
            0.3,
            1024,
        );

        let result = generator
            .generate("q", &bundle(Some("A selected sentence."), &[]))
            .await;
        assert_eq!(result.response, NO_INFORMATION_MESSAGE);
        assert_eq!(result.tokens_used, 0);
        assert!(result.sources.is_empty());
    }
}
