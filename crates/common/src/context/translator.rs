//! Translator - renders answers in the reader's language

use crate::errors::{AppError, Result};
use crate::metrics;
use crate::providers::{ChainOutcome, ChatMessage, Completion, CompletionRequest, FallbackChain};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

const SYSTEM_PROMPT: &str = "You are a professional translator. \
    Translate the user's text accurately, preserving meaning, technical terms and formatting.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationResult {
    pub translated_text: String,
    pub source_lang: String,
    pub target_lang: String,
    pub tokens_used: u32,
}

/// Text returned in place of a translation when every provider failed
pub fn unavailable_translation(text: &str) -> String {
    format!("[Translation unavailable: {}]", text)
}

pub struct Translator {
    chain: FallbackChain,
    /// Supported codes mapped to display names
    languages: BTreeMap<String, String>,
    temperature: f32,
    max_tokens: u32,
}

impl Translator {
    pub fn new(
        chain: FallbackChain,
        languages: BTreeMap<String, String>,
        temperature: f32,
        max_tokens: u32,
    ) -> Self {
        Self {
            chain,
            languages,
            temperature,
            max_tokens,
        }
    }

    pub fn supported_languages(&self) -> &BTreeMap<String, String> {
        &self.languages
    }

    /// First supported language other than `source`, or `source` itself
    /// when it is the only one
    pub fn default_target<'a>(&'a self, source: &'a str) -> &'a str {
        self.languages
            .keys()
            .map(String::as_str)
            .find(|code| *code != source)
            .unwrap_or(source)
    }

    /// Display name for `code`, or `UnsupportedLanguage`
    pub fn language_name(&self, code: &str) -> Result<&str> {
        self.languages
            .get(code)
            .map(String::as_str)
            .ok_or_else(|| AppError::UnsupportedLanguage {
                code: code.to_string(),
                supported: self
                    .languages
                    .keys()
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }

    /// Translate `text`. Only an unsupported language code is an error;
    /// provider failures produce the unavailable-translation wrapper.
    pub async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<TranslationResult> {
        let source_name = self.language_name(source_lang)?;
        let target_name = self.language_name(target_lang)?;

        let unchanged = |tokens_used| TranslationResult {
            translated_text: text.to_string(),
            source_lang: source_lang.to_string(),
            target_lang: target_lang.to_string(),
            tokens_used,
        };

        if source_lang == target_lang || text.trim().is_empty() {
            debug!(source_lang, target_lang, "Nothing to translate");
            return Ok(unchanged(0));
        }

        let request = CompletionRequest {
            messages: vec![
                ChatMessage::system(SYSTEM_PROMPT),
                ChatMessage::user(format!(
                    "Translate the following {} text to {}. Only respond with the translated text and nothing else:\n\n{}",
                    source_name, target_name, text
                )),
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        metrics::record_translation(source_lang, target_lang);

        let outcome = self
            .chain
            .run(&request, || {
                Some(Completion {
                    text: unavailable_translation(text),
                    tokens_used: 0,
                })
            })
            .await;

        let (translated_text, tokens_used) = match outcome {
            ChainOutcome::Success {
                provider,
                completion,
            } => {
                info!(
                    provider = %provider,
                    source_lang,
                    target_lang,
                    tokens_used = completion.tokens_used,
                    "Translation completed"
                );
                (completion.text.trim().to_string(), completion.tokens_used)
            }
            ChainOutcome::Degraded { completion, .. } => (completion.text, 0),
            ChainOutcome::Failed { .. } => (unavailable_translation(text), 0),
        };

        Ok(TranslationResult {
            translated_text,
            ..unchanged(tokens_used)
        })
    }
}
