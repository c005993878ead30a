//! Question answering handler

use super::validate_request;
use crate::AppState;
use axum::{extract::State, Json};
use folio_common::{
    errors::{AppError, Result},
    GenerationResult,
};
use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct ChatRequest {
    #[validate(length(min = 1, max = 4000))]
    pub message: String,

    /// Passage the reader highlighted in the book
    #[serde(default)]
    #[validate(length(max = 20000))]
    pub selected_text: Option<String>,

    #[serde(default)]
    pub target_language: Option<String>,
}

/// Answer a question about the book
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<GenerationResult>> {
    validate_request(&request)?;

    let message = request.message.trim();
    if message.is_empty() {
        return Err(AppError::Validation {
            message: "message must not be blank".to_string(),
            field: Some("message".to_string()),
        });
    }

    let result = state
        .rag
        .answer_query(
            message,
            request.selected_text.as_deref(),
            request.target_language.as_deref(),
        )
        .await?;

    Ok(Json(result))
}
