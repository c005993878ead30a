//! Translation handler

use super::validate_request;
use crate::AppState;
use axum::{extract::State, Json};
use folio_common::{errors::Result, TranslationResult};
use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct TranslateRequest {
    #[validate(length(min = 1, max = 20000))]
    pub text: String,

    /// Defaults to the configured default language
    #[serde(default)]
    pub source_lang: Option<String>,

    #[serde(default)]
    pub target_lang: Option<String>,
}

pub async fn translate(
    State(state): State<AppState>,
    Json(request): Json<TranslateRequest>,
) -> Result<Json<TranslationResult>> {
    validate_request(&request)?;

    let result = state
        .rag
        .translate(
            &request.text,
            request.source_lang.as_deref(),
            request.target_lang.as_deref(),
        )
        .await?;

    Ok(Json(result))
}
