//! Document indexing handlers

use super::validate_request;
use crate::AppState;
use axum::{extract::State, Json};
use folio_common::{db::models::Document, errors::Result, IndexRequest};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct IndexDocumentRequest {
    #[validate(length(min = 1))]
    pub content: String,

    #[validate(length(min = 1, max = 255))]
    pub doc_id: String,

    #[validate(length(min = 1, max = 1000))]
    pub doc_title: String,

    #[serde(default)]
    pub doc_section: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct IndexDocumentResponse {
    pub success: bool,
    pub chunks_processed: usize,
}

#[derive(Debug, Serialize)]
pub struct DocumentSummary {
    pub doc_id: String,
    pub title: String,
    pub section: String,
    pub chunk_count: i32,
    pub created_at: String,
    pub updated_at: String,
    pub is_indexed: bool,
    pub has_embeddings: bool,
}

impl From<Document> for DocumentSummary {
    fn from(doc: Document) -> Self {
        Self {
            has_embeddings: doc.has_embeddings(),
            doc_id: doc.doc_id,
            title: doc.title,
            section: doc.section,
            chunk_count: doc.chunk_count,
            created_at: doc.created_at.to_rfc3339(),
            updated_at: doc.updated_at.to_rfc3339(),
            is_indexed: doc.is_indexed,
        }
    }
}

/// Chunk, embed and record a single page
pub async fn index_document(
    State(state): State<AppState>,
    Json(request): Json<IndexDocumentRequest>,
) -> Result<Json<IndexDocumentResponse>> {
    validate_request(&request)?;

    let summary = state
        .rag
        .index_document(IndexRequest {
            content: request.content,
            doc_id: request.doc_id,
            title: request.doc_title,
            section: request.doc_section,
        })
        .await?;

    Ok(Json(IndexDocumentResponse {
        success: true,
        chunks_processed: summary.chunks_processed,
    }))
}

/// List every document in the metadata store
pub async fn list_documents(State(state): State<AppState>) -> Result<Json<Vec<DocumentSummary>>> {
    let documents = state.rag.store().list_documents().await?;
    Ok(Json(documents.into_iter().map(DocumentSummary::from).collect()))
}
