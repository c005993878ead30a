//! Repository pattern for the document metadata store

use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};

/// Fields supplied when a document is (re)indexed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDocument {
    pub doc_id: String,
    pub title: String,
    pub content: String,
    pub section: String,
}

/// Metadata store capability used by the pipeline
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert the document, or update title/content/section when `doc_id` exists
    async fn upsert_document(&self, doc: NewDocument) -> Result<Document>;

    /// Record the vector ids produced for the document's chunks
    async fn record_embeddings(
        &self,
        doc_id: &str,
        vector_ids: &[String],
        chunk_count: usize,
    ) -> Result<Document>;

    async fn find_document(&self, doc_id: &str) -> Result<Option<Document>>;

    async fn list_documents(&self) -> Result<Vec<Document>>;

    async fn ping(&self) -> Result<()>;
}

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> &DatabaseConnection {
        self.pool.conn()
    }

    async fn find_by_doc_id(&self, doc_id: &str) -> Result<Option<Document>> {
        DocumentEntity::find()
            .filter(DocumentColumn::DocId.eq(doc_id))
            .one(self.conn())
            .await
            .map_err(Into::into)
    }
}

#[async_trait]
impl DocumentStore for Repository {
    async fn upsert_document(&self, doc: NewDocument) -> Result<Document> {
        let now = chrono::Utc::now();

        match self.find_by_doc_id(&doc.doc_id).await? {
            Some(existing) => {
                tracing::debug!(doc_id = %doc.doc_id, "Updating existing document");

                let mut active: DocumentActiveModel = existing.into();
                active.title = Set(doc.title);
                active.content = Set(doc.content);
                active.section = Set(doc.section);
                // Stored vectors describe the previous content until re-recorded
                active.is_indexed = Set(false);
                active.updated_at = Set(now);

                active.update(self.conn()).await.map_err(Into::into)
            }
            None => {
                tracing::debug!(doc_id = %doc.doc_id, "Creating document");

                let active = DocumentActiveModel {
                    doc_id: Set(doc.doc_id),
                    title: Set(doc.title),
                    content: Set(doc.content),
                    section: Set(doc.section),
                    embedding_vector_id: Set(None),
                    chunk_count: Set(0),
                    is_indexed: Set(false),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                };

                active.insert(self.conn()).await.map_err(Into::into)
            }
        }
    }

    async fn record_embeddings(
        &self,
        doc_id: &str,
        vector_ids: &[String],
        chunk_count: usize,
    ) -> Result<Document> {
        let existing =
            self.find_by_doc_id(doc_id)
                .await?
                .ok_or_else(|| AppError::DocumentNotFound {
                    doc_id: doc_id.to_string(),
                })?;

        let mut active: DocumentActiveModel = existing.into();
        active.embedding_vector_id = Set(Some(vector_ids.join(",")));
        active.chunk_count = Set(i32::try_from(chunk_count).unwrap_or(i32::MAX));
        active.is_indexed = Set(true);
        active.updated_at = Set(chrono::Utc::now());

        active.update(self.conn()).await.map_err(Into::into)
    }

    async fn find_document(&self, doc_id: &str) -> Result<Option<Document>> {
        self.find_by_doc_id(doc_id).await
    }

    async fn list_documents(&self) -> Result<Vec<Document>> {
        DocumentEntity::find()
            .order_by_asc(DocumentColumn::DocId)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }
}
