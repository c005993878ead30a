//! Document entity
//!
//! One row per indexed book page. Chunks themselves live in the similarity
//! oracle; this row keeps the lineage back to them.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "documents")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Caller-supplied stable identifier
    #[sea_orm(column_type = "Text", unique)]
    pub doc_id: String,

    #[sea_orm(column_type = "Text")]
    pub title: String,

    #[sea_orm(column_type = "Text")]
    pub content: String,

    #[sea_orm(column_type = "Text")]
    pub section: String,

    /// Comma-joined vector ids of the stored chunks
    #[sea_orm(column_type = "Text", nullable)]
    pub embedding_vector_id: Option<String>,

    pub chunk_count: i32,

    pub is_indexed: bool,

    pub created_at: DateTimeUtc,

    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Vector ids recorded for this document, in chunk order
    pub fn vector_ids(&self) -> Vec<String> {
        self.embedding_vector_id
            .as_deref()
            .map(|ids| {
                ids.split(',')
                    .filter(|id| !id.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn has_embeddings(&self) -> bool {
        self.embedding_vector_id
            .as_deref()
            .is_some_and(|ids| !ids.is_empty())
    }
}
