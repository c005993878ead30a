//! Ingestion error types

use folio_common::errors::AppError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("Docs directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to walk docs directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Invalid page pattern: {0}")]
    Pattern(#[from] regex_lite::Error),

    #[error("Indexing failed: {0}")]
    Pipeline(#[from] AppError),
}

pub type Result<T> = std::result::Result<T, IngestionError>;
