//! Directory indexer
//!
//! Walks a docs tree for Markdown pages and feeds each one through
//! `RagService::index_document`. A failing page is logged and counted;
//! the run always continues with the next page.

use crate::errors::{IngestionError, Result};
use crate::markdown::{is_markdown, BookPage, PageParser};
use folio_common::{IndexRequest, RagService};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument};
use walkdir::WalkDir;

/// Outcome of one directory run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IndexReport {
    pub discovered: usize,
    pub indexed: usize,
    pub failed: usize,
    pub chunks: usize,
}

pub struct BookIndexer {
    rag: Arc<RagService>,
    parser: PageParser,
}

impl BookIndexer {
    pub fn new(rag: Arc<RagService>) -> Result<Self> {
        Ok(Self {
            rag,
            parser: PageParser::new()?,
        })
    }

    /// Markdown files under `root`, in a stable order
    pub fn discover(&self, root: &Path) -> Result<Vec<PathBuf>> {
        if !root.is_dir() {
            return Err(IngestionError::DirectoryNotFound(root.to_path_buf()));
        }

        let mut pages = Vec::new();
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry?;
            if entry.file_type().is_file() && is_markdown(entry.path()) {
                pages.push(entry.into_path());
            }
        }
        Ok(pages)
    }

    pub async fn load_page(&self, root: &Path, path: &Path) -> Result<BookPage> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| IngestionError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(self.parser.parse(root, path, &raw))
    }

    async fn index_page(&self, root: &Path, path: &Path) -> Result<usize> {
        let page = self.load_page(root, path).await?;
        debug!(doc_id = %page.doc_id, title = %page.title, "Indexing page");

        let summary = self
            .rag
            .index_document(IndexRequest {
                content: page.content,
                doc_id: page.doc_id,
                title: page.title,
                section: Some(page.section),
            })
            .await?;
        Ok(summary.chunks_processed)
    }

    #[instrument(skip(self), fields(root = %root.display()))]
    pub async fn index_directory(&self, root: &Path) -> Result<IndexReport> {
        let start = Instant::now();
        let pages = self.discover(root)?;
        info!(pages = pages.len(), "Discovered Markdown pages");

        let mut report = IndexReport {
            discovered: pages.len(),
            ..IndexReport::default()
        };

        for path in &pages {
            match self.index_page(root, path).await {
                Ok(chunks) => {
                    report.indexed += 1;
                    report.chunks += chunks;
                }
                Err(e) => {
                    report.failed += 1;
                    error!(path = %path.display(), error = %e, "Failed to index page");
                }
            }
        }

        info!(
            indexed = report.indexed,
            failed = report.failed,
            chunks = report.chunks,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Directory indexing finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_common::config::DatabaseConfig;
    use folio_common::embeddings::HashEmbedder;
    use folio_common::vector::MemoryOracle;
    use folio_common::{AppConfig, DbPool, DocumentStore, Repository};
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        indexer: BookIndexer,
        store: Arc<Repository>,
        oracle: Arc<MemoryOracle>,
    }

    async fn fixture() -> Fixture {
        let config = AppConfig::default();
        let pool = DbPool::new(&DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            ..DatabaseConfig::default()
        })
        .await
        .unwrap();
        pool.ensure_schema().await.unwrap();

        let store = Arc::new(Repository::new(pool));
        let oracle = Arc::new(MemoryOracle::new(Arc::new(HashEmbedder::new(128))));
        let rag = RagService::from_config(&config, oracle.clone(), store.clone()).unwrap();

        Fixture {
            indexer: BookIndexer::new(Arc::new(rag)).unwrap(),
            store,
            oracle,
        }
    }

    fn write(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }

    fn book() -> TempDir {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "intro.md",
            "---\ntitle: \"Welcome\"\n---\n# Welcome\n\nPhysical AI brings models into the world.",
        );
        write(
            dir.path(),
            "module-1/ros2/nodes.mdx",
            "# ROS 2 Nodes\n\nNodes exchange messages over topics.",
        );
        write(dir.path(), "module-1/_category_.json", "{\"label\": \"Module 1\"}");
        dir
    }

    #[tokio::test]
    async fn test_discover_finds_markdown_only() {
        let f = fixture().await;
        let dir = book();

        let pages = f.indexer.discover(dir.path()).unwrap();
        assert_eq!(pages.len(), 2);
        assert!(pages.iter().all(|p| is_markdown(p)));
    }

    #[tokio::test]
    async fn test_missing_directory_is_an_error() {
        let f = fixture().await;
        let dir = TempDir::new().unwrap();
        let err = tokio_test::assert_err!(
            f.indexer.index_directory(&dir.path().join("absent")).await
        );
        assert!(matches!(err, IngestionError::DirectoryNotFound(_)));
    }

    #[tokio::test]
    async fn test_index_directory_stores_pages_and_vectors() {
        let f = fixture().await;
        let dir = book();

        let report = tokio_test::assert_ok!(f.indexer.index_directory(dir.path()).await);
        assert_eq!(report.discovered, 2);
        assert_eq!(report.indexed, 2);
        assert_eq!(report.failed, 0);
        assert_eq!(report.chunks, 2);
        assert_eq!(f.oracle.len().await, 2);

        let intro = f.store.find_document("intro").await.unwrap().unwrap();
        assert_eq!(intro.title, "Welcome");
        assert_eq!(intro.section, "main");
        assert!(!intro.content.contains("title:"));
        assert!(intro.is_indexed);

        let nodes = f
            .store
            .find_document("module-1_ros2_nodes")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(nodes.title, "ROS 2 Nodes");
        assert_eq!(nodes.section, "ros2");
    }

    #[tokio::test]
    async fn test_blank_page_indexes_without_vectors() {
        let f = fixture().await;
        let dir = book();
        write(dir.path(), "empty.md", "   \n");

        let report = f.indexer.index_directory(dir.path()).await.unwrap();
        assert_eq!(report.indexed, 3);
        assert_eq!(report.chunks, 2);

        let empty = f.store.find_document("empty").await.unwrap().unwrap();
        assert_eq!(empty.title, crate::markdown::UNTITLED);
        assert!(!empty.is_indexed);
    }

    #[tokio::test]
    async fn test_disconnected_oracle_stores_metadata_only() {
        let f = fixture().await;
        let dir = book();
        f.oracle.set_connected(false);

        let report = f.indexer.index_directory(dir.path()).await.unwrap();
        assert_eq!(report.indexed, 2);
        assert!(f.oracle.is_empty().await);

        let docs = f.store.list_documents().await.unwrap();
        assert_eq!(docs.len(), 2);
        assert!(docs.iter().all(|d| !d.is_indexed));
    }

    #[tokio::test]
    async fn test_unreadable_page_is_counted_as_failure() {
        let f = fixture().await;
        let dir = book();
        fs::write(dir.path().join("binary.md"), [0xff_u8, 0xfe, 0x00, 0x80]).unwrap();

        let report = f.indexer.index_directory(dir.path()).await.unwrap();
        assert_eq!(report.discovered, 3);
        assert_eq!(report.indexed, 2);
        assert_eq!(report.failed, 1);
    }
}
