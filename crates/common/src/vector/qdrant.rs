//! Qdrant similarity oracle over the REST API

use super::{DocumentChunk, SearchHit, SimilarityOracle};
use crate::config::VectorConfig;
use crate::embeddings::Embedder;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

/// Qdrant-backed oracle
pub struct QdrantOracle {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    collection: String,
    embedder: Arc<dyn Embedder>,
    connected: AtomicBool,
}

#[derive(Serialize)]
struct CreateCollection {
    vectors: VectorParams,
}

#[derive(Serialize)]
struct VectorParams {
    size: usize,
    distance: &'static str,
}

#[derive(Serialize)]
struct UpsertPoints {
    points: Vec<Point>,
}

#[derive(Serialize)]
struct Point {
    id: String,
    vector: Vec<f32>,
    payload: ChunkPayload,
}

#[derive(Serialize, Deserialize, Default)]
struct ChunkPayload {
    #[serde(default)]
    text: String,
    #[serde(default)]
    doc_id: String,
    #[serde(default)]
    section: String,
    #[serde(default)]
    title: String,
}

#[derive(Serialize)]
struct SearchRequest {
    vector: Vec<f32>,
    limit: usize,
    with_payload: bool,
}

#[derive(Deserialize)]
struct SearchResponse {
    result: Vec<ScoredPoint>,
}

#[derive(Deserialize)]
struct ScoredPoint {
    id: serde_json::Value,
    score: f32,
    #[serde(default)]
    payload: Option<ChunkPayload>,
}

impl QdrantOracle {
    /// Build the client; no request is made until `connect`
    pub fn new(config: &VectorConfig, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            collection: config.collection.clone(),
            embedder,
            connected: AtomicBool::new(false),
        })
    }

    fn collection_url(&self) -> String {
        format!("{}/collections/{}", self.base_url, self.collection)
    }

    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.api_key {
            Some(key) => builder.header("api-key", key),
            None => builder,
        }
    }

    /// Ensure the collection exists and mark the oracle connected
    pub async fn connect(&self) -> Result<()> {
        let result = self.ensure_collection().await;
        self.connected.store(result.is_ok(), Ordering::SeqCst);
        result
    }

    async fn ensure_collection(&self) -> Result<()> {
        let response = self
            .request(reqwest::Method::GET, self.collection_url())
            .send()
            .await
            .map_err(oracle_error)?;

        match response.status() {
            status if status.is_success() => {
                debug!(collection = %self.collection, "Qdrant collection exists");
                Ok(())
            }
            StatusCode::NOT_FOUND => {
                info!(
                    collection = %self.collection,
                    dimension = self.embedder.dimension(),
                    "Creating Qdrant collection"
                );
                let body = CreateCollection {
                    vectors: VectorParams {
                        size: self.embedder.dimension(),
                        distance: "Cosine",
                    },
                };
                let response = self
                    .request(reqwest::Method::PUT, self.collection_url())
                    .json(&body)
                    .send()
                    .await
                    .map_err(oracle_error)?;
                check_status(response).await.map(|_| ())
            }
            _ => check_status(response).await.map(|_| ()),
        }
    }
}

fn oracle_error(e: reqwest::Error) -> AppError {
    AppError::Oracle {
        message: format!("Request failed: {}", e),
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(AppError::Oracle {
        message: format!("Qdrant error {}: {}", status, body),
    })
}

#[async_trait]
impl SimilarityOracle for QdrantOracle {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        let vector = self.embedder.embed(query).await?;

        let response = self
            .request(
                reqwest::Method::POST,
                format!("{}/points/search", self.collection_url()),
            )
            .json(&SearchRequest {
                vector,
                limit,
                with_payload: true,
            })
            .send()
            .await
            .map_err(oracle_error)?;

        let parsed: SearchResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| AppError::Oracle {
                message: format!("Failed to parse search response: {}", e),
            })?;

        Ok(parsed
            .result
            .into_iter()
            .map(|point| {
                let payload = point.payload.unwrap_or_default();
                let vector_id = match point.id {
                    serde_json::Value::String(id) => id,
                    other => other.to_string(),
                };
                SearchHit {
                    chunk: DocumentChunk {
                        text: payload.text,
                        source_doc_id: payload.doc_id,
                        section: payload.section,
                        title: payload.title,
                    },
                    score: point.score,
                    vector_id,
                }
            })
            .collect())
    }

    async fn upsert(&self, chunks: &[DocumentChunk]) -> Result<Vec<String>> {
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        let points: Vec<Point> = chunks
            .iter()
            .zip(embeddings)
            .map(|(chunk, vector)| Point {
                id: Uuid::new_v4().to_string(),
                vector,
                payload: ChunkPayload {
                    text: chunk.text.clone(),
                    doc_id: chunk.source_doc_id.clone(),
                    section: chunk.section.clone(),
                    title: chunk.title.clone(),
                },
            })
            .collect();
        let ids: Vec<String> = points.iter().map(|p| p.id.clone()).collect();

        let response = self
            .request(
                reqwest::Method::PUT,
                format!("{}/points?wait=true", self.collection_url()),
            )
            .json(&UpsertPoints { points })
            .send()
            .await
            .map_err(oracle_error)?;
        check_status(response).await?;

        debug!(points = ids.len(), collection = %self.collection, "Upserted points");
        Ok(ids)
    }

    fn name(&self) -> &str {
        "qdrant"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::HashEmbedder;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn oracle_for(server: &MockServer) -> QdrantOracle {
        let config = VectorConfig {
            url: server.uri(),
            collection: "book".to_string(),
            ..VectorConfig::default()
        };
        QdrantOracle::new(&config, Arc::new(HashEmbedder::new(8))).unwrap()
    }

    #[tokio::test]
    async fn test_connect_creates_missing_collection() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/collections/book"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/collections/book"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "result": true, "status": "ok"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let oracle = oracle_for(&server);
        assert!(!oracle.is_connected());
        oracle.connect().await.unwrap();
        assert!(oracle.is_connected());
    }

    #[tokio::test]
    async fn test_connect_failure_leaves_oracle_disconnected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/collections/book"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let oracle = oracle_for(&server);
        assert!(oracle.connect().await.is_err());
        assert!(!oracle.is_connected());
    }

    #[tokio::test]
    async fn test_search_maps_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/collections/book/points/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "result": [
                    {
                        "id": "7f1c",
                        "score": 0.91,
                        "payload": {
                            "text": "Sensors feed the control loop.",
                            "doc_id": "sensors",
                            "section": "hardware",
                            "title": "Sensors"
                        }
                    },
                    { "id": 42, "score": 0.5, "payload": null }
                ],
                "status": "ok",
                "time": 0.001
            })))
            .mount(&server)
            .await;

        let oracle = oracle_for(&server);
        let hits = oracle.search("sensors", 5).await.unwrap();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].vector_id, "7f1c");
        assert_eq!(hits[0].chunk.source_doc_id, "sensors");
        assert_eq!(hits[0].text(), "Sensors feed the control loop.");
        assert_eq!(hits[1].vector_id, "42");
        assert!(hits[1].text().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_returns_one_id_per_chunk() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/collections/book/points"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "result": { "operation_id": 1, "status": "completed" },
                "status": "ok"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let oracle = oracle_for(&server);
        let chunks = vec![
            DocumentChunk {
                text: "first".to_string(),
                source_doc_id: "d".to_string(),
                section: "s".to_string(),
                title: "t".to_string(),
            },
            DocumentChunk {
                text: "second".to_string(),
                source_doc_id: "d".to_string(),
                section: "s".to_string(),
                title: "t".to_string(),
            },
        ];

        let ids = oracle.upsert(&chunks).await.unwrap();
        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);
    }
}
