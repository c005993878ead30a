//! Health check handlers

use crate::AppState;
use axum::{extract::State, Json};
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: String,
    pub checks: HealthChecks,
}

#[derive(Serialize)]
pub struct HealthChecks {
    pub database: CheckResult,
    pub vector_store: CheckResult,
}

#[derive(Serialize)]
pub struct CheckResult {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Liveness probe - always returns healthy if server is running
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: folio_common::VERSION.to_string(),
    })
}

/// Readiness probe - checks the metadata store and the similarity oracle.
///
/// A disconnected oracle leaves the service ready: questions are still
/// answered, only without retrieved passages.
pub async fn ready(State(state): State<AppState>) -> Json<ReadyResponse> {
    let start = std::time::Instant::now();

    let db_check = match state.rag.store().ping().await {
        Ok(_) => CheckResult {
            status: "up".to_string(),
            latency_ms: Some(start.elapsed().as_millis() as u64),
            error: None,
        },
        Err(e) => CheckResult {
            status: "down".to_string(),
            latency_ms: None,
            error: Some(e.to_string()),
        },
    };

    let oracle_connected = state.rag.oracle_connected();
    let vector_check = CheckResult {
        status: if oracle_connected { "up" } else { "down" }.to_string(),
        latency_ms: None,
        error: None,
    };

    let status = match (db_check.status == "up", oracle_connected) {
        (true, true) => "ready",
        (true, false) => "degraded",
        (false, _) => "not_ready",
    };

    Json(ReadyResponse {
        status: status.to_string(),
        checks: HealthChecks {
            database: db_check,
            vector_store: vector_check,
        },
    })
}
