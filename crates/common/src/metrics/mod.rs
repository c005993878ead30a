//! Metrics and observability utilities
//!
//! Prometheus-style metrics with a shared prefix and standardized naming.
//! Recording goes through the `metrics` facade, so every helper is a no-op
//! until a recorder (the gateway's Prometheus exporter) is installed.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all Folio metrics
pub const METRICS_PREFIX: &str = "folio";

/// Histogram buckets for HTTP request latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.00,
];

/// Buckets for end-to-end query latency, dominated by provider calls
pub const QUERY_BUCKETS: &[f64] = &[
    0.100, 0.250, 0.500, 1.000, 2.000, 5.000, 10.00, 20.00, 30.00, 60.00,
];

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    describe_counter!(
        format!("{}_queries_total", METRICS_PREFIX),
        Unit::Count,
        "Total questions answered"
    );

    describe_histogram!(
        format!("{}_query_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "End-to-end question answering latency in seconds"
    );

    describe_counter!(
        format!("{}_retrieval_hits_total", METRICS_PREFIX),
        Unit::Count,
        "Passages returned by the similarity oracle"
    );

    describe_counter!(
        format!("{}_retrieval_degraded_total", METRICS_PREFIX),
        Unit::Count,
        "Retrievals that returned nothing because the oracle was down or failed"
    );

    describe_counter!(
        format!("{}_provider_attempts_total", METRICS_PREFIX),
        Unit::Count,
        "Generation provider attempts by outcome"
    );

    describe_counter!(
        format!("{}_chain_outcomes_total", METRICS_PREFIX),
        Unit::Count,
        "Fallback chain results (success, degraded, failed)"
    );

    describe_counter!(
        format!("{}_translations_total", METRICS_PREFIX),
        Unit::Count,
        "Total translation requests"
    );

    describe_counter!(
        format!("{}_documents_indexed_total", METRICS_PREFIX),
        Unit::Count,
        "Total documents indexed"
    );

    describe_counter!(
        format!("{}_chunks_created_total", METRICS_PREFIX),
        Unit::Count,
        "Total chunks created"
    );

    describe_histogram!(
        format!("{}_indexing_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Document indexing latency in seconds"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Record an answered question
pub fn record_query(duration_secs: f64, translated: bool) {
    counter!(
        format!("{}_queries_total", METRICS_PREFIX),
        "translated" => translated.to_string()
    )
    .increment(1);

    histogram!(format!("{}_query_duration_seconds", METRICS_PREFIX)).record(duration_secs);
}

/// Record a retrieval; `degraded` means the oracle could not be used
pub fn record_retrieval(hits: usize, degraded: bool) {
    if degraded {
        counter!(format!("{}_retrieval_degraded_total", METRICS_PREFIX)).increment(1);
    } else {
        counter!(format!("{}_retrieval_hits_total", METRICS_PREFIX)).increment(hits as u64);
    }
}

/// Record one provider attempt inside a fallback chain
pub fn record_provider_attempt(chain: &str, provider: &str, outcome: &str) {
    counter!(
        format!("{}_provider_attempts_total", METRICS_PREFIX),
        "chain" => chain.to_string(),
        "provider" => provider.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record the final result of a fallback chain
pub fn record_chain_outcome(chain: &str, outcome: &str) {
    counter!(
        format!("{}_chain_outcomes_total", METRICS_PREFIX),
        "chain" => chain.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

pub fn record_translation(source_lang: &str, target_lang: &str) {
    counter!(
        format!("{}_translations_total", METRICS_PREFIX),
        "source" => source_lang.to_string(),
        "target" => target_lang.to_string()
    )
    .increment(1);
}

/// Helper to record indexing metrics
pub fn record_indexing(duration_secs: f64, chunks_created: usize, section: &str) {
    counter!(
        format!("{}_documents_indexed_total", METRICS_PREFIX),
        "section" => section.to_string()
    )
    .increment(1);

    counter!(
        format!("{}_chunks_created_total", METRICS_PREFIX),
        "section" => section.to_string()
    )
    .increment(chunks_created as u64);

    histogram!(format!("{}_indexing_duration_seconds", METRICS_PREFIX)).record(duration_secs);
}
