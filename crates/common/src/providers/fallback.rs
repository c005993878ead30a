//! Ordered provider failover
//!
//! `FallbackChain` evaluates an explicit list of provider attempts. Each
//! provider is tried at most once, unavailable providers are skipped, and a
//! call that outlives the per-call timeout counts as a failure. When every
//! provider has failed the caller-supplied degraded producer gets a chance
//! to build a substitute answer.

use super::{ChatProvider, Completion, CompletionRequest};
use crate::metrics;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Why a single provider attempt did not produce an answer
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderFailure {
    pub provider: String,
    pub reason: String,
}

/// Tagged result of running a chain
#[derive(Debug, Clone, PartialEq)]
pub enum ChainOutcome {
    /// A provider answered
    Success {
        provider: String,
        completion: Completion,
    },
    /// Every provider failed; the degraded producer supplied an answer
    Degraded {
        failures: Vec<ProviderFailure>,
        completion: Completion,
    },
    /// Every provider failed and no degraded answer exists
    Failed { failures: Vec<ProviderFailure> },
}

impl ChainOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            ChainOutcome::Success { .. } => "success",
            ChainOutcome::Degraded { .. } => "degraded",
            ChainOutcome::Failed { .. } => "failed",
        }
    }
}

#[derive(Clone)]
pub struct FallbackChain {
    name: &'static str,
    providers: Vec<Arc<dyn ChatProvider>>,
    call_timeout: Duration,
}

impl FallbackChain {
    /// `name` labels the chain in logs and metrics (e.g. "generation")
    pub fn new(
        name: &'static str,
        providers: Vec<Arc<dyn ChatProvider>>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            name,
            providers,
            call_timeout,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Try each provider in order, then fall back to `degraded`
    pub async fn run<F>(&self, request: &CompletionRequest, degraded: F) -> ChainOutcome
    where
        F: FnOnce() -> Option<Completion>,
    {
        let mut failures = Vec::new();

        for provider in &self.providers {
            let provider_name = provider.name().to_string();

            if !provider.is_available() {
                debug!(chain = self.name, provider = %provider_name, "Provider unavailable, skipping");
                metrics::record_provider_attempt(self.name, &provider_name, "unavailable");
                failures.push(ProviderFailure {
                    provider: provider_name,
                    reason: "not configured".to_string(),
                });
                continue;
            }

            let start = Instant::now();
            let reason = match tokio::time::timeout(self.call_timeout, provider.complete(request)).await {
                Ok(Ok(completion)) if completion.text.trim().is_empty() => {
                    metrics::record_provider_attempt(self.name, &provider_name, "empty");
                    "returned empty text".to_string()
                }
                Ok(Ok(completion)) => {
                    info!(
                        chain = self.name,
                        provider = %provider_name,
                        tokens_used = completion.tokens_used,
                        latency_ms = start.elapsed().as_millis() as u64,
                        "Provider call succeeded"
                    );
                    metrics::record_provider_attempt(self.name, &provider_name, "success");
                    metrics::record_chain_outcome(self.name, "success");
                    return ChainOutcome::Success {
                        provider: provider_name,
                        completion,
                    };
                }
                Ok(Err(e)) => {
                    metrics::record_provider_attempt(self.name, &provider_name, "error");
                    e.to_string()
                }
                Err(_) => {
                    metrics::record_provider_attempt(self.name, &provider_name, "timeout");
                    format!("timed out after {}s", self.call_timeout.as_secs_f32())
                }
            };

            warn!(
                chain = self.name,
                provider = %provider_name,
                error = %reason,
                latency_ms = start.elapsed().as_millis() as u64,
                "Provider call failed, falling back"
            );
            failures.push(ProviderFailure {
                provider: provider_name,
                reason,
            });
        }

        match degraded() {
            Some(completion) => {
                warn!(
                    chain = self.name,
                    failed_providers = failures.len(),
                    "All providers failed, returning degraded result"
                );
                metrics::record_chain_outcome(self.name, "degraded");
                ChainOutcome::Degraded {
                    failures,
                    completion,
                }
            }
            None => {
                warn!(
                    chain = self.name,
                    failed_providers = failures.len(),
                    "All providers failed and no degraded result is available"
                );
                metrics::record_chain_outcome(self.name, "failed");
                ChainOutcome::Failed { failures }
            }
        }
    }
}
