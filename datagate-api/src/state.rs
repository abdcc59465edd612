//! Shared gateway state, cheap to clone into every request handler.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use datagate_core::{ConfigError, DatagateError, DatagateResult, HealthCheck, Outcome, ResolveError};
use datagate_storage::{CacheStore, InMemoryCacheStore, InMemoryJobQueue, JobQueue};
use serde_json::json;

use crate::admission::AdmissionController;
use crate::config::GatewayConfig;
use crate::constants::UNKNOWN_ENDPOINT_LABEL;
use crate::error::ApiError;
use crate::orchestrator::{OrchestratorConfig, ResponseOrchestrator};
use crate::resolver::{RawParams, ResourceResolver};
use crate::response::ResponsePolicy;
use crate::telemetry::metrics;

/// Application-wide state shared across all requests.
///
/// Holds no per-request or per-key state; every instance sharing the same
/// stores behaves identically.
#[derive(Debug, Clone)]
pub struct AppState {
    pub resolver: ResourceResolver,
    pub orchestrator: Arc<ResponseOrchestrator>,
    pub response: ResponsePolicy,
    pub start_time: Instant,
}

impl AppState {
    /// Build the gateway over the given stores.
    pub fn new(
        config: &GatewayConfig,
        cache: Arc<dyn CacheStore>,
        queue: Arc<dyn JobQueue>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let graph = config.processing_graph()?;
        let endpoints = config.endpoint_config(&graph)?;

        let admission = AdmissionController::new(Arc::clone(&queue), config.call_timeout)
            .with_priority(config.job_priority);
        let orchestrator = ResponseOrchestrator::new(cache, queue, OrchestratorConfig::from(config))
            .with_admission(admission);

        tracing::info!(
            steps = graph.steps().count(),
            call_timeout_ms = u64::try_from(config.call_timeout.as_millis()).unwrap_or(u64::MAX),
            queue_capacity = ?config.queue_capacity,
            "gateway state initialized"
        );

        Ok(Self {
            resolver: ResourceResolver::new(graph, endpoints),
            orchestrator: Arc::new(orchestrator),
            response: config.response,
            start_time: Instant::now(),
        })
    }

    /// Build the gateway over fresh in-memory stores, returning them so the
    /// caller can play the worker's part.
    pub fn in_memory(
        config: &GatewayConfig,
    ) -> Result<(Self, InMemoryCacheStore, InMemoryJobQueue), ConfigError> {
        let cache = InMemoryCacheStore::new();
        let queue = match config.queue_capacity {
            Some(capacity) => InMemoryJobQueue::with_capacity(capacity),
            None => InMemoryJobQueue::new(),
        };
        let state = Self::new(config, Arc::new(cache.clone()), Arc::new(queue.clone()))?;
        Ok((state, cache, queue))
    }

    /// Resolve `endpoint` with `params` and decide the outcome.
    pub async fn serve(&self, endpoint: &str, params: &RawParams) -> Outcome {
        let (outcome, label) = match self.resolver.resolve(endpoint, params) {
            Ok(keys) => (self.orchestrator.resolve_any(&keys).await, endpoint),
            Err(err) => {
                tracing::debug!(endpoint, error = %err, "invalid request");
                // Client-chosen paths never become label values.
                let label = match err {
                    ResolveError::UnknownEndpoint { .. } | ResolveError::UnknownStep { .. } => {
                        UNKNOWN_ENDPOINT_LABEL
                    }
                    ResolveError::MissingField { .. } | ResolveError::MalformedField { .. } => {
                        endpoint
                    }
                };
                (Outcome::InvalidRequest(err), label)
            }
        };

        if let Some(metrics) = metrics() {
            let class = outcome.failure_class().map(|c| c.as_str()).unwrap_or("");
            metrics.record_outcome(label, outcome.kind().as_str(), class);
        }
        outcome
    }

    /// [`AppState::serve`], rendered as an HTTP response.
    pub async fn respond(&self, endpoint: &str, params: &RawParams) -> Response {
        let outcome = self.serve(endpoint, params).await;
        self.response.render(outcome)
    }

    /// Whether every dataset-level step holds a fresh successful result for
    /// the dataset named in `params`. Never admits work.
    pub async fn is_valid(&self, params: &RawParams) -> DatagateResult<bool> {
        let keys = self.resolver.dataset_keys(params)?;
        Ok(self.orchestrator.is_valid(&keys).await?)
    }

    /// [`AppState::is_valid`] as `{"valid": bool}`.
    pub async fn respond_is_valid(&self, params: &RawParams) -> Response {
        match self.is_valid(params).await {
            Ok(valid) => (StatusCode::OK, Json(json!({ "valid": valid }))).into_response(),
            Err(DatagateError::Resolve(err)) => self.response.render(Outcome::InvalidRequest(err)),
            Err(err) => ApiError::from(err).into_response(),
        }
    }

    pub async fn health(&self) -> Vec<HealthCheck> {
        self.orchestrator.health().await
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
