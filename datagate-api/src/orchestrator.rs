//! Response orchestration: the per-request decision between serving a
//! cached result, propagating a stored failure and admitting new work.
//!
//! The orchestrator never waits for a computation. Each request costs at
//! most one cache lookup per key and, on a miss, the admission calls plus an
//! optional pending-count read for the retry hint.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;

use datagate_core::{
    Admission, CacheEntry, CacheStatus, CachedPayload, Failure, HealthCheck, Outcome, ResolveError,
    ResourceKey, StoreError, StoreKind, StoreResult,
};
use datagate_storage::{CacheStore, JobQueue};

use crate::admission::AdmissionController;
use crate::config::{GatewayConfig, RetryAfterPolicy};
use crate::store_call;

/// Timing knobs of the orchestrator, taken from [`GatewayConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorConfig {
    pub call_timeout: Duration,
    pub retry_after: RetryAfterPolicy,
    pub capacity_retry_after: Duration,
    pub transient_retry_after: Duration,
}

impl From<&GatewayConfig> for OrchestratorConfig {
    fn from(config: &GatewayConfig) -> Self {
        Self {
            call_timeout: config.call_timeout,
            retry_after: config.retry_after,
            capacity_retry_after: config.capacity_retry_after,
            transient_retry_after: config.transient_retry_after,
        }
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self::from(&GatewayConfig::default())
    }
}

#[derive(Clone)]
pub struct ResponseOrchestrator {
    cache: Arc<dyn CacheStore>,
    queue: Arc<dyn JobQueue>,
    admission: AdmissionController,
    config: OrchestratorConfig,
}

impl ResponseOrchestrator {
    pub fn new(
        cache: Arc<dyn CacheStore>,
        queue: Arc<dyn JobQueue>,
        config: OrchestratorConfig,
    ) -> Self {
        let admission = AdmissionController::new(Arc::clone(&queue), config.call_timeout);
        Self {
            cache,
            queue,
            admission,
            config,
        }
    }

    /// Replace the admission controller, e.g. to change job priority.
    pub fn with_admission(mut self, admission: AdmissionController) -> Self {
        self.admission = admission;
        self
    }

    /// Decide the outcome for a single key.
    pub async fn resolve(&self, key: &ResourceKey) -> Outcome {
        self.resolve_any(std::slice::from_ref(key)).await
    }

    /// Decide the outcome for an endpoint backed by several steps.
    ///
    /// A valid result for any key is served, earliest key first. Otherwise
    /// the first key is the primary one and its entry drives the decision.
    pub async fn resolve_any(&self, keys: &[ResourceKey]) -> Outcome {
        let Some(primary) = keys.first() else {
            return Outcome::InvalidRequest(ResolveError::UnknownEndpoint {
                endpoint: String::new(),
            });
        };

        let lookups = join_all(keys.iter().map(|key| self.lookup(key))).await;

        for (key, lookup) in keys.iter().zip(&lookups) {
            if let Ok(Some(entry)) = lookup {
                if entry.is_success() && !entry.is_stale_for(key.version()) {
                    tracing::debug!(key = %key, "cache hit");
                    return Outcome::Hit(CachedPayload {
                        step: key.step().to_string(),
                        payload: entry.payload.clone(),
                        version: entry.version.clone(),
                        written_at: entry.written_at,
                    });
                }
            }
        }

        // Without a hit, an unanswered lookup leaves the state unknown.
        if let Some(err) = lookups.iter().find_map(|lookup| lookup.as_ref().err()) {
            return self.transient(err);
        }

        let primary_entry = lookups.into_iter().next().and_then(|lookup| lookup.ok().flatten());
        match primary_entry {
            Some(CacheEntry {
                status: CacheStatus::Error(detail),
                ..
            }) => {
                tracing::debug!(key = %primary, code = %detail.code, "serving stored error");
                Outcome::Error(Failure::upstream(&detail))
            }
            Some(entry) => {
                tracing::debug!(
                    key = %primary,
                    cached_version = ?entry.version,
                    "cached result is stale"
                );
                self.admit(primary).await
            }
            None => self.admit(primary).await,
        }
    }

    /// Whether every key holds a fresh successful result.
    ///
    /// Reads the cache only and never admits work. An empty key set is not
    /// valid. Any failed lookup is returned as an error, even if another key
    /// already settles the answer.
    pub async fn is_valid(&self, keys: &[ResourceKey]) -> StoreResult<bool> {
        if keys.is_empty() {
            return Ok(false);
        }
        let lookups = join_all(keys.iter().map(|key| self.lookup(key))).await;
        let mut valid = true;
        for (key, lookup) in keys.iter().zip(lookups) {
            let fresh = lookup?
                .is_some_and(|entry| entry.is_success() && !entry.is_stale_for(key.version()));
            valid &= fresh;
        }
        Ok(valid)
    }

    /// Ping both stores.
    pub async fn health(&self) -> Vec<HealthCheck> {
        let cache = self.probe(StoreKind::Cache, self.cache.ping()).await;
        let queue = self.probe(StoreKind::Queue, self.queue.ping()).await;
        vec![cache, queue]
    }

    async fn lookup(&self, key: &ResourceKey) -> StoreResult<Option<CacheEntry>> {
        store_call::bounded(
            StoreKind::Cache,
            "get",
            self.config.call_timeout,
            self.cache.get(key.id()),
        )
        .await
    }

    async fn admit(&self, key: &ResourceKey) -> Outcome {
        let admission = match self.admission.ensure_queued(key).await {
            Ok(admission) => admission,
            Err(err) => return self.transient(&err),
        };
        if admission == Admission::Rejected {
            return Outcome::Error(Failure::capacity_rejected(self.config.capacity_retry_after));
        }
        match self.retry_hint().await {
            Ok(retry_after) => Outcome::Pending {
                retry_after,
                admission,
            },
            Err(err) => self.transient(&err),
        }
    }

    async fn retry_hint(&self) -> StoreResult<Duration> {
        let policy = self.config.retry_after;
        if !policy.needs_queue_depth() {
            return Ok(policy.compute(0));
        }
        let pending = store_call::bounded(
            StoreKind::Queue,
            "pending_count",
            self.config.call_timeout,
            self.queue.pending_count(),
        )
        .await?;
        Ok(policy.compute(pending))
    }

    fn transient(&self, err: &StoreError) -> Outcome {
        tracing::warn!(store = err.store().as_str(), error = %err, "store call failed");
        Outcome::Error(Failure::transient(err, self.config.transient_retry_after))
    }

    async fn probe<F>(&self, store: StoreKind, ping: F) -> HealthCheck
    where
        F: std::future::Future<Output = StoreResult<()>>,
    {
        let start = std::time::Instant::now();
        let result = store_call::bounded(store, "ping", self.config.call_timeout, ping).await;
        let elapsed_ms = i64::try_from(start.elapsed().as_millis()).unwrap_or(i64::MAX);
        match result {
            Ok(()) => HealthCheck::healthy(store.as_str()).with_response_time(elapsed_ms),
            Err(err) => HealthCheck::unhealthy(store.as_str(), err.to_string())
                .with_response_time(elapsed_ms),
        }
    }
}

impl std::fmt::Debug for ResponseOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseOrchestrator")
            .field("admission", &self.admission)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
