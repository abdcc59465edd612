//! Admission control for cache misses.
//!
//! Decides whether a miss needs a new job. The queue's create-if-absent is
//! the only point of serialization; this controller holds no lock, so any
//! number of gateway instances can admit work for the same key at once.

use std::sync::Arc;
use std::time::{Duration, Instant};

use datagate_core::{Admission, EnqueueResult, Priority, ResourceKey, StoreError, StoreKind, StoreResult};
use datagate_storage::JobQueue;

use crate::constants::ENQUEUE_COMPLETION_FACTOR;
use crate::store_call;
use crate::telemetry::metrics;

#[derive(Clone)]
pub struct AdmissionController {
    queue: Arc<dyn JobQueue>,
    call_timeout: Duration,
    priority: Priority,
}

impl AdmissionController {
    pub fn new(queue: Arc<dyn JobQueue>, call_timeout: Duration) -> Self {
        Self {
            queue,
            call_timeout,
            priority: Priority::Normal,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Make sure a job exists for `key`.
    ///
    /// Store failures and timeouts are returned as errors and never reported
    /// as `Rejected`, which is reserved for a queue at capacity.
    pub async fn ensure_queued(&self, key: &ResourceKey) -> StoreResult<Admission> {
        let exists = store_call::bounded(
            StoreKind::Queue,
            "exists",
            self.call_timeout,
            self.queue.exists(key),
        )
        .await?;

        let admission = if exists {
            Admission::AlreadyQueued
        } else {
            let result = self.enqueue(key).await?;
            match &result {
                EnqueueResult::Created(job) => tracing::info!(
                    job_id = %job.job_id,
                    unicity_id = %job.unicity_id,
                    priority = ?job.priority,
                    "job enqueued"
                ),
                EnqueueResult::AlreadyExisted(job) => {
                    tracing::debug!(job_id = %job.job_id, "job created concurrently")
                }
                EnqueueResult::Rejected { capacity } => {
                    tracing::warn!(key = %key, capacity, "job queue at capacity")
                }
            }
            Admission::from(&result)
        };

        if let Some(metrics) = metrics() {
            metrics.record_admission(key.step(), admission.as_str());
        }
        Ok(admission)
    }

    /// Issue create-if-absent on its own task.
    ///
    /// Dropping the caller, or hitting the timeout, leaves the task running:
    /// an enqueue that reached the queue is never abandoned halfway. The task
    /// itself gives up after `ENQUEUE_COMPLETION_FACTOR` call timeouts.
    async fn enqueue(&self, key: &ResourceKey) -> StoreResult<EnqueueResult> {
        let queue = Arc::clone(&self.queue);
        let owned = key.clone();
        let priority = self.priority;
        let completion = self.completion_bound();
        let task = tokio::spawn(async move {
            match tokio::time::timeout(completion, queue.create_if_absent(&owned, priority)).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(key = %owned, ?completion, "enqueue abandoned");
                    Err(StoreError::timeout(StoreKind::Queue, "create_if_absent", completion))
                }
            }
        });

        let start = Instant::now();
        let result = match tokio::time::timeout(self.call_timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(StoreError::unavailable(
                StoreKind::Queue,
                format!("enqueue task failed: {}", join_err),
            )),
            Err(_) => Err(StoreError::timeout(
                StoreKind::Queue,
                "create_if_absent",
                self.call_timeout,
            )),
        };
        store_call::record(StoreKind::Queue, "create_if_absent", &result, start);
        result
    }

    /// How long a detached enqueue may run before its task gives up.
    fn completion_bound(&self) -> Duration {
        self.call_timeout.saturating_mul(ENQUEUE_COMPLETION_FACTOR)
    }
}

impl std::fmt::Debug for AdmissionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdmissionController")
            .field("call_timeout", &self.call_timeout)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}
