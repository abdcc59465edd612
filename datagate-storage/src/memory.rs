//! In-memory cache store and job queue.
//!
//! Used by tests and by single-process deployments. The write-side helpers
//! (`upsert`, `start_next`, `finish`) stand in for the worker pipeline.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use datagate_core::{
    CacheEntry, EnqueueResult, JobRecord, JobState, Priority, ResourceId, ResourceKey, StoreError,
    StoreKind, StoreResult,
};

use crate::traits::{CacheStore, JobQueue};

// ============================================================================
// CACHE STORE
// ============================================================================

/// Cache store backed by a shared map, one entry per resource identity.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCacheStore {
    entries: Arc<RwLock<HashMap<ResourceId, CacheEntry>>>,
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write an entry, replacing whatever the resource held before.
    pub fn upsert(&self, entry: CacheEntry) -> StoreResult<()> {
        let mut entries = self.entries.write().map_err(|_| poisoned_cache())?;
        entries.insert(entry.id.clone(), entry);
        Ok(())
    }

    pub fn len(&self) -> StoreResult<usize> {
        let entries = self.entries.read().map_err(|_| poisoned_cache())?;
        Ok(entries.len())
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn get(&self, id: &ResourceId) -> StoreResult<Option<CacheEntry>> {
        let entries = self.entries.read().map_err(|_| poisoned_cache())?;
        Ok(entries.get(id).cloned())
    }

    async fn ping(&self) -> StoreResult<()> {
        let _entries = self.entries.read().map_err(|_| poisoned_cache())?;
        Ok(())
    }
}

fn poisoned_cache() -> StoreError {
    StoreError::LockPoisoned {
        store: StoreKind::Cache,
    }
}

// ============================================================================
// JOB QUEUE
// ============================================================================

/// Job queue holding live jobs keyed by unicity id.
///
/// The check for an existing job, the capacity check and the insert all
/// happen under one lock, which is what makes `create_if_absent` atomic.
#[derive(Debug, Clone, Default)]
pub struct InMemoryJobQueue {
    jobs: Arc<Mutex<HashMap<String, JobRecord>>>,
    capacity: Option<usize>,
}

impl InMemoryJobQueue {
    /// Unbounded queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue that rejects new jobs once `capacity` live jobs exist.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            jobs: Arc::default(),
            capacity: Some(capacity),
        }
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Mark the oldest queued job as started and return it.
    ///
    /// Normal-priority jobs go before low-priority ones.
    pub fn start_next(&self) -> StoreResult<Option<JobRecord>> {
        let mut jobs = self.jobs.lock().map_err(|_| poisoned_queue())?;
        let next = jobs
            .values_mut()
            .filter(|job| job.state == JobState::Queued)
            .min_by_key(|job| (job.priority == Priority::Low, job.enqueued_at, job.job_id));
        Ok(next.map(|job| {
            job.start();
            job.clone()
        }))
    }

    /// Remove a job once its result has been written to the cache.
    pub fn finish(&self, unicity_id: &str) -> StoreResult<Option<JobRecord>> {
        let mut jobs = self.jobs.lock().map_err(|_| poisoned_queue())?;
        Ok(jobs.remove(unicity_id))
    }

    /// Snapshot of every live job.
    pub fn jobs(&self) -> StoreResult<Vec<JobRecord>> {
        let jobs = self.jobs.lock().map_err(|_| poisoned_queue())?;
        Ok(jobs.values().cloned().collect())
    }

    pub fn len(&self) -> StoreResult<usize> {
        let jobs = self.jobs.lock().map_err(|_| poisoned_queue())?;
        Ok(jobs.len())
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }
}

#[async_trait]
impl JobQueue for InMemoryJobQueue {
    async fn exists(&self, key: &ResourceKey) -> StoreResult<bool> {
        let jobs = self.jobs.lock().map_err(|_| poisoned_queue())?;
        Ok(jobs.contains_key(&key.unicity_id()))
    }

    async fn create_if_absent(
        &self,
        key: &ResourceKey,
        priority: Priority,
    ) -> StoreResult<EnqueueResult> {
        let unicity_id = key.unicity_id();
        let mut jobs = self.jobs.lock().map_err(|_| poisoned_queue())?;

        if let Some(existing) = jobs.get(&unicity_id) {
            return Ok(EnqueueResult::AlreadyExisted(existing.clone()));
        }
        if let Some(capacity) = self.capacity {
            if jobs.len() >= capacity {
                return Ok(EnqueueResult::Rejected { capacity });
            }
        }

        let record = JobRecord::queued(key.clone(), priority);
        tracing::debug!(job_id = %record.job_id, unicity_id = %unicity_id, "job created");
        jobs.insert(unicity_id, record.clone());
        Ok(EnqueueResult::Created(record))
    }

    async fn pending_count(&self) -> StoreResult<u64> {
        let jobs = self.jobs.lock().map_err(|_| poisoned_queue())?;
        Ok(jobs.len() as u64)
    }

    async fn ping(&self) -> StoreResult<()> {
        let _jobs = self.jobs.lock().map_err(|_| poisoned_queue())?;
        Ok(())
    }
}

fn poisoned_queue() -> StoreError {
    StoreError::LockPoisoned {
        store: StoreKind::Queue,
    }
}
