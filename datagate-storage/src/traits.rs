//! Contracts the gateway expects from its external stores.
//!
//! Both stores are shared by every gateway instance, so all durable state
//! and all atomicity live behind these traits. Implementations must be safe
//! to call concurrently from many tasks.

use async_trait::async_trait;
use datagate_core::{CacheEntry, EnqueueResult, Priority, ResourceId, ResourceKey, StoreResult};

/// Read side of the persistent result cache.
///
/// Entries are written by the worker pipeline, never by the gateway.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Look up the entry for a resource, whatever its version.
    async fn get(&self, id: &ResourceId) -> StoreResult<Option<CacheEntry>>;

    /// Cheap reachability probe for health checks.
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

/// The durable queue of pending computations.
///
/// # Contract
///
/// At most one live (queued or started) job may exist per
/// [`ResourceKey::unicity_id`]. [`JobQueue::create_if_absent`] is the only
/// place this is enforced: when many callers race on the same key, exactly
/// one of them observes [`EnqueueResult::Created`] and all others observe
/// [`EnqueueResult::AlreadyExisted`]. Callers hold no lock of their own.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Whether a live job exists for the key.
    async fn exists(&self, key: &ResourceKey) -> StoreResult<bool>;

    /// Atomically create a job for the key unless one is live, or reject it
    /// when the queue is at capacity.
    async fn create_if_absent(
        &self,
        key: &ResourceKey,
        priority: Priority,
    ) -> StoreResult<EnqueueResult>;

    /// Number of live jobs.
    async fn pending_count(&self) -> StoreResult<u64>;

    /// Cheap reachability probe for health checks.
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
