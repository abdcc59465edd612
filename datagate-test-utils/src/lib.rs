//! datagate Test Utilities
//!
//! Centralized test infrastructure for the datagate workspace:
//! - Store doubles that count calls and inject faults
//! - Proptest generators for request parameters and cache entries
//! - Test fixtures for common scenarios
//! - Assertions over gateway outcomes

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

// Re-export the in-memory stores from their source crate
pub use datagate_storage::{CacheStore, InMemoryCacheStore, InMemoryJobQueue, JobQueue};

// Re-export core types for convenience
pub use datagate_core::{
    Admission, CacheEntry, ContentVersion, EnqueueResult, ErrorDetail, FailureClass, Outcome,
    Priority, ProcessingGraph, ResourceId, ResourceKey, StoreError, StoreKind, StoreResult,
};

// ============================================================================
// FAULT-INJECTING STORES
// ============================================================================

/// Behaviour a mock store applies to every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fault {
    /// Delegate to the in-memory store.
    #[default]
    None,
    /// Fail every call with `StoreError::Unavailable`.
    Unavailable,
    /// Sleep before delegating.
    Stall(Duration),
}

fn read_fault(fault: &Mutex<Fault>) -> Fault {
    *fault.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write_fault(fault: &Mutex<Fault>, value: Fault) {
    *fault.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = value;
}

async fn apply_fault(fault: Fault, store: StoreKind) -> StoreResult<()> {
    match fault {
        Fault::None => Ok(()),
        Fault::Unavailable => Err(StoreError::unavailable(store, "injected fault")),
        Fault::Stall(delay) => {
            tokio::time::sleep(delay).await;
            Ok(())
        }
    }
}

/// Cache store double: an [`InMemoryCacheStore`] that counts reads and can
/// be made to fail or stall.
#[derive(Debug, Default)]
pub struct MockCacheStore {
    inner: InMemoryCacheStore,
    fault: Mutex<Fault>,
    gets: AtomicUsize,
}

impl MockCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fault(fault: Fault) -> Self {
        let store = Self::default();
        store.set_fault(fault);
        store
    }

    pub fn set_fault(&self, fault: Fault) {
        write_fault(&self.fault, fault);
    }

    /// The backing store, for writing entries the way a worker would.
    pub fn inner(&self) -> &InMemoryCacheStore {
        &self.inner
    }

    pub fn upsert(&self, entry: CacheEntry) -> StoreResult<()> {
        self.inner.upsert(entry)
    }

    /// Number of `get` calls received, including failed ones.
    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CacheStore for MockCacheStore {
    async fn get(&self, id: &ResourceId) -> StoreResult<Option<CacheEntry>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        apply_fault(read_fault(&self.fault), StoreKind::Cache).await?;
        self.inner.get(id).await
    }

    async fn ping(&self) -> StoreResult<()> {
        apply_fault(read_fault(&self.fault), StoreKind::Cache).await?;
        self.inner.ping().await
    }
}

/// Job queue double: an [`InMemoryJobQueue`] that counts calls and can be
/// made to fail or stall.
#[derive(Debug, Default)]
pub struct MockJobQueue {
    inner: InMemoryJobQueue,
    fault: Mutex<Fault>,
    create_fault: Mutex<Fault>,
    exists_calls: AtomicUsize,
    create_calls: AtomicUsize,
    count_calls: AtomicUsize,
}

impl MockJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: InMemoryJobQueue::with_capacity(capacity),
            ..Self::default()
        }
    }

    pub fn with_fault(fault: Fault) -> Self {
        let queue = Self::default();
        queue.set_fault(fault);
        queue
    }

    pub fn set_fault(&self, fault: Fault) {
        write_fault(&self.fault, fault);
    }

    /// Fault applied to `create_if_absent` only, on top of the shared one.
    pub fn set_create_fault(&self, fault: Fault) {
        write_fault(&self.create_fault, fault);
    }

    /// The backing queue, for starting and finishing jobs the way a worker would.
    pub fn inner(&self) -> &InMemoryJobQueue {
        &self.inner
    }

    pub fn exists_count(&self) -> usize {
        self.exists_calls.load(Ordering::SeqCst)
    }

    pub fn create_count(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn pending_count_calls(&self) -> usize {
        self.count_calls.load(Ordering::SeqCst)
    }

    /// Total calls of any kind, excluding pings.
    pub fn call_count(&self) -> usize {
        self.exists_count() + self.create_count() + self.pending_count_calls()
    }
}

#[async_trait]
impl JobQueue for MockJobQueue {
    async fn exists(&self, key: &ResourceKey) -> StoreResult<bool> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        apply_fault(read_fault(&self.fault), StoreKind::Queue).await?;
        self.inner.exists(key).await
    }

    async fn create_if_absent(
        &self,
        key: &ResourceKey,
        priority: Priority,
    ) -> StoreResult<EnqueueResult> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        apply_fault(read_fault(&self.fault), StoreKind::Queue).await?;
        apply_fault(read_fault(&self.create_fault), StoreKind::Queue).await?;
        self.inner.create_if_absent(key, priority).await
    }

    async fn pending_count(&self) -> StoreResult<u64> {
        self.count_calls.fetch_add(1, Ordering::SeqCst);
        apply_fault(read_fault(&self.fault), StoreKind::Queue).await?;
        self.inner.pending_count().await
    }

    async fn ping(&self) -> StoreResult<()> {
        apply_fault(read_fault(&self.fault), StoreKind::Queue).await?;
        self.inner.ping().await
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating request parameters and entries.

    use super::*;
    use proptest::prelude::*;

    /// A canonical dataset name (no namespace).
    pub fn arb_canonical_dataset() -> impl Strategy<Value = String> {
        "[A-Za-z0-9][A-Za-z0-9_-]{0,15}"
    }

    /// A dataset name, with or without a `namespace/` prefix.
    pub fn arb_dataset_name() -> impl Strategy<Value = String> {
        prop_oneof![
            arb_canonical_dataset(),
            (arb_canonical_dataset(), arb_canonical_dataset())
                .prop_map(|(ns, name)| format!("{}/{}", ns, name)),
        ]
    }

    /// A config name, including characters hub configs actually use.
    pub fn arb_config_name() -> impl Strategy<Value = String> {
        "[A-Za-z0-9][A-Za-z0-9_. +-]{0,20}[A-Za-z0-9]"
    }

    pub fn arb_split_name() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("train".to_string()),
            Just("validation".to_string()),
            Just("test".to_string()),
            "[a-z][a-z0-9_]{0,11}",
        ]
    }

    /// A dataset parameter the resolver must refuse.
    pub fn arb_malformed_dataset() -> impl Strategy<Value = String> {
        prop_oneof![
            Just(String::new()),
            Just("   ".to_string()),
            Just("a/b/c".to_string()),
            Just("../etc".to_string()),
            Just("-leading-dash".to_string()),
            arb_canonical_dataset().prop_map(|name| format!(" {}", name)),
            arb_canonical_dataset().prop_map(|name| format!("{}\n", name)),
            arb_canonical_dataset().prop_map(|name| format!("{}$", name)),
            "[a-z]{97,120}",
        ]
    }

    /// A config or split parameter the resolver must refuse.
    pub fn arb_malformed_selector() -> impl Strategy<Value = String> {
        prop_oneof![
            Just(String::new()),
            Just(" ".to_string()),
            Just("with/slash".to_string()),
            Just("back\\slash".to_string()),
            Just("tab\there".to_string()),
            "[a-z]{1,8}".prop_map(|name| format!("{} ", name)),
            "[a-z]{129,140}",
        ]
    }

    /// A semver-like content version.
    pub fn arb_content_version() -> impl Strategy<Value = ContentVersion> {
        (0u64..10, 0u64..10, 0u64..10)
            .prop_map(|(major, minor, patch)| ContentVersion::new(format!("{}.{}.{}", major, minor, patch)))
    }

    pub fn arb_priority() -> impl Strategy<Value = Priority> {
        prop_oneof![Just(Priority::Normal), Just(Priority::Low)]
    }

    /// A stored pipeline error.
    pub fn arb_error_detail() -> impl Strategy<Value = ErrorDetail> {
        (
            prop_oneof![
                Just("DatasetNotFoundError"),
                Just("EmptyDatasetError"),
                Just("SplitsNamesError"),
                Just("TooManyColumnsError"),
            ],
            "[A-Za-z ]{1,40}",
            proptest::option::of(400u16..600),
        )
            .prop_map(|(code, message, status)| {
                let detail = ErrorDetail::new(code, message);
                match status {
                    Some(status) => detail.with_http_status(status),
                    None => detail,
                }
            })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built test fixtures for common testing scenarios.

    use super::*;
    use serde_json::json;

    pub const STEP_SPLITS: &str = "/splits";
    pub const STEP_SPLIT_NAMES: &str = "/split-names-from-streaming";
    pub const STEP_FIRST_ROWS: &str = "/first-rows";

    pub fn dataset_id() -> ResourceId {
        ResourceId::for_dataset(STEP_SPLITS, "squad")
    }

    pub fn config_id() -> ResourceId {
        ResourceId::for_config(STEP_SPLIT_NAMES, "squad", "plain_text")
    }

    pub fn split_id() -> ResourceId {
        ResourceId::for_split(STEP_FIRST_ROWS, "squad", "plain_text", "train")
    }

    /// Key for `id` at the version the built-in graph requires.
    pub fn current_key(id: ResourceId) -> ResourceKey {
        let version = ProcessingGraph::builtin()
            .get(id.step())
            .map(|step| step.version.clone())
            .unwrap_or_else(|| ContentVersion::new(datagate_core::DEFAULT_STEP_VERSION));
        ResourceKey::new(id, version)
    }

    /// A successful entry at the built-in version.
    pub fn success_entry(id: ResourceId) -> CacheEntry {
        let payload = json!({
            "dataset": id.dataset(),
            "config": id.config(),
            "split": id.split(),
            "rows": [],
        });
        CacheEntry::success(id, payload, datagate_core::DEFAULT_STEP_VERSION)
    }

    /// A successful entry written by an incompatible worker version.
    pub fn stale_entry(id: ResourceId) -> CacheEntry {
        CacheEntry::success(id, json!({"stale": true}), "0.1.0")
    }

    /// A stored pipeline failure.
    pub fn error_entry(id: ResourceId) -> CacheEntry {
        let detail = ErrorDetail::new(
            "DatasetNotFoundError",
            "The dataset does not exist on the Hub.",
        )
        .with_http_status(404);
        CacheEntry::error(id, detail, datagate_core::DEFAULT_STEP_VERSION)
    }
}

// ============================================================================
// ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions over gateway outcomes.

    use super::*;

    #[track_caller]
    pub fn assert_hit(outcome: &Outcome) {
        assert!(outcome.is_hit(), "Expected Hit, got: {:?}", outcome);
    }

    #[track_caller]
    pub fn assert_pending(outcome: &Outcome) {
        assert!(outcome.is_pending(), "Expected Pending, got: {:?}", outcome);
    }

    #[track_caller]
    pub fn assert_failure_class(outcome: &Outcome, class: FailureClass) {
        match outcome.failure_class() {
            Some(actual) if actual == class => {}
            _ => panic!("Expected {:?} error, got: {:?}", class, outcome),
        }
    }

    #[track_caller]
    pub fn assert_invalid_request(outcome: &Outcome) {
        match outcome {
            Outcome::InvalidRequest(_) => {}
            other => panic!("Expected InvalidRequest, got: {:?}", other),
        }
    }
}
