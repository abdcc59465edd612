//! datagate Core - Data Types
//!
//! Pure data structures shared by every datagate crate: resource keys,
//! cache entries, job records, per-request outcomes and the error taxonomy.
//! This crate performs no I/O.

use chrono::{DateTime, Utc};

pub mod cache;
pub mod error;
pub mod health;
pub mod job;
pub mod outcome;
pub mod resource;
pub mod step;
pub mod version;

pub use cache::{CacheEntry, CacheStatus, ErrorDetail};
pub use error::{
    ConfigError, DatagateError, DatagateResult, ResolveError, StoreError, StoreKind, StoreResult,
};
pub use health::{HealthCheck, HealthStatus};
pub use job::{Admission, EnqueueResult, JobRecord, JobState, Priority};
pub use outcome::{CachedPayload, Failure, FailureClass, Outcome, OutcomeKind};
pub use resource::{ResourceId, ResourceKey};
pub use step::{InputType, ProcessingGraph, ProcessingStep, DEFAULT_STEP_VERSION};
pub use version::ContentVersion;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;
