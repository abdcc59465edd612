//! Constants for the datagate API
//!
//! Defaults for every value [`crate::config::GatewayConfig`] reads from the
//! environment, plus the wire-level names shared by the response mapping.

// ============================================================================
// ENVIRONMENT
// ============================================================================

/// Prefix of every configuration variable.
pub const ENV_PREFIX: &str = "DATAGATE_";

// ============================================================================
// TIMEOUTS
// ============================================================================

/// Bound on any single cache store or job queue call, in milliseconds.
pub const DEFAULT_CALL_TIMEOUT_MS: u64 = 2000;

// ============================================================================
// QUEUE
// ============================================================================

/// Live job bound for the in-memory queue; zero means unbounded.
pub const DEFAULT_QUEUE_CAPACITY: usize = 0;

/// Call timeouts a detached enqueue may run before it is abandoned.
pub const ENQUEUE_COMPLETION_FACTOR: u32 = 10;

// ============================================================================
// RETRY HINTS
// ============================================================================

/// Retry-After for pending responses, in seconds.
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 10;

/// Upper bound for the queue-depth retry policy, in seconds.
pub const DEFAULT_RETRY_AFTER_MAX_SECS: u64 = 300;

/// Retry-After for capacity rejections, in seconds.
pub const DEFAULT_CAPACITY_RETRY_AFTER_SECS: u64 = 60;

/// Retry-After for transient store failures, in seconds.
pub const DEFAULT_TRANSIENT_RETRY_AFTER_SECS: u64 = 5;

// ============================================================================
// RESPONSE MAPPING
// ============================================================================

/// Status for "not ready yet" responses.
pub const DEFAULT_PENDING_STATUS: u16 = 500;

/// Status for capacity rejections.
pub const DEFAULT_CAPACITY_STATUS: u16 = 429;

/// Status for malformed or incomplete requests.
pub const DEFAULT_INVALID_REQUEST_STATUS: u16 = 422;

/// Cache-Control max-age for served results, in seconds.
pub const DEFAULT_MAX_AGE_LONG_SECS: u64 = 120;

/// Cache-Control max-age for errors and pending responses, in seconds.
pub const DEFAULT_MAX_AGE_SHORT_SECS: u64 = 10;

/// Header carrying the machine-readable error code.
pub const ERROR_CODE_HEADER: &str = "X-Error-Code";

/// Metric label for requests naming no configured endpoint.
pub const UNKNOWN_ENDPOINT_LABEL: &str = "unknown";

// ============================================================================
// RESOURCE NAMES
// ============================================================================

/// Longest accepted dataset name, namespace included.
pub const MAX_DATASET_NAME_LEN: usize = 96;

/// Longest accepted config or split name.
pub const MAX_SELECTOR_LEN: usize = 128;
