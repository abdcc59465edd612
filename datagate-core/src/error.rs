//! Error types for datagate operations

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Which external collaborator a store error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKind {
    Cache,
    Queue,
}

impl StoreKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKind::Cache => "cache",
            StoreKind::Queue => "queue",
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreKind::Cache => write!(f, "cache store"),
            StoreKind::Queue => write!(f, "job queue"),
        }
    }
}

/// Errors raised while talking to the cache store or the job queue.
///
/// Every variant is transient from the caller's point of view: the request
/// may succeed if retried later.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("{store} unavailable: {reason}")]
    Unavailable { store: StoreKind, reason: String },

    #[error("{operation} on {store} timed out after {elapsed:?}")]
    Timeout {
        store: StoreKind,
        operation: String,
        elapsed: Duration,
    },

    #[error("{store} lock poisoned")]
    LockPoisoned { store: StoreKind },
}

impl StoreError {
    pub fn unavailable(store: StoreKind, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            store,
            reason: reason.into(),
        }
    }

    pub fn timeout(store: StoreKind, operation: impl Into<String>, elapsed: Duration) -> Self {
        Self::Timeout {
            store,
            operation: operation.into(),
            elapsed,
        }
    }

    /// The store that produced this error.
    pub fn store(&self) -> StoreKind {
        match self {
            StoreError::Unavailable { store, .. }
            | StoreError::Timeout { store, .. }
            | StoreError::LockPoisoned { store } => *store,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, StoreError::Timeout { .. })
    }
}

/// Request parameter resolution errors. Always terminal for the request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Unknown endpoint: {endpoint}")]
    UnknownEndpoint { endpoint: String },

    #[error("Unknown processing step: {step}")]
    UnknownStep { step: String },

    #[error("Required parameter missing: {field}")]
    MissingField { field: String },

    #[error("Malformed parameter {field}: {reason}")]
    MalformedField { field: String, reason: String },
}

impl ResolveError {
    pub fn missing(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    pub fn malformed(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedField {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Stable machine-readable code, surfaced as `X-Error-Code`.
    pub fn code(&self) -> &'static str {
        match self {
            ResolveError::UnknownEndpoint { .. } => "UnknownEndpoint",
            ResolveError::UnknownStep { .. } => "UnknownStep",
            ResolveError::MissingField { .. } => "MissingField",
            ResolveError::MalformedField { .. } => "MalformedField",
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all datagate errors.
#[derive(Debug, Clone, Error)]
pub enum DatagateError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Resolve error: {0}")]
    Resolve(#[from] ResolveError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for datagate operations.
pub type DatagateResult<T> = Result<T, DatagateError>;

/// Result type alias for store round-trips.
pub type StoreResult<T> = Result<T, StoreError>;
