//! Per-request outcomes produced by the gateway. Never persisted.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{Admission, ContentVersion, ErrorDetail, ResolveError, StoreError, Timestamp};

/// Classification of a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureClass {
    /// Sticky failure recorded by the computation pipeline.
    Upstream,
    /// Cache store or job queue unreachable or too slow.
    TransientInfra,
    /// The job queue is full.
    CapacityRejected,
}

impl FailureClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureClass::Upstream => "upstream",
            FailureClass::TransientInfra => "transient_infra",
            FailureClass::CapacityRejected => "capacity_rejected",
        }
    }
}

/// A classified failure, ready to be rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    pub class: FailureClass,
    pub code: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
    /// Status recorded alongside an upstream failure.
    pub http_status: Option<u16>,
    pub retry_after: Option<Duration>,
}

impl Failure {
    /// Propagate a stored pipeline failure verbatim.
    pub fn upstream(detail: &ErrorDetail) -> Self {
        Self {
            class: FailureClass::Upstream,
            code: detail.code.clone(),
            message: detail.message.clone(),
            details: detail.details.clone(),
            http_status: detail.http_status,
            retry_after: None,
        }
    }

    pub fn transient(err: &StoreError, retry_after: Duration) -> Self {
        let code = if err.is_timeout() {
            "StoreTimeout"
        } else {
            "StoreUnavailable"
        };
        Self {
            class: FailureClass::TransientInfra,
            code: code.to_string(),
            message: err.to_string(),
            details: None,
            http_status: None,
            retry_after: Some(retry_after),
        }
    }

    pub fn capacity_rejected(retry_after: Duration) -> Self {
        Self {
            class: FailureClass::CapacityRejected,
            code: "CapacityRejected".to_string(),
            message: "The job queue is at capacity and cannot accept new work. Please retry later."
                .to_string(),
            details: None,
            http_status: None,
            retry_after: Some(retry_after),
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.class == FailureClass::TransientInfra && self.code == "StoreTimeout"
    }
}

/// A cache hit, as served.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedPayload {
    pub step: String,
    pub payload: serde_json::Value,
    pub version: Option<ContentVersion>,
    pub written_at: Timestamp,
}

/// Coarse outcome kind, used for metrics and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeKind {
    Hit,
    Error,
    Pending,
    InvalidRequest,
}

impl OutcomeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeKind::Hit => "hit",
            OutcomeKind::Error => "error",
            OutcomeKind::Pending => "pending",
            OutcomeKind::InvalidRequest => "invalid_request",
        }
    }
}

/// What the gateway decided for one request.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Hit(CachedPayload),
    Error(Failure),
    /// No valid result yet; computation is queued (or already was).
    Pending {
        retry_after: Duration,
        admission: Admission,
    },
    InvalidRequest(ResolveError),
}

impl Outcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Outcome::Hit(_) => OutcomeKind::Hit,
            Outcome::Error(_) => OutcomeKind::Error,
            Outcome::Pending { .. } => OutcomeKind::Pending,
            Outcome::InvalidRequest(_) => OutcomeKind::InvalidRequest,
        }
    }

    pub fn is_hit(&self) -> bool {
        matches!(self, Outcome::Hit(_))
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Outcome::Pending { .. })
    }

    /// The failure class, for `Error` outcomes.
    pub fn failure_class(&self) -> Option<FailureClass> {
        match self {
            Outcome::Error(failure) => Some(failure.class),
            _ => None,
        }
    }

    /// Retry hint carried by pending and retryable error outcomes.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Outcome::Pending { retry_after, .. } => Some(*retry_after),
            Outcome::Error(failure) => failure.retry_after,
            Outcome::Hit(_) | Outcome::InvalidRequest(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StoreKind;

    #[test]
    fn test_upstream_failure_is_verbatim() {
        let detail = ErrorDetail::new("EmptyDatasetError", "The dataset is empty.")
            .with_details(serde_json::json!({"cause": "no files"}))
            .with_http_status(501);
        let failure = Failure::upstream(&detail);
        assert_eq!(failure.class, FailureClass::Upstream);
        assert_eq!(failure.code, "EmptyDatasetError");
        assert_eq!(failure.message, "The dataset is empty.");
        assert_eq!(failure.details, detail.details);
        assert_eq!(failure.http_status, Some(501));
        assert!(failure.retry_after.is_none());
    }

    #[test]
    fn test_transient_failure_codes() {
        let timeout = StoreError::timeout(StoreKind::Cache, "get", Duration::from_secs(2));
        let failure = Failure::transient(&timeout, Duration::from_secs(5));
        assert_eq!(failure.code, "StoreTimeout");
        assert!(failure.is_timeout());

        let down = StoreError::unavailable(StoreKind::Queue, "refused");
        let failure = Failure::transient(&down, Duration::from_secs(5));
        assert_eq!(failure.code, "StoreUnavailable");
        assert!(!failure.is_timeout());
        assert_eq!(failure.retry_after, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_outcome_accessors() {
        let pending = Outcome::Pending {
            retry_after: Duration::from_secs(10),
            admission: Admission::NewlyQueued,
        };
        assert_eq!(pending.kind(), OutcomeKind::Pending);
        assert!(pending.is_pending());
        assert_eq!(pending.retry_after(), Some(Duration::from_secs(10)));
        assert!(pending.failure_class().is_none());

        let rejected = Outcome::Error(Failure::capacity_rejected(Duration::from_secs(60)));
        assert_eq!(rejected.kind(), OutcomeKind::Error);
        assert_eq!(
            rejected.failure_class(),
            Some(FailureClass::CapacityRejected)
        );
        assert_eq!(rejected.retry_after(), Some(Duration::from_secs(60)));

        let invalid = Outcome::InvalidRequest(ResolveError::missing("dataset"));
        assert_eq!(invalid.kind().as_str(), "invalid_request");
        assert!(invalid.retry_after().is_none());
    }
}
