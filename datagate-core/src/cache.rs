//! Cached results, as written by the worker pipeline.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{ContentVersion, ResourceId, Timestamp};

/// A failure recorded by the worker pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable kind, e.g. `EmptyDatasetError`.
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// HTTP status the pipeline attached to the failure, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
}

impl ErrorDetail {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            http_status: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_http_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }
}

/// Whether the cached computation succeeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CacheStatus {
    Success,
    Error(ErrorDetail),
}

/// One cached result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub id: ResourceId,
    pub status: CacheStatus,
    pub payload: serde_json::Value,
    /// Version of the worker that produced the entry.
    pub version: Option<ContentVersion>,
    pub dataset_git_revision: Option<String>,
    pub written_at: Timestamp,
}

impl CacheEntry {
    pub fn success(
        id: ResourceId,
        payload: serde_json::Value,
        version: impl Into<ContentVersion>,
    ) -> Self {
        Self {
            id,
            status: CacheStatus::Success,
            payload,
            version: Some(version.into()),
            dataset_git_revision: None,
            written_at: Utc::now(),
        }
    }

    pub fn error(id: ResourceId, detail: ErrorDetail, version: impl Into<ContentVersion>) -> Self {
        Self {
            id,
            status: CacheStatus::Error(detail),
            payload: serde_json::Value::Null,
            version: Some(version.into()),
            dataset_git_revision: None,
            written_at: Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, CacheStatus::Success)
    }

    /// True when the entry was produced by an incompatible (or unknown) version.
    pub fn is_stale_for(&self, required: &ContentVersion) -> bool {
        match &self.version {
            Some(version) => !version.matches(required),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn id() -> ResourceId {
        ResourceId::for_dataset("/splits", "squad")
    }

    #[test]
    fn test_staleness_follows_major_version() {
        let entry = CacheEntry::success(id(), json!({"splits": []}), "1.2.0");
        assert!(!entry.is_stale_for(&ContentVersion::new("1.0.0")));
        assert!(entry.is_stale_for(&ContentVersion::new("2.0.0")));
    }

    #[test]
    fn test_missing_version_is_stale() {
        let mut entry = CacheEntry::success(id(), json!({}), "1.0.0");
        entry.version = None;
        assert!(entry.is_stale_for(&ContentVersion::new("1.0.0")));
    }

    #[test]
    fn test_error_entry() {
        let detail = ErrorDetail::new("EmptyDatasetError", "The dataset is empty.")
            .with_http_status(500);
        let mut entry = CacheEntry::error(id(), detail.clone(), "1.0.0");
        entry.dataset_git_revision = Some("abc123".to_string());
        assert!(!entry.is_success());
        assert_eq!(entry.status, CacheStatus::Error(detail));
        assert_eq!(entry.dataset_git_revision.as_deref(), Some("abc123"));
    }

    #[test]
    fn test_status_serialization() -> Result<(), serde_json::Error> {
        let detail = ErrorDetail::new("SplitNamesFromStreamingError", "Cannot get the split names");
        let value = serde_json::to_value(CacheStatus::Error(detail))?;
        assert_eq!(value["status"], "error");
        assert_eq!(value["code"], "SplitNamesFromStreamingError");
        assert!(value.get("details").is_none());
        Ok(())
    }
}
