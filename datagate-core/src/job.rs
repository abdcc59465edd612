//! Job records and the results of asking the queue to hold one.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ResourceKey, Timestamp};

/// Job priority. Normal jobs are picked before low ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Normal,
    Low,
}

/// Lifecycle state of a live job. Finished jobs leave the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Queued,
    Started,
}

/// A pending computation owned by the job queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: Uuid,
    pub key: ResourceKey,
    pub unicity_id: String,
    pub namespace: String,
    pub priority: Priority,
    pub state: JobState,
    pub enqueued_at: Timestamp,
    pub started_at: Option<Timestamp>,
}

impl JobRecord {
    /// A fresh record in the queued state.
    pub fn queued(key: ResourceKey, priority: Priority) -> Self {
        Self {
            job_id: Uuid::now_v7(),
            unicity_id: key.unicity_id(),
            namespace: key.id().namespace().to_string(),
            key,
            priority,
            state: JobState::Queued,
            enqueued_at: Utc::now(),
            started_at: None,
        }
    }

    pub fn start(&mut self) {
        self.state = JobState::Started;
        self.started_at = Some(Utc::now());
    }
}

/// Result of the queue's atomic create-if-absent primitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnqueueResult {
    Created(JobRecord),
    AlreadyExisted(JobRecord),
    /// The queue holds as many live jobs as it accepts.
    Rejected { capacity: usize },
}

/// The admission controller's answer for a cache miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Admission {
    AlreadyQueued,
    NewlyQueued,
    Rejected,
}

impl Admission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Admission::AlreadyQueued => "already_queued",
            Admission::NewlyQueued => "newly_queued",
            Admission::Rejected => "rejected",
        }
    }
}

impl From<&EnqueueResult> for Admission {
    fn from(result: &EnqueueResult) -> Self {
        match result {
            EnqueueResult::Created(_) => Admission::NewlyQueued,
            EnqueueResult::AlreadyExisted(_) => Admission::AlreadyQueued,
            EnqueueResult::Rejected { .. } => Admission::Rejected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ContentVersion, ResourceId};

    fn key() -> ResourceKey {
        ResourceKey::new(
            ResourceId::for_config("/split-names-from-streaming", "user/ds", "default"),
            ContentVersion::new("1.0.0"),
        )
    }

    #[test]
    fn test_queued_record() {
        let record = JobRecord::queued(key(), Priority::default());
        assert_eq!(record.state, JobState::Queued);
        assert_eq!(record.priority, Priority::Normal);
        assert_eq!(record.namespace, "user");
        assert_eq!(
            record.unicity_id,
            "Job[/split-names-from-streaming][user/ds][default][None]"
        );
        assert!(record.started_at.is_none());
    }

    #[test]
    fn test_start() {
        let mut record = JobRecord::queued(key(), Priority::Low);
        record.start();
        assert_eq!(record.state, JobState::Started);
        assert!(record.started_at.is_some());
    }

    #[test]
    fn test_admission_from_enqueue_result() {
        let record = JobRecord::queued(key(), Priority::Normal);
        assert_eq!(
            Admission::from(&EnqueueResult::Created(record.clone())),
            Admission::NewlyQueued
        );
        assert_eq!(
            Admission::from(&EnqueueResult::AlreadyExisted(record)),
            Admission::AlreadyQueued
        );
        assert_eq!(
            Admission::from(&EnqueueResult::Rejected { capacity: 3 }),
            Admission::Rejected
        );
    }
}
