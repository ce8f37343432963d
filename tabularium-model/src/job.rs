//! Import job records and lifecycle.
//!
//! A job is one request to import a selected set of tables from a source
//! connection into the catalog. The worker owns a job exclusively while it
//! is `InProgress`; the API only re-arms jobs through `enqueue`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of an import job.
///
/// Transitions: `Pending -> InProgress -> {Completed, Failed, Cancelled}`.
/// `Cancelled` is reachable only from `Pending` or `InProgress`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::InProgress => "in_progress",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    /// Completed, failed, and cancelled jobs never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    /// Whether an explicit cancellation is a legal transition from here.
    pub fn can_cancel(&self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::InProgress)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown job status: {0}")]
pub struct ParseStatusError(pub String);

impl std::str::FromStr for JobStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "in_progress" => Ok(JobStatus::InProgress),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            "cancelled" => Ok(JobStatus::Cancelled),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

/// A persisted import job.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImportJob {
    pub id: Uuid,
    pub owner_id: String,
    pub status: JobStatus,
    /// Opaque connection parameters plus the selected table list. Only the
    /// worker interprets this; the job store treats it as a blob.
    pub config: serde_json::Value,
    pub total_table_count: i32,
    pub imported_table_count: i32,
    /// Tables that failed, in the order they failed.
    pub failed_table_names: Vec<String>,
    pub error_message: Option<String>,
    /// Catalog database row created by this job, once registration succeeds.
    pub database_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ImportJob {
    pub fn new(
        owner_id: impl Into<String>,
        config: serde_json::Value,
        total_table_count: i32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id: owner_id.into(),
            status: JobStatus::Pending,
            config,
            total_table_count,
            imported_table_count: 0,
            failed_table_names: Vec::new(),
            error_message: None,
            database_id: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Tables already accounted for, imported or failed. A resumed job
    /// continues from this index into the caller-supplied table order.
    pub fn settled_table_count(&self) -> usize {
        self.imported_table_count as usize + self.failed_table_names.len()
    }

    /// `imported + failed <= total` must hold at all times.
    pub fn counters_consistent(&self) -> bool {
        self.settled_table_count() <= self.total_table_count as usize
    }
}

/// Partial update for a job. Only supplied fields are merged; the store
/// always refreshes `updated_at`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct JobUpdate {
    pub status: Option<JobStatus>,
    pub config: Option<serde_json::Value>,
    pub imported_table_count: Option<i32>,
    pub failed_table_names: Option<Vec<String>>,
    pub error_message: Option<String>,
    pub database_id: Option<Uuid>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl JobUpdate {
    pub fn status(status: JobStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.config.is_none()
            && self.imported_table_count.is_none()
            && self.failed_table_names.is_none()
            && self.error_message.is_none()
            && self.database_id.is_none()
            && self.completed_at.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            JobStatus::Pending,
            JobStatus::InProgress,
            JobStatus::Completed,
            JobStatus::Failed,
            JobStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<JobStatus>().unwrap(), status);
        }
        assert!("unknown".parse::<JobStatus>().is_err());
    }

    #[test]
    fn cancellation_only_from_active_states() {
        assert!(JobStatus::Pending.can_cancel());
        assert!(JobStatus::InProgress.can_cancel());
        assert!(!JobStatus::Completed.can_cancel());
        assert!(!JobStatus::Failed.can_cancel());
        assert!(!JobStatus::Cancelled.can_cancel());
    }

    #[test]
    fn new_job_starts_pending_with_consistent_counters() {
        let job = ImportJob::new("user-1", serde_json::json!({}), 4);
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.imported_table_count, 0);
        assert!(job.failed_table_names.is_empty());
        assert!(job.counters_consistent());
        assert!(job.completed_at.is_none());
    }

    #[test]
    fn settled_count_drives_resume_offset() {
        let mut job = ImportJob::new("user-1", serde_json::json!({}), 5);
        job.imported_table_count = 2;
        job.failed_table_names = vec!["orders".to_string()];
        assert_eq!(job.settled_table_count(), 3);
        assert!(job.counters_consistent());
    }
}
