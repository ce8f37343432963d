use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use tabularium_model::{ImportJob, JobStatus, JobUpdate};

use super::JobStore;
use crate::error::{ImportError, Result};

/// In-memory job store for tests and single-process deployments.
#[derive(Clone, Default)]
pub struct MemoryJobStore {
    inner: Arc<RwLock<HashMap<Uuid, ImportJob>>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn apply(job: &mut ImportJob, update: JobUpdate) {
    if let Some(status) = update.status {
        job.status = status;
    }
    if let Some(config) = update.config {
        job.config = config;
    }
    if let Some(count) = update.imported_table_count {
        job.imported_table_count = count;
    }
    if let Some(failed) = update.failed_table_names {
        job.failed_table_names = failed;
    }
    if let Some(message) = update.error_message {
        job.error_message = Some(message);
    }
    if let Some(database_id) = update.database_id {
        job.database_id = Some(database_id);
    }
    if let Some(completed_at) = update.completed_at {
        job.completed_at = Some(completed_at);
    }
    job.updated_at = Utc::now();
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create(&self, job: &ImportJob) -> Result<()> {
        let mut map = self.inner.write().await;
        map.insert(job.id, job.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<ImportJob> {
        let map = self.inner.read().await;
        map.get(&id)
            .cloned()
            .ok_or_else(|| ImportError::NotFound(format!("import job {id}")))
    }

    async fn list_for_owner(
        &self,
        owner_id: &str,
        statuses: Option<&[JobStatus]>,
    ) -> Result<Vec<ImportJob>> {
        let map = self.inner.read().await;
        let mut jobs: Vec<ImportJob> = map
            .values()
            .filter(|job| job.owner_id == owner_id)
            .filter(|job| statuses.is_none_or(|wanted| wanted.contains(&job.status)))
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(jobs)
    }

    async fn update(&self, id: Uuid, update: JobUpdate) -> Result<ImportJob> {
        let mut map = self.inner.write().await;
        let job = map
            .get_mut(&id)
            .ok_or_else(|| ImportError::NotFound(format!("import job {id}")))?;
        apply(job, update);
        Ok(job.clone())
    }

    async fn enqueue(&self, id: Uuid, config: Option<serde_json::Value>) -> Result<ImportJob> {
        let mut map = self.inner.write().await;
        let job = map
            .get_mut(&id)
            .ok_or_else(|| ImportError::NotFound(format!("import job {id}")))?;
        job.status = JobStatus::Pending;
        job.error_message = None;
        job.completed_at = None;
        if let Some(config) = config {
            job.config = config;
        }
        job.updated_at = Utc::now();
        Ok(job.clone())
    }

    async fn claim_next(&self) -> Result<Option<ImportJob>> {
        let mut map = self.inner.write().await;

        let orphaned = map
            .values()
            .filter(|job| job.status == JobStatus::InProgress)
            .min_by_key(|job| job.updated_at)
            .map(|job| job.id);
        let next = orphaned.or_else(|| {
            map.values()
                .filter(|job| job.status == JobStatus::Pending)
                .min_by_key(|job| job.created_at)
                .map(|job| job.id)
        });

        let Some(id) = next else {
            return Ok(None);
        };
        let job = map.get_mut(&id).ok_or_else(|| {
            ImportError::Internal("claimed job vanished from the store".to_string())
        })?;
        job.status = JobStatus::InProgress;
        job.updated_at = Utc::now();
        Ok(Some(job.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job_for(owner: &str) -> ImportJob {
        ImportJob::new(owner, serde_json::json!({"vendor": "postgres"}), 3)
    }

    #[tokio::test]
    async fn create_and_get() {
        let store = MemoryJobStore::new();
        let job = job_for("user-1");
        store.create(&job).await.unwrap();

        let fetched = store.get(job.id).await.unwrap();
        assert_eq!(fetched.owner_id, "user-1");
        assert_eq!(fetched.status, JobStatus::Pending);

        let err = store.get(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, ImportError::NotFound(_)));
    }

    #[tokio::test]
    async fn list_filters_by_status() {
        let store = MemoryJobStore::new();
        let a = job_for("user-1");
        let b = job_for("user-1");
        let other = job_for("user-2");
        for job in [&a, &b, &other] {
            store.create(job).await.unwrap();
        }
        store
            .update(b.id, JobUpdate::status(JobStatus::Completed))
            .await
            .unwrap();

        let all = store.list_for_owner("user-1", None).await.unwrap();
        assert_eq!(all.len(), 2);

        let completed = store
            .list_for_owner("user-1", Some(&[JobStatus::Completed]))
            .await
            .unwrap();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].id, b.id);
    }

    #[tokio::test]
    async fn update_merges_only_supplied_fields() {
        let store = MemoryJobStore::new();
        let job = job_for("user-1");
        store.create(&job).await.unwrap();

        let updated = store
            .update(
                job.id,
                JobUpdate {
                    imported_table_count: Some(2),
                    ..JobUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.imported_table_count, 2);
        assert_eq!(updated.status, JobStatus::Pending);
        assert!(updated.updated_at >= job.updated_at);
    }

    #[tokio::test]
    async fn enqueue_rearms_but_keeps_progress() {
        let store = MemoryJobStore::new();
        let job = job_for("user-1");
        store.create(&job).await.unwrap();
        store
            .update(
                job.id,
                JobUpdate {
                    status: Some(JobStatus::Failed),
                    imported_table_count: Some(2),
                    failed_table_names: Some(vec!["orders".to_string()]),
                    error_message: Some("boom".to_string()),
                    completed_at: Some(Utc::now()),
                    ..JobUpdate::default()
                },
            )
            .await
            .unwrap();

        let rearmed = store.enqueue(job.id, None).await.unwrap();
        assert_eq!(rearmed.status, JobStatus::Pending);
        assert!(rearmed.error_message.is_none());
        assert!(rearmed.completed_at.is_none());
        assert_eq!(rearmed.imported_table_count, 2);
        assert_eq!(rearmed.failed_table_names, vec!["orders".to_string()]);

        // A stale InProgress job can be re-armed the same way.
        store
            .update(job.id, JobUpdate::status(JobStatus::InProgress))
            .await
            .unwrap();
        let rearmed = store.enqueue(job.id, None).await.unwrap();
        assert_eq!(rearmed.status, JobStatus::Pending);
    }

    #[tokio::test]
    async fn claim_prefers_orphaned_in_progress_jobs() {
        let store = MemoryJobStore::new();
        let pending = job_for("user-1");
        let orphaned = job_for("user-1");
        store.create(&pending).await.unwrap();
        store.create(&orphaned).await.unwrap();
        store
            .update(orphaned.id, JobUpdate::status(JobStatus::InProgress))
            .await
            .unwrap();

        let first = store.claim_next().await.unwrap().unwrap();
        assert_eq!(first.id, orphaned.id);
        assert_eq!(first.status, JobStatus::InProgress);

        let second = store.claim_next().await.unwrap().unwrap();
        assert_eq!(second.id, first.id, "unfinished claim stays first in line");
    }

    #[tokio::test]
    async fn claim_skips_terminal_and_cancelled_jobs() {
        let store = MemoryJobStore::new();
        let done = job_for("user-1");
        let cancelled = job_for("user-1");
        store.create(&done).await.unwrap();
        store.create(&cancelled).await.unwrap();
        store
            .update(done.id, JobUpdate::status(JobStatus::Completed))
            .await
            .unwrap();
        store
            .update(cancelled.id, JobUpdate::status(JobStatus::Cancelled))
            .await
            .unwrap();

        assert!(store.claim_next().await.unwrap().is_none());
    }
}
