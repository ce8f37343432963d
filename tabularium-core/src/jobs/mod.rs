//! Persistent queue of import jobs.
//!
//! Jobs double as the durable progress record: `imported_table_count` and
//! `failed_table_names` survive restarts, and a re-enqueued job resumes after
//! its settled tables instead of starting over.

mod memory;
mod postgres;

pub use memory::MemoryJobStore;
pub use postgres::PostgresJobStore;

use async_trait::async_trait;
use uuid::Uuid;

use tabularium_model::{ImportJob, JobStatus, JobUpdate};

use crate::error::Result;

#[async_trait]
pub trait JobStore: Send + Sync {
    async fn create(&self, job: &ImportJob) -> Result<()>;

    /// Fails with [`crate::error::ImportError::NotFound`] for an unknown id.
    async fn get(&self, id: Uuid) -> Result<ImportJob>;

    /// Jobs for one owner, newest first, optionally filtered by status.
    async fn list_for_owner(
        &self,
        owner_id: &str,
        statuses: Option<&[JobStatus]>,
    ) -> Result<Vec<ImportJob>>;

    /// Merges the supplied fields and refreshes `updated_at`. Last write
    /// wins; there is no optimistic locking on jobs.
    async fn update(&self, id: Uuid, update: JobUpdate) -> Result<ImportJob>;

    /// Re-arms a job for the worker: status back to `Pending`, error and
    /// completion timestamp cleared, progress counters kept so the run
    /// resumes where it stopped. A new config replaces the stored one.
    async fn enqueue(&self, id: Uuid, config: Option<serde_json::Value>) -> Result<ImportJob>;

    /// Claims the next runnable job and flips it to `InProgress`.
    ///
    /// Jobs already `InProgress` are claimed first: with a single worker any
    /// such job was orphaned by a crash and must be resumed before new work
    /// starts. Otherwise the oldest `Pending` job wins.
    async fn claim_next(&self) -> Result<Option<ImportJob>>;
}
