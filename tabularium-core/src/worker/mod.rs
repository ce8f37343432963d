//! The import worker: a single polling loop that claims jobs and drives
//! imports end to end.
//!
//! A claimed job runs one table at a time: read the schema, ask the
//! enrichment collaborator for descriptions, count rows, then commit the
//! table and its fields atomically. Progress counters are persisted after
//! every table, so a crash or shutdown loses at most the in-flight table.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use tabularium_model::{
    DatabaseRecord, FieldRecord, ImportJob, JobStatus, JobUpdate, SourceConfig, TableRecord,
};

use crate::catalog::CatalogStore;
use crate::connector::{Connector, ConnectorFactory};
use crate::enrichment::{EnrichmentService, fallback_description};
use crate::error::Result;
use crate::jobs::JobStore;

#[derive(Clone, Copy, Debug)]
pub struct WorkerConfig {
    /// Delay between queue polls when no job is runnable.
    pub poll_interval: Duration,
    /// Delay after a queue poll fails.
    pub error_backoff: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            error_backoff: Duration::from_secs(5),
        }
    }
}

pub struct ImportWorker {
    jobs: Arc<dyn JobStore>,
    catalog: Arc<dyn CatalogStore>,
    enrichment: Arc<dyn EnrichmentService>,
    connectors: Arc<dyn ConnectorFactory>,
    config: WorkerConfig,
    shutdown: CancellationToken,
}

/// Why a job's table loop stopped early.
enum Interrupt {
    /// The job was cancelled through the API.
    JobCancelled,
    /// The process is shutting down. The in-flight table was allowed to
    /// finish; remaining tables were not started.
    Shutdown,
}

impl ImportWorker {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        catalog: Arc<dyn CatalogStore>,
        enrichment: Arc<dyn EnrichmentService>,
        connectors: Arc<dyn ConnectorFactory>,
        config: WorkerConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            jobs,
            catalog,
            enrichment,
            connectors,
            config,
            shutdown,
        }
    }

    /// Polls the queue until the shutdown token fires.
    pub async fn run(self) {
        info!(poll_interval = ?self.config.poll_interval, "import worker started");
        loop {
            if self.shutdown.is_cancelled() {
                break;
            }
            match self.jobs.claim_next().await {
                Ok(Some(job)) => {
                    let job_id = job.id;
                    if let Err(err) = self.process_job(job).await {
                        error!(%job_id, error = %err, "job processing aborted");
                    }
                }
                Ok(None) => {
                    if self.sleep(self.config.poll_interval).await {
                        break;
                    }
                }
                Err(err) => {
                    error!(error = %err, "failed to poll job queue");
                    if self.sleep(self.config.error_backoff).await {
                        break;
                    }
                }
            }
        }
        info!("import worker stopped");
    }

    /// Returns true when the shutdown token fired during the sleep.
    async fn sleep(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = self.shutdown.cancelled() => true,
            _ = tokio::time::sleep(duration) => false,
        }
    }

    /// Runs one claimed job to a terminal state.
    pub async fn process_job(&self, job: ImportJob) -> Result<()> {
        info!(job_id = %job.id, owner = %job.owner_id, "processing import job");

        let config: SourceConfig = match serde_json::from_value(job.config.clone()) {
            Ok(config) => config,
            Err(err) => {
                warn!(job_id = %job.id, error = %err, "job config is not a valid source config");
                self.mark_failed(job.id, format!("invalid source config: {err}"))
                    .await?;
                return Ok(());
            }
        };

        let database_id = match job.database_id {
            Some(id) => id,
            None => {
                // Probe the source before anything becomes durable; a bad
                // connection fails the whole job here, not table by table.
                match self.connectors.connect(&config).await {
                    Ok(probe) => probe.disconnect().await,
                    Err(err) => {
                        self.mark_failed(job.id, format!("Failed to create database: {err}"))
                            .await?;
                        return Ok(());
                    }
                }
                let database = DatabaseRecord::from_source(&config);
                if let Err(err) = self.catalog.register_database(&database).await {
                    self.mark_failed(job.id, format!("Failed to create database: {err}"))
                        .await?;
                    return Ok(());
                }
                self.jobs
                    .update(
                        job.id,
                        JobUpdate {
                            database_id: Some(database.id),
                            ..JobUpdate::default()
                        },
                    )
                    .await?;
                info!(job_id = %job.id, database_id = %database.id, "registered source database");
                database.id
            }
        };

        let total = job.total_table_count.max(0) as usize;
        let mut imported = job.imported_table_count;
        let mut failed = job.failed_table_names.clone();
        let offset = job.settled_table_count();
        if offset > 0 {
            info!(job_id = %job.id, offset, "resuming job after settled tables");
        }

        let mut interrupt = None;
        for table in config.selected_tables.iter().take(total).skip(offset) {
            if self.shutdown.is_cancelled() {
                interrupt = Some(Interrupt::Shutdown);
                break;
            }
            if self.jobs.get(job.id).await?.status == JobStatus::Cancelled {
                interrupt = Some(Interrupt::JobCancelled);
                break;
            }

            match self
                .import_one_table(job.id, database_id, &config, table)
                .await
            {
                Ok(true) => imported += 1,
                Ok(false) => {
                    // Cancelled between enrichment and commit; nothing was
                    // written for this table.
                    interrupt = Some(Interrupt::JobCancelled);
                    break;
                }
                Err(err) => {
                    warn!(job_id = %job.id, table, error = %err, "table import failed");
                    failed.push(table.clone());
                }
            }

            if imported as usize + failed.len() > total {
                warn!(
                    job_id = %job.id,
                    imported,
                    failed = failed.len(),
                    total,
                    "progress counters exceed the job's table count"
                );
            }
            self.jobs
                .update(
                    job.id,
                    JobUpdate {
                        imported_table_count: Some(imported),
                        failed_table_names: Some(failed.clone()),
                        ..JobUpdate::default()
                    },
                )
                .await?;
        }

        match interrupt {
            Some(reason) => {
                self.finish_interrupted(job.id, reason, imported, total)
                    .await
            }
            None => {
                self.finish_settled(job.id, database_id, imported, failed)
                    .await
            }
        }
    }

    /// Imports one table end to end over its own short-lived source
    /// connection. Returns `Ok(false)` when the job was cancelled after the
    /// source reads but before the catalog commit.
    async fn import_one_table(
        &self,
        job_id: Uuid,
        database_id: Uuid,
        config: &SourceConfig,
        table: &str,
    ) -> Result<bool> {
        let connector = self.connectors.connect(config).await?;
        let result = self
            .snapshot_table(job_id, database_id, connector.as_ref(), table)
            .await;
        connector.disconnect().await;
        result
    }

    async fn snapshot_table(
        &self,
        job_id: Uuid,
        database_id: Uuid,
        connector: &dyn Connector,
        table: &str,
    ) -> Result<bool> {
        let columns = connector.read_schema(table).await?;

        // Enrichment is best effort: an unreachable collaborator degrades to
        // the raw schema plus a canned table description.
        let (columns, table_description) =
            match self.enrichment.describe(table, &columns).await {
                Ok(response) => {
                    let described = if response.fields.is_empty() {
                        columns
                    } else {
                        response.fields
                    };
                    let description = response
                        .table_description
                        .unwrap_or_else(|| fallback_description(table));
                    (described, description)
                }
                Err(err) => {
                    warn!(job_id = %job_id, table, error = %err, "enrichment unavailable, using fallback");
                    (columns, fallback_description(table))
                }
            };

        let record_count = connector.count_rows(table).await;

        // Last cancellation point before this table becomes durable.
        if self.jobs.get(job_id).await?.status == JobStatus::Cancelled {
            return Ok(false);
        }

        let mut record = TableRecord::new(database_id, table);
        record.description = Some(table_description);
        record.record_count = record_count.min(i64::MAX as u64) as i64;

        let fields: Vec<FieldRecord> = columns
            .iter()
            .map(|column| FieldRecord::from_column(record.id, column))
            .collect();

        self.catalog.insert_table_snapshot(&record, &fields).await?;
        info!(job_id = %job_id, table, fields = fields.len(), record_count, "table imported");
        Ok(true)
    }

    async fn finish_interrupted(
        &self,
        job_id: Uuid,
        reason: Interrupt,
        imported: i32,
        total: usize,
    ) -> Result<()> {
        let message = format!("import cancelled: {imported} of {total} tables imported");
        match reason {
            Interrupt::JobCancelled => info!(job_id = %job_id, %message, "job cancelled via API"),
            Interrupt::Shutdown => info!(job_id = %job_id, %message, "job stopped by shutdown"),
        }
        self.jobs
            .update(
                job_id,
                JobUpdate {
                    status: Some(JobStatus::Cancelled),
                    error_message: Some(message),
                    completed_at: Some(Utc::now()),
                    ..JobUpdate::default()
                },
            )
            .await?;
        Ok(())
    }

    async fn finish_settled(
        &self,
        job_id: Uuid,
        database_id: Uuid,
        imported: i32,
        failed: Vec<String>,
    ) -> Result<()> {
        // A job fails outright only when nothing was imported and at least
        // one table failed; partial success completes with a note.
        let status = if failed.is_empty() {
            JobStatus::Completed
        } else if imported == 0 {
            JobStatus::Failed
        } else {
            JobStatus::Completed
        };
        let error_message = (!failed.is_empty()).then(|| format!("{} tables failed", failed.len()));

        info!(job_id = %job_id, %status, imported, failed = failed.len(), "job settled");
        self.jobs
            .update(
                job_id,
                JobUpdate {
                    status: Some(status),
                    imported_table_count: Some(imported),
                    failed_table_names: Some(failed),
                    error_message,
                    database_id: Some(database_id),
                    completed_at: Some(Utc::now()),
                    ..JobUpdate::default()
                },
            )
            .await?;
        Ok(())
    }

    async fn mark_failed(&self, job_id: Uuid, message: String) -> Result<()> {
        warn!(job_id = %job_id, %message, "marking job failed");
        self.jobs
            .update(
                job_id,
                JobUpdate {
                    status: Some(JobStatus::Failed),
                    error_message: Some(message),
                    completed_at: Some(Utc::now()),
                    ..JobUpdate::default()
                },
            )
            .await?;
        Ok(())
    }
}
