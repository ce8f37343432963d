use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use tabularium_model::{ImportJob, JobStatus, JobUpdate};

use super::JobStore;
use crate::error::{ImportError, Result};

const JOB_COLUMNS: &str = "id, owner_id, status, config, total_table_count, \
     imported_table_count, failed_table_names, error_message, database_id, \
     created_at, updated_at, completed_at";

#[derive(Clone, Debug)]
pub struct PostgresJobStore {
    pool: PgPool,
}

impl PostgresJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_job(row: &PgRow) -> Result<ImportJob> {
    let status: String = row.try_get("status").map_err(store_err)?;
    let status: JobStatus = status
        .parse()
        .map_err(|err: tabularium_model::ParseStatusError| ImportError::Store(err.to_string()))?;

    Ok(ImportJob {
        id: row.try_get("id").map_err(store_err)?,
        owner_id: row.try_get("owner_id").map_err(store_err)?,
        status,
        config: row.try_get("config").map_err(store_err)?,
        total_table_count: row.try_get("total_table_count").map_err(store_err)?,
        imported_table_count: row.try_get("imported_table_count").map_err(store_err)?,
        failed_table_names: row.try_get("failed_table_names").map_err(store_err)?,
        error_message: row.try_get("error_message").map_err(store_err)?,
        database_id: row.try_get("database_id").map_err(store_err)?,
        created_at: row.try_get("created_at").map_err(store_err)?,
        updated_at: row.try_get("updated_at").map_err(store_err)?,
        completed_at: row.try_get("completed_at").map_err(store_err)?,
    })
}

fn store_err(err: sqlx::Error) -> ImportError {
    ImportError::Store(err.to_string())
}

#[async_trait]
impl JobStore for PostgresJobStore {
    async fn create(&self, job: &ImportJob) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO import_jobs
                (id, owner_id, status, config, total_table_count,
                 imported_table_count, failed_table_names, error_message,
                 database_id, created_at, updated_at, completed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(job.id)
        .bind(&job.owner_id)
        .bind(job.status.as_str())
        .bind(&job.config)
        .bind(job.total_table_count)
        .bind(job.imported_table_count)
        .bind(&job.failed_table_names)
        .bind(&job.error_message)
        .bind(job.database_id)
        .bind(job.created_at)
        .bind(job.updated_at)
        .bind(job.completed_at)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<ImportJob> {
        let row = sqlx::query(&format!(
            "SELECT {JOB_COLUMNS} FROM import_jobs WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?
        .ok_or_else(|| ImportError::NotFound(format!("import job {id}")))?;
        row_to_job(&row)
    }

    async fn list_for_owner(
        &self,
        owner_id: &str,
        statuses: Option<&[JobStatus]>,
    ) -> Result<Vec<ImportJob>> {
        let rows = match statuses {
            Some(wanted) => {
                let wanted: Vec<String> =
                    wanted.iter().map(|s| s.as_str().to_string()).collect();
                sqlx::query(&format!(
                    "SELECT {JOB_COLUMNS} FROM import_jobs \
                     WHERE owner_id = $1 AND status = ANY($2) \
                     ORDER BY created_at DESC"
                ))
                .bind(owner_id)
                .bind(&wanted)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {JOB_COLUMNS} FROM import_jobs \
                     WHERE owner_id = $1 ORDER BY created_at DESC"
                ))
                .bind(owner_id)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(store_err)?;

        rows.iter().map(row_to_job).collect()
    }

    async fn update(&self, id: Uuid, update: JobUpdate) -> Result<ImportJob> {
        let status = update.status.map(|s| s.as_str().to_string());
        let row = sqlx::query(&format!(
            r#"
            UPDATE import_jobs SET
                status = COALESCE($2, status),
                config = COALESCE($3, config),
                imported_table_count = COALESCE($4, imported_table_count),
                failed_table_names = COALESCE($5, failed_table_names),
                error_message = COALESCE($6, error_message),
                database_id = COALESCE($7, database_id),
                completed_at = COALESCE($8, completed_at),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(status)
        .bind(update.config)
        .bind(update.imported_table_count)
        .bind(update.failed_table_names)
        .bind(update.error_message)
        .bind(update.database_id)
        .bind(update.completed_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?
        .ok_or_else(|| ImportError::NotFound(format!("import job {id}")))?;
        row_to_job(&row)
    }

    async fn enqueue(&self, id: Uuid, config: Option<serde_json::Value>) -> Result<ImportJob> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE import_jobs SET
                status = 'pending',
                config = COALESCE($2, config),
                error_message = NULL,
                completed_at = NULL,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(config)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?
        .ok_or_else(|| ImportError::NotFound(format!("import job {id}")))?;
        row_to_job(&row)
    }

    async fn claim_next(&self) -> Result<Option<ImportJob>> {
        // Orphaned in_progress jobs outrank pending ones: with one worker any
        // in_progress row at claim time was left behind by a crash.
        let row = sqlx::query(&format!(
            r#"
            UPDATE import_jobs SET
                status = 'in_progress',
                updated_at = NOW()
            WHERE id = (
                SELECT id FROM import_jobs
                WHERE status IN ('pending', 'in_progress')
                ORDER BY
                    CASE status WHEN 'in_progress' THEN 0 ELSE 1 END,
                    created_at
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;

        row.as_ref().map(row_to_job).transpose()
    }
}
