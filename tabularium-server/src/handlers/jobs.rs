//! Import job endpoints.

use axum::Json;
use axum::extract::{Path, Query, State};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use tabularium_model::{ImportJob, JobStatus, JobUpdate};

use crate::errors::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateJobRequest {
    pub owner_id: String,
    pub config: serde_json::Value,
    pub total_table_count: i32,
}

pub async fn create_job(
    State(state): State<AppState>,
    Json(request): Json<CreateJobRequest>,
) -> AppResult<Json<ImportJob>> {
    if request.total_table_count < 0 {
        return Err(AppError::bad_request("total_table_count must not be negative"));
    }
    let job = ImportJob::new(request.owner_id, request.config, request.total_table_count);
    state.jobs.create(&job).await?;
    Ok(Json(job))
}

pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ImportJob>> {
    Ok(Json(state.jobs.get(id).await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct ListJobsQuery {
    /// Comma-separated status filter, e.g. `pending,in_progress`.
    pub status: Option<String>,
}

pub async fn list_jobs_for_owner(
    State(state): State<AppState>,
    Path(owner_id): Path<String>,
    Query(query): Query<ListJobsQuery>,
) -> AppResult<Json<Vec<ImportJob>>> {
    let statuses = match &query.status {
        Some(raw) => {
            let parsed: Result<Vec<JobStatus>, _> =
                raw.split(',').map(|s| s.trim().parse()).collect();
            Some(parsed.map_err(|err| AppError::bad_request(err.to_string()))?)
        }
        None => None,
    };
    let jobs = state
        .jobs
        .list_for_owner(&owner_id, statuses.as_deref())
        .await?;
    Ok(Json(jobs))
}

pub async fn update_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(mut update): Json<JobUpdate>,
) -> AppResult<Json<ImportJob>> {
    if update.is_empty() {
        return Err(AppError::bad_request("update carries no fields"));
    }
    // Cancellation is only legal while the job is still active; terminal
    // jobs stay terminal.
    if update.status == Some(JobStatus::Cancelled) {
        let current = state.jobs.get(id).await?;
        if !current.status.can_cancel() {
            return Err(AppError::conflict(format!(
                "cannot cancel a {} job",
                current.status
            )));
        }
        // Cancelled is terminal. A Pending job is never claimed again, so
        // the completion timestamp has to be stamped here.
        if update.completed_at.is_none() {
            update.completed_at = Some(Utc::now());
        }
    }
    Ok(Json(state.jobs.update(id, update).await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct EnqueueRequest {
    /// Replacement source config; omitted keeps the stored one.
    #[serde(default)]
    pub config: Option<serde_json::Value>,
}

pub async fn enqueue_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Option<Json<EnqueueRequest>>,
) -> AppResult<Json<ImportJob>> {
    let config = body.and_then(|Json(request)| request.config);
    Ok(Json(state.jobs.enqueue(id, config).await?))
}
