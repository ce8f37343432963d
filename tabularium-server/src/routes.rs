use axum::Router;
use axum::routing::{get, post};

use crate::handlers::{connect, jobs};
use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/import-jobs", post(jobs::create_job))
        .route("/import-jobs/{id}", get(jobs::get_job).put(jobs::update_job))
        .route("/import-jobs/{id}/enqueue", post(jobs::enqueue_job))
        .route("/import-jobs/user/{owner_id}", get(jobs::list_jobs_for_owner))
        .route("/api/database/connect", post(connect::connect_database))
        .with_state(state)
}
