//! Job API tests against the in-memory stores.

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use tower::ServiceExt;
use uuid::Uuid;

use tabularium_core::{
    ConnectErrorKind, Connector, ConnectorFactory, ImportError, JobStore, MemoryJobStore,
};
use tabularium_model::{ColumnDescriptor, ImportJob, JobStatus, JobUpdate, SourceConfig, Vendor};
use tabularium_server::{AppState, create_router};

struct StubConnector {
    tables: Vec<String>,
}

#[async_trait]
impl Connector for StubConnector {
    fn vendor(&self) -> Vendor {
        Vendor::Postgres
    }

    async fn list_tables(&self) -> tabularium_core::Result<Vec<String>> {
        Ok(self.tables.clone())
    }

    async fn read_schema(&self, _table: &str) -> tabularium_core::Result<Vec<ColumnDescriptor>> {
        Ok(Vec::new())
    }

    async fn count_rows(&self, _table: &str) -> u64 {
        0
    }

    async fn disconnect(&self) {}
}

struct StubFactory {
    fail: bool,
}

#[async_trait]
impl ConnectorFactory for StubFactory {
    async fn connect(
        &self,
        _config: &SourceConfig,
    ) -> tabularium_core::Result<Box<dyn Connector>> {
        if self.fail {
            return Err(ImportError::connect(
                ConnectErrorKind::AuthenticationFailed,
                "password authentication failed",
            ));
        }
        Ok(Box::new(StubConnector {
            tables: vec!["accounts".to_string(), "branches".to_string()],
        }))
    }
}

fn test_app(fail_connect: bool) -> (Router, Arc<MemoryJobStore>) {
    let jobs = Arc::new(MemoryJobStore::new());
    let state = AppState::new(
        jobs.clone(),
        Arc::new(StubFactory {
            fail: fail_connect,
        }),
    );
    (create_router(state), jobs)
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn create_then_get_round_trips() {
    let (app, _jobs) = test_app(false);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/import-jobs",
            serde_json::json!({
                "owner_id": "user-1",
                "config": {"vendor": "postgres"},
                "total_table_count": 3,
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let created = json_body(response).await;
    assert_eq!(created["status"], "pending");
    let id = created["id"].as_str().unwrap().to_string();

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/import-jobs/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let fetched = json_body(response).await;
    assert_eq!(fetched["id"], id.as_str());
    assert_eq!(fetched["owner_id"], "user-1");
}

#[tokio::test]
async fn unknown_job_is_404() {
    let (app, _jobs) = test_app(false);
    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/import-jobs/{}", Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn owner_listing_honors_the_status_filter() {
    let (app, jobs) = test_app(false);
    let pending = ImportJob::new("user-1", serde_json::json!({}), 1);
    let completed = ImportJob::new("user-1", serde_json::json!({}), 1);
    jobs.create(&pending).await.unwrap();
    jobs.create(&completed).await.unwrap();
    jobs.update(completed.id, JobUpdate::status(JobStatus::Completed))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/import-jobs/user/user-1?status=completed,failed")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let listed = json_body(response).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["status"], "completed");

    let response = app
        .oneshot(
            Request::builder()
                .uri("/import-jobs/user/user-1?status=bogus")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn cancelling_a_terminal_job_conflicts() {
    let (app, jobs) = test_app(false);
    let active = ImportJob::new("user-1", serde_json::json!({}), 1);
    let finished = ImportJob::new("user-1", serde_json::json!({}), 1);
    jobs.create(&active).await.unwrap();
    jobs.create(&finished).await.unwrap();
    jobs.update(finished.id, JobUpdate::status(JobStatus::Completed))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/import-jobs/{}", active.id),
            serde_json::json!({"status": "cancelled"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "cancelled");

    // Cancelled is terminal, so the completion timestamp is stamped even
    // though no worker will ever touch this job again.
    let cancelled = jobs.get(active.id).await.unwrap();
    assert!(cancelled.completed_at.is_some());

    let response = app
        .oneshot(json_request(
            "PUT",
            &format!("/import-jobs/{}", finished.id),
            serde_json::json!({"status": "cancelled"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn enqueue_rearms_a_failed_job() {
    let (app, jobs) = test_app(false);
    let job = ImportJob::new("user-1", serde_json::json!({}), 2);
    jobs.create(&job).await.unwrap();
    jobs.update(
        job.id,
        JobUpdate {
            status: Some(JobStatus::Failed),
            imported_table_count: Some(1),
            error_message: Some("1 tables failed".to_string()),
            ..JobUpdate::default()
        },
    )
    .await
    .unwrap();

    let response = app
        .oneshot(json_request(
            "POST",
            &format!("/import-jobs/{}/enqueue", job.id),
            serde_json::json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let rearmed = json_body(response).await;
    assert_eq!(rearmed["status"], "pending");
    assert_eq!(rearmed["error_message"], serde_json::Value::Null);
    assert_eq!(rearmed["imported_table_count"], 1);
}

#[tokio::test]
async fn connect_probe_lists_tables() {
    let (app, _jobs) = test_app(false);
    let response = app
        .oneshot(json_request(
            "POST",
            "/api/database/connect",
            serde_json::json!({
                "server": "db.internal",
                "database": "sales",
                "username": "svc",
                "password": "pw",
                "vendor": "postgres",
                "source_id": Uuid::new_v4(),
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["tables"], serde_json::json!(["accounts", "branches"]));
}

#[tokio::test]
async fn connect_failure_maps_to_bad_gateway() {
    let (app, _jobs) = test_app(true);
    let response = app
        .oneshot(json_request(
            "POST",
            "/api/database/connect",
            serde_json::json!({
                "server": "db.internal",
                "database": "sales",
                "username": "svc",
                "password": "wrong",
                "vendor": "postgres",
                "source_id": Uuid::new_v4(),
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}
