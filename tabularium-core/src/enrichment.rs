//! Enrichment collaborator boundary.
//!
//! A separate HTTP service turns raw column metadata into human descriptions.
//! The import treats it as best-effort: any failure here degrades to
//! [`fallback_description`] instead of failing the table.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use tabularium_model::ColumnDescriptor;

use crate::error::{ImportError, Result};

/// Description payload returned by the collaborator.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DescribeResponse {
    /// The submitted columns with `description` filled in.
    #[serde(default)]
    pub fields: Vec<ColumnDescriptor>,
    #[serde(default)]
    pub table_description: Option<String>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EnrichmentService: Send + Sync {
    /// Describes one table's columns. Every failure mode surfaces as
    /// [`ImportError::EnrichmentUnavailable`].
    async fn describe(
        &self,
        table: &str,
        fields: &[ColumnDescriptor],
    ) -> Result<DescribeResponse>;
}

/// Table description used when the collaborator is unreachable or returns
/// nothing useful.
pub fn fallback_description(table: &str) -> String {
    format!("Stores {table} data")
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DescribeRequest<'a> {
    table_name: &'a str,
    fields: &'a [ColumnDescriptor],
}

/// reqwest-backed client for the collaborator's `/api/database/describe`
/// endpoint.
#[derive(Clone, Debug)]
pub struct HttpEnrichmentClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpEnrichmentClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| ImportError::EnrichmentUnavailable(err.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl EnrichmentService for HttpEnrichmentClient {
    async fn describe(
        &self,
        table: &str,
        fields: &[ColumnDescriptor],
    ) -> Result<DescribeResponse> {
        let url = format!("{}/api/database/describe", self.base_url.trim_end_matches('/'));
        debug!(table, fields = fields.len(), "requesting descriptions");

        let response = self
            .http
            .post(&url)
            .json(&DescribeRequest {
                table_name: table,
                fields,
            })
            .send()
            .await
            .map_err(|err| ImportError::EnrichmentUnavailable(err.to_string()))?;

        let response = response
            .error_for_status()
            .map_err(|err| ImportError::EnrichmentUnavailable(err.to_string()))?;

        response
            .json::<DescribeResponse>()
            .await
            .map_err(|err| ImportError::EnrichmentUnavailable(err.to_string()))
    }
}
