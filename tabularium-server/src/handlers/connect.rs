//! Connection probe endpoint: validates source credentials and returns the
//! table list a client can select from.

use axum::Json;
use axum::extract::State;
use serde::Serialize;
use tracing::info;

use tabularium_model::SourceConfig;

use crate::errors::AppResult;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ConnectResponse {
    pub tables: Vec<String>,
}

pub async fn connect_database(
    State(state): State<AppState>,
    Json(config): Json<SourceConfig>,
) -> AppResult<Json<ConnectResponse>> {
    info!(vendor = %config.vendor, server = %config.server, database = %config.database,
        "probing source database");

    let connector = state.connectors.connect(&config).await?;
    let result = connector.list_tables().await;
    connector.disconnect().await;

    let tables = result?;
    info!(count = tables.len(), "source probe listed tables");
    Ok(Json(ConnectResponse { tables }))
}
