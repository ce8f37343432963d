//! Tabularium server: hosts the job API and the import worker in one
//! process.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tabularium_core::{
    FileCheckpointStore, HttpEnrichmentClient, ImportWorker, PostgresCatalogStore,
    PostgresJobStore, ResumePolicy, SqlxConnectorFactory, WorkerConfig,
};
use tabularium_server::{AppState, Config, create_router};

#[derive(Parser, Debug)]
#[command(name = "tabularium-server")]
#[command(about = "Schema import service: job API plus polling import worker")]
struct Cli {
    /// Listen address, overriding BIND_ADDR.
    #[arg(long)]
    bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "tabularium_server=info,tabularium_core=info,sqlx=warn".into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    if let Some(bind) = cli.bind {
        config.bind_addr = bind;
    }

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .context("failed to connect to the application database")?;
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("failed to run migrations")?;

    let jobs = Arc::new(PostgresJobStore::new(pool.clone()));
    let catalog = Arc::new(PostgresCatalogStore::new(pool.clone()));
    let checkpoints = Arc::new(FileCheckpointStore::new(&config.checkpoint_dir));
    let connectors = Arc::new(SqlxConnectorFactory::new(
        checkpoints,
        config.listing_page_size,
        ResumePolicy::default(),
    ));
    let enrichment = Arc::new(HttpEnrichmentClient::new(
        config.enrichment_url.clone(),
        config.enrichment_timeout,
    )?);

    let shutdown = CancellationToken::new();
    let worker = ImportWorker::new(
        jobs.clone(),
        catalog,
        enrichment,
        connectors.clone(),
        WorkerConfig {
            poll_interval: config.poll_interval,
            error_backoff: config.error_backoff,
        },
        shutdown.clone(),
    );
    let worker_handle = tokio::spawn(worker.run());

    let router = create_router(AppState::new(jobs, connectors));
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "tabularium server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("shutting down, waiting for the worker to finish its table");
    shutdown.cancel();
    worker_handle.await.ok();
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
