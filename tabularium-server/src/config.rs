//! Environment-driven server configuration.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    /// Base URL of the enrichment collaborator.
    pub enrichment_url: String,
    pub enrichment_timeout: Duration,
    pub poll_interval: Duration,
    pub error_backoff: Duration,
    /// Directory for enumeration checkpoints.
    pub checkpoint_dir: PathBuf,
    /// Page size for resumable table listings.
    pub listing_page_size: u64,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_secs(key: &str, default: u64) -> Result<Duration> {
    match std::env::var(key) {
        Ok(raw) => {
            let secs: u64 = raw
                .parse()
                .with_context(|| format!("{key} must be a whole number of seconds"))?;
            Ok(Duration::from_secs(secs))
        }
        Err(_) => Ok(Duration::from_secs(default)),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let database_url =
            std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let bind_addr = env_or("BIND_ADDR", "0.0.0.0:8000")
            .parse()
            .context("BIND_ADDR must be host:port")?;
        let listing_page_size = env_or("LISTING_PAGE_SIZE", "1000")
            .parse()
            .context("LISTING_PAGE_SIZE must be a positive integer")?;

        Ok(Self {
            database_url,
            bind_addr,
            enrichment_url: env_or("ENRICHMENT_URL", "http://localhost:8000"),
            enrichment_timeout: env_secs("ENRICHMENT_TIMEOUT_SECS", 30)?,
            poll_interval: env_secs("WORKER_POLL_INTERVAL_SECS", 2)?,
            error_backoff: env_secs("WORKER_ERROR_BACKOFF_SECS", 5)?,
            checkpoint_dir: PathBuf::from(env_or("CHECKPOINT_DIR", "/tmp/tabularium_checkpoints")),
            listing_page_size,
        })
    }
}
