//! Core library for Tabularium: source connectors, checkpointed table
//! enumeration, job and catalog stores, the enrichment boundary, and the
//! import worker that ties them together.

pub mod catalog;
pub mod checkpoint;
pub mod connector;
pub mod enrichment;
pub mod error;
pub mod jobs;
pub mod worker;

pub use catalog::{CatalogStore, MemoryCatalogStore, PostgresCatalogStore};
pub use checkpoint::{
    Checkpoint, CheckpointKey, CheckpointStore, FileCheckpointStore, MemoryCheckpointStore,
    ResumePolicy,
};
pub use connector::{Connector, ConnectorFactory, SqlxConnectorFactory};
pub use enrichment::{DescribeResponse, EnrichmentService, HttpEnrichmentClient};
pub use error::{ConnectErrorKind, ImportError, Result};
pub use jobs::{JobStore, MemoryJobStore, PostgresJobStore};
pub use worker::{ImportWorker, WorkerConfig};
