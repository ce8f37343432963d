use std::sync::Arc;

use tabularium_core::{ConnectorFactory, JobStore};

/// Shared handler state. The worker holds its own references to the stores;
/// the API needs only the job store and a connector factory for probes.
#[derive(Clone)]
pub struct AppState {
    pub jobs: Arc<dyn JobStore>,
    pub connectors: Arc<dyn ConnectorFactory>,
}

impl AppState {
    pub fn new(jobs: Arc<dyn JobStore>, connectors: Arc<dyn ConnectorFactory>) -> Self {
        Self { jobs, connectors }
    }
}
