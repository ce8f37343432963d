use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Checkpoint, CheckpointKey, CheckpointStore};
use crate::error::Result;

/// In-memory checkpoint store for tests and single-run imports.
#[derive(Clone, Default)]
pub struct MemoryCheckpointStore {
    inner: Arc<RwLock<HashMap<CheckpointKey, Checkpoint>>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn load(&self, key: &CheckpointKey) -> Result<Option<Checkpoint>> {
        let map = self.inner.read().await;
        Ok(map.get(key).filter(|c| c.is_consistent()).cloned())
    }

    async fn save(&self, key: &CheckpointKey, checkpoint: &Checkpoint) -> Result<()> {
        let mut map = self.inner.write().await;
        map.insert(key.clone(), checkpoint.clone());
        Ok(())
    }

    async fn clear(&self, key: &CheckpointKey) -> Result<()> {
        let mut map = self.inner.write().await;
        map.remove(key);
        Ok(())
    }
}
