//! File-backed checkpoint store: one JSON document per key, written
//! atomically via a temp file rename so a crash mid-write never leaves a
//! torn document behind.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::warn;

use super::{Checkpoint, CheckpointKey, CheckpointStore};
use crate::error::Result;

#[derive(Clone, Debug)]
pub struct FileCheckpointStore {
    dir: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &CheckpointKey) -> PathBuf {
        self.dir.join(format!("{}_checkpoint.json", key.file_stem()))
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn load(&self, key: &CheckpointKey) -> Result<Option<Checkpoint>> {
        let path = self.path_for(key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        match serde_json::from_slice::<Checkpoint>(&bytes) {
            Ok(checkpoint) if checkpoint.is_consistent() => Ok(Some(checkpoint)),
            Ok(_) => {
                warn!(key = %key, "checkpoint offset disagrees with item count, starting fresh");
                Ok(None)
            }
            Err(err) => {
                // Corruption is never fatal; the scan restarts from zero.
                warn!(key = %key, error = %err, "unreadable checkpoint, starting fresh");
                Ok(None)
            }
        }
    }

    async fn save(&self, key: &CheckpointKey, checkpoint: &Checkpoint) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");

        let bytes = serde_json::to_vec(checkpoint)?;
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn clear(&self, key: &CheckpointKey) -> Result<()> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
