//! Durable cursors for resumable paginated enumeration.
//!
//! A checkpoint records how far a bulk listing got for one
//! `(schema, database)` key. It is written after every successfully fetched
//! page, so a crashed or disconnected scan resumes at page granularity
//! instead of restarting from zero.

mod file;
mod memory;
mod resume;

pub use file::FileCheckpointStore;
pub use memory::MemoryCheckpointStore;
pub use resume::{ResumePolicy, resume_listing};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Identifies one enumeration scope: a schema within a source database.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CheckpointKey {
    pub schema: String,
    pub database: String,
}

impl CheckpointKey {
    pub fn new(schema: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            database: database.into(),
        }
    }

    /// Filesystem-safe stem for file-backed stores.
    pub fn file_stem(&self) -> String {
        let sanitize = |s: &str| {
            s.chars()
                .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
                .collect::<String>()
        };
        format!("{}_{}", sanitize(&self.schema), sanitize(&self.database))
    }
}

impl std::fmt::Display for CheckpointKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.schema, self.database)
    }
}

/// A page that could not be fetched, kept for diagnostics.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedPage {
    pub offset: u64,
    pub error: String,
}

/// Durable cursor state for one key.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub last_offset: u64,
    pub processed_items: Vec<String>,
    #[serde(default)]
    pub failed_items: Vec<FailedPage>,
    pub in_progress: bool,
}

impl Checkpoint {
    pub fn new() -> Self {
        Self::default()
    }

    /// `last_offset == processed_items.len()` must hold after every durable
    /// write; a stored document violating it is treated as corrupt.
    pub fn is_consistent(&self) -> bool {
        self.last_offset == self.processed_items.len() as u64
    }
}

/// Pluggable durable key-value store for checkpoints.
///
/// `load` returns `None` both for a missing document and for an unreadable
/// one: corruption is never fatal, the scan just starts fresh.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn load(&self, key: &CheckpointKey) -> Result<Option<Checkpoint>>;
    async fn save(&self, key: &CheckpointKey, checkpoint: &Checkpoint) -> Result<()>;
    async fn clear(&self, key: &CheckpointKey) -> Result<()>;
}
