//! Destination catalog: where imported schema snapshots land.

mod memory;
mod postgres;

pub use memory::MemoryCatalogStore;
pub use postgres::PostgresCatalogStore;

use async_trait::async_trait;
use uuid::Uuid;

use tabularium_model::{DatabaseRecord, FieldRecord, TableRecord};

use crate::error::Result;

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn register_database(&self, database: &DatabaseRecord) -> Result<()>;

    /// Inserts a table and all its fields atomically. A crash mid-import
    /// never leaves a table without its fields in the catalog.
    async fn insert_table_snapshot(&self, table: &TableRecord, fields: &[FieldRecord])
    -> Result<()>;

    async fn get_database(&self, id: Uuid) -> Result<DatabaseRecord>;

    async fn list_tables(&self, database_id: Uuid) -> Result<Vec<TableRecord>>;
}
