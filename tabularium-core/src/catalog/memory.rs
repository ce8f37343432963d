use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use tabularium_model::{DatabaseRecord, FieldRecord, TableRecord};

use super::CatalogStore;
use crate::error::{ImportError, Result};

#[derive(Default)]
struct Inner {
    databases: Vec<DatabaseRecord>,
    tables: Vec<TableRecord>,
    fields: Vec<FieldRecord>,
}

/// In-memory catalog for tests.
#[derive(Clone, Default)]
pub struct MemoryCatalogStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn fields_for_table(&self, table_id: Uuid) -> Vec<FieldRecord> {
        let inner = self.inner.read().await;
        inner
            .fields
            .iter()
            .filter(|field| field.table_id == table_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalogStore {
    async fn register_database(&self, database: &DatabaseRecord) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.databases.push(database.clone());
        Ok(())
    }

    async fn insert_table_snapshot(
        &self,
        table: &TableRecord,
        fields: &[FieldRecord],
    ) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.tables.push(table.clone());
        inner.fields.extend_from_slice(fields);
        Ok(())
    }

    async fn get_database(&self, id: Uuid) -> Result<DatabaseRecord> {
        let inner = self.inner.read().await;
        inner
            .databases
            .iter()
            .find(|db| db.id == id)
            .cloned()
            .ok_or_else(|| ImportError::NotFound(format!("database {id}")))
    }

    async fn list_tables(&self, database_id: Uuid) -> Result<Vec<TableRecord>> {
        let inner = self.inner.read().await;
        Ok(inner
            .tables
            .iter()
            .filter(|table| table.database_id == database_id)
            .cloned()
            .collect())
    }
}
