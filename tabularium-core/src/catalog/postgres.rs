use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use tabularium_model::{DatabaseRecord, FieldRecord, TableRecord};

use super::CatalogStore;
use crate::error::{ImportError, Result};

#[derive(Clone, Debug)]
pub struct PostgresCatalogStore {
    pool: PgPool,
}

impl PostgresCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn store_err(err: sqlx::Error) -> ImportError {
    ImportError::Store(err.to_string())
}

fn row_to_database(row: &PgRow) -> Result<DatabaseRecord> {
    Ok(DatabaseRecord {
        id: row.try_get("id").map_err(store_err)?,
        source_id: row.try_get("source_id").map_err(store_err)?,
        name: row.try_get("name").map_err(store_err)?,
        description: row.try_get("description").map_err(store_err)?,
        vendor: row.try_get("vendor").map_err(store_err)?,
        platform: row.try_get("platform").map_err(store_err)?,
        location: row.try_get("location").map_err(store_err)?,
        version: row.try_get("version").map_err(store_err)?,
    })
}

fn row_to_table(row: &PgRow) -> Result<TableRecord> {
    Ok(TableRecord {
        id: row.try_get("id").map_err(store_err)?,
        database_id: row.try_get("database_id").map_err(store_err)?,
        name: row.try_get("name").map_err(store_err)?,
        description: row.try_get("description").map_err(store_err)?,
        record_count: row.try_get("record_count").map_err(store_err)?,
        last_imported: row.try_get("last_imported").map_err(store_err)?,
    })
}

#[async_trait]
impl CatalogStore for PostgresCatalogStore {
    async fn register_database(&self, database: &DatabaseRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO databases
                (id, source_id, name, description, vendor, platform, location, version)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(database.id)
        .bind(database.source_id)
        .bind(&database.name)
        .bind(&database.description)
        .bind(&database.vendor)
        .bind(&database.platform)
        .bind(&database.location)
        .bind(&database.version)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn insert_table_snapshot(
        &self,
        table: &TableRecord,
        fields: &[FieldRecord],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(store_err)?;

        sqlx::query(
            r#"
            INSERT INTO tables
                (id, database_id, name, description, record_count, last_imported)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(table.id)
        .bind(table.database_id)
        .bind(&table.name)
        .bind(&table.description)
        .bind(table.record_count)
        .bind(table.last_imported)
        .execute(&mut *tx)
        .await
        .map_err(store_err)?;

        for field in fields {
            sqlx::query(
                r#"
                INSERT INTO fields
                    (id, table_id, name, data_type, description, nullable,
                     is_primary_key, is_foreign_key, default_value)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(field.id)
            .bind(field.table_id)
            .bind(&field.name)
            .bind(&field.data_type)
            .bind(&field.description)
            .bind(field.nullable)
            .bind(field.is_primary_key)
            .bind(field.is_foreign_key)
            .bind(&field.default_value)
            .execute(&mut *tx)
            .await
            .map_err(store_err)?;
        }

        tx.commit().await.map_err(store_err)?;
        Ok(())
    }

    async fn get_database(&self, id: Uuid) -> Result<DatabaseRecord> {
        let row = sqlx::query(
            "SELECT id, source_id, name, description, vendor, platform, location, version \
             FROM databases WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?
        .ok_or_else(|| ImportError::NotFound(format!("database {id}")))?;
        row_to_database(&row)
    }

    async fn list_tables(&self, database_id: Uuid) -> Result<Vec<TableRecord>> {
        let rows = sqlx::query(
            "SELECT id, database_id, name, description, record_count, last_imported \
             FROM tables WHERE database_id = $1 ORDER BY name",
        )
        .bind(database_id)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        rows.iter().map(row_to_table).collect()
    }
}
