//! Catalog entities written by a successful import.
//!
//! These are append-only snapshots: re-importing a source inserts fresh
//! rows rather than mutating earlier ones.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::source::SourceConfig;

/// A registered source database in the catalog.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DatabaseRecord {
    pub id: Uuid,
    pub source_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub vendor: String,
    pub platform: Option<String>,
    pub location: Option<String>,
    pub version: Option<String>,
}

impl DatabaseRecord {
    /// Build the catalog row for a source connection being imported.
    pub fn from_source(config: &SourceConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_id: config.source_id,
            name: config.database.clone(),
            description: config.description.clone(),
            vendor: config.vendor.as_str().to_string(),
            platform: config.platform.clone(),
            location: config.location.clone(),
            version: config.version.clone(),
        }
    }
}

/// One imported table snapshot.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TableRecord {
    pub id: Uuid,
    pub database_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    /// Advisory row count captured at import time; 0 when the count query
    /// was unavailable.
    pub record_count: i64,
    pub last_imported: DateTime<Utc>,
}

impl TableRecord {
    pub fn new(database_id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            database_id,
            name: name.into(),
            description: None,
            record_count: 0,
            last_imported: Utc::now(),
        }
    }
}

/// One column of an imported table snapshot.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FieldRecord {
    pub id: Uuid,
    pub table_id: Uuid,
    pub name: String,
    pub data_type: String,
    pub description: Option<String>,
    pub nullable: bool,
    pub is_primary_key: bool,
    pub is_foreign_key: bool,
    pub default_value: Option<String>,
}

impl FieldRecord {
    /// Build a field row from a normalized column descriptor.
    pub fn from_column(table_id: Uuid, column: &crate::schema::ColumnDescriptor) -> Self {
        Self {
            id: Uuid::new_v4(),
            table_id,
            name: column.field_name.clone(),
            data_type: column.data_type.clone(),
            description: column.description.clone(),
            nullable: column.is_nullable,
            is_primary_key: column.is_primary_key,
            is_foreign_key: column.is_foreign_key,
            default_value: column.default_value.clone(),
        }
    }
}
