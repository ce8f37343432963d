//! MariaDB dialect.
//!
//! Shares MySQL's information_schema layout but normalizes differently:
//! MariaDB reports column defaults pre-quoted and uses the literal string
//! `NULL` for an absent default, so both get cleaned up here. COLUMN_TYPE is
//! kept in MariaDB's lowercase form.

use sqlx::{AnyPool, Row};

use tabularium_model::ColumnDescriptor;

use super::{get_bool_flag, get_opt_string, map_query_error, mysql};
use crate::error::Result;

pub(super) async fn fetch_table_page(
    pool: &AnyPool,
    schema: &str,
    offset: u64,
    limit: u64,
) -> Result<Vec<String>> {
    mysql::fetch_table_page(pool, schema, offset, limit).await
}

pub(super) async fn read_schema(
    pool: &AnyPool,
    schema: &str,
    table: &str,
) -> Result<Vec<ColumnDescriptor>> {
    let pks = mysql::primary_keys(pool, schema, table).await?;
    let fks = mysql::foreign_keys(pool, schema, table).await?;

    let rows = sqlx::query(
        r#"
        SELECT
            COLUMN_NAME AS column_name,
            IS_NULLABLE = 'YES' AS is_nullable,
            COLUMN_DEFAULT AS column_default,
            COLUMN_TYPE AS column_type
        FROM information_schema.COLUMNS
        WHERE TABLE_SCHEMA = ?
          AND TABLE_NAME = ?
        ORDER BY ORDINAL_POSITION
        "#,
    )
    .bind(schema)
    .bind(table)
    .fetch_all(pool)
    .await
    .map_err(|err| map_query_error(table, err))?;

    let columns = rows
        .iter()
        .map(|row| {
            let name: String = row.get("column_name");
            let reference = fks.get(&name);
            ColumnDescriptor {
                is_nullable: get_bool_flag(row, "is_nullable"),
                is_primary_key: pks.contains(&name),
                is_foreign_key: reference.is_some(),
                default_value: normalize_default(get_opt_string(row, "column_default")),
                referenced_table: reference.map(|(t, _)| t.clone()),
                referenced_column: reference.map(|(_, c)| c.clone()),
                ..ColumnDescriptor::new(name, row.get::<String, _>("column_type"))
            }
        })
        .collect();

    Ok(columns)
}

fn normalize_default(raw: Option<String>) -> Option<String> {
    let raw = raw?;
    if raw == "NULL" {
        return None;
    }
    if raw.len() >= 2 && raw.starts_with('\'') && raw.ends_with('\'') {
        return Some(raw[1..raw.len() - 1].replace("''", "'"));
    }
    Some(raw)
}
