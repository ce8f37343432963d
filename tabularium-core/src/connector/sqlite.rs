//! SQLite dialect: sqlite_master for the table list, PRAGMA table-valued
//! output for per-table detail. PRAGMAs cannot take bound parameters, so the
//! table name is escaped inline.

use std::collections::HashMap;

use sqlx::{AnyPool, Row};

use tabularium_model::ColumnDescriptor;

use super::{get_bool_flag, get_opt_string, map_query_error};
use crate::error::Result;

pub(super) async fn fetch_table_page(
    pool: &AnyPool,
    offset: u64,
    limit: u64,
) -> Result<Vec<String>> {
    let rows = sqlx::query(
        r#"
        SELECT name
        FROM sqlite_master
        WHERE type = 'table'
          AND name NOT LIKE 'sqlite_%'
        ORDER BY name
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(limit as i64)
    .bind(offset as i64)
    .fetch_all(pool)
    .await
    .map_err(|err| map_query_error("<table listing>", err))?;

    Ok(rows.iter().map(|row| row.get("name")).collect())
}

pub(super) async fn read_schema(pool: &AnyPool, table: &str) -> Result<Vec<ColumnDescriptor>> {
    let escaped = table.replace('\'', "''");

    let fk_rows = sqlx::query(&format!("PRAGMA foreign_key_list('{escaped}')"))
        .fetch_all(pool)
        .await
        .map_err(|err| map_query_error(table, err))?;

    // column name -> (referenced table, referenced column)
    let fks: HashMap<String, (String, Option<String>)> = fk_rows
        .iter()
        .map(|row| {
            (
                row.get("from"),
                (row.get("table"), get_opt_string(row, "to")),
            )
        })
        .collect();

    let rows = sqlx::query(&format!("PRAGMA table_info('{escaped}')"))
        .fetch_all(pool)
        .await
        .map_err(|err| map_query_error(table, err))?;

    let columns = rows
        .iter()
        .map(|row| {
            let name: String = row.get("name");
            let declared: String = row.get("type");
            // Untyped columns land in the BLOB affinity class.
            let data_type = if declared.is_empty() {
                "BLOB".to_string()
            } else {
                declared
            };
            let reference = fks.get(&name);
            ColumnDescriptor {
                is_nullable: !get_bool_flag(row, "notnull"),
                is_primary_key: get_bool_flag(row, "pk"),
                is_foreign_key: reference.is_some(),
                default_value: get_opt_string(row, "dflt_value"),
                referenced_table: reference.map(|(t, _)| t.clone()),
                referenced_column: reference.and_then(|(_, c)| c.clone()),
                ..ColumnDescriptor::new(name, data_type)
            }
        })
        .collect();

    Ok(columns)
}
