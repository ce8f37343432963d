//! MySQL dialect.
//!
//! Keys and columns come from three information_schema queries; the column
//! query's COLUMN_TYPE already carries MySQL's display syntax, which is
//! normalized to uppercase.

use std::collections::{HashMap, HashSet};

use sqlx::{AnyPool, Row};

use tabularium_model::ColumnDescriptor;

use super::{get_bool_flag, get_opt_i64, get_opt_string, map_query_error};
use crate::error::Result;

pub(super) async fn fetch_table_page(
    pool: &AnyPool,
    schema: &str,
    offset: u64,
    limit: u64,
) -> Result<Vec<String>> {
    let rows = sqlx::query(
        r#"
        SELECT TABLE_NAME AS table_name
        FROM information_schema.TABLES
        WHERE TABLE_SCHEMA = ?
          AND TABLE_TYPE = 'BASE TABLE'
        ORDER BY TABLE_NAME
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(schema)
    .bind(limit as i64)
    .bind(offset as i64)
    .fetch_all(pool)
    .await
    .map_err(|err| map_query_error("<table listing>", err))?;

    Ok(rows.iter().map(|row| row.get("table_name")).collect())
}

pub(super) async fn primary_keys(
    pool: &AnyPool,
    schema: &str,
    table: &str,
) -> Result<HashSet<String>> {
    let rows = sqlx::query(
        r#"
        SELECT k.COLUMN_NAME AS column_name
        FROM information_schema.TABLE_CONSTRAINTS t
        JOIN information_schema.KEY_COLUMN_USAGE k
            ON t.CONSTRAINT_NAME = k.CONSTRAINT_NAME
        WHERE t.CONSTRAINT_TYPE = 'PRIMARY KEY'
          AND t.TABLE_SCHEMA = ?
          AND t.TABLE_NAME = ?
        "#,
    )
    .bind(schema)
    .bind(table)
    .fetch_all(pool)
    .await
    .map_err(|err| map_query_error(table, err))?;

    Ok(rows.iter().map(|row| row.get("column_name")).collect())
}

/// column name -> (referenced table, referenced column)
pub(super) async fn foreign_keys(
    pool: &AnyPool,
    schema: &str,
    table: &str,
) -> Result<HashMap<String, (String, String)>> {
    let rows = sqlx::query(
        r#"
        SELECT
            k.COLUMN_NAME AS column_name,
            k.REFERENCED_TABLE_NAME AS referenced_table,
            k.REFERENCED_COLUMN_NAME AS referenced_column
        FROM information_schema.KEY_COLUMN_USAGE k
        WHERE k.TABLE_SCHEMA = ?
          AND k.TABLE_NAME = ?
          AND k.REFERENCED_TABLE_NAME IS NOT NULL
        "#,
    )
    .bind(schema)
    .bind(table)
    .fetch_all(pool)
    .await
    .map_err(|err| map_query_error(table, err))?;

    Ok(rows
        .iter()
        .map(|row| {
            (
                row.get("column_name"),
                (row.get("referenced_table"), row.get("referenced_column")),
            )
        })
        .collect())
}

pub(super) async fn read_schema(
    pool: &AnyPool,
    schema: &str,
    table: &str,
) -> Result<Vec<ColumnDescriptor>> {
    let pks = primary_keys(pool, schema, table).await?;
    let fks = foreign_keys(pool, schema, table).await?;

    let rows = sqlx::query(
        r#"
        SELECT
            COLUMN_NAME AS column_name,
            DATA_TYPE AS data_type,
            IS_NULLABLE = 'YES' AS is_nullable,
            COLUMN_DEFAULT AS column_default,
            CHARACTER_MAXIMUM_LENGTH AS character_maximum_length,
            NUMERIC_PRECISION AS numeric_precision,
            NUMERIC_SCALE AS numeric_scale,
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
            let data_type = format_data_type(
                row.get("data_type"),
                get_opt_i64(row, "character_maximum_length"),
                get_opt_i64(row, "numeric_precision"),
                get_opt_i64(row, "numeric_scale"),
                get_opt_string(row, "column_type").as_deref(),
            );
            let reference = fks.get(&name);
            ColumnDescriptor {
                is_nullable: get_bool_flag(row, "is_nullable"),
                is_primary_key: pks.contains(&name),
                is_foreign_key: reference.is_some(),
                default_value: get_opt_string(row, "column_default"),
                referenced_table: reference.map(|(t, _)| t.clone()),
                referenced_column: reference.map(|(_, c)| c.clone()),
                ..ColumnDescriptor::new(name, data_type)
            }
        })
        .collect();

    Ok(columns)
}

/// Prefers COLUMN_TYPE's display syntax, uppercased. Enums collapse to a bare
/// `ENUM` tag rather than carrying their full value list.
fn format_data_type(
    data_type: String,
    max_length: Option<i64>,
    precision: Option<i64>,
    scale: Option<i64>,
    column_type: Option<&str>,
) -> String {
    if data_type.eq_ignore_ascii_case("enum") {
        return "ENUM".to_string();
    }

    if let Some(column_type) = column_type {
        if !column_type.to_ascii_lowercase().starts_with("enum") {
            return column_type.to_ascii_uppercase();
        }
    }

    match data_type.as_str() {
        "char" | "varchar" | "binary" | "varbinary" => match max_length {
            Some(-1) => format!("{data_type}(max)"),
            Some(len) => format!("{data_type}({len})"),
            None => data_type.to_ascii_uppercase(),
        },
        "decimal" | "numeric" => match (precision, scale) {
            (Some(p), Some(s)) if s > 0 => format!("{data_type}({p},{s})"),
            (Some(p), _) => format!("{data_type}({p})"),
            _ => data_type.to_ascii_uppercase(),
        },
        _ => data_type.to_ascii_uppercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_type_wins_and_is_uppercased() {
        assert_eq!(
            format_data_type("int".into(), None, Some(10), Some(0), Some("int(11) unsigned")),
            "INT(11) UNSIGNED"
        );
    }

    #[test]
    fn enums_collapse_to_a_tag() {
        assert_eq!(
            format_data_type("enum".into(), None, None, None, Some("enum('a','b')")),
            "ENUM"
        );
    }

    #[test]
    fn unbounded_length_formats_as_max() {
        assert_eq!(
            format_data_type("varchar".into(), Some(-1), None, None, None),
            "varchar(max)"
        );
    }

    #[test]
    fn bare_types_are_uppercased() {
        assert_eq!(format_data_type("datetime".into(), None, None, None, None), "DATETIME");
    }
}
