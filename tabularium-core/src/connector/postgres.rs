//! PostgreSQL dialect: information_schema catalog queries.

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
        SELECT table_name
        FROM information_schema.tables
        WHERE table_schema = $1
          AND table_type = 'BASE TABLE'
        ORDER BY table_name
        LIMIT $2 OFFSET $3
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

pub(super) async fn read_schema(
    pool: &AnyPool,
    schema: &str,
    table: &str,
) -> Result<Vec<ColumnDescriptor>> {
    let rows = sqlx::query(
        r#"
        WITH pk_columns AS (
            SELECT kcu.column_name
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
                ON tc.constraint_name = kcu.constraint_name
                AND tc.table_schema = kcu.table_schema
            WHERE tc.constraint_type = 'PRIMARY KEY'
                AND kcu.table_name = $2
                AND tc.table_schema = $1
        ),
        fk_columns AS (
            SELECT
                kcu.column_name,
                ccu.table_name AS referenced_table,
                ccu.column_name AS referenced_column
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
                ON tc.constraint_name = kcu.constraint_name
                AND tc.table_schema = kcu.table_schema
            JOIN information_schema.constraint_column_usage ccu
                ON tc.constraint_name = ccu.constraint_name
                AND tc.table_schema = ccu.table_schema
            WHERE tc.constraint_type = 'FOREIGN KEY'
                AND kcu.table_name = $2
                AND tc.table_schema = $1
        )
        SELECT
            c.column_name,
            c.data_type,
            c.is_nullable = 'YES' AS is_nullable,
            pk.column_name IS NOT NULL AS is_primary_key,
            fk.column_name IS NOT NULL AS is_foreign_key,
            c.column_default,
            fk.referenced_table,
            fk.referenced_column,
            c.character_maximum_length,
            c.numeric_precision,
            c.numeric_scale,
            c.udt_name
        FROM information_schema.columns c
        LEFT JOIN pk_columns pk ON c.column_name = pk.column_name
        LEFT JOIN fk_columns fk ON c.column_name = fk.column_name
        WHERE c.table_name = $2
            AND c.table_schema = $1
        ORDER BY c.ordinal_position
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
            let data_type = format_data_type(
                row.get("data_type"),
                get_opt_i64(row, "character_maximum_length"),
                get_opt_i64(row, "numeric_precision"),
                get_opt_i64(row, "numeric_scale"),
                get_opt_string(row, "udt_name").as_deref(),
            );
            ColumnDescriptor {
                is_nullable: get_bool_flag(row, "is_nullable"),
                is_primary_key: get_bool_flag(row, "is_primary_key"),
                is_foreign_key: get_bool_flag(row, "is_foreign_key"),
                default_value: get_opt_string(row, "column_default"),
                referenced_table: get_opt_string(row, "referenced_table"),
                referenced_column: get_opt_string(row, "referenced_column"),
                ..ColumnDescriptor::new(row.get::<String, _>("column_name"), data_type)
            }
        })
        .collect();

    Ok(columns)
}

/// Attaches length or precision/scale to the base type; `ARRAY` columns carry
/// the element type from `udt_name`.
fn format_data_type(
    data_type: String,
    max_length: Option<i64>,
    precision: Option<i64>,
    scale: Option<i64>,
    udt_name: Option<&str>,
) -> String {
    match data_type.as_str() {
        "character varying" | "character" | "varchar" | "char" => match max_length {
            Some(len) => format!("{data_type}({len})"),
            None => data_type,
        },
        "numeric" | "decimal" => match (precision, scale) {
            (Some(p), Some(s)) if s > 0 => format!("{data_type}({p},{s})"),
            (Some(p), _) => format!("{data_type}({p})"),
            _ => data_type,
        },
        "ARRAY" => format!("{}[]", udt_name.unwrap_or("anyelement")),
        _ => data_type,
    }
}
