use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::PgPool;
use tracing::instrument;

use crate::auth::extractors::AdminUser;
use crate::error::ApiError;
use crate::inspect::cache::{ColumnMeta, TableMeta};
use crate::inspect::{INSPECTABLE_TABLES, REDACTED_COLUMNS, REDACTED_PLACEHOLDER};
use crate::state::AppState;

const DEFAULT_ROW_LIMIT: i64 = 50;
const MAX_ROW_LIMIT: i64 = 500;

/// Reject anything outside the static allow-list before it gets anywhere
/// near a SQL identifier position.
fn require_inspectable(table: &str) -> Result<&'static str, ApiError> {
    INSPECTABLE_TABLES
        .iter()
        .copied()
        .find(|t| *t == table)
        .ok_or_else(|| ApiError::NotFound("Table not found".into()))
}

fn redact(mut row: Value) -> Value {
    if let Some(object) = row.as_object_mut() {
        for (key, value) in object.iter_mut() {
            if REDACTED_COLUMNS.contains(&key.to_lowercase().as_str()) {
                *value = Value::String(REDACTED_PLACEHOLDER.into());
            }
        }
    }
    row
}

/// Rows as JSON objects; identifiers come from the allow-list consts only.
async fn fetch_rows(
    db: &PgPool,
    table: &'static str,
    limit: i64,
    offset: i64,
) -> sqlx::Result<Vec<Value>> {
    let rows: Vec<Value> = sqlx::query_scalar(&format!(
        "SELECT row_to_json(t)
         FROM (SELECT * FROM \"{table}\" ORDER BY created_at DESC LIMIT $1 OFFSET $2) t"
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await?;
    Ok(rows.into_iter().map(redact).collect())
}

async fn count_rows(db: &PgPool, table: &'static str) -> sqlx::Result<i64> {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM \"{table}\""))
        .fetch_one(db)
        .await
}

#[derive(Debug, Serialize)]
pub struct TablesResponse {
    pub tables: Vec<String>,
}

/// Listing forces a metadata refresh, mirroring the cache's explicit
/// invalidation path.
#[instrument(skip(state))]
pub async fn list_tables(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
) -> Result<Json<TablesResponse>, ApiError> {
    let tables = state.schema_cache.tables(&state.db, true).await?;
    Ok(Json(TablesResponse {
        tables: tables.into_iter().map(|t| t.name).collect(),
    }))
}

#[derive(Debug, Serialize)]
pub struct SchemaResponse {
    pub schema: Vec<ColumnMeta>,
}

#[instrument(skip(state))]
pub async fn table_schema(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(table): Path<String>,
) -> Result<Json<SchemaResponse>, ApiError> {
    let table = require_inspectable(&table)?;
    let tables = state.schema_cache.tables(&state.db, false).await?;
    let meta: TableMeta = tables
        .into_iter()
        .find(|t| t.name == table)
        .ok_or_else(|| ApiError::NotFound("Table not found".into()))?;
    Ok(Json(SchemaResponse {
        schema: meta.columns,
    }))
}

#[derive(Debug, Deserialize)]
pub struct RowsQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
    pub has_more: bool,
}

#[derive(Debug, Serialize)]
pub struct RowsResponse {
    pub table: &'static str,
    pub rows: Vec<Value>,
    pub pagination: Pagination,
}

#[instrument(skip(state, query))]
pub async fn table_rows(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(table): Path<String>,
    Query(query): Query<RowsQuery>,
) -> Result<Json<RowsResponse>, ApiError> {
    let table = require_inspectable(&table)?;
    let limit = query.limit.unwrap_or(DEFAULT_ROW_LIMIT).clamp(1, MAX_ROW_LIMIT);
    let offset = query.offset.unwrap_or(0).max(0);

    let total = count_rows(&state.db, table).await?;
    let rows = fetch_rows(&state.db, table, limit, offset).await?;

    Ok(Json(RowsResponse {
        table,
        rows,
        pagination: Pagination {
            total,
            limit,
            offset,
            has_more: offset + limit < total,
        },
    }))
}

/// Redacted snapshot of every allow-listed table, capped rows per table.
#[instrument(skip(state))]
pub async fn dump(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
) -> Result<Json<Value>, ApiError> {
    let mut data = serde_json::Map::new();
    for table in INSPECTABLE_TABLES {
        let rows = fetch_rows(&state.db, table, DEFAULT_ROW_LIMIT, 0).await?;
        data.insert((*table).into(), Value::Array(rows));
    }
    Ok(Json(json!({
        "tables": INSPECTABLE_TABLES,
        "data": Value::Object(data),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_list_rejects_unknown_and_injection_attempts() {
        assert!(require_inspectable("users").is_ok());
        assert!(require_inspectable("sessions").is_ok());
        assert!(require_inspectable("password_reset_tokens").is_ok());
        assert!(require_inspectable("pg_catalog").is_err());
        assert!(require_inspectable("users\"; DROP TABLE users; --").is_err());
        assert!(require_inspectable("").is_err());
    }

    #[test]
    fn redaction_masks_sensitive_columns() {
        let row = json!({
            "id": "1",
            "email": "a@x.com",
            "password_hash": "$argon2id$...",
            "Token": "abc",
            "name": null,
        });
        let redacted = redact(row);
        assert_eq!(redacted["password_hash"], REDACTED_PLACEHOLDER);
        assert_eq!(redacted["Token"], REDACTED_PLACEHOLDER);
        assert_eq!(redacted["email"], "a@x.com");
        assert!(redacted["name"].is_null());
    }

    #[test]
    fn redaction_leaves_non_objects_alone() {
        assert_eq!(redact(json!(null)), json!(null));
        assert_eq!(redact(json!([1, 2])), json!([1, 2]));
    }
}
