//! Developer-facing database inspection. Read-only by design: tables and
//! columns come from a static allow-list, access requires an admin session,
//! and sensitive columns are redacted in every response.

use axum::{routing::get, Router};

use crate::state::AppState;

pub mod cache;
pub mod handlers;

/// Tables the inspector may touch. Identifiers used in SQL are taken from
/// this list only, never from request input.
pub const INSPECTABLE_TABLES: &[&str] = &["users", "sessions", "password_reset_tokens"];

/// Column names whose values are always masked in inspector output.
pub const REDACTED_COLUMNS: &[&str] = &[
    "password",
    "password_hash",
    "secret",
    "token",
    "token_hash",
    "api_key",
    "apikey",
];

pub const REDACTED_PLACEHOLDER: &str = "***REDACTED***";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/inspect/tables", get(handlers::list_tables))
        .route("/inspect/tables/:table/schema", get(handlers::table_schema))
        .route("/inspect/tables/:table/rows", get(handlers::table_rows))
        .route("/inspect/dump", get(handlers::dump))
}
